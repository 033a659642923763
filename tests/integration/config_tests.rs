//! Configuration layering: defaults < TOML file < environment < CLI flags.

use clap::Parser;
use dupescan::cli::{Cli, Commands};
use dupescan::config::{Config, ConfigError};
use dupescan::duplicates::GroupBy;
use dupescan::scanner::SimhashWidth;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tempfile::tempdir;

static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Clear all DUPESCAN_* environment variables to avoid interference.
fn clear_env() {
    for (key, _) in std::env::vars() {
        if key.starts_with("DUPESCAN_") {
            std::env::remove_var(key);
        }
    }
}

fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, content).unwrap();
    (dir, path)
}

#[test]
fn test_load_from_toml() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let (_dir, path) = write_config(
        r#"
roots = ["/srv/data"]
group_by = "name"
concurrency_limit = 2
oldest_first = true
ignore_patterns = ["*.bak"]
"#,
    );

    let config = Config::load(Some(&path)).unwrap();
    assert_eq!(config.roots, vec![PathBuf::from("/srv/data")]);
    assert_eq!(config.group_by, "name");
    assert_eq!(config.concurrency_limit, 2);
    assert!(config.oldest_first);
    assert_eq!(config.ignore_patterns, vec!["*.bak".to_string()]);
    assert_eq!(config.similarity_width, 64);
}

#[test]
fn test_env_overrides_file() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let (_dir, path) = write_config("concurrency_limit = 2\ngroup_by = \"name\"\n");

    std::env::set_var("DUPESCAN_CONCURRENCY_LIMIT", "8");
    std::env::set_var("DUPESCAN_GROUP_BY", "hash");
    let config = Config::load(Some(&path));
    clear_env();

    let config = config.unwrap();
    assert_eq!(config.concurrency_limit, 8);
    assert_eq!(config.group_by, "hash");
}

#[test]
fn test_cli_overrides_env() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let (_dir, path) = write_config("threshold = 50.0\n");

    std::env::set_var("DUPESCAN_SIMILARITY_WIDTH", "32");
    let config = Config::load(Some(&path));
    clear_env();

    let cli = Cli::try_parse_from(["dupescan", "compare", "/data", "-t", "75", "--width", "64"])
        .unwrap();
    let Commands::Compare(args) = cli.command else {
        panic!("expected compare");
    };
    let settings = config.unwrap().with_compare_args(&args).resolve().unwrap();

    assert!((settings.threshold.percent() - 75.0).abs() < f64::EPSILON);
    assert_eq!(settings.similarity_width, SimhashWidth::W64);
    assert_eq!(settings.roots, vec![PathBuf::from("/data")]);
}

#[test]
fn test_missing_explicit_file_is_an_error() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let result = Config::load(Some(&dir.path().join("absent.toml")));
    assert!(matches!(result, Err(ConfigError::MissingFile(_))));
}

#[test]
fn test_malformed_toml_is_an_error() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let (_dir, path) = write_config("concurrency_limit = \"many\"\n");
    assert!(matches!(Config::load(Some(&path)), Err(ConfigError::Load(_))));
}

#[test]
fn test_unknown_group_by_suggests_closest() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let (_dir, path) = write_config("roots = [\"/x\"]\ngroup_by = \"hsah\"\n");

    let err = Config::load(Some(&path)).unwrap().resolve().unwrap_err();
    assert!(matches!(err, ConfigError::UnsupportedGrouping(_)));
    assert!(err.to_string().contains("did you mean 'hash'"));
}

#[test]
fn test_scan_flags_resolve() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let cli = Cli::try_parse_from([
        "dupescan", "scan", "/a", "-b", "NAME", "--keep-going", "--skip-hidden",
    ])
    .unwrap();
    let Commands::Scan(args) = cli.command else {
        panic!("expected scan");
    };

    let settings = Config::default().with_scan_args(&args).resolve().unwrap();
    assert_eq!(settings.group_by, GroupBy::Name);
    assert!(settings.keep_going);
    assert!(settings.walker.skip_hidden);
    assert!(settings.finder_config().keep_going);
}

#[test]
fn test_delete_with_name_grouping_rejected() {
    let cli = Cli::try_parse_from(["dupescan", "scan", "/a", "-b", "name", "--delete"]).unwrap();
    let Commands::Scan(args) = cli.command else {
        panic!("expected scan");
    };
    let result = Config::default().with_scan_args(&args).resolve();
    assert!(matches!(result, Err(ConfigError::DeleteByName)));
}

#[test]
fn test_save_round_trip() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");
    let config = Config {
        roots: vec![PathBuf::from("/music")],
        keep_going: true,
        min_size: Some(1024),
        ..Config::default()
    };

    config.save(&path).unwrap();
    assert_eq!(Config::load(Some(&path)).unwrap(), config);
}

#[test]
fn test_save_config_flag_writes_merged_settings() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let scan_dir = tempdir().unwrap();
    fs::write(scan_dir.path().join("file"), b"content").unwrap();
    let out_dir = tempdir().unwrap();
    let saved = out_dir.path().join("saved.toml");

    let root = scan_dir.path().to_str().unwrap();
    let out = saved.to_str().unwrap();
    let cli = Cli::try_parse_from([
        "dupescan", "-q", "--save-config", out, "scan", root, "--keep-going", "--no-progress",
    ])
    .unwrap();
    dupescan::run_app(cli).unwrap();

    let loaded = Config::load(Some(&saved)).unwrap();
    assert_eq!(loaded.roots, vec![scan_dir.path().to_path_buf()]);
    assert!(loaded.keep_going);
}
