mod integration {
    mod compare_tests;
    mod config_tests;
    mod delete_tests;
    mod error_continuation_tests;
    mod multi_directory_tests;
    mod scan_tests;
}
