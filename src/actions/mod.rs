//! File actions taken on scan results.
//!
//! Only deletion is provided: redundant duplicates go to the system trash
//! by default, or are removed permanently on request. See [`delete`].

pub mod delete;

pub use delete::{
    execute_plan, plan_deletions, BatchDeleteResult, DeleteError, DeleteMode, DeletePlan,
    DeleteTarget,
};
