//! File actions module.
//!
//! - [`plan`]: choose the kept copy of each duplicate group and confirm the
//!   rest one by one or all at once
//! - [`delete`]: move files to the system trash or remove them permanently
//!
//! ```no_run
//! use dupdiff::actions::{apply, plan, ConfirmationState, DeleteConfig, StdinPrompt};
//! use dupdiff::duplicates::DuplicateFinder;
//! use std::path::Path;
//!
//! let (groups, _) = DuplicateFinder::with_defaults()
//!     .find_duplicates(Path::new("."))
//!     .unwrap();
//! let plan = plan(&groups);
//! let stdin = std::io::stdin();
//! let mut prompt = StdinPrompt::new(stdin.lock(), std::io::stderr());
//! let report = apply(&plan, ConfirmationState::AskEach, &mut prompt, &DeleteConfig::trash());
//! println!("{}", report.summary());
//! ```

pub mod delete;
pub mod plan;

pub use delete::{
    delete_to_trash, delete_verified, permanent_delete, DeleteConfig, DeleteError, DeleteResult,
};
pub use plan::{
    apply, plan, Answer, ConfirmationState, Decision, DeletionPlan, DeletionReport,
    PlannedDeletion, Prompt, StdinPrompt,
};
