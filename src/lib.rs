//! dupdiff - duplicate file finder and content-based tree differ.
//!
//! Files are identified by content digest (BLAKE3 by default, SHA-256 on
//! request). Within one tree, files sharing a digest form duplicate groups
//! whose extra copies can be deleted after confirmation. Across two trees,
//! digests tell which content exists on only one side.
//!
//! # Modules
//!
//! - [`scanner`]: directory walking and content hashing
//! - [`index`]: digest and size indexes of a tree
//! - [`duplicates`]: multi-phase duplicate detection
//! - [`compare`]: two-tree comparison
//! - [`actions`]: deletion planning, confirmation and removal
//! - [`output`]: text and JSON reports

pub mod actions;
pub mod app;
pub mod cli;
pub mod compare;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod index;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod signal;

pub use app::{exit_code_for_error, run_app};
