//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Size-based file grouping
//! - Optional prefix comparison
//! - Full hash confirmation
//! - Duplicate group management

pub mod finder;
pub mod groups;

pub use finder::{
    format_size, phase_fullhash, phase_prefix, DuplicateFinder, FinderConfig, FinderError,
    FullhashStats, PrefixStats, ScanSummary,
};
pub use groups::{
    group_by_size, groups_from_index, sort_groups, DuplicateGroup, GroupingStats, SizeGroup,
};
