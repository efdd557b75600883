//! Deletion planning and confirmation.
//!
//! # Overview
//!
//! [`plan`] turns duplicate groups into a list of deletions: the first
//! member of each group is kept and every other member becomes a candidate.
//! [`apply`] walks that list, asking a [`Prompt`] about each candidate.
//!
//! Confirmation is a two-state machine. It starts in
//! [`ConfirmationState::AskEach`]; answering "all" moves it to
//! [`ConfirmationState::AllYes`], which is never left for the rest of the
//! run and deletes every remaining candidate without asking.
//!
//! ```
//! use dupdiff::actions::plan::{Answer, ConfirmationState, Decision};
//!
//! let state = ConfirmationState::AskEach;
//! let (decision, state) = state.next(Answer::No);
//! assert_eq!(decision, Decision::Keep);
//! let (decision, state) = state.next(Answer::YesToAll);
//! assert_eq!(decision, Decision::Delete);
//! assert_eq!(state, ConfirmationState::AllYes);
//! ```

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use crate::duplicates::DuplicateGroup;
use crate::scanner::{FileEntry, Hash};

use super::delete::{delete_verified, DeleteConfig, DeleteError, DeleteResult};

/// One candidate scheduled for removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedDeletion {
    /// Index of the group the candidate came from
    pub group: usize,
    /// Shared digest
    pub digest: Hash,
    /// The representative that stays
    pub keep: PathBuf,
    /// The file to remove
    pub candidate: FileEntry,
}

/// Ordered list of deletions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionPlan {
    /// Candidates in group order, then discovery order
    pub entries: Vec<PlannedDeletion>,
}

impl DeletionPlan {
    /// Number of candidates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there is nothing to delete.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bytes freed if every candidate is removed.
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.entries.iter().map(|e| e.candidate.size).sum()
    }
}

/// Build the deletion list for `groups`, keeping each group's first member.
#[must_use]
pub fn plan(groups: &[DuplicateGroup]) -> DeletionPlan {
    let entries = groups
        .iter()
        .enumerate()
        .filter_map(|(idx, group)| group.representative().map(|keep| (idx, group, keep)))
        .flat_map(|(idx, group, keep)| {
            group
                .candidates()
                .iter()
                .filter(move |c| c.path != keep.path)
                .map(move |candidate| PlannedDeletion {
                    group: idx,
                    digest: group.hash,
                    keep: keep.path.clone(),
                    candidate: candidate.clone(),
                })
        })
        .collect();

    DeletionPlan { entries }
}

/// A user's answer for one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    /// Delete this candidate
    Yes,
    /// Keep this candidate
    No,
    /// Delete this and every remaining candidate without asking again
    YesToAll,
}

impl Answer {
    /// Parse a line of user input. Empty input means no.
    ///
    /// Returns `None` for anything unrecognised.
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "" | "n" | "no" => Some(Self::No),
            "y" | "yes" => Some(Self::Yes),
            "a" | "all" => Some(Self::YesToAll),
            _ => None,
        }
    }
}

/// What happens to a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Remove the file
    Delete,
    /// Leave the file in place
    Keep,
}

/// Confirmation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfirmationState {
    /// Ask about every candidate
    #[default]
    AskEach,
    /// Delete everything without asking
    AllYes,
}

impl ConfirmationState {
    /// Whether a prompt is needed in this state.
    #[must_use]
    pub fn needs_prompt(self) -> bool {
        self == Self::AskEach
    }

    /// Apply an answer, returning the decision and the following state.
    ///
    /// `AllYes` absorbs every answer.
    #[must_use]
    pub fn next(self, answer: Answer) -> (Decision, Self) {
        match (self, answer) {
            (Self::AllYes, _) => (Decision::Delete, Self::AllYes),
            (Self::AskEach, Answer::Yes) => (Decision::Delete, Self::AskEach),
            (Self::AskEach, Answer::No) => (Decision::Keep, Self::AskEach),
            (Self::AskEach, Answer::YesToAll) => (Decision::Delete, Self::AllYes),
        }
    }
}

/// Source of answers for [`apply`].
pub trait Prompt {
    /// Ask whether `item` should be deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the answer cannot be obtained.
    fn ask(&mut self, item: &PlannedDeletion) -> io::Result<Answer>;
}

/// Line-based prompt over any reader/writer pair (stdin/stderr in the CLI).
pub struct StdinPrompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> StdinPrompt<R, W> {
    /// Create a prompt reading answers from `input` and writing questions to `output`.
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> Prompt for StdinPrompt<R, W> {
    fn ask(&mut self, item: &PlannedDeletion) -> io::Result<Answer> {
        loop {
            write!(
                self.output,
                "Delete {} (copy of {})? [y]es / [N]o / [a]ll: ",
                item.candidate.path.display(),
                item.keep.display()
            )?;
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                writeln!(self.output)?;
                return Ok(Answer::No);
            }

            match Answer::parse(&line) {
                Some(answer) => return Ok(answer),
                None => writeln!(self.output, "Please answer y, n or a.")?,
            }
        }
    }
}

/// Outcome of applying a plan.
#[derive(Debug, Default)]
pub struct DeletionReport {
    /// Files removed
    pub deleted: Vec<DeleteResult>,
    /// Candidates the user chose to keep
    pub kept: Vec<PathBuf>,
    /// Candidates that could not be removed
    pub failures: Vec<DeleteError>,
    /// Total bytes freed
    pub bytes_freed: u64,
    /// Number of prompts shown
    pub prompts: usize,
    /// Whether the run stopped early on shutdown
    pub interrupted: bool,
}

impl DeletionReport {
    /// Whether every confirmed deletion succeeded.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }

    /// Human-readable summary of the operation.
    #[must_use]
    pub fn summary(&self) -> String {
        let freed = crate::duplicates::format_size(self.bytes_freed);
        if self.all_succeeded() {
            format!(
                "Deleted {} file(s), kept {}, freed {}",
                self.deleted.len(),
                self.kept.len(),
                freed
            )
        } else {
            format!(
                "Deleted {} file(s), kept {}, {} failed, freed {}",
                self.deleted.len(),
                self.kept.len(),
                self.failures.len(),
                freed
            )
        }
    }
}

/// Walk the plan, confirming and deleting candidates one at a time.
///
/// `initial` is [`ConfirmationState::AllYes`] for batch mode. Each failure
/// is recorded and the remaining candidates are still processed. A
/// candidate whose representative has disappeared is never deleted.
pub fn apply<P: Prompt + ?Sized>(
    plan: &DeletionPlan,
    initial: ConfirmationState,
    prompt: &mut P,
    config: &DeleteConfig,
) -> DeletionReport {
    let mut report = DeletionReport::default();
    let mut state = initial;

    for (idx, item) in plan.entries.iter().enumerate() {
        if config.is_shutdown_requested() {
            log::info!(
                "Deletion interrupted, {} candidate(s) untouched",
                plan.len() - idx
            );
            report.interrupted = true;
            break;
        }

        let decision = if state.needs_prompt() {
            report.prompts += 1;
            let answer = prompt.ask(item).unwrap_or_else(|e| {
                log::warn!("Could not read answer ({}), keeping file", e);
                Answer::No
            });
            let (decision, next) = state.next(answer);
            if next != state {
                log::info!("Deleting all remaining duplicates without asking");
            }
            state = next;
            decision
        } else {
            Decision::Delete
        };

        if decision == Decision::Keep {
            log::info!("Kept: {}", item.candidate.path.display());
            report.kept.push(item.candidate.path.clone());
            continue;
        }

        if std::fs::symlink_metadata(&item.keep).is_err() {
            log::warn!(
                "Kept copy {} is gone, not deleting {}",
                item.keep.display(),
                item.candidate.path.display()
            );
            report
                .failures
                .push(DeleteError::RepresentativeMissing(item.keep.clone()));
            continue;
        }

        match delete_verified(&item.candidate.path, Some(item.candidate.modified), config) {
            Ok(result) => {
                report.bytes_freed += result.size;
                report.deleted.push(result);
            }
            Err(e) => {
                log::warn!("Failed to delete {}: {}", item.candidate.path.display(), e);
                report.failures.push(e);
            }
        }
    }

    log::info!("{}", report.summary());
    report
}
