//! Human-readable terminal reports, colored with yansi.
//!
//! Colors can be switched off globally with `yansi::disable()`, which the
//! binary does for `--no-color` and `NO_COLOR`.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use yansi::Paint;

use crate::actions::DeletionReport;
use crate::compare::{ComparisonResult, Side};
use crate::duplicates::{format_size, DuplicateGroup, ScanSummary};
use crate::scanner::hash_to_hex;

/// Write the duplicate report: one block per group, then the totals.
///
/// The first file of each group is the copy that deletion keeps.
///
/// # Errors
///
/// Returns any error from the writer.
pub fn write_duplicates<W: Write>(
    out: &mut W,
    groups: &[DuplicateGroup],
    summary: &ScanSummary,
) -> io::Result<()> {
    for group in groups {
        writeln!(
            out,
            "{} {} files x {} ({} reclaimable)",
            group.hash_hex().cyan().bold(),
            group.len(),
            format_size(group.size),
            format_size(group.wasted_space()).yellow()
        )?;
        for (idx, file) in group.files.iter().enumerate() {
            let path = file.path.display().to_string();
            if idx == 0 {
                writeln!(out, "  {} {}", "keep".green(), path)?;
            } else {
                writeln!(out, "  {}  {}", "dup".yellow(), path)?;
            }
        }
        writeln!(out)?;
    }

    write_scan_summary(out, summary)
}

/// Write only the totals block of a duplicate scan.
///
/// # Errors
///
/// Returns any error from the writer.
pub fn write_scan_summary<W: Write>(out: &mut W, summary: &ScanSummary) -> io::Result<()> {
    writeln!(
        out,
        "Scanned {} files ({}) in {:.2}s",
        summary.total_files,
        summary.total_size_display(),
        summary.scan_duration.as_secs_f64()
    )?;

    if summary.duplicate_groups == 0 {
        writeln!(out, "{}", "No duplicate files found.".green())?;
    } else {
        writeln!(
            out,
            "{} duplicate files in {} groups, {} reclaimable ({:.1}%)",
            summary.duplicate_files.bold(),
            summary.duplicate_groups,
            summary.reclaimable_display().yellow().bold(),
            summary.wasted_percentage()
        )?;
        if let Some((path, size)) = &summary.largest_duplicate {
            writeln!(
                out,
                "Largest duplicate: {} ({})",
                path.display(),
                format_size(*size)
            )?;
        }
    }

    if !summary.scan_errors.is_empty() {
        writeln!(
            out,
            "{} files could not be read:",
            summary.scan_errors.len().red()
        )?;
        for err in &summary.scan_errors {
            writeln!(out, "  {}", err)?;
        }
    }

    if summary.interrupted {
        writeln!(out, "{}", "Scan interrupted, results are partial.".red())?;
    }
    Ok(())
}

fn write_path_list<W: Write>(out: &mut W, title: &str, paths: &[PathBuf]) -> io::Result<()> {
    writeln!(out, "{} ({})", title.bold(), paths.len())?;
    for path in paths {
        writeln!(out, "  {}", path.display())?;
    }
    writeln!(out)
}

/// Write the comparison report.
///
/// `only` restricts the listing to one side's exclusive files; counts are
/// always printed for both.
///
/// # Errors
///
/// Returns any error from the writer.
pub fn write_comparison<W: Write>(
    out: &mut W,
    left: &Path,
    right: &Path,
    result: &ComparisonResult,
    show_shared: bool,
    only: Option<Side>,
) -> io::Result<()> {
    for side in [Side::Left, Side::Right] {
        if only.is_some_and(|o| o != side) {
            continue;
        }
        let root = match side {
            Side::Left => left,
            Side::Right => right,
        };
        write_path_list(
            out,
            &format!("Only in {}", root.display()),
            result.exclusive(side),
        )?;
    }

    if show_shared {
        writeln!(out, "{} ({})", "Shared content".bold(), result.shared.len())?;
        for shared in &result.shared {
            writeln!(out, "  {}", hash_to_hex(&shared.digest).cyan())?;
            for path in &shared.left {
                writeln!(out, "    {} {}", "<".blue(), path.display())?;
            }
            for path in &shared.right {
                writeln!(out, "    {} {}", ">".magenta(), path.display())?;
            }
        }
        writeln!(out)?;
    }

    writeln!(
        out,
        "Left: {} files, right: {} files, {} identical",
        result.total_left,
        result.total_right,
        result.count_equal.bold()
    )?;
    writeln!(
        out,
        "Only in left: {} files ({} distinct), only in right: {} files ({} distinct)",
        result.exclusive_left.len(),
        result.exclusive_left_digests,
        result.exclusive_right.len(),
        result.exclusive_right_digests
    )?;

    if result.is_identical() {
        writeln!(out, "{}", "Both trees hold the same content.".green())?;
    }
    Ok(())
}

/// Write the outcome of an interactive or batch deletion.
///
/// # Errors
///
/// Returns any error from the writer.
pub fn write_deletion_report<W: Write>(out: &mut W, report: &DeletionReport) -> io::Result<()> {
    if report.all_succeeded() {
        writeln!(out, "{}", report.summary().green())?;
    } else {
        writeln!(out, "{}", report.summary().yellow())?;
        for failure in &report.failures {
            writeln!(out, "  {} {}", "failed".red(), failure)?;
        }
    }
    if report.interrupted {
        writeln!(out, "{}", "Deletion interrupted.".red())?;
    }
    Ok(())
}
