//! Subcommand dispatch for the `dupdiff` binary.

use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::actions::{apply, plan, ConfirmationState, DeleteConfig, StdinPrompt};
use crate::cli::{Cli, Commands, CompareArgs, DupesArgs, HashArgs};
use crate::compare::{CompareError, TreeComparator};
use crate::config::Config;
use crate::duplicates::{DuplicateFinder, FinderConfig, FinderError};
use crate::error::ExitCode;
use crate::index::{HashingConfig, TreeIndexer};
use crate::logging::init_logging;
use crate::output::json::{JsonComparison, JsonOutput};
use crate::output::{text, OutputFormat};
use crate::progress::{Progress, ProgressCallback};
use crate::scanner::{hash_to_hex, HashMode, Hasher, WalkerConfig};
use crate::signal::{install_handler, ShutdownHandler};

/// Run the parsed command line and return the exit code to use.
///
/// # Errors
///
/// Returns an error for anything that prevents a report from being
/// produced: bad configuration, a missing root, an unreadable file during a
/// comparison (or a strict scan) and interruption.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    init_logging(cli.verbose, cli.quiet);
    if cli.no_color {
        yansi::disable();
    }

    let config =
        Config::resolve(cli.config.as_deref()).context("Failed to load configuration")?;
    let shutdown = install_handler();

    match cli.command {
        Commands::Dupes(args) => run_dupes(args, config, &shutdown, cli.quiet),
        Commands::Compare(args) => run_compare(args, config, &shutdown, cli.quiet),
        Commands::Hash(args) => run_hash(&args, &config),
    }
}

/// Exit code for an error returned by [`run_app`].
#[must_use]
pub fn exit_code_for_error(err: &anyhow::Error) -> ExitCode {
    let interrupted = err
        .downcast_ref::<FinderError>()
        .is_some_and(|e| matches!(e, FinderError::Interrupted))
        || err
            .downcast_ref::<CompareError>()
            .is_some_and(|e| matches!(e, CompareError::Interrupted));
    if interrupted {
        ExitCode::Interrupted
    } else {
        ExitCode::GeneralError
    }
}

fn walker_config(config: &Config) -> WalkerConfig {
    WalkerConfig::default()
        .with_follow_symlinks(config.follow_symlinks)
        .with_skip_hidden(config.skip_hidden)
        .with_size_range(config.min_size, config.max_size)
        .with_ignore_patterns(config.ignore_patterns.clone())
}

fn progress(quiet: bool, output: OutputFormat) -> Option<Arc<dyn ProgressCallback>> {
    if quiet || output == OutputFormat::Json {
        None
    } else {
        Some(Arc::new(Progress::new(false)))
    }
}

fn run_dupes(
    args: DupesArgs,
    config: Config,
    shutdown: &ShutdownHandler,
    quiet: bool,
) -> Result<ExitCode> {
    let mut config = args.scan.apply(config);
    config.strict |= args.strict;
    config.permanent |= args.permanent;
    if let Some(prefix) = args.prefix {
        config.prefix_len = Some(usize::try_from(prefix).unwrap_or(usize::MAX));
    }
    config.validate().context("Invalid options")?;

    let mut finder_config = FinderConfig::default()
        .with_io_threads(config.io_threads)
        .with_strict(config.strict)
        .with_prefix_len(config.prefix_len)
        .with_algorithm(config.algorithm)
        .with_block_size(config.block_size)
        .with_walker_config(walker_config(&config))
        .with_shutdown_flag(shutdown.get_flag());
    if let Some(callback) = progress(quiet, args.output) {
        finder_config = finder_config.with_progress_callback(callback);
    }

    let finder = DuplicateFinder::new(finder_config);
    let (groups, summary) = if args.single_pass {
        finder.find_duplicates_single_pass(&args.path)
    } else {
        finder.find_duplicates(&args.path)
    }
    .with_context(|| format!("Failed to scan {}", args.path.display()))?;

    let mut exit_code = if groups.is_empty() {
        ExitCode::NoDuplicates
    } else if !summary.scan_errors.is_empty() {
        ExitCode::PartialSuccess
    } else {
        ExitCode::Success
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match args.output {
        OutputFormat::Json => JsonOutput::new(&groups, &summary, exit_code)
            .write_to(&mut out, true)
            .context("Failed to write JSON report")?,
        OutputFormat::Text => {
            text::write_duplicates(&mut out, &groups, &summary).context("Failed to write report")?
        }
    }
    out.flush().context("Failed to write report")?;

    if args.delete && !groups.is_empty() {
        let plan = plan(&groups);
        let delete_config = if config.permanent {
            DeleteConfig::permanent()
        } else {
            DeleteConfig::trash()
        }
        .with_shutdown_flag(shutdown.get_flag());
        let initial = if args.yes {
            ConfirmationState::AllYes
        } else {
            ConfirmationState::AskEach
        };

        let stdin = io::stdin();
        let mut prompt = StdinPrompt::new(stdin.lock(), io::stderr());
        let report = apply(&plan, initial, &mut prompt, &delete_config);

        text::write_deletion_report(&mut out, &report).context("Failed to write report")?;

        if report.interrupted {
            exit_code = ExitCode::Interrupted;
        } else if !report.all_succeeded() {
            exit_code = ExitCode::PartialSuccess;
        }
    }

    Ok(exit_code)
}

fn run_compare(
    args: CompareArgs,
    config: Config,
    shutdown: &ShutdownHandler,
    quiet: bool,
) -> Result<ExitCode> {
    let config = args.scan.apply(config);
    config.validate().context("Invalid options")?;

    let hasher = Hasher::new()
        .with_algorithm(config.algorithm)
        .with_block_size(config.block_size)
        .with_mmap(true)
        .with_shutdown_flag(shutdown.get_flag());
    let mut hashing = HashingConfig::default()
        .with_io_threads(config.io_threads)
        .with_shutdown_flag(shutdown.get_flag());
    if let Some(callback) = progress(quiet, args.output) {
        hashing = hashing.with_progress_callback(callback);
    }
    let indexer = TreeIndexer::new(Arc::new(hasher))
        .with_walker_config(walker_config(&config))
        .with_hashing(hashing);

    let result = TreeComparator::new(indexer)
        .compare(&args.left, &args.right)
        .with_context(|| {
            format!(
                "Failed to compare {} with {}",
                args.left.display(),
                args.right.display()
            )
        })?;

    let exit_code = if result.is_identical() {
        ExitCode::Success
    } else {
        ExitCode::Differences
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match args.output {
        OutputFormat::Json => {
            JsonComparison::new(&args.left, &args.right, &result, args.show_shared, exit_code)
                .write_to(&mut out, true)
                .context("Failed to write JSON report")?
        }
        OutputFormat::Text => text::write_comparison(
            &mut out,
            &args.left,
            &args.right,
            &result,
            args.show_shared,
            args.only,
        )
        .context("Failed to write report")?,
    }
    out.flush().context("Failed to write report")?;

    Ok(exit_code)
}

fn run_hash(args: &HashArgs, config: &Config) -> Result<ExitCode> {
    let block_size = args
        .block_size
        .map_or(config.block_size, |b| usize::try_from(b).unwrap_or(usize::MAX));
    let hasher = Hasher::new()
        .with_algorithm(args.algorithm.unwrap_or(config.algorithm))
        .with_block_size(block_size)
        .with_mmap(true);
    let mode = match args.prefix {
        Some(len) => HashMode::Prefix(usize::try_from(len).unwrap_or(usize::MAX)),
        None => HashMode::Full,
    };

    let digest = hash_path(&hasher, &args.file, mode)?;
    println!("{}  {}", hash_to_hex(&digest), args.file.display());
    Ok(ExitCode::Success)
}

fn hash_path(hasher: &Hasher, path: &Path, mode: HashMode) -> Result<crate::scanner::Hash> {
    if path.is_dir() {
        anyhow::bail!("{} is a directory", path.display());
    }
    hasher
        .hash(path, mode)
        .with_context(|| format!("Failed to hash {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::fs;
    use tempfile::TempDir;

    fn run(args: &[&str]) -> Result<ExitCode> {
        let mut argv = vec!["dupdiff", "-q", "--config", "/nonexistent/none.toml"];
        argv.extend_from_slice(args);
        run_app(Cli::try_parse_from(argv).unwrap())
    }

    /// Run with the default config lookup, inside a jail whose home and
    /// config directories are empty and whose environment is cleared.
    fn run_without_config(args: &[&str]) -> Result<ExitCode> {
        let mut argv = vec!["dupdiff", "-q"];
        argv.extend_from_slice(args);
        let cli = Cli::try_parse_from(argv).unwrap();

        let mut outcome = None;
        figment::Jail::expect_with(|jail| {
            jail.clear_env();
            let home = jail.directory().to_path_buf();
            jail.set_env("HOME", home.display());
            jail.set_env("XDG_CONFIG_HOME", home.join("config").display());
            jail.set_env("APPDATA", home.join("appdata").display());
            outcome = Some(run_app(cli));
            Ok(())
        });
        outcome.unwrap()
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn test_default_config_lookup_stays_in_jail() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().to_str().unwrap().to_string();

        figment::Jail::expect_with(|jail| {
            jail.clear_env();
            let home = jail.directory().to_path_buf();
            jail.set_env("HOME", home.display());
            jail.set_env("XDG_CONFIG_HOME", home.join("config").display());
            std::fs::create_dir_all(home.join("config/dupdiff")).unwrap();
            jail.create_file("config/dupdiff/config.toml", "block_size = 0")?;

            let cli = Cli::try_parse_from(["dupdiff", "-q", "dupes", root.as_str()]).unwrap();
            let err = run_app(cli).unwrap_err();
            assert!(format!("{:#}", err).contains("block_size"));
            Ok(())
        });
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        let dir = TempDir::new().unwrap();
        let result = run(&["dupes", dir.path().to_str().unwrap()]);
        assert_eq!(
            exit_code_for_error(&result.unwrap_err()),
            ExitCode::GeneralError
        );
    }

    #[test]
    fn test_dupes_exit_codes() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a"), "one").unwrap();
        fs::write(dir.path().join("b"), "two").unwrap();
        let root = dir.path().to_str().unwrap();

        let code = run_without_config(&["dupes", root, "--output", "json"]).unwrap();
        assert_eq!(code, ExitCode::NoDuplicates);

        fs::write(dir.path().join("c"), "one").unwrap();
        let code = run_without_config(&["dupes", root, "--output", "json"]).unwrap();
        assert_eq!(code, ExitCode::Success);
    }

    #[test]
    fn test_dupes_batch_delete() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a"), "same").unwrap();
        fs::write(dir.path().join("b"), "same").unwrap();
        fs::write(dir.path().join("c"), "same").unwrap();
        let root = dir.path().to_str().unwrap();

        let code =
            run_without_config(&["dupes", root, "--delete", "--yes", "--permanent"]).unwrap();
        assert_eq!(code, ExitCode::Success);
        assert!(dir.path().join("a").exists());
        assert!(!dir.path().join("b").exists());
        assert!(!dir.path().join("c").exists());
    }

    #[test]
    fn test_compare_exit_codes() {
        let left = TempDir::new().unwrap();
        let right = TempDir::new().unwrap();
        fs::write(left.path().join("p"), "x").unwrap();
        fs::write(right.path().join("q"), "x").unwrap();
        let l = left.path().to_str().unwrap();
        let r = right.path().to_str().unwrap();

        assert_eq!(
            run_without_config(&["compare", l, r, "--output", "json"]).unwrap(),
            ExitCode::Success
        );

        fs::write(right.path().join("extra"), "y").unwrap();
        assert_eq!(
            run_without_config(&["compare", l, r, "--output", "json"]).unwrap(),
            ExitCode::Differences
        );
    }

    #[test]
    fn test_compare_missing_root_fails() {
        let left = TempDir::new().unwrap();
        let missing = left.path().join("missing");
        let err = run_without_config(&[
            "compare",
            left.path().to_str().unwrap(),
            missing.to_str().unwrap(),
        ])
        .unwrap_err();

        assert_eq!(exit_code_for_error(&err), ExitCode::GeneralError);
        assert!(format!("{:#}", err).contains("right path not found"));
    }

    #[test]
    fn test_interrupted_error_maps_to_130() {
        let err = anyhow::Error::new(FinderError::Interrupted).context("Failed to scan /x");
        assert_eq!(exit_code_for_error(&err), ExitCode::Interrupted);

        let err = anyhow::Error::new(CompareError::Interrupted);
        assert_eq!(exit_code_for_error(&err), ExitCode::Interrupted);
    }

    #[test]
    fn test_hash_rejects_directory() {
        let dir = TempDir::new().unwrap();
        let err = hash_path(&Hasher::new(), dir.path(), HashMode::Full).unwrap_err();
        assert!(err.to_string().contains("is a directory"));
    }

    #[test]
    fn test_hash_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("f");
        fs::write(&file, "abc").unwrap();

        let code = run_without_config(&["hash", file.to_str().unwrap()]).unwrap();
        assert_eq!(code, ExitCode::Success);
    }
}
