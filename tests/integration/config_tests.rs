use clap::Parser;
use dupdiff::cli::Cli;
use dupdiff::config::{Config, ConfigError};
use dupdiff::error::ExitCode;
use dupdiff::scanner::HashAlgorithm;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

#[test]
fn test_config_file_values_are_loaded() {
    figment::Jail::expect_with(|jail| {
        jail.create_file(
            "dupdiff.toml",
            r#"
                algorithm = "sha256"
                io_threads = 3
                skip_hidden = true
                min_size = 10
            "#,
        )?;

        let config = Config::load_from_path(Path::new("dupdiff.toml")).unwrap();
        assert_eq!(config.algorithm, HashAlgorithm::Sha256);
        assert_eq!(config.io_threads, 3);
        assert!(config.skip_hidden);
        assert_eq!(config.min_size, Some(10));
        assert_eq!(config.block_size, 4096);
        Ok(())
    });
}

#[test]
fn test_environment_beats_file() {
    figment::Jail::expect_with(|jail| {
        jail.create_file("dupdiff.toml", "algorithm = \"sha256\"")?;
        jail.set_env("DUPDIFF_ALGORITHM", "blake3");
        jail.set_env("DUPDIFF_PREFIX_LEN", "1024");

        let config = Config::load_from_path(Path::new("dupdiff.toml")).unwrap();
        assert_eq!(config.algorithm, HashAlgorithm::Blake3);
        assert_eq!(config.prefix_len, Some(1024));
        Ok(())
    });
}

#[test]
fn test_zero_threads_rejected() {
    figment::Jail::expect_with(|jail| {
        jail.create_file("dupdiff.toml", "io_threads = 0")?;
        let err = Config::load_from_path(Path::new("dupdiff.toml")).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "io_threads",
                ..
            }
        ));
        Ok(())
    });
}

#[test]
fn test_invalid_config_fails_the_run() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("bad.toml");
    fs::write(&config, "block_size = 0\n").unwrap();

    let cli = Cli::try_parse_from([
        "dupdiff",
        "-q",
        "--config",
        config.to_str().unwrap(),
        "dupes",
        dir.path().to_str().unwrap(),
    ])
    .unwrap();

    let err = dupdiff::run_app(cli).unwrap_err();
    assert_eq!(dupdiff::exit_code_for_error(&err), ExitCode::GeneralError);
    assert!(format!("{:#}", err).contains("block_size"));
}

#[test]
fn test_cli_flags_override_config_file() {
    let dir = tempdir().unwrap();
    let data = dir.path().join("data");
    fs::create_dir(&data).unwrap();
    fs::write(data.join("a"), b"0123456789").unwrap();
    fs::write(data.join("b"), b"0123456789").unwrap();

    // The file excludes everything; the flag widens the window again.
    let config = dir.path().join("dd.toml");
    fs::write(&config, "min_size = 1000\n").unwrap();

    let run = |extra: &[&str]| {
        let mut argv = vec![
            "dupdiff",
            "-q",
            "--config",
            config.to_str().unwrap(),
            "dupes",
            data.to_str().unwrap(),
            "--output",
            "json",
        ];
        argv.extend_from_slice(extra);
        dupdiff::run_app(Cli::try_parse_from(argv).unwrap()).unwrap()
    };

    assert_eq!(run(&[]), ExitCode::NoDuplicates);
    assert_eq!(run(&["--min-size", "1"]), ExitCode::Success);
}
