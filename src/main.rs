//! Entry point for the dupdiff CLI.

use clap::Parser;
use dupdiff::{
    cli::Cli,
    error::{ExitCode, StructuredError},
};

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    let json_errors = cli.json_errors;

    match dupdiff::run_app(cli) {
        Ok(code) => code.into(),
        Err(err) => {
            let exit_code: ExitCode = dupdiff::exit_code_for_error(&err);

            if json_errors {
                match serde_json::to_string_pretty(&StructuredError::new(&err, exit_code)) {
                    Ok(json) => eprintln!("{}", json),
                    Err(_) => eprintln!("[{}] Error: {:#}", exit_code.code_prefix(), err),
                }
            } else {
                eprintln!("[{}] Error: {:#}", exit_code.code_prefix(), err);
            }

            exit_code.into()
        }
    }
}
