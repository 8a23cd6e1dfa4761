//! media-fixer - Media Library Audio Fixer
//!
//! Entry point for the media-fixer CLI application.

use clap::Parser;
use media_fixer::{cli::Cli, error::ExitCode};

fn main() {
    let cli = Cli::parse();

    match media_fixer::run_app(cli) {
        Ok(code) => std::process::exit(code.as_i32()),
        Err(err) => {
            let exit_code = ExitCode::GeneralError;
            eprintln!("[{}] Error: {:#}", exit_code.code_prefix(), err);
            std::process::exit(exit_code.as_i32());
        }
    }
}
