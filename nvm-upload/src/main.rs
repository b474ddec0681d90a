// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Upload tool for NanoVM loaders over a serial line.
//!
//! Usage:
//!   nvm-upload /dev/ttyS0 9600 program.nvm
//!   nvm-upload /dev/ttyS0 asuro program.nvm
//!   nvm-upload --protocol ctbot /dev/ttyUSB0 ctbot program.nvm
//!   nvm-upload --list
//!
//! Exit status: 0 success, 2 usage, 3 image load, 4 unknown protocol or
//! target, 5 device open, 6 device timeout, 7 image rejected, 8 transfer
//! interrupted.

mod cli;

use std::process::ExitCode;

use clap::Parser;
use nvm_upload::{ErrorKind, UploadError};

/// Exit status for failures that are not an [`UploadError`].
const EXIT_OTHER: u8 = 1;

fn main() -> ExitCode {
    let args = cli::Cli::parse();
    init_logging(args.verbose);

    match cli::run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            let kind = err.downcast_ref::<UploadError>().map(UploadError::kind);
            if kind == Some(ErrorKind::Usage) {
                eprintln!("Run 'nvm-upload --help' for usage.");
            }
            ExitCode::from(kind.map(ErrorKind::exit_code).unwrap_or(EXIT_OTHER))
        }
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}
