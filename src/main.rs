// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// CLI entrypoint for cocoForge.

use std::process::ExitCode;

use clap::Parser;

use cocoforge::assembler::cli::Cli;
use cocoforge::assembler::run_with_cli;

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run_with_cli(&cli) {
        Ok(report) => {
            for diag in report.diagnostics() {
                eprintln!("{}", diag.format());
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            for diag in err.diagnostics() {
                eprintln!("{}", diag.format());
            }
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
