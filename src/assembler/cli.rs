// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Command-line interface parsing and argument validation.

use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};

use crate::core::error::{AsmError, AsmErrorKind};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const LONG_ABOUT: &str = "Two-pass Motorola 6809 assembler, source-compatible with EDTASM+.

Assembles the input file and optionally packages the result as a raw
binary, a cassette image (.CAS), or a sectored disk image (.DSK).
Cassette and disk output need a program name from NAM or --name.
Diagnostics go to stderr as `line N: message`.";

#[derive(Parser, Debug)]
#[command(
    name = "cocoforge",
    version = VERSION,
    about = "Motorola 6809 assembler with CoCo cassette and disk output",
    long_about = LONG_ABOUT
)]
pub struct Cli {
    /// Assembly language input file.
    pub filename: PathBuf,

    #[arg(
        long = "print",
        action = ArgAction::SetTrue,
        long_help = "Print the assembled statement listing when finished."
    )]
    pub print: bool,

    #[arg(
        long = "symbols",
        action = ArgAction::SetTrue,
        long_help = "Print the symbol table when finished."
    )]
    pub symbols: bool,

    #[arg(
        long = "to_bin",
        value_name = "BIN_FILE",
        long_help = "Store the assembled program as a raw binary image in BIN_FILE."
    )]
    pub to_bin: Option<PathBuf>,

    #[arg(
        long = "to_cas",
        value_name = "CAS_FILE",
        long_help = "Store the assembled program in a cassette image CAS_FILE."
    )]
    pub to_cas: Option<PathBuf>,

    #[arg(
        long = "to_dsk",
        value_name = "DSK_FILE",
        long_help = "Store the assembled program in a disk image DSK_FILE."
    )]
    pub to_dsk: Option<PathBuf>,

    #[arg(
        long = "name",
        value_name = "NAME",
        long_help = "Program name for the cassette or disk directory entry; NAM in the source takes precedence."
    )]
    pub name: Option<String>,

    #[arg(
        long = "append",
        action = ArgAction::SetTrue,
        long_help = "Append to an existing cassette or disk image instead of refusing to overwrite it."
    )]
    pub append: bool,

    #[arg(
        long = "format",
        value_enum,
        default_value_t = OutputFormat::Text,
        long_help = "Rendering for --print and --symbols output. text is default; json is machine-readable."
    )]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Validated run configuration.
#[derive(Debug)]
pub struct CliConfig {
    pub input: PathBuf,
    pub print: bool,
    pub symbols: bool,
    pub to_bin: Option<PathBuf>,
    pub to_cas: Option<PathBuf>,
    pub to_dsk: Option<PathBuf>,
    pub name: Option<String>,
    pub append: bool,
    pub format: OutputFormat,
}

pub fn validate_cli(cli: &Cli) -> Result<CliConfig, AsmError> {
    if cli.append && cli.to_cas.is_none() && cli.to_dsk.is_none() && cli.to_bin.is_none() {
        return Err(AsmError::new(
            AsmErrorKind::Io,
            "--append requires a container output (--to_bin, --to_cas, or --to_dsk)",
            None,
        ));
    }
    if let Some(name) = &cli.name {
        if name.trim().is_empty() {
            return Err(AsmError::new(
                AsmErrorKind::Io,
                "--name must not be empty",
                None,
            ));
        }
    }
    Ok(CliConfig {
        input: cli.filename.clone(),
        print: cli.print,
        symbols: cli.symbols,
        to_bin: cli.to_bin.clone(),
        to_cas: cli.to_cas.clone(),
        to_dsk: cli.to_dsk.clone(),
        name: cli.name.clone(),
        append: cli.append,
        format: cli.format,
    })
}
