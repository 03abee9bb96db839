// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Run orchestration: read and expand the source, run both passes,
//! emit the requested outputs.

use crate::containers::ProgramFile;
use crate::core::error::{AsmError, AsmErrorKind, AsmRunError, AsmRunReport};
use crate::core::source::read_source;

use super::cli::{validate_cli, Cli, CliConfig, OutputFormat};
use super::engine::Assembler;
use super::output;

/// Run the assembler with parsed command-line arguments.
pub fn run_with_cli(cli: &Cli) -> Result<AsmRunReport, AsmRunError> {
    let config = validate_cli(cli).map_err(|err| AsmRunError::new(err, Vec::new()))?;
    run_with_config(&config)
}

pub fn run_with_config(config: &CliConfig) -> Result<AsmRunReport, AsmRunError> {
    let lines =
        read_source(&config.input).map_err(|err| AsmRunError::new(err, Vec::new()))?;

    let mut assembler = Assembler::new();
    let parse_counts = assembler.parse(&lines);
    let pass1 = assembler.pass1();
    if parse_counts.errors + pass1.errors > 0 {
        return Err(AsmRunError::new(
            AsmError::new(AsmErrorKind::Syntax, "errors detected in source", None),
            assembler.take_diagnostics(),
        ));
    }

    let pass2 = assembler.pass2();
    if pass2.errors > 0 {
        return Err(AsmRunError::new(
            AsmError::new(AsmErrorKind::Syntax, "assembly failed in pass 2", None),
            assembler.take_diagnostics(),
        ));
    }

    if config.symbols {
        if config.format == OutputFormat::Text {
            println!("-- Symbol Table --");
        }
        print!("{}", output::render_symbols(&assembler.symbols, config.format));
        if config.format == OutputFormat::Json {
            println!();
        }
    }

    if config.print {
        if config.format == OutputFormat::Text {
            println!("-- Assembled Statements --");
        }
        print!(
            "{}",
            output::render_listing(&assembler.statements, config.format)
        );
        if config.format == OutputFormat::Json {
            println!();
        }
    }

    if let Some(path) = &config.to_bin {
        output::write_bin(path, config.append, &assembler.image)
            .map_err(|err| run_error(err, &mut assembler))?;
    }

    if config.to_cas.is_some() || config.to_dsk.is_some() {
        let name = assembler
            .state
            .program_name
            .clone()
            .or_else(|| config.name.clone())
            .ok_or_else(|| {
                run_error(
                    AsmError::new(
                        AsmErrorKind::Io,
                        "no program name: use NAM in the source or --name",
                        None,
                    ),
                    &mut assembler,
                )
            })?;
        let program = ProgramFile::object(
            &name,
            assembler.load_addr(),
            assembler.exec_addr(),
            assembler.image.contiguous_bytes(),
        );

        if let Some(path) = &config.to_cas {
            output::write_cassette(path, config.append, &program)
                .map_err(|err| run_error(err, &mut assembler))?;
        }
        if let Some(path) = &config.to_dsk {
            output::write_disk(path, config.append, &program)
                .map_err(|err| run_error(err, &mut assembler))?;
        }
    }

    Ok(AsmRunReport::new(assembler.take_diagnostics(), lines))
}

fn run_error(err: AsmError, assembler: &mut Assembler) -> AsmRunError {
    AsmRunError::new(err, assembler.take_diagnostics())
}
