// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Error types, diagnostics, and run reports for the assembler.

use std::fmt;
use std::sync::Arc;

/// Categories of assembler errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsmErrorKind {
    Lex,
    Syntax,
    UnresolvedSymbol,
    DuplicateSymbol,
    ValueOutOfRange,
    IllegalAddressingMode,
    IllegalIndexedCombination,
    DirectPageMismatch,
    IncludeCycle,
    Io,
    ContainerFull,
}

/// An assembler error with a kind and message.
#[derive(Debug, Clone)]
pub struct AsmError {
    kind: AsmErrorKind,
    message: String,
}

impl AsmError {
    pub fn new(kind: AsmErrorKind, msg: &str, param: Option<&str>) -> Self {
        Self {
            kind,
            message: format_error(msg, param),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> AsmErrorKind {
        self.kind
    }
}

impl fmt::Display for AsmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AsmError {}

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// A diagnostic message tied to a source line.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    line: u32,
    column: Option<usize>,
    severity: Severity,
    error: AsmError,
}

impl Diagnostic {
    pub fn new(line: u32, severity: Severity, error: AsmError) -> Self {
        Self {
            line,
            column: None,
            severity,
            error,
        }
    }

    pub fn with_column(mut self, column: Option<usize>) -> Self {
        self.column = column;
        self
    }

    /// Render as `line N: message` for stderr.
    pub fn format(&self) -> String {
        let sev = match self.severity {
            Severity::Warning => "warning: ",
            Severity::Error => "",
        };
        format!("line {}: {}{}", self.line, sev, self.error.message())
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn column(&self) -> Option<usize> {
        self.column
    }

    pub fn kind(&self) -> AsmErrorKind {
        self.error.kind()
    }

    pub fn message(&self) -> &str {
        self.error.message()
    }
}

/// Report from a successful assembly run.
#[derive(Debug)]
pub struct AsmRunReport {
    diagnostics: Vec<Diagnostic>,
    source_lines: Arc<Vec<String>>,
}

impl AsmRunReport {
    pub fn new(diagnostics: Vec<Diagnostic>, source_lines: impl Into<Arc<Vec<String>>>) -> Self {
        Self {
            diagnostics,
            source_lines: source_lines.into(),
        }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn source_lines(&self) -> &[String] {
        &self.source_lines
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count()
    }
}

/// Error from a failed assembly run.
#[derive(Debug)]
pub struct AsmRunError {
    error: AsmError,
    diagnostics: Vec<Diagnostic>,
}

impl AsmRunError {
    pub fn new(error: AsmError, diagnostics: Vec<Diagnostic>) -> Self {
        Self { error, diagnostics }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn error(&self) -> &AsmError {
        &self.error
    }
}

impl fmt::Display for AsmRunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl std::error::Error for AsmRunError {}

/// Pass statistics.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassCounts {
    pub lines: u32,
    pub errors: u32,
    pub warnings: u32,
}

impl PassCounts {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Format an error message with an optional parameter.
pub fn format_error(msg: &str, param: Option<&str>) -> String {
    match param {
        Some(p) => format!("{msg}: {p}"),
        None => msg.to_string(),
    }
}
