// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! The two-pass driver.
//!
//! Pass 1 walks the statements assigning addresses and defining
//! symbols, using the encoder's size rule (pessimistic on forward
//! references). Pass 2 re-encodes with the complete symbol table,
//! honoring pass-1 sizes, and emits bytes into the image. Pass 1
//! collects every error it finds; pass 2 stops at the first.

use crate::core::error::{AsmError, AsmErrorKind, Diagnostic, PassCounts, Severity};
use crate::core::expr::{self, EvalOutcome, Expr};
use crate::core::imagestore::ImageStore;
use crate::core::parser::{self, PseudoOp, Statement, StatementKind};
use crate::core::symbol_table::{SymbolInsert, SymbolKind, SymbolTable};
use crate::m6809::handler::{encode, EncodeContext};

/// Mutable assembly-wide state threaded through the passes.
#[derive(Debug, Default)]
pub struct AssemblerState {
    pub program_counter: u16,
    pub direct_page: u8,
    pub program_name: Option<String>,
    pub origin: Option<u16>,
    pub exec_addr: Option<u16>,
}

#[derive(Debug, Default)]
pub struct Assembler {
    pub symbols: SymbolTable,
    pub statements: Vec<Statement>,
    pub image: ImageStore,
    pub state: AssemblerState,
    diagnostics: Vec<Diagnostic>,
}

impl Assembler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    fn push_error(&mut self, line: u32, error: AsmError) {
        self.diagnostics
            .push(Diagnostic::new(line, Severity::Error, error));
    }

    fn push_warnings(&mut self, line: u32, warnings: Vec<AsmError>) {
        for warning in warnings {
            self.diagnostics
                .push(Diagnostic::new(line, Severity::Warning, warning));
        }
    }

    /// Warn when a pass-1 directive value gets truncated to 16 bits.
    fn warn_if_wide(&mut self, line: u32, value: i32) {
        if !expr::value_fits_word(value) {
            self.push_warnings(
                line,
                vec![AsmError::new(
                    AsmErrorKind::ValueOutOfRange,
                    &format!("value {value} truncated to 16 bits"),
                    None,
                )],
            );
        }
    }

    /// Parse the expanded source lines into statement records,
    /// collecting every parse error.
    pub fn parse(&mut self, lines: &[String]) -> PassCounts {
        let mut counts = PassCounts::new();
        self.statements = Vec::with_capacity(lines.len());
        for (index, line) in lines.iter().enumerate() {
            let line_num = index as u32 + 1;
            match parser::parse_line(line, line_num) {
                Ok(statement) => self.statements.push(statement),
                Err(err) => {
                    self.push_error(line_num, err);
                    counts.errors += 1;
                    self.statements.push(Statement {
                        line_num,
                        raw_text: line.clone(),
                        label: None,
                        mnemonic: None,
                        operand_text: None,
                        comment: None,
                        kind: StatementKind::Empty,
                        address: 0,
                        size: 0,
                        bytes: Vec::new(),
                    });
                }
            }
        }
        counts.lines = lines.len() as u32;
        counts
    }

    /// Evaluate an expression that must resolve during pass 1
    /// (`ORG`, `EQU`, `SETDP`, `RMB`).
    fn eval_pass1(&self, expr: &Expr) -> Result<i32, AsmError> {
        match expr::eval(expr, &self.symbols) {
            Ok(EvalOutcome::Value(value)) => Ok(value),
            Ok(EvalOutcome::Unresolved(name)) => Err(AsmError::new(
                AsmErrorKind::UnresolvedSymbol,
                "expression must resolve in pass 1",
                Some(&name),
            )),
            Err(err) => Err(AsmError::new(AsmErrorKind::Syntax, &err.message, None)),
        }
    }

    fn define_label(&mut self, statement_index: usize, value: u16, kind: SymbolKind) {
        let statement = &self.statements[statement_index];
        let Some(label) = statement.label.clone() else {
            return;
        };
        let line = statement.line_num;
        if self.symbols.define(&label, value, kind, line) == SymbolInsert::Duplicate {
            self.push_error(
                line,
                AsmError::new(AsmErrorKind::DuplicateSymbol, "symbol redefined", Some(&label)),
            );
        }
    }

    fn errors_since(&self, mark: usize) -> u32 {
        self.diagnostics[mark..]
            .iter()
            .filter(|d| d.severity() == Severity::Error)
            .count() as u32
    }

    /// Pass 1: assign addresses and sizes, define symbols.
    pub fn pass1(&mut self) -> PassCounts {
        let mut counts = PassCounts::new();
        let mark = self.diagnostics.len();
        let mut pc: u16 = 0;
        let mut dp: u8 = 0;

        for index in 0..self.statements.len() {
            counts.lines += 1;
            let kind = self.statements[index].kind.clone();
            self.statements[index].address = pc;

            let size: u16 = match &kind {
                StatementKind::Empty => {
                    self.define_label(index, pc, SymbolKind::Address);
                    0
                }
                StatementKind::Pseudo(op) => match op {
                    PseudoOp::Org(expr) => {
                        match self.eval_pass1(expr) {
                            Ok(value) => {
                                let line = self.statements[index].line_num;
                                self.warn_if_wide(line, value);
                                pc = value as u16;
                                self.statements[index].address = pc;
                                if self.state.origin.is_none() {
                                    self.state.origin = Some(pc);
                                }
                                self.define_label(index, pc, SymbolKind::Address);
                            }
                            Err(err) => {
                                let line = self.statements[index].line_num;
                                self.push_error(line, err);
                            }
                        }
                        0
                    }
                    PseudoOp::Equ(expr) => {
                        let line = self.statements[index].line_num;
                        if self.statements[index].label.is_none() {
                            self.push_error(
                                line,
                                AsmError::new(AsmErrorKind::Syntax, "EQU requires a label", None),
                            );
                        } else {
                            match self.eval_pass1(expr) {
                                Ok(value) => {
                                    self.warn_if_wide(line, value);
                                    self.define_label(index, value as u16, SymbolKind::Equate);
                                }
                                Err(err) => {
                                    self.push_error(line, err);
                                }
                            }
                        }
                        0
                    }
                    PseudoOp::SetDp(expr) => {
                        match self.eval_pass1(expr) {
                            Ok(value) => dp = value as u8,
                            Err(err) => {
                                let line = self.statements[index].line_num;
                                self.push_error(line, err);
                            }
                        }
                        0
                    }
                    PseudoOp::Nam(name) => {
                        self.state.program_name = Some(name.clone());
                        self.define_label(index, pc, SymbolKind::Address);
                        0
                    }
                    PseudoOp::End(_) => {
                        self.define_label(index, pc, SymbolKind::Address);
                        // Statements after END are ignored.
                        break;
                    }
                    PseudoOp::Fcb(exprs) => {
                        self.define_label(index, pc, SymbolKind::Address);
                        exprs.len() as u16
                    }
                    PseudoOp::Fdb(exprs) => {
                        self.define_label(index, pc, SymbolKind::Address);
                        2 * exprs.len() as u16
                    }
                    PseudoOp::Fcc(bytes) => {
                        self.define_label(index, pc, SymbolKind::Address);
                        bytes.len() as u16
                    }
                    PseudoOp::Rmb(expr) => {
                        self.define_label(index, pc, SymbolKind::Address);
                        match self.eval_pass1(expr) {
                            Ok(value) if (0..=0xFFFF).contains(&value) => value as u16,
                            Ok(value) => {
                                let line = self.statements[index].line_num;
                                self.push_error(
                                    line,
                                    AsmError::new(
                                        AsmErrorKind::ValueOutOfRange,
                                        &format!("RMB count {value} out of range"),
                                        None,
                                    ),
                                );
                                0
                            }
                            Err(err) => {
                                let line = self.statements[index].line_num;
                                self.push_error(line, err);
                                0
                            }
                        }
                    }
                    PseudoOp::Include(_) => {
                        let line = self.statements[index].line_num;
                        self.push_error(
                            line,
                            AsmError::new(
                                AsmErrorKind::Syntax,
                                "INCLUDE was not expanded by the source reader",
                                None,
                            ),
                        );
                        0
                    }
                },
                StatementKind::Instruction { mnemonic, operand } => {
                    self.define_label(index, pc, SymbolKind::Address);
                    let ctx = EncodeContext {
                        symbols: &self.symbols,
                        pc,
                        dp,
                    };
                    match encode(mnemonic, operand, &ctx, None) {
                        Ok(pkg) => pkg.size,
                        Err(err) => {
                            let line = self.statements[index].line_num;
                            self.push_error(line, err);
                            0
                        }
                    }
                }
            };

            if pc as u32 + size as u32 > 0x1_0000 {
                let line = self.statements[index].line_num;
                self.push_error(
                    line,
                    AsmError::new(
                        AsmErrorKind::ValueOutOfRange,
                        "statement runs past the top of the 64 KB address space",
                        None,
                    ),
                );
            }
            self.statements[index].size = size;
            pc = pc.wrapping_add(size);
        }

        self.state.program_counter = pc;
        self.state.direct_page = dp;
        counts.errors = self.errors_since(mark);
        counts
    }

    /// Pass 2: final encoding, byte emission, fail-fast.
    pub fn pass2(&mut self) -> PassCounts {
        let mut counts = PassCounts::new();
        let mark = self.diagnostics.len();
        let mut dp: u8 = 0;

        for index in 0..self.statements.len() {
            counts.lines += 1;
            let kind = self.statements[index].kind.clone();
            let address = self.statements[index].address;
            let size = self.statements[index].size;
            let line = self.statements[index].line_num;

            let bytes: Vec<u8> = match &kind {
                StatementKind::Empty => Vec::new(),
                StatementKind::Pseudo(op) => match op {
                    PseudoOp::Org(_) | PseudoOp::Equ(_) | PseudoOp::Nam(_) => Vec::new(),
                    PseudoOp::Include(_) => Vec::new(),
                    PseudoOp::SetDp(expr) => {
                        match self.eval_pass1(expr) {
                            Ok(value) => dp = value as u8,
                            Err(err) => {
                                self.push_error(line, err);
                                counts.errors += 1;
                                return counts;
                            }
                        }
                        Vec::new()
                    }
                    PseudoOp::End(expr) => {
                        let exec = match expr {
                            Some(expr) => match self.eval_pass1(expr) {
                                Ok(value) => Some(value as u16),
                                Err(err) => {
                                    self.push_error(line, err);
                                    counts.errors += 1;
                                    return counts;
                                }
                            },
                            None => self.state.origin,
                        };
                        self.state.exec_addr = exec.or(Some(0));
                        break;
                    }
                    PseudoOp::Fcb(exprs) => {
                        match self.emit_data(exprs, 1, line) {
                            Ok(bytes) => bytes,
                            Err(err) => {
                                self.push_error(line, err);
                                counts.errors += 1;
                                return counts;
                            }
                        }
                    }
                    PseudoOp::Fdb(exprs) => {
                        match self.emit_data(exprs, 2, line) {
                            Ok(bytes) => bytes,
                            Err(err) => {
                                self.push_error(line, err);
                                counts.errors += 1;
                                return counts;
                            }
                        }
                    }
                    PseudoOp::Fcc(bytes) => bytes.clone(),
                    PseudoOp::Rmb(_) => vec![0; size as usize],
                },
                StatementKind::Instruction { mnemonic, operand } => {
                    let ctx = EncodeContext {
                        symbols: &self.symbols,
                        pc: address,
                        dp,
                    };
                    match encode(mnemonic, operand, &ctx, Some(size)) {
                        Ok(pkg) => {
                            self.push_warnings(line, pkg.warnings);
                            pkg.bytes
                        }
                        Err(err) => {
                            self.push_error(line, err);
                            counts.errors += 1;
                            return counts;
                        }
                    }
                }
            };

            if bytes.len() as u16 != size {
                self.push_error(
                    line,
                    AsmError::new(
                        AsmErrorKind::ValueOutOfRange,
                        &format!(
                            "pass 2 emitted {} bytes where pass 1 sized {size}",
                            bytes.len()
                        ),
                        None,
                    ),
                );
                counts.errors += 1;
                return counts;
            }

            if !bytes.is_empty() {
                self.image.store_slice(address, &bytes);
            }
            self.statements[index].bytes = bytes;
        }

        if self.state.exec_addr.is_none() {
            self.state.exec_addr = self.state.origin.or(Some(0));
        }
        counts.warnings = self.diagnostics[mark..]
            .iter()
            .filter(|d| d.severity() == Severity::Warning)
            .count() as u32;
        counts
    }

    fn emit_data(&mut self, exprs: &[Expr], width: u16, line: u32) -> Result<Vec<u8>, AsmError> {
        let mut bytes = Vec::with_capacity(exprs.len() * width as usize);
        let mut warnings = Vec::new();
        for expr in exprs {
            let value = match expr::eval(expr, &self.symbols) {
                Ok(EvalOutcome::Value(value)) => value,
                Ok(EvalOutcome::Unresolved(name)) => {
                    return Err(AsmError::new(
                        AsmErrorKind::UnresolvedSymbol,
                        "unresolved symbol",
                        Some(&name),
                    ))
                }
                Err(err) => return Err(AsmError::new(AsmErrorKind::Syntax, &err.message, None)),
            };
            match width {
                1 => {
                    if !expr::value_fits_byte(value) {
                        warnings.push(AsmError::new(
                            AsmErrorKind::ValueOutOfRange,
                            &format!("value {value} truncated to 8 bits"),
                            None,
                        ));
                    }
                    bytes.push(value as u8);
                }
                _ => {
                    if !expr::value_fits_word(value) {
                        warnings.push(AsmError::new(
                            AsmErrorKind::ValueOutOfRange,
                            &format!("value {value} truncated to 16 bits"),
                            None,
                        ));
                    }
                    bytes.extend_from_slice(&(value as u16).to_be_bytes());
                }
            }
        }
        self.push_warnings(line, warnings);
        Ok(bytes)
    }

    /// Load address of the assembled image (its lowest emitted byte).
    pub fn load_addr(&self) -> u16 {
        self.image
            .output_range()
            .map(|(min, _)| min)
            .or(self.state.origin)
            .unwrap_or(0)
    }

    pub fn exec_addr(&self) -> u16 {
        self.state.exec_addr.or(self.state.origin).unwrap_or(0)
    }
}
