// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Statement records and syntactic addressing-mode classification.
//!
//! The parser turns one source line into a [`Statement`]: the four
//! columns plus a classified operand. Classification is first-match-
//! wins over the operand's shape; the encoder later validates that the
//! mode is legal for the mnemonic.

use crate::core::error::{AsmError, AsmErrorKind};
use crate::core::expr::{parse_expr, Expr};
use crate::core::tokenizer::{is_ident_char, is_ident_start, scan_fields, split_operand};
use crate::m6809::table::{self, RegisterOp};

/// Syntactic operand classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperandClass {
    Inherent,
    Immediate(Expr),
    ExtendedIndirect(Expr),
    Indexed(IndexedOperand),
    ProgramCounterRelative { offset: Expr, indirect: bool },
    ForceDirect(Expr),
    ForceExtended(Expr),
    Relative(Expr),
    RegisterPair(String, String),
    RegisterList(Vec<String>),
    Expression(Expr),
}

/// Offset column of an indexed operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexedOffset {
    None,
    AccumulatorA,
    AccumulatorB,
    AccumulatorD,
    Expr(Expr),
}

/// Auto-increment/decrement decoration on the base register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncDec {
    None,
    Inc1,
    Inc2,
    Dec1,
    Dec2,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedOperand {
    pub offset: IndexedOffset,
    pub base: String,
    pub inc_dec: IncDec,
    pub indirect: bool,
}

/// Assembler directives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PseudoOp {
    Org(Expr),
    Equ(Expr),
    Nam(String),
    End(Option<Expr>),
    SetDp(Expr),
    Fcb(Vec<Expr>),
    Fdb(Vec<Expr>),
    Fcc(Vec<u8>),
    Rmb(Expr),
    Include(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementKind {
    /// Blank, comment-only, or label-only line.
    Empty,
    Instruction {
        mnemonic: String,
        operand: OperandClass,
    },
    Pseudo(PseudoOp),
}

/// One parsed source statement. `address`, `size`, and `bytes` are
/// filled in by the two passes.
#[derive(Debug, Clone)]
pub struct Statement {
    pub line_num: u32,
    pub raw_text: String,
    pub label: Option<String>,
    pub mnemonic: Option<String>,
    pub operand_text: Option<String>,
    pub comment: Option<String>,
    pub kind: StatementKind,
    pub address: u16,
    pub size: u16,
    pub bytes: Vec<u8>,
}

impl Statement {
    /// True for blank lines only; labels, mnemonics, and comments all
    /// keep their line in the listing.
    pub fn is_empty(&self) -> bool {
        matches!(self.kind, StatementKind::Empty)
            && self.label.is_none()
            && self.comment.is_none()
    }
}

const PSEUDO_MNEMONICS: &[&str] = &[
    "ORG", "EQU", "NAM", "END", "SETDP", "FCB", "FDB", "FCC", "RMB", "INCLUDE",
];

pub fn is_pseudo_mnemonic(mnemonic: &str) -> bool {
    PSEUDO_MNEMONICS
        .iter()
        .any(|p| p.eq_ignore_ascii_case(mnemonic))
}

fn syntax_error(msg: &str, param: Option<&str>) -> AsmError {
    AsmError::new(AsmErrorKind::Syntax, msg, param)
}

/// Parse one source line into a statement.
pub fn parse_line(line: &str, line_num: u32) -> Result<Statement, AsmError> {
    if !line.is_ascii() {
        return Err(AsmError::new(
            AsmErrorKind::Lex,
            "source lines must be ASCII",
            None,
        ));
    }
    let fields = scan_fields(line, line_num);
    let mut statement = Statement {
        line_num,
        raw_text: line.to_string(),
        label: None,
        mnemonic: fields.mnemonic.clone(),
        operand_text: None,
        comment: fields.comment.clone(),
        kind: StatementKind::Empty,
        address: 0,
        size: 0,
        bytes: Vec::new(),
    };

    if let Some(label) = &fields.label {
        validate_label(label)?;
        statement.label = Some(label.clone());
    }

    let Some(mnemonic) = fields.mnemonic else {
        return Ok(statement);
    };

    let raw_operand = fields.operand.unwrap_or_default();
    if is_pseudo_mnemonic(&mnemonic) {
        let (op, operand_text, comment) = parse_pseudo(&mnemonic, &raw_operand)?;
        statement.operand_text = operand_text;
        if comment.is_some() {
            statement.comment = comment;
        }
        statement.kind = StatementKind::Pseudo(op);
        return Ok(statement);
    }

    let Some(entry) = table::lookup(&mnemonic) else {
        return Err(syntax_error("unknown mnemonic", Some(&mnemonic)));
    };

    let (operand, comment) = split_operand(&raw_operand);
    if !operand.is_empty() {
        statement.operand_text = Some(operand.to_string());
    }
    if let Some(comment) = comment {
        statement.comment = Some(comment.to_string());
    }

    let operand = classify_operand(operand, entry.register_op, entry.branch.is_some())?;
    statement.kind = StatementKind::Instruction { mnemonic, operand };
    Ok(statement)
}

fn validate_label(label: &str) -> Result<(), AsmError> {
    let bytes = label.as_bytes();
    let valid = !bytes.is_empty()
        && is_ident_start(bytes[0])
        && bytes.iter().all(|&c| is_ident_char(c));
    if valid {
        Ok(())
    } else {
        Err(AsmError::new(
            AsmErrorKind::Lex,
            "invalid label",
            Some(label),
        ))
    }
}

/// Classify the operand text per the mode table, first match wins.
pub fn classify_operand(
    operand: &str,
    register_op: Option<RegisterOp>,
    is_branch: bool,
) -> Result<OperandClass, AsmError> {
    let operand = operand.trim();
    if operand.is_empty() {
        return Ok(OperandClass::Inherent);
    }

    if let Some(rest) = operand.strip_prefix('#') {
        let expr = parse_operand_expr(rest)?;
        return Ok(OperandClass::Immediate(expr));
    }

    if let Some(op) = register_op {
        return classify_register_operand(operand, op);
    }

    if let Some(inner) = operand.strip_prefix('[') {
        let Some(inner) = inner.strip_suffix(']') else {
            return Err(syntax_error("unterminated indirect operand", Some(operand)));
        };
        return match split_top_level_comma(inner) {
            Some((left, right)) => classify_indexed(left, right, true),
            None => {
                let expr = parse_operand_expr(inner)?;
                Ok(OperandClass::ExtendedIndirect(expr))
            }
        };
    }

    if let Some((left, right)) = split_top_level_comma(operand) {
        return classify_indexed(left, right, false);
    }

    if let Some(rest) = operand.strip_prefix('<') {
        let expr = parse_operand_expr(rest)?;
        return Ok(OperandClass::ForceDirect(expr));
    }

    if let Some(rest) = operand.strip_prefix('>') {
        let expr = parse_operand_expr(rest)?;
        return Ok(OperandClass::ForceExtended(expr));
    }

    let expr = parse_operand_expr(operand)?;
    if is_branch {
        return Ok(OperandClass::Relative(expr));
    }
    Ok(OperandClass::Expression(expr))
}

fn classify_register_operand(operand: &str, op: RegisterOp) -> Result<OperandClass, AsmError> {
    let names: Vec<String> = operand
        .split(',')
        .map(|name| name.trim().to_ascii_uppercase())
        .collect();
    if names.iter().any(|name| name.is_empty()) {
        return Err(syntax_error("empty register name in list", Some(operand)));
    }
    match op {
        RegisterOp::Pair => {
            if names.len() != 2 {
                return Err(syntax_error(
                    "register pair requires exactly two registers",
                    Some(operand),
                ));
            }
            Ok(OperandClass::RegisterPair(
                names[0].clone(),
                names[1].clone(),
            ))
        }
        RegisterOp::PushPull { .. } => Ok(OperandClass::RegisterList(names)),
    }
}

fn classify_indexed(left: &str, right: &str, indirect: bool) -> Result<OperandClass, AsmError> {
    let left = left.trim();
    let right = right.trim();

    let (base, inc_dec) = split_base_register(right)?;

    if base.eq_ignore_ascii_case("PCR") {
        if inc_dec != IncDec::None {
            return Err(AsmError::new(
                AsmErrorKind::IllegalIndexedCombination,
                "auto-increment/decrement is not valid with PCR",
                None,
            ));
        }
        if left.is_empty() {
            return Err(syntax_error("PCR operand requires an offset", None));
        }
        let offset = parse_operand_expr(left)?;
        return Ok(OperandClass::ProgramCounterRelative { offset, indirect });
    }

    if !matches!(
        base.to_ascii_uppercase().as_str(),
        "X" | "Y" | "U" | "S"
    ) {
        return Err(syntax_error("invalid indexed base register", Some(&base)));
    }

    let offset = if left.is_empty() {
        IndexedOffset::None
    } else if inc_dec != IncDec::None {
        return Err(AsmError::new(
            AsmErrorKind::IllegalIndexedCombination,
            "offset not allowed with auto-increment/decrement",
            Some(left),
        ));
    } else {
        match left.to_ascii_uppercase().as_str() {
            "A" => IndexedOffset::AccumulatorA,
            "B" => IndexedOffset::AccumulatorB,
            "D" => IndexedOffset::AccumulatorD,
            _ => IndexedOffset::Expr(parse_operand_expr(left)?),
        }
    };

    Ok(OperandClass::Indexed(IndexedOperand {
        offset,
        base: base.to_ascii_uppercase(),
        inc_dec,
        indirect,
    }))
}

/// Strip auto-inc/dec decoration from the base register column.
fn split_base_register(text: &str) -> Result<(String, IncDec), AsmError> {
    if text.is_empty() {
        return Err(syntax_error("missing indexed base register", None));
    }
    if let Some(base) = text.strip_suffix("++") {
        return Ok((base.to_string(), IncDec::Inc2));
    }
    if let Some(base) = text.strip_suffix('+') {
        return Ok((base.to_string(), IncDec::Inc1));
    }
    if let Some(base) = text.strip_prefix("--") {
        return Ok((base.to_string(), IncDec::Dec2));
    }
    if let Some(base) = text.strip_prefix('-') {
        return Ok((base.to_string(), IncDec::Dec1));
    }
    Ok((text.to_string(), IncDec::None))
}

/// Split at the first comma outside parentheses and character literals.
fn split_top_level_comma(text: &str) -> Option<(&str, &str)> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut pos = 0;
    while pos < bytes.len() {
        match bytes[pos] {
            b'\'' => pos += 1,
            b'(' => depth += 1,
            b')' => depth = depth.saturating_sub(1),
            b',' if depth == 0 => {
                return Some((&text[..pos], &text[pos + 1..]));
            }
            _ => {}
        }
        pos += 1;
    }
    None
}

/// Parse an operand expression, rejecting force prefixes inside it.
fn parse_operand_expr(text: &str) -> Result<Expr, AsmError> {
    let text = text.trim();
    if text.starts_with('<') || text.starts_with('>') {
        return Err(syntax_error(
            "< and > apply only to whole direct/extended operands",
            Some(text),
        ));
    }
    parse_expr(text).map_err(|err| syntax_error(&err.message, None))
}

fn parse_pseudo(
    mnemonic: &str,
    raw_operand: &str,
) -> Result<(PseudoOp, Option<String>, Option<String>), AsmError> {
    let upper = mnemonic.to_ascii_uppercase();

    if upper == "FCC" {
        let (bytes, operand_text, comment) = parse_delimited_string(raw_operand)?;
        return Ok((PseudoOp::Fcc(bytes), Some(operand_text), comment));
    }

    let (operand, comment) = split_operand(raw_operand);
    let operand_text = (!operand.is_empty()).then(|| operand.to_string());
    let comment = comment.map(str::to_string);

    let op = match upper.as_str() {
        "ORG" => PseudoOp::Org(require_expr(&upper, operand)?),
        "EQU" => PseudoOp::Equ(require_expr(&upper, operand)?),
        "SETDP" => PseudoOp::SetDp(require_expr(&upper, operand)?),
        "RMB" => PseudoOp::Rmb(require_expr(&upper, operand)?),
        "NAM" => {
            if operand.is_empty() {
                return Err(syntax_error("NAM requires a program name", None));
            }
            PseudoOp::Nam(operand.to_string())
        }
        "END" => {
            if operand.is_empty() {
                PseudoOp::End(None)
            } else {
                PseudoOp::End(Some(parse_operand_expr(operand)?))
            }
        }
        "FCB" => PseudoOp::Fcb(parse_expr_list(&upper, operand)?),
        "FDB" => PseudoOp::Fdb(parse_expr_list(&upper, operand)?),
        "INCLUDE" => {
            let path = operand.trim_matches('"');
            if path.is_empty() {
                return Err(syntax_error("INCLUDE requires a quoted path", None));
            }
            PseudoOp::Include(path.to_string())
        }
        _ => unreachable!("pseudo list and match arms agree"),
    };
    Ok((op, operand_text, comment))
}

fn require_expr(mnemonic: &str, operand: &str) -> Result<Expr, AsmError> {
    if operand.is_empty() {
        return Err(syntax_error("directive requires an operand", Some(mnemonic)));
    }
    parse_operand_expr(operand)
}

fn parse_expr_list(mnemonic: &str, operand: &str) -> Result<Vec<Expr>, AsmError> {
    if operand.is_empty() {
        return Err(syntax_error("directive requires operands", Some(mnemonic)));
    }
    let mut exprs = Vec::new();
    let mut rest = operand;
    loop {
        match split_top_level_comma(rest) {
            Some((head, tail)) => {
                exprs.push(parse_operand_expr(head)?);
                rest = tail;
            }
            None => {
                exprs.push(parse_operand_expr(rest)?);
                return Ok(exprs);
            }
        }
    }
}

/// Parse an `FCC`-style delimited string: the first non-blank character
/// opens the string, the next occurrence of it closes it.
fn parse_delimited_string(
    raw: &str,
) -> Result<(Vec<u8>, String, Option<String>), AsmError> {
    let text = raw.trim_start();
    let mut chars = text.char_indices();
    let Some((_, delim)) = chars.next() else {
        return Err(AsmError::new(
            AsmErrorKind::Lex,
            "FCC requires a delimited string",
            None,
        ));
    };
    let body_start = delim.len_utf8();
    let Some(close) = text[body_start..].find(delim) else {
        return Err(AsmError::new(
            AsmErrorKind::Lex,
            "unterminated string",
            Some(text),
        ));
    };
    let body = &text[body_start..body_start + close];
    let end = body_start + close + delim.len_utf8();
    let operand_text = text[..end].to_string();
    let rest = text[end..].trim();
    let comment = rest
        .strip_prefix(';')
        .map(str::trim)
        .or_else(|| (!rest.is_empty()).then_some(rest))
        .map(str::to_string);
    Ok((body.bytes().collect(), operand_text, comment))
}
