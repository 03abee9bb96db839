// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Numeric expression parsing and evaluation.
//!
//! Grammar: `expr := term (('+'|'-') term)*`,
//! `term := factor (('*'|'/') factor)*`,
//! `factor := number | symbol | '(' expr ')' | '-' factor`.
//! All arithmetic is 32-bit signed; truncation to an operand width is
//! the encoder's job.

use crate::core::tokenizer::{is_ident_char, is_ident_start, is_space};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Number(i32),
    Symbol(String),
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Minus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

/// Error from expression parsing or evaluation.
#[derive(Debug, Clone)]
pub struct ExprError {
    pub message: String,
}

impl ExprError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ExprError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ExprError {}

/// Context for expression evaluation.
pub trait EvalContext {
    /// Look up a symbol's value by name. `None` means the symbol is not
    /// (yet) defined.
    fn lookup_symbol(&self, name: &str) -> Option<u16>;
}

impl EvalContext for crate::core::symbol_table::SymbolTable {
    fn lookup_symbol(&self, name: &str) -> Option<u16> {
        self.lookup(name)
    }
}

/// Evaluation result: a value, or the name of the first symbol that did
/// not resolve. Unresolved symbols are legal in pass 1 and fatal in
/// pass 2; the caller decides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalOutcome {
    Value(i32),
    Unresolved(String),
}

impl EvalOutcome {
    #[must_use]
    pub fn resolved(&self) -> Option<i32> {
        match self {
            Self::Value(v) => Some(*v),
            Self::Unresolved(_) => None,
        }
    }
}

impl Expr {
    /// True when the expression references any symbol.
    #[must_use]
    pub fn has_symbols(&self) -> bool {
        match self {
            Self::Number(_) => false,
            Self::Symbol(_) => true,
            Self::Unary { expr, .. } => expr.has_symbols(),
            Self::Binary { left, right, .. } => left.has_symbols() || right.has_symbols(),
        }
    }
}

/// Evaluate an expression over the given context.
pub fn eval(expr: &Expr, ctx: &dyn EvalContext) -> Result<EvalOutcome, ExprError> {
    match expr {
        Expr::Number(value) => Ok(EvalOutcome::Value(*value)),
        Expr::Symbol(name) => match ctx.lookup_symbol(name) {
            Some(value) => Ok(EvalOutcome::Value(value as i32)),
            None => Ok(EvalOutcome::Unresolved(name.clone())),
        },
        Expr::Unary { op, expr } => match eval(expr, ctx)? {
            EvalOutcome::Value(value) => Ok(EvalOutcome::Value(apply_unary(*op, value))),
            unresolved => Ok(unresolved),
        },
        Expr::Binary { op, left, right } => {
            let left = eval(left, ctx)?;
            let right = eval(right, ctx)?;
            match (left, right) {
                (EvalOutcome::Value(l), EvalOutcome::Value(r)) => {
                    Ok(EvalOutcome::Value(apply_binary(*op, l, r)?))
                }
                (EvalOutcome::Unresolved(name), _) | (_, EvalOutcome::Unresolved(name)) => {
                    Ok(EvalOutcome::Unresolved(name))
                }
            }
        }
    }
}

fn apply_unary(op: UnaryOp, value: i32) -> i32 {
    match op {
        UnaryOp::Minus => value.wrapping_neg(),
    }
}

fn apply_binary(op: BinaryOp, l: i32, r: i32) -> Result<i32, ExprError> {
    Ok(match op {
        BinaryOp::Add => l.wrapping_add(r),
        BinaryOp::Subtract => l.wrapping_sub(r),
        BinaryOp::Multiply => l.wrapping_mul(r),
        BinaryOp::Divide => {
            if r == 0 {
                return Err(ExprError::new("division by zero"));
            }
            l.wrapping_div(r)
        }
    })
}

/// Parse a complete operand expression. Trailing input is an error.
pub fn parse_expr(text: &str) -> Result<Expr, ExprError> {
    let mut parser = ExprParser::new(text);
    let expr = parser.parse_expr()?;
    parser.skip_ws();
    if !parser.at_end() {
        return Err(ExprError::new(format!(
            "unexpected trailing input in expression: {}",
            parser.rest()
        )));
    }
    Ok(expr)
}

struct ExprParser<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> ExprParser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            input: text.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(is_space) {
            self.pos += 1;
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn rest(&self) -> String {
        String::from_utf8_lossy(&self.input[self.pos..]).into_owned()
    }

    fn parse_expr(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_term()?;
        loop {
            self.skip_ws();
            let op = match self.peek() {
                Some(b'+') => BinaryOp::Add,
                Some(b'-') => BinaryOp::Subtract,
                _ => return Ok(left),
            };
            self.bump();
            let right = self.parse_term()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }

    fn parse_term(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_factor()?;
        loop {
            self.skip_ws();
            let op = match self.peek() {
                Some(b'*') => BinaryOp::Multiply,
                Some(b'/') => BinaryOp::Divide,
                _ => return Ok(left),
            };
            self.bump();
            let right = self.parse_factor()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }

    fn parse_factor(&mut self) -> Result<Expr, ExprError> {
        self.skip_ws();
        match self.peek() {
            Some(b'-') => {
                self.bump();
                let expr = self.parse_factor()?;
                Ok(Expr::Unary {
                    op: UnaryOp::Minus,
                    expr: Box::new(expr),
                })
            }
            Some(b'(') => {
                self.bump();
                let expr = self.parse_expr()?;
                self.skip_ws();
                if self.bump() != Some(b')') {
                    return Err(ExprError::new("missing closing parenthesis"));
                }
                Ok(expr)
            }
            Some(b'\'') => {
                self.bump();
                match self.bump() {
                    Some(c) => Ok(Expr::Number(c as i32)),
                    None => Err(ExprError::new("character literal missing its character")),
                }
            }
            Some(b'$') | Some(b'%') | Some(b'@') => self.parse_number(),
            Some(c) if c.is_ascii_digit() => self.parse_number(),
            Some(c) if is_ident_start(c) => {
                let start = self.pos;
                while self.peek().is_some_and(is_ident_char) {
                    self.pos += 1;
                }
                let name = String::from_utf8_lossy(&self.input[start..self.pos]).into_owned();
                Ok(Expr::Symbol(name))
            }
            Some(c) => Err(ExprError::new(format!(
                "unexpected character in expression: {}",
                c as char
            ))),
            None => Err(ExprError::new("empty expression")),
        }
    }

    fn parse_number(&mut self) -> Result<Expr, ExprError> {
        let radix = match self.peek() {
            Some(b'$') => {
                self.bump();
                16
            }
            Some(b'%') => {
                self.bump();
                2
            }
            Some(b'@') => {
                self.bump();
                8
            }
            _ => 10,
        };
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_alphanumeric()) {
            self.pos += 1;
        }
        let digits = std::str::from_utf8(&self.input[start..self.pos]).unwrap_or("");
        if digits.is_empty() {
            return Err(ExprError::new("number literal missing digits"));
        }
        // Parse through i64 so $FFFFFFFF-style literals wrap into the
        // 32-bit domain instead of failing.
        let value = i64::from_str_radix(digits, radix)
            .map_err(|_| ExprError::new(format!("invalid number: {digits}")))?;
        Ok(Expr::Number(value as i32))
    }
}

/// Parse a standalone number literal (`$HEX`, `%BIN`, `@OCT`, decimal).
pub fn parse_number(text: &str) -> Option<i32> {
    match parse_expr(text) {
        Ok(Expr::Number(value)) => Some(value),
        Ok(Expr::Unary {
            op: UnaryOp::Minus,
            expr,
        }) => match *expr {
            Expr::Number(value) => Some(value.wrapping_neg()),
            _ => None,
        },
        _ => None,
    }
}

/// Returns true if the value fits in a signed or unsigned 8-bit byte.
pub fn value_fits_byte(value: i32) -> bool {
    (-128..=0xff).contains(&value)
}

/// Returns true if the value fits in a signed or unsigned 16-bit word.
pub fn value_fits_word(value: i32) -> bool {
    (-32768..=0xffff).contains(&value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    struct NoSymbols;

    impl EvalContext for NoSymbols {
        fn lookup_symbol(&self, _name: &str) -> Option<u16> {
            None
        }
    }

    struct OneSymbol(&'static str, u16);

    impl EvalContext for OneSymbol {
        fn lookup_symbol(&self, name: &str) -> Option<u16> {
            name.eq_ignore_ascii_case(self.0).then_some(self.1)
        }
    }

    fn eval_str(text: &str, ctx: &dyn EvalContext) -> EvalOutcome {
        eval(&parse_expr(text).unwrap(), ctx).unwrap()
    }

    #[test]
    fn parses_all_number_bases() {
        assert_eq!(parse_number("$1234"), Some(0x1234));
        assert_eq!(parse_number("%1010"), Some(10));
        assert_eq!(parse_number("@17"), Some(15));
        assert_eq!(parse_number("42"), Some(42));
        assert_eq!(parse_number("-42"), Some(-42));
    }

    #[test]
    fn character_literal_is_its_byte_value() {
        assert_eq!(eval_str("'A", &NoSymbols), EvalOutcome::Value(0x41));
        assert_eq!(eval_str("'0", &NoSymbols), EvalOutcome::Value(0x30));
    }

    #[test]
    fn precedence_multiplication_over_addition() {
        assert_eq!(eval_str("2+3*4", &NoSymbols), EvalOutcome::Value(14));
        assert_eq!(eval_str("(2+3)*4", &NoSymbols), EvalOutcome::Value(20));
        assert_eq!(eval_str("10-4/2", &NoSymbols), EvalOutcome::Value(8));
    }

    #[test]
    fn unary_minus_binds_tightly() {
        assert_eq!(eval_str("-2+5", &NoSymbols), EvalOutcome::Value(3));
        assert_eq!(eval_str("4*-2", &NoSymbols), EvalOutcome::Value(-8));
    }

    #[test]
    fn symbols_resolve_through_context() {
        let ctx = OneSymbol("START", 0x0E00);
        assert_eq!(eval_str("START+3", &ctx), EvalOutcome::Value(0x0E03));
        assert_eq!(
            eval_str("MISSING+3", &ctx),
            EvalOutcome::Unresolved("MISSING".to_string())
        );
    }

    #[test]
    fn division_by_zero_is_an_error() {
        let expr = parse_expr("4/0").unwrap();
        assert!(eval(&expr, &NoSymbols).is_err());
    }

    #[test]
    fn trailing_garbage_is_rejected() {
        assert!(parse_expr("1 2").is_err());
        assert!(parse_expr("$").is_err());
        assert!(parse_expr("(1").is_err());
    }

    #[test]
    fn fits_helpers_cover_both_signs() {
        assert!(value_fits_byte(255));
        assert!(value_fits_byte(-128));
        assert!(!value_fits_byte(256));
        assert!(value_fits_word(0xFFFF));
        assert!(value_fits_word(-32768));
        assert!(!value_fits_word(0x10000));
    }

    proptest! {
        #[test]
        fn decimal_literals_round_trip(value in 0u32..=0x7FFF_FFFF) {
            let text = value.to_string();
            prop_assert_eq!(parse_number(&text), Some(value as i32));
        }

        #[test]
        fn hex_literals_round_trip(value in any::<u16>()) {
            let text = format!("${value:X}");
            prop_assert_eq!(parse_number(&text), Some(value as i32));
        }

        #[test]
        fn addition_matches_wrapping_semantics(a in any::<i16>(), b in any::<i16>()) {
            let text = format!("{a}+{b}");
            let expr = parse_expr(&text);
            prop_assume!(expr.is_ok());
            let got = eval(&expr.unwrap(), &NoSymbols).unwrap();
            prop_assert_eq!(got, EvalOutcome::Value((a as i32).wrapping_add(b as i32)));
        }
    }
}
