// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Instruction encoder.
//!
//! Pass 1 calls [`encode`] without an expected size to learn each
//! instruction's length, assuming the widest form wherever a forward
//! reference leaves the operand value unknown. Pass 2 passes the pass-1
//! size back in and the encoder honors it, so addresses never re-flow.

use crate::core::error::{AsmError, AsmErrorKind};
use crate::core::expr::{self, EvalContext, EvalOutcome, Expr};
use crate::core::parser::{IncDec, IndexedOffset, IndexedOperand, OperandClass};
use crate::core::symbol_table::SymbolTable;
use crate::m6809::operand::{
    post_byte, register_list_bit, register_pair_post_byte, IndexReg, IndexedForm, InterReg,
};
use crate::m6809::table::{self, opcode_len, push_opcode, BranchKind, ImmWidth, OpcodeEntry};

/// Evaluation context handed to the encoder by the pass drivers.
pub struct EncodeContext<'a> {
    pub symbols: &'a SymbolTable,
    /// Address of the instruction being encoded.
    pub pc: u16,
    pub dp: u8,
}

impl EvalContext for EncodeContext<'_> {
    fn lookup_symbol(&self, name: &str) -> Option<u16> {
        self.symbols.lookup(name)
    }
}

/// Encoder output for one instruction. `bytes` is meaningful only when
/// an expected size was supplied (pass 2); `size` always is.
#[derive(Debug, Clone, Default)]
pub struct CodePackage {
    pub bytes: Vec<u8>,
    pub size: u16,
    pub warnings: Vec<AsmError>,
}

impl CodePackage {
    fn sized(size: u16) -> Self {
        Self {
            size,
            ..Self::default()
        }
    }
}

fn illegal_mode(mnemonic: &str, mode: &str) -> AsmError {
    AsmError::new(
        AsmErrorKind::IllegalAddressingMode,
        &format!("{mnemonic} does not support {mode} addressing"),
        None,
    )
}

/// Evaluate an operand expression. `Ok(None)` means an unresolved
/// symbol, which is legal while sizing (pass 1) and fatal once
/// finalizing (pass 2).
fn eval_operand(
    expr: &Expr,
    ctx: &EncodeContext<'_>,
    finalize: bool,
) -> Result<Option<i32>, AsmError> {
    match expr::eval(expr, ctx) {
        Ok(EvalOutcome::Value(value)) => Ok(Some(value)),
        Ok(EvalOutcome::Unresolved(name)) => {
            if finalize {
                Err(AsmError::new(
                    AsmErrorKind::UnresolvedSymbol,
                    "unresolved symbol",
                    Some(&name),
                ))
            } else {
                Ok(None)
            }
        }
        Err(err) => Err(AsmError::new(AsmErrorKind::Syntax, &err.message, None)),
    }
}

fn truncate_byte(value: i32, warnings: &mut Vec<AsmError>) -> u8 {
    if !expr::value_fits_byte(value) {
        warnings.push(AsmError::new(
            AsmErrorKind::ValueOutOfRange,
            &format!("value {value} truncated to 8 bits"),
            None,
        ));
    }
    value as u8
}

fn truncate_word(value: i32, warnings: &mut Vec<AsmError>) -> u16 {
    if !expr::value_fits_word(value) {
        warnings.push(AsmError::new(
            AsmErrorKind::ValueOutOfRange,
            &format!("value {value} truncated to 16 bits"),
            None,
        ));
    }
    value as u16
}

/// Encode one instruction.
///
/// `expected_size` is `None` in pass 1 (size discovery) and the pass-1
/// size in pass 2 (byte emission). The returned package's size always
/// equals the pass-1 size for the same inputs.
pub fn encode(
    mnemonic: &str,
    operand: &OperandClass,
    ctx: &EncodeContext<'_>,
    expected_size: Option<u16>,
) -> Result<CodePackage, AsmError> {
    let entry = table::lookup(mnemonic)
        .ok_or_else(|| AsmError::new(AsmErrorKind::Syntax, "unknown mnemonic", Some(mnemonic)))?;
    let finalize = expected_size.is_some();

    match operand {
        OperandClass::Inherent => {
            let opcode = entry
                .modes
                .inh
                .ok_or_else(|| illegal_mode(mnemonic, "inherent"))?;
            let mut pkg = CodePackage::sized(opcode_len(opcode));
            if finalize {
                push_opcode(&mut pkg.bytes, opcode);
            }
            Ok(pkg)
        }

        OperandClass::Immediate(expr) => {
            let opcode = entry
                .modes
                .imm
                .ok_or_else(|| illegal_mode(mnemonic, "immediate"))?;
            if entry.register_op.is_some() {
                return Err(illegal_mode(mnemonic, "immediate"));
            }
            let width: u16 = match entry.imm_width {
                ImmWidth::Byte => 1,
                ImmWidth::Word => 2,
            };
            let mut pkg = CodePackage::sized(opcode_len(opcode) + width);
            if finalize {
                let value = eval_operand(expr, ctx, true)?.expect("finalized");
                push_opcode(&mut pkg.bytes, opcode);
                match entry.imm_width {
                    ImmWidth::Byte => {
                        let byte = truncate_byte(value, &mut pkg.warnings);
                        pkg.bytes.push(byte);
                    }
                    ImmWidth::Word => {
                        let word = truncate_word(value, &mut pkg.warnings);
                        pkg.bytes.extend_from_slice(&word.to_be_bytes());
                    }
                }
            }
            Ok(pkg)
        }

        OperandClass::Expression(expr) => {
            encode_memory(entry, mnemonic, expr, ctx, expected_size, Force::None)
        }
        OperandClass::ForceDirect(expr) => {
            encode_memory(entry, mnemonic, expr, ctx, expected_size, Force::Direct)
        }
        OperandClass::ForceExtended(expr) => {
            encode_memory(entry, mnemonic, expr, ctx, expected_size, Force::Extended)
        }

        OperandClass::ExtendedIndirect(expr) => {
            let opcode = entry
                .modes
                .idx
                .ok_or_else(|| illegal_mode(mnemonic, "indexed"))?;
            let mut pkg = CodePackage::sized(opcode_len(opcode) + 3);
            if finalize {
                let value = eval_operand(expr, ctx, true)?.expect("finalized");
                let word = truncate_word(value, &mut pkg.warnings);
                push_opcode(&mut pkg.bytes, opcode);
                pkg.bytes.push(0x9F);
                pkg.bytes.extend_from_slice(&word.to_be_bytes());
            }
            Ok(pkg)
        }

        OperandClass::Indexed(indexed) => {
            encode_indexed(entry, mnemonic, indexed, ctx, expected_size)
        }

        OperandClass::ProgramCounterRelative { offset, indirect } => {
            encode_pcr(entry, mnemonic, offset, *indirect, ctx, expected_size)
        }

        OperandClass::Relative(expr) => encode_relative(entry, mnemonic, expr, ctx, expected_size),

        OperandClass::RegisterPair(src, dst) => {
            let opcode = entry
                .modes
                .imm
                .filter(|_| entry.register_op == Some(table::RegisterOp::Pair))
                .ok_or_else(|| illegal_mode(mnemonic, "register pair"))?;
            let src = InterReg::from_name(src)
                .ok_or_else(|| AsmError::new(AsmErrorKind::Syntax, "unknown register", Some(src)))?;
            let dst = InterReg::from_name(dst)
                .ok_or_else(|| AsmError::new(AsmErrorKind::Syntax, "unknown register", Some(dst)))?;
            let post = register_pair_post_byte(src, dst)
                .map_err(|msg| AsmError::new(AsmErrorKind::Syntax, &msg, None))?;
            let mut pkg = CodePackage::sized(opcode_len(opcode) + 1);
            if finalize {
                push_opcode(&mut pkg.bytes, opcode);
                pkg.bytes.push(post);
            }
            Ok(pkg)
        }

        OperandClass::RegisterList(names) => {
            let (opcode, user_stack) = match (entry.modes.imm, entry.register_op) {
                (Some(opcode), Some(table::RegisterOp::PushPull { user_stack })) => {
                    (opcode, user_stack)
                }
                _ => return Err(illegal_mode(mnemonic, "register list")),
            };
            let mut mask = 0u8;
            for name in names {
                let bit = register_list_bit(name, user_stack)
                    .map_err(|msg| AsmError::new(AsmErrorKind::Syntax, &msg, None))?;
                mask |= bit;
            }
            let mut pkg = CodePackage::sized(opcode_len(opcode) + 1);
            if finalize {
                push_opcode(&mut pkg.bytes, opcode);
                pkg.bytes.push(mask);
            }
            Ok(pkg)
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Force {
    None,
    Direct,
    Extended,
}

/// Direct/extended memory access, with the direct-page optimization:
/// a value on the current direct page uses the 1-byte form unless `>`
/// forces extended; a forward reference sizes as extended and stays
/// extended in pass 2.
fn encode_memory(
    entry: &OpcodeEntry,
    mnemonic: &str,
    expr: &Expr,
    ctx: &EncodeContext<'_>,
    expected_size: Option<u16>,
    force: Force,
) -> Result<CodePackage, AsmError> {
    if entry.register_op.is_some() || entry.branch.is_some() {
        return Err(illegal_mode(mnemonic, "memory"));
    }
    let finalize = expected_size.is_some();
    let value = eval_operand(expr, ctx, finalize)?;

    let dir_size = entry.modes.dir.map(|op| opcode_len(op) + 1);
    let ext_size = entry.modes.ext.map(|op| opcode_len(op) + 2);

    let on_direct_page = |value: i32| (value as u16) >> 8 == ctx.dp as u16;

    let use_direct = match force {
        Force::Direct => {
            if entry.modes.dir.is_none() {
                return Err(illegal_mode(mnemonic, "direct"));
            }
            if let Some(value) = value {
                if !on_direct_page(value) {
                    return Err(AsmError::new(
                        AsmErrorKind::DirectPageMismatch,
                        &format!(
                            "forced direct operand ${:04X} is not on direct page ${:02X}",
                            value as u16, ctx.dp
                        ),
                        None,
                    ));
                }
            }
            true
        }
        Force::Extended => {
            if entry.modes.ext.is_none() {
                return Err(illegal_mode(mnemonic, "extended"));
            }
            false
        }
        Force::None => match expected_size {
            // Pass 2: the pass-1 size decides the form.
            Some(expected) => entry.modes.dir.is_some() && dir_size == Some(expected),
            // Pass 1: direct only when the value is already known.
            None => match value {
                Some(value) => {
                    entry.modes.dir.is_some()
                        && (entry.modes.ext.is_none() || on_direct_page(value))
                }
                None => entry.modes.ext.is_none(),
            },
        },
    };

    if use_direct {
        let opcode = entry
            .modes
            .dir
            .ok_or_else(|| illegal_mode(mnemonic, "direct"))?;
        let mut pkg = CodePackage::sized(dir_size.expect("direct size"));
        if finalize {
            let value = value.expect("finalized");
            push_opcode(&mut pkg.bytes, opcode);
            pkg.bytes.push(value as u8);
        }
        Ok(pkg)
    } else {
        let opcode = entry
            .modes
            .ext
            .ok_or_else(|| illegal_mode(mnemonic, "extended"))?;
        let mut pkg = CodePackage::sized(ext_size.expect("extended size"));
        if finalize {
            let value = value.expect("finalized");
            let word = truncate_word(value, &mut pkg.warnings);
            push_opcode(&mut pkg.bytes, opcode);
            pkg.bytes.extend_from_slice(&word.to_be_bytes());
        }
        Ok(pkg)
    }
}

fn indexed_error(msg: String) -> AsmError {
    AsmError::new(AsmErrorKind::IllegalIndexedCombination, &msg, None)
}

fn encode_indexed(
    entry: &OpcodeEntry,
    mnemonic: &str,
    indexed: &IndexedOperand,
    ctx: &EncodeContext<'_>,
    expected_size: Option<u16>,
) -> Result<CodePackage, AsmError> {
    let opcode = entry
        .modes
        .idx
        .ok_or_else(|| illegal_mode(mnemonic, "indexed"))?;
    let finalize = expected_size.is_some();
    let reg = IndexReg::from_name(&indexed.base).ok_or_else(|| {
        AsmError::new(
            AsmErrorKind::Syntax,
            "invalid indexed base register",
            Some(&indexed.base),
        )
    })?;
    let base_size = opcode_len(opcode) + 1;

    // Constant-offset operands carry their value; the other forms are
    // fully determined by syntax.
    let (form, value) = match indexed.inc_dec {
        IncDec::Inc1 => (IndexedForm::PostInc1, None),
        IncDec::Inc2 => (IndexedForm::PostInc2, None),
        IncDec::Dec1 => (IndexedForm::PreDec1, None),
        IncDec::Dec2 => (IndexedForm::PreDec2, None),
        IncDec::None => match &indexed.offset {
            IndexedOffset::None => (IndexedForm::Zero, None),
            IndexedOffset::AccumulatorA => (IndexedForm::AccumulatorA, None),
            IndexedOffset::AccumulatorB => (IndexedForm::AccumulatorB, None),
            IndexedOffset::AccumulatorD => (IndexedForm::AccumulatorD, None),
            IndexedOffset::Expr(expr) => {
                let value = eval_operand(expr, ctx, finalize)?;
                let form = match expected_size {
                    // Pass 2: honor the pass-1 width.
                    Some(expected) => match expected.saturating_sub(base_size) {
                        0 => {
                            let value = value.expect("finalized");
                            if value == 0 {
                                IndexedForm::Zero
                            } else {
                                IndexedForm::Const5(value as i8)
                            }
                        }
                        1 => IndexedForm::Const8,
                        _ => IndexedForm::Const16,
                    },
                    // Pass 1: narrowest form the known value permits;
                    // unknown values size as 16-bit constants.
                    None => match value {
                        Some(0) => IndexedForm::Zero,
                        Some(v) if (-16..=15).contains(&v) && !indexed.indirect => {
                            IndexedForm::Const5(v as i8)
                        }
                        Some(v) if (-128..=127).contains(&v) => IndexedForm::Const8,
                        Some(v) if expr::value_fits_word(v) => IndexedForm::Const16,
                        Some(v) => {
                            return Err(AsmError::new(
                                AsmErrorKind::ValueOutOfRange,
                                &format!("indexed offset {v} out of 16-bit range"),
                                None,
                            ))
                        }
                        None => IndexedForm::Const16,
                    },
                };
                (form, value)
            }
        },
    };

    let post = post_byte(reg, form, indexed.indirect).map_err(indexed_error)?;
    let mut pkg = CodePackage::sized(base_size + form.extra_bytes());
    if finalize {
        push_opcode(&mut pkg.bytes, opcode);
        pkg.bytes.push(post);
        match form {
            IndexedForm::Const8 => {
                let value = value.expect("const offset");
                if !(-128..=127).contains(&value) {
                    return Err(AsmError::new(
                        AsmErrorKind::ValueOutOfRange,
                        &format!("indexed offset {value} does not fit in 8 bits"),
                        None,
                    ));
                }
                pkg.bytes.push(value as i8 as u8);
            }
            IndexedForm::Const16 => {
                let value = value.expect("const offset");
                let word = truncate_word(value, &mut pkg.warnings);
                pkg.bytes.extend_from_slice(&word.to_be_bytes());
            }
            _ => {}
        }
    }
    Ok(pkg)
}

fn encode_pcr(
    entry: &OpcodeEntry,
    mnemonic: &str,
    offset: &Expr,
    indirect: bool,
    ctx: &EncodeContext<'_>,
    expected_size: Option<u16>,
) -> Result<CodePackage, AsmError> {
    let opcode = entry
        .modes
        .idx
        .ok_or_else(|| illegal_mode(mnemonic, "indexed"))?;
    let finalize = expected_size.is_some();
    let base_size = opcode_len(opcode) + 1;
    let target = eval_operand(offset, ctx, finalize)?;

    // A pure constant is the displacement itself; a symbolic offset is
    // a target address, measured from the end of the instruction. Each
    // candidate width has its own reference point.
    let literal = !offset.has_symbols();
    let disp_for = |extra: u16, value: i32| {
        if literal {
            return value as i16;
        }
        let pc_after = ctx.pc.wrapping_add(base_size + extra);
        (value as u16).wrapping_sub(pc_after) as i16
    };

    let form = match expected_size {
        Some(expected) => {
            if expected.saturating_sub(base_size) == 1 {
                IndexedForm::Pcr8
            } else {
                IndexedForm::Pcr16
            }
        }
        None => match target {
            Some(target) if (-128..=127).contains(&(disp_for(1, target) as i32)) => {
                IndexedForm::Pcr8
            }
            _ => IndexedForm::Pcr16,
        },
    };

    let post = post_byte(IndexReg::X, form, indirect).map_err(indexed_error)?;
    let mut pkg = CodePackage::sized(base_size + form.extra_bytes());
    if finalize {
        let target = target.expect("finalized");
        push_opcode(&mut pkg.bytes, opcode);
        pkg.bytes.push(post);
        match form {
            IndexedForm::Pcr8 => {
                let disp = disp_for(1, target);
                if !(-128..=127).contains(&(disp as i32)) {
                    return Err(AsmError::new(
                        AsmErrorKind::ValueOutOfRange,
                        &format!("PC-relative displacement {disp} does not fit in 8 bits"),
                        None,
                    ));
                }
                pkg.bytes.push(disp as i8 as u8);
            }
            _ => {
                let disp = disp_for(2, target);
                pkg.bytes.extend_from_slice(&disp.to_be_bytes());
            }
        }
    }
    Ok(pkg)
}

fn encode_relative(
    entry: &OpcodeEntry,
    mnemonic: &str,
    expr: &Expr,
    ctx: &EncodeContext<'_>,
    expected_size: Option<u16>,
) -> Result<CodePackage, AsmError> {
    let (opcode, kind) = match (entry.modes.rel, entry.branch) {
        (Some(opcode), Some(kind)) => (opcode, kind),
        _ => return Err(illegal_mode(mnemonic, "relative")),
    };
    let finalize = expected_size.is_some();
    let disp_bytes: u16 = match kind {
        BranchKind::Short => 1,
        BranchKind::Long => 2,
    };
    let size = opcode_len(opcode) + disp_bytes;
    let mut pkg = CodePackage::sized(size);

    let target = eval_operand(expr, ctx, finalize)?;
    if finalize {
        let target = target.expect("finalized") as u16;
        let pc_after = ctx.pc.wrapping_add(size);
        let disp = target.wrapping_sub(pc_after) as i16;
        push_opcode(&mut pkg.bytes, opcode);
        match kind {
            BranchKind::Short => {
                if !(-128..=127).contains(&(disp as i32)) {
                    return Err(AsmError::new(
                        AsmErrorKind::ValueOutOfRange,
                        &format!(
                            "branch target out of range: displacement {disp} (use L{})",
                            mnemonic.to_ascii_uppercase()
                        ),
                        None,
                    ));
                }
                pkg.bytes.push(disp as i8 as u8);
            }
            BranchKind::Long => {
                pkg.bytes.extend_from_slice(&disp.to_be_bytes());
            }
        }
    }
    Ok(pkg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parser::classify_operand;
    use crate::core::symbol_table::{SymbolKind, SymbolTable};

    fn encode_str(
        mnemonic: &str,
        operand: &str,
        symbols: &SymbolTable,
        pc: u16,
        dp: u8,
    ) -> Result<Vec<u8>, AsmError> {
        let entry = table::lookup(mnemonic).unwrap();
        let class = classify_operand(operand, entry.register_op, entry.branch.is_some())?;
        let ctx = EncodeContext { symbols, pc, dp };
        let sized = encode(mnemonic, &class, &ctx, None)?;
        let full = encode(mnemonic, &class, &ctx, Some(sized.size))?;
        assert_eq!(full.size, sized.size, "pass sizes must agree");
        assert_eq!(full.bytes.len() as u16, full.size);
        Ok(full.bytes)
    }

    fn encode_ok(mnemonic: &str, operand: &str) -> Vec<u8> {
        encode_str(mnemonic, operand, &SymbolTable::new(), 0, 0).unwrap()
    }

    #[test]
    fn inherent_encodings() {
        assert_eq!(encode_ok("NOP", ""), vec![0x12]);
        assert_eq!(encode_ok("RTS", ""), vec![0x39]);
        assert_eq!(encode_ok("SWI2", ""), vec![0x10, 0x3F]);
    }

    #[test]
    fn immediate_width_follows_mnemonic() {
        assert_eq!(encode_ok("LDA", "#65"), vec![0x86, 0x41]);
        assert_eq!(encode_ok("LDX", "#$1234"), vec![0x8E, 0x12, 0x34]);
        assert_eq!(encode_ok("LDY", "#$1234"), vec![0x10, 0x8E, 0x12, 0x34]);
    }

    #[test]
    fn direct_page_optimization() {
        assert_eq!(encode_ok("LDA", "65"), vec![0x96, 0x41]);
        assert_eq!(encode_ok("LDA", ">65"), vec![0xB6, 0x00, 0x41]);
        assert_eq!(encode_ok("LDA", "$1234"), vec![0xB6, 0x12, 0x34]);
    }

    #[test]
    fn setdp_changes_the_direct_window() {
        let symbols = SymbolTable::new();
        assert_eq!(
            encode_str("LDA", "$1234", &symbols, 0, 0x12).unwrap(),
            vec![0x96, 0x34]
        );
        assert_eq!(
            encode_str("LDA", "$41", &symbols, 0, 0x12).unwrap(),
            vec![0xB6, 0x00, 0x41]
        );
    }

    #[test]
    fn forced_direct_with_wrong_page_errors() {
        let err = encode_str("LDA", "<$1234", &SymbolTable::new(), 0, 0).unwrap_err();
        assert_eq!(err.kind(), AsmErrorKind::DirectPageMismatch);
    }

    #[test]
    fn forward_reference_sizes_as_extended_and_stays_extended() {
        // Symbol resolves to a direct-page value only in pass 2.
        let class = classify_operand("LATE", None, false).unwrap();
        let empty = SymbolTable::new();
        let ctx = EncodeContext {
            symbols: &empty,
            pc: 0,
            dp: 0,
        };
        let sized = encode("LDA", &class, &ctx, None).unwrap();
        assert_eq!(sized.size, 3);

        let mut symbols = SymbolTable::new();
        let _ = symbols.define("LATE", 0x41, SymbolKind::Address, 9);
        let ctx = EncodeContext {
            symbols: &symbols,
            pc: 0,
            dp: 0,
        };
        let full = encode("LDA", &class, &ctx, Some(sized.size)).unwrap();
        assert_eq!(full.bytes, vec![0xB6, 0x00, 0x41]);
    }

    #[test]
    fn indexed_constant_offsets_choose_narrowest_form() {
        assert_eq!(encode_ok("LDA", ",X"), vec![0xA6, 0x84]);
        assert_eq!(encode_ok("LDA", "5,X"), vec![0xA6, 0x05]);
        assert_eq!(encode_ok("LDA", "-1,Y"), vec![0xA6, 0x3F]);
        assert_eq!(encode_ok("LDA", "100,U"), vec![0xA6, 0xC8, 0x64]);
        assert_eq!(encode_ok("LDA", "$200,S"), vec![0xA6, 0xE9, 0x02, 0x00]);
    }

    #[test]
    fn indexed_zero_constant_uses_zero_offset_form() {
        assert_eq!(encode_ok("LDA", "0,X"), vec![0xA6, 0x84]);
    }

    #[test]
    fn indirect_constant_skips_the_five_bit_form() {
        assert_eq!(encode_ok("LDA", "[5,X]"), vec![0xA6, 0x98, 0x05]);
    }

    #[test]
    fn auto_increment_and_decrement() {
        assert_eq!(encode_ok("LDA", ",X+"), vec![0xA6, 0x80]);
        assert_eq!(encode_ok("LDA", ",X++"), vec![0xA6, 0x81]);
        assert_eq!(encode_ok("LDA", ",-X"), vec![0xA6, 0x82]);
        assert_eq!(encode_ok("LDA", ",--X"), vec![0xA6, 0x83]);
        assert_eq!(encode_ok("LDA", "[,Y++]"), vec![0xA6, 0xB1]);
    }

    #[test]
    fn indirect_single_step_is_illegal() {
        let err = encode_str("LDA", "[,X+]", &SymbolTable::new(), 0, 0).unwrap_err();
        assert_eq!(err.kind(), AsmErrorKind::IllegalIndexedCombination);
    }

    #[test]
    fn accumulator_offsets() {
        assert_eq!(encode_ok("LDA", "A,X"), vec![0xA6, 0x86]);
        assert_eq!(encode_ok("LDA", "B,Y"), vec![0xA6, 0xA5]);
        assert_eq!(encode_ok("LDA", "D,U"), vec![0xA6, 0xCB]);
    }

    #[test]
    fn extended_indirect() {
        assert_eq!(encode_ok("JMP", "[$FFFE]"), vec![0x6E, 0x9F, 0xFF, 0xFE]);
    }

    #[test]
    fn pcr_literal_offset_is_the_displacement() {
        assert_eq!(
            encode_str("LEAX", "5,PCR", &SymbolTable::new(), 0x1000, 0).unwrap(),
            vec![0x30, 0x8C, 0x05]
        );
    }

    #[test]
    fn pcr_symbolic_offset_measures_from_instruction_end() {
        // LEAX TARGET,PCR at $1000 targeting $1007: displacement is
        // measured from pc_after = $1003.
        let mut symbols = SymbolTable::new();
        let _ = symbols.define("TARGET", 0x1007, SymbolKind::Address, 1);
        assert_eq!(
            encode_str("LEAX", "TARGET,PCR", &symbols, 0x1000, 0).unwrap(),
            vec![0x30, 0x8C, 0x04]
        );
    }

    #[test]
    fn pcr_forward_reference_is_sixteen_bit() {
        let class = classify_operand("AHEAD,PCR", None, false).unwrap();
        let empty = SymbolTable::new();
        let ctx = EncodeContext {
            symbols: &empty,
            pc: 0x1000,
            dp: 0,
        };
        let sized = encode("LEAX", &class, &ctx, None).unwrap();
        assert_eq!(sized.size, 4);

        let mut symbols = SymbolTable::new();
        let _ = symbols.define("AHEAD", 0x1008, SymbolKind::Address, 5);
        let ctx = EncodeContext {
            symbols: &symbols,
            pc: 0x1000,
            dp: 0,
        };
        let full = encode("LEAX", &class, &ctx, Some(sized.size)).unwrap();
        assert_eq!(full.bytes, vec![0x30, 0x8D, 0x00, 0x04]);
    }

    #[test]
    fn short_branch_displacements() {
        let mut symbols = SymbolTable::new();
        let _ = symbols.define("BACK", 0x0E00, SymbolKind::Address, 1);
        assert_eq!(
            encode_str("BRA", "BACK", &symbols, 0x0E10, 0).unwrap(),
            vec![0x20, 0xEE]
        );
    }

    #[test]
    fn short_branch_out_of_range_errors() {
        let mut symbols = SymbolTable::new();
        let _ = symbols.define("FAR", 0x1000, SymbolKind::Address, 1);
        let err = encode_str("BEQ", "FAR", &symbols, 0x0100, 0).unwrap_err();
        assert_eq!(err.kind(), AsmErrorKind::ValueOutOfRange);
    }

    #[test]
    fn long_branch_encodings() {
        let mut symbols = SymbolTable::new();
        let _ = symbols.define("FAR", 0x1000, SymbolKind::Address, 1);
        assert_eq!(
            encode_str("LBEQ", "FAR", &symbols, 0x0100, 0).unwrap(),
            vec![0x10, 0x27, 0x0E, 0xFC]
        );
        assert_eq!(
            encode_str("LBRA", "FAR", &symbols, 0x0100, 0).unwrap(),
            vec![0x16, 0x0E, 0xFD]
        );
    }

    #[test]
    fn register_pair_and_list_post_bytes() {
        assert_eq!(encode_ok("TFR", "X,Y"), vec![0x1F, 0x12]);
        assert_eq!(encode_ok("EXG", "A,B"), vec![0x1E, 0x89]);
        assert_eq!(encode_ok("PSHS", "CC,A,B,X,U,PC"), vec![0x34, 0xD7]);
        assert_eq!(encode_ok("PULU", "S,D"), vec![0x37, 0x46]);
    }

    #[test]
    fn mixed_width_register_pair_errors() {
        assert!(encode_str("TFR", "A,X", &SymbolTable::new(), 0, 0).is_err());
    }

    #[test]
    fn illegal_mode_reports_kind() {
        let err = encode_str("LEAX", "#5", &SymbolTable::new(), 0, 0).unwrap_err();
        assert_eq!(err.kind(), AsmErrorKind::IllegalAddressingMode);
        let err = encode_str("STA", "#5", &SymbolTable::new(), 0, 0).unwrap_err();
        assert_eq!(err.kind(), AsmErrorKind::IllegalAddressingMode);
    }

    #[test]
    fn immediate_truncation_warns() {
        let entry = table::lookup("LDA").unwrap();
        let class = classify_operand("#300", entry.register_op, false).unwrap();
        let symbols = SymbolTable::new();
        let ctx = EncodeContext {
            symbols: &symbols,
            pc: 0,
            dp: 0,
        };
        let pkg = encode("LDA", &class, &ctx, Some(2)).unwrap();
        assert_eq!(pkg.bytes, vec![0x86, 0x2C]);
        assert_eq!(pkg.warnings.len(), 1);
        assert_eq!(pkg.warnings[0].kind(), AsmErrorKind::ValueOutOfRange);
    }
}
