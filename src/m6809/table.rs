// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Static 6809 instruction table.
//!
//! One row per mnemonic, one optional opcode per addressing-mode
//! family. Page-prefixed opcodes ($10xx / $11xx) are stored as 16-bit
//! values and emitted as two bytes.

/// Opcodes per addressing-mode family. `None` marks an illegal mode
/// for the mnemonic.
#[derive(Debug, Clone, Copy)]
pub struct ModeSet {
    pub inh: Option<u16>,
    pub imm: Option<u16>,
    pub dir: Option<u16>,
    pub idx: Option<u16>,
    pub ext: Option<u16>,
    pub rel: Option<u16>,
}

const NO_MODES: ModeSet = ModeSet {
    inh: None,
    imm: None,
    dir: None,
    idx: None,
    ext: None,
    rel: None,
};

/// Width of an immediate operand, fixed by the mnemonic's register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImmWidth {
    Byte,
    Word,
}

/// Branch displacement width, fixed by the mnemonic (`Bxx` vs `LBxx`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchKind {
    Short,
    Long,
}

/// Post-byte driven register operand shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOp {
    /// `TFR`/`EXG`: source,destination pair.
    Pair,
    /// `PSHS`/`PULS`/`PSHU`/`PULU`; true when the mnemonic works the
    /// user stack (so `S` takes the bit-6 slot).
    PushPull { user_stack: bool },
}

#[derive(Debug, Clone, Copy)]
pub struct OpcodeEntry {
    pub mnemonic: &'static str,
    pub modes: ModeSet,
    pub imm_width: ImmWidth,
    pub branch: Option<BranchKind>,
    pub register_op: Option<RegisterOp>,
}

const fn inh(mnemonic: &'static str, opcode: u16) -> OpcodeEntry {
    OpcodeEntry {
        mnemonic,
        modes: ModeSet {
            inh: Some(opcode),
            ..NO_MODES
        },
        imm_width: ImmWidth::Byte,
        branch: None,
        register_op: None,
    }
}

/// Memory-operand row: direct, indexed, extended.
const fn mem(mnemonic: &'static str, dir: u16, idx: u16, ext: u16) -> OpcodeEntry {
    OpcodeEntry {
        mnemonic,
        modes: ModeSet {
            dir: Some(dir),
            idx: Some(idx),
            ext: Some(ext),
            ..NO_MODES
        },
        imm_width: ImmWidth::Byte,
        branch: None,
        register_op: None,
    }
}

/// Accumulator row: 8-bit immediate plus memory modes.
const fn acc8(mnemonic: &'static str, imm: u16, dir: u16, idx: u16, ext: u16) -> OpcodeEntry {
    OpcodeEntry {
        mnemonic,
        modes: ModeSet {
            imm: Some(imm),
            dir: Some(dir),
            idx: Some(idx),
            ext: Some(ext),
            ..NO_MODES
        },
        imm_width: ImmWidth::Byte,
        branch: None,
        register_op: None,
    }
}

/// Word-register row: 16-bit immediate plus memory modes.
const fn reg16(mnemonic: &'static str, imm: u16, dir: u16, idx: u16, ext: u16) -> OpcodeEntry {
    OpcodeEntry {
        mnemonic,
        modes: ModeSet {
            imm: Some(imm),
            dir: Some(dir),
            idx: Some(idx),
            ext: Some(ext),
            ..NO_MODES
        },
        imm_width: ImmWidth::Word,
        branch: None,
        register_op: None,
    }
}

/// Immediate-only row (ANDCC, ORCC, CWAI).
const fn imm8(mnemonic: &'static str, imm: u16) -> OpcodeEntry {
    OpcodeEntry {
        mnemonic,
        modes: ModeSet {
            imm: Some(imm),
            ..NO_MODES
        },
        imm_width: ImmWidth::Byte,
        branch: None,
        register_op: None,
    }
}

const fn branch(mnemonic: &'static str, rel: u16, kind: BranchKind) -> OpcodeEntry {
    OpcodeEntry {
        mnemonic,
        modes: ModeSet {
            rel: Some(rel),
            ..NO_MODES
        },
        imm_width: ImmWidth::Byte,
        branch: Some(kind),
        register_op: None,
    }
}

const fn regop(mnemonic: &'static str, opcode: u16, op: RegisterOp) -> OpcodeEntry {
    OpcodeEntry {
        mnemonic,
        modes: ModeSet {
            imm: Some(opcode),
            ..NO_MODES
        },
        imm_width: ImmWidth::Byte,
        branch: None,
        register_op: Some(op),
    }
}

const fn lea(mnemonic: &'static str, idx: u16) -> OpcodeEntry {
    OpcodeEntry {
        mnemonic,
        modes: ModeSet {
            idx: Some(idx),
            ..NO_MODES
        },
        imm_width: ImmWidth::Byte,
        branch: None,
        register_op: None,
    }
}

pub static OPCODE_TABLE: &[OpcodeEntry] = &[
    inh("ABX", 0x3A),
    acc8("ADCA", 0x89, 0x99, 0xA9, 0xB9),
    acc8("ADCB", 0xC9, 0xD9, 0xE9, 0xF9),
    acc8("ADDA", 0x8B, 0x9B, 0xAB, 0xBB),
    acc8("ADDB", 0xCB, 0xDB, 0xEB, 0xFB),
    reg16("ADDD", 0xC3, 0xD3, 0xE3, 0xF3),
    acc8("ANDA", 0x84, 0x94, 0xA4, 0xB4),
    acc8("ANDB", 0xC4, 0xD4, 0xE4, 0xF4),
    imm8("ANDCC", 0x1C),
    inh("ASLA", 0x48),
    inh("ASLB", 0x58),
    mem("ASL", 0x08, 0x68, 0x78),
    inh("ASRA", 0x47),
    inh("ASRB", 0x57),
    mem("ASR", 0x07, 0x67, 0x77),
    acc8("BITA", 0x85, 0x95, 0xA5, 0xB5),
    acc8("BITB", 0xC5, 0xD5, 0xE5, 0xF5),
    inh("CLRA", 0x4F),
    inh("CLRB", 0x5F),
    mem("CLR", 0x0F, 0x6F, 0x7F),
    acc8("CMPA", 0x81, 0x91, 0xA1, 0xB1),
    acc8("CMPB", 0xC1, 0xD1, 0xE1, 0xF1),
    reg16("CMPD", 0x1083, 0x1093, 0x10A3, 0x10B3),
    reg16("CMPS", 0x118C, 0x119C, 0x11AC, 0x11BC),
    reg16("CMPU", 0x1183, 0x1193, 0x11A3, 0x11B3),
    reg16("CMPX", 0x8C, 0x9C, 0xAC, 0xBC),
    reg16("CMPY", 0x108C, 0x109C, 0x10AC, 0x10BC),
    inh("COMA", 0x43),
    inh("COMB", 0x53),
    mem("COM", 0x03, 0x63, 0x73),
    imm8("CWAI", 0x3C),
    inh("DAA", 0x19),
    inh("DECA", 0x4A),
    inh("DECB", 0x5A),
    mem("DEC", 0x0A, 0x6A, 0x7A),
    acc8("EORA", 0x88, 0x98, 0xA8, 0xB8),
    acc8("EORB", 0xC8, 0xD8, 0xE8, 0xF8),
    regop("EXG", 0x1E, RegisterOp::Pair),
    inh("INCA", 0x4C),
    inh("INCB", 0x5C),
    mem("INC", 0x0C, 0x6C, 0x7C),
    mem("JMP", 0x0E, 0x6E, 0x7E),
    mem("JSR", 0x9D, 0xAD, 0xBD),
    acc8("LDA", 0x86, 0x96, 0xA6, 0xB6),
    acc8("LDB", 0xC6, 0xD6, 0xE6, 0xF6),
    reg16("LDD", 0xCC, 0xDC, 0xEC, 0xFC),
    reg16("LDS", 0x10CE, 0x10DE, 0x10EE, 0x10FE),
    reg16("LDU", 0xCE, 0xDE, 0xEE, 0xFE),
    reg16("LDX", 0x8E, 0x9E, 0xAE, 0xBE),
    reg16("LDY", 0x108E, 0x109E, 0x10AE, 0x10BE),
    lea("LEAS", 0x32),
    lea("LEAU", 0x33),
    lea("LEAX", 0x30),
    lea("LEAY", 0x31),
    inh("LSLA", 0x48),
    inh("LSLB", 0x58),
    mem("LSL", 0x08, 0x68, 0x78),
    inh("LSRA", 0x44),
    inh("LSRB", 0x54),
    mem("LSR", 0x04, 0x64, 0x74),
    inh("MUL", 0x3D),
    inh("NEGA", 0x40),
    inh("NEGB", 0x50),
    mem("NEG", 0x00, 0x60, 0x70),
    inh("NOP", 0x12),
    acc8("ORA", 0x8A, 0x9A, 0xAA, 0xBA),
    acc8("ORB", 0xCA, 0xDA, 0xEA, 0xFA),
    imm8("ORCC", 0x1A),
    regop("PSHS", 0x34, RegisterOp::PushPull { user_stack: false }),
    regop("PSHU", 0x36, RegisterOp::PushPull { user_stack: true }),
    regop("PULS", 0x35, RegisterOp::PushPull { user_stack: false }),
    regop("PULU", 0x37, RegisterOp::PushPull { user_stack: true }),
    inh("ROLA", 0x49),
    inh("ROLB", 0x59),
    mem("ROL", 0x09, 0x69, 0x79),
    inh("RORA", 0x46),
    inh("RORB", 0x56),
    mem("ROR", 0x06, 0x66, 0x76),
    inh("RTI", 0x3B),
    inh("RTS", 0x39),
    acc8("SBCA", 0x82, 0x92, 0xA2, 0xB2),
    acc8("SBCB", 0xC2, 0xD2, 0xE2, 0xF2),
    inh("SEX", 0x1D),
    mem("STA", 0x97, 0xA7, 0xB7),
    mem("STB", 0xD7, 0xE7, 0xF7),
    mem("STD", 0xDD, 0xED, 0xFD),
    mem("STS", 0x10DF, 0x10EF, 0x10FF),
    mem("STU", 0xDF, 0xEF, 0xFF),
    mem("STX", 0x9F, 0xAF, 0xBF),
    mem("STY", 0x109F, 0x10AF, 0x10BF),
    acc8("SUBA", 0x80, 0x90, 0xA0, 0xB0),
    acc8("SUBB", 0xC0, 0xD0, 0xE0, 0xF0),
    reg16("SUBD", 0x83, 0x93, 0xA3, 0xB3),
    inh("SWI", 0x3F),
    inh("SWI2", 0x103F),
    inh("SWI3", 0x113F),
    inh("SYNC", 0x13),
    regop("TFR", 0x1F, RegisterOp::Pair),
    inh("TSTA", 0x4D),
    inh("TSTB", 0x5D),
    mem("TST", 0x0D, 0x6D, 0x7D),
    // Short branches
    branch("BCC", 0x24, BranchKind::Short),
    branch("BCS", 0x25, BranchKind::Short),
    branch("BEQ", 0x27, BranchKind::Short),
    branch("BGE", 0x2C, BranchKind::Short),
    branch("BGT", 0x2E, BranchKind::Short),
    branch("BHI", 0x22, BranchKind::Short),
    branch("BHS", 0x24, BranchKind::Short),
    branch("BLE", 0x2F, BranchKind::Short),
    branch("BLO", 0x25, BranchKind::Short),
    branch("BLS", 0x23, BranchKind::Short),
    branch("BLT", 0x2D, BranchKind::Short),
    branch("BMI", 0x2B, BranchKind::Short),
    branch("BNE", 0x26, BranchKind::Short),
    branch("BPL", 0x2A, BranchKind::Short),
    branch("BRA", 0x20, BranchKind::Short),
    branch("BRN", 0x21, BranchKind::Short),
    branch("BSR", 0x8D, BranchKind::Short),
    branch("BVC", 0x28, BranchKind::Short),
    branch("BVS", 0x29, BranchKind::Short),
    // Long branches
    branch("LBCC", 0x1024, BranchKind::Long),
    branch("LBCS", 0x1025, BranchKind::Long),
    branch("LBEQ", 0x1027, BranchKind::Long),
    branch("LBGE", 0x102C, BranchKind::Long),
    branch("LBGT", 0x102E, BranchKind::Long),
    branch("LBHI", 0x1022, BranchKind::Long),
    branch("LBHS", 0x1024, BranchKind::Long),
    branch("LBLE", 0x102F, BranchKind::Long),
    branch("LBLO", 0x1025, BranchKind::Long),
    branch("LBLS", 0x1023, BranchKind::Long),
    branch("LBLT", 0x102D, BranchKind::Long),
    branch("LBMI", 0x102B, BranchKind::Long),
    branch("LBNE", 0x1026, BranchKind::Long),
    branch("LBPL", 0x102A, BranchKind::Long),
    branch("LBRA", 0x16, BranchKind::Long),
    branch("LBRN", 0x1021, BranchKind::Long),
    branch("LBSR", 0x17, BranchKind::Long),
    branch("LBVC", 0x1028, BranchKind::Long),
    branch("LBVS", 0x1029, BranchKind::Long),
];

pub fn lookup(mnemonic: &str) -> Option<&'static OpcodeEntry> {
    OPCODE_TABLE
        .iter()
        .find(|entry| entry.mnemonic.eq_ignore_ascii_case(mnemonic))
}

pub fn has_mnemonic(mnemonic: &str) -> bool {
    lookup(mnemonic).is_some()
}

/// Number of bytes the opcode itself occupies (2 when page-prefixed).
pub fn opcode_len(opcode: u16) -> u16 {
    if opcode > 0xFF {
        2
    } else {
        1
    }
}

/// Append the opcode's byte(s) to the output buffer.
pub fn push_opcode(out: &mut Vec<u8>, opcode: u16) {
    if opcode > 0xFF {
        out.push((opcode >> 8) as u8);
    }
    out.push(opcode as u8);
}
