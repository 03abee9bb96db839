// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Operand encodings for the Motorola 6809: indexed post-byte
//! construction and decoding, register-pair and register-list codes.

/// Index base registers selectable in an indexed post-byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexReg {
    X,
    Y,
    U,
    S,
}

impl IndexReg {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "X" => Some(Self::X),
            "Y" => Some(Self::Y),
            "U" => Some(Self::U),
            "S" => Some(Self::S),
            _ => None,
        }
    }

    pub fn field(self) -> u8 {
        match self {
            Self::X => 0x0,
            Self::Y => 0x1,
            Self::U => 0x2,
            Self::S => 0x3,
        }
    }

    fn from_field(field: u8) -> Self {
        match field & 0x3 {
            0x0 => Self::X,
            0x1 => Self::Y,
            0x2 => Self::U,
            _ => Self::S,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::X => "X",
            Self::Y => "Y",
            Self::U => "U",
            Self::S => "S",
        }
    }
}

/// Concrete form of an indexed operand, as encoded in the post-byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexedForm {
    Zero,
    Const5(i8),
    Const8,
    Const16,
    AccumulatorA,
    AccumulatorB,
    AccumulatorD,
    PostInc1,
    PostInc2,
    PreDec1,
    PreDec2,
    Pcr8,
    Pcr16,
    ExtendedIndirect,
}

impl IndexedForm {
    /// Extra operand bytes that follow the post-byte for this form.
    pub fn extra_bytes(self) -> u16 {
        match self {
            Self::Const8 | Self::Pcr8 => 1,
            Self::Const16 | Self::Pcr16 | Self::ExtendedIndirect => 2,
            _ => 0,
        }
    }
}

/// Build the indexed post-byte for a register, form, and indirect flag.
///
/// Legality rules: a 5-bit constant cannot be indirect (callers widen to
/// 8-bit instead), single auto-increment/decrement cannot be indirect,
/// and extended indirect is only valid with the indirect flag set.
pub fn post_byte(reg: IndexReg, form: IndexedForm, indirect: bool) -> Result<u8, String> {
    let reg_bits = reg.field() << 5;
    let ind = if indirect { 0x10 } else { 0x00 };
    match form {
        IndexedForm::Const5(value) => {
            if indirect {
                return Err("5-bit constant offset cannot be indirect".to_string());
            }
            if !(-16..=15).contains(&value) {
                return Err(format!("5-bit constant offset {value} out of range"));
            }
            Ok(reg_bits | (value as u8 & 0x1F))
        }
        IndexedForm::PostInc1 => {
            if indirect {
                return Err("auto-increment by 1 cannot be indirect".to_string());
            }
            Ok(0x80 | reg_bits)
        }
        IndexedForm::PreDec1 => {
            if indirect {
                return Err("auto-decrement by 1 cannot be indirect".to_string());
            }
            Ok(0x82 | reg_bits)
        }
        IndexedForm::PostInc2 => Ok(0x81 | reg_bits | ind),
        IndexedForm::PreDec2 => Ok(0x83 | reg_bits | ind),
        IndexedForm::Zero => Ok(0x84 | reg_bits | ind),
        IndexedForm::AccumulatorB => Ok(0x85 | reg_bits | ind),
        IndexedForm::AccumulatorA => Ok(0x86 | reg_bits | ind),
        IndexedForm::Const8 => Ok(0x88 | reg_bits | ind),
        IndexedForm::Const16 => Ok(0x89 | reg_bits | ind),
        IndexedForm::AccumulatorD => Ok(0x8B | reg_bits | ind),
        IndexedForm::Pcr8 => Ok(0x8C | ind),
        IndexedForm::Pcr16 => Ok(0x8D | ind),
        IndexedForm::ExtendedIndirect => {
            if !indirect {
                return Err("extended indirect requires brackets".to_string());
            }
            Ok(0x9F)
        }
    }
}

/// Reference decoder for indexed post-bytes. Returns the base register
/// (absent for PCR and extended indirect), the form, and the indirect
/// flag; `None` for byte patterns the 6809 does not define.
pub fn decode_post_byte(byte: u8) -> Option<(Option<IndexReg>, IndexedForm, bool)> {
    let reg = IndexReg::from_field((byte >> 5) & 0x3);
    if byte & 0x80 == 0 {
        let mut value = (byte & 0x1F) as i8;
        if value & 0x10 != 0 {
            value -= 0x20;
        }
        return Some((Some(reg), IndexedForm::Const5(value), false));
    }

    let indirect = byte & 0x10 != 0;
    let form = match byte & 0x0F {
        0x00 => IndexedForm::PostInc1,
        0x01 => IndexedForm::PostInc2,
        0x02 => IndexedForm::PreDec1,
        0x03 => IndexedForm::PreDec2,
        0x04 => IndexedForm::Zero,
        0x05 => IndexedForm::AccumulatorB,
        0x06 => IndexedForm::AccumulatorA,
        0x08 => IndexedForm::Const8,
        0x09 => IndexedForm::Const16,
        0x0B => IndexedForm::AccumulatorD,
        0x0C => IndexedForm::Pcr8,
        0x0D => IndexedForm::Pcr16,
        0x0F if indirect => IndexedForm::ExtendedIndirect,
        _ => return None,
    };
    if indirect && matches!(form, IndexedForm::PostInc1 | IndexedForm::PreDec1) {
        return None;
    }
    let reg = match form {
        IndexedForm::Pcr8 | IndexedForm::Pcr16 | IndexedForm::ExtendedIndirect => None,
        _ => Some(reg),
    };
    Some((reg, form, indirect))
}

/// Registers addressable by `TFR`/`EXG` post-byte nibbles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterReg {
    D,
    X,
    Y,
    U,
    S,
    Pc,
    A,
    B,
    Cc,
    Dp,
}

impl InterReg {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "D" => Some(Self::D),
            "X" => Some(Self::X),
            "Y" => Some(Self::Y),
            "U" => Some(Self::U),
            "S" => Some(Self::S),
            "PC" => Some(Self::Pc),
            "A" => Some(Self::A),
            "B" => Some(Self::B),
            "CC" | "CCR" => Some(Self::Cc),
            "DP" | "DPR" => Some(Self::Dp),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Self::D => 0x0,
            Self::X => 0x1,
            Self::Y => 0x2,
            Self::U => 0x3,
            Self::S => 0x4,
            Self::Pc => 0x5,
            Self::A => 0x8,
            Self::B => 0x9,
            Self::Cc => 0xA,
            Self::Dp => 0xB,
        }
    }

    pub fn is_word(self) -> bool {
        matches!(
            self,
            Self::D | Self::X | Self::Y | Self::U | Self::S | Self::Pc
        )
    }
}

/// Build the `TFR`/`EXG` post-byte: source in the high nibble,
/// destination in the low. Mixing 8- and 16-bit registers is illegal.
pub fn register_pair_post_byte(src: InterReg, dst: InterReg) -> Result<u8, String> {
    if src.is_word() != dst.is_word() {
        return Err(format!(
            "cannot pair {:?} with {:?}: register sizes differ",
            src, dst
        ));
    }
    Ok((src.code() << 4) | dst.code())
}

/// Bit assigned to one register in a `PSHS`/`PULS`/`PSHU`/`PULU`
/// post-byte. `stack_is_user` selects which stack pointer the mnemonic
/// operates on: the opposite pointer occupies bit 6, and naming the
/// mnemonic's own pointer is illegal.
pub fn register_list_bit(name: &str, stack_is_user: bool) -> Result<u8, String> {
    match name.to_ascii_uppercase().as_str() {
        "CC" | "CCR" => Ok(0x01),
        "A" => Ok(0x02),
        "B" => Ok(0x04),
        "D" => Ok(0x06),
        "DP" | "DPR" => Ok(0x08),
        "X" => Ok(0x10),
        "Y" => Ok(0x20),
        "PC" => Ok(0x80),
        "U" if !stack_is_user => Ok(0x40),
        "S" if stack_is_user => Ok(0x40),
        "U" | "S" => Err(format!(
            "register {} cannot be pushed onto its own stack",
            name.to_ascii_uppercase()
        )),
        other => Err(format!("unknown register in list: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn const5_post_byte_packs_register_and_offset() {
        assert_eq!(post_byte(IndexReg::X, IndexedForm::Const5(5), false), Ok(0x05));
        assert_eq!(
            post_byte(IndexReg::Y, IndexedForm::Const5(-1), false),
            Ok(0x3F)
        );
        assert_eq!(
            post_byte(IndexReg::S, IndexedForm::Const5(-16), false),
            Ok(0x70)
        );
    }

    #[test]
    fn indirect_sets_bit_four() {
        assert_eq!(post_byte(IndexReg::X, IndexedForm::Zero, false), Ok(0x84));
        assert_eq!(post_byte(IndexReg::X, IndexedForm::Zero, true), Ok(0x94));
        assert_eq!(post_byte(IndexReg::U, IndexedForm::Const8, true), Ok(0xD8));
    }

    #[test]
    fn single_step_auto_inc_dec_reject_indirect() {
        assert!(post_byte(IndexReg::X, IndexedForm::PostInc1, true).is_err());
        assert!(post_byte(IndexReg::X, IndexedForm::PreDec1, true).is_err());
        assert_eq!(
            post_byte(IndexReg::X, IndexedForm::PostInc2, true),
            Ok(0x91)
        );
    }

    #[test]
    fn const5_rejects_indirect() {
        assert!(post_byte(IndexReg::X, IndexedForm::Const5(3), true).is_err());
    }

    #[test]
    fn pcr_forms_ignore_register_field() {
        assert_eq!(post_byte(IndexReg::X, IndexedForm::Pcr8, false), Ok(0x8C));
        assert_eq!(post_byte(IndexReg::Y, IndexedForm::Pcr16, true), Ok(0x9D));
    }

    #[test]
    fn extended_indirect_is_nine_f() {
        assert_eq!(
            post_byte(IndexReg::X, IndexedForm::ExtendedIndirect, true),
            Ok(0x9F)
        );
        assert!(post_byte(IndexReg::X, IndexedForm::ExtendedIndirect, false).is_err());
    }

    #[test]
    fn decoder_reads_const5_sign() {
        assert_eq!(
            decode_post_byte(0x3F),
            Some((Some(IndexReg::Y), IndexedForm::Const5(-1), false))
        );
        assert_eq!(
            decode_post_byte(0x05),
            Some((Some(IndexReg::X), IndexedForm::Const5(5), false))
        );
    }

    #[test]
    fn decoder_rejects_undefined_patterns() {
        assert_eq!(decode_post_byte(0x87), None);
        assert_eq!(decode_post_byte(0x90), None);
        assert_eq!(decode_post_byte(0x92), None);
        assert_eq!(decode_post_byte(0x8F), None);
    }

    #[test]
    fn register_pair_packs_nibbles() {
        assert_eq!(
            register_pair_post_byte(InterReg::X, InterReg::Y),
            Ok(0x12)
        );
        assert_eq!(
            register_pair_post_byte(InterReg::A, InterReg::B),
            Ok(0x89)
        );
        assert!(register_pair_post_byte(InterReg::A, InterReg::X).is_err());
    }

    #[test]
    fn register_list_bits_respect_the_stack() {
        assert_eq!(register_list_bit("U", false), Ok(0x40));
        assert!(register_list_bit("S", false).is_err());
        assert_eq!(register_list_bit("S", true), Ok(0x40));
        assert!(register_list_bit("U", true).is_err());
        assert_eq!(register_list_bit("D", false), Ok(0x06));
    }

    fn arb_index_reg() -> impl Strategy<Value = IndexReg> {
        prop_oneof![
            Just(IndexReg::X),
            Just(IndexReg::Y),
            Just(IndexReg::U),
            Just(IndexReg::S),
        ]
    }

    fn arb_form() -> impl Strategy<Value = IndexedForm> {
        prop_oneof![
            (-16i8..=15).prop_map(IndexedForm::Const5),
            Just(IndexedForm::Zero),
            Just(IndexedForm::Const8),
            Just(IndexedForm::Const16),
            Just(IndexedForm::AccumulatorA),
            Just(IndexedForm::AccumulatorB),
            Just(IndexedForm::AccumulatorD),
            Just(IndexedForm::PostInc1),
            Just(IndexedForm::PostInc2),
            Just(IndexedForm::PreDec1),
            Just(IndexedForm::PreDec2),
        ]
    }

    proptest! {
        #[test]
        fn post_bytes_round_trip_through_the_decoder(
            reg in arb_index_reg(),
            form in arb_form(),
            indirect in any::<bool>(),
        ) {
            let encoded = post_byte(reg, form, indirect);
            let legal = !(indirect
                && matches!(
                    form,
                    IndexedForm::Const5(_) | IndexedForm::PostInc1 | IndexedForm::PreDec1
                ));
            prop_assert_eq!(encoded.is_ok(), legal);
            if let Ok(byte) = encoded {
                let decoded = decode_post_byte(byte).expect("encoder output must decode");
                prop_assert_eq!(decoded, (Some(reg), form, indirect));
            }
        }
    }
}
