// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Listing records for `--print` output.

use std::io::{self, Write};

use crate::core::parser::Statement;

/// One printable line of the assembled listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRecord {
    pub address: u16,
    pub bytes: Vec<u8>,
    pub label: String,
    pub mnemonic: String,
    pub operand: String,
    pub comment: String,
}

impl ListingRecord {
    pub fn from_statement(statement: &Statement) -> Self {
        Self {
            address: statement.address,
            bytes: statement.bytes.clone(),
            label: statement.label.clone().unwrap_or_default(),
            mnemonic: statement.mnemonic.clone().unwrap_or_default(),
            operand: statement.operand_text.clone().unwrap_or_default(),
            comment: statement.comment.clone().unwrap_or_default(),
        }
    }

    /// Emitted bytes as packed hex, truncated to 10 characters.
    pub fn bytes_hex(&self) -> String {
        let mut hex = String::with_capacity(self.bytes.len() * 2);
        for byte in &self.bytes {
            hex.push_str(&format!("{byte:02X}"));
        }
        hex.truncate(10);
        hex
    }
}

/// Writer rendering listing records in fixed columns.
pub struct ListingWriter<W: Write> {
    out: W,
}

impl<W: Write> ListingWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn write_record(&mut self, record: &ListingRecord) -> io::Result<()> {
        writeln!(
            self.out,
            "${:04X} {:<10} {:<10} {:<6} {:<16} ; {}",
            record.address,
            record.bytes_hex(),
            record.label,
            record.mnemonic,
            record.operand,
            record.comment,
        )
    }

    pub fn write_all(&mut self, records: &[ListingRecord]) -> io::Result<()> {
        for record in records {
            self.write_record(record)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{ListingRecord, ListingWriter};

    fn record() -> ListingRecord {
        ListingRecord {
            address: 0x0E00,
            bytes: vec![0x8E, 0x12, 0x34],
            label: "START".to_string(),
            mnemonic: "LDX".to_string(),
            operand: "#$1234".to_string(),
            comment: "entry".to_string(),
        }
    }

    #[test]
    fn bytes_hex_truncates_to_ten_chars() {
        let mut rec = record();
        rec.bytes = vec![0x11; 8];
        assert_eq!(rec.bytes_hex(), "1111111111");
        assert_eq!(rec.bytes_hex().len(), 10);
    }

    #[test]
    fn record_renders_fixed_columns() {
        let mut out = Vec::new();
        ListingWriter::new(&mut out).write_record(&record()).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("$0E00 8E1234"));
        assert!(text.contains("START"));
        assert!(text.contains("LDX"));
        assert!(text.contains("#$1234"));
        assert!(text.trim_end().ends_with("; entry"));
    }
}
