// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Output emission: symbol table and listing rendering, raw binary,
//! cassette, and disk containers.

use std::path::Path;

use serde_json::json;

use crate::containers::cassette::CassetteImage;
use crate::containers::disk::DiskImage;
use crate::containers::{read_existing, write_atomic, ProgramFile};
use crate::core::error::AsmError;
use crate::core::imagestore::ImageStore;
use crate::core::listing::{ListingRecord, ListingWriter};
use crate::core::parser::Statement;
use crate::core::symbol_table::SymbolTable;

use super::cli::OutputFormat;

/// Render the symbol table for `--symbols`.
pub fn render_symbols(symbols: &SymbolTable, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let mut out = Vec::new();
            symbols.dump(&mut out).expect("write to vec");
            String::from_utf8(out).expect("symbol names are ascii")
        }
        OutputFormat::Json => {
            let entries: Vec<serde_json::Value> = symbols
                .entries()
                .iter()
                .map(|entry| {
                    json!({
                        "name": entry.name,
                        "value": entry.val,
                        "address": format!("{:04X}", entry.val),
                    })
                })
                .collect();
            json!({ "symbols": entries }).to_string()
        }
    }
}

/// Render the assembled listing for `--print`.
pub fn render_listing(statements: &[Statement], format: OutputFormat) -> String {
    let records: Vec<ListingRecord> = statements
        .iter()
        .filter(|stmt| !stmt.is_empty())
        .map(ListingRecord::from_statement)
        .collect();
    match format {
        OutputFormat::Text => {
            let mut out = Vec::new();
            ListingWriter::new(&mut out)
                .write_all(&records)
                .expect("write to vec");
            String::from_utf8(out).expect("listing is ascii")
        }
        OutputFormat::Json => {
            let lines: Vec<serde_json::Value> = records
                .iter()
                .map(|record| {
                    json!({
                        "address": format!("{:04X}", record.address),
                        "bytes": record.bytes_hex(),
                        "label": record.label,
                        "mnemonic": record.mnemonic,
                        "operand": record.operand,
                        "comment": record.comment,
                    })
                })
                .collect();
            json!({ "listing": lines }).to_string()
        }
    }
}

/// Write the raw binary image: emitted bytes in address order, gaps
/// omitted. `--append` concatenates onto an existing file.
pub fn write_bin(path: &Path, append: bool, image: &ImageStore) -> Result<(), AsmError> {
    let mut bytes = read_existing(path, append)?.unwrap_or_default();
    bytes.extend_from_slice(&image.contiguous_bytes());
    write_atomic(path, &bytes)
}

pub fn write_cassette(path: &Path, append: bool, file: &ProgramFile) -> Result<(), AsmError> {
    let mut cassette = match read_existing(path, append)? {
        Some(bytes) => CassetteImage::from_bytes(bytes),
        None => CassetteImage::new(),
    };
    cassette.add_file(file);
    write_atomic(path, &cassette.into_bytes())
}

pub fn write_disk(path: &Path, append: bool, file: &ProgramFile) -> Result<(), AsmError> {
    let mut disk = match read_existing(path, append)? {
        Some(bytes) => DiskImage::from_bytes(bytes)?,
        None => DiskImage::new(),
    };
    disk.add_file(file)?;
    write_atomic(path, &disk.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::symbol_table::SymbolKind;

    #[test]
    fn symbol_rendering_text_and_json() {
        let mut symbols = SymbolTable::new();
        let _ = symbols.define("START", 0x0E00, SymbolKind::Address, 1);
        let text = render_symbols(&symbols, OutputFormat::Text);
        assert_eq!(text, "$0E00 START\n");

        let parsed: serde_json::Value =
            serde_json::from_str(&render_symbols(&symbols, OutputFormat::Json)).unwrap();
        assert_eq!(parsed["symbols"][0]["name"], "START");
        assert_eq!(parsed["symbols"][0]["address"], "0E00");
        assert_eq!(parsed["symbols"][0]["value"], 0x0E00);
    }

    #[test]
    fn bin_append_concatenates() {
        let mut path = std::env::temp_dir();
        path.push(format!("cocoforge-bin-append-{}.bin", std::process::id()));
        let _ = std::fs::remove_file(&path);

        let mut image = ImageStore::new();
        image.store_slice(0x100, &[1, 2]);
        write_bin(&path, false, &image).unwrap();

        let mut image = ImageStore::new();
        image.store_slice(0x200, &[3]);
        write_bin(&path, true, &image).unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), vec![1, 2, 3]);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn bin_refuses_overwrite_without_append() {
        let mut path = std::env::temp_dir();
        path.push(format!("cocoforge-bin-refuse-{}.bin", std::process::id()));
        let _ = std::fs::remove_file(&path);

        let image = ImageStore::new();
        write_bin(&path, false, &image).unwrap();
        assert!(write_bin(&path, false, &image).is_err());
        let _ = std::fs::remove_file(&path);
    }
}
