// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Container formats for assembled programs: raw binary, cassette
//! (.CAS) block streams, and sectored disk (.DSK) images.
//!
//! Writers never leave a partial file behind: output goes to a
//! temporary in the target directory and is renamed over the target.
//! Without `append`, an existing target is refused.

pub mod cassette;
pub mod disk;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::core::error::{AsmError, AsmErrorKind};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// File type byte shared by the cassette and disk formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Basic,
    Data,
    Object,
}

impl FileType {
    pub fn byte(self) -> u8 {
        match self {
            Self::Basic => 0x00,
            Self::Data => 0x01,
            Self::Object => 0x02,
        }
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Self::Basic),
            0x01 => Some(Self::Data),
            0x02 => Some(Self::Object),
            _ => None,
        }
    }
}

/// A program plus the metadata containers store alongside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramFile {
    pub name: String,
    pub file_type: FileType,
    pub load_addr: u16,
    pub exec_addr: u16,
    pub data: Vec<u8>,
}

impl ProgramFile {
    pub fn object(name: &str, load_addr: u16, exec_addr: u16, data: Vec<u8>) -> Self {
        Self {
            name: name.to_string(),
            file_type: FileType::Object,
            load_addr,
            exec_addr,
            data,
        }
    }

    /// Container name field: uppercase, space-padded to 8 bytes.
    pub fn padded_name(&self) -> [u8; 8] {
        let mut padded = [b' '; 8];
        for (slot, byte) in padded.iter_mut().zip(self.name.to_ascii_uppercase().bytes()) {
            *slot = byte;
        }
        padded
    }
}

pub fn container_error(msg: &str) -> AsmError {
    AsmError::new(AsmErrorKind::Io, msg, None)
}

/// Read an existing container for `--append`, or start fresh.
pub fn read_existing(path: &Path, append: bool) -> Result<Option<Vec<u8>>, AsmError> {
    if !path.exists() {
        return Ok(None);
    }
    if !append {
        return Err(AsmError::new(
            AsmErrorKind::Io,
            "output file exists (use --append to add to it)",
            Some(path.to_string_lossy().as_ref()),
        ));
    }
    fs::read(path).map(Some).map_err(|err| {
        AsmError::new(
            AsmErrorKind::Io,
            &format!("cannot read existing container: {err}"),
            Some(path.to_string_lossy().as_ref()),
        )
    })
}

/// Write the finished container bytes via a sibling temp file and an
/// atomic rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), AsmError> {
    let temp = temp_path(path);
    let io_err = |err: std::io::Error| {
        AsmError::new(
            AsmErrorKind::Io,
            &format!("cannot write output file: {err}"),
            Some(path.to_string_lossy().as_ref()),
        )
    };
    fs::write(&temp, bytes).map_err(io_err)?;
    if let Err(err) = fs::rename(&temp, path) {
        let _ = fs::remove_file(&temp);
        return Err(io_err(err));
    }
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let counter = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "out".to_string());
    path.with_file_name(format!(
        ".{file_name}.{}-{counter}.tmp",
        std::process::id()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padded_name_uppercases_and_pads() {
        let file = ProgramFile::object("hello", 0, 0, Vec::new());
        assert_eq!(&file.padded_name(), b"HELLO   ");

        let file = ProgramFile::object("VERYLONGNAME", 0, 0, Vec::new());
        assert_eq!(&file.padded_name(), b"VERYLONG");
    }

    #[test]
    fn file_type_round_trips() {
        for file_type in [FileType::Basic, FileType::Data, FileType::Object] {
            assert_eq!(FileType::from_byte(file_type.byte()), Some(file_type));
        }
        assert_eq!(FileType::from_byte(0x07), None);
    }

    #[test]
    fn refuses_existing_target_without_append() {
        let mut path = std::env::temp_dir();
        path.push(format!("cocoforge-existing-{}.cas", std::process::id()));
        std::fs::write(&path, b"old").unwrap();
        let err = read_existing(&path, false).unwrap_err();
        assert!(err.message().contains("--append"));
        assert_eq!(read_existing(&path, true).unwrap(), Some(b"old".to_vec()));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn write_atomic_replaces_content() {
        let mut path = std::env::temp_dir();
        path.push(format!("cocoforge-atomic-{}.bin", std::process::id()));
        write_atomic(&path, b"first").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"first");
        write_atomic(&path, b"second").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"second");
        let _ = std::fs::remove_file(&path);
    }
}
