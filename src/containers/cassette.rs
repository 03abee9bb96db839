// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Cassette (.CAS) image format.
//!
//! A cassette is a stream of blocks, each `[leader $55 x N] [$3C sync]
//! [type] [length] [payload] [checksum]` with
//! `checksum = (type + length + sum(payload)) mod 256`. A file is a
//! namefile block, one or more data blocks, and an end-of-file block;
//! appending concatenates another such triple.

use crate::core::error::{AsmError, AsmErrorKind};

use super::{container_error, FileType, ProgramFile};

const LEADER: u8 = 0x55;
const SYNC: u8 = 0x3C;
const BLOCK_NAMEFILE: u8 = 0x00;
const BLOCK_DATA: u8 = 0x01;
const BLOCK_EOF: u8 = 0xFF;
const NAMEFILE_LEN: usize = 15;
const LEADER_LEN: usize = 128;
const MAX_DATA_LEN: usize = 255;

/// In-memory cassette image.
#[derive(Debug, Default)]
pub struct CassetteImage {
    buffer: Vec<u8>,
}

impl CassetteImage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_bytes(buffer: Vec<u8>) -> Self {
        Self { buffer }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Append one program: namefile, data blocks, EOF.
    pub fn add_file(&mut self, file: &ProgramFile) {
        for _ in 0..LEADER_LEN {
            self.buffer.push(LEADER);
        }
        self.write_namefile(file);
        for chunk in file.data.chunks(MAX_DATA_LEN) {
            self.write_block(BLOCK_DATA, chunk);
        }
        if file.data.is_empty() {
            self.write_block(BLOCK_DATA, &[]);
        }
        self.write_block(BLOCK_EOF, &[]);
    }

    fn write_namefile(&mut self, file: &ProgramFile) {
        let mut payload = Vec::with_capacity(NAMEFILE_LEN);
        payload.extend_from_slice(&file.padded_name());
        payload.push(file.file_type.byte());
        payload.push(0x00); // binary data
        payload.push(0x00); // no gaps
        payload.extend_from_slice(&file.exec_addr.to_be_bytes());
        payload.extend_from_slice(&file.load_addr.to_be_bytes());
        self.write_block(BLOCK_NAMEFILE, &payload);
    }

    fn write_block(&mut self, block_type: u8, payload: &[u8]) {
        self.buffer.push(LEADER);
        self.buffer.push(SYNC);
        self.buffer.push(block_type);
        self.buffer.push(payload.len() as u8);
        self.buffer.extend_from_slice(payload);
        self.buffer.push(block_checksum(block_type, payload));
    }

    /// Parse every file on the cassette.
    pub fn list_files(&self) -> Result<Vec<ProgramFile>, AsmError> {
        let mut files = Vec::new();
        let mut pos = 0;
        while let Some(block_start) = self.next_sync(pos) {
            let (block, next) = self.read_block(block_start)?;
            pos = next;
            if block.block_type != BLOCK_NAMEFILE {
                return Err(container_error("expected a namefile block"));
            }
            if block.payload.len() != NAMEFILE_LEN {
                return Err(container_error("namefile block has wrong length"));
            }
            let mut file = parse_namefile(&block.payload)?;
            loop {
                let Some(block_start) = self.next_sync(pos) else {
                    return Err(container_error("cassette ends before EOF block"));
                };
                let (block, next) = self.read_block(block_start)?;
                pos = next;
                match block.block_type {
                    BLOCK_DATA => file.data.extend_from_slice(&block.payload),
                    BLOCK_EOF => break,
                    _ => return Err(container_error("unexpected block type inside file")),
                }
            }
            files.push(file);
        }
        Ok(files)
    }

    /// Skip a leader run and return the index of the byte after the
    /// sync marker, if any block remains.
    fn next_sync(&self, mut pos: usize) -> Option<usize> {
        while pos < self.buffer.len() {
            match self.buffer[pos] {
                LEADER => pos += 1,
                SYNC => return Some(pos + 1),
                // Inter-file blanks and noise are skipped.
                _ => pos += 1,
            }
        }
        None
    }

    fn read_block(&self, start: usize) -> Result<(Block, usize), AsmError> {
        let header = self
            .buffer
            .get(start..start + 2)
            .ok_or_else(|| container_error("truncated block header"))?;
        let block_type = header[0];
        let length = header[1] as usize;
        let payload_start = start + 2;
        let payload = self
            .buffer
            .get(payload_start..payload_start + length)
            .ok_or_else(|| container_error("truncated block payload"))?
            .to_vec();
        let checksum = *self
            .buffer
            .get(payload_start + length)
            .ok_or_else(|| container_error("truncated block checksum"))?;
        if checksum != block_checksum(block_type, &payload) {
            return Err(AsmError::new(
                AsmErrorKind::Io,
                "cassette block checksum mismatch",
                None,
            ));
        }
        Ok((
            Block {
                block_type,
                payload,
            },
            payload_start + length + 1,
        ))
    }
}

struct Block {
    block_type: u8,
    payload: Vec<u8>,
}

fn block_checksum(block_type: u8, payload: &[u8]) -> u8 {
    payload.iter().fold(
        (block_type).wrapping_add(payload.len() as u8),
        |sum, byte| sum.wrapping_add(*byte),
    )
}

fn parse_namefile(payload: &[u8]) -> Result<ProgramFile, AsmError> {
    let name = String::from_utf8_lossy(&payload[0..8]).trim_end().to_string();
    let file_type = FileType::from_byte(payload[8])
        .ok_or_else(|| container_error("unknown cassette file type"))?;
    let exec_addr = u16::from_be_bytes([payload[11], payload[12]]);
    let load_addr = u16::from_be_bytes([payload[13], payload[14]]);
    Ok(ProgramFile {
        name,
        file_type,
        load_addr,
        exec_addr,
        data: Vec::new(),
    })
}
