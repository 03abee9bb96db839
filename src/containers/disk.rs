// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Sectored disk (.DSK) image format.
//!
//! Geometry: 35 tracks x 18 sectors x 256 bytes, track-major. Track 17
//! holds the filesystem: sector 2 is the granule allocation table,
//! sectors 3-11 hold 72 directory entries of 32 bytes. A granule is 9
//! sectors; the FAT chains granules, terminating with `$C0 + sectors
//! used in the last granule`. Object files carry a 5-byte machine
//! language preamble (data length, load address) and a 5-byte
//! postamble (exec address) inside their granule data.

use crate::core::error::{AsmError, AsmErrorKind};

use super::{container_error, FileType, ProgramFile};

pub const IMAGE_SIZE: usize = 161_280;
pub const SECTOR_SIZE: usize = 256;
pub const GRANULE_SIZE: usize = 2_304;
pub const TOTAL_GRANULES: usize = 68;
pub const DIR_ENTRIES: usize = 72;
const DIR_ENTRY_SIZE: usize = 32;
const FAT_OFFSET: usize = 78_592;
const DIR_OFFSET: usize = 78_848;
const PREAMBLE_LEN: usize = 5;
const POSTAMBLE_LEN: usize = 5;
const FAT_FREE: u8 = 0xFF;
const FAT_LAST_BASE: u8 = 0xC0;

/// In-memory disk image.
#[derive(Debug)]
pub struct DiskImage {
    buffer: Vec<u8>,
}

impl Default for DiskImage {
    fn default() -> Self {
        Self::new()
    }
}

impl DiskImage {
    /// A freshly formatted image: every byte (and so every FAT entry)
    /// is `$FF`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: vec![0xFF; IMAGE_SIZE],
        }
    }

    pub fn from_bytes(buffer: Vec<u8>) -> Result<Self, AsmError> {
        if buffer.len() != IMAGE_SIZE {
            return Err(AsmError::new(
                AsmErrorKind::Io,
                &format!(
                    "disk image must be {IMAGE_SIZE} bytes, got {}",
                    buffer.len()
                ),
                None,
            ));
        }
        Ok(Self { buffer })
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Byte offset of a granule's data. Granules skip the directory
    /// track, which sits between granules 33 and 34.
    fn granule_offset(granule: u8) -> usize {
        let mut offset = granule as usize * GRANULE_SIZE;
        if granule > 33 {
            offset += 2 * GRANULE_SIZE;
        }
        offset
    }

    fn fat(&self, granule: u8) -> u8 {
        self.buffer[FAT_OFFSET + granule as usize]
    }

    fn set_fat(&mut self, granule: u8, value: u8) {
        self.buffer[FAT_OFFSET + granule as usize] = value;
    }

    fn dir_entry_offset(entry: usize) -> usize {
        DIR_OFFSET + entry * DIR_ENTRY_SIZE
    }

    fn dir_entry_in_use(&self, entry: usize) -> bool {
        !matches!(self.buffer[Self::dir_entry_offset(entry)], 0x00 | 0xFF)
    }

    fn find_free_dir_entry(&self) -> Option<usize> {
        (0..DIR_ENTRIES).find(|&entry| !self.dir_entry_in_use(entry))
    }

    fn find_free_granule(&self, taken: &[u8]) -> Option<u8> {
        (0..TOTAL_GRANULES as u8)
            .find(|&g| self.fat(g) == FAT_FREE && !taken.contains(&g))
    }

    /// Add a program to the filesystem: allocate a directory slot and
    /// a granule chain, write the payload, update FAT and directory.
    pub fn add_file(&mut self, file: &ProgramFile) -> Result<(), AsmError> {
        let entry = self.find_free_dir_entry().ok_or_else(|| {
            AsmError::new(AsmErrorKind::ContainerFull, "no free directory entry", None)
        })?;

        let payload = build_payload(file);
        let granules_needed = payload.len() / GRANULE_SIZE + 1;

        let mut granules = Vec::with_capacity(granules_needed);
        for _ in 0..granules_needed {
            let granule = self.find_free_granule(&granules).ok_or_else(|| {
                AsmError::new(AsmErrorKind::ContainerFull, "no free granule", None)
            })?;
            granules.push(granule);
        }

        // Payload into the granule chain.
        for (index, chunk) in payload.chunks(GRANULE_SIZE).enumerate() {
            let offset = Self::granule_offset(granules[index]);
            self.buffer[offset..offset + chunk.len()].copy_from_slice(chunk);
        }

        // FAT chain, then the terminator carrying the sector count of
        // the last granule.
        let tail_len = payload.len() - (granules_needed - 1) * GRANULE_SIZE;
        let tail_sectors = (tail_len / SECTOR_SIZE + 1) as u8;
        let last_sector_bytes = (tail_len - (tail_sectors as usize - 1) * SECTOR_SIZE) as u16;
        for pair in granules.windows(2) {
            self.set_fat(pair[0], pair[1]);
        }
        self.set_fat(
            *granules.last().expect("at least one granule"),
            FAT_LAST_BASE + tail_sectors,
        );

        self.write_dir_entry(entry, file, granules[0], last_sector_bytes);
        Ok(())
    }

    fn write_dir_entry(
        &mut self,
        entry: usize,
        file: &ProgramFile,
        first_granule: u8,
        last_sector_bytes: u16,
    ) {
        let offset = Self::dir_entry_offset(entry);
        let slot = &mut self.buffer[offset..offset + DIR_ENTRY_SIZE];
        slot[0..8].copy_from_slice(&file.padded_name());
        slot[8..11].copy_from_slice(extension_for(file.file_type));
        slot[11] = file.file_type.byte();
        slot[12] = 0x00; // binary
        slot[13] = first_granule;
        slot[14..16].copy_from_slice(&last_sector_bytes.to_be_bytes());
        slot[16..32].fill(0x00);
    }

    /// Parse every file in the directory.
    pub fn list_files(&self) -> Result<Vec<ProgramFile>, AsmError> {
        let mut files = Vec::new();
        for entry in 0..DIR_ENTRIES {
            if !self.dir_entry_in_use(entry) {
                continue;
            }
            let offset = Self::dir_entry_offset(entry);
            let slot = &self.buffer[offset..offset + DIR_ENTRY_SIZE];
            let name = String::from_utf8_lossy(&slot[0..8]).trim_end().to_string();
            let file_type = FileType::from_byte(slot[11])
                .ok_or_else(|| container_error("unknown file type in directory"))?;
            let first_granule = slot[13];
            if first_granule as usize >= TOTAL_GRANULES {
                return Err(container_error("directory entry points past the FAT"));
            }

            if file_type != FileType::Object {
                // Only machine language payloads carry load/exec
                // framing; other types are returned raw, with the
                // exact length from the FAT chain plus the directory's
                // trailing byte count.
                let last_sector_bytes = u16::from_be_bytes([slot[14], slot[15]]);
                let length = self.chain_length(first_granule, last_sector_bytes)?;
                let data = self.read_chain(first_granule, length)?;
                files.push(ProgramFile {
                    name,
                    file_type,
                    load_addr: 0,
                    exec_addr: 0,
                    data,
                });
                continue;
            }

            let preamble_at = Self::granule_offset(first_granule);
            let preamble = &self.buffer[preamble_at..preamble_at + PREAMBLE_LEN];
            if preamble[0] != 0x00 {
                return Err(container_error("invalid machine language preamble"));
            }
            let data_len = u16::from_be_bytes([preamble[1], preamble[2]]) as usize;
            let load_addr = u16::from_be_bytes([preamble[3], preamble[4]]);

            let chain = self.read_chain(first_granule, PREAMBLE_LEN + data_len + POSTAMBLE_LEN)?;
            let data = chain[PREAMBLE_LEN..PREAMBLE_LEN + data_len].to_vec();
            let postamble = &chain[PREAMBLE_LEN + data_len..];
            if postamble[0] != 0xFF || postamble[1] != 0x00 || postamble[2] != 0x00 {
                return Err(container_error("invalid machine language postamble"));
            }
            let exec_addr = u16::from_be_bytes([postamble[3], postamble[4]]);

            files.push(ProgramFile {
                name,
                file_type,
                load_addr,
                exec_addr,
                data,
            });
        }
        Ok(files)
    }

    /// Read exactly `length` bytes from a granule chain.
    fn read_chain(&self, first_granule: u8, length: usize) -> Result<Vec<u8>, AsmError> {
        let mut remaining = length;
        let mut data = Vec::with_capacity(remaining);
        let mut granule = first_granule;
        let mut hops = 0;
        while remaining > 0 {
            if hops > TOTAL_GRANULES {
                return Err(container_error("FAT chain does not terminate"));
            }
            let take = remaining.min(GRANULE_SIZE);
            let offset = Self::granule_offset(granule);
            data.extend_from_slice(&self.buffer[offset..offset + take]);
            remaining -= take;
            if remaining > 0 {
                let next = self.fat(granule);
                if next as usize >= TOTAL_GRANULES {
                    return Err(container_error("broken FAT chain"));
                }
                granule = next;
            }
            hops += 1;
        }
        Ok(data)
    }

    /// Total file length implied by the FAT chain: full granules, full
    /// sectors of the last granule, and the directory entry's byte
    /// count for the last sector.
    fn chain_length(&self, first_granule: u8, last_sector_bytes: u16) -> Result<usize, AsmError> {
        let mut total = 0;
        let mut granule = first_granule;
        let mut hops = 0;
        loop {
            if hops > TOTAL_GRANULES {
                return Err(container_error("FAT chain does not terminate"));
            }
            let fat = self.fat(granule);
            if fat >= FAT_LAST_BASE && fat != FAT_FREE {
                let sectors = (fat - FAT_LAST_BASE) as usize;
                total += sectors.saturating_sub(1) * SECTOR_SIZE;
                total += last_sector_bytes as usize;
                return Ok(total);
            }
            if fat as usize >= TOTAL_GRANULES {
                return Err(container_error("broken FAT chain"));
            }
            total += GRANULE_SIZE;
            granule = fat;
            hops += 1;
        }
    }

    /// First granule of every directory entry in use.
    pub fn first_granules(&self) -> Vec<u8> {
        (0..DIR_ENTRIES)
            .filter(|&entry| self.dir_entry_in_use(entry))
            .map(|entry| self.buffer[Self::dir_entry_offset(entry) + 13])
            .collect()
    }
}

fn extension_for(file_type: FileType) -> &'static [u8; 3] {
    match file_type {
        FileType::Basic => b"BAS",
        FileType::Data => b"DAT",
        FileType::Object => b"BIN",
    }
}

/// Object payload: preamble, program bytes, postamble.
fn build_payload(file: &ProgramFile) -> Vec<u8> {
    if file.file_type != FileType::Object {
        return file.data.clone();
    }
    let mut payload = Vec::with_capacity(file.data.len() + PREAMBLE_LEN + POSTAMBLE_LEN);
    payload.push(0x00);
    payload.extend_from_slice(&(file.data.len() as u16).to_be_bytes());
    payload.extend_from_slice(&file.load_addr.to_be_bytes());
    payload.extend_from_slice(&file.data);
    payload.push(0xFF);
    payload.push(0x00);
    payload.push(0x00);
    payload.extend_from_slice(&file.exec_addr.to_be_bytes());
    payload
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(name: &str, data: Vec<u8>) -> ProgramFile {
        ProgramFile::object(name, 0x0E00, 0x0E05, data)
    }

    fn data_file(name: &str, data: Vec<u8>) -> ProgramFile {
        ProgramFile {
            name: name.to_string(),
            file_type: FileType::Data,
            load_addr: 0,
            exec_addr: 0,
            data,
        }
    }

    #[test]
    fn fresh_image_has_free_fat_and_directory() {
        let image = DiskImage::new();
        assert_eq!(image.buffer.len(), IMAGE_SIZE);
        assert!(image.find_free_dir_entry().is_some());
        assert!(image.find_free_granule(&[]).is_some());
        assert!(image.list_files().unwrap().is_empty());
    }

    #[test]
    fn add_file_writes_directory_fat_and_payload() {
        let mut image = DiskImage::new();
        image.add_file(&sample("PROG", vec![0x12, 0x34, 0x56])).unwrap();

        let offset = DiskImage::dir_entry_offset(0);
        assert_eq!(&image.buffer[offset..offset + 8], b"PROG    ");
        assert_eq!(&image.buffer[offset + 8..offset + 11], b"BIN");
        assert_eq!(image.buffer[offset + 11], 0x02);
        let first_granule = image.buffer[offset + 13];

        // 13 payload bytes = preamble 5 + data 3 + postamble 5, all in
        // one sector of one granule.
        assert_eq!(image.fat(first_granule), FAT_LAST_BASE + 1);
        assert_eq!(
            u16::from_be_bytes([image.buffer[offset + 14], image.buffer[offset + 15]]),
            13
        );

        let data_at = DiskImage::granule_offset(first_granule);
        assert_eq!(
            &image.buffer[data_at..data_at + 13],
            &[0x00, 0x00, 0x03, 0x0E, 0x00, 0x12, 0x34, 0x56, 0xFF, 0x00, 0x00, 0x0E, 0x05]
        );
    }

    #[test]
    fn round_trip_preserves_data_and_addresses() {
        let data: Vec<u8> = (0u16..1000).map(|v| v as u8).collect();
        let mut image = DiskImage::new();
        image
            .add_file(&ProgramFile::object("GAME", 0x3F00, 0x3F80, data.clone()))
            .unwrap();

        let files = image.list_files().unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "GAME");
        assert_eq!(files[0].load_addr, 0x3F00);
        assert_eq!(files[0].exec_addr, 0x3F80);
        assert_eq!(files[0].data, data);
    }

    #[test]
    fn data_file_round_trip_uses_exact_last_sector_length() {
        // 300 bytes: two sectors in one granule, 44 bytes used in the
        // last. A full-sector estimate would return 212 bytes of $FF
        // padding past EOF.
        let data: Vec<u8> = (0u16..300).map(|v| v as u8).collect();
        let mut image = DiskImage::new();
        image.add_file(&data_file("NOTES", data.clone())).unwrap();

        let files = image.list_files().unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].file_type, FileType::Data);
        assert_eq!(files[0].data.len(), 300);
        assert_eq!(files[0].data, data);
    }

    #[test]
    fn multi_granule_data_file_round_trips() {
        let data = vec![0x33; GRANULE_SIZE + 100];
        let mut image = DiskImage::new();
        image.add_file(&data_file("LOG", data.clone())).unwrap();

        let files = image.list_files().unwrap();
        assert_eq!(files[0].data, data);
    }

    #[test]
    fn multi_granule_files_chain_through_the_fat() {
        let data = vec![0x5A; 3 * GRANULE_SIZE];
        let mut image = DiskImage::new();
        image.add_file(&sample("BIG", data.clone())).unwrap();

        let files = image.list_files().unwrap();
        assert_eq!(files[0].data, data);

        // Chain: granule 0 -> 1 -> 2 -> 3(terminator).
        assert_eq!(image.fat(0), 1);
        assert_eq!(image.fat(1), 2);
        assert_eq!(image.fat(2), 3);
        assert!(image.fat(3) >= FAT_LAST_BASE && image.fat(3) != FAT_FREE);
    }

    #[test]
    fn fat_terminator_counts_last_granule_sectors() {
        // Payload of 2304 + 700 bytes: second granule uses 3 sectors.
        let data_len = GRANULE_SIZE + 700 - PREAMBLE_LEN - POSTAMBLE_LEN;
        let mut image = DiskImage::new();
        image.add_file(&sample("TAIL", vec![0; data_len])).unwrap();
        assert_eq!(image.fat(0), 1);
        assert_eq!(image.fat(1), FAT_LAST_BASE + 3);
    }

    #[test]
    fn appended_files_get_distinct_granules_and_slots() {
        let mut image = DiskImage::new();
        image.add_file(&sample("ONE", vec![1; 100])).unwrap();
        image.add_file(&sample("TWO", vec![2; 100])).unwrap();

        let firsts = image.first_granules();
        assert_eq!(firsts.len(), 2);
        assert_ne!(firsts[0], firsts[1]);

        let files = image.list_files().unwrap();
        assert_eq!(files[0].name, "ONE");
        assert_eq!(files[1].name, "TWO");
        assert_eq!(files[0].data, vec![1; 100]);
        assert_eq!(files[1].data, vec![2; 100]);
    }

    #[test]
    fn full_directory_reports_container_full() {
        let mut image = DiskImage::new();
        // Mark every directory entry used.
        for entry in 0..DIR_ENTRIES {
            let offset = DiskImage::dir_entry_offset(entry);
            image.buffer[offset] = b'X';
        }
        let err = image.add_file(&sample("MORE", vec![0])).unwrap_err();
        assert_eq!(err.kind(), AsmErrorKind::ContainerFull);
    }

    #[test]
    fn exhausted_fat_reports_container_full() {
        let mut image = DiskImage::new();
        for granule in 0..TOTAL_GRANULES as u8 {
            image.set_fat(granule, FAT_LAST_BASE + 1);
        }
        let err = image.add_file(&sample("MORE", vec![0])).unwrap_err();
        assert_eq!(err.kind(), AsmErrorKind::ContainerFull);
    }

    #[test]
    fn wrong_size_image_is_rejected() {
        let err = DiskImage::from_bytes(vec![0; 100]).unwrap_err();
        assert!(err.message().contains("161280"));
    }

    #[test]
    fn granules_skip_the_directory_track() {
        // Granule 33 ends where track 17 begins; granule 34 starts
        // after the directory track.
        assert_eq!(DiskImage::granule_offset(33), 33 * GRANULE_SIZE);
        assert_eq!(DiskImage::granule_offset(34), 36 * GRANULE_SIZE);
    }
}
