// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Source reader.
//!
//! Reads an assembly source file and expands `INCLUDE "path"` lines in
//! place before pass 1. Includes nest; a file including itself, at any
//! depth, is an error.

use std::fs;
use std::path::{Path, PathBuf};

use crate::core::error::{AsmError, AsmErrorKind};
use crate::core::tokenizer::scan_fields;

/// Read a source file and return its fully include-expanded lines.
pub fn read_source(path: &Path) -> Result<Vec<String>, AsmError> {
    let mut stack = Vec::new();
    expand_file(path, &mut stack)
}

fn expand_file(path: &Path, stack: &mut Vec<PathBuf>) -> Result<Vec<String>, AsmError> {
    let canonical = fs::canonicalize(path).map_err(|err| io_error(path, &err))?;
    if stack.contains(&canonical) {
        return Err(AsmError::new(
            AsmErrorKind::IncludeCycle,
            "include cycle detected",
            Some(path.to_string_lossy().as_ref()),
        ));
    }

    let text = fs::read_to_string(path).map_err(|err| io_error(path, &err))?;
    let base_dir = canonical.parent().map(Path::to_path_buf).unwrap_or_default();

    stack.push(canonical);
    let mut lines = Vec::new();
    for line in text.lines() {
        match include_path(line) {
            Some(include) => {
                let target = base_dir.join(include);
                lines.extend(expand_file(&target, stack)?);
            }
            None => lines.push(line.to_string()),
        }
    }
    stack.pop();
    Ok(lines)
}

/// Return the include target if the line is an `INCLUDE` statement.
fn include_path(line: &str) -> Option<String> {
    let fields = scan_fields(line, 0);
    if fields.mnemonic.as_deref() != Some("INCLUDE") {
        return None;
    }
    let operand = fields.operand.unwrap_or_default();
    let operand = operand.split(';').next().unwrap_or("").trim();
    Some(operand.trim_matches('"').to_string())
}

fn io_error(path: &Path, err: &std::io::Error) -> AsmError {
    AsmError::new(
        AsmErrorKind::Io,
        &format!("cannot read source file: {err}"),
        Some(path.to_string_lossy().as_ref()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEST_DIR_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn scratch_dir() -> PathBuf {
        let mut dir = std::env::temp_dir();
        let counter = TEST_DIR_COUNTER.fetch_add(1, Ordering::Relaxed);
        dir.push(format!(
            "cocoforge-src-{}-{counter}",
            std::process::id()
        ));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn reads_plain_source() {
        let dir = scratch_dir();
        let main = dir.join("main.asm");
        fs::write(&main, " ORG $0E00\n NOP\n").unwrap();
        let lines = read_source(&main).unwrap();
        assert_eq!(lines, vec![" ORG $0E00".to_string(), " NOP".to_string()]);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn expands_nested_includes_in_place() {
        let dir = scratch_dir();
        fs::write(dir.join("inner.asm"), " NOP\n").unwrap();
        fs::write(
            dir.join("mid.asm"),
            " INCLUDE \"inner.asm\"\n RTS\n",
        )
        .unwrap();
        let main = dir.join("main.asm");
        fs::write(&main, " ORG $100\n INCLUDE \"mid.asm\"\n END\n").unwrap();

        let lines = read_source(&main).unwrap();
        assert_eq!(
            lines,
            vec![
                " ORG $100".to_string(),
                " NOP".to_string(),
                " RTS".to_string(),
                " END".to_string(),
            ]
        );
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn detects_include_cycles() {
        let dir = scratch_dir();
        fs::write(dir.join("a.asm"), " INCLUDE \"b.asm\"\n").unwrap();
        fs::write(dir.join("b.asm"), " INCLUDE \"a.asm\"\n").unwrap();
        let err = read_source(&dir.join("a.asm")).unwrap_err();
        assert_eq!(err.kind(), AsmErrorKind::IncludeCycle);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_include_is_an_io_error() {
        let dir = scratch_dir();
        let main = dir.join("main.asm");
        fs::write(&main, " INCLUDE \"nope.asm\"\n").unwrap();
        let err = read_source(&main).unwrap_err();
        assert_eq!(err.kind(), AsmErrorKind::Io);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn same_file_twice_without_cycle_is_allowed() {
        let dir = scratch_dir();
        fs::write(dir.join("inc.asm"), " NOP\n").unwrap();
        let main = dir.join("main.asm");
        fs::write(
            &main,
            " INCLUDE \"inc.asm\"\n INCLUDE \"inc.asm\"\n",
        )
        .unwrap();
        let lines = read_source(&main).unwrap();
        assert_eq!(lines, vec![" NOP".to_string(), " NOP".to_string()]);
        let _ = fs::remove_dir_all(&dir);
    }
}
