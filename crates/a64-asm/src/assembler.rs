//! Two-pass driver.
//!
//! Pass one walks the source assigning 4-byte slots to instruction lines and
//! binding labels to the next slot. Pass two parses and encodes every
//! instruction against the finished table.

use std::fs;
use std::path::Path;

use tracing::{debug, trace};

use crate::encoder::encode;
use crate::error::AsmError;
use crate::parser::{is_identifier, parse_line};
use crate::symbols::SymbolTable;

enum LineKind<'a> {
    Blank,
    Label(&'a str),
    Instruction(&'a str),
}

fn strip_comment(line: &str) -> &str {
    let end = [line.find("//"), line.find(';')]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(line.len());
    &line[..end]
}

fn classify(line: &str) -> LineKind<'_> {
    let text = strip_comment(line).trim();
    if text.is_empty() {
        return LineKind::Blank;
    }
    match text.strip_suffix(':') {
        Some(name) if is_identifier(name) => LineKind::Label(name),
        _ => LineKind::Instruction(text),
    }
}

/// Build the symbol table and count the instruction slots.
pub fn first_pass(src: &str) -> Result<(SymbolTable, usize), AsmError> {
    let mut symbols = SymbolTable::new();
    let mut count = 0usize;
    for (i, line) in src.lines().enumerate() {
        match classify(line) {
            LineKind::Blank => {}
            LineKind::Label(name) => {
                let address = count as u64 * 4;
                symbols.define(name, address).map_err(|e| e.at(i + 1))?;
                debug!(label = name, address, "label");
            }
            LineKind::Instruction(_) => count += 1,
        }
    }
    debug!(labels = symbols.len(), instructions = count, "first pass done");
    Ok((symbols, count))
}

pub fn assemble(src: &str) -> Result<Vec<u32>, AsmError> {
    let (symbols, expected) = first_pass(src)?;
    let mut words = Vec::with_capacity(expected);
    for (i, line) in src.lines().enumerate() {
        let LineKind::Instruction(text) = classify(line) else {
            continue;
        };
        let address = words.len() as u64 * 4;
        let word = parse_line(text)
            .and_then(|insn| encode(&insn, address, &symbols))
            .map_err(|e| e.at(i + 1))?;
        trace!(line = i + 1, address, "{word:08x}  {text}");
        words.push(word);
    }
    if words.len() != expected {
        return Err(AsmError::CountMismatch {
            expected,
            actual: words.len(),
        });
    }
    debug!(words = words.len(), "second pass done");
    Ok(words)
}

/// Little-endian byte image.
pub fn to_bytes(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_le_bytes()).collect()
}

/// Assemble `input` into `output`; nothing is written on failure.
pub fn assemble_file(input: &Path, output: &Path) -> Result<usize, AsmError> {
    let src = fs::read_to_string(input)?;
    let words = assemble(&src)?;
    fs::write(output, to_bytes(&words))?;
    Ok(words.len())
}
