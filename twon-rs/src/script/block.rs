//! Source lines and block extraction.
//!
//! A 2n script is a flat sequence of trimmed lines.  Blocks are delimited by
//! lines holding exactly `{` and `}`; [`collect_block`] slices one such block
//! out of the sequence, respecting nesting.

/// One significant source line with its 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    pub number: usize,
    pub text: String,
}

pub const OPEN: &str = "{";
pub const CLOSE: &str = "}";

/// Split `src` into trimmed lines, dropping blank lines and `#` comments.
pub fn source_lines(src: &str) -> Vec<SourceLine> {
    src.lines()
        .enumerate()
        .map(|(i, raw)| (i + 1, raw.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(number, text)| SourceLine {
            number,
            text: text.to_owned(),
        })
        .collect()
}

/// Why [`collect_block`] failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockError {
    /// `start` is past the end or does not hold `{`.
    ExpectedOpen,
    /// The `{` at `start` has no matching `}`.
    Unclosed,
}

/// Extract the block that opens at `lines[start]`.
///
/// Returns the lines strictly between the `{` and its matching `}` together
/// with the index just past that `}`.  Nested blocks are returned whole.
pub fn collect_block(lines: &[SourceLine], start: usize) -> Result<(&[SourceLine], usize), BlockError> {
    match lines.get(start) {
        Some(line) if line.text == OPEN => {}
        _ => return Err(BlockError::ExpectedOpen),
    }

    let body_start = start + 1;
    let mut depth = 0usize;
    for (i, line) in lines.iter().enumerate().skip(body_start) {
        match line.text.as_str() {
            OPEN => depth += 1,
            CLOSE if depth == 0 => return Ok((&lines[body_start..i], i + 1)),
            CLOSE => depth -= 1,
            _ => {}
        }
    }
    Err(BlockError::Unclosed)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
