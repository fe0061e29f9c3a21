//! Command-line argument parsing.
//!
//! Usage:
//!   twon [--] <file.2n>

use std::path::PathBuf;

use crate::script::stmt::SCRIPT_EXT;

// ── Public types ──────────────────────────────────────────────────────────────

/// Parsed command-line arguments.
#[derive(Debug)]
pub struct CliArgs {
    /// Entry script to run.
    pub source: PathBuf,
}

/// One-line usage text.
pub fn usage() -> String {
    format!("usage: twon <file.{SCRIPT_EXT}>")
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Parse `std::env::args()` and return [`CliArgs`] or an error message.
pub fn parse_args() -> Result<CliArgs, String> {
    let raw: Vec<String> = std::env::args().collect();
    parse_argv(raw.get(1..).unwrap_or_default())
}

/// Parse a slice of argument strings (exposed for testing).
pub fn parse_argv(argv: &[String]) -> Result<CliArgs, String> {
    let mut positional: Vec<&str> = Vec::new();
    let mut rest = argv.iter();

    while let Some(arg) = rest.next() {
        // `--` ends option processing.
        if arg == "--" {
            positional.extend(rest.by_ref().map(String::as_str));
            break;
        }
        if arg.starts_with('-') && arg != "-" {
            return Err(format!("unknown option: {arg}"));
        }
        positional.push(arg);
    }

    match positional.as_slice() {
        [] => Err("missing script path".to_owned()),
        [source] => Ok(CliArgs {
            source: PathBuf::from(source),
        }),
        more => Err(format!("too many arguments ({})", more.len())),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
