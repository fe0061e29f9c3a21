//! 2n statement tree and script-level parser.
//!
//! A 2n script is a sequence of lines.  Each line is either a block header
//! (`while`, `for 3`, `if ?(x > 1)`, …) whose body follows as a `{ … }`
//! block, or a bare statement handed to the evaluator at run time.  The tree
//! is built once, before anything executes.  A header whose block cannot be
//! delimited becomes a [`Stmt::Malformed`] node and parsing of that sequence
//! stops there; the node is fatal only if execution reaches it.

use std::rc::Rc;

use super::block::{collect_block, source_lines, BlockError, SourceLine, CLOSE, OPEN};
use super::error::ScriptError;

/// File extension of 2n sources.
pub const SCRIPT_EXT: &str = "2n";

const IMPORT_SCRIPT: &str = "import.2n";
const IMPORT_JSON: &str = "import.json";

/// A parsed 2n statement.
#[derive(Debug, Clone)]
pub enum Stmt {
    /// A contiguous run of `if` / `else if` / `else` headers with their blocks.
    Chain(Vec<Branch>),
    /// `while { body }`; runs until the body breaks.
    While { body: Vec<Stmt> },
    /// `for <count> { body }`
    For {
        header: String,
        count: String,
        body: Vec<Stmt>,
    },
    /// `function <name> { body }`
    Function { name: String, body: Rc<[Stmt]> },
    /// `import.2n <path>`
    ImportScript { header: String, path: Option<String> },
    /// `import.json <path>`
    ImportJson { header: String, path: Option<String> },
    /// `operation <name> { body }`
    Operation {
        header: String,
        name: String,
        body: Vec<Stmt>,
    },
    /// Any other line, evaluated as an expression statement.
    Line(String),
    /// A header whose block could not be delimited.  Nothing after it in the
    /// same sequence was parsed.
    Malformed(Malformed),
}

/// Broken block structure, kept in the tree until execution reaches it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Malformed {
    /// The header line for a missing `{`, the `{` line for a missing `}`.
    pub line: usize,
    pub header: String,
    pub fault: BlockError,
}

impl Malformed {
    pub fn to_error(&self) -> ScriptError {
        match self.fault {
            BlockError::ExpectedOpen => ScriptError::ExpectedBlock {
                line: self.line,
                header: self.header.clone(),
            },
            BlockError::Unclosed => ScriptError::UnclosedBlock { line: self.line },
        }
    }
}

/// One arm of a conditional chain.
#[derive(Debug, Clone)]
pub struct Branch {
    /// The header line as written, used when reporting condition errors.
    pub header: String,
    /// The condition text; `None` for `else`.
    pub cond: Option<String>,
    pub body: Vec<Stmt>,
}

// ── Parser ────────────────────────────────────────────────────────────────────

/// Parse a 2n source string into a statement tree.
pub fn parse_script(src: &str) -> Vec<Stmt> {
    parse_lines(&source_lines(src))
}

/// Parse already-split source lines into a statement tree.
pub fn parse_lines(lines: &[SourceLine]) -> Vec<Stmt> {
    let mut stmts = Vec::new();
    if let Err(fault) = (StmtParser { lines, pos: 0 }).parse_into(&mut stmts) {
        stmts.push(Stmt::Malformed(fault));
    }
    stmts
}

struct StmtParser<'a> {
    lines: &'a [SourceLine],
    pos: usize,
}

impl<'a> StmtParser<'a> {
    fn parse_into(&mut self, stmts: &mut Vec<Stmt>) -> Result<(), Malformed> {
        let lines = self.lines;
        while let Some(line) = lines.get(self.pos) {
            let text = line.text.as_str();

            // A brace that no header claimed is transparent.
            if text == OPEN || text == CLOSE {
                self.pos += 1;
                continue;
            }

            if is_branch_header(text) {
                self.parse_chain(stmts)?;
                continue;
            }

            let stmt = if text == "while" {
                Stmt::While {
                    body: self.parse_body()?,
                }
            } else if let Some(count) = text.strip_prefix("for ") {
                Stmt::For {
                    header: text.to_owned(),
                    count: count.trim().to_owned(),
                    body: self.parse_body()?,
                }
            } else if let Some(name) = text.strip_prefix("function ") {
                Stmt::Function {
                    name: name.trim().to_owned(),
                    body: self.parse_body()?.into(),
                }
            } else if text.starts_with(IMPORT_SCRIPT) {
                self.pos += 1;
                Stmt::ImportScript {
                    header: text.to_owned(),
                    path: import_path(text),
                }
            } else if text.starts_with(IMPORT_JSON) {
                self.pos += 1;
                Stmt::ImportJson {
                    header: text.to_owned(),
                    path: import_path(text),
                }
            } else if let Some(name) = text.strip_prefix("operation ") {
                Stmt::Operation {
                    header: text.to_owned(),
                    name: name.trim().to_owned(),
                    body: self.parse_body()?,
                }
            } else {
                self.pos += 1;
                Stmt::Line(text.to_owned())
            };
            stmts.push(stmt);
        }
        Ok(())
    }

    /// Collect the maximal run of branch headers starting at `pos`.
    ///
    /// Branches parsed before a broken one are kept as a chain of their own.
    fn parse_chain(&mut self, stmts: &mut Vec<Stmt>) -> Result<(), Malformed> {
        let lines = self.lines;
        let mut branches = Vec::new();
        let mut result = Ok(());
        while let Some(line) = lines.get(self.pos) {
            if !is_branch_header(&line.text) {
                break;
            }
            let header = line.text.clone();
            let cond = branch_condition(&header);
            match self.parse_body() {
                Ok(body) => branches.push(Branch { header, cond, body }),
                Err(fault) => {
                    result = Err(fault);
                    break;
                }
            }
        }
        if !branches.is_empty() {
            stmts.push(Stmt::Chain(branches));
        }
        result
    }

    /// The header is at `pos`; parse the block that follows it and move past it.
    fn parse_body(&mut self) -> Result<Vec<Stmt>, Malformed> {
        let lines = self.lines;
        let header = &lines[self.pos];
        let open_at = self.pos + 1;
        let (body, next) = collect_block(lines, open_at).map_err(|fault| {
            let line = match fault {
                BlockError::ExpectedOpen => header.number,
                BlockError::Unclosed => lines[open_at].number,
            };
            Malformed {
                line,
                header: header.text.clone(),
                fault,
            }
        })?;
        self.pos = next;
        Ok(parse_lines(body))
    }
}

// ── Small utilities ───────────────────────────────────────────────────────────

fn is_branch_header(text: &str) -> bool {
    text.starts_with("if ?(") || text.starts_with("else if ?(") || text == "else"
}

/// Extract `COND` from `if ?(COND)` / `else if ?(COND)`; `None` for `else`.
///
/// The condition runs from the first `?(` to the last `)`; without a closing
/// paren the rest of the line is taken.
fn branch_condition(header: &str) -> Option<String> {
    let (_, rest) = header.split_once("?(")?;
    let cond = match rest.rfind(')') {
        Some(end) => &rest[..end],
        None => rest,
    };
    Some(cond.to_owned())
}

/// The second whitespace-separated word of an import line.
fn import_path(text: &str) -> Option<String> {
    text.split_whitespace().nth(1).map(str::to_owned)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
