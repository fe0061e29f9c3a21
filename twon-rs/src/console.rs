//! Where script output goes.
//!
//! `print`, `output` and `?(..)` write program text; statement failures are
//! reported as the offending line followed by the indented message.  The
//! binary uses [`StdConsole`]; tests capture everything with [`Transcript`].

use std::cell::RefCell;
use std::fmt;
use std::io::{self, Write};
use std::rc::Rc;

use tracing::{debug, warn};

use crate::script::error::ScriptError;

/// Sink for program output and non-fatal error reports.
pub trait Console {
    /// Emit one line of program output.
    fn print(&mut self, text: &str);

    /// Report a statement that failed; execution continues afterwards.
    fn report(&mut self, source: &str, err: &ScriptError);
}

/// Writes everything to a byte stream, standard output by default.
///
/// The first failed write closes the console; later output is dropped so a
/// closed pipe does not interrupt the script.
#[derive(Debug)]
pub struct StdConsole<W = io::Stdout> {
    out: W,
    closed: bool,
}

impl StdConsole {
    pub fn new() -> Self {
        Self::with_writer(io::stdout())
    }
}

impl Default for StdConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> StdConsole<W> {
    pub fn with_writer(out: W) -> Self {
        StdConsole { out, closed: false }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, args: fmt::Arguments<'_>) {
        if self.closed {
            return;
        }
        if let Err(e) = writeln!(self.out, "{args}") {
            self.closed = true;
            if e.kind() == io::ErrorKind::BrokenPipe {
                debug!("output closed by reader");
            } else {
                warn!(error = %e, "cannot write script output");
            }
        }
    }
}

impl<W: Write> Console for StdConsole<W> {
    fn print(&mut self, text: &str) {
        self.line(format_args!("{text}"));
    }

    fn report(&mut self, source: &str, err: &ScriptError) {
        self.line(format_args!("Error in line: {source}"));
        self.line(format_args!("  {err}"));
    }
}

// ── Transcript ────────────────────────────────────────────────────────────────

/// One captured console event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Print(String),
    Error { source: String, message: String },
}

/// In-memory console.  Clones share the same log, so a test can keep one
/// handle and give the other to an interpreter.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    entries: Rc<RefCell<Vec<Entry>>>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every event in order.
    pub fn entries(&self) -> Vec<Entry> {
        self.entries.borrow().clone()
    }

    /// Printed lines only.
    pub fn printed(&self) -> Vec<String> {
        self.entries
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Entry::Print(text) => Some(text.clone()),
                Entry::Error { .. } => None,
            })
            .collect()
    }

    /// `(source, message)` of every reported error.
    pub fn errors(&self) -> Vec<(String, String)> {
        self.entries
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Entry::Error { source, message } => Some((source.clone(), message.clone())),
                Entry::Print(_) => None,
            })
            .collect()
    }
}

impl Console for Transcript {
    fn print(&mut self, text: &str) {
        self.entries.borrow_mut().push(Entry::Print(text.to_owned()));
    }

    fn report(&mut self, source: &str, err: &ScriptError) {
        self.entries.borrow_mut().push(Entry::Error {
            source: source.to_owned(),
            message: err.to_string(),
        });
    }
}
