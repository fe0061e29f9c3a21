//! Error types for the 2n interpreter.

use thiserror::Error;

/// Everything that can go wrong while loading or running a 2n script.
///
/// Only the structural variants are fatal: they mean block boundaries can no
/// longer be trusted.  Every other variant is reported at the statement that
/// raised it and execution resumes with the next statement.
#[derive(Debug, Error)]
pub enum ScriptError {
    // ── Structural ─────────────────────────────────────────────────────────
    /// A block header is not followed by a `{` line.
    #[error("line {line}: expected '{{' to start the block of `{header}`")]
    ExpectedBlock { line: usize, header: String },

    /// The input ended before the `}` matching a `{`.
    #[error("line {line}: expected '}}' to close the block opened here")]
    UnclosedBlock { line: usize },

    // ── Semantic ───────────────────────────────────────────────────────────
    #[error("{0} is not defined")]
    Undefined(String),

    #[error("function '{0}' is not defined")]
    UndefinedFunction(String),

    /// A statement that does not have the shape its keyword requires.
    #[error("invalid syntax: {0}")]
    Syntax(String),

    #[error("{name} is not a list")]
    NotAList { name: String },

    #[error("'{0}' is not a number")]
    NotNumeric(String),

    #[error("the random source is empty")]
    EmptyRandomPool,

    #[error("unsupported operator '{0}' in expression")]
    UnsupportedOperator(String),

    /// Arithmetic that does not reduce to a single number.
    #[error("invalid expression: {0}")]
    Arithmetic(String),

    #[error("JSON '{context}' has no key '{key}'")]
    MissingKey { context: String, key: String },

    #[error("JSON '{0}' is not an object")]
    NotAnObject(String),

    /// `json.getkey`/`json.addkey` outside of an `operation` block.
    #[error("{0} can only be used inside an operation block")]
    NoActiveContext(&'static str),

    #[error("JSON '{0}' has not been loaded")]
    UnknownContext(String),

    #[error("cannot start operation '{requested}' while '{active}' is active")]
    ContextActive { active: String, requested: String },

    #[error("`{0}` does not produce a value")]
    NoValue(String),

    #[error("call depth limit of {0} exceeded")]
    CallDepth(usize),

    #[error("invalid loop count: {0}")]
    LoopCount(String),

    // ── Imports and persistence ────────────────────────────────────────────
    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// The script is already running further up the import chain.
    #[error("'{0}' is already being imported")]
    ImportCycle(String),

    #[error("error importing {path}: {source}")]
    Import {
        path: String,
        #[source]
        source: Box<ScriptError>,
    },

    /// A `break` that escaped every enclosing loop.
    #[error("'break' outside of a loop")]
    StrayBreak,
}

impl ScriptError {
    /// Structural errors abort the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ScriptError::ExpectedBlock { .. } | ScriptError::UnclosedBlock { .. }
        )
    }
}
