//! The 2n scripting language.
//!
//! A tree-walking interpreter covering:
//!
//! - Variables holding a number or a sorted list of numbers
//! - Parenthesized arithmetic with one operator per group
//! - Control flow: `if ?(..)` / `else if` / `else`, `while`, `for`, `break`
//! - Functions (`function NAME` / `action NAME()`)
//! - Random draws, list unions, and JSON documents bound to `operation` blocks
//! - `import.2n` / `import.json`
//!
//! # Quick start
//!
//! ```rust
//! use twon::script::{Interpreter, Value};
//!
//! let mut interp = Interpreter::new();
//! interp.run_source("input x = (6 * 7)").unwrap();
//! assert_eq!(interp.var("x"), Some(&Value::Number(42.0)));
//! ```

pub mod block;
pub mod error;
pub mod eval;
pub mod expand;
pub mod expr;
pub mod interp;
pub mod stmt;
pub mod value;

// Re-exports for convenience.
pub use error::ScriptError;
pub use eval::Evaluated;
pub use interp::{FileLoader, Flow, Interpreter};
pub use value::Value;
