//! Variable substitution.
//!
//! Before a condition or an arithmetic line is evaluated, every identifier
//! token in it is replaced by the textual form of the variable it names:
//!
//! | Token              | Replaced?                                        |
//! |--------------------|--------------------------------------------------|
//! | `hp`, `player.hp`  | yes, if the variable exists                      |
//! | `3`, `2.5`         | never; numeric literals are not looked up        |
//! | unknown name       | strict: error; lenient: left verbatim            |
//!
//! Lenient mode exists so keywords in a statement are not mistaken for
//! undefined variables.

use std::sync::OnceLock;

use regex::{Captures, Regex};

use super::error::ScriptError;
use crate::var::VarStore;

/// How unknown names are treated by [`substitute`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// An unknown name is an error.
    Strict,
    /// An unknown name stays as written.
    Lenient,
}

fn token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\w+(?:\.\w+)*\b").expect("valid token regex"))
}

fn numeric_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+(?:\.\d+)?$").expect("valid numeric regex"))
}

/// `true` if `token` is a plain numeric literal such as `42` or `3.5`.
pub fn is_numeric_literal(token: &str) -> bool {
    numeric_re().is_match(token)
}

/// Replace every variable token in `src` with its value.
pub fn substitute(src: &str, vars: &VarStore, mode: Resolution) -> Result<String, ScriptError> {
    let mut undefined = None;
    let out = token_re().replace_all(src, |caps: &Captures<'_>| {
        let token = &caps[0];
        if is_numeric_literal(token) {
            return token.to_owned();
        }
        match vars.get(token) {
            Some(value) => value.to_string(),
            None => {
                if mode == Resolution::Strict && undefined.is_none() {
                    undefined = Some(token.to_owned());
                }
                token.to_owned()
            }
        }
    });
    match undefined {
        Some(name) => Err(ScriptError::Undefined(name)),
        None => Ok(out.into_owned()),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
