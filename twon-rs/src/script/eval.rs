//! Statement evaluator.
//!
//! Interprets one bare statement line.  Forms are recognised by prefix and
//! the first match wins:
//!
//! | Prefix        | Form                                   |
//! |---------------|----------------------------------------|
//! | `action `     | `action NAME()`                        |
//! | `print `      | `print "TEXT"`                         |
//! | `output `     | `output NAME`                          |
//! | `?(`          | `?(COND)`                              |
//! | `break`       | `break`                                |
//! | `input `      | `input NAME = random[..]` / `= EXPR`   |
//! | `addlist `    | `addlist NAME = SOURCE`                |
//! | `getlist `    | `getlist NAME = json.addkey KEY`       |
//! | anything else | arithmetic                             |

use std::sync::OnceLock;

use rand::seq::SliceRandom;
use regex::Regex;

use super::error::ScriptError;
use super::expand::{substitute, Resolution};
use super::expr::{eval_arith, eval_condition};
use super::interp::{Flow, Interpreter};
use super::value::{parse_number_list, union_lists, Value};

/// Result of evaluating one statement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Evaluated {
    /// A side-effect-only statement.
    Unit,
    /// An arithmetic line's result.
    Value(f64),
    /// `break`, possibly raised from inside a called function.
    Break,
}

macro_rules! statement_re {
    ($name:ident, $pattern:expr) => {
        fn $name() -> &'static Regex {
            static RE: OnceLock<Regex> = OnceLock::new();
            RE.get_or_init(|| Regex::new($pattern).expect("valid statement regex"))
        }
    };
}

statement_re!(action_re, r"^action\s+(\w+)\s*\(\)");
statement_re!(print_re, r#"^print\s+"(.*?)""#);
statement_re!(input_re, r"^input\s+(\w+)\s*=\s*(.+)");
statement_re!(random_re, r"^random\[\s*(.*?)\s*\]$");
statement_re!(addlist_re, r"^addlist\s+(\w+(?:\.\w+)*)\s*=\s*(.+)");
statement_re!(getlist_re, r"^getlist\s+(\w+(?:\.\w+)*)\s*=\s*json\.addkey\s+(\w+)");

const GETKEY: &str = "json.getkey ";

impl Interpreter {
    /// Evaluate one statement line.
    pub fn eval_statement(&mut self, text: &str) -> Result<Evaluated, ScriptError> {
        if text.starts_with("action ") {
            return self.eval_action(text);
        }
        if text.starts_with("print ") {
            let caps = print_re()
                .captures(text)
                .ok_or_else(|| ScriptError::Syntax("expected print \"...\"".into()))?;
            self.console.print(&caps[1]);
            return Ok(Evaluated::Unit);
        }
        if text.starts_with("output ") {
            return self.eval_output(text);
        }
        if let Some(cond) = text.strip_prefix("?(").and_then(|rest| rest.strip_suffix(')')) {
            let holds = self.condition(cond.trim())?;
            self.console.print(if holds { "true" } else { "false" });
            return Ok(Evaluated::Unit);
        }
        if text == "break" {
            return Ok(Evaluated::Break);
        }
        if text.starts_with("input ") {
            return self.eval_input(text);
        }
        if text.starts_with("addlist ") {
            self.eval_addlist(text)?;
            return Ok(Evaluated::Unit);
        }
        if text.starts_with("getlist ") {
            self.eval_getlist(text)?;
            return Ok(Evaluated::Unit);
        }

        let substituted = substitute(text, &self.vars, Resolution::Lenient)?;
        eval_arith(&substituted).map(Evaluated::Value)
    }

    /// Evaluate a condition with strict name resolution.
    pub fn condition(&self, text: &str) -> Result<bool, ScriptError> {
        let substituted = substitute(text, &self.vars, Resolution::Strict)?;
        eval_condition(&substituted)
    }

    fn eval_action(&mut self, text: &str) -> Result<Evaluated, ScriptError> {
        let caps = action_re()
            .captures(text)
            .ok_or_else(|| ScriptError::Syntax("expected action NAME()".into()))?;
        Ok(match self.call_function(&caps[1])? {
            Flow::Break => Evaluated::Break,
            Flow::Normal => Evaluated::Unit,
        })
    }

    fn eval_output(&mut self, text: &str) -> Result<Evaluated, ScriptError> {
        let parts: Vec<&str> = text.split_whitespace().collect();
        let &[_, name] = parts.as_slice() else {
            return Err(ScriptError::Syntax("expected output NAME".into()));
        };
        let rendered = self
            .vars
            .get(name)
            .ok_or_else(|| ScriptError::Undefined(name.to_owned()))?
            .to_string();
        self.console.print(&rendered);
        Ok(Evaluated::Unit)
    }

    fn eval_input(&mut self, text: &str) -> Result<Evaluated, ScriptError> {
        let caps = input_re()
            .captures(text)
            .ok_or_else(|| ScriptError::Syntax("expected input NAME = EXPR".into()))?;
        let name = caps[1].to_owned();
        let expr = caps[2].to_owned();

        let compact: String = expr.chars().filter(|c| *c != ' ').collect();
        if let Some(random) = random_re().captures(&compact) {
            let picked = self.draw(&random[1])?;
            self.vars.set(name, Value::Number(picked));
            return Ok(Evaluated::Unit);
        }

        match self.eval_statement(&expr)? {
            Evaluated::Value(x) => {
                self.vars.set(name, Value::Number(x));
                Ok(Evaluated::Unit)
            }
            Evaluated::Break => Ok(Evaluated::Break),
            Evaluated::Unit => Err(ScriptError::NoValue(expr)),
        }
    }

    /// Pick one element of a list variable or an inline list.
    fn draw(&mut self, source: &str) -> Result<f64, ScriptError> {
        let inline;
        let pool: &[f64] = match self.vars.get(source) {
            Some(value) => value.as_list().ok_or_else(|| ScriptError::NotAList {
                name: source.to_owned(),
            })?,
            None => {
                inline = parse_number_list(source)?;
                &inline
            }
        };
        pool.choose(&mut self.rng)
            .copied()
            .ok_or(ScriptError::EmptyRandomPool)
    }

    fn eval_addlist(&mut self, text: &str) -> Result<(), ScriptError> {
        let caps = addlist_re()
            .captures(text)
            .ok_or_else(|| ScriptError::Syntax("expected addlist NAME = SOURCE".into()))?;
        let name = &caps[1];
        let source = &caps[2];

        let incoming = if let Some(key) = source.strip_prefix(GETKEY) {
            self.json.get_list(key.trim())?
        } else if let Some(value) = self.vars.get(source) {
            value.to_list()
        } else {
            parse_number_list(source)?
        };

        let existing = match self.vars.get(name) {
            None => &[][..],
            Some(value) => value.as_list().ok_or_else(|| ScriptError::NotAList {
                name: name.to_owned(),
            })?,
        };
        let merged = union_lists(existing, &incoming);
        self.vars.set(name, Value::List(merged));
        Ok(())
    }

    fn eval_getlist(&mut self, text: &str) -> Result<(), ScriptError> {
        let caps = getlist_re().captures(text).ok_or_else(|| {
            ScriptError::Syntax("expected getlist NAME = json.addkey KEY".into())
        })?;
        let name = &caps[1];
        let key = &caps[2];

        if self.json.active().is_none() {
            return Err(ScriptError::NoActiveContext("json.addkey"));
        }
        let items = match self.vars.get_list(name) {
            Some(items) => items.to_vec(),
            None if self.vars.get(name).is_some() => {
                return Err(ScriptError::NotAList {
                    name: name.to_owned(),
                })
            }
            None => return Err(ScriptError::Undefined(name.to_owned())),
        };
        self.json.set_list(key, &items)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
