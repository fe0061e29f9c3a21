//! Runtime value type for the 2n scripting language.
//!
//! 2n knows exactly two kinds of data: a single float and a list of floats.
//! Text only ever appears as the literal of a `print` statement.

use std::fmt;

use super::error::ScriptError;

/// A 2n runtime value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    /// Always sorted ascending and free of duplicates once written by `addlist`.
    List(Vec<f64>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(x) => write!(f, "{}", format_number(*x)),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, x) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_str(&format_number(*x))?;
                }
                f.write_str("]")
            }
        }
    }
}

/// Render a float the way 2n scripts expect to see it: integral values keep
/// one decimal (`5.0`), everything else uses the shortest round-trip form.
pub fn format_number(x: f64) -> String {
    if x.is_nan() {
        "nan".to_owned()
    } else if x.is_infinite() {
        if x > 0.0 { "inf" } else { "-inf" }.to_owned()
    } else if x.fract() == 0.0 && x.abs() < 1e16 {
        format!("{x:.1}")
    } else {
        format!("{x}")
    }
}

impl Value {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(x) => Some(*x),
            Value::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[f64]> {
        match self {
            Value::List(items) => Some(items),
            Value::Number(_) => None,
        }
    }

    /// Coerce to a list: a scalar becomes a one-element list.
    pub fn to_list(&self) -> Vec<f64> {
        match self {
            Value::Number(x) => vec![*x],
            Value::List(items) => items.clone(),
        }
    }
}

// ── List helpers ──────────────────────────────────────────────────────────────

/// Sort ascending and drop duplicates in place.
///
/// `-0.0` and `0.0` compare equal and collapse to one entry.
pub fn normalize_list(items: &mut Vec<f64>) {
    items.sort_by(f64::total_cmp);
    items.dedup_by(|a, b| a == b);
}

/// Union `incoming` into `existing`, returning the normalized result.
pub fn union_lists(existing: &[f64], incoming: &[f64]) -> Vec<f64> {
    let mut merged = Vec::with_capacity(existing.len() + incoming.len());
    merged.extend_from_slice(existing);
    merged.extend_from_slice(incoming);
    normalize_list(&mut merged);
    merged
}

/// Parse an inline comma-separated numeric list (`3, 1,2`).  Empty items are
/// skipped, so `""` and `","` both yield an empty list.
pub fn parse_number_list(src: &str) -> Result<Vec<f64>, ScriptError> {
    src.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            item.parse::<f64>()
                .map_err(|_| ScriptError::NotNumeric(item.to_owned()))
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
