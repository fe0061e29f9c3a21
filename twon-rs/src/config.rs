//! Interpreter configuration from the environment.
//!
//! | Variable              | Field            | Default |
//! |-----------------------|------------------|---------|
//! | `TWON_PERSIST_DIR`    | `persist_dir`    | `.`     |
//! | `TWON_SEED`           | `seed`           | entropy |
//! | `TWON_MAX_CALL_DEPTH` | `max_call_depth` | 64      |
//!
//! A value that fails to parse is reported and the default is kept.

use std::path::PathBuf;

pub const PERSIST_DIR_VAR: &str = "TWON_PERSIST_DIR";
pub const SEED_VAR: &str = "TWON_SEED";
pub const MAX_CALL_DEPTH_VAR: &str = "TWON_MAX_CALL_DEPTH";

pub const DEFAULT_MAX_CALL_DEPTH: usize = 64;

// ── Public API ────────────────────────────────────────────────────────────────

/// A non-fatal error encountered while reading the environment.
#[derive(Debug)]
pub struct ConfigError {
    pub var: &'static str,
    pub message: String,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.var, self.message)
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct Config {
    /// Directory `operation` blocks write their documents into.
    pub persist_dir: PathBuf,
    /// Seed for `random[..]`; `None` seeds from the OS.
    pub seed: Option<u64>,
    /// How deep `action` calls may nest.
    pub max_call_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            persist_dir: PathBuf::from("."),
            seed: None,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

impl Config {
    /// Read the process environment.
    pub fn from_env() -> (Self, Vec<ConfigError>) {
        Self::from_vars(std::env::vars())
    }

    /// Build a config from `(name, value)` pairs; unrelated names are ignored.
    pub fn from_vars<I, K, V>(vars: I) -> (Self, Vec<ConfigError>)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = Config::default();
        let mut errors = Vec::new();

        for (key, value) in vars {
            let value = value.as_ref().trim();
            match key.as_ref() {
                PERSIST_DIR_VAR => {
                    if value.is_empty() {
                        errors.push(ConfigError {
                            var: PERSIST_DIR_VAR,
                            message: "empty path".into(),
                        });
                    } else {
                        config.persist_dir = PathBuf::from(value);
                    }
                }
                SEED_VAR => match value.parse() {
                    Ok(seed) => config.seed = Some(seed),
                    Err(e) => errors.push(ConfigError {
                        var: SEED_VAR,
                        message: format!("'{value}': {e}"),
                    }),
                },
                MAX_CALL_DEPTH_VAR => match value.parse::<usize>() {
                    Ok(0) => errors.push(ConfigError {
                        var: MAX_CALL_DEPTH_VAR,
                        message: "must be at least 1".into(),
                    }),
                    Ok(depth) => config.max_call_depth = depth,
                    Err(e) => errors.push(ConfigError {
                        var: MAX_CALL_DEPTH_VAR,
                        message: format!("'{value}': {e}"),
                    }),
                },
                _ => {}
            }
        }

        (config, errors)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
