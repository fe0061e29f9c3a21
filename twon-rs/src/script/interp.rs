//! 2n script interpreter.
//!
//! The [`Interpreter`] owns every piece of runtime state (variables,
//! functions, JSON documents and the active context) and executes parsed
//! [`Stmt`] trees.  Bare statement lines are handed to
//! [`Interpreter::eval_statement`].
//!
//! `break` is not an error: every block execution returns a [`Flow`] and the
//! nearest enclosing `while`/`for` consumes [`Flow::Break`].  Everything else
//! passes it upward unchanged, including conditional chains, function calls
//! and operation blocks.
//!
//! The `Err` side of block execution is reserved for fatal errors: reaching
//! a [`Stmt::Malformed`] node unwinds the whole run, except that an import
//! turns it into a reported failure of that import.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

use super::error::ScriptError;
use super::eval::Evaluated;
use super::stmt::{parse_script, Branch, Stmt};
use super::value::{format_number, Value};
use crate::config::Config;
use crate::console::{Console, StdConsole};
use crate::json_store::{context_name, JsonStore};
use crate::var::VarStore;

// ── File loader callback ──────────────────────────────────────────────────────

/// Resolves a path to file contents for `import.2n`, `import.json` and the
/// entry script.
pub type FileLoader = Arc<dyn Fn(&Path) -> io::Result<String> + Send + Sync>;

fn read_file() -> FileLoader {
    Arc::new(|path: &Path| fs::read_to_string(path))
}

// ── Flow ──────────────────────────────────────────────────────────────────────

/// How a block finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Normal,
    /// A `break` is unwinding to the nearest loop.
    Break,
}

// ── Interpreter ───────────────────────────────────────────────────────────────

/// The 2n interpreter.  Instances share nothing.
pub struct Interpreter {
    pub(super) vars: VarStore,
    pub(super) functions: HashMap<String, Rc<[Stmt]>>,
    pub(super) json: JsonStore,
    pub(super) console: Box<dyn Console>,
    pub(super) rng: StdRng,
    /// Reads imported files; defaults to the filesystem.
    pub file_loader: FileLoader,
    config: Config,
    depth: usize,
    /// Scripts currently being run, outermost first.
    importing: Vec<PathBuf>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Default configuration, output to stdout.
    pub fn new() -> Self {
        Self::with_console(Config::default(), Box::new(StdConsole::new()))
    }

    pub fn with_config(config: Config) -> Self {
        Self::with_console(config, Box::new(StdConsole::new()))
    }

    pub fn with_console(config: Config, console: Box<dyn Console>) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Interpreter {
            vars: VarStore::new(),
            functions: HashMap::new(),
            json: JsonStore::new(),
            console,
            rng,
            file_loader: read_file(),
            config,
            depth: 0,
            importing: Vec::new(),
        }
    }

    // ── State access ──────────────────────────────────────────────────────────

    pub fn var(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn set_var(&mut self, name: impl Into<String>, value: Value) {
        self.vars.set(name, value);
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn json_document(&self, name: &str) -> Option<&serde_json::Value> {
        self.json.get(name)
    }

    /// Register a JSON document as if it had been imported.
    pub fn insert_document(&mut self, name: impl Into<String>, doc: serde_json::Value) {
        self.json.insert(name, doc);
    }

    /// Name of the operation context currently active, if any.
    pub fn active_context(&self) -> Option<&str> {
        self.json.active()
    }

    // ── Execution ─────────────────────────────────────────────────────────────

    /// Load and run the script at `path`.
    ///
    /// Only fatal problems come back as `Err`: an unreadable file, malformed
    /// block nesting that execution reached, a `break` outside any loop, or
    /// a script that is already being run further up the import chain.
    /// Statement errors are reported through the console and execution
    /// carries on.
    pub fn run_file(&mut self, path: &Path) -> Result<(), ScriptError> {
        if self.importing.iter().any(|p| p == path) {
            return Err(ScriptError::ImportCycle(path.display().to_string()));
        }
        if self.importing.len() >= self.config.max_call_depth {
            return Err(ScriptError::CallDepth(self.config.max_call_depth));
        }
        let src = (self.file_loader)(path).map_err(|source| ScriptError::Io {
            path: path.display().to_string(),
            source,
        })?;
        self.importing.push(path.to_path_buf());
        let result = self.run_source(&src);
        self.importing.pop();
        result
    }

    /// Parse and run a script held in memory.
    pub fn run_source(&mut self, src: &str) -> Result<(), ScriptError> {
        let stmts = parse_script(src);
        match self.exec_block(&stmts)? {
            Flow::Normal => Ok(()),
            Flow::Break => Err(ScriptError::StrayBreak),
        }
    }

    /// Execute a block of statements, stopping early on `break`.
    pub fn exec_block(&mut self, stmts: &[Stmt]) -> Result<Flow, ScriptError> {
        for stmt in stmts {
            if self.exec_stmt(stmt)? == Flow::Break {
                return Ok(Flow::Break);
            }
        }
        Ok(Flow::Normal)
    }

    /// Execute a single statement.
    pub fn exec_stmt(&mut self, stmt: &Stmt) -> Result<Flow, ScriptError> {
        match stmt {
            Stmt::Chain(branches) => self.exec_chain(branches),

            Stmt::While { body } => {
                while self.exec_block(body)? == Flow::Normal {}
                Ok(Flow::Normal)
            }

            Stmt::For { header, count, body } => self.exec_for(header, count, body),

            Stmt::Function { name, body } => {
                debug!(function = %name, "defined");
                self.functions.insert(name.clone(), Rc::clone(body));
                Ok(Flow::Normal)
            }

            Stmt::ImportScript { header, path } => {
                match path {
                    Some(path) => self.import_script(header, path),
                    None => self.report(header, &ScriptError::Syntax("expected import.2n PATH".into())),
                }
                Ok(Flow::Normal)
            }

            Stmt::ImportJson { header, path } => {
                match path {
                    Some(path) => self.import_json(header, path),
                    None => self.report(header, &ScriptError::Syntax("expected import.json PATH".into())),
                }
                Ok(Flow::Normal)
            }

            Stmt::Operation { header, name, body } => self.exec_operation(header, name, body),

            Stmt::Line(text) => match self.eval_statement(text) {
                Ok(Evaluated::Break) => Ok(Flow::Break),
                Ok(_) => Ok(Flow::Normal),
                Err(e) if e.is_fatal() => Err(e),
                Err(e) => {
                    self.report(text, &e);
                    Ok(Flow::Normal)
                }
            },

            Stmt::Malformed(fault) => Err(fault.to_error()),
        }
    }

    /// Run the first branch whose condition holds.
    ///
    /// A condition that fails to evaluate is reported and counts as false;
    /// the remaining branches are still tried.
    fn exec_chain(&mut self, branches: &[Branch]) -> Result<Flow, ScriptError> {
        for branch in branches {
            let taken = match &branch.cond {
                None => true,
                Some(cond) => match self.condition(cond) {
                    Ok(holds) => holds,
                    Err(e) => {
                        self.report(&branch.header, &e);
                        false
                    }
                },
            };
            if taken {
                return self.exec_block(&branch.body);
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_for(&mut self, header: &str, count: &str, body: &[Stmt]) -> Result<Flow, ScriptError> {
        let n = match self.eval_statement(count) {
            Ok(Evaluated::Value(n)) if n.is_finite() => n.trunc(),
            Ok(Evaluated::Value(n)) => {
                self.report(header, &ScriptError::LoopCount(format_number(n)));
                return Ok(Flow::Normal);
            }
            Ok(Evaluated::Unit) => {
                self.report(header, &ScriptError::NoValue(count.to_owned()));
                return Ok(Flow::Normal);
            }
            Ok(Evaluated::Break) => return Ok(Flow::Break),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                self.report(header, &e);
                return Ok(Flow::Normal);
            }
        };

        // `as` saturates, and a negative count runs zero times.
        let times = n.max(0.0) as u64;
        for _ in 0..times {
            if self.exec_block(body)? == Flow::Break {
                break;
            }
        }
        Ok(Flow::Normal)
    }

    /// Run a user function's body; a `break` inside it escapes the call.
    ///
    /// Errors are non-fatal unless the body reached a malformed block.
    pub(super) fn call_function(&mut self, name: &str) -> Result<Flow, ScriptError> {
        let body = self
            .functions
            .get(name)
            .cloned()
            .ok_or_else(|| ScriptError::UndefinedFunction(name.to_owned()))?;
        if self.depth >= self.config.max_call_depth {
            return Err(ScriptError::CallDepth(self.config.max_call_depth));
        }
        self.depth += 1;
        let flow = self.exec_block(&body);
        self.depth -= 1;
        flow
    }

    fn import_script(&mut self, header: &str, path: &str) {
        debug!(path, "importing script");
        if let Err(e) = self.run_file(Path::new(path)) {
            let err = ScriptError::Import {
                path: path.to_owned(),
                source: Box::new(e),
            };
            self.report(header, &err);
        }
    }

    fn import_json(&mut self, header: &str, path: &str) {
        debug!(path, "importing JSON");
        if let Err(e) = self.load_json(Path::new(path)) {
            self.report(header, &e);
        }
    }

    fn load_json(&mut self, path: &Path) -> Result<(), ScriptError> {
        let display = || path.display().to_string();
        let text = (self.file_loader)(path).map_err(|source| ScriptError::Io {
            path: display(),
            source,
        })?;
        let doc = serde_json::from_str(&text).map_err(|source| ScriptError::Json {
            path: display(),
            source,
        })?;
        self.json.insert(context_name(path), doc);
        Ok(())
    }

    /// Run `body` with `name` as the active context, then persist it.
    fn exec_operation(&mut self, header: &str, name: &str, body: &[Stmt]) -> Result<Flow, ScriptError> {
        if let Err(e) = self.json.activate(name) {
            self.report(header, &e);
            return Ok(Flow::Normal);
        }
        let flow = self.exec_block(body);
        self.json.deactivate();

        if flow? == Flow::Break {
            return Ok(Flow::Break);
        }
        if let Err(e) = self.persist(name) {
            self.report(header, &e);
        }
        Ok(Flow::Normal)
    }

    /// Write document `name` to `<persist_dir>/<name>.json`.
    fn persist(&self, name: &str) -> Result<(), ScriptError> {
        let path = self.config.persist_dir.join(format!("{name}.json"));
        let display = || path.display().to_string();
        let text = self
            .json
            .to_pretty(name)
            .ok_or_else(|| ScriptError::UnknownContext(name.to_owned()))?
            .map_err(|source| ScriptError::Json {
                path: display(),
                source,
            })?;
        fs::write(&path, text).map_err(|source| ScriptError::Io {
            path: display(),
            source,
        })?;
        info!(context = name, path = %path.display(), "persisted document");
        Ok(())
    }

    fn report(&mut self, source: &str, err: &ScriptError) {
        debug!(line = source, error = %err, "statement failed");
        self.console.report(source, err);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;

    use super::*;
    use crate::console::Transcript;

    fn interp() -> (Interpreter, Transcript) {
        let transcript = Transcript::new();
        let config = Config {
            seed: Some(1),
            ..Config::default()
        };
        (
            Interpreter::with_console(config, Box::new(transcript.clone())),
            transcript,
        )
    }

    fn run(src: &str) -> (Interpreter, Transcript) {
        let (mut interp, transcript) = interp();
        interp.run_source(src).expect("run failed");
        (interp, transcript)
    }

    fn output(src: &str) -> Vec<String> {
        run(src).1.printed()
    }

    /// Serve imports from an in-memory map.
    fn memory_loader(files: &[(&str, &str)]) -> FileLoader {
        let files: HashMap<String, String> = files
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Arc::new(move |path: &Path| {
            files
                .get(path.to_string_lossy().as_ref())
                .cloned()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))
        })
    }

    #[test]
    fn prints_in_order() {
        assert_eq!(output("print \"a\"\nprint \"b\""), vec!["a", "b"]);
    }

    #[test]
    fn while_break_runs_body_once() {
        assert_eq!(output("while\n{\nprint \"a\"\nbreak\n}\nprint \"done\""), vec!["a", "done"]);
    }

    #[test]
    fn while_with_counter() {
        let src = "input i = 0\nwhile\n{\ninput i = (i + 1)\nif ?(i >= 3)\n{\nbreak\n}\n}\noutput i";
        assert_eq!(output(src), vec!["3.0"]);
    }

    #[test]
    fn for_counts() {
        assert_eq!(output("for 3\n{\nprint \"a\"\n}"), vec!["a", "a", "a"]);
        assert!(output("for 0\n{\nprint \"a\"\n}").is_empty());
        assert!(output("for -2\n{\nprint \"a\"\n}").is_empty());
        assert_eq!(output("for 2.9\n{\nprint \"a\"\n}"), vec!["a", "a"]);
    }

    #[test]
    fn for_count_from_expression() {
        let src = "input n = 2\nfor (n + 1)\n{\nprint \"a\"\n}";
        assert_eq!(output(src).len(), 3);
    }

    #[test]
    fn for_break_stops_early() {
        let src = "for 5\n{\nprint \"a\"\nbreak\n}\nprint \"b\"";
        assert_eq!(output(src), vec!["a", "b"]);
    }

    #[test]
    fn bad_for_count_is_reported_and_skipped() {
        let (_, out) = run("for nope\n{\nprint \"a\"\n}\nprint \"b\"");
        assert_eq!(out.printed(), vec!["b"]);
        assert_eq!(out.errors().len(), 1);
        assert_eq!(out.errors()[0].0, "for nope");
    }

    #[test]
    fn chain_takes_first_true_branch() {
        let src = "input x = 3\nif ?(x > 5)\n{\nprint \"big\"\n}\nelse if ?(x > 0)\n{\nprint \"pos\"\n}\nelse\n{\nprint \"other\"\n}";
        assert_eq!(output(src), vec!["pos"]);
    }

    #[test]
    fn chain_stops_after_taken_branch() {
        let src = "if ?(1 > 0)\n{\nprint \"a\"\n}\nelse if ?(nope > 0)\n{\nprint \"b\"\n}";
        let (_, out) = run(src);
        assert_eq!(out.printed(), vec!["a"]);
        assert!(out.errors().is_empty());
    }

    #[test]
    fn chain_condition_errors_fall_through() {
        let src = "if ?(x > 5)\n{\nprint \"a\"\n}\nelse if ?(x > 0)\n{\nprint \"b\"\n}\nelse\n{\nprint \"c\"\n}";
        let (_, out) = run(src);
        assert_eq!(out.printed(), vec!["c"]);
        let sources: Vec<String> = out.errors().into_iter().map(|(s, _)| s).collect();
        assert_eq!(sources, vec!["if ?(x > 5)", "else if ?(x > 0)"]);
    }

    #[test]
    fn break_passes_through_chain_to_loop() {
        let src = "while\n{\nif ?(1 > 0)\n{\nbreak\n}\nprint \"unreachable\"\n}\nprint \"out\"";
        assert_eq!(output(src), vec!["out"]);
    }

    #[test]
    fn break_only_leaves_innermost_loop() {
        let src = "for 2\n{\nwhile\n{\nbreak\n}\nprint \"outer\"\n}";
        assert_eq!(output(src), vec!["outer", "outer"]);
    }

    #[test]
    fn functions_share_global_state() {
        let src = "function bump\n{\ninput n = (n + 1)\n}\ninput n = 1\naction bump()\naction bump()\noutput n";
        assert_eq!(output(src), vec!["3.0"]);
    }

    #[test]
    fn function_redefinition_overwrites() {
        let src = "function f\n{\nprint \"one\"\n}\nfunction f\n{\nprint \"two\"\n}\naction f()";
        assert_eq!(output(src), vec!["two"]);
    }

    #[test]
    fn break_escapes_function_into_callers_loop() {
        let src = "function stop\n{\nbreak\n}\nwhile\n{\nprint \"tick\"\naction stop()\n}\nprint \"after\"";
        assert_eq!(output(src), vec!["tick", "after"]);
    }

    #[test]
    fn recursion_hits_depth_limit() {
        let (mut it, out) = interp();
        it.config.max_call_depth = 4;
        it.run_source("function f\n{\naction f()\n}\naction f()\nprint \"alive\"").unwrap();
        assert_eq!(out.printed(), vec!["alive"]);
        assert_eq!(out.errors().len(), 1);
        assert!(out.errors()[0].1.contains("call depth limit of 4"));
    }

    #[test]
    fn statement_errors_do_not_stop_the_run() {
        let (it, out) = run("input a = 1\noutput missing\ninput b = 2");
        assert_eq!(it.var("b"), Some(&Value::Number(2.0)));
        assert_eq!(
            out.errors(),
            vec![("output missing".to_owned(), "missing is not defined".to_owned())]
        );
    }

    #[test]
    fn partial_side_effects_are_kept() {
        let (it, out) = run("input x = print \"side\"");
        assert_eq!(out.printed(), vec!["side"]);
        assert_eq!(out.errors().len(), 1);
        assert_eq!(it.var("x"), None);
    }

    #[test]
    fn structural_error_is_fatal_when_reached() {
        let (mut it, out) = interp();
        let err = it.run_source("print \"a\"\nwhile\nprint \"b\"").unwrap_err();
        assert!(matches!(err, ScriptError::ExpectedBlock { line: 2, .. }));
        assert_eq!(out.printed(), vec!["a"]);
    }

    #[test]
    fn malformed_block_in_untaken_branch_is_never_reached() {
        let src = "print \"a\"\nif ?(0 > 1)\n{\nwhile\n}\nprint \"b\"";
        let (_, out) = run(src);
        assert_eq!(out.printed(), vec!["a", "b"]);
        assert!(out.errors().is_empty());
    }

    #[test]
    fn malformed_function_body_is_fatal_only_when_called() {
        let (mut it, out) = interp();
        let src = "function f\n{\nprint \"in\"\nfor 2\n}\nprint \"defined\"\naction f()\nprint \"never\"";
        let err = it.run_source(src).unwrap_err();
        assert!(matches!(err, ScriptError::ExpectedBlock { line: 4, .. }));
        assert_eq!(out.printed(), vec!["defined", "in"]);
        assert!(out.errors().is_empty());
        assert_eq!(it.depth, 0);
    }

    #[test]
    fn malformed_block_inside_operation_skips_persist() {
        let dir = tempfile::tempdir().unwrap();
        let (mut it, _) = interp();
        it.config.persist_dir = dir.path().to_path_buf();
        it.insert_document("c", json!({}));
        let err = it.run_source("operation c\n{\nwhile\n}").unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(it.active_context(), None);
        assert!(!dir.path().join("c.json").exists());
    }

    #[test]
    fn parenthesized_arithmetic_in_conditions() {
        let src = "input x = 4\n?((x + 1) > 3)\nif ?((x * 2) == 8)\n{\nprint \"eight\"\n}\nelse\n{\nprint \"not eight\"\n}";
        let (_, out) = run(src);
        assert_eq!(out.printed(), vec!["true", "eight"]);
        assert!(out.errors().is_empty());
    }

    #[test]
    fn stray_break_at_top_level_is_an_error() {
        let (mut it, out) = interp();
        let err = it.run_source("print \"a\"\nbreak\nprint \"b\"").unwrap_err();
        assert!(matches!(err, ScriptError::StrayBreak));
        assert_eq!(out.printed(), vec!["a"]);
    }

    #[test]
    fn import_script_shares_state() {
        let (mut it, out) = interp();
        it.file_loader = memory_loader(&[("lib.2n", "function hi\n{\nprint \"hi\"\n}\ninput v = 9")]);
        it.run_source("import.2n lib.2n\naction hi()\noutput v").unwrap();
        assert_eq!(out.printed(), vec!["hi", "9.0"]);
        assert!(it.has_function("hi"));
    }

    #[test]
    fn failed_imports_are_reported_not_fatal() {
        let (mut it, out) = interp();
        it.file_loader = memory_loader(&[("bad.2n", "while\nprint \"x\""), ("brk.2n", "break")]);
        it.run_source("import.2n missing.2n\nimport.2n bad.2n\nimport.2n brk.2n\nimport.json nope.json\nprint \"ok\"")
            .unwrap();
        assert_eq!(out.printed(), vec!["ok"]);
        let errors = out.errors();
        assert_eq!(errors.len(), 4);
        assert!(errors[0].1.starts_with("error importing missing.2n"));
        assert!(errors[2].1.contains("'break' outside of a loop"));
        assert_eq!(errors[3].0, "import.json nope.json");
    }

    #[test]
    fn self_import_is_reported_not_fatal() {
        let (mut it, out) = interp();
        it.file_loader = memory_loader(&[("self.2n", "print \"once\"\nimport.2n self.2n")]);
        it.run_file(Path::new("self.2n")).unwrap();
        assert_eq!(out.printed(), vec!["once"]);
        let errors = out.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].0, "import.2n self.2n");
        assert!(errors[0].1.contains("already being imported"));
        assert!(it.importing.is_empty());
    }

    #[test]
    fn mutual_imports_stop_at_the_cycle() {
        let (mut it, out) = interp();
        it.file_loader = memory_loader(&[
            ("a.2n", "print \"a\"\nimport.2n b.2n"),
            ("b.2n", "print \"b\"\nimport.2n a.2n"),
        ]);
        it.run_source("import.2n a.2n\nprint \"done\"").unwrap();
        assert_eq!(out.printed(), vec!["a", "b", "done"]);
        assert_eq!(out.errors().len(), 1);
        assert!(out.errors()[0].1.contains("'a.2n' is already being imported"));
    }

    #[test]
    fn import_nesting_is_bounded() {
        let (mut it, out) = interp();
        it.config.max_call_depth = 3;
        it.file_loader = memory_loader(&[
            ("1.2n", "import.2n 2.2n"),
            ("2.2n", "import.2n 3.2n"),
            ("3.2n", "import.2n 4.2n"),
            ("4.2n", "print \"deep\""),
        ]);
        it.run_source("import.2n 1.2n").unwrap();
        assert!(out.printed().is_empty());
        assert_eq!(out.errors().len(), 1);
        assert!(out.errors()[0].1.contains("call depth limit of 3"));
    }

    #[test]
    fn reimporting_after_completion_is_allowed() {
        let (mut it, out) = interp();
        it.file_loader = memory_loader(&[("lib.2n", "print \"lib\"")]);
        it.run_source("import.2n lib.2n\nimport.2n lib.2n").unwrap();
        assert_eq!(out.printed(), vec!["lib", "lib"]);
        assert!(out.errors().is_empty());
    }

    #[test]
    fn import_json_uses_base_name() {
        let (mut it, _) = interp();
        it.file_loader = memory_loader(&[("data/scores.v1.json", r#"{"k": [1]}"#)]);
        it.run_source("import.json data/scores.v1.json").unwrap();
        assert_eq!(it.json_document("scores"), Some(&json!({"k": [1]})));
    }

    #[test]
    fn malformed_json_is_reported() {
        let (mut it, out) = interp();
        it.file_loader = memory_loader(&[("c.json", "{not json")]);
        it.run_source("import.json c.json").unwrap();
        assert_eq!(it.json_document("c"), None);
        assert_eq!(out.errors().len(), 1);
    }

    #[test]
    fn operation_on_unknown_document_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let (mut it, out) = interp();
        it.config.persist_dir = dir.path().to_path_buf();
        it.run_source("operation foo\n{\nprint \"inside\"\n}").unwrap();
        assert!(out.printed().is_empty());
        assert_eq!(out.errors().len(), 1);
        assert!(!dir.path().join("foo.json").exists());
    }

    #[test]
    fn operation_persists_and_clears_context() {
        let dir = tempfile::tempdir().unwrap();
        let (mut it, _) = interp();
        it.config.persist_dir = dir.path().to_path_buf();
        it.insert_document("c", json!({"name": "ねこ", "k": [1]}));
        it.run_source("addlist y = 5,4\noperation c\n{\ngetlist y = json.addkey out\n}").unwrap();
        assert_eq!(it.active_context(), None);

        let written = std::fs::read_to_string(dir.path().join("c.json")).unwrap();
        assert!(written.contains("ねこ"));
        assert!(written.contains("\n  \"k\""));
        let doc: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(doc, json!({"name": "ねこ", "k": [1], "out": [4.0, 5.0]}));
    }

    #[test]
    fn nested_operation_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (mut it, out) = interp();
        it.config.persist_dir = dir.path().to_path_buf();
        it.insert_document("a", json!({}));
        it.insert_document("b", json!({}));
        it.run_source("operation a\n{\noperation b\n{\nprint \"inner\"\n}\n}").unwrap();
        assert!(out.printed().is_empty());
        assert!(out.errors()[0].1.contains("while 'a' is active"));
        assert!(dir.path().join("a.json").exists());
        assert!(!dir.path().join("b.json").exists());
    }

    #[test]
    fn break_out_of_operation_skips_persist() {
        let dir = tempfile::tempdir().unwrap();
        let (mut it, _) = interp();
        it.config.persist_dir = dir.path().to_path_buf();
        it.insert_document("c", json!({}));
        it.run_source("while\n{\noperation c\n{\nbreak\n}\n}").unwrap();
        assert_eq!(it.active_context(), None);
        assert!(!dir.path().join("c.json").exists());
    }

    #[test]
    fn stray_braces_are_ignored() {
        assert_eq!(output("{\nprint \"a\"\n}\n}"), vec!["a"]);
    }
}
