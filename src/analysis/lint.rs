//! Static analysis adapter and lint engines.
//!
//! [`StaticAnalyzer`] wraps an injected [`LintEngine`] and never fails: an
//! engine error becomes one synthetic warning so aggregation is never
//! blocked by a broken file.
//!
//! Two engines ship with the crate:
//! - [`BuiltinLintEngine`], a small file-type-aware regex ruleset that
//!   rejects files with unbalanced brackets the way a parser would.
//! - [`CommandLintEngine`], which runs an external linter that prints
//!   ESLint-style JSON.

use std::path::Path;
use std::process::Stdio;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

use crate::config::LintConfig;
use crate::models::{LintIssue, LintSeverity};

/// Errors from a lint engine.
#[derive(Error, Debug)]
pub enum LintError {
    #[error("parse error at {line}:{column}: {message}")]
    Parse {
        message: String,
        line: u32,
        column: u32,
    },

    #[error("lint engine failed: {0}")]
    EngineFailed(String),

    #[error("invalid lint output: {0}")]
    InvalidOutput(String),
}

/// A pluggable checker producing structured issues for one file.
#[async_trait]
pub trait LintEngine: Send + Sync {
    async fn check(&self, code: &str, path: &Path) -> Result<Vec<LintIssue>, LintError>;
}

/// Normalizes lint engine results into a uniform issue list.
#[derive(Clone)]
pub struct StaticAnalyzer {
    engine: Arc<dyn LintEngine>,
}

impl StaticAnalyzer {
    pub fn new(engine: Arc<dyn LintEngine>) -> Self {
        Self { engine }
    }

    /// Lint `code`. Never fails.
    pub async fn analyze(&self, code: &str, path: &Path) -> Vec<LintIssue> {
        match self.engine.check(code, path).await {
            Ok(issues) => issues,
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "static analysis unavailable");
                vec![LintIssue::unavailable(e)]
            }
        }
    }
}

/// Pick the lint engine for a configuration.
pub fn engine_from_config(config: &LintConfig) -> Arc<dyn LintEngine> {
    match config.command.as_deref().map(str::trim) {
        Some(cmd) if !cmd.is_empty() => Arc::new(CommandLintEngine::new(cmd)),
        _ => Arc::new(BuiltinLintEngine),
    }
}

// ── Builtin engine ──────────────────────────────────────────────────

/// Source families the builtin ruleset understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Syntax {
    Script,
    Python,
    Rust,
}

impl Syntax {
    fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "js" | "jsx" | "ts" | "tsx" | "mjs" | "cjs" => Some(Syntax::Script),
            "py" => Some(Syntax::Python),
            "rs" => Some(Syntax::Rust),
            _ => None,
        }
    }

    fn quotes(self) -> &'static [char] {
        match self {
            Syntax::Script => &['"', '\'', '`'],
            Syntax::Python => &['"', '\''],
            Syntax::Rust => &['"', '\''],
        }
    }

    fn starts_line_comment(self, c: char, next: Option<char>) -> bool {
        match self {
            Syntax::Python => c == '#',
            Syntax::Script | Syntax::Rust => c == '/' && next == Some('/'),
        }
    }

    fn has_block_comments(self) -> bool {
        self != Syntax::Python
    }

    fn rules(self) -> &'static [LintRule] {
        match self {
            Syntax::Script => &SCRIPT_RULES,
            Syntax::Python => &PYTHON_RULES,
            Syntax::Rust => &RUST_RULES,
        }
    }
}

/// One lexical lint rule. Matches capture group 1 when present.
struct LintRule {
    id: &'static str,
    severity: LintSeverity,
    message: &'static str,
    pattern: Regex,
}

impl LintRule {
    fn new(id: &'static str, severity: LintSeverity, message: &'static str, pattern: &str) -> Self {
        Self {
            id,
            severity,
            message,
            pattern: Regex::new(pattern).expect("valid lint rule regex"),
        }
    }
}

static SCRIPT_RULES: LazyLock<Vec<LintRule>> = LazyLock::new(|| {
    vec![
        LintRule::new(
            "no-debugger",
            LintSeverity::Error,
            "Unexpected 'debugger' statement.",
            r"\bdebugger\b",
        ),
        LintRule::new(
            "no-console",
            LintSeverity::Warning,
            "Unexpected console statement.",
            r"\bconsole\.(?:log|debug|info|warn|error|trace)\s*\(",
        ),
        LintRule::new(
            "no-var",
            LintSeverity::Warning,
            "Unexpected var, use let or const instead.",
            r"\bvar\s+[A-Za-z_$]",
        ),
        LintRule::new(
            "eqeqeq",
            LintSeverity::Warning,
            "Expected strict equality ('===' or '!==').",
            r"(?:^|[^=!<>])(==|!=)(?:[^=]|$)",
        ),
    ]
});

static PYTHON_RULES: LazyLock<Vec<LintRule>> = LazyLock::new(|| {
    vec![
        LintRule::new(
            "no-breakpoint",
            LintSeverity::Error,
            "Debugger breakpoint left in code.",
            r"\b(?:breakpoint|pdb\.set_trace)\s*\(",
        ),
        LintRule::new(
            "no-print",
            LintSeverity::Warning,
            "Unexpected print call.",
            r"(?:^|[^.\w])(print)\s*\(",
        ),
    ]
});

static RUST_RULES: LazyLock<Vec<LintRule>> = LazyLock::new(|| {
    vec![
        LintRule::new(
            "no-dbg",
            LintSeverity::Warning,
            "Unexpected dbg! invocation.",
            r"\bdbg!\s*\(",
        ),
        LintRule::new(
            "no-todo",
            LintSeverity::Warning,
            "Unfinished code: todo! or unimplemented!.",
            r"\b(?:todo|unimplemented)!\s*\(",
        ),
    ]
});

/// Minimal file-type-aware lint engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinLintEngine;

#[async_trait]
impl LintEngine for BuiltinLintEngine {
    async fn check(&self, code: &str, path: &Path) -> Result<Vec<LintIssue>, LintError> {
        let Some(syntax) = Syntax::from_path(path) else {
            return Ok(Vec::new());
        };
        let masked = mask_source(code, syntax)?;
        Ok(apply_rules(&masked, syntax.rules()))
    }
}

fn apply_rules(masked: &str, rules: &[LintRule]) -> Vec<LintIssue> {
    let mut issues = Vec::new();
    for (idx, line) in masked.lines().enumerate() {
        for rule in rules {
            for caps in rule.pattern.captures_iter(line) {
                let Some(m) = caps.get(1).or_else(|| caps.get(0)) else {
                    continue;
                };
                issues.push(LintIssue {
                    message: rule.message.to_string(),
                    severity: rule.severity,
                    line: idx as u32 + 1,
                    column: line[..m.start()].chars().count() as u32 + 1,
                    rule_id: Some(rule.id.to_string()),
                });
            }
        }
    }
    issues.sort_by_key(|i| (i.line, i.column));
    issues
}

/// Cursor over source characters that writes a masked copy as it goes.
struct Masker {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    column: u32,
    out: String,
}

impl Masker {
    fn new(code: &str) -> Self {
        Self {
            chars: code.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            out: String::with_capacity(code.len()),
        }
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self, masked: bool) {
        let Some(c) = self.peek(0) else { return };
        if c == '\n' {
            self.out.push('\n');
            self.line += 1;
            self.column = 1;
        } else {
            self.out.push(if masked { ' ' } else { c });
            self.column += 1;
        }
        self.pos += 1;
    }

    /// Blank out a quoted literal starting at the opening quote.
    fn skip_string(&mut self, quote: char) {
        self.advance(false);
        while let Some(c) = self.peek(0) {
            if c == '\\' {
                self.advance(true);
                self.advance(true);
            } else if c == quote {
                self.advance(false);
                return;
            } else {
                self.advance(true);
            }
        }
    }

    fn behind(&self, offset: usize) -> Option<char> {
        self.pos.checked_sub(offset).and_then(|i| self.chars.get(i).copied())
    }

    /// Blank out a regex literal body, keeping the delimiters and flags.
    ///
    /// Stops before a newline if the literal is unterminated.
    fn skip_regex(&mut self) {
        self.advance(false);
        let mut in_class = false;
        while let Some(c) = self.peek(0) {
            match c {
                '\n' => return,
                '\\' => {
                    self.advance(true);
                    if self.peek(0).is_some_and(|c| c != '\n') {
                        self.advance(true);
                    }
                }
                '[' => {
                    in_class = true;
                    self.advance(true);
                }
                ']' => {
                    in_class = false;
                    self.advance(true);
                }
                '/' if !in_class => {
                    self.advance(false);
                    while self.peek(0).is_some_and(|c| c.is_ascii_alphabetic()) {
                        self.advance(false);
                    }
                    return;
                }
                _ => self.advance(true),
            }
        }
    }

    /// Number of `#`s when a Rust raw string (`r"`, `r#"`, `br"`) starts here.
    fn raw_string_hashes(&self) -> Option<usize> {
        if self.peek(0) != Some('r') {
            return None;
        }
        let boundary = match self.behind(1) {
            Some('b') => !self.behind(2).is_some_and(is_ident_char),
            Some(c) => !is_ident_char(c),
            None => true,
        };
        if !boundary {
            return None;
        }
        let mut hashes = 0;
        while self.peek(1 + hashes) == Some('#') {
            hashes += 1;
        }
        (self.peek(1 + hashes) == Some('"')).then_some(hashes)
    }

    /// Blank out a raw string body. Backslashes are not escapes here.
    fn skip_raw_string(&mut self, hashes: usize) {
        for _ in 0..hashes + 2 {
            self.advance(false);
        }
        while let Some(c) = self.peek(0) {
            if c == '"' && (1..=hashes).all(|i| self.peek(i) == Some('#')) {
                for _ in 0..=hashes {
                    self.advance(false);
                }
                return;
            }
            self.advance(true);
        }
    }

    /// A Rust `'` opens a char literal only when it closes right after.
    fn is_char_literal(&self) -> bool {
        match (self.peek(1), self.peek(2)) {
            (Some('\\'), _) => true,
            (Some(_), Some('\'')) => true,
            _ => false,
        }
    }
}

/// Blank out comments and string contents, checking bracket balance.
///
/// The result has the same line and column layout as `code`.
fn mask_source(code: &str, syntax: Syntax) -> Result<String, LintError> {
    let mut m = Masker::new(code);
    let mut open: Vec<(char, u32, u32)> = Vec::new();
    // last significant character and identifier, for telling a regex
    // literal from division
    let mut prev: Option<char> = None;
    let mut word = String::new();

    while let Some(c) = m.peek(0) {
        let next = m.peek(1);

        if syntax.starts_line_comment(c, next) {
            while m.peek(0).is_some_and(|c| c != '\n') {
                m.advance(true);
            }
            continue;
        }

        if syntax.has_block_comments() && c == '/' && next == Some('*') {
            m.advance(true);
            m.advance(true);
            while let Some(c) = m.peek(0) {
                if c == '*' && m.peek(1) == Some('/') {
                    m.advance(true);
                    m.advance(true);
                    break;
                }
                m.advance(true);
            }
            continue;
        }

        if syntax == Syntax::Rust
            && let Some(hashes) = m.raw_string_hashes()
        {
            m.skip_raw_string(hashes);
            prev = Some('"');
            word.clear();
            continue;
        }

        if syntax == Syntax::Script && c == '/' && regex_allowed(prev, &word) {
            m.skip_regex();
            prev = Some('/');
            word.clear();
            continue;
        }

        if syntax.quotes().contains(&c) {
            if syntax == Syntax::Rust && c == '\'' && !m.is_char_literal() {
                // lifetime
                m.advance(false);
            } else {
                m.skip_string(c);
            }
            prev = Some(c);
            word.clear();
            continue;
        }

        if is_ident_char(c) {
            if !m.behind(1).is_some_and(is_ident_char) {
                word.clear();
            }
            word.push(c);
        } else if !c.is_whitespace() {
            word.clear();
        }
        if !c.is_whitespace() {
            prev = Some(c);
        }

        match c {
            '(' | '[' | '{' => open.push((c, m.line, m.column)),
            ')' | ']' | '}' => match open.pop() {
                Some((o, ..)) if closes(o, c) => {}
                _ => {
                    return Err(LintError::Parse {
                        message: format!("unexpected '{c}'"),
                        line: m.line,
                        column: m.column,
                    });
                }
            },
            _ => {}
        }
        m.advance(false);
    }

    if let Some((o, line, column)) = open.pop() {
        return Err(LintError::Parse {
            message: format!("unclosed '{o}'"),
            line,
            column,
        });
    }

    Ok(m.out)
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Keywords after which a `/` starts a regex literal.
const REGEX_KEYWORDS: &[&str] = &[
    "return", "typeof", "case", "do", "else", "in", "of", "throw", "void", "delete", "yield",
    "await",
];

fn regex_allowed(prev: Option<char>, word: &str) -> bool {
    match prev {
        None => true,
        Some(p) if "(,=:[!&|?{};".contains(p) => true,
        Some(p) if is_ident_char(p) => REGEX_KEYWORDS.contains(&word),
        _ => false,
    }
}

fn closes(open: char, close: char) -> bool {
    matches!((open, close), ('(', ')') | ('[', ']') | ('{', '}'))
}

// ── External command engine ─────────────────────────────────────────

/// Runs an external linter that reads source on stdin and prints
/// ESLint-style JSON.
///
/// `{path}` in the command is replaced with the shell-escaped file path.
#[derive(Debug, Clone)]
pub struct CommandLintEngine {
    command: String,
}

impl CommandLintEngine {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    fn build_command(&self, path: &Path) -> String {
        self.command
            .replace("{path}", &shell_escape(&path.display().to_string()))
    }
}

#[async_trait]
impl LintEngine for CommandLintEngine {
    async fn check(&self, code: &str, path: &Path) -> Result<Vec<LintIssue>, LintError> {
        let full_command = self.build_command(path);
        let mut child = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(&full_command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| LintError::EngineFailed(format!("failed to execute command: {e}")))?;

        if let Some(mut stdin) = child.stdin.take() {
            let source = code.to_string();
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(source.as_bytes()).await {
                    tracing::debug!(error = %e, "lint command closed stdin early");
                }
            });
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| LintError::EngineFailed(format!("failed to wait for command: {e}")))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        // linters exit non-zero when they find issues, so only an empty
        // report from a failed run counts as a crash
        if stdout.trim().is_empty() {
            if output.status.success() {
                return Ok(Vec::new());
            }
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(LintError::EngineFailed(format!(
                "`{full_command}` exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        parse_eslint_output(&stdout)
    }
}

#[derive(Debug, Deserialize)]
struct EslintFileResult {
    #[serde(default)]
    messages: Vec<EslintMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EslintMessage {
    #[serde(default)]
    rule_id: Option<String>,
    #[serde(default)]
    severity: u8,
    message: String,
    #[serde(default)]
    line: Option<u32>,
    #[serde(default)]
    column: Option<u32>,
    #[serde(default)]
    fatal: bool,
}

/// Parse ESLint's JSON formatter output.
fn parse_eslint_output(raw: &str) -> Result<Vec<LintIssue>, LintError> {
    let results: Vec<EslintFileResult> =
        serde_json::from_str(raw.trim()).map_err(|e| LintError::InvalidOutput(e.to_string()))?;

    let mut issues = Vec::new();
    for msg in results.into_iter().flat_map(|r| r.messages) {
        let line = msg.line.unwrap_or(1).max(1);
        let column = msg.column.unwrap_or(1).max(1);
        if msg.fatal {
            return Err(LintError::Parse {
                message: msg.message,
                line,
                column,
            });
        }
        issues.push(LintIssue {
            message: msg.message,
            severity: if msg.severity >= 2 {
                LintSeverity::Error
            } else {
                LintSeverity::Warning
            },
            line,
            column,
            rule_id: msg.rule_id,
        });
    }
    Ok(issues)
}

/// Wrap `value` in single quotes unless it is plainly safe.
fn shell_escape(value: &str) -> String {
    if value
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | '/'))
    {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', "'\\''"))
}
