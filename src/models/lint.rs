//! Static-analysis issue types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a lint issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LintSeverity {
    Warning,
    Error,
}

impl fmt::Display for LintSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LintSeverity::Warning => write!(f, "warning"),
            LintSeverity::Error => write!(f, "error"),
        }
    }
}

/// A single issue reported by the lint engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LintIssue {
    pub message: String,
    pub severity: LintSeverity,
    /// 1-based line.
    pub line: u32,
    /// 1-based column.
    pub column: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,
}

impl LintIssue {
    /// The synthetic issue reported when the lint engine could not run.
    pub fn unavailable(reason: impl fmt::Display) -> Self {
        Self {
            message: format!("Static analysis unavailable: {reason}"),
            severity: LintSeverity::Warning,
            line: 1,
            column: 1,
            rule_id: None,
        }
    }
}
