//! Edge-case heuristic advisor.
//!
//! Lexical checks over source text, kept as a rule table. Comments,
//! strings and unrelated identifiers can cause false positives.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::EdgeCaseList;

struct EdgeCaseRule {
    name: &'static str,
    applies: fn(&str) -> bool,
    suggestions: &'static [&'static str],
}

const COLLECTION_OPS: &[&str] = &[
    ".map(",
    ".filter(",
    ".reduce(",
    ".forEach(",
    ".flatMap(",
    ".sort(",
    ".some(",
    ".every(",
    ".iter()",
    ".into_iter()",
    ".collect(",
    ".collect::",
];

const STRING_OPS: &[&str] = &[
    ".slice(",
    ".substring(",
    ".substr(",
    ".split(",
    ".indexOf(",
    ".includes(",
    ".startsWith(",
    ".endsWith(",
    ".startswith(",
    ".endswith(",
    ".replace(",
    ".charAt(",
    ".trim(",
];

const NULL_CHECKS: &[&str] = &[
    "=== null",
    "!== null",
    "== null",
    "!= null",
    "=== undefined",
    "!== undefined",
    "== undefined",
    "!= undefined",
    "typeof ",
    "?.",
    "??",
    "is None",
    "is not None",
    ".is_none()",
    ".is_some()",
];

const ASYNC_IDIOMS: &[&str] = &["async ", "await ", ".then(", "Promise", "asyncio", ".await"];

const ERROR_HANDLING: &[&str] = &["try {", "try{", "try:", "catch", "except"];

static DEREFERENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z_$\])][ \t]*(?:\.[A-Za-z_$]|\[)").expect("valid edge-case regex")
});

static ARITHMETIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\w)\]][ \t]*[-+*/%]=?[ \t]*[\w(]").expect("valid edge-case regex"));

fn contains_any(code: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| code.contains(n))
}

fn uses_async(code: &str) -> bool {
    contains_any(code, ASYNC_IDIOMS)
}

static RULES: &[EdgeCaseRule] = &[
    EdgeCaseRule {
        name: "collection",
        applies: |code| contains_any(code, COLLECTION_OPS),
        suggestions: &[
            "Test with an empty collection.",
            "Test with a very large collection to check performance.",
        ],
    },
    EdgeCaseRule {
        name: "string",
        applies: |code| contains_any(code, STRING_OPS),
        suggestions: &[
            "Test with an empty string.",
            "Test strings containing special or unicode characters.",
        ],
    },
    EdgeCaseRule {
        name: "null-check",
        applies: |code| !contains_any(code, NULL_CHECKS) && DEREFERENCE_RE.is_match(code),
        suggestions: &["Test with null or undefined values."],
    },
    EdgeCaseRule {
        name: "arithmetic",
        applies: |code| ARITHMETIC_RE.is_match(code),
        suggestions: &[
            "Test with zero and negative numbers.",
            "Test with very large values for overflow or precision loss.",
        ],
    },
    EdgeCaseRule {
        name: "async",
        applies: uses_async,
        suggestions: &["Test the error path of asynchronous operations (rejections, timeouts)."],
    },
    EdgeCaseRule {
        name: "async-error-handling",
        applies: |code| uses_async(code) && !contains_any(code, ERROR_HANDLING),
        suggestions: &["Add error handling around asynchronous operations."],
    },
];

/// Testing suggestions for `code`, in rule order.
pub fn suggest(code: &str) -> EdgeCaseList {
    RULES
        .iter()
        .filter(|rule| (rule.applies)(code))
        .inspect(|rule| tracing::trace!(rule = rule.name, "edge-case rule matched"))
        .flat_map(|rule| rule.suggestions.iter().map(|s| s.to_string()))
        .collect()
}
