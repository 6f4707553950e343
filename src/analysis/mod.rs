//! Per-file analyzers.
//!
//! Each analyzer recovers from its own failures and returns a degraded but
//! valid result, so building an analysis bundle never fails for a readable
//! file.

pub mod coverage;
pub mod deps;
pub mod edge_cases;
pub mod lint;

pub use coverage::CoverageEstimator;
pub use deps::{
    CachingGraphBuilder, DependencyGraph, DependencyResolver, GraphBuilder, GraphError,
    ImportGraphBuilder, SourceFilter,
};
pub use edge_cases::suggest;
pub use lint::{
    BuiltinLintEngine, CommandLintEngine, LintEngine, LintError, StaticAnalyzer, engine_from_config,
};
