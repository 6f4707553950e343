//! JSON output renderer.
//!
//! Outputs `{"report": {...}, "summary": {...}}`.

use crate::models::{ReviewReport, Summary};
use crate::output::ReportRenderer;

/// JSON output renderer.
pub struct JsonRenderer;

impl ReportRenderer for JsonRenderer {
    fn render(&self, report: &ReviewReport) -> String {
        let output = serde_json::json!({
            "report": report,
            "summary": Summary::from_report(report),
        });

        serde_json::to_string_pretty(&output).unwrap_or_else(|_| "{}".to_string())
    }
}
