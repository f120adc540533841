//! Output formatting utilities

use crate::commands::Inspection;
use anyhow::Result;
use matdiff_core::change_detection::ResultTable;
use matdiff_core::config::ResolvedConfig;
use matdiff_core::{HighlightStatus, RunOutcome};
use serde_json::json;
use std::path::Path;

/// Rows listed per table before the tree is truncated
const SAMPLE_ROWS: usize = 3;

/// Pretty printer for matdiff output
pub struct PrettyPrinter;

impl PrettyPrinter {
    /// Print the outcome of a comparison run
    pub fn print_comparison(outcome: &RunOutcome, current: &Path, previous: &Path) {
        let result = &outcome.result;
        println!(
            "🔍 Comparison: {} → {}",
            previous.display(),
            current.display()
        );
        println!(
            "├─ Rows: {} current, {} previous ({} common materials)",
            result.stats.current_rows, result.stats.previous_rows, result.stats.common_groups
        );

        Self::print_table("New entries", &result.new_entries, "├─", "│  ");
        Self::print_table("Deleted entries", &result.deleted_entries, "├─", "│  ");
        Self::print_table("Changed entries", &result.changed_entries, "├─", "│  ");

        println!("├─ 📄 Report: {}", outcome.report.path.display());
        match &outcome.highlight {
            HighlightStatus::Applied(summary) => {
                println!(
                    "└─ 🖍  Highlighted {} cells in '{}'",
                    summary.cells.len(),
                    summary.sheet
                );
            }
            HighlightStatus::Skipped => println!("└─ Highlighting skipped"),
            HighlightStatus::Failed(e) => println!("└─ ❌ Highlighting failed: {e}"),
        }
    }

    fn print_table(title: &str, table: &ResultTable, branch: &str, indent: &str) {
        if table.is_empty() {
            println!("{branch} ✅ {title}: none");
            return;
        }

        println!("{branch} ❌ {title}: {}", table.len());
        let shown = table.len().min(SAMPLE_ROWS);
        for (i, row) in table.rows.iter().take(shown).enumerate() {
            let last = i == shown - 1 && table.len() <= SAMPLE_ROWS;
            let prefix = if last { "└─" } else { "├─" };
            let cells: Vec<String> = row.values.iter().map(|v| v.to_string()).collect();
            println!("{indent}{prefix} {}", cells.join(" | "));
        }
        if table.len() > SAMPLE_ROWS {
            println!("{indent}└─ ... {} more", table.len() - SAMPLE_ROWS);
        }
    }

    /// Print the structure of one snapshot workbook
    pub fn print_inspection(inspection: &Inspection) {
        println!("📋 Snapshot: {}", inspection.file.display());
        println!("├─ Rows: {}", inspection.rows);
        println!(
            "├─ Tracking column: {}",
            if inspection.tracking_column {
                "present (dropped before comparison)"
            } else {
                "absent"
            }
        );
        println!("├─ Columns:");
        for (i, column) in inspection.columns.iter().enumerate() {
            let prefix = if i == inspection.columns.len() - 1 {
                "│  └─"
            } else {
                "│  ├─"
            };
            println!("{prefix} {column}");
        }
        if inspection.missing_columns.is_empty() {
            println!("└─ ✅ All required columns present");
        } else {
            println!(
                "└─ ❌ Missing required columns: {}",
                inspection.missing_columns.join(", ")
            );
        }
    }

    pub fn print_config(resolved: &ResolvedConfig) {
        let columns = &resolved.config.columns;
        let report = &resolved.config.report;
        println!("⚙️  Configuration: {}", resolved.source);
        println!("├─ Columns:");
        println!("│  ├─ Tracking: {}", columns.tracking);
        println!("│  ├─ Material number: {}", columns.material_no);
        println!("│  ├─ Material description: {}", columns.material_description);
        println!("│  ├─ Delivery date: {}", columns.delivery_date);
        println!("│  ├─ Quantity: {}", columns.quantity);
        println!("│  └─ Previous quantity: {}", columns.previous_quantity);
        println!("└─ Report:");
        println!("   ├─ Output: {}", report.output_path.display());
        println!("   ├─ Highlight: {}", report.highlight);
        match &report.error_log {
            Some(path) => println!("   └─ Error log: {}", path.display()),
            None => println!("   └─ Error log: disabled"),
        }
    }
}

/// JSON formatter for machine-readable output
pub struct JsonFormatter;

impl JsonFormatter {
    pub fn format_comparison(
        outcome: &RunOutcome,
        current: &Path,
        previous: &Path,
    ) -> Result<String> {
        let highlight = match &outcome.highlight {
            HighlightStatus::Applied(summary) => json!({
                "status": "applied",
                "sheet": summary.sheet,
                "cells": summary.cells,
            }),
            HighlightStatus::Skipped => json!({ "status": "skipped" }),
            HighlightStatus::Failed(e) => json!({
                "status": "failed",
                "kind": e.kind(),
                "error": e.to_string(),
            }),
        };

        let value = json!({
            "current": current,
            "previous": previous,
            "summary": {
                "new": outcome.result.new_entries.len(),
                "deleted": outcome.result.deleted_entries.len(),
                "changed": outcome.result.changed_entries.len(),
            },
            "stats": outcome.result.stats,
            "report": outcome.report,
            "highlight": highlight,
            "entries": {
                "new": outcome.result.new_entries,
                "deleted": outcome.result.deleted_entries,
                "changed": outcome.result.changed_entries,
            },
        });
        Ok(serde_json::to_string_pretty(&value)?)
    }

    pub fn format_inspection(inspection: &Inspection) -> Result<String> {
        Ok(serde_json::to_string_pretty(inspection)?)
    }

    pub fn format_config(resolved: &ResolvedConfig) -> Result<String> {
        Ok(serde_json::to_string_pretty(resolved)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use matdiff_core::test_fixtures::{dataset, record, TestWorkspace};
    use matdiff_core::MatdiffCore;
    use serde_json::Value;

    #[test]
    fn test_comparison_json_shape() {
        let workspace = TestWorkspace::new();
        let current = workspace.write_input(
            "current.xlsx",
            &dataset(vec![
                record("M1", "Bolt", (2024, 1, 1), 10.0),
                record("M2", "Nut", (2024, 1, 1), 1.0),
            ]),
        );
        let previous = workspace.write_input(
            "previous.xlsx",
            &dataset(vec![record("M1", "Bolt", (2024, 1, 1), 5.0)]),
        );
        let destination = workspace.path().join("result.xlsx");
        let outcome = MatdiffCore::default()
            .run(&current, &previous, &destination)
            .unwrap();

        let json = JsonFormatter::format_comparison(&outcome, &current, &previous).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["summary"]["new"], 1);
        assert_eq!(value["summary"]["deleted"], 0);
        assert_eq!(value["summary"]["changed"], 1);
        assert_eq!(value["highlight"]["status"], "applied");
        assert_eq!(value["highlight"]["cells"], json!(["D2", "E2"]));
        assert_eq!(value["entries"]["changed"]["rows"][0]["source"]["side"], "current");
        assert_eq!(
            value["entries"]["changed"]["rows"][0]["values"],
            json!(["M1", "Bolt", "2024-01-01", 10.0, 5.0])
        );
    }
}
