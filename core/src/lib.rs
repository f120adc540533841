//! # matdiff-core
//!
//! Core library for matdiff - compares two snapshots of material delivery
//! records and reports new, deleted and changed deliveries as a highlighted
//! spreadsheet.
//!
//! This crate holds everything except presentation, so the CLI (or any other
//! front end) only decides which files to compare and how to show the outcome.

pub mod change_detection;
pub mod config;
pub mod dataset;
pub mod error;
pub mod export;
pub mod loader;

#[cfg(any(test, feature = "test-fixtures"))]
pub mod test_fixtures;

// Re-export the most commonly used types for convenience
pub use change_detection::{compare, ChangeDetector, ComparisonResult, ResultTable};
pub use config::Config;
pub use dataset::{CellValue, ColumnNames, Dataset, Side};
pub use error::{MatdiffError, Result};
pub use export::{HighlightSummary, RenderedReport, ReportExporter};

use log::{info, warn};
use std::fmt;
use std::path::Path;

/// Steps of a comparison run, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    LoadCurrent,
    LoadPrevious,
    Compare,
    Render,
    Highlight,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RunPhase::LoadCurrent => "Loading current snapshot",
            RunPhase::LoadPrevious => "Loading previous snapshot",
            RunPhase::Compare => "Comparing deliveries",
            RunPhase::Render => "Writing report",
            RunPhase::Highlight => "Highlighting changed quantities",
        };
        f.write_str(label)
    }
}

/// Outcome of the highlight step once the report exists
#[derive(Debug)]
pub enum HighlightStatus {
    Applied(HighlightSummary),
    Skipped,
    /// The report is on disk without highlighting
    Failed(MatdiffError),
}

impl HighlightStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, HighlightStatus::Failed(_))
    }
}

/// A run that got as far as writing the report
#[derive(Debug)]
pub struct RunOutcome {
    pub result: ComparisonResult,
    pub report: RenderedReport,
    pub highlight: HighlightStatus,
}

impl RunOutcome {
    /// True when every requested step succeeded
    pub fn is_complete(&self) -> bool {
        !self.highlight.is_failed()
    }
}

/// Core matdiff operations
pub struct MatdiffCore {
    config: Config,
}

impl MatdiffCore {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Load one snapshot with the configured column names
    pub fn load(&self, path: &Path) -> Result<Dataset> {
        loader::load_dataset(path, &self.config.columns)
    }

    pub fn compare(&self, current: &Dataset, previous: &Dataset) -> Result<ComparisonResult> {
        ChangeDetector::detect_changes(current, previous, &self.config.columns)
    }

    pub fn render(&self, result: &ComparisonResult, destination: &Path) -> Result<RenderedReport> {
        ReportExporter::new(&self.config.columns).render(result, destination)
    }

    pub fn highlight(&self, destination: &Path) -> Result<HighlightSummary> {
        ReportExporter::new(&self.config.columns).highlight(destination)
    }

    /// Highlight an already written report, keeping a failure as a status
    pub fn apply_highlight(&self, destination: &Path) -> HighlightStatus {
        match self.highlight(destination) {
            Ok(summary) => HighlightStatus::Applied(summary),
            Err(e) => {
                warn!("Report written but highlighting failed: {e}");
                HighlightStatus::Failed(e)
            }
        }
    }

    /// Load, compare, render and highlight
    pub fn run(&self, current: &Path, previous: &Path, destination: &Path) -> Result<RunOutcome> {
        self.run_with_progress(current, previous, destination, None)
    }

    /// Same as [`MatdiffCore::run`], calling `progress` before each step.
    ///
    /// Nothing is written unless both inputs load and compare cleanly. A
    /// highlight failure does not fail the run; it is reported in the outcome.
    pub fn run_with_progress(
        &self,
        current: &Path,
        previous: &Path,
        destination: &Path,
        progress: Option<&dyn Fn(RunPhase)>,
    ) -> Result<RunOutcome> {
        let step = |phase: RunPhase| {
            if let Some(callback) = progress {
                callback(phase);
            }
        };

        step(RunPhase::LoadCurrent);
        let current_data = self.load(current)?;
        step(RunPhase::LoadPrevious);
        let previous_data = self.load(previous)?;

        step(RunPhase::Compare);
        let result = self.compare(&current_data, &previous_data)?;
        info!(
            "Found {} new, {} deleted, {} changed entries",
            result.new_entries.len(),
            result.deleted_entries.len(),
            result.changed_entries.len()
        );

        step(RunPhase::Render);
        let report = self.render(&result, destination)?;

        let highlight = if self.config.report.highlight {
            step(RunPhase::Highlight);
            self.apply_highlight(destination)
        } else {
            HighlightStatus::Skipped
        };

        Ok(RunOutcome {
            result,
            report,
            highlight,
        })
    }
}

impl Default for MatdiffCore {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{dataset, record, TestWorkspace};
    use std::cell::RefCell;

    #[test]
    fn test_run_reports_phases_in_order() {
        let workspace = TestWorkspace::new();
        let current = workspace.write_input(
            "current.xlsx",
            &dataset(vec![record("M1", "Bolt", (2024, 1, 1), 10.0)]),
        );
        let previous = workspace.write_input(
            "previous.xlsx",
            &dataset(vec![record("M1", "Bolt", (2024, 1, 1), 5.0)]),
        );
        let destination = workspace.path().join("result.xlsx");

        let phases = RefCell::new(Vec::new());
        let record_phase: &dyn Fn(RunPhase) = &|phase| phases.borrow_mut().push(phase);
        let outcome = MatdiffCore::default()
            .run_with_progress(&current, &previous, &destination, Some(record_phase))
            .unwrap();

        assert_eq!(
            phases.into_inner(),
            vec![
                RunPhase::LoadCurrent,
                RunPhase::LoadPrevious,
                RunPhase::Compare,
                RunPhase::Render,
                RunPhase::Highlight,
            ]
        );
        assert!(outcome.is_complete());
        assert_eq!(outcome.result.changed_entries.len(), 1);
        match outcome.highlight {
            HighlightStatus::Applied(summary) => assert_eq!(summary.cells.len(), 2),
            other => panic!("expected highlight to be applied, got {other:?}"),
        }
    }

    #[test]
    fn test_run_without_highlight() {
        let workspace = TestWorkspace::new();
        let data = dataset(vec![record("M1", "Bolt", (2024, 1, 1), 10.0)]);
        let current = workspace.write_input("current.xlsx", &data);
        let previous = workspace.write_input("previous.xlsx", &data);
        let destination = workspace.path().join("result.xlsx");

        let mut config = Config::default();
        config.report.highlight = false;
        let outcome = MatdiffCore::new(config)
            .run(&current, &previous, &destination)
            .unwrap();

        assert!(matches!(outcome.highlight, HighlightStatus::Skipped));
        assert!(!outcome.result.has_changes());
        assert!(destination.exists());
    }

    #[test]
    fn test_missing_input_writes_nothing() {
        let workspace = TestWorkspace::new();
        let current = workspace.write_input(
            "current.xlsx",
            &dataset(vec![record("M1", "Bolt", (2024, 1, 1), 10.0)]),
        );
        let destination = workspace.path().join("result.xlsx");

        let err = MatdiffCore::default()
            .run(&current, &workspace.path().join("missing.xlsx"), &destination)
            .unwrap_err();
        assert!(matches!(err, MatdiffError::Load(_)));
        assert!(!destination.exists());
    }

    #[test]
    fn test_phase_labels() {
        assert_eq!(RunPhase::Compare.to_string(), "Comparing deliveries");
        assert_eq!(RunPhase::Render.to_string(), "Writing report");
    }
}
