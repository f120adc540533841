//! Command implementations for matdiff CLI

use crate::cli::{Commands, ConfigCommand};
use crate::output::{JsonFormatter, PrettyPrinter};
use crate::progress::ProgressReporter;
use anyhow::{bail, Context, Result};
use chrono::Local;
use log::{debug, warn};
use matdiff_core::config::{self, Config, ResolvedConfig};
use matdiff_core::dataset::RecordLayout;
use matdiff_core::{loader, HighlightStatus, MatdiffCore, RunPhase};
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Structure of one snapshot workbook
#[derive(Debug, Serialize)]
pub struct Inspection {
    pub file: PathBuf,
    pub columns: Vec<String>,
    pub rows: usize,
    pub tracking_column: bool,
    pub missing_columns: Vec<String>,
}

/// Execute a command
pub fn execute_command(command: Commands, config_path: Option<&Path>) -> Result<()> {
    match command {
        Commands::Compare {
            current,
            previous,
            output,
            no_highlight,
            json,
            error_log,
        } => {
            let mut resolved = config::resolve_config(config_path)?;
            if let Some(output) = output {
                resolved.config.report.output_path = output;
            }
            if no_highlight {
                resolved.config.report.highlight = false;
            }
            if error_log.is_some() {
                resolved.config.report.error_log = error_log;
            }

            let log_path = resolved.config.report.error_log.clone();
            let result = compare_command(resolved.config, &current, &previous, json);
            if let (Err(e), Some(log_path)) = (&result, log_path) {
                if let Err(log_err) = append_error_log(&log_path, e) {
                    warn!("Could not write error log {}: {log_err:#}", log_path.display());
                }
            }
            result
        }
        Commands::Inspect { file, json } => {
            let resolved = config::resolve_config(config_path)?;
            inspect_command(&resolved.config, &file, json)
        }
        Commands::Config { command } => config_command(&command, config_path),
    }
}

fn compare_command(config: Config, current: &Path, previous: &Path, json: bool) -> Result<()> {
    let destination = config.report.output_path.clone();
    let core = MatdiffCore::new(config);

    let mut progress = ProgressReporter::new(!json);
    let on_phase: &dyn Fn(RunPhase) = &|phase| {
        debug!("{phase}");
        progress.set_phase(phase);
    };
    let outcome = core
        .run_with_progress(current, previous, &destination, Some(on_phase))
        .with_context(|| {
            format!(
                "Comparing {} against {} failed",
                current.display(),
                previous.display()
            )
        })?;
    progress.finish("Comparison complete");

    if json {
        println!(
            "{}",
            JsonFormatter::format_comparison(&outcome, current, previous)?
        );
    } else {
        PrettyPrinter::print_comparison(&outcome, current, previous);
    }

    highlight_result(outcome.highlight, &destination)
}

/// A failed highlight is an error even though the report exists
fn highlight_result(status: HighlightStatus, destination: &Path) -> Result<()> {
    match status {
        HighlightStatus::Failed(e) => Err(anyhow::Error::new(e).context(format!(
            "Report written to {} but highlighting failed",
            destination.display()
        ))),
        HighlightStatus::Applied(_) | HighlightStatus::Skipped => Ok(()),
    }
}

fn inspect_command(config: &Config, file: &Path, json: bool) -> Result<()> {
    let inspection = inspect(config, file)?;
    if json {
        println!("{}", JsonFormatter::format_inspection(&inspection)?);
    } else {
        PrettyPrinter::print_inspection(&inspection);
    }
    Ok(())
}

/// Load `file` as a snapshot and check it against the configured columns
pub fn inspect(config: &Config, file: &Path) -> Result<Inspection> {
    let mut dataset = loader::read_dataset(file)?;
    let tracking_column = dataset.drop_column(&config.columns.tracking);
    let missing_columns = RecordLayout::missing_columns(&dataset, &config.columns)
        .into_iter()
        .map(str::to_string)
        .collect();

    Ok(Inspection {
        file: file.to_path_buf(),
        columns: dataset.column_names(),
        rows: dataset.row_count(),
        tracking_column,
        missing_columns,
    })
}

fn config_command(command: &ConfigCommand, config_path: Option<&Path>) -> Result<()> {
    match command {
        ConfigCommand::Show { json } => show_current_config(config_path, *json),
        ConfigCommand::Init { global, force } => init_config(*global, *force),
    }
}

fn show_current_config(config_path: Option<&Path>, json: bool) -> Result<()> {
    let resolved: ResolvedConfig = config::resolve_config(config_path)?;
    if json {
        println!("{}", JsonFormatter::format_config(&resolved)?);
    } else {
        PrettyPrinter::print_config(&resolved);
    }
    Ok(())
}

fn init_config(global: bool, force: bool) -> Result<()> {
    let config = Config::default();
    let path = if global {
        if let Some(existing) = config::global_config_path().filter(|p| p.exists()) {
            if !force {
                bail!(
                    "Config file {} already exists (use --force to overwrite)",
                    existing.display()
                );
            }
        }
        config::save_config(&config)?
    } else {
        let dir = std::env::current_dir().context("Failed to get current directory")?;
        config::write_local_config(&dir, &config, force)?
    };
    println!("✅ Wrote configuration to {}", path.display());
    Ok(())
}

/// Append a timestamped entry with the full error chain to `path`
pub fn append_error_log(path: &Path, error: &anyhow::Error) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open error log {}", path.display()))?;
    writeln!(
        file,
        "[{}] {error:#}",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    )?;
    for cause in error.chain().skip(1) {
        writeln!(file, "    caused by: {cause}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use matdiff_core::test_fixtures::{dataset, record, TestWorkspace};
    use matdiff_core::MatdiffError;
    use std::fs;

    #[test]
    fn test_inspect_reports_missing_columns() {
        let workspace = TestWorkspace::new();
        let file = workspace.write_input(
            "current.xlsx",
            &dataset(vec![record("M1", "Bolt", (2024, 1, 1), 10.0)]),
        );

        let mut config = Config::default();
        let inspection = inspect(&config, &file).unwrap();
        assert!(inspection.tracking_column);
        assert!(inspection.missing_columns.is_empty());
        assert_eq!(inspection.rows, 1);
        assert_eq!(inspection.columns[0], "Material No");

        config.columns.quantity = "Menge".to_string();
        let inspection = inspect(&config, &file).unwrap();
        assert_eq!(inspection.missing_columns, vec!["Menge"]);
    }

    #[test]
    fn test_error_log_appends_chain() {
        let workspace = TestWorkspace::new();
        let log_path = workspace.path().join("error_log.txt");

        let first = anyhow::Error::new(MatdiffError::load("File not found: a.xlsx"))
            .context("Comparing a.xlsx against b.xlsx failed");
        append_error_log(&log_path, &first).unwrap();
        append_error_log(&log_path, &anyhow::anyhow!("second failure")).unwrap();

        let content = fs::read_to_string(&log_path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with('['));
        assert!(lines[0].contains("Comparing a.xlsx against b.xlsx failed"));
        assert_eq!(lines[1], "    caused by: Load error: File not found: a.xlsx");
        assert!(lines[2].ends_with("second failure"));
    }

    #[test]
    fn test_failed_highlight_is_reported_and_logged() {
        let workspace = TestWorkspace::new();
        let destination = workspace.path().join("report.xlsx");
        let log_path = workspace.path().join("error_log.txt");

        let status = HighlightStatus::Failed(MatdiffError::write(
            "Sheet 'Changed Entries' not found in report.xlsx",
        ));
        let err = highlight_result(status, &destination).unwrap_err();
        assert!(err.to_string().contains("but highlighting failed"));
        assert!(matches!(
            err.downcast_ref::<MatdiffError>(),
            Some(MatdiffError::Write(_))
        ));

        append_error_log(&log_path, &err).unwrap();
        let content = fs::read_to_string(&log_path).unwrap();
        assert!(content.contains("report.xlsx but highlighting failed"));
        assert!(content.contains("caused by: Write error: Sheet 'Changed Entries' not found"));

        assert!(highlight_result(HighlightStatus::Skipped, &destination).is_ok());
    }

    #[test]
    fn test_compare_command_writes_report() {
        let workspace = TestWorkspace::new();
        let current = workspace.write_input(
            "current.xlsx",
            &dataset(vec![record("M1", "Bolt", (2024, 1, 1), 10.0)]),
        );
        let previous = workspace.write_input(
            "previous.xlsx",
            &dataset(vec![record("M1", "Bolt", (2024, 1, 1), 5.0)]),
        );

        let mut config = Config::default();
        config.report.output_path = workspace.path().join("report.xlsx");
        compare_command(config, &current, &previous, true).unwrap();
        assert!(workspace.path().join("report.xlsx").exists());
    }

    #[test]
    fn test_compare_command_schema_failure_writes_nothing() {
        let workspace = TestWorkspace::new();
        let current = workspace.write_input(
            "current.xlsx",
            &dataset(vec![record("M1", "Bolt", (2024, 1, 1), 10.0)]),
        );
        let previous = workspace.write_input(
            "previous.xlsx",
            &dataset(vec![record("M1", "Bolt", (2024, 1, 1), 5.0)]),
        );

        let mut config = Config::default();
        config.columns.quantity = "Menge".to_string();
        config.report.output_path = workspace.path().join("report.xlsx");

        let err = compare_command(config, &current, &previous, true).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MatdiffError>(),
            Some(MatdiffError::Schema(_))
        ));
        assert!(!workspace.path().join("report.xlsx").exists());
    }
}
