//! Progress reporting utilities

use indicatif::{ProgressBar, ProgressStyle};
use matdiff_core::RunPhase;
use std::time::Duration;

/// Spinner shown while a comparison runs
#[derive(Debug)]
pub struct ProgressReporter {
    spinner: Option<ProgressBar>,
}

impl ProgressReporter {
    /// Create a reporter; a hidden one draws nothing (used for JSON output)
    pub fn new(show_progress: bool) -> Self {
        Self {
            spinner: show_progress.then(|| create_spinner("Starting comparison...")),
        }
    }

    pub fn set_phase(&self, phase: RunPhase) {
        if let Some(pb) = &self.spinner {
            pb.set_message(format!("{phase}..."));
        }
    }

    /// Stop the spinner, leaving `message` on screen
    pub fn finish(&mut self, message: &str) {
        if let Some(pb) = self.spinner.take() {
            pb.finish_with_message(message.to_string());
        }
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        if let Some(pb) = self.spinner.take() {
            pb.finish_and_clear();
        }
    }
}

/// Create a spinner progress bar
fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
        .template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_reporter_ignores_phases() {
        let mut reporter = ProgressReporter::new(false);
        reporter.set_phase(RunPhase::Compare);
        reporter.finish("done");
        assert!(reporter.spinner.is_none());
    }
}
