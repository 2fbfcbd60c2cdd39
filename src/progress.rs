//! Terminal progress (spinner) for sync runs.

use std::time::Duration;

use assetsync_core::{ProgressSink, ProgressUpdate};
use indicatif::{ProgressBar, ProgressStyle};

/// Renders engine progress updates on a spinner line.
#[derive(Debug)]
pub(crate) struct SpinnerProgress {
    spinner: Option<ProgressBar>,
}

impl SpinnerProgress {
    /// Starts a spinner when `enabled`; otherwise every update is dropped.
    pub(crate) fn start(enabled: bool) -> Self {
        if !enabled {
            return Self { spinner: None };
        }
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.enable_steady_tick(Duration::from_millis(100));
        Self {
            spinner: Some(spinner),
        }
    }

    /// Clears the spinner line.
    pub(crate) fn finish(&self) {
        if let Some(spinner) = &self.spinner {
            spinner.finish_and_clear();
        }
    }
}

impl ProgressSink for SpinnerProgress {
    fn report(&self, update: ProgressUpdate) {
        if let Some(spinner) = &self.spinner {
            spinner.set_message(render(&update));
        }
    }
}

fn render(update: &ProgressUpdate) -> String {
    match update {
        ProgressUpdate::Count {
            completed,
            total,
            message,
        } => format!("[{completed}/{total}] {message}"),
        ProgressUpdate::Percent { percent, message } => format!("[{percent:>3}%] {message}"),
    }
}
