use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner shown while a job runs; its message follows the job's progress.
pub struct ProgressBarBuilder {
    style_template: &'static str,
    message: String,
    tick: Duration,
    hidden: bool,
}

impl ProgressBarBuilder {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            style_template: "{spinner:.green} [{elapsed_precise}] {msg}",
            message: message.into(),
            tick: Duration::from_millis(120),
            hidden: false,
        }
    }

    /// No terminal output, e.g. when stdout carries JSON for another program.
    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    pub fn build(self) -> Result<ProgressBar> {
        let pb = if self.hidden {
            ProgressBar::hidden()
        } else {
            ProgressBar::new_spinner()
        };

        pb.set_style(ProgressStyle::default_spinner().template(self.style_template)?);
        pb.set_message(self.message);

        if !self.hidden {
            pb.enable_steady_tick(self.tick);
        }

        Ok(pb)
    }
}
