//! Progress reporting for long record scans and pixel copies

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

pub struct ProgressTracker {
    bar: ProgressBar,
}

impl ProgressTracker {
    pub fn new(total: u64, description: &str) -> Self {
        let bar = ProgressBar::new(total);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} records ({eta}) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        bar.set_style(style);
        bar.set_message(description.to_string());

        ProgressTracker { bar }
    }

    /// A drawing tracker when `visible`, a hidden one otherwise
    pub fn optional(visible: bool, total: u64, description: &str) -> Self {
        if visible {
            Self::new(total, description)
        } else {
            Self::hidden(total)
        }
    }

    /// A tracker that never draws, for library callers without a terminal
    pub fn hidden(total: u64) -> Self {
        let bar = ProgressBar::with_draw_target(Some(total), ProgressDrawTarget::hidden());
        ProgressTracker { bar }
    }

    pub fn increment(&self, amount: u64) {
        self.bar.inc(amount);
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    pub fn set_message(&self, msg: &str) {
        self.bar.set_message(msg.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_tracker_counts() {
        let tracker = ProgressTracker::hidden(10);
        tracker.increment(3);
        tracker.increment(4);
        assert_eq!(tracker.position(), 7);
        tracker.finish();
    }

    #[test]
    fn test_optional_tracker_counts_when_hidden() {
        let tracker = ProgressTracker::optional(false, 4, "Scanning");
        tracker.increment(4);
        assert_eq!(tracker.position(), 4);
    }
}
