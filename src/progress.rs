//! Single-line progress reporting: `Progress: i/total (pp.pp%)`, redrawn in
//! place after every completed item.

use std::io::IsTerminal;

use indicatif::{ProgressBar, ProgressStyle};

/// Percentage of `done` out of `total`, with two decimals.
///
/// An empty run is reported as complete.
pub fn format_percent(done: u64, total: u64) -> String {
    if total == 0 {
        return "100.00%".to_string();
    }
    format!("{:.2}%", done as f64 / total as f64 * 100.0)
}

pub struct Progress {
    bar: ProgressBar,
    total: u64,
}

impl Progress {
    /// Hidden when the user passed `--no-progress-bar` or stdout is not a
    /// TTY, so piped output and log files stay clean.
    pub fn new(no_progress_bar: bool, total: u64) -> Self {
        let bar = if no_progress_bar || !std::io::stdout().is_terminal() {
            ProgressBar::hidden()
        } else {
            let bar = ProgressBar::new(total);
            let style = ProgressStyle::with_template("Progress: {pos}/{len} ({msg})")
                .unwrap_or_else(|_| ProgressStyle::default_bar());
            bar.set_style(style);
            bar
        };
        bar.set_message(format_percent(0, total));
        Self { bar, total }
    }

    /// Record that `done` items (1-based count) have completed.
    pub fn advance_to(&self, done: u64) {
        self.bar.set_position(done);
        self.bar.set_message(format_percent(done, self.total));
    }

    /// Run `f` with the bar cleared so log lines are not garbled.
    pub fn suspend<F: FnOnce() -> R, R>(&self, f: F) -> R {
        self.bar.suspend(f)
    }

    /// Leave the final `total/total (100.00%)` line on screen.
    pub fn finish(&self) {
        self.bar.set_position(self.total);
        self.bar.set_message(format_percent(self.total, self.total));
        self.bar.finish();
    }

    /// Drop the bar from the screen, keeping the reached position.
    pub fn abandon(&self) {
        self.bar.abandon();
    }
}
