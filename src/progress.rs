//! Download progress reporting.
//!
//! The retrieval tool reports byte counts as it goes. A [`ProgressTracker`]
//! turns those reports into a monotonic position against the latest known
//! total, and [`TerminalProgress`] draws it with indicatif.

use indicatif::{ProgressBar, ProgressStyle};

/// Receives progress events from a download.
pub trait ProgressObserver: Send {
    /// Bytes downloaded so far, with the total if the tool knows it yet.
    fn advanced(&mut self, downloaded: u64, total: Option<u64>);

    /// The download finished. Later events are ignored.
    fn completed(&mut self);
}

/// Observer that discards all events.
#[derive(Debug, Default)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn advanced(&mut self, _downloaded: u64, _total: Option<u64>) {}

    fn completed(&mut self) {}
}

/// Position/total bookkeeping for one download.
///
/// The position never decreases and never exceeds the total. When a report
/// would shrink the total below the position, the total stops at the position.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProgressTracker {
    total: Option<u64>,
    position: u64,
    finished: bool,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a "downloading" report. Returns the delta the position moved by.
    pub fn update(&mut self, downloaded: u64, total: Option<u64>) -> u64 {
        if self.finished {
            return 0;
        }

        if let Some(total) = total {
            self.total = Some(total.max(self.position));
        }

        let Some(total) = self.total else {
            return 0;
        };

        let target = downloaded.min(total);
        if target <= self.position {
            return 0;
        }

        let delta = target - self.position;
        self.position = target;
        delta
    }

    /// Apply a "finished" report: snap the position to the total.
    pub fn finish(&mut self) {
        if self.finished {
            return;
        }
        match self.total {
            Some(total) => self.position = total,
            None => self.total = Some(self.position),
        }
        self.finished = true;
    }

    pub fn total(&self) -> Option<u64> {
        self.total
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Completion in percent, 0 while the total is unknown.
    #[cfg(test)]
    fn percent(&self) -> f64 {
        match self.total {
            Some(0) if self.finished => 100.0,
            Some(0) | None => 0.0,
            Some(total) => self.position as f64 * 100.0 / total as f64,
        }
    }
}

/// Progress bar on the terminal, one per download.
pub struct TerminalProgress {
    bar: ProgressBar,
    tracker: ProgressTracker,
}

impl TerminalProgress {
    pub fn new(msg: &str) -> Self {
        // Percent scale until the first byte total arrives.
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{msg} {percent:>3}%|{bar:40.cyan/blue}| {bytes}/{total_bytes} [{elapsed_precise}]")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        bar.set_message(msg.to_string());

        Self {
            bar,
            tracker: ProgressTracker::new(),
        }
    }

    pub fn tracker(&self) -> &ProgressTracker {
        &self.tracker
    }
}

impl ProgressObserver for TerminalProgress {
    fn advanced(&mut self, downloaded: u64, total: Option<u64>) {
        if self.tracker.is_finished() {
            return;
        }
        self.tracker.update(downloaded, total);
        if let Some(total) = self.tracker.total() {
            self.bar.set_length(total);
            self.bar.set_position(self.tracker.position());
        }
    }

    fn completed(&mut self) {
        if self.tracker.is_finished() {
            return;
        }
        self.tracker.finish();
        let len = self.bar.length().unwrap_or(100);
        self.bar.set_position(len);
        self.bar.finish();
    }
}

impl Drop for TerminalProgress {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.abandon();
        }
    }
}
