//! Progress reporting and cooperative cancellation

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use indicatif::{ProgressBar, ProgressStyle};

/// Sink for progress, diagnostics and cancellation requests.
///
/// Methods take `&self` so one monitor can be polled from worker tasks.
/// Everything reported here is advisory; only [`is_canceled`] feeds back
/// into control flow.
///
/// [`is_canceled`]: ProgressMonitor::is_canceled
pub trait ProgressMonitor: Send + Sync {
    /// Start a task made of `total_units` steps
    fn begin_task(&self, description: &str, total_units: usize);

    /// Report `units` finished steps of the current task
    fn worked(&self, units: usize);

    /// Finish the current task
    fn done(&self);

    /// Whether the caller asked to stop
    fn is_canceled(&self) -> bool;

    fn message(&self, text: &str);

    fn error_message(&self, text: &str);
}

/// Monitor that writes everything to `tracing`.
#[derive(Debug, Default)]
pub struct LogProgress {
    task: Mutex<Option<String>>,
    total: AtomicUsize,
    worked: AtomicUsize,
    canceled: Arc<AtomicBool>,
}

impl LogProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Monitor observing an externally owned cancellation flag
    pub fn with_cancel_flag(flag: Arc<AtomicBool>) -> Self {
        Self {
            canceled: flag,
            ..Self::default()
        }
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::Relaxed);
    }

    /// Units reported since the last `begin_task`
    pub fn worked_units(&self) -> usize {
        self.worked.load(Ordering::Relaxed)
    }

    fn current_task(&self) -> String {
        self.task
            .lock()
            .ok()
            .and_then(|t| t.clone())
            .unwrap_or_default()
    }
}

impl ProgressMonitor for LogProgress {
    fn begin_task(&self, description: &str, total_units: usize) {
        if let Ok(mut task) = self.task.lock() {
            *task = Some(description.to_string());
        }
        self.total.store(total_units, Ordering::Relaxed);
        self.worked.store(0, Ordering::Relaxed);
        tracing::info!(total = total_units, "{}", description);
    }

    fn worked(&self, units: usize) {
        let done = self.worked.fetch_add(units, Ordering::Relaxed) + units;
        let total = self.total.load(Ordering::Relaxed);
        tracing::trace!(done, total, "progress");
    }

    fn done(&self) {
        tracing::debug!(
            worked = self.worked.load(Ordering::Relaxed),
            "{} finished",
            self.current_task()
        );
    }

    fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::Relaxed)
    }

    fn message(&self, text: &str) {
        tracing::info!("{}", text);
    }

    fn error_message(&self, text: &str) {
        tracing::error!("{}", text);
    }
}

/// Monitor drawing a terminal progress bar.
pub struct BarProgress {
    bar: ProgressBar,
    canceled: Arc<AtomicBool>,
}

impl BarProgress {
    pub fn new() -> Self {
        Self::with_bar(ProgressBar::new(0))
    }

    /// Use a caller-built bar (e.g. `ProgressBar::hidden()`)
    pub fn with_bar(bar: ProgressBar) -> Self {
        if let Ok(style) = ProgressStyle::default_bar().template("{msg} [{bar:40.cyan/blue}] {pos}/{len}") {
            bar.set_style(style);
        }
        Self {
            bar,
            canceled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag that stops the run when set
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.canceled)
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}

impl Default for BarProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressMonitor for BarProgress {
    fn begin_task(&self, description: &str, total_units: usize) {
        self.bar.reset();
        self.bar.set_length(total_units as u64);
        self.bar.set_message(description.to_string());
    }

    fn worked(&self, units: usize) {
        self.bar.inc(units as u64);
    }

    fn done(&self) {
        self.bar.finish_and_clear();
    }

    fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::Relaxed)
    }

    fn message(&self, text: &str) {
        self.bar.println(text);
    }

    fn error_message(&self, text: &str) {
        self.bar.println(format!("ERROR: {text}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_progress_counts_units() {
        let pm = LogProgress::new();
        pm.begin_task("Scanning", 10);
        pm.worked(3);
        pm.worked(2);
        assert_eq!(pm.worked_units(), 5);
        pm.done();

        pm.begin_task("Again", 4);
        assert_eq!(pm.worked_units(), 0);
    }

    #[test]
    fn test_log_progress_shared_cancel_flag() {
        let flag = Arc::new(AtomicBool::new(false));
        let pm = LogProgress::with_cancel_flag(Arc::clone(&flag));
        assert!(!pm.is_canceled());

        flag.store(true, Ordering::Relaxed);
        assert!(pm.is_canceled());
    }

    #[test]
    fn test_bar_progress_tracks_position() {
        let pm = BarProgress::with_bar(ProgressBar::hidden());
        pm.begin_task("Handle flats...", 8);
        pm.worked(3);
        pm.message("Left pits: 0");
        assert_eq!(pm.position(), 3);

        pm.cancel_flag().store(true, Ordering::Relaxed);
        assert!(pm.is_canceled());
        pm.done();
    }

    #[test]
    fn test_monitor_is_object_safe() {
        let pm: Box<dyn ProgressMonitor> = Box::new(LogProgress::new());
        pm.message("hello");
        pm.error_message("boom");
        assert!(!pm.is_canceled());
    }
}
