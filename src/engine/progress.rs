//! Progress reporting and completion callbacks for UI integration

use std::io::Write;
use std::path::Path;

use tokio::sync::mpsc;

use crate::engine::CompressionReport;
use crate::error::ShrinkResult;

/// Emits monotonic completion fractions from the encode stage.
///
/// Values are throttled to steps of at least `step`, stay below `1.0` while
/// frames are still flowing and end with exactly one `1.0` on success.
pub struct ProgressReporter {
    total: u64,
    step: f64,
    last: Option<f64>,
    sender: mpsc::UnboundedSender<f64>,
}

impl ProgressReporter {
    pub fn new(total: u64, step: f64, sender: mpsc::UnboundedSender<f64>) -> Self {
        Self {
            total,
            step,
            last: None,
            sender,
        }
    }

    /// Record `done` output frames
    pub fn advance(&mut self, done: u64) {
        if self.total == 0 {
            return;
        }
        let fraction = done as f64 / self.total as f64;
        if fraction >= 1.0 {
            return;
        }
        let due = match self.last {
            None => true,
            Some(last) => fraction - last >= self.step,
        };
        if due {
            self.emit(fraction);
        }
    }

    /// Report completion
    pub fn finish(&mut self) {
        if self.last != Some(1.0) {
            self.emit(1.0);
        }
    }

    fn emit(&mut self, fraction: f64) {
        self.last = Some(fraction);
        // nobody listening is fine
        let _ = self.sender.send(fraction);
    }
}

/// Callback interface for callers that prefer push notifications.
///
/// `on_complete` is invoked exactly once per job, after every `on_progress`.
pub trait CompressionCallback: Send + Sync {
    /// Called once the output path is fixed and the job is running
    fn on_start(&self, _output: &Path) {}

    /// Called with a completion fraction in `[0, 1]`
    fn on_progress(&self, _fraction: f64) {}

    /// Called with the final outcome
    fn on_complete(&self, result: &ShrinkResult<CompressionReport>);
}

/// Console progress bar for CLI usage
pub struct ConsoleProgressCallback {
    verbose: bool,
}

impl ConsoleProgressCallback {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    fn render_bar(fraction: f64) -> String {
        const BAR_LENGTH: usize = 30;
        let filled = ((fraction.clamp(0.0, 1.0)) * BAR_LENGTH as f64) as usize;
        format!(
            "[{}{}] {:>5.1}%",
            "#".repeat(filled),
            "-".repeat(BAR_LENGTH - filled),
            fraction * 100.0
        )
    }
}

impl CompressionCallback for ConsoleProgressCallback {
    fn on_start(&self, output: &Path) {
        if self.verbose {
            eprintln!("Compressing to {}", output.display());
        }
    }

    fn on_progress(&self, fraction: f64) {
        let mut stderr = std::io::stderr();
        let _ = write!(stderr, "\r{}", Self::render_bar(fraction));
        let _ = stderr.flush();
    }

    fn on_complete(&self, result: &ShrinkResult<CompressionReport>) {
        eprintln!();
        if let Err(e) = result {
            eprintln!("Compression failed: {}", e);
        }
    }
}

/// JSON lines on stdout for structured consumers
pub struct JsonProgressCallback;

impl JsonProgressCallback {
    fn event(result: &ShrinkResult<CompressionReport>) -> serde_json::Value {
        let timestamp = chrono::Utc::now().to_rfc3339();
        match result {
            Ok(report) => serde_json::json!({
                "event": "complete",
                "output": report.output,
                "output_size": report.output_size,
                "frames_written": report.frames_written,
                "timestamp": timestamp
            }),
            Err(e) => serde_json::json!({
                "event": "error",
                "kind": e.kind(),
                "error": e.to_string(),
                "timestamp": timestamp
            }),
        }
    }
}

impl CompressionCallback for JsonProgressCallback {
    fn on_start(&self, output: &Path) {
        let event = serde_json::json!({
            "event": "start",
            "output": output,
            "timestamp": chrono::Utc::now().to_rfc3339()
        });
        println!("{}", event);
    }

    fn on_progress(&self, fraction: f64) {
        let event = serde_json::json!({
            "event": "progress",
            "fraction": fraction,
            "timestamp": chrono::Utc::now().to_rfc3339()
        });
        println!("{}", event);
    }

    fn on_complete(&self, result: &ShrinkResult<CompressionReport>) {
        println!("{}", Self::event(result));
    }
}

/// Ignores everything
pub struct NoOpProgressCallback;

impl CompressionCallback for NoOpProgressCallback {
    fn on_complete(&self, _result: &ShrinkResult<CompressionReport>) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ShrinkError;

    fn drain(receiver: &mut mpsc::UnboundedReceiver<f64>) -> Vec<f64> {
        let mut values = Vec::new();
        while let Ok(value) = receiver.try_recv() {
            values.push(value);
        }
        values
    }

    #[test]
    fn test_reporter_is_monotonic_and_ends_at_one() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut reporter = ProgressReporter::new(200, 0.01, tx);
        for done in 1..=200 {
            reporter.advance(done);
        }
        reporter.finish();

        let values = drain(&mut rx);
        assert!(values.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(values.last(), Some(&1.0));
        assert_eq!(values.iter().filter(|v| **v == 1.0).count(), 1);
        assert!(values.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_reporter_throttles_by_step() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut reporter = ProgressReporter::new(1000, 0.1, tx);
        for done in 1..=1000 {
            reporter.advance(done);
        }
        reporter.finish();

        let values = drain(&mut rx);
        assert!(values.len() <= 11);
        assert!(values.windows(2).all(|w| w[1] - w[0] >= 0.1 - 1e-9 || w[1] == 1.0));
    }

    #[test]
    fn test_reporter_caps_overrun_below_one() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut reporter = ProgressReporter::new(10, 0.01, tx);
        for done in 1..=15 {
            reporter.advance(done);
        }
        let values = drain(&mut rx);
        assert!(values.iter().all(|v| *v < 1.0));

        reporter.finish();
        reporter.finish();
        assert_eq!(drain(&mut rx), vec![1.0]);
    }

    #[test]
    fn test_reporter_without_listener() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let mut reporter = ProgressReporter::new(10, 0.01, tx);
        reporter.advance(5);
        reporter.finish();
    }

    #[test]
    fn test_console_bar_rendering() {
        assert!(ConsoleProgressCallback::render_bar(0.0).contains("  0.0%"));
        assert!(ConsoleProgressCallback::render_bar(0.5).starts_with("[###############---"));
        assert!(ConsoleProgressCallback::render_bar(1.0).contains("100.0%"));
    }

    #[test]
    fn test_json_error_event_carries_kind() {
        let event = JsonProgressCallback::event(&Err(ShrinkError::Cancelled));
        assert_eq!(event["event"], "error");
        assert_eq!(event["kind"], "cancelled");
    }
}
