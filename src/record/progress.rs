use super::RecordingProgress;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::Instant;

/// Throughput between successive samples of a byte counter.
#[derive(Debug, Clone, Copy)]
pub struct BitrateMeter {
    last_bytes: u64,
    last_at: Instant,
}

impl BitrateMeter {
    pub fn new(now: Instant) -> Self {
        Self {
            last_bytes: 0,
            last_at: now,
        }
    }

    /// Kilobits per second since the previous sample, `None` if no time passed.
    pub fn sample(&mut self, bytes: u64, now: Instant) -> Option<f64> {
        let elapsed = now.saturating_duration_since(self.last_at).as_secs_f64();
        if elapsed <= 0.0 {
            return None;
        }
        let delta = bytes.saturating_sub(self.last_bytes);
        self.last_bytes = bytes;
        self.last_at = now;
        Some(delta as f64 * 8.0 / 1000.0 / elapsed)
    }
}

/// Rate-limited publisher of [`RecordingProgress`].
///
/// A closed receiver is not an error; updates are then dropped silently.
#[derive(Debug)]
pub struct ProgressReporter {
    tx: Option<UnboundedSender<RecordingProgress>>,
    interval: Duration,
    last_emit: Instant,
    meter: BitrateMeter,
    emitted: u64,
}

impl ProgressReporter {
    pub fn new(tx: Option<UnboundedSender<RecordingProgress>>, interval: Duration) -> Self {
        let now = Instant::now();
        Self {
            tx,
            interval,
            last_emit: now,
            meter: BitrateMeter::new(now),
            emitted: 0,
        }
    }

    /// Number of updates published so far.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Publish if at least one interval passed since the last update.
    pub fn maybe_emit(&mut self, bytes_written: u64, pcr_elapsed_seconds: Option<f64>) -> bool {
        let now = Instant::now();
        if now.saturating_duration_since(self.last_emit) < self.interval {
            return false;
        }
        self.emit(bytes_written, pcr_elapsed_seconds, now);
        true
    }

    /// Unconditional last update with the final totals.
    pub fn finish(&mut self, bytes_written: u64, pcr_elapsed_seconds: Option<f64>) {
        self.emit(bytes_written, pcr_elapsed_seconds, Instant::now());
    }

    fn emit(&mut self, bytes_written: u64, pcr_elapsed_seconds: Option<f64>, now: Instant) {
        self.last_emit = now;
        let bitrate_kbps = self.meter.sample(bytes_written, now);
        let Some(tx) = &self.tx else {
            return;
        };
        let update = RecordingProgress {
            bytes_written,
            pcr_elapsed_seconds,
            bitrate_kbps,
        };
        if tx.send(update).is_ok() {
            self.emitted += 1;
        }
    }
}
