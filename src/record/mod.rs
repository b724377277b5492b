//! # Recording pipeline
//!
//! Wires the format layer into a single run: connect, handshake (following
//! redirects), stream interleaved frames into a file, stop on cancellation,
//! end of stream or a PCR-measured target duration, then drain and tear
//! down.
//!
//! ```rust,no_run
//! use rtsprec::record::{RecordingTarget, RTSPStreamRecorder};
//! use rtsprec::format::rtsp::TransportMode;
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() {
//! let target = RecordingTarget::new("rtsp://example.com/live/ch1", "records/ch1.ts")
//!     .with_duration(Duration::from_secs(60))
//!     .with_transport(TransportMode::TsOverTcp);
//!
//! let mut recorder = RTSPStreamRecorder::new(target);
//! let mut progress = recorder.progress_receiver();
//! tokio::spawn(async move {
//!     while let Some(p) = progress.recv().await {
//!         println!("{} bytes, {:?} s", p.bytes_written, p.pcr_elapsed_seconds);
//!     }
//! });
//!
//! let result = recorder.run(CancellationToken::new()).await;
//! println!("{:?}", result.status);
//! # }
//! ```

use crate::format::rtsp::TransportMode;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub mod playback;
mod pool;
mod progress;
mod recorder;
mod service;
mod sink;

pub use pool::{FramePool, PooledBuffer};
pub use progress::{BitrateMeter, ProgressReporter};
pub use recorder::{RecorderState, RTSPStreamRecorder};
pub use service::{RecordingService, RTSPRecordingService};
pub use sink::{RecordingSink, SinkSummary, BATCH_CAPACITY};

/// What to record and where. Immutable for a run; a redirect derives a new
/// target with only the URL changed.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingTarget {
    pub url: String,
    pub output_path: PathBuf,
    pub target_duration: Option<Duration>,
    pub transport: TransportMode,
}

impl RecordingTarget {
    pub fn new(url: impl Into<String>, output_path: impl AsRef<Path>) -> Self {
        Self {
            url: url.into(),
            output_path: output_path.as_ref().to_path_buf(),
            target_duration: None,
            transport: TransportMode::default(),
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.target_duration = Some(duration).filter(|d| !d.is_zero());
        self
    }

    pub fn with_transport(mut self, transport: TransportMode) -> Self {
        self.transport = transport;
        self
    }

    /// Same output, transport and duration against `url`.
    pub fn redirected(&self, url: &str) -> Self {
        Self {
            url: url.to_string(),
            ..self.clone()
        }
    }
}

/// Per-run tuning. Defaults match what IPTV head-ends tolerate.
#[derive(Debug, Clone)]
pub struct RecorderOptions {
    pub connect_timeout: Duration,
    /// Applies to every socket read and write
    pub io_timeout: Duration,
    pub max_redirects: usize,
    /// With a target duration, scan every n-th media frame for PCR
    pub pcr_sample_interval: u64,
    pub progress_interval: Duration,
}

impl Default for RecorderOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            io_timeout: Duration::from_secs(30),
            max_redirects: 5,
            pcr_sample_interval: 10,
            progress_interval: Duration::from_secs(1),
        }
    }
}

impl RecorderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }

    pub fn with_max_redirects(mut self, max: usize) -> Self {
        self.max_redirects = max;
        self
    }

    pub fn with_pcr_sample_interval(mut self, every: u64) -> Self {
        self.pcr_sample_interval = every.max(1);
        self
    }

    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }
}

/// Live progress, published at most once per progress interval plus once
/// at the end of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordingProgress {
    /// Never decreases within a run
    pub bytes_written: u64,
    pub pcr_elapsed_seconds: Option<f64>,
    /// Throughput since the previous emission
    pub bitrate_kbps: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingStatus {
    Completed,
    Failed,
    Cancelled,
}

/// Terminal outcome of a run, produced exactly once.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingResult {
    pub success: bool,
    pub status: RecordingStatus,
    pub bytes_written: u64,
    pub error_message: Option<String>,
    pub output_path: PathBuf,
    pub pcr_elapsed_seconds: Option<f64>,
    /// The run ended because the PCR target duration was reached
    pub stopped_by_pcr: bool,
}
