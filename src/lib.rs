#![doc(html_root_url = "https://docs.rs/rtsprec/0.1.0")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(rustdoc::missing_crate_level_docs)]

//! # rtsprec - RTSP/MPEG-TS stream recorder
//!
//! `rtsprec` records a single MPEG-TS stream served over RTSP into a file.
//! It negotiates interleaved TCP delivery of raw or RTP-wrapped TS, writes
//! the transport stream to disk with bounded memory, and tracks elapsed
//! media time from PCR timestamps so a recording can stop after an exact
//! amount of content rather than wall-clock time.
//!
//! ## Features
//!
//! - RTSP/1.0 DESCRIBE, SETUP, PLAY and TEARDOWN with redirect following
//! - `MP2T/TCP` and `MP2T/RTP/TCP` interleaved transports
//! - Resynchronising `$` frame reader that skips malformed frames
//! - PCR extraction with 33-bit wraparound handling
//! - Batched file output, progress updates and cooperative cancellation
//! - Playback URL helpers for time-shifted IPTV recordings
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rtsprec::record::{RecordingStatus, RecordingTarget, RTSPStreamRecorder};
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() {
//!     let target = RecordingTarget::new("rtsp://example.com/live/ch1", "ch1.ts")
//!         .with_duration(Duration::from_secs(30));
//!
//!     let result = RTSPStreamRecorder::new(target)
//!         .run(CancellationToken::new())
//!         .await;
//!
//!     if result.status == RecordingStatus::Completed {
//!         println!("recorded {} bytes", result.bytes_written);
//!     } else {
//!         eprintln!("recording failed: {:?}", result.error_message);
//!     }
//! }
//! ```
//!
//! ## Module Overview
//!
//! - `format`: wire formats
//!   - RTSP requests, responses, sessions and interleaved framing
//!   - RTP header stripping
//!   - MPEG-TS PCR extraction and media-time tracking
//!
//! - `record`: the recording pipeline
//!   - `RTSPStreamRecorder` orchestrating a single run
//!   - File sink, frame buffer pool and progress reporting
//!   - `RecordingService` seam for schedulers
//!
//! - `error`: the crate error type and `Result` alias
//!
//! - `config`: process-wide settings from the environment and config files

/// Error types and utilities
pub mod error;

/// Wire formats (RTSP, RTP, MPEG-TS)
pub mod format;

/// Recording pipeline
pub mod record;

/// Configuration module
pub mod config;

pub use error::{RecError, Result};
pub use record::{
    RecorderOptions, RecordingProgress, RecordingResult, RecordingStatus, RecordingTarget,
    RTSPStreamRecorder,
};
