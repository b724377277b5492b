//! # MPEG Transport Stream timing
//!
//! The recorder never demuxes TS; it only needs to find PCR samples so it can
//! measure how much media time has been recorded.
//!
//! - [`read_pcr`]: PCR of one 188-byte packet
//! - [`PcrClock`]: first/last sample and elapsed time with a single wrap
//! - [`PcrTracker`]: scans unaligned payloads and checks a target duration
//!
//! ## Example
//!
//! ```rust
//! use rtsprec::format::ts::{pcr_packet, PcrTracker};
//! use std::time::Duration;
//!
//! let mut tracker = PcrTracker::new(Some(Duration::from_secs(1)));
//! assert!(!tracker.scan(&pcr_packet(0x100, 2_700_000)));
//! assert!(tracker.scan(&pcr_packet(0x100, 29_700_000)));
//! assert_eq!(tracker.elapsed_seconds(), Some(1.0));
//! ```

/// PCR extraction from single packets
pub mod parser;

/// PCR clock and target tracking
pub mod pcr;

/// Core TS constants
pub mod types;

pub use parser::{pcr_packet, read_pcr};
pub use pcr::{duration_to_ticks, elapsed_ticks, ticks_to_seconds, PcrClock, PcrTracker};
pub use types::{PCR_HZ, PCR_WRAP_TICKS, TS_PACKET_SIZE, TS_SYNC_BYTE};
