//! Media-time tracking from Program Clock Reference samples.

use super::parser::read_pcr;
use super::types::*;
use std::time::Duration;

/// First and most recent PCR seen in a run, in 27 MHz ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PcrClock {
    first: Option<u64>,
    last: Option<u64>,
}

impl PcrClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn first(&self) -> Option<u64> {
        self.first
    }

    pub fn last(&self) -> Option<u64> {
        self.last
    }

    pub fn observe(&mut self, ticks: u64) {
        if self.first.is_none() {
            self.first = Some(ticks);
        }
        self.last = Some(ticks);
    }

    /// Ticks between the first and last sample.
    ///
    /// Assumes at most one wrap of the 2^33 * 300 counter between the two
    /// samples; a run longer than one wrap period (about 26.5 hours)
    /// reports a wrong value.
    pub fn elapsed_ticks(&self) -> Option<u64> {
        let (first, last) = (self.first?, self.last?);
        Some(elapsed_ticks(first, last))
    }

    pub fn elapsed_seconds(&self) -> Option<f64> {
        self.elapsed_ticks().map(ticks_to_seconds)
    }
}

/// Forward distance from `first` to `last` on the 2^33 * 300 tick circle.
pub fn elapsed_ticks(first: u64, last: u64) -> u64 {
    let (first, last) = (first % PCR_WRAP_TICKS, last % PCR_WRAP_TICKS);
    (last + PCR_WRAP_TICKS - first) % PCR_WRAP_TICKS
}

pub fn ticks_to_seconds(ticks: u64) -> f64 {
    ticks as f64 / PCR_HZ as f64
}

/// Target duration in ticks, rounded; zero means unbounded.
pub fn duration_to_ticks(duration: Duration) -> u64 {
    (duration.as_secs_f64() * PCR_HZ as f64).round() as u64
}

/// Scans TS payloads for PCRs and decides when a target duration is reached.
#[derive(Debug, Clone, Default)]
pub struct PcrTracker {
    clock: PcrClock,
    target_ticks: u64,
}

impl PcrTracker {
    /// `target` of `None` or zero never signals a stop.
    pub fn new(target: Option<Duration>) -> Self {
        Self {
            clock: PcrClock::new(),
            target_ticks: target.map(duration_to_ticks).unwrap_or(0),
        }
    }

    pub fn clock(&self) -> &PcrClock {
        &self.clock
    }

    pub fn target_ticks(&self) -> u64 {
        self.target_ticks
    }

    pub fn has_target(&self) -> bool {
        self.target_ticks > 0
    }

    pub fn elapsed_seconds(&self) -> Option<f64> {
        self.clock.elapsed_seconds()
    }

    /// Scan `payload` and report whether the target is reached.
    ///
    /// The payload need not start on a packet boundary: the scanner walks
    /// byte by byte to the next sync byte, then strides a packet at a time.
    /// Every PCR found updates the clock, so scanning the same bytes twice
    /// leaves it unchanged.
    pub fn scan(&mut self, payload: &[u8]) -> bool {
        let mut offset = 0;
        while offset + TS_PACKET_SIZE <= payload.len() {
            if payload[offset] != TS_SYNC_BYTE {
                offset += 1;
                continue;
            }

            if let Some(ticks) = read_pcr(&payload[offset..offset + TS_PACKET_SIZE]) {
                self.clock.observe(ticks);
            }
            offset += TS_PACKET_SIZE;
        }

        self.target_reached()
    }

    pub fn target_reached(&self) -> bool {
        self.has_target()
            && self
                .clock
                .elapsed_ticks()
                .is_some_and(|elapsed| elapsed >= self.target_ticks)
    }
}
