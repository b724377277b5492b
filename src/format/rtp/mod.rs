//! # RTP header stripping for MP2T/RTP/TCP
//!
//! When `MP2T/RTP/TCP` is negotiated every interleaved frame is
//! `[RTP header][TS bytes]`. The header is only measured (RFC 3550 fixed
//! part, CSRC list, optional extension) so it can be skipped; sequence
//! numbers and timestamps are not inspected.
//!
//! ```rust
//! use rtsprec::format::rtp::PayloadExtractor;
//! use rtsprec::format::rtsp::TransportMode;
//!
//! let extractor = PayloadExtractor::new(TransportMode::RtpOverTcp);
//! let mut frame = vec![0x80, 33, 0, 1, 0, 0, 0, 0, 0, 0, 0, 1];
//! frame.extend_from_slice(&[0x47, 0x40, 0x00, 0x10]);
//! assert_eq!(extractor.extract(&frame), Some(&[0x47, 0x40, 0x00, 0x10][..]));
//! ```

use crate::format::rtsp::TransportMode;
use crate::format::ts::TS_SYNC_BYTE;

/// Fixed part of the RTP header.
pub const RTP_HEADER_SIZE: usize = 12;

/// Length of the RTP header at the start of `packet`, or `None` when the
/// packet is too short for the header it announces.
pub fn header_len(packet: &[u8]) -> Option<usize> {
    if packet.len() < RTP_HEADER_SIZE {
        return None;
    }

    let first_byte = packet[0];
    let csrc_count = (first_byte & 0x0f) as usize;
    let extension = (first_byte & 0x10) != 0;

    let mut len = RTP_HEADER_SIZE + 4 * csrc_count;
    if len > packet.len() {
        return None;
    }

    if extension {
        if len + 4 > packet.len() {
            return None;
        }
        let ext_words = u16::from_be_bytes([packet[len + 2], packet[len + 3]]) as usize;
        len += 4 + 4 * ext_words;
        if len > packet.len() {
            return None;
        }
    }

    Some(len)
}

/// Turns an interleaved payload into the TS bytes it carries.
#[derive(Debug, Clone, Copy)]
pub struct PayloadExtractor {
    mode: TransportMode,
}

impl PayloadExtractor {
    pub fn new(mode: TransportMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> TransportMode {
        self.mode
    }

    /// TS slice inside `payload`, or `None` when the frame is truncated and
    /// must be dropped. Never copies.
    pub fn extract<'a>(&self, payload: &'a [u8]) -> Option<&'a [u8]> {
        match self.mode {
            TransportMode::TsOverTcp => Some(payload),
            TransportMode::RtpOverTcp => {
                // some servers send bare TS even after agreeing to RTP
                if payload.first() == Some(&TS_SYNC_BYTE) {
                    return Some(payload);
                }
                header_len(payload).map(|len| &payload[len..])
            }
        }
    }
}
