//! Wire formats: RTSP control and interleaving, RTP headers, MPEG-TS timing.

pub mod rtp;
pub mod rtsp;
pub mod ts;

pub use self::rtp::PayloadExtractor;
pub use self::rtsp::{FrameEvent, InterleavedReader, RTSPSession, TransportMode};
pub use self::ts::{PcrClock, PcrTracker};
