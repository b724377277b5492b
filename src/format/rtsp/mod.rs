//! # RTSP over TCP with interleaved media
//!
//! The pieces the recorder needs to pull a single MPEG-TS stream off an
//! RTSP server:
//!
//! - [`message`]: request text for DESCRIBE, SETUP, PLAY and TEARDOWN
//! - [`RTSPConnection`]: TCP socket with connect/read/write timeouts and
//!   response parsing
//! - [`RTSPSession`]: CSeq sequencing, the handshake and redirect detection
//! - [`InterleavedReader`]: `$`-framed binary data after PLAY
//!
//! ## Example
//!
//! ```rust,no_run
//! use rtsprec::format::rtsp::{FrameEvent, Handshake, RTSPSession, TransportMode};
//! use std::time::Duration;
//!
//! # async fn run() -> rtsprec::Result<()> {
//! let mut session = RTSPSession::connect(
//!     "rtsp://example.com/live/ch1",
//!     TransportMode::TsOverTcp,
//!     Duration::from_secs(10),
//!     Duration::from_secs(30),
//! )
//! .await?;
//!
//! if session.handshake().await? == Handshake::Playing {
//!     let mut buf = vec![0u8; rtsprec::format::rtsp::MAX_INTERLEAVED_PAYLOAD];
//!     let mut frames = session.frames();
//!     while let FrameEvent::Frame { channel, payload } = frames.next_frame(&mut buf).await? {
//!         println!("channel {} carried {} bytes", channel, payload.len());
//!     }
//! }
//! session.teardown().await;
//! # Ok(())
//! # }
//! ```

mod connection;
mod interleaved;
pub mod message;
mod response;
mod session;
mod transport;

pub use connection::RTSPConnection;
pub use interleaved::{
    FrameEvent, InterleavedReader, INTERLEAVED_HEADER_SIZE, INTERLEAVED_MAGIC,
    MAX_INTERLEAVED_PAYLOAD, MEDIA_CHANNEL,
};
pub use response::RTSPResponse;
pub use session::{parse_rtsp_url, Handshake, RTSPSession, DEFAULT_RTSP_PORT};
pub use transport::{CastType, TransportInfo, TransportMode};
