//! RFC 2326 §10.12 interleaved binary framing.
//!
//! Each frame on the RTSP socket after PLAY is
//! `[0x24][channel:u8][length:u16 BE][payload]`.

use crate::{RecError, Result};
use log::warn;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::timeout;

/// Leading byte of every interleaved frame (`$`).
pub const INTERLEAVED_MAGIC: u8 = 0x24;
pub const INTERLEAVED_HEADER_SIZE: usize = 4;
/// Largest payload a 16-bit length can announce.
pub const MAX_INTERLEAVED_PAYLOAD: usize = u16::MAX as usize;
/// Channel carrying media for the single negotiated stream.
pub const MEDIA_CHANNEL: u8 = 0;

/// Outcome of one step of the frame reader.
#[derive(Debug, PartialEq, Eq)]
pub enum FrameEvent<'a> {
    /// A complete frame; `payload` borrows the caller's buffer.
    Frame { channel: u8, payload: &'a [u8] },
    /// A 4-byte window without the `$` marker was discarded.
    Resync,
    /// A header announcing a zero length was discarded.
    EmptyFrame,
    /// The server closed the connection.
    EndOfStream,
}

pub struct InterleavedReader<R> {
    inner: R,
    read_timeout: Duration,
}

impl<R: AsyncRead + Unpin> InterleavedReader<R> {
    pub fn new(inner: R, read_timeout: Duration) -> Self {
        Self {
            inner,
            read_timeout,
        }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Fill `buf` completely, looping over partial reads. `false` means the
    /// peer closed the stream first.
    async fn read_full(&mut self, buf: &mut [u8]) -> Result<bool> {
        let mut filled = 0;
        while filled < buf.len() {
            let read = match timeout(self.read_timeout, self.inner.read(&mut buf[filled..])).await {
                Ok(result) => result?,
                Err(_) => return Err(RecError::ReadTimeout(self.read_timeout)),
            };
            if read == 0 {
                return Ok(false);
            }
            filled += read;
        }
        Ok(true)
    }

    /// Read the next frame into `buf`, which must hold at least
    /// [`MAX_INTERLEAVED_PAYLOAD`] bytes.
    pub async fn next_frame<'a>(&mut self, buf: &'a mut [u8]) -> Result<FrameEvent<'a>> {
        let mut header = [0u8; INTERLEAVED_HEADER_SIZE];
        if !self.read_full(&mut header).await? {
            return Ok(FrameEvent::EndOfStream);
        }

        if header[0] != INTERLEAVED_MAGIC {
            return Ok(FrameEvent::Resync);
        }

        let channel = header[1];
        let length = u16::from_be_bytes([header[2], header[3]]) as usize;
        if length == 0 {
            warn!("discarding interleaved frame with zero length on channel {}", channel);
            return Ok(FrameEvent::EmptyFrame);
        }

        if buf.len() < length {
            return Err(RecError::Protocol(format!(
                "frame buffer of {} bytes cannot hold {} byte payload",
                buf.len(),
                length
            )));
        }

        let payload = &mut buf[..length];
        if !self.read_full(payload).await? {
            return Ok(FrameEvent::EndOfStream);
        }

        Ok(FrameEvent::Frame {
            channel,
            payload: &buf[..length],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use quickcheck_macros::quickcheck;

    fn frame(channel: u8, payload: &[u8]) -> Vec<u8> {
        let mut out = vec![INTERLEAVED_MAGIC, channel];
        out.extend_from_slice(&(payload.len() as u16).to_be_bytes());
        out.extend_from_slice(payload);
        out
    }

    async fn collect<R: AsyncRead + Unpin>(reader: &mut InterleavedReader<R>) -> Vec<(u8, Vec<u8>)> {
        let mut buf = vec![0u8; MAX_INTERLEAVED_PAYLOAD];
        let mut frames = Vec::new();
        loop {
            match reader.next_frame(&mut buf).await.unwrap() {
                FrameEvent::Frame { channel, payload } => frames.push((channel, payload.to_vec())),
                FrameEvent::EndOfStream => return frames,
                FrameEvent::Resync | FrameEvent::EmptyFrame => {}
            }
        }
    }

    #[tokio::test]
    async fn test_reads_frames_in_order() {
        let mut data = frame(0, &[1, 2, 3]);
        data.extend(frame(1, &[9; 8]));
        data.extend(frame(0, &[4, 5]));
        let mut reader = InterleavedReader::new(&data[..], Duration::from_secs(1));
        assert_eq!(
            collect(&mut reader).await,
            vec![(0, vec![1, 2, 3]), (1, vec![9; 8]), (0, vec![4, 5])]
        );
    }

    #[tokio::test]
    async fn test_partial_reads_are_joined() {
        let mock = tokio_test::io::Builder::new()
            .read(&[INTERLEAVED_MAGIC, 0])
            .read(&[0x00])
            .read(&[0x04, 0xAA])
            .read(&[0xBB, 0xCC])
            .read(&[0xDD])
            .build();
        let mut reader = InterleavedReader::new(mock, Duration::from_secs(1));
        let mut buf = vec![0u8; MAX_INTERLEAVED_PAYLOAD];
        assert_eq!(
            reader.next_frame(&mut buf).await.unwrap(),
            FrameEvent::Frame {
                channel: 0,
                payload: &[0xAA, 0xBB, 0xCC, 0xDD]
            }
        );
        assert_eq!(reader.next_frame(&mut buf).await.unwrap(), FrameEvent::EndOfStream);
    }

    #[tokio::test]
    async fn test_noise_window_is_skipped() {
        let mut data = vec![0x47, 0x00, 0x11, 0x22];
        data.extend(frame(0, &[7]));
        let mut reader = InterleavedReader::new(&data[..], Duration::from_secs(1));
        let mut buf = vec![0u8; MAX_INTERLEAVED_PAYLOAD];
        assert_eq!(reader.next_frame(&mut buf).await.unwrap(), FrameEvent::Resync);
        assert_eq!(
            reader.next_frame(&mut buf).await.unwrap(),
            FrameEvent::Frame { channel: 0, payload: &[7] }
        );
    }

    #[tokio::test]
    async fn test_zero_length_frame_is_discarded() {
        let mut data = vec![INTERLEAVED_MAGIC, 0, 0, 0];
        data.extend(frame(0, &[1, 2]));
        let mut reader = InterleavedReader::new(&data[..], Duration::from_secs(1));
        let mut buf = vec![0u8; MAX_INTERLEAVED_PAYLOAD];
        assert_eq!(reader.next_frame(&mut buf).await.unwrap(), FrameEvent::EmptyFrame);
        assert!(matches!(
            reader.next_frame(&mut buf).await.unwrap(),
            FrameEvent::Frame { channel: 0, .. }
        ));
    }

    #[tokio::test]
    async fn test_close_mid_header_and_mid_payload() {
        let short_header = [INTERLEAVED_MAGIC, 0];
        let mut reader = InterleavedReader::new(&short_header[..], Duration::from_secs(1));
        let mut buf = vec![0u8; MAX_INTERLEAVED_PAYLOAD];
        assert_eq!(reader.next_frame(&mut buf).await.unwrap(), FrameEvent::EndOfStream);

        let truncated = [INTERLEAVED_MAGIC, 0, 0, 10, 1, 2, 3];
        let mut reader = InterleavedReader::new(&truncated[..], Duration::from_secs(1));
        assert_eq!(reader.next_frame(&mut buf).await.unwrap(), FrameEvent::EndOfStream);
    }

    #[tokio::test]
    async fn test_read_timeout() {
        let (client, _server) = tokio::io::duplex(64);
        let mut reader = InterleavedReader::new(client, Duration::from_millis(20));
        let mut buf = vec![0u8; MAX_INTERLEAVED_PAYLOAD];
        let err = reader.next_frame(&mut buf).await.unwrap_err();
        assert!(matches!(err, RecError::ReadTimeout(_)));
    }

    #[quickcheck]
    fn prop_frames_preserve_order(payloads: Vec<(bool, Vec<u8>)>) -> bool {
        let payloads: Vec<(u8, Vec<u8>)> = payloads
            .into_iter()
            .filter(|(_, p)| !p.is_empty())
            .map(|(rtcp, p)| (rtcp as u8, p))
            .collect();
        let wire: Vec<u8> = payloads.iter().flat_map(|(c, p)| frame(*c, p)).collect();

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        let received = rt.block_on(async {
            let mut reader = InterleavedReader::new(&wire[..], Duration::from_secs(1));
            collect(&mut reader).await
        });
        received == payloads
    }
}
