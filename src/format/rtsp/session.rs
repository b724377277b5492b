use super::connection::RTSPConnection;
use super::interleaved::{InterleavedReader, MEDIA_CHANNEL};
use super::message;
use super::response::RTSPResponse;
use super::transport::TransportMode;
use crate::{RecError, Result};
use log::{debug, info, warn};
use std::time::Duration;
use tokio::io::BufReader;
use tokio::net::TcpStream;
use url::Url;

/// Default RTSP port when the URL carries none.
pub const DEFAULT_RTSP_PORT: u16 = 554;

/// What the handshake ended with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handshake {
    /// PLAY accepted; interleaved frames follow on the socket.
    Playing,
    /// DESCRIBE answered with `Location:`; the caller must start over there.
    Redirect(String),
}

/// One RTSP session on one TCP connection.
///
/// A session is never reused across redirects: each attempt connects a new
/// value, so the CSeq counter always restarts at [`RTSPSession::INITIAL_CSEQ`].
#[derive(Debug)]
pub struct RTSPSession {
    connection: RTSPConnection,
    url: String,
    cseq: u32,
    transport: TransportMode,
    session_id: Option<String>,
}

/// Split an `rtsp://` URL into host and port (554 when absent).
pub fn parse_rtsp_url(url: &str) -> Result<(String, u16)> {
    let parsed =
        Url::parse(url).map_err(|e| RecError::InvalidUrl(format!("{}: {}", url, e)))?;

    if parsed.scheme() != "rtsp" {
        return Err(RecError::InvalidUrl(format!(
            "{}: scheme is not 'rtsp'",
            url
        )));
    }

    let host = parsed
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| RecError::InvalidUrl(format!("{}: no host", url)))?;

    Ok((host.to_string(), parsed.port().unwrap_or(DEFAULT_RTSP_PORT)))
}

impl RTSPSession {
    /// CSeq of the first request (DESCRIBE) in every session.
    pub const INITIAL_CSEQ: u32 = 2;

    pub async fn connect(
        url: &str,
        transport: TransportMode,
        connect_timeout: Duration,
        io_timeout: Duration,
    ) -> Result<Self> {
        let (host, port) = parse_rtsp_url(url)?;
        debug!("connecting to {}:{} for {}", host, port, url);
        let connection = RTSPConnection::connect(&host, port, connect_timeout, io_timeout).await?;

        Ok(Self {
            connection,
            url: url.to_string(),
            cseq: Self::INITIAL_CSEQ,
            transport,
            session_id: None,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// CSeq the next request will carry.
    pub fn cseq(&self) -> u32 {
        self.cseq
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    fn next_cseq(&mut self) -> u32 {
        let cseq = self.cseq;
        self.cseq += 1;
        cseq
    }

    async fn send(&mut self, request: String, step: &'static str) -> Result<RTSPResponse> {
        debug!("sending {} request:\n{}", step, request);
        self.connection.write_all(request.as_bytes()).await?;
        let response = self.connection.read_response(step).await?;
        debug!("received {} response:\n{}", step, response.raw());
        Ok(response)
    }

    /// Absolute form of a `Location:` value, resolved against the current URL.
    fn resolve_location(&self, location: &str) -> String {
        Url::parse(&self.url)
            .and_then(|base| base.join(location))
            .map(String::from)
            .unwrap_or_else(|_| location.to_string())
    }

    /// DESCRIBE, SETUP and PLAY.
    pub async fn handshake(&mut self) -> Result<Handshake> {
        let cseq = self.next_cseq();
        let describe = self.send(message::describe(&self.url, cseq), "DESCRIBE").await?;

        if let Some(location) = describe.location() {
            let target = self.resolve_location(location);
            info!("RTSP redirect from {} to {}", self.url, target);
            return Ok(Handshake::Redirect(target));
        }

        if !describe.is_ok() {
            return Err(RecError::DescribeFailed {
                status_line: describe.status_line.clone(),
                response: describe.raw(),
            });
        }

        let cseq = self.next_cseq();
        let setup = self
            .send(message::setup(&self.url, cseq, self.transport), "SETUP")
            .await?;

        if !setup.is_ok() {
            return Err(RecError::SetupFailed {
                transport: self.transport.setup_header(),
                status_line: setup.status_line.clone(),
                response: setup.raw(),
            });
        }

        self.session_id = setup.session().map(String::from);
        if let Some(info) = setup.transport() {
            if info.data_channel() != MEDIA_CHANNEL {
                warn!(
                    "server moved media to interleaved channel {}; only channel {} is recorded",
                    info.data_channel(),
                    MEDIA_CHANNEL
                );
            }
        }

        let cseq = self.next_cseq();
        let play = self
            .send(
                message::play(&self.url, cseq, self.session_id.as_deref()),
                "PLAY",
            )
            .await?;

        if !play.is_ok() {
            return Err(RecError::PlayFailed {
                status_line: play.status_line.clone(),
                response: play.raw(),
            });
        }

        if let Some(trailing) = self.connection.drain_trailing_response().await? {
            debug!("discarded trailing response after PLAY: {}", trailing.status_line);
        }

        Ok(Handshake::Playing)
    }

    /// Frame reader over the session socket, sharing its read buffer.
    pub fn frames(&mut self) -> InterleavedReader<&mut BufReader<TcpStream>> {
        let read_timeout = self.connection.io_timeout();
        InterleavedReader::new(self.connection.reader_mut(), read_timeout)
    }

    /// Best-effort TEARDOWN with the current CSeq, then close the socket.
    pub async fn teardown(mut self) {
        let request = message::teardown(&self.url, self.cseq, self.session_id.as_deref());
        debug!("sending TEARDOWN request:\n{}", request);
        if let Err(e) = self.connection.write_all(request.as_bytes()).await {
            debug!("TEARDOWN to {} failed: {}", self.connection.addr(), e);
        }
        self.connection.shutdown().await;
    }

    /// Close without TEARDOWN, used when following a redirect.
    pub async fn close(self) {
        self.connection.shutdown().await;
    }
}
