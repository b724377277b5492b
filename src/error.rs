use std::time::Duration;
use thiserror::Error;

/// Errors that terminate a recording run.
///
/// Malformed interleaved frames are not represented here: they are skipped
/// where they are found and only counted.
#[derive(Error, Debug)]
pub enum RecError {
    /// File or socket I/O failure
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The recording URL could not be parsed or is not `rtsp://`
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// Host name resolution failed
    #[error("dns lookup failed for {host}: {reason}")]
    DnsFailure { host: String, reason: String },

    /// The server actively refused the TCP connection
    #[error("connection refused by {addr}")]
    ConnectRefused { addr: String },

    /// No TCP connection could be established within the connect timeout
    #[error("connect to {addr} timed out after {timeout:?}")]
    ConnectTimeout { addr: String, timeout: Duration },

    /// A socket read stalled longer than the io timeout
    #[error("read timed out after {0:?}")]
    ReadTimeout(Duration),

    /// A socket write stalled longer than the io timeout
    #[error("write timed out after {0:?}")]
    WriteTimeout(Duration),

    /// The server closed the connection before a response was complete
    #[error("connection closed by peer during {0}")]
    ConnectionClosed(&'static str),

    #[error("RTSP DESCRIBE failed: {status_line}")]
    DescribeFailed { status_line: String, response: String },

    #[error("RTSP SETUP failed with transport {transport}: {status_line}")]
    SetupFailed {
        transport: String,
        status_line: String,
        response: String,
    },

    #[error("RTSP PLAY failed: {status_line}")]
    PlayFailed { status_line: String, response: String },

    /// The server kept redirecting past the configured limit
    #[error("too many RTSP redirects (limit {limit})")]
    TooManyRedirects { limit: usize },

    #[error("protocol error: {0}")]
    Protocol(String),
}

impl RecError {
    /// Raw server response attached to a failed handshake step, if any.
    pub fn response(&self) -> Option<&str> {
        match self {
            RecError::DescribeFailed { response, .. }
            | RecError::SetupFailed { response, .. }
            | RecError::PlayFailed { response, .. } => Some(response),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, RecError>;
