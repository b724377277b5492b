use super::response::RTSPResponse;
use crate::{RecError, Result};
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{lookup_host, TcpStream};
use tokio::time::timeout;

/// Read buffer shared by RTSP responses and the interleaved frames that
/// follow PLAY on the same socket.
const READ_BUFFER_SIZE: usize = 64 * 1024;

#[derive(Debug)]
pub struct RTSPConnection {
    reader: BufReader<TcpStream>,
    addr: String,
    io_timeout: Duration,
}

impl RTSPConnection {
    pub async fn connect(
        host: &str,
        port: u16,
        connect_timeout: Duration,
        io_timeout: Duration,
    ) -> Result<Self> {
        let addr = format!("{}:{}", host, port);
        let stream = match timeout(connect_timeout, Self::open(host, port, &addr)).await {
            Ok(stream) => stream?,
            Err(_) => {
                return Err(RecError::ConnectTimeout {
                    addr,
                    timeout: connect_timeout,
                })
            }
        };

        stream.set_nodelay(true)?;

        Ok(Self {
            reader: BufReader::with_capacity(READ_BUFFER_SIZE, stream),
            addr,
            io_timeout,
        })
    }

    async fn open(host: &str, port: u16, addr: &str) -> Result<TcpStream> {
        let host = host.trim_start_matches('[').trim_end_matches(']');
        let addrs: Vec<SocketAddr> = lookup_host((host, port))
            .await
            .map_err(|e| RecError::DnsFailure {
                host: host.to_string(),
                reason: e.to_string(),
            })?
            .collect();

        if addrs.is_empty() {
            return Err(RecError::DnsFailure {
                host: host.to_string(),
                reason: "no addresses returned".into(),
            });
        }

        let mut last_err = None;
        for candidate in addrs {
            match TcpStream::connect(candidate).await {
                Ok(stream) => return Ok(stream),
                Err(e) => last_err = Some(e),
            }
        }

        match last_err {
            Some(e) if e.kind() == ErrorKind::ConnectionRefused => Err(RecError::ConnectRefused {
                addr: addr.to_string(),
            }),
            Some(e) => Err(e.into()),
            None => Err(RecError::Protocol(format!("no route to {}", addr))),
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn io_timeout(&self) -> Duration {
        self.io_timeout
    }

    /// Buffered read half, positioned right after the last parsed response.
    pub fn reader_mut(&mut self) -> &mut BufReader<TcpStream> {
        &mut self.reader
    }

    pub async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.reader.get_mut();
        let write = async {
            stream.write_all(data).await?;
            stream.flush().await
        };
        match timeout(self.io_timeout, write).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(RecError::WriteTimeout(self.io_timeout)),
        }
    }

    /// One line without its CRLF, or `None` at end of stream.
    async fn read_line(&mut self) -> Result<Option<String>> {
        let mut line = Vec::with_capacity(128);
        let n = match timeout(self.io_timeout, self.reader.read_until(b'\n', &mut line)).await {
            Ok(result) => result?,
            Err(_) => return Err(RecError::ReadTimeout(self.io_timeout)),
        };
        if n == 0 {
            return Ok(None);
        }
        while matches!(line.last(), Some(b'\n') | Some(b'\r')) {
            line.pop();
        }
        Ok(Some(String::from_utf8_lossy(&line).into_owned()))
    }

    async fn read_body(&mut self, response: &mut RTSPResponse, step: &'static str) -> Result<()> {
        let Some(length) = response.content_length().filter(|&len| len > 0) else {
            return Ok(());
        };
        let mut body = vec![0u8; length];
        match timeout(self.io_timeout, self.reader.read_exact(&mut body)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) if e.kind() == ErrorKind::UnexpectedEof => {
                return Err(RecError::ConnectionClosed(step))
            }
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => return Err(RecError::ReadTimeout(self.io_timeout)),
        }
        response.body = String::from_utf8_lossy(&body).into_owned();
        Ok(())
    }

    /// Read one response: header lines up to the blank line, then exactly
    /// `Content-Length` body bytes when the header is present.
    pub async fn read_response(&mut self, step: &'static str) -> Result<RTSPResponse> {
        let mut lines: Vec<String> = Vec::new();
        loop {
            match self.read_line().await? {
                None if lines.is_empty() => return Err(RecError::ConnectionClosed(step)),
                None => break,
                // stray CRLF left over from a previous response
                Some(line) if line.is_empty() && lines.is_empty() => continue,
                Some(line) if line.is_empty() => break,
                Some(line) => lines.push(line),
            }
        }

        let mut response = RTSPResponse::from_head(&lines);
        self.read_body(&mut response, step).await?;
        Ok(response)
    }

    /// Discard a trailing response some servers emit after the PLAY reply.
    ///
    /// Returns without consuming anything when the stream ends or the next
    /// byte already starts an interleaved frame.
    pub async fn drain_trailing_response(&mut self) -> Result<Option<RTSPResponse>> {
        let next = match timeout(self.io_timeout, self.reader.fill_buf()).await {
            Ok(result) => result?.first().copied(),
            Err(_) => return Err(RecError::ReadTimeout(self.io_timeout)),
        };
        match next {
            None | Some(b'$') => return Ok(None),
            Some(_) => {}
        }

        let mut lines: Vec<String> = Vec::new();
        while let Some(line) = self.read_line().await? {
            if line.is_empty() {
                break;
            }
            lines.push(line);
        }
        if lines.is_empty() {
            return Ok(None);
        }

        let mut response = RTSPResponse::from_head(&lines);
        self.read_body(&mut response, "PLAY").await?;
        Ok(Some(response))
    }

    /// Close the socket. Errors are irrelevant at this point.
    pub async fn shutdown(mut self) {
        let _ = self.reader.get_mut().shutdown().await;
    }
}
