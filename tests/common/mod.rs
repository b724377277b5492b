//! In-process RTSP server for driving the recorder end to end.

#![allow(dead_code)]

use parking_lot::Mutex;
use rtsprec::format::ts::{pcr_packet, TS_PACKET_SIZE};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

pub const MEDIA_PID: u16 = 0x100;

#[derive(Debug, Clone)]
pub struct Request {
    pub method: String,
    pub url: String,
    pub cseq: u32,
    pub text: String,
}

#[derive(Debug, Clone)]
pub enum Describe {
    Ok,
    Status(u16, &'static str),
    Redirect(String),
    /// Redirect back to the requested URL, forever
    RedirectSelf,
}

#[derive(Debug, Clone)]
pub struct Script {
    pub describe: Describe,
    pub setup_status: Option<(u16, &'static str)>,
    pub play_status: Option<(u16, &'static str)>,
    pub session: Option<&'static str>,
    pub trailing_after_play: bool,
    pub frames: Vec<Vec<u8>>,
    pub frame_delay: Duration,
    /// Send FIN after the last frame instead of waiting for TEARDOWN
    pub close_after_frames: bool,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            describe: Describe::Ok,
            setup_status: None,
            play_status: None,
            session: None,
            trailing_after_play: false,
            frames: Vec::new(),
            frame_delay: Duration::ZERO,
            close_after_frames: true,
        }
    }
}

impl Script {
    pub fn frames(frames: Vec<Vec<u8>>) -> Self {
        Self {
            frames,
            ..Self::default()
        }
    }

    pub fn hold_open(mut self) -> Self {
        self.close_after_frames = false;
        self
    }
}

pub struct MockServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<Request>>>,
    accept: JoinHandle<()>,
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.accept.abort();
    }
}

impl MockServer {
    pub async fn start(script: Script) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));

        let log = requests.clone();
        let accept = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let script = script.clone();
                let log = log.clone();
                tokio::spawn(async move {
                    let _ = serve(stream, script, log).await;
                });
            }
        });

        Self {
            addr,
            requests,
            accept,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("rtsp://{}/{}", self.addr, path)
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().clone()
    }

    pub fn methods(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.method).collect()
    }

    /// Wait up to two seconds for a request with `method` to arrive.
    pub async fn wait_for(&self, method: &str) -> Option<Request> {
        for _ in 0..200 {
            if let Some(found) = self.requests().into_iter().find(|r| r.method == method) {
                return Some(found);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        None
    }
}

async fn read_request(reader: &mut BufReader<OwnedReadHalf>) -> std::io::Result<Option<Request>> {
    let mut text = String::new();
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        if line.trim().is_empty() {
            if text.is_empty() {
                continue;
            }
            break;
        }
        text.push_str(&line);
    }

    let mut parts = text.lines().next().unwrap_or_default().split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let url = parts.next().unwrap_or_default().to_string();
    let cseq = text
        .lines()
        .find_map(|l| l.strip_prefix("CSeq:"))
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0);

    Ok(Some(Request {
        method,
        url,
        cseq,
        text,
    }))
}

async fn reply(
    write: &mut OwnedWriteHalf,
    status: u16,
    reason: &str,
    cseq: u32,
    headers: &[(&str, String)],
    body: &str,
) -> std::io::Result<()> {
    let mut response = format!("RTSP/1.0 {} {}\r\nCSeq: {}\r\n", status, reason, cseq);
    for (name, value) in headers {
        response.push_str(&format!("{}: {}\r\n", name, value));
    }
    if !body.is_empty() {
        response.push_str(&format!("Content-Length: {}\r\n", body.len()));
    }
    response.push_str("\r\n");
    response.push_str(body);
    write.write_all(response.as_bytes()).await
}

const SDP: &str = "v=0\r\no=- 0 0 IN IP4 127.0.0.1\r\ns=mock\r\nt=0 0\r\nm=video 0 RTP/AVP 33\r\na=rtpmap:33 MP2T/90000\r\n";

async fn serve(
    stream: TcpStream,
    script: Script,
    requests: Arc<Mutex<Vec<Request>>>,
) -> std::io::Result<()> {
    let (read, mut write) = stream.into_split();
    let mut reader = BufReader::new(read);

    while let Some(request) = read_request(&mut reader).await? {
        requests.lock().push(request.clone());
        let cseq = request.cseq;

        match request.method.as_str() {
            "DESCRIBE" => match &script.describe {
                Describe::Ok => {
                    let headers = [("Content-Type", "application/sdp".to_string())];
                    reply(&mut write, 200, "OK", cseq, &headers, SDP).await?
                }
                Describe::Status(code, reason) => {
                    reply(&mut write, *code, reason, cseq, &[], "").await?
                }
                Describe::Redirect(location) => {
                    let headers = [("Location", location.clone())];
                    reply(&mut write, 302, "Moved Temporarily", cseq, &headers, "").await?
                }
                Describe::RedirectSelf => {
                    let headers = [("Location", request.url.clone())];
                    reply(&mut write, 302, "Moved Temporarily", cseq, &headers, "").await?
                }
            },
            "SETUP" => match script.setup_status {
                Some((code, reason)) => reply(&mut write, code, reason, cseq, &[], "").await?,
                None => {
                    let transport = request
                        .text
                        .lines()
                        .find_map(|l| l.strip_prefix("Transport:"))
                        .unwrap_or_default()
                        .trim()
                        .to_string();
                    let mut headers = vec![("Transport", transport)];
                    if let Some(session) = script.session {
                        headers.push(("Session", session.to_string()));
                    }
                    reply(&mut write, 200, "OK", cseq, &headers, "").await?
                }
            },
            "PLAY" => {
                if let Some((code, reason)) = script.play_status {
                    reply(&mut write, code, reason, cseq, &[], "").await?;
                    continue;
                }
                reply(&mut write, 200, "OK", cseq, &[], "").await?;
                if script.trailing_after_play {
                    reply(&mut write, 200, "OK", cseq, &[], "").await?;
                }
                for frame in &script.frames {
                    write.write_all(frame).await?;
                    if !script.frame_delay.is_zero() {
                        tokio::time::sleep(script.frame_delay).await;
                    }
                }
                write.flush().await?;
                if script.close_after_frames {
                    write.shutdown().await?;
                }
            }
            "TEARDOWN" => {}
            _ => reply(&mut write, 501, "Not Implemented", cseq, &[], "").await?,
        }
    }
    Ok(())
}

/// `$`-framed payload on `channel`.
pub fn interleaved(channel: u8, payload: &[u8]) -> Vec<u8> {
    let mut frame = vec![b'$', channel];
    frame.extend_from_slice(&(payload.len() as u16).to_be_bytes());
    frame.extend_from_slice(payload);
    frame
}

/// One TS packet without adaptation field.
pub fn plain_packet() -> [u8; TS_PACKET_SIZE] {
    let mut packet = [0xffu8; TS_PACKET_SIZE];
    packet[0] = 0x47;
    packet[1] = (MEDIA_PID >> 8) as u8;
    packet[2] = MEDIA_PID as u8;
    packet[3] = 0x10;
    packet
}

/// Channel-0 frame with one TS packet, carrying a PCR when `ticks` is set.
pub fn ts_frame(ticks: Option<u64>) -> Vec<u8> {
    match ticks {
        Some(ticks) => interleaved(0, &pcr_packet(MEDIA_PID, ticks)),
        None => interleaved(0, &plain_packet()),
    }
}

/// RTP packet (PT 33) around `payload`, with `csrc` CSRC entries.
pub fn rtp_packet(seq: u16, csrc: u8, payload: &[u8]) -> Vec<u8> {
    let mut packet = vec![0x80 | (csrc & 0x0f), 33];
    packet.extend_from_slice(&seq.to_be_bytes());
    packet.extend_from_slice(&(seq as u32 * 3600).to_be_bytes());
    packet.extend_from_slice(&0x1234_5678u32.to_be_bytes());
    for i in 0..csrc {
        packet.extend_from_slice(&(i as u32).to_be_bytes());
    }
    packet.extend_from_slice(payload);
    packet
}
