//! RTSP request text for the four methods the recorder sends.
//!
//! Header order is fixed: method-specific leading headers, `CSeq`,
//! `User-Agent`, method-specific trailing headers, then the blank line.

use super::transport::TransportMode;

/// User agent announced to servers. Some IPTV head-ends only serve
/// interleaved MP2T to clients that look like ffmpeg.
pub const USER_AGENT: &str = "Lavf58.20.100";

fn build_request(
    method: &str,
    url: &str,
    cseq: u32,
    leading: &[(&str, &str)],
    trailing: &[(&str, &str)],
) -> String {
    let mut request = format!("{} {} RTSP/1.0\r\n", method, url);
    for &(name, value) in leading {
        request.push_str(&format!("{}: {}\r\n", name, value));
    }
    request.push_str(&format!("CSeq: {}\r\n", cseq));
    request.push_str(&format!("User-Agent: {}\r\n", USER_AGENT));
    for &(name, value) in trailing {
        request.push_str(&format!("{}: {}\r\n", name, value));
    }
    request.push_str("\r\n");
    request
}

fn session_header(session: Option<&str>) -> Vec<(&str, &str)> {
    session.map(|id| vec![("Session", id)]).unwrap_or_default()
}

pub fn describe(url: &str, cseq: u32) -> String {
    build_request("DESCRIBE", url, cseq, &[], &[("Accept", "application/sdp")])
}

pub fn setup(url: &str, cseq: u32, transport: TransportMode) -> String {
    let header = transport.setup_header();
    build_request("SETUP", url, cseq, &[("Transport", header.as_str())], &[])
}

/// `session` is echoed when the SETUP reply assigned one.
pub fn play(url: &str, cseq: u32, session: Option<&str>) -> String {
    build_request(
        "PLAY",
        url,
        cseq,
        &[("Range", "npt=0.000-")],
        &session_header(session),
    )
}

pub fn teardown(url: &str, cseq: u32, session: Option<&str>) -> String {
    build_request("TEARDOWN", url, cseq, &[], &session_header(session))
}
