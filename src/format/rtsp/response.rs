use super::transport::TransportInfo;

/// A parsed RTSP response: status line, header block and optional body.
#[derive(Debug, Clone, Default)]
pub struct RTSPResponse {
    pub status_line: String,
    pub status_code: Option<u16>,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RTSPResponse {
    /// Parse the header block (lines without their terminators). The first
    /// line is the status line.
    pub fn from_head<S: AsRef<str>>(lines: &[S]) -> Self {
        let mut lines = lines.iter().map(|l| l.as_ref());
        let status_line = lines.next().unwrap_or_default().trim().to_string();
        let status_code = status_line
            .split_whitespace()
            .nth(1)
            .and_then(|code| code.parse::<u16>().ok());

        let headers = lines
            .filter_map(|line| line.split_once(':'))
            .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
            .collect();

        Self {
            status_line,
            status_code,
            headers,
            body: String::new(),
        }
    }

    /// Case-insensitive header lookup; first occurrence wins.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_ok(&self) -> bool {
        self.status_code == Some(200)
    }

    pub fn content_length(&self) -> Option<usize> {
        self.header("Content-Length")?.parse().ok()
    }

    /// Redirect target, present on 3xx answers from playback gateways.
    pub fn location(&self) -> Option<&str> {
        self.header("Location").filter(|l| !l.is_empty())
    }

    /// Session id without the `;timeout=` parameter.
    pub fn session(&self) -> Option<&str> {
        self.header("Session")
            .and_then(|s| s.split(';').next())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn transport(&self) -> Option<TransportInfo> {
        self.header("Transport").and_then(TransportInfo::parse)
    }

    /// Reassemble the response as text for diagnostics.
    pub fn raw(&self) -> String {
        let mut raw = self.status_line.clone();
        raw.push_str("\r\n");
        for (name, value) in &self.headers {
            raw.push_str(&format!("{}: {}\r\n", name, value));
        }
        if !self.body.is_empty() {
            raw.push_str("\r\n");
            raw.push_str(&self.body);
        }
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ok_response() {
        let resp = RTSPResponse::from_head(&[
            "RTSP/1.0 200 OK",
            "CSeq: 3",
            "Session: 66334873;timeout=60",
            "Transport: MP2T/TCP;unicast;interleaved=0-1",
        ]);
        assert!(resp.is_ok());
        assert_eq!(resp.status_code, Some(200));
        assert_eq!(resp.header("cseq"), Some("3"));
        assert_eq!(resp.session(), Some("66334873"));
        assert_eq!(resp.transport().unwrap().interleaved, Some((0, 1)));
        assert!(resp.location().is_none());
    }

    #[test]
    fn test_parse_redirect() {
        let resp = RTSPResponse::from_head(&[
            "RTSP/1.0 302 Moved Temporarily",
            "CSeq: 2",
            "Location: rtsp://10.1.1.7:554/live/ch1?token=abc",
        ]);
        assert!(!resp.is_ok());
        assert_eq!(resp.location(), Some("rtsp://10.1.1.7:554/live/ch1?token=abc"));
    }

    #[test]
    fn test_parse_garbage_status() {
        let resp = RTSPResponse::from_head(&["garbage"]);
        assert_eq!(resp.status_code, None);
        assert!(!resp.is_ok());
        let empty = RTSPResponse::from_head::<&str>(&[]);
        assert_eq!(empty.status_line, "");
    }

    #[test]
    fn test_raw_includes_body() {
        let mut resp = RTSPResponse::from_head(&["RTSP/1.0 404 Not Found", "CSeq: 2"]);
        assert_eq!(resp.raw(), "RTSP/1.0 404 Not Found\r\nCSeq: 2\r\n");
        resp.body = "v=0".into();
        assert!(resp.raw().ends_with("\r\n\r\nv=0"));
    }
}
