use crate::RecError;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// How MPEG-TS travels inside the interleaved channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportMode {
    /// Raw TS bytes directly in each interleaved frame (`MP2T/TCP`)
    #[default]
    TsOverTcp,
    /// Each interleaved frame is an RTP packet carrying TS (`MP2T/RTP/TCP`)
    RtpOverTcp,
}

impl TransportMode {
    /// Protocol token used in the `Transport` header.
    pub fn protocol(&self) -> &'static str {
        match self {
            TransportMode::TsOverTcp => "MP2T/TCP",
            TransportMode::RtpOverTcp => "MP2T/RTP/TCP",
        }
    }

    /// Full `Transport` header value requested in SETUP.
    pub fn setup_header(&self) -> String {
        format!("{};unicast;interleaved=0-1", self.protocol())
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.protocol())
    }
}

impl FromStr for TransportMode {
    type Err = RecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MP2T/TCP" | "TS" => Ok(TransportMode::TsOverTcp),
            "MP2T/RTP/TCP" | "RTP" => Ok(TransportMode::RtpOverTcp),
            other => Err(RecError::Protocol(format!(
                "unsupported transport '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CastType {
    Unicast,
    Multicast,
}

/// `Transport` header as answered by the server in the SETUP reply.
#[derive(Debug, Clone)]
pub struct TransportInfo {
    pub protocol: String,
    pub cast_type: CastType,
    pub interleaved: Option<(u8, u8)>,
    pub ssrc: Option<u32>,
    pub mode: Option<String>,
    pub extra_params: HashMap<String, Option<String>>,
}

impl TransportInfo {
    /// Parse a transport string into TransportInfo
    pub fn parse(transport: &str) -> Option<Self> {
        let mut parts = transport.split(';');
        let protocol = parts.next()?.trim();
        if protocol.is_empty() {
            return None;
        }

        let mut info = TransportInfo {
            protocol: protocol.to_string(),
            cast_type: CastType::Unicast,
            interleaved: None,
            ssrc: None,
            mode: None,
            extra_params: HashMap::new(),
        };

        for part in parts {
            let part = part.trim();
            if part == "unicast" {
                info.cast_type = CastType::Unicast;
            } else if part == "multicast" {
                info.cast_type = CastType::Multicast;
            } else if let Some((key, value)) = part.split_once('=') {
                match key {
                    "interleaved" => {
                        info.interleaved = match value.split_once('-') {
                            Some((data, control)) => {
                                data.parse().ok().zip(control.parse().ok())
                            }
                            None => value.parse().ok().map(|data: u8| (data, data.wrapping_add(1))),
                        };
                    }
                    "ssrc" => {
                        if let Ok(ssrc) = u32::from_str_radix(value.trim_start_matches("0x"), 16) {
                            info.ssrc = Some(ssrc);
                        }
                    }
                    "mode" => {
                        info.mode = Some(value.trim_matches('"').to_string());
                    }
                    _ => {
                        info.extra_params.insert(key.to_string(), Some(value.to_string()));
                    }
                }
            } else if !part.is_empty() {
                info.extra_params.insert(part.to_string(), None);
            }
        }

        Some(info)
    }

    /// Interleaved channel the server will send media on (0 when unspecified).
    pub fn data_channel(&self) -> u8 {
        self.interleaved.map(|(data, _)| data).unwrap_or(0)
    }
}
