//! ZeroMQ Authentication Protocol request/reply types (RFC 27), used by the
//! server handshake path to authorize a client's permanent public key
//! (spec §6 "ZAP request/reply").
//!
//! Carried over near-verbatim from the teacher's ZAP module; this crate
//! only ever constructs a `ZapMechanism::Curve` request; the other
//! variants are kept because the wire format itself is mechanism-agnostic
//! (RFC 27 does not gate on it).

use bytes::Bytes;
use std::collections::HashMap;

pub const ZAP_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZapMechanism {
    Null,
    Plain,
    Curve,
}

impl ZapMechanism {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Plain => "PLAIN",
            Self::Curve => "CURVE",
        }
    }

    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "NULL" => Some(Self::Null),
            "PLAIN" => Some(Self::Plain),
            "CURVE" => Some(Self::Curve),
            _ => None,
        }
    }
}

/// ZAP status code. Any value other than `Success` is authentication
/// failure (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZapStatus {
    Success = 200,
    TemporaryError = 300,
    Failure = 400,
    InternalError = 500,
}

impl ZapStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "200",
            Self::TemporaryError => "300",
            Self::Failure => "400",
            Self::InternalError => "500",
        }
    }

    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "200" => Some(Self::Success),
            "300" => Some(Self::TemporaryError),
            "400" => Some(Self::Failure),
            "500" => Some(Self::InternalError),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

#[derive(Debug, Clone)]
pub struct ZapRequest {
    pub version: String,
    pub request_id: String,
    pub domain: String,
    pub address: String,
    pub identity: Bytes,
    pub mechanism: ZapMechanism,
    pub credentials: Vec<Bytes>,
}

impl ZapRequest {
    pub fn new(
        request_id: impl Into<String>,
        domain: impl Into<String>,
        address: impl Into<String>,
        identity: Bytes,
        mechanism: ZapMechanism,
        credentials: Vec<Bytes>,
    ) -> Self {
        Self {
            version: ZAP_VERSION.to_string(),
            request_id: request_id.into(),
            domain: domain.into(),
            address: address.into(),
            identity,
            mechanism,
            credentials,
        }
    }

    /// Build the request this crate actually sends: a single CURVE
    /// credential holding the client's raw permanent public key.
    #[must_use]
    pub fn for_curve_client(
        request_id: impl Into<String>,
        domain: impl Into<String>,
        address: impl Into<String>,
        client_public_key: &[u8; 32],
    ) -> Self {
        Self::new(
            request_id,
            domain,
            address,
            Bytes::new(),
            ZapMechanism::Curve,
            vec![Bytes::copy_from_slice(client_public_key)],
        )
    }

    #[must_use]
    pub fn encode(&self) -> Vec<Bytes> {
        let mut frames = vec![
            Bytes::from(self.version.clone()),
            Bytes::from(self.request_id.clone()),
            Bytes::from(self.domain.clone()),
            Bytes::from(self.address.clone()),
            self.identity.clone(),
            Bytes::from(self.mechanism.as_str()),
        ];
        frames.extend(self.credentials.clone());
        frames
    }

    pub fn decode(frames: &[Bytes]) -> Result<Self, String> {
        if frames.len() < 6 {
            return Err("ZAP request requires at least 6 frames".to_string());
        }

        let version =
            String::from_utf8(frames[0].to_vec()).map_err(|_| "invalid version string")?;
        let request_id =
            String::from_utf8(frames[1].to_vec()).map_err(|_| "invalid request id")?;
        let domain = String::from_utf8(frames[2].to_vec()).map_err(|_| "invalid domain string")?;
        let address =
            String::from_utf8(frames[3].to_vec()).map_err(|_| "invalid address string")?;
        let identity = frames[4].clone();

        let mechanism_str =
            String::from_utf8(frames[5].to_vec()).map_err(|_| "invalid mechanism string")?;
        let mechanism = ZapMechanism::from_str(&mechanism_str).ok_or("unknown mechanism")?;

        let credentials = frames[6..].to_vec();

        Ok(Self {
            version,
            request_id,
            domain,
            address,
            identity,
            mechanism,
            credentials,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ZapResponse {
    pub version: String,
    pub request_id: String,
    pub status_code: ZapStatus,
    pub status_text: String,
    pub user_id: String,
    pub metadata: HashMap<String, String>,
}

impl ZapResponse {
    #[must_use]
    pub fn success(request_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            version: ZAP_VERSION.to_string(),
            request_id: request_id.into(),
            status_code: ZapStatus::Success,
            status_text: "OK".to_string(),
            user_id: user_id.into(),
            metadata: HashMap::new(),
        }
    }

    #[must_use]
    pub fn failure(request_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            version: ZAP_VERSION.to_string(),
            request_id: request_id.into(),
            status_code: ZapStatus::Failure,
            status_text: reason.into(),
            user_id: String::new(),
            metadata: HashMap::new(),
        }
    }

    #[must_use]
    pub fn encode(&self) -> Vec<Bytes> {
        let metadata_bytes = if self.metadata.is_empty() {
            Bytes::new()
        } else {
            let mut buf = Vec::new();
            for (key, value) in &self.metadata {
                buf.push(key.len() as u8);
                buf.extend_from_slice(key.as_bytes());
                buf.extend_from_slice(&(value.len() as u32).to_be_bytes());
                buf.extend_from_slice(value.as_bytes());
            }
            Bytes::from(buf)
        };

        vec![
            Bytes::from(self.version.clone()),
            Bytes::from(self.request_id.clone()),
            Bytes::from(self.status_code.as_str()),
            Bytes::from(self.status_text.clone()),
            Bytes::from(self.user_id.clone()),
            metadata_bytes,
        ]
    }

    pub fn decode(frames: &[Bytes]) -> Result<Self, String> {
        if frames.len() != 6 {
            return Err(format!("ZAP response requires 6 frames, got {}", frames.len()));
        }

        let version =
            String::from_utf8(frames[0].to_vec()).map_err(|_| "invalid version string")?;
        let request_id =
            String::from_utf8(frames[1].to_vec()).map_err(|_| "invalid request id")?;

        let status_str =
            String::from_utf8(frames[2].to_vec()).map_err(|_| "invalid status code")?;
        let status_code = ZapStatus::from_str(&status_str).ok_or("unknown status code")?;

        let status_text =
            String::from_utf8(frames[3].to_vec()).map_err(|_| "invalid status text")?;
        let user_id = String::from_utf8(frames[4].to_vec()).map_err(|_| "invalid user id")?;
        let metadata = Self::parse_metadata(&frames[5])?;

        Ok(Self {
            version,
            request_id,
            status_code,
            status_text,
            user_id,
            metadata,
        })
    }

    fn parse_metadata(data: &Bytes) -> Result<HashMap<String, String>, String> {
        let mut metadata = HashMap::new();
        let mut cursor = 0;
        while cursor < data.len() {
            let key_len = data[cursor] as usize;
            cursor += 1;
            if cursor + key_len > data.len() {
                return Err("metadata key out of bounds".to_string());
            }
            let key =
                String::from_utf8(data[cursor..cursor + key_len].to_vec()).map_err(|_| "invalid metadata key")?;
            cursor += key_len;

            if cursor + 4 > data.len() {
                return Err("metadata value length out of bounds".to_string());
            }
            let value_len = u32::from_be_bytes([
                data[cursor],
                data[cursor + 1],
                data[cursor + 2],
                data[cursor + 3],
            ]) as usize;
            cursor += 4;

            if cursor + value_len > data.len() {
                return Err("metadata value out of bounds".to_string());
            }
            let value = String::from_utf8(data[cursor..cursor + value_len].to_vec())
                .map_err(|_| "invalid metadata value")?;
            cursor += value_len;

            metadata.insert(key, value);
        }
        Ok(metadata)
    }
}
