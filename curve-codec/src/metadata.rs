//! Name/value property list embedded in INITIATE and READY (spec §4.3).
//!
//! Wire layout per record: 1-byte name length, name bytes, 4-byte
//! big-endian value length, value bytes. Grounded on the teacher's
//! `parse_command`/`ZmtpProp` loop (length-prefixed name/value pairs), with
//! names always lowercased on parse and a last-occurrence-wins merge, and a
//! total-size cap this crate enforces rather than the RFC (which leaves it
//! unspecified).

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::collections::HashMap;

use curve_core::limits::{DEFAULT_METADATA_LIMIT, MAX_METADATA_NAME_LEN, MAX_METADATA_VALUE_LEN};

use crate::error::{CurveError, Result};

/// A parsed or pending property list. Names are always lowercase ASCII;
/// values are arbitrary bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    entries: HashMap<String, Bytes>,
}

impl Metadata {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a property. Name is lowercased; a prior value under the same
    /// name (case-insensitively) is overwritten — last-occurrence-wins
    /// applies equally to repeated `set` calls and to repeated records on
    /// the wire.
    pub fn set(&mut self, name: impl AsRef<str>, value: impl Into<Bytes>) {
        self.entries.insert(name.as_ref().to_ascii_lowercase(), value.into());
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Bytes> {
        self.entries.get(&name.to_ascii_lowercase())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Bytes)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    /// Serialize to the wire layout, bounded by `DEFAULT_METADATA_LIMIT`.
    pub fn encode(&self) -> Result<Bytes> {
        self.encode_with_limit(DEFAULT_METADATA_LIMIT)
    }

    /// Serialize to the wire layout, bounded by a caller-supplied limit
    /// (`CodecConfig::metadata_limit`).
    pub fn encode_with_limit(&self, limit: usize) -> Result<Bytes> {
        let mut out = BytesMut::new();
        for (name, value) in &self.entries {
            let name_len = name.len();
            if name_len == 0 || name_len > MAX_METADATA_NAME_LEN {
                return Err(CurveError::MalformedFrame("metadata name length"));
            }
            if value.len() > MAX_METADATA_VALUE_LEN {
                return Err(CurveError::MetadataTooLarge {
                    size: value.len(),
                    limit: MAX_METADATA_VALUE_LEN,
                });
            }
            out.put_u8(name_len as u8);
            out.put_slice(name.as_bytes());
            out.put_u32(value.len() as u32);
            out.put_slice(value);
        }
        if out.len() > limit {
            return Err(CurveError::MetadataTooLarge {
                size: out.len(),
                limit,
            });
        }
        Ok(out.freeze())
    }

    /// Parse the wire layout until the buffer is exhausted. Last occurrence
    /// of a name wins.
    pub fn decode(buf: Bytes) -> Result<Self> {
        Self::decode_with_limit(buf, DEFAULT_METADATA_LIMIT)
    }

    /// Parse the wire layout, bounded by a caller-supplied limit
    /// (`CodecConfig::metadata_limit`).
    pub fn decode_with_limit(mut buf: Bytes, limit: usize) -> Result<Self> {
        if buf.len() > limit {
            return Err(CurveError::MetadataTooLarge {
                size: buf.len(),
                limit,
            });
        }
        let mut entries = HashMap::new();
        while buf.has_remaining() {
            if buf.remaining() < 1 {
                return Err(CurveError::MalformedFrame("metadata name length"));
            }
            let name_len = buf.get_u8() as usize;
            if name_len == 0 || buf.remaining() < name_len + 4 {
                return Err(CurveError::MalformedFrame("metadata record"));
            }
            let name_bytes = buf.copy_to_bytes(name_len);
            let name = String::from_utf8_lossy(&name_bytes).to_ascii_lowercase();
            let value_len = buf.get_u32() as usize;
            if value_len > MAX_METADATA_VALUE_LEN || buf.remaining() < value_len {
                return Err(CurveError::MalformedFrame("metadata value length"));
            }
            let value = buf.copy_to_bytes(value_len);
            entries.insert(name, value);
        }
        Ok(Self { entries })
    }
}
