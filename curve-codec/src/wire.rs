//! Shared command framing: every command on the wire — handshake and
//! MESSAGE alike — is a 1-byte length-prefixed ASCII name followed by a
//! command-specific body (spec §4.1, §6). Grounded on the teacher's
//! `parse_command` length-prefixed parsing loop, generalized from
//! properties to whole commands.

use bytes::{BufMut, Bytes, BytesMut};

pub const CMD_HELLO: &[u8] = b"HELLO";
pub const CMD_WELCOME: &[u8] = b"WELCOME";
pub const CMD_INITIATE: &[u8] = b"INITIATE";
pub const CMD_READY: &[u8] = b"READY";
pub const CMD_ERROR: &[u8] = b"ERROR";
pub const CMD_MESSAGE: &[u8] = b"MESSAGE";

/// Split a frame into its command name and body. Returns `None` on a
/// malformed length prefix; callers treat that as a silently discarded
/// input (spec §9 "sticky exception and silent discard").
#[must_use]
pub fn parse_command(frame: &[u8]) -> Option<(&[u8], &[u8])> {
    let len = usize::from(*frame.first()?);
    if frame.len() < 1 + len {
        return None;
    }
    Some((&frame[1..1 + len], &frame[1 + len..]))
}

#[must_use]
pub fn encode_command(name: &[u8], body: &[u8]) -> Bytes {
    let mut out = BytesMut::with_capacity(1 + name.len() + body.len());
    out.put_u8(name.len() as u8);
    out.put_slice(name);
    out.put_slice(body);
    out.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_truncated_name() {
        assert!(parse_command(&[5, b'H', b'I']).is_none());
    }

    #[test]
    fn round_trip() {
        let frame = encode_command(CMD_READY, b"body");
        let (name, body) = parse_command(&frame).unwrap();
        assert_eq!(name, CMD_READY);
        assert_eq!(body, b"body");
    }
}
