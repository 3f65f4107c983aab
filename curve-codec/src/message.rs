//! Post-handshake MESSAGE encode/decode (spec §4.4).
//!
//! Grounded on the teacher's `encrypt_message`/`decrypt_message` pair in
//! the CURVE module, but with the nonce check made strict (the teacher's
//! version had none at all) and the directional labels picked by role
//! rather than hardcoded per client/server struct.

use bytes::Bytes;

use curve_core::limits::MESSAGE_SHORT_NONCE_SIZE;

use crate::crypto::{self, Label, SharedSecret, LABEL_MESSAGE_CLIENT, LABEL_MESSAGE_SERVER};
use crate::error::{CurveError, Result};
use crate::wire;

const FLAG_MORE: u8 = 0b0000_0001;

/// Per-connection MESSAGE encryption state, active once `K_TT` is known.
/// Not safe for concurrent use (spec §5); the caller serializes `encode`
/// calls in send order and `decode` calls in receive order.
pub struct MessageChannel {
    key: SharedSecret,
    is_client: bool,
    nonce_tx: u64,
    nonce_rx: u64,
}

impl MessageChannel {
    #[must_use]
    pub const fn new(key: SharedSecret, is_client: bool) -> Self {
        Self {
            key,
            is_client,
            nonce_tx: 1,
            nonce_rx: 1,
        }
    }

    fn own_label(&self) -> Label {
        if self.is_client {
            LABEL_MESSAGE_CLIENT
        } else {
            LABEL_MESSAGE_SERVER
        }
    }

    fn peer_label(&self) -> Label {
        if self.is_client {
            LABEL_MESSAGE_SERVER
        } else {
            LABEL_MESSAGE_CLIENT
        }
    }

    /// `encode(plaintext, more_flag)` (spec §4.4).
    pub fn encode(&mut self, plaintext: &[u8], more: bool) -> Result<Bytes> {
        if self.nonce_tx == u64::MAX {
            return Err(CurveError::NonceOverflow);
        }
        let mut inner = Vec::with_capacity(1 + plaintext.len());
        inner.push(if more { FLAG_MORE } else { 0 });
        inner.extend_from_slice(plaintext);

        let short_nonce = self.nonce_tx.to_be_bytes();
        let ciphertext = crypto::seal(&self.key, self.own_label(), &short_nonce, &inner);
        self.nonce_tx += 1;

        let mut body = Vec::with_capacity(short_nonce.len() + ciphertext.len());
        body.extend_from_slice(&short_nonce);
        body.extend_from_slice(&ciphertext);
        Ok(wire::encode_command(wire::CMD_MESSAGE, &body))
    }

    /// `decode(frame)` (spec §4.4). Rejects reordered or replayed frames by
    /// the strict-increase rule before attempting to open the box.
    pub fn decode(&mut self, frame: &[u8]) -> Result<(Bytes, bool)> {
        let (name, body) =
            wire::parse_command(frame).ok_or(CurveError::MalformedFrame("MESSAGE"))?;
        if name != wire::CMD_MESSAGE {
            return Err(CurveError::UnexpectedCommand {
                state: "connected",
                got: String::from_utf8_lossy(name).into_owned(),
            });
        }
        if body.len() < MESSAGE_SHORT_NONCE_SIZE {
            return Err(CurveError::MalformedFrame("MESSAGE"));
        }
        let (short_nonce, ciphertext) = body.split_at(MESSAGE_SHORT_NONCE_SIZE);
        let counter = u64::from_be_bytes(
            short_nonce
                .try_into()
                .map_err(|_| CurveError::MalformedFrame("MESSAGE nonce"))?,
        );
        if counter < self.nonce_rx {
            return Err(CurveError::NonceReplay);
        }

        let mut plaintext = crypto::open(&self.key, self.peer_label(), short_nonce, ciphertext)?;
        if plaintext.is_empty() {
            return Err(CurveError::MalformedFrame("MESSAGE"));
        }
        self.nonce_rx = counter
            .checked_add(1)
            .ok_or(CurveError::NonceOverflow)?;

        let flags = plaintext.remove(0);
        Ok((Bytes::from(plaintext), flags & FLAG_MORE != 0))
    }
}
