//! Wire-format size constants and configurable limits shared across the
//! handshake, metadata, and message codecs.
//!
//! Mirrors the role of `monocoque_core::config`'s buffer-sizing knobs, but
//! for CurveZMQ's fixed field widths and the one limit the RFC leaves to the
//! implementation (metadata size).

/// Size of a CURVE public or secret key, in bytes.
pub const KEY_SIZE: usize = 32;

/// Size of the fully-expanded crypto nonce (label + short nonce), in bytes.
pub const NONCE_SIZE: usize = 24;

/// Poly1305 authentication tag length appended by `seal`.
pub const BOX_OVERHEAD: usize = 16;

/// Length of the short nonce paired with a 16-byte label (HELLO, INITIATE,
/// READY) — `label.len() + short_nonce.len()` is always `NONCE_SIZE`.
pub const SHORT_NONCE_FOR_16BYTE_LABEL: usize = 8;

/// Length of the short nonce paired with an 8-byte label (WELCOME, COOKIE,
/// VOUCH).
pub const SHORT_NONCE_FOR_8BYTE_LABEL: usize = 16;

/// Length of the short nonce transmitted on the wire for MESSAGE commands.
/// Numerically the same as `SHORT_NONCE_FOR_16BYTE_LABEL` (MESSAGE's label
/// is also 16 bytes) but named separately: MESSAGE's nonce is a monotonic
/// counter, not a one-shot random value.
pub const MESSAGE_SHORT_NONCE_SIZE: usize = 8;

/// Default cap on the total encoded size of a metadata property list
/// embedded in INITIATE or READY (§9 "Metadata size limit": no explicit cap
/// is specified upstream, so implementations must impose one).
pub const DEFAULT_METADATA_LIMIT: usize = 64 * 1024;

/// Per-name/value-record limits implied by the 1-byte name length and
/// 4-byte (29-bit) value length fields in the metadata wire format. The
/// value length is permitted to be `0..=2^29` inclusive, so the bound is
/// `1 << 29`, not `(1 << 29) - 1`.
pub const MAX_METADATA_NAME_LEN: usize = 255;
pub const MAX_METADATA_VALUE_LEN: usize = 1 << 29;
