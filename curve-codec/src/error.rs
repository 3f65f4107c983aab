//! Error kinds for the CURVE codec (§7 of the handshake spec).
//!
//! These are used internally by the handshake/message state machines with
//! `?`; the public façade (`CurveCodec`) never surfaces a `Result` — per
//! §6/§7 it collapses every variant here into the sticky exception flag and
//! an absent reply, the way the teacher's async handshake functions use
//! `ZmtpError` internally while the socket layer above them turns failures
//! into connection teardown rather than propagating a typed error to the
//! application.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CurveError {
    // --- (a) Protocol violation ---
    #[error("unexpected command {got:?} in state {state}")]
    UnexpectedCommand { state: &'static str, got: String },

    #[error("malformed {0} frame")]
    MalformedFrame(&'static str),

    #[error("HELLO anti-amplification padding was not all zero")]
    NonZeroPadding,

    // --- (b) Cryptographic failure ---
    #[error("failed to open {0}")]
    OpenFailed(&'static str),

    #[error("HELLO proof did not decrypt to 64 zero bytes")]
    HelloProofMismatch,

    #[error("vouch does not bind the claimed short-term key")]
    VouchMismatch,

    #[error("MESSAGE nonce did not strictly increase for this direction")]
    NonceReplay,

    #[error("cookie does not match the short-term key on this channel")]
    CookieMismatch,

    // --- (c) Authorization failure ---
    #[error("ZAP authentication denied: {0}")]
    AuthorizationDenied(String),

    #[error("peer reported: {0}")]
    PeerReportedError(String),

    // --- (d) Resource exhaustion ---
    #[error("nonce counter would overflow")]
    NonceOverflow,

    #[error("metadata exceeds {limit} byte limit ({size} bytes)")]
    MetadataTooLarge { size: usize, limit: usize },

    // --- (e) Configuration error ---
    //
    // A missing permanent credential or missing pinned server key (both
    // named in the spec's error taxonomy) are made structurally impossible
    // here: `new_client`/`new_server` take them as mandatory constructor
    // arguments rather than optional fields checked at first use. The one
    // configuration error that remains reachable is calling a setter after
    // the handshake has already started.
    #[error("metadata can only be set before the handshake starts")]
    HandshakeAlreadyStarted,
}

pub type Result<T> = std::result::Result<T, CurveError>;
