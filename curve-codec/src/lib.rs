//! # curve-codec
//!
//! **CurveZMQ (RFC 26) handshake and authenticated-encryption codec.**
//!
//! Implements the per-connection security engine described by RFC 26: an
//! authenticated Diffie–Hellman handshake (HELLO/WELCOME/INITIATE/READY)
//! followed by an authenticated, encrypted message channel, with an
//! optional synchronous ZAP (RFC 27) authorization step on the server side.
//!
//! This crate is sans-I/O: it never opens a socket or owns a transport. The
//! caller feeds it inbound frames and sends the frames it produces over
//! whatever reliable, message-oriented transport it already has.
//!
//! ```rust,ignore
//! use curve_codec::prelude::*;
//!
//! let server_cert = CurveCert::generate();
//! let server_pk = *server_cert.public_key().as_bytes();
//! let mut client = CurveCodec::new_client(CurveCert::generate(), server_pk);
//! let mut server = CurveCodec::new_server(server_cert, None);
//!
//! let hello = client.execute(None).unwrap();
//! let welcome = server.execute(Some(&hello)).unwrap();
//! let initiate = client.execute(Some(&welcome)).unwrap();
//! let ready = server.execute(Some(&initiate)).unwrap();
//! assert!(client.execute(Some(&ready)).is_none());
//! assert!(client.connected() && server.connected());
//! ```

#![deny(unsafe_code)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]

pub mod cert;
pub mod codec;
pub mod crypto;
pub mod error;
pub mod handshake;
pub mod message;
pub mod metadata;
pub mod wire;
pub mod zap;
pub mod zap_auth;

/// Prelude module for convenient imports
///
/// ```rust,ignore
/// use curve_codec::prelude::*;
/// ```
pub mod prelude {
    pub use crate::cert::CurveCert;
    pub use crate::codec::CurveCodec;
    pub use crate::error::{CurveError, Result};
    pub use crate::handshake::{Handshake, Outcome, State};
    pub use crate::message::MessageChannel;
    pub use crate::metadata::Metadata;
    pub use crate::zap::{ZapMechanism, ZapRequest, ZapResponse, ZapStatus};
    pub use crate::zap_auth::{AllowAllAuthenticator, DenyAllAuthenticator, ZapAuthenticator};
    pub use curve_core::config::CodecConfig;
}
