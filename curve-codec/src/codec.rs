//! `CurveCodec`: the thin outer façade named in the external interface list
//! (§6) — `new_client`/`new_server`/`destroy`/`set_permakey`/`set_metadata`/
//! `set_verbose`/`execute`/`encode`/`decode`/`connected`/`exception`/
//! `metadata` — dispatching to the handshake state machine until `execute`
//! reports a connected outcome, then to the message channel.
//!
//! Grounded on the division of labor between the teacher's `Mechanism`
//! trait (handshake-only, `on_inbound`/`next_outbound`/`is_done`) and the
//! session layer that takes over once `is_done()` — this type folds both
//! sides into one value since CURVE's handshake and message phases share a
//! single derived key (`K_TT`) rather than handing off to an unrelated
//! transport abstraction.

use bytes::Bytes;

use curve_core::config::CodecConfig;
use curve_core::limits::KEY_SIZE;

use crate::cert::CurveCert;
use crate::error::Result;
use crate::handshake::Handshake;
use crate::message::MessageChannel;
use crate::metadata::Metadata;
use crate::zap_auth::ZapAuthenticator;

/// Per-connection CURVE security engine: handshake, then encrypted message
/// channel, over a caller-supplied transport this crate never touches.
pub struct CurveCodec {
    handshake: Handshake,
    channel: Option<MessageChannel>,
    /// Set when `encode`/`decode` hits a post-handshake failure (nonce
    /// overflow, tampered MESSAGE). The handshake's own sticky flag only
    /// covers the handshake phase, so this extends the same "every call a
    /// no-op from here on" policy (§9) into the message phase.
    post_connect_exception: bool,
    verbose: bool,
}

impl CurveCodec {
    /// `new_client(permanent_cert, server_public_key) -> codec` (§6). The
    /// server's pinned public key is a mandatory argument rather than an
    /// optional field checked at use: a client with no pinned key is not a
    /// state this type can represent, which eliminates the `MissingServerPublicKey`
    /// configuration error named in §7.
    #[must_use]
    pub fn new_client(cert: CurveCert, server_public_key: [u8; KEY_SIZE]) -> Self {
        Self::new_client_with_config(cert, server_public_key, CodecConfig::default())
    }

    #[must_use]
    pub fn new_client_with_config(
        cert: CurveCert,
        server_public_key: [u8; KEY_SIZE],
        config: CodecConfig,
    ) -> Self {
        Self {
            handshake: Handshake::new_client(cert, server_public_key, config),
            channel: None,
            post_connect_exception: false,
            verbose: false,
        }
    }

    /// `new_server(permanent_cert, zap_authenticator?) -> codec` (§6). ZAP
    /// is optional (§3 "absence disables ZAP"); when present, pairs an
    /// authenticator with the ZAP domain it authenticates under.
    #[must_use]
    pub fn new_server(
        cert: CurveCert,
        zap: Option<(Box<dyn ZapAuthenticator>, String)>,
    ) -> Self {
        Self::new_server_with_config(cert, zap, CodecConfig::default())
    }

    #[must_use]
    pub fn new_server_with_config(
        cert: CurveCert,
        zap: Option<(Box<dyn ZapAuthenticator>, String)>,
        config: CodecConfig,
    ) -> Self {
        Self {
            handshake: Handshake::new_server(cert, zap, config),
            channel: None,
            post_connect_exception: false,
            verbose: false,
        }
    }

    /// `destroy(codec)` (§6). Credentials and derived keys are zeroized by
    /// `Drop` on their own types; this exists only to give callers an
    /// explicit, named place to drop the instance rather than relying on
    /// scope exit.
    pub fn destroy(self) {
        drop(self);
    }

    /// `set_permakey(codec, cert)` (§6, §9 "pre-handshake only"). Replaces
    /// the permanent credential; rejected once the handshake has started so
    /// a mid-handshake swap can never silently change the identity being
    /// vouched for.
    pub fn set_permakey(&mut self, cert: CurveCert) -> Result<()> {
        self.handshake.replace_cert(cert)
    }

    /// `set_metadata(codec, name, value)` (§6). Also pre-handshake only —
    /// metadata is sealed into INITIATE/READY at handshake time, so a
    /// change after that point would never be observed by the peer.
    pub fn set_metadata(&mut self, name: &str, value: impl Into<Bytes>) -> Result<()> {
        self.handshake.set_metadata(name, value)
    }

    /// `set_verbose(codec, bool)` (§6). Toggles the detail level of this
    /// instance's own trace events; does not affect `tracing`'s global
    /// filter, which remains the caller's to configure.
    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    /// Drive the handshake with an inbound frame (`None` kicks off the
    /// client's HELLO). Returns the frame to send, if any. Once the
    /// handshake reaches `Connected` the derived message channel takes
    /// over and subsequent `execute` calls are no-ops — callers switch to
    /// `encode`/`decode` (§6).
    pub fn execute(&mut self, input: Option<&[u8]>) -> Option<Bytes> {
        if self.channel.is_some() {
            return None;
        }
        let outcome = self.handshake.execute(input);
        if let Some(channel) = outcome.message_channel {
            if self.verbose {
                tracing::debug!("handshake complete, message channel active");
            }
            self.channel = Some(channel);
        }
        outcome.reply
    }

    /// `encode(codec, plaintext, more) -> frame` (§6, §4.4). `None` once
    /// the channel isn't connected yet or has gone fatal.
    pub fn encode(&mut self, plaintext: &[u8], more: bool) -> Option<Bytes> {
        if self.post_connect_exception {
            return None;
        }
        let channel = self.channel.as_mut()?;
        match channel.encode(plaintext, more) {
            Ok(frame) => Some(frame),
            Err(err) => {
                tracing::warn!(%err, "message encode failed, going fatal");
                self.post_connect_exception = true;
                None
            }
        }
    }

    /// `decode(codec, frame) -> (plaintext, more)` (§6, §4.4).
    pub fn decode(&mut self, frame: &[u8]) -> Option<(Bytes, bool)> {
        if self.post_connect_exception {
            return None;
        }
        let channel = self.channel.as_mut()?;
        match channel.decode(frame) {
            Ok(result) => Some(result),
            Err(err) => {
                tracing::warn!(%err, "message decode failed, going fatal");
                self.post_connect_exception = true;
                None
            }
        }
    }

    /// `connected(codec) -> bool` (§6).
    #[must_use]
    pub fn connected(&self) -> bool {
        self.channel.is_some()
    }

    /// `exception(codec) -> bool` (§6, §9 "sticky exception flag").
    #[must_use]
    pub fn exception(&self) -> bool {
        self.handshake.has_exception() || self.post_connect_exception
    }

    /// `metadata(codec) -> peer properties` (§6). Only populated once
    /// `connected()` (§3 "peer-metadata visibility").
    #[must_use]
    pub fn metadata(&self) -> Option<&Metadata> {
        self.handshake.peer_metadata()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zap_auth::{AllowAllAuthenticator, DenyAllAuthenticator};

    fn run_handshake(client: &mut CurveCodec, server: &mut CurveCodec) {
        let hello = client.execute(None).expect("client emits HELLO");
        let welcome = server.execute(Some(&hello)).expect("server emits WELCOME");
        let initiate = client.execute(Some(&welcome)).expect("client emits INITIATE");
        let ready = server.execute(Some(&initiate)).expect("server emits READY");
        assert!(client.execute(Some(&ready)).is_none());
    }

    #[test]
    fn clean_handshake_connects_both_sides_and_exchanges_messages() {
        let server_cert = CurveCert::generate();
        let server_pk = *server_cert.public_key().as_bytes();
        let mut client = CurveCodec::new_client(CurveCert::generate(), server_pk);
        let mut server = CurveCodec::new_server(server_cert, None);

        run_handshake(&mut client, &mut server);
        assert!(client.connected());
        assert!(server.connected());
        assert!(!client.exception());
        assert!(!server.exception());

        let frame = client.encode(b"ping", false).unwrap();
        let (plaintext, more) = server.decode(&frame).unwrap();
        assert_eq!(plaintext, Bytes::from_static(b"ping"));
        assert!(!more);
    }

    #[test]
    fn wrong_pinned_server_key_fails_the_handshake() {
        let real_server_cert = CurveCert::generate();
        let impostor_pk = *CurveCert::generate().public_key().as_bytes();
        let mut client = CurveCodec::new_client(CurveCert::generate(), impostor_pk);
        let mut server = CurveCodec::new_server(real_server_cert, None);

        // The client seals its HELLO proof under precompute(impostor_pk,
        // client_transient_sk). The server can only open it with
        // precompute(client_transient_pk, server_real_sk) — a different key
        // by construction, so the server's own HELLO handling fails and it
        // replies with ERROR instead of WELCOME (§7 "server ERRORs and
        // kills the handshake").
        let hello = client.execute(None).unwrap();
        let reply = server.execute(Some(&hello)).unwrap();
        assert!(server.exception());

        assert!(client.execute(Some(&reply)).is_none());
        assert!(client.exception());
    }

    #[test]
    fn zap_denial_fails_handshake_on_server_with_error_reply() {
        let server_cert = CurveCert::generate();
        let server_pk = *server_cert.public_key().as_bytes();
        let mut client = CurveCodec::new_client(CurveCert::generate(), server_pk);
        let deny: Box<dyn ZapAuthenticator> = Box::new(DenyAllAuthenticator {
            reason: "not on allowlist".to_string(),
        });
        let mut server = CurveCodec::new_server(server_cert, Some((deny, "global".to_string())));

        let hello = client.execute(None).unwrap();
        let welcome = server.execute(Some(&hello)).unwrap();
        let initiate = client.execute(Some(&welcome)).unwrap();
        let error_reply = server.execute(Some(&initiate));
        assert!(error_reply.is_some());
        assert!(server.exception());

        assert!(client.execute(Some(&error_reply.unwrap())).is_none());
        assert!(client.exception());
    }

    #[test]
    fn zap_allow_all_connects() {
        let server_cert = CurveCert::generate();
        let server_pk = *server_cert.public_key().as_bytes();
        let mut client = CurveCodec::new_client(CurveCert::generate(), server_pk);
        let allow: Box<dyn ZapAuthenticator> = Box::new(AllowAllAuthenticator);
        let mut server = CurveCodec::new_server(server_cert, Some((allow, "global".to_string())));

        run_handshake(&mut client, &mut server);
        assert!(client.connected());
        assert!(server.connected());
    }

    #[test]
    fn set_permakey_rejected_after_handshake_starts() {
        let server_cert = CurveCert::generate();
        let server_pk = *server_cert.public_key().as_bytes();
        let mut client = CurveCodec::new_client(CurveCert::generate(), server_pk);
        client.execute(None);
        assert!(client.set_permakey(CurveCert::generate()).is_err());
    }

    #[test]
    fn metadata_is_none_until_connected() {
        let server_cert = CurveCert::generate();
        let server_pk = *server_cert.public_key().as_bytes();
        let mut client = CurveCodec::new_client(CurveCert::generate(), server_pk);
        let mut server = CurveCodec::new_server(server_cert, None);
        assert!(client.metadata().is_none());

        run_handshake(&mut client, &mut server);
        assert!(client.metadata().is_some());
        assert!(server.metadata().is_some());
    }
}
