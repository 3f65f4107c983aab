//! The handshake state machine (spec §4.1): HELLO → WELCOME → INITIATE →
//! READY, with a cookie that keeps the server stateless between HELLO and
//! INITIATE and a vouch that binds the session's transient key to the
//! client's permanent identity.
//!
//! Conceptually grounded on the teacher's synchronous `Mechanism` trait
//! (`mechanism/null.rs`) for the shape of a state machine driven by
//! `on_inbound`/`next_outbound` rather than `async fn` over a stream; the
//! cryptographic operations are grounded on `security/curve.rs`, but every
//! box in this module is real (the teacher's HELLO signature, WELCOME
//! cookie, and INITIATE vouch were all-zero placeholders).

use bytes::Bytes;

use curve_core::config::CodecConfig;
use curve_core::limits::{KEY_SIZE, SHORT_NONCE_FOR_16BYTE_LABEL, SHORT_NONCE_FOR_8BYTE_LABEL};

use crate::cert::CurveCert;
use crate::crypto::{
    self, constant_time_eq, random_bytes, KeyPair, PublicKeyBytes, SecretKeyBytes, SharedSecret,
    LABEL_COOKIE, LABEL_HELLO, LABEL_INITIATE, LABEL_READY, LABEL_VOUCH, LABEL_WELCOME,
};
use crate::error::{CurveError, Result};
use crate::message::MessageChannel;
use crate::metadata::Metadata;
use crate::wire::{self, CMD_ERROR, CMD_HELLO, CMD_INITIATE, CMD_READY, CMD_WELCOME};
use crate::zap::ZapRequest;
use crate::zap_auth::ZapAuthenticator;

const ZERO_PADDING_LEN: usize = 72;
const HELLO_PROOF_LEN: usize = 64;
const HELLO_SHORT_NONCE_LEN: usize = SHORT_NONCE_FOR_16BYTE_LABEL;
const HANDSHAKE_LONG_NONCE_LEN: usize = SHORT_NONCE_FOR_8BYTE_LABEL;
const INITIATE_SHORT_NONCE_LEN: usize = SHORT_NONCE_FOR_16BYTE_LABEL;
const READY_SHORT_NONCE_LEN: usize = SHORT_NONCE_FOR_16BYTE_LABEL;
const COOKIE_LEN: usize = HANDSHAKE_LONG_NONCE_LEN + KEY_SIZE * 2 + 16; // nonce + box(pk+sk)+tag

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Client only: next `execute` emits HELLO.
    SendHelloPending,
    /// Server only: waiting for HELLO.
    ExpectHello,
    ExpectWelcome,
    ExpectInitiate,
    ExpectReady,
    Connected,
    ExpectNothing,
}

/// Outcome of feeding a handshake frame through `execute`.
pub struct Outcome {
    pub reply: Option<Bytes>,
    /// Populated the instant the handshake reaches `Connected`.
    pub message_channel: Option<MessageChannel>,
}

impl Outcome {
    const fn reply_only(reply: Option<Bytes>) -> Self {
        Self {
            reply,
            message_channel: None,
        }
    }
}

pub struct Handshake {
    is_client: bool,
    state: State,
    cert: CurveCert,
    /// Client only: this connection's transient key pair, generated at
    /// construction and held for the lifetime of the handshake. The
    /// server's transient key pair is never stored on `self` — it lives
    /// only inside the cookie between HELLO and INITIATE, which is the
    /// entire point of the cookie (spec §9 "stateless server").
    transient: Option<KeyPair>,
    /// Server's pinned public key (client) or the client's permanent
    /// public key learned from INITIATE (server).
    peer_permanent_pk: Option<PublicKeyBytes>,
    peer_transient_pk: Option<PublicKeyBytes>,
    cookie_key: Option<SharedSecret>,
    local_metadata: Metadata,
    peer_metadata: Metadata,
    zap: Option<Box<dyn ZapAuthenticator>>,
    zap_domain: String,
    config: CodecConfig,
    exception: bool,
}

impl Handshake {
    #[must_use]
    pub fn new_client(cert: CurveCert, server_public_key: [u8; KEY_SIZE], config: CodecConfig) -> Self {
        Self {
            is_client: true,
            state: State::SendHelloPending,
            cert,
            transient: Some(KeyPair::generate()),
            peer_permanent_pk: Some(PublicKeyBytes::from_bytes(server_public_key)),
            peer_transient_pk: None,
            cookie_key: None,
            local_metadata: Metadata::new(),
            peer_metadata: Metadata::new(),
            zap: None,
            zap_domain: String::new(),
            config,
            exception: false,
        }
    }

    #[must_use]
    pub fn new_server(
        cert: CurveCert,
        zap: Option<(Box<dyn ZapAuthenticator>, String)>,
        config: CodecConfig,
    ) -> Self {
        let (zap, zap_domain) = match zap {
            Some((auth, domain)) => (Some(auth), domain),
            None => (None, String::new()),
        };
        Self {
            is_client: false,
            state: State::ExpectHello,
            cert,
            transient: None,
            peer_permanent_pk: None,
            peer_transient_pk: None,
            cookie_key: None,
            local_metadata: Metadata::new(),
            peer_metadata: Metadata::new(),
            zap,
            zap_domain,
            config,
            exception: false,
        }
    }

    #[must_use]
    pub const fn state(&self) -> State {
        self.state
    }

    #[must_use]
    pub const fn is_connected(&self) -> bool {
        matches!(self.state, State::Connected)
    }

    #[must_use]
    pub const fn has_exception(&self) -> bool {
        self.exception
    }

    #[must_use]
    pub const fn has_started(&self) -> bool {
        !matches!(self.state, State::SendHelloPending | State::ExpectHello)
    }

    /// Peer metadata, valid only while connected (spec §3).
    #[must_use]
    pub fn peer_metadata(&self) -> Option<&Metadata> {
        self.is_connected().then_some(&self.peer_metadata)
    }

    pub fn replace_cert(&mut self, cert: CurveCert) -> Result<()> {
        if self.has_started() {
            return Err(CurveError::HandshakeAlreadyStarted);
        }
        self.cert = cert;
        Ok(())
    }

    pub fn set_metadata(&mut self, name: &str, value: impl Into<Bytes>) -> Result<()> {
        if self.has_started() {
            return Err(CurveError::HandshakeAlreadyStarted);
        }
        self.local_metadata.set(name, value);
        Ok(())
    }

    /// Drive the state machine with an inbound frame (`None` is the
    /// client's initial kick). A sticky exception makes every call a no-op.
    pub fn execute(&mut self, input: Option<&[u8]>) -> Outcome {
        if self.exception || matches!(self.state, State::ExpectNothing) {
            return Outcome::reply_only(None);
        }
        let result = if self.is_client {
            self.execute_client(input)
        } else {
            self.execute_server(input)
        };
        match result {
            Ok(outcome) => outcome,
            Err(err) => self.fail(&err),
        }
    }

    fn fail(&mut self, err: &CurveError) -> Outcome {
        tracing::warn!(role = if self.is_client { "client" } else { "server" }, %err, "handshake deviation, going fatal");
        self.exception = true;
        let was_server = !self.is_client;
        self.state = State::ExpectNothing;
        let reply = was_server.then(|| encode_error(&err.to_string()));
        Outcome::reply_only(reply)
    }

    fn execute_client(&mut self, input: Option<&[u8]>) -> Result<Outcome> {
        match self.state {
            State::SendHelloPending => Ok(Outcome::reply_only(Some(self.build_hello()))),
            State::ExpectWelcome => {
                let frame = input.ok_or(CurveError::MalformedFrame("WELCOME"))?;
                if let Some(reason) = try_parse_error(frame) {
                    return Err(CurveError::PeerReportedError(reason));
                }
                let (name, body) =
                    wire::parse_command(frame).ok_or(CurveError::MalformedFrame("WELCOME"))?;
                if name != CMD_WELCOME {
                    return Err(unexpected("expect_welcome", name));
                }
                Ok(Outcome::reply_only(Some(self.handle_welcome(body)?)))
            }
            State::ExpectReady => {
                let frame = input.ok_or(CurveError::MalformedFrame("READY"))?;
                if let Some(reason) = try_parse_error(frame) {
                    return Err(CurveError::PeerReportedError(reason));
                }
                let (name, body) =
                    wire::parse_command(frame).ok_or(CurveError::MalformedFrame("READY"))?;
                if name != CMD_READY {
                    return Err(unexpected("expect_ready", name));
                }
                self.handle_ready(body)
            }
            State::Connected | State::ExpectNothing | State::ExpectHello | State::ExpectInitiate => {
                Ok(Outcome::reply_only(None))
            }
        }
    }

    fn execute_server(&mut self, input: Option<&[u8]>) -> Result<Outcome> {
        match self.state {
            State::ExpectHello => {
                let frame = input.ok_or(CurveError::MalformedFrame("HELLO"))?;
                let (name, body) =
                    wire::parse_command(frame).ok_or(CurveError::MalformedFrame("HELLO"))?;
                if name != CMD_HELLO {
                    return Err(unexpected("expect_hello", name));
                }
                Ok(Outcome::reply_only(Some(self.handle_hello(body)?)))
            }
            State::ExpectInitiate => {
                let frame = input.ok_or(CurveError::MalformedFrame("INITIATE"))?;
                let (name, body) =
                    wire::parse_command(frame).ok_or(CurveError::MalformedFrame("INITIATE"))?;
                if name != CMD_INITIATE {
                    return Err(unexpected("expect_initiate", name));
                }
                self.handle_initiate(body)
            }
            State::Connected
            | State::ExpectNothing
            | State::SendHelloPending
            | State::ExpectWelcome
            | State::ExpectReady => Ok(Outcome::reply_only(None)),
        }
    }

    // ---- client steps ----

    fn build_hello(&mut self) -> Bytes {
        let k = self.hello_welcome_key();
        let short_nonce = random_bytes(HELLO_SHORT_NONCE_LEN);
        let proof = crypto::seal(&k, LABEL_HELLO, &short_nonce, &[0u8; HELLO_PROOF_LEN]);

        let mut body = Vec::with_capacity(2 + ZERO_PADDING_LEN + KEY_SIZE + short_nonce.len() + proof.len());
        body.extend_from_slice(&[1, 0]);
        body.extend_from_slice(&[0u8; ZERO_PADDING_LEN]);
        body.extend_from_slice(self.own_transient().public.as_bytes());
        body.extend_from_slice(&short_nonce);
        body.extend_from_slice(&proof);

        self.state = State::ExpectWelcome;
        tracing::debug!(
            transient_pk = %hex::encode(self.own_transient().public.as_bytes()),
            "sent HELLO, awaiting WELCOME"
        );
        wire::encode_command(CMD_HELLO, &body)
    }

    fn handle_welcome(&mut self, body: &[u8]) -> Result<Bytes> {
        if body.len() < HANDSHAKE_LONG_NONCE_LEN {
            return Err(CurveError::MalformedFrame("WELCOME"));
        }
        let (short_nonce, ciphertext) = body.split_at(HANDSHAKE_LONG_NONCE_LEN);
        let k = self.hello_welcome_key();
        let plaintext = crypto::open(&k, LABEL_WELCOME, short_nonce, ciphertext)?;
        if plaintext.len() != KEY_SIZE + COOKIE_LEN {
            return Err(CurveError::MalformedFrame("WELCOME"));
        }
        let server_transient_pk = PublicKeyBytes::from_bytes(
            plaintext[..KEY_SIZE].try_into().expect("slice is KEY_SIZE"),
        );
        let cookie = Bytes::copy_from_slice(&plaintext[KEY_SIZE..]);
        self.peer_transient_pk = Some(server_transient_pk);

        self.state = State::ExpectReady;
        self.build_initiate(cookie)
    }

    fn build_initiate(&mut self, cookie: Bytes) -> Result<Bytes> {
        let k_tt = self.own_transient().secret.diffie_hellman(
            self.peer_transient_pk.as_ref().expect("set in handle_welcome"),
        );

        let vouch_nonce = random_bytes(HANDSHAKE_LONG_NONCE_LEN);
        let k_vouch = self
            .cert
            .secret_key()
            .diffie_hellman(self.peer_permanent_pk.as_ref().expect("pinned at construction"));
        let mut vouch_plaintext = Vec::with_capacity(KEY_SIZE * 2);
        vouch_plaintext.extend_from_slice(self.own_transient().public.as_bytes());
        vouch_plaintext.extend_from_slice(self.peer_permanent_pk.as_ref().unwrap().as_bytes());
        let vouch_box = crypto::seal(&k_vouch, LABEL_VOUCH, &vouch_nonce, &vouch_plaintext);

        let metadata = self.local_metadata.encode_with_limit(self.config.metadata_limit)?;
        let mut inner = Vec::with_capacity(KEY_SIZE + vouch_nonce.len() + vouch_box.len() + metadata.len());
        inner.extend_from_slice(self.cert.public_key().as_bytes());
        inner.extend_from_slice(&vouch_nonce);
        inner.extend_from_slice(&vouch_box);
        inner.extend_from_slice(&metadata);

        let init_nonce = random_bytes(INITIATE_SHORT_NONCE_LEN);
        let box_i = crypto::seal(&k_tt, LABEL_INITIATE, &init_nonce, &inner);

        let mut body = Vec::with_capacity(cookie.len() + init_nonce.len() + box_i.len());
        body.extend_from_slice(&cookie);
        body.extend_from_slice(&init_nonce);
        body.extend_from_slice(&box_i);

        Ok(wire::encode_command(CMD_INITIATE, &body))
    }

    fn handle_ready(&mut self, body: &[u8]) -> Result<Outcome> {
        if body.len() < READY_SHORT_NONCE_LEN {
            return Err(CurveError::MalformedFrame("READY"));
        }
        let (short_nonce, ciphertext) = body.split_at(READY_SHORT_NONCE_LEN);
        let k_tt = self.own_transient().secret.diffie_hellman(
            self.peer_transient_pk.as_ref().expect("set in handle_welcome"),
        );
        let plaintext = crypto::open(&k_tt, LABEL_READY, short_nonce, ciphertext)?;
        self.peer_metadata = Metadata::decode_with_limit(Bytes::from(plaintext), self.config.metadata_limit)?;
        self.state = State::Connected;
        tracing::debug!("received READY, connected");
        Ok(Outcome {
            reply: None,
            message_channel: Some(MessageChannel::new(k_tt, true)),
        })
    }

    /// Shared key used for both HELLO's proof box and WELCOME's box: by DH
    /// symmetry, `precompute(server_pk_P, client_sk_T)` computed here
    /// equals `precompute(client_pk_T, server_sk_P)` computed by the server.
    fn hello_welcome_key(&self) -> SharedSecret {
        self.own_transient()
            .secret
            .diffie_hellman(self.peer_permanent_pk.as_ref().expect("pinned at construction"))
    }

    /// The client's transient key pair. Only ever called on the client
    /// role; the server never stores one on `self` (see the `transient`
    /// field's doc comment).
    fn own_transient(&self) -> &KeyPair {
        self.transient
            .as_ref()
            .expect("transient key pair is set for the client role")
    }

    // ---- server steps ----

    fn handle_hello(&mut self, body: &[u8]) -> Result<Bytes> {
        let min_len = 2 + ZERO_PADDING_LEN + KEY_SIZE + HELLO_SHORT_NONCE_LEN;
        if body.len() < min_len {
            return Err(CurveError::MalformedFrame("HELLO"));
        }
        let padding = &body[2..2 + ZERO_PADDING_LEN];
        if !constant_time_eq(padding, &[0u8; ZERO_PADDING_LEN]) {
            return Err(CurveError::NonZeroPadding);
        }
        let key_start = 2 + ZERO_PADDING_LEN;
        let client_transient_pk = PublicKeyBytes::from_bytes(
            body[key_start..key_start + KEY_SIZE]
                .try_into()
                .expect("slice is KEY_SIZE"),
        );
        let nonce_start = key_start + KEY_SIZE;
        let short_nonce = &body[nonce_start..nonce_start + HELLO_SHORT_NONCE_LEN];
        let proof = &body[nonce_start + HELLO_SHORT_NONCE_LEN..];

        let k = self.cert.secret_key().diffie_hellman(&client_transient_pk);
        let plaintext = crypto::open(&k, LABEL_HELLO, short_nonce, proof)?;
        if !constant_time_eq(&plaintext, &[0u8; HELLO_PROOF_LEN]) {
            return Err(CurveError::HelloProofMismatch);
        }

        let server_transient = KeyPair::generate();
        let cookie_key = SharedSecret::from_bytes(
            random_bytes(KEY_SIZE)
                .try_into()
                .expect("random_bytes(KEY_SIZE) returns KEY_SIZE bytes"),
        );

        let cookie_nonce = random_bytes(HANDSHAKE_LONG_NONCE_LEN);
        let mut cookie_plaintext = Vec::with_capacity(KEY_SIZE * 2);
        cookie_plaintext.extend_from_slice(client_transient_pk.as_bytes());
        cookie_plaintext.extend_from_slice(&server_transient.secret.to_bytes());
        let cookie_box = crypto::seal(&cookie_key, LABEL_COOKIE, &cookie_nonce, &cookie_plaintext);
        let mut cookie = Vec::with_capacity(cookie_nonce.len() + cookie_box.len());
        cookie.extend_from_slice(&cookie_nonce);
        cookie.extend_from_slice(&cookie_box);

        let welcome_nonce = random_bytes(HANDSHAKE_LONG_NONCE_LEN);
        let mut welcome_plaintext = Vec::with_capacity(KEY_SIZE + cookie.len());
        welcome_plaintext.extend_from_slice(server_transient.public.as_bytes());
        welcome_plaintext.extend_from_slice(&cookie);
        let box_w = crypto::seal(&k, LABEL_WELCOME, &welcome_nonce, &welcome_plaintext);

        let mut wbody = Vec::with_capacity(welcome_nonce.len() + box_w.len());
        wbody.extend_from_slice(&welcome_nonce);
        wbody.extend_from_slice(&box_w);

        self.cookie_key = Some(cookie_key);
        self.state = State::ExpectInitiate;
        tracing::debug!(
            client_transient_pk = %hex::encode(client_transient_pk.as_bytes()),
            "received HELLO, sent WELCOME"
        );
        Ok(wire::encode_command(CMD_WELCOME, &wbody))
    }

    fn handle_initiate(&mut self, body: &[u8]) -> Result<Outcome> {
        if body.len() < COOKIE_LEN + INITIATE_SHORT_NONCE_LEN {
            return Err(CurveError::MalformedFrame("INITIATE"));
        }
        let (cookie, rest) = body.split_at(COOKIE_LEN);
        let (init_nonce, box_i) = rest.split_at(INITIATE_SHORT_NONCE_LEN);

        let (cookie_nonce, cookie_ciphertext) = cookie.split_at(HANDSHAKE_LONG_NONCE_LEN);
        let cookie_key = self.cookie_key.as_ref().expect("set in handle_hello");
        let cookie_plaintext = crypto::open(cookie_key, LABEL_COOKIE, cookie_nonce, cookie_ciphertext)
            .map_err(|_| CurveError::CookieMismatch)?;
        if cookie_plaintext.len() != KEY_SIZE * 2 {
            return Err(CurveError::CookieMismatch);
        }
        let client_transient_pk = PublicKeyBytes::from_bytes(
            cookie_plaintext[..KEY_SIZE].try_into().expect("slice is KEY_SIZE"),
        );
        let server_transient_sk = SecretKeyBytes::from_bytes(
            cookie_plaintext[KEY_SIZE..].try_into().expect("slice is KEY_SIZE"),
        );

        let k_tt = server_transient_sk.diffie_hellman(&client_transient_pk);
        let inner = crypto::open(&k_tt, LABEL_INITIATE, init_nonce, box_i)?;
        if inner.len() < KEY_SIZE + HANDSHAKE_LONG_NONCE_LEN + 16 {
            return Err(CurveError::MalformedFrame("INITIATE"));
        }
        let client_permanent_pk =
            PublicKeyBytes::from_bytes(inner[..KEY_SIZE].try_into().expect("slice is KEY_SIZE"));
        let vouch_nonce_start = KEY_SIZE;
        let vouch_nonce = &inner[vouch_nonce_start..vouch_nonce_start + HANDSHAKE_LONG_NONCE_LEN];
        let vouch_box_start = vouch_nonce_start + HANDSHAKE_LONG_NONCE_LEN;
        // The vouch box is a fixed-size 80-byte seal over 64 plaintext bytes.
        let vouch_box_len = KEY_SIZE * 2 + 16;
        if inner.len() < vouch_box_start + vouch_box_len {
            return Err(CurveError::MalformedFrame("INITIATE"));
        }
        let vouch_box = &inner[vouch_box_start..vouch_box_start + vouch_box_len];
        let metadata_bytes = Bytes::copy_from_slice(&inner[vouch_box_start + vouch_box_len..]);

        let k_vouch = self.cert.secret_key().diffie_hellman(&client_permanent_pk);
        let vouch_plaintext = crypto::open(&k_vouch, LABEL_VOUCH, vouch_nonce, vouch_box)?;
        if vouch_plaintext.len() != KEY_SIZE * 2 {
            return Err(CurveError::VouchMismatch);
        }
        let vouched_transient_pk = &vouch_plaintext[..KEY_SIZE];
        let vouched_server_pk = &vouch_plaintext[KEY_SIZE..];
        if !constant_time_eq(vouched_transient_pk, client_transient_pk.as_bytes())
            || !constant_time_eq(vouched_server_pk, self.cert.public_key().as_bytes())
        {
            return Err(CurveError::VouchMismatch);
        }

        let peer_metadata = Metadata::decode_with_limit(metadata_bytes, self.config.metadata_limit)?;

        if let Some(auth) = self.zap.as_mut() {
            let request = ZapRequest::for_curve_client(
                random_bytes(8)
                    .iter()
                    .map(|b| format!("{b:02x}"))
                    .collect::<String>(),
                self.zap_domain.clone(),
                String::new(),
                client_permanent_pk.as_bytes(),
            );
            let response = auth.authenticate(&request, self.config.zap_timeout);
            if !response.status_code.is_success() {
                tracing::warn!(status = response.status_text, "ZAP denied client");
                return Err(CurveError::AuthorizationDenied(response.status_text));
            }
            tracing::debug!("ZAP authorized client");
        }

        self.peer_permanent_pk = Some(client_permanent_pk);
        self.peer_transient_pk = Some(client_transient_pk);
        self.peer_metadata = peer_metadata;

        let ready_nonce = random_bytes(READY_SHORT_NONCE_LEN);
        let ready_metadata = self.local_metadata.encode_with_limit(self.config.metadata_limit)?;
        let box_r = crypto::seal(&k_tt, LABEL_READY, &ready_nonce, &ready_metadata);
        let mut rbody = Vec::with_capacity(ready_nonce.len() + box_r.len());
        rbody.extend_from_slice(&ready_nonce);
        rbody.extend_from_slice(&box_r);

        self.state = State::Connected;
        tracing::debug!("received INITIATE, sent READY, connected");
        Ok(Outcome {
            reply: Some(wire::encode_command(CMD_READY, &rbody)),
            message_channel: Some(MessageChannel::new(k_tt, false)),
        })
    }
}

fn unexpected(state: &'static str, got: &[u8]) -> CurveError {
    CurveError::UnexpectedCommand {
        state,
        got: String::from_utf8_lossy(got).into_owned(),
    }
}

fn encode_error(reason: &str) -> Bytes {
    let reason = &reason.as_bytes()[..reason.len().min(255)];
    let mut body = Vec::with_capacity(1 + reason.len());
    body.push(reason.len() as u8);
    body.extend_from_slice(reason);
    wire::encode_command(CMD_ERROR, &body)
}

fn try_parse_error(frame: &[u8]) -> Option<String> {
    let (name, body) = wire::parse_command(frame)?;
    if name != CMD_ERROR {
        return None;
    }
    let len = usize::from(*body.first()?);
    if body.len() < 1 + len {
        return None;
    }
    Some(String::from_utf8_lossy(&body[1..1 + len]).into_owned())
}
