//! Narrow binding over X25519 key agreement and `ChaCha20Poly1305`
//! authenticated encryption — the six primitives the rest of this crate is
//! built on: `keypair`, `precompute`, `seal`, `open`, `random_bytes`, and
//! `constant_time_eq`.
//!
//! Grounded on the key-pair and box types already present in the teacher's
//! CURVE module, extended to a full 24-byte domain-separated nonce (label +
//! short nonce) instead of truncating to `ChaCha20Poly1305`'s native 12-byte
//! nonce. `ChaCha20Poly1305` only accepts a 12-byte nonce, so the first 12
//! bytes of the 24-byte crypto nonce are used directly as the AEAD nonce;
//! see `aead_nonce` below for why that prefix is still unique per label and
//! short nonce.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use rand::RngCore;
use subtle::ConstantTimeEq;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop};

use curve_core::limits::{BOX_OVERHEAD, KEY_SIZE, NONCE_SIZE};

use crate::error::{CurveError, Result};

/// A 32-byte CURVE public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublicKeyBytes([u8; KEY_SIZE]);

impl PublicKeyBytes {
    #[must_use]
    pub const fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    fn to_dalek(self) -> PublicKey {
        PublicKey::from(self.0)
    }
}

impl From<PublicKey> for PublicKeyBytes {
    fn from(key: PublicKey) -> Self {
        Self(*key.as_bytes())
    }
}

impl AsRef<[u8]> for PublicKeyBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// A 32-byte CURVE secret key. Zeroized on drop; the scalar never leaves
/// this type except through `diffie_hellman`'s output, which is itself
/// zeroize-on-drop (see `SharedSecret`).
#[derive(Clone, ZeroizeOnDrop)]
pub struct SecretKeyBytes(#[zeroize(skip)] StaticSecret);

impl SecretKeyBytes {
    #[must_use]
    pub fn generate() -> Self {
        let mut seed = [0u8; KEY_SIZE];
        rand::thread_rng().fill_bytes(&mut seed);
        let key = Self(StaticSecret::from(seed));
        seed.zeroize();
        key
    }

    #[must_use]
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(StaticSecret::from(bytes))
    }

    #[must_use]
    pub fn public_key(&self) -> PublicKeyBytes {
        PublicKeyBytes::from(PublicKey::from(&self.0))
    }

    /// `precompute(pk_remote, sk_local) -> K` (spec §4.2).
    #[must_use]
    pub fn diffie_hellman(&self, peer_public: &PublicKeyBytes) -> SharedSecret {
        SharedSecret(*self.0.diffie_hellman(&peer_public.to_dalek()).as_bytes())
    }

    /// Raw scalar bytes, needed only to seal the server's transient secret
    /// inside a cookie (spec §6 "COOKIE ... server sk_T(32)").
    #[must_use]
    pub fn to_bytes(&self) -> [u8; KEY_SIZE] {
        self.0.to_bytes()
    }
}

impl std::fmt::Debug for SecretKeyBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretKeyBytes([REDACTED])")
    }
}

/// Output of `precompute`: a 32-byte shared key. Never compared, logged, or
/// serialized; consumed only by `seal`/`open`.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret([u8; KEY_SIZE]);

impl SharedSecret {
    /// Build a shared secret directly from raw bytes, used for the cookie
    /// key (spec §3: "a random 32-byte symmetric key", not a DH output).
    #[must_use]
    pub const fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    fn cipher(&self) -> ChaCha20Poly1305 {
        ChaCha20Poly1305::new((&self.0).into())
    }
}

/// `keypair() -> (pk, sk)` (spec §4.2).
#[derive(Debug, Clone)]
pub struct KeyPair {
    pub public: PublicKeyBytes,
    pub secret: SecretKeyBytes,
}

impl KeyPair {
    #[must_use]
    pub fn generate() -> Self {
        let secret = SecretKeyBytes::generate();
        let public = secret.public_key();
        Self { public, secret }
    }

    #[must_use]
    pub const fn from_parts(public: PublicKeyBytes, secret: SecretKeyBytes) -> Self {
        Self { public, secret }
    }
}

/// Fixed 8- or 16-byte ASCII domain separator prepended to every crypto
/// nonce. Values are listed in spec §6; never reused across commands.
pub type Label = &'static [u8];

pub const LABEL_HELLO: Label = b"CurveZMQHELLO---";
pub const LABEL_WELCOME: Label = b"WELCOME-";
pub const LABEL_COOKIE: Label = b"COOKIE--";
pub const LABEL_INITIATE: Label = b"CurveZMQINITIATE";
pub const LABEL_VOUCH: Label = b"VOUCH---";
pub const LABEL_READY: Label = b"CurveZMQREADY---";
pub const LABEL_MESSAGE_CLIENT: Label = b"CurveZMQMESSAGEC";
pub const LABEL_MESSAGE_SERVER: Label = b"CurveZMQMESSAGES";

/// Assemble the full 24-byte crypto nonce from a label and the short nonce
/// transmitted on the wire. `label.len() + short_nonce.len()` must equal
/// `NONCE_SIZE`; every caller in this crate satisfies that by construction.
fn full_nonce(label: Label, short_nonce: &[u8]) -> [u8; NONCE_SIZE] {
    debug_assert_eq!(label.len() + short_nonce.len(), NONCE_SIZE);
    let mut nonce = [0u8; NONCE_SIZE];
    nonce[..label.len()].copy_from_slice(label);
    nonce[label.len()..].copy_from_slice(short_nonce);
    nonce
}

/// `ChaCha20Poly1305` only accepts a 12-byte nonce. Every crypto nonce this
/// crate constructs is unique per (key, direction) by the combination of a
/// command-fixed label and a strictly increasing or freshly random short
/// nonce, so truncating to the first 12 bytes preserves uniqueness as long
/// as the label occupies at least 4 of those bytes — true for every label
/// in this crate (8 or 16 ASCII bytes).
fn aead_nonce(full: &[u8; NONCE_SIZE]) -> Nonce {
    *Nonce::from_slice(&full[..12])
}

/// `seal(K, nonce24, plaintext) -> ciphertext` (spec §4.2). Appends a
/// 16-byte Poly1305 tag.
pub fn seal(key: &SharedSecret, label: Label, short_nonce: &[u8], plaintext: &[u8]) -> Vec<u8> {
    let full = full_nonce(label, short_nonce);
    key.cipher()
        .encrypt(&aead_nonce(&full), plaintext)
        .expect("ChaCha20Poly1305 encryption is infallible for valid key/nonce sizes")
}

/// `open(K, nonce24, ciphertext) -> plaintext | fail` (spec §4.2).
/// Constant-time: `ChaCha20Poly1305::decrypt` compares the Poly1305 tag in
/// constant time internally and never returns partial plaintext on failure.
pub fn open(key: &SharedSecret, label: Label, short_nonce: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
    let full = full_nonce(label, short_nonce);
    key.cipher()
        .decrypt(&aead_nonce(&full), ciphertext)
        .map_err(|_| CurveError::OpenFailed(label_name(label)))
}

fn label_name(label: Label) -> &'static str {
    match label {
        LABEL_HELLO => "HELLO",
        LABEL_WELCOME => "WELCOME",
        LABEL_COOKIE => "COOKIE",
        LABEL_INITIATE => "INITIATE",
        LABEL_VOUCH => "VOUCH",
        LABEL_READY => "READY",
        LABEL_MESSAGE_CLIENT | LABEL_MESSAGE_SERVER => "MESSAGE",
        _ => "box",
    }
}

/// `random_bytes(n)` (spec §4.2).
#[must_use]
pub fn random_bytes(n: usize) -> Vec<u8> {
    let mut buf = vec![0u8; n];
    rand::thread_rng().fill_bytes(&mut buf);
    buf
}

/// `constant_time_eq(a, b)` (spec §4.2): length-independent equality.
/// Differing lengths are treated as unequal but still routed through a
/// constant-time comparator over the longer buffer's length so branch
/// timing doesn't leak *which* prefix matched.
#[must_use]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Every AEAD overhead in this crate is the Poly1305 tag.
#[must_use]
pub const fn sealed_len(plaintext_len: usize) -> usize {
    plaintext_len + BOX_OVERHEAD
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keypair_round_trips_public_key() {
        let pair = KeyPair::generate();
        assert_eq!(pair.public, pair.secret.public_key());
    }

    #[test]
    fn diffie_hellman_agrees_both_directions() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let a_shared = alice.secret.diffie_hellman(&bob.public);
        let b_shared = bob.secret.diffie_hellman(&alice.public);
        assert_eq!(a_shared.0, b_shared.0);
    }

    #[test]
    fn seal_open_round_trip() {
        let key = SharedSecret::from_bytes([7u8; KEY_SIZE]);
        let short_nonce = [1u8; 8];
        let plaintext = b"hello curve";
        let ct = seal(&key, LABEL_READY, &short_nonce, plaintext);
        assert_eq!(ct.len(), sealed_len(plaintext.len()));
        let pt = open(&key, LABEL_READY, &short_nonce, &ct).unwrap();
        assert_eq!(pt, plaintext);
    }

    #[test]
    fn open_rejects_tampered_ciphertext() {
        let key = SharedSecret::from_bytes([9u8; KEY_SIZE]);
        let short_nonce = [0u8; 8];
        let mut ct = seal(&key, LABEL_HELLO, &short_nonce, &[0u8; 64]);
        ct[0] ^= 0x01;
        assert!(open(&key, LABEL_HELLO, &short_nonce, &ct).is_err());
    }

    #[test]
    fn open_rejects_wrong_key() {
        let key_a = SharedSecret::from_bytes([1u8; KEY_SIZE]);
        let key_b = SharedSecret::from_bytes([2u8; KEY_SIZE]);
        let ct = seal(&key_a, LABEL_VOUCH, &[0u8; 16], b"vouch payload");
        assert!(open(&key_b, LABEL_VOUCH, &[0u8; 16], &ct).is_err());
    }

    #[test]
    fn constant_time_eq_matches_native_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"ab"));
    }
}
