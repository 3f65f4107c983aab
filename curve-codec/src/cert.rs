//! Owned permanent-credential type (spec §9 "Opaque credential type").
//!
//! The teacher's `CurveKeyPair` is a plain struct with no ownership
//! discipline around the secret half; here the credential is the one value
//! a caller hands over at construction, and it is zeroized in full on drop
//! rather than only at the `StaticSecret` layer.

use crate::crypto::{KeyPair, PublicKeyBytes, SecretKeyBytes};

/// A permanent CURVE identity: a long-term key pair. Constructed once,
/// passed into `new_client`/`new_server`/`set_permakey` by value, and
/// destroyed with the codec.
#[derive(Debug, Clone)]
pub struct CurveCert {
    keypair: KeyPair,
}

impl CurveCert {
    /// Generate a fresh permanent identity.
    #[must_use]
    pub fn generate() -> Self {
        Self {
            keypair: KeyPair::generate(),
        }
    }

    /// Reconstruct a credential from a previously persisted secret key.
    /// Key storage and certificate I/O are out of scope for this crate
    /// (spec §1); callers load the 32 secret bytes from wherever they keep
    /// them and hand them here.
    #[must_use]
    pub fn from_secret_bytes(secret: [u8; 32]) -> Self {
        let secret = SecretKeyBytes::from_bytes(secret);
        let public = secret.public_key();
        Self {
            keypair: KeyPair::from_parts(public, secret),
        }
    }

    #[must_use]
    pub fn public_key(&self) -> PublicKeyBytes {
        self.keypair.public
    }

    pub(crate) fn secret_key(&self) -> &SecretKeyBytes {
        &self.keypair.secret
    }
}
