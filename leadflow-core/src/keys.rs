//! Signing keys for lead tokens
//!
//! Lead tokens are signed with Ed25519. The server keeps one keypair,
//! persisted as a base64url seed so tokens survive restarts.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;

use crate::{Error, Result};

/// Verifying half of the server key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    inner: VerifyingKey,
}

impl PublicKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| Error::InvalidKey("public key must be 32 bytes".into()))?;
        let inner =
            VerifyingKey::from_bytes(&bytes).map_err(|e| Error::InvalidKey(e.to_string()))?;
        Ok(Self { inner })
    }

    pub fn to_base64(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.inner.as_bytes())
    }

    pub fn from_base64(s: &str) -> Result<Self> {
        Self::from_bytes(&URL_SAFE_NO_PAD.decode(s)?)
    }

    /// Short identifier put in token headers so a rotated key can be told apart
    pub fn key_id(&self) -> String {
        URL_SAFE_NO_PAD.encode(&self.inner.as_bytes()[..6])
    }

    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<()> {
        let sig_bytes: [u8; 64] = signature
            .try_into()
            .map_err(|_| Error::SignatureVerificationFailed)?;
        self.inner
            .verify(message, &Signature::from_bytes(&sig_bytes))
            .map_err(|_| Error::SignatureVerificationFailed)
    }
}

/// Server signing keypair
pub struct KeyPair {
    signing_key: SigningKey,
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key().to_base64())
            .finish()
    }
}

impl KeyPair {
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    pub fn from_seed(seed: &[u8]) -> Result<Self> {
        let seed: [u8; 32] = seed
            .try_into()
            .map_err(|_| Error::InvalidKey("seed must be 32 bytes".into()))?;
        Ok(Self {
            signing_key: SigningKey::from_bytes(&seed),
        })
    }

    /// Load a keypair from the base64url seed written by [`KeyPair::to_base64_seed`]
    pub fn from_base64_seed(encoded: &str) -> Result<Self> {
        Self::from_seed(&URL_SAFE_NO_PAD.decode(encoded.trim())?)
    }

    pub fn to_base64_seed(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.signing_key.as_bytes())
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            inner: self.signing_key.verifying_key(),
        }
    }

    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        let signature: Signature = self.signing_key.sign(message);
        signature.to_bytes().to_vec()
    }
}
