//! Signature primitives
//!
//! Token and cookie codecs only see these traits. The default
//! implementation is Ed25519.

use crate::error::{AuthError, Result};
use ed25519_compact::{KeyPair, PublicKey, Seed, Signature};

/// Verifies a detached signature over a payload
pub trait SignatureVerifier: Send + Sync {
    /// Succeeds only when `signature` is valid for `payload`
    fn verify(&self, payload: &[u8], signature: &[u8]) -> Result<()>;
}

/// Produces detached signatures
pub trait Signer: Send + Sync {
    /// Sign `payload`
    fn sign(&self, payload: &[u8]) -> Vec<u8>;
}

/// Ed25519 verifier
#[derive(Debug, Clone)]
pub struct Ed25519Verifier {
    public_key: PublicKey,
}

impl Ed25519Verifier {
    /// Create from a public key
    pub fn new(public_key: PublicKey) -> Self {
        Self { public_key }
    }

    /// Create from a hex-encoded public key
    pub fn from_hex(public_key_hex: &str) -> Result<Self> {
        let bytes = hex::decode(public_key_hex.trim())
            .map_err(|e| AuthError::CryptoError(format!("Invalid public key hex: {}", e)))?;
        let public_key = PublicKey::from_slice(&bytes)
            .map_err(|e| AuthError::CryptoError(format!("Invalid public key: {}", e)))?;

        Ok(Self { public_key })
    }
}

impl SignatureVerifier for Ed25519Verifier {
    fn verify(&self, payload: &[u8], signature: &[u8]) -> Result<()> {
        let signature = Signature::from_slice(signature)
            .map_err(|e| AuthError::CryptoError(format!("Malformed signature: {}", e)))?;

        self.public_key
            .verify(payload, &signature)
            .map_err(|e| AuthError::CryptoError(format!("Signature verification failed: {}", e)))
    }
}

/// Ed25519 signer
#[derive(Debug, Clone)]
pub struct Ed25519Signer {
    keypair: KeyPair,
}

impl Ed25519Signer {
    /// Create from a key pair
    pub fn new(keypair: KeyPair) -> Self {
        Self { keypair }
    }

    /// Generate a fresh key pair
    pub fn generate() -> Self {
        Self::new(KeyPair::generate())
    }

    /// Derive the key pair from a hex-encoded 32-byte seed
    pub fn from_seed_hex(seed_hex: &str) -> Result<Self> {
        let bytes = hex::decode(seed_hex.trim())
            .map_err(|e| AuthError::CryptoError(format!("Invalid seed hex: {}", e)))?;
        let seed = Seed::from_slice(&bytes)
            .map_err(|e| AuthError::CryptoError(format!("Invalid seed: {}", e)))?;

        Ok(Self::new(KeyPair::from_seed(seed)))
    }

    /// Matching verifier
    pub fn verifier(&self) -> Ed25519Verifier {
        Ed25519Verifier::new(self.keypair.pk)
    }

    /// Hex-encoded public key
    pub fn public_key_hex(&self) -> String {
        hex::encode(*self.keypair.pk)
    }

    /// Hex-encoded 32-byte seed, accepted by [`Ed25519Signer::from_seed_hex`]
    pub fn seed_hex(&self) -> String {
        hex::encode(*self.keypair.sk.seed())
    }
}

impl Signer for Ed25519Signer {
    fn sign(&self, payload: &[u8]) -> Vec<u8> {
        self.keypair.sk.sign(payload, None).to_vec()
    }
}
