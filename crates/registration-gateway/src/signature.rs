//! Ownership proofs: secp256k1 signature recovery against a claimed address.
//!
//! A registration carries two proofs, both signatures over the claimed
//! address string:
//! - the `password` field, hex encoded
//! - the tail of the display name, `<label>-<130 hex chars>`

use crate::error::GatewayError;
use alloy::primitives::{eip191_hash_message, keccak256, Address, Signature, B256};
use serde::Deserialize;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

/// Length of a recoverable signature: `r || s || v`.
pub const SIGNATURE_LENGTH: usize = 65;

/// Length of a hex-encoded signature.
pub const SIGNATURE_HEX_LENGTH: usize = SIGNATURE_LENGTH * 2;

/// Length of a `0x`-prefixed address string.
pub const ADDRESS_STRING_LENGTH: usize = 42;

const DISPLAY_NAME_SEPARATOR: char = '-';

/// Why a proof was rejected.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProofError {
    /// The proof is not shaped correctly (checked before any cryptography).
    #[error("{0}")]
    Format(String),

    /// The proof is shaped correctly but does not verify.
    #[error("{0}")]
    Signature(String),
}

/// How the signed message is hashed before recovery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureScheme {
    /// `keccak256(message)`
    #[default]
    Keccak256,
    /// `keccak256("\x19Ethereum Signed Message:\n" || len || message)`
    Eip191,
}

impl SignatureScheme {
    pub fn message_hash(self, message: &[u8]) -> B256 {
        match self {
            SignatureScheme::Keccak256 => keccak256(message),
            SignatureScheme::Eip191 => eip191_hash_message(message),
        }
    }
}

/// Parse a claimed address, enforcing the canonical `0x` + 40 hex length.
pub fn parse_address(localpart: &str) -> Result<Address, GatewayError> {
    if localpart.len() != ADDRESS_STRING_LENGTH || !localpart.starts_with("0x") {
        return Err(GatewayError::InvalidAddress(localpart.to_string()));
    }

    Address::from_str(localpart).map_err(|_| GatewayError::InvalidAddress(localpart.to_string()))
}

/// Split a display name into its label and signature segment.
pub fn split_display_name(display_name: &str) -> Result<(&str, &str), ProofError> {
    let segments: Vec<&str> = display_name.split(DISPLAY_NAME_SEPARATOR).collect();

    let [label, signature] = segments.as_slice() else {
        return Err(ProofError::Format(format!(
            "display name must be <label>-<signature>, got {} segments",
            segments.len()
        )));
    };

    if signature.len() != SIGNATURE_HEX_LENGTH {
        return Err(ProofError::Format(format!(
            "display name signature must be {} hex chars, got {}",
            SIGNATURE_HEX_LENGTH,
            signature.len()
        )));
    }

    Ok((*label, *signature))
}

/// Stateless signature verifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureVerifier {
    scheme: SignatureScheme,
}

impl SignatureVerifier {
    pub fn new(scheme: SignatureScheme) -> Self {
        Self { scheme }
    }

    pub fn scheme(&self) -> SignatureScheme {
        self.scheme
    }

    /// Recover the address that signed `message`.
    pub fn recover(&self, signature: &[u8], message: &[u8]) -> Result<Address, ProofError> {
        if signature.len() != SIGNATURE_LENGTH {
            return Err(ProofError::Signature(format!(
                "signature must be {} bytes, got {}",
                SIGNATURE_LENGTH,
                signature.len()
            )));
        }

        let signature = Signature::from_raw(signature)
            .map_err(|e| ProofError::Signature(format!("malformed signature: {}", e)))?;

        signature
            .recover_address_from_prehash(&self.scheme.message_hash(message))
            .map_err(|e| ProofError::Signature(format!("signature recovery failed: {}", e)))
    }

    /// Check that `signature` over `message` was produced by `address`'s key.
    pub fn verify(
        &self,
        address: &Address,
        signature: &[u8],
        message: &[u8],
    ) -> Result<(), ProofError> {
        let recovered = self.recover(signature, message)?;

        if recovered != *address {
            debug!(claimed = %address, recovered = %recovered, "Signer mismatch");
            return Err(ProofError::Signature(format!(
                "signature was not produced by {}",
                address
            )));
        }

        Ok(())
    }

    /// Verify the password proof and return the decoded signature bytes.
    ///
    /// The returned bytes are the secret that gets hashed and forwarded.
    pub fn verify_password(
        &self,
        address: &Address,
        localpart: &str,
        password: &str,
    ) -> Result<Vec<u8>, ProofError> {
        let signature = hex::decode(password)
            .map_err(|e| ProofError::Signature(format!("password is not valid hex: {}", e)))?;

        self.verify(address, &signature, localpart.as_bytes())?;
        Ok(signature)
    }

    /// Verify the signature embedded in the display name.
    pub fn verify_display_name(
        &self,
        address: &Address,
        localpart: &str,
        display_name: &str,
    ) -> Result<(), ProofError> {
        let (_, signature_hex) = split_display_name(display_name)?;

        let signature = hex::decode(signature_hex).map_err(|e| {
            ProofError::Signature(format!("display name signature is not valid hex: {}", e))
        })?;

        self.verify(address, &signature, localpart.as_bytes())
    }
}
