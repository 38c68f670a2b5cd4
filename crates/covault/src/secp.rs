//! secp256k1 keypair generation, deterministic signing, and verification.
//!
//! Signatures are RFC 6979 deterministic with low-S normalization, so signing
//! the same message with the same key always yields the identical canonical
//! signature (no malleable twin).

use crate::errors::SignerError;
use crate::hexutil::{bytes_to_hex, hex_to_bytes};
use k256::ecdsa::signature::hazmat::PrehashVerifier as _;
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use rand::TryRngCore as _;
use sha2::{Digest as _, Sha256};
use zeroize::Zeroizing;

/// A freshly generated secp256k1 keypair.
///
/// The private half is transient: it lives in a zeroizing buffer and is wiped
/// on drop. The compressed public point is long-lived and safe to share.
pub struct Keypair {
    pub private_key: Zeroizing<[u8; 32]>,
    /// Compressed SEC1 point, 33 bytes, hex.
    pub public_key: String,
}

/// One signing call's output. Carries no secret material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureResult {
    /// Compact `r || s` signature, hex.
    pub signature: String,
    /// Recovery id (0 or 1 in practice).
    pub recovery: u8,
    /// SHA-256 of the signed message, hex.
    pub message_hash: String,
}

/// SHA-256 of `message`; the hash every signature in this crate commits to.
pub fn message_digest(message: &[u8]) -> [u8; 32] {
    Sha256::digest(message).into()
}

/// Generate a keypair from OS entropy.
///
/// Fails with [`SignerError::KeyGen`] only if the entropy source is
/// unavailable. A draw outside the curve's scalar range is rejected and
/// redrawn (overwhelmingly unlikely to take more than one attempt).
pub fn generate_keypair() -> Result<Keypair, SignerError> {
    loop {
        let mut bytes = Zeroizing::new([0_u8; 32]);
        rand::rngs::OsRng
            .try_fill_bytes(bytes.as_mut())
            .map_err(|_| SignerError::KeyGen)?;
        if let Ok(sk) = SigningKey::from_slice(bytes.as_ref()) {
            let public_key = bytes_to_hex(&sk.verifying_key().to_sec1_bytes());
            return Ok(Keypair {
                private_key: bytes,
                public_key,
            });
        }
    }
}

/// Sign `message` with a raw 32-byte private key.
///
/// The message is hashed with SHA-256 and signed deterministically; the
/// compact signature, its recovery id, and the hash come back together.
pub fn sign(message: &[u8], private_key: &[u8]) -> Result<SignatureResult, SignerError> {
    let sk = SigningKey::from_slice(private_key)
        .map_err(|e| SignerError::Format(format!("invalid private key: {e}")))?;
    let digest = message_digest(message);
    let (sig, recovery) = sk
        .sign_prehash_recoverable(&digest)
        .map_err(|e| SignerError::Format(format!("sign: {e}")))?;
    Ok(SignatureResult {
        signature: bytes_to_hex(sig.to_bytes().as_slice()),
        recovery: recovery.to_byte(),
        message_hash: bytes_to_hex(&digest),
    })
}

/// Verify a compact signature over a 32-byte message hash.
///
/// Total: malformed hex, wrong lengths, invalid points, and every curve-level
/// error all map to `false`. Verification failure is a normal outcome the
/// caller branches on, never an error to propagate.
pub fn verify(message_hash_hex: &str, signature_hex: &str, public_key_hex: &str) -> bool {
    let Ok(hash) = hex_to_bytes(message_hash_hex) else {
        return false;
    };
    let Ok(sig_bytes) = hex_to_bytes(signature_hex) else {
        return false;
    };
    let Ok(pk_bytes) = hex_to_bytes(public_key_hex) else {
        return false;
    };
    let Ok(sig) = Signature::from_slice(&sig_bytes) else {
        return false;
    };
    let Ok(vk) = VerifyingKey::from_sec1_bytes(&pk_bytes) else {
        return false;
    };
    vk.verify_prehash(&hash, &sig).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flip_bit(hex_str: &str, byte_index: usize) -> eyre::Result<String> {
        let mut bytes = hex_to_bytes(hex_str)?;
        let b = bytes
            .get_mut(byte_index)
            .ok_or_else(|| eyre::eyre!("byte index out of range"))?;
        *b ^= 0x01;
        Ok(bytes_to_hex(&bytes))
    }

    #[test]
    fn generated_public_key_is_compressed_sec1() -> eyre::Result<()> {
        let kp = generate_keypair()?;
        assert_eq!(kp.public_key.len(), 66, "33 bytes, hex");
        assert!(
            kp.public_key.starts_with("02") || kp.public_key.starts_with("03"),
            "compressed point prefix, got {}",
            kp.public_key
        );
        Ok(())
    }

    #[test]
    fn keypairs_are_distinct() -> eyre::Result<()> {
        let a = generate_keypair()?;
        let b = generate_keypair()?;
        assert_ne!(a.public_key, b.public_key);
        Ok(())
    }

    #[test]
    fn signing_is_deterministic() -> eyre::Result<()> {
        let kp = generate_keypair()?;
        let msg = b"send 5 to alice";
        let first = sign(msg, kp.private_key.as_ref())?;
        let second = sign(msg, kp.private_key.as_ref())?;
        assert_eq!(first, second, "RFC 6979 must reproduce byte-identically");
        Ok(())
    }

    #[test]
    fn sign_then_verify() -> eyre::Result<()> {
        let kp = generate_keypair()?;
        let msg = b"withdraw 12";
        let sig = sign(msg, kp.private_key.as_ref())?;
        assert_eq!(sig.message_hash, bytes_to_hex(&message_digest(msg)));
        assert!(sig.recovery <= 1, "recovery id out of range");
        assert!(verify(&sig.message_hash, &sig.signature, &kp.public_key));
        Ok(())
    }

    #[test]
    fn tampered_signature_fails_verification() -> eyre::Result<()> {
        let kp = generate_keypair()?;
        let sig = sign(b"payload", kp.private_key.as_ref())?;
        for idx in [0_usize, 17, 40, 63] {
            let bad = flip_bit(&sig.signature, idx)?;
            assert!(
                !verify(&sig.message_hash, &bad, &kp.public_key),
                "bit flip at byte {idx} must invalidate the signature"
            );
        }
        Ok(())
    }

    #[test]
    fn tampered_hash_fails_verification() -> eyre::Result<()> {
        let kp = generate_keypair()?;
        let sig = sign(b"payload", kp.private_key.as_ref())?;
        let bad_hash = flip_bit(&sig.message_hash, 3)?;
        assert!(!verify(&bad_hash, &sig.signature, &kp.public_key));
        Ok(())
    }

    #[test]
    fn wrong_key_fails_verification() -> eyre::Result<()> {
        let kp = generate_keypair()?;
        let other = generate_keypair()?;
        let sig = sign(b"payload", kp.private_key.as_ref())?;
        assert!(!verify(&sig.message_hash, &sig.signature, &other.public_key));
        Ok(())
    }

    #[test]
    fn malformed_inputs_verify_false_not_error() {
        assert!(!verify("zz", "00", "02ab"));
        assert!(!verify("", "", ""));
        assert!(!verify(
            &"0".repeat(64),
            &"0".repeat(128),
            &"0".repeat(66)
        ));
    }
}
