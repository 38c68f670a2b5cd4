//! At-rest encryption for the software private key.
//!
//! Keystream construction: `SHA-256(secret || IV)` XORed cyclically over the
//! plaintext, stored as `hex(IV[16] || ciphertext)`. Confidentiality only —
//! there is no authentication tag, so decrypting with a wrong secret yields
//! garbage silently and callers must not treat a successful decryption as
//! proof the secret was right. Downstream signature verification is the
//! actual correctness check.
//!
//! TODO(hardening): replace the hash-based keystream with an AEAD (AES-GCM)
//! under an HKDF-derived key before any mainnet deployment. That changes the
//! persisted record format, so it needs a versioned migration rather than a
//! quiet swap here.

use crate::errors::SignerError;
use crate::hexutil::{bytes_to_hex, hex_to_bytes};
use rand::RngCore as _;
use sha2::{Digest as _, Sha256};
use zeroize::Zeroizing;

/// Length of the random IV prefixed to every encrypted record.
pub const IV_LEN: usize = 16;

fn fill_random(buf: &mut [u8]) {
    let mut rng = rand::rng();
    rng.fill_bytes(buf);
}

fn derive_stream_key(secret: &[u8], iv: &[u8]) -> Zeroizing<[u8; 32]> {
    let mut hasher = Sha256::new();
    hasher.update(secret);
    hasher.update(iv);
    Zeroizing::new(hasher.finalize().into())
}

fn xor_stream(input: &[u8], stream: &[u8; 32]) -> Vec<u8> {
    // Cyclic repetition covers plaintexts longer than the hash output.
    input
        .iter()
        .zip(stream.iter().cycle())
        .map(|(b, k)| b ^ k)
        .collect()
}

/// Encrypt a raw private key under a caller-supplied secret.
///
/// Returns `hex(IV[16] || ciphertext)`. The IV is drawn fresh per call, so
/// two encryptions of the identical key and secret produce different records
/// and the record is not an oracle for key equality.
pub fn encrypt(raw_key: &[u8], secret: &str) -> String {
    let mut iv = [0_u8; IV_LEN];
    fill_random(&mut iv);
    let stream = derive_stream_key(secret.as_bytes(), &iv);
    let ciphertext = xor_stream(raw_key, &stream);

    let mut record = Vec::with_capacity(IV_LEN + ciphertext.len());
    record.extend_from_slice(&iv);
    record.extend_from_slice(&ciphertext);
    bytes_to_hex(&record)
}

/// Decrypt an encrypted key record.
///
/// Total for any well-formed record: there is no tag to check, so a wrong
/// secret "succeeds" and returns garbage bytes. The recovered key lives in a
/// [`Zeroizing`] buffer and is wiped when dropped.
pub fn decrypt(record_hex: &str, secret: &str) -> Result<Zeroizing<Vec<u8>>, SignerError> {
    let record = Zeroizing::new(hex_to_bytes(record_hex)?);
    if record.len() < IV_LEN {
        return Err(SignerError::Format(format!(
            "encrypted record too short: {} bytes, need at least {IV_LEN}",
            record.len()
        )));
    }
    let (iv, ciphertext) = record.split_at(IV_LEN);
    let stream = derive_stream_key(secret.as_bytes(), iv);
    Ok(Zeroizing::new(xor_stream(ciphertext, &stream)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn random_key32() -> [u8; 32] {
        let mut k = [0_u8; 32];
        fill_random(&mut k);
        k
    }

    #[test]
    fn encrypt_decrypt_roundtrip() -> eyre::Result<()> {
        for _ in 0_i32..8_i32 {
            let key = random_key32();
            let record = encrypt(&key, "secretA");
            let out = decrypt(&record, "secretA")?;
            assert_eq!(out.as_slice(), key.as_slice());
        }
        Ok(())
    }

    #[test]
    fn record_is_iv_plus_ciphertext_hex() -> eyre::Result<()> {
        let key = random_key32();
        let record = encrypt(&key, "s");
        // 16-byte IV + 32-byte ciphertext, two hex digits per byte.
        assert_eq!(record.len(), (IV_LEN + 32) * 2);
        assert_eq!(hex_to_bytes(&record)?.len(), IV_LEN + 32);
        Ok(())
    }

    #[test]
    fn ciphertext_differs_across_calls() {
        let key = random_key32();
        let a = encrypt(&key, "same-secret");
        let b = encrypt(&key, "same-secret");
        assert_ne!(a, b, "records must differ thanks to the random IV");
    }

    #[test]
    fn wrong_secret_decrypts_silently_to_garbage() -> eyre::Result<()> {
        let key = random_key32();
        let record = encrypt(&key, "right");
        let out = decrypt(&record, "wrong")?;
        assert_eq!(out.len(), key.len());
        assert_ne!(out.as_slice(), key.as_slice());
        Ok(())
    }

    #[test]
    fn short_record_is_a_format_error() {
        let err = decrypt("aabb", "s");
        assert!(matches!(err, Err(SignerError::Format(_))), "got {err:?}");
    }

    #[test]
    fn malformed_hex_is_a_format_error() {
        let err = decrypt("not hex at all", "s");
        assert!(matches!(err, Err(SignerError::Format(_))), "got {err:?}");
    }

    #[test]
    fn plaintext_longer_than_hash_output_roundtrips() -> eyre::Result<()> {
        // 80 bytes forces the keystream to cycle past its 32-byte period.
        let mut long = [0_u8; 80];
        fill_random(&mut long);
        let record = encrypt(&long, "s");
        let out = decrypt(&record, "s")?;
        assert_eq!(out.as_slice(), long.as_slice());
        Ok(())
    }
}
