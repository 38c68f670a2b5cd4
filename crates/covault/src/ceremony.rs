//! The 2-of-2 co-signing ceremony.
//!
//! Strictly sequential per ceremony: hardware signature over the message
//! hash, per-ceremony encryption secret from the same hardware key, local
//! decryption, software secp256k1 signature, composite assembly. Multiple
//! ceremonies may run concurrently, each correlated by its own bridge
//! request ids.

use crate::bridge::{NativeBridge, RequestKind};
use crate::errors::SignerError;
use crate::hexutil::bytes_to_hex;
use crate::keycipher;
use crate::secp;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// The final 2-of-2 authorization: a hardware signature and a software
/// secp256k1 signature bound to the identical message hash.
///
/// Only ever assembled after both halves succeeded; partial results are
/// never exposed to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositeSignature {
    pub hw_signature: String,
    pub hw_algorithm: String,
    pub hw_key_id: String,
    pub secp_signature: String,
    pub secp_recovery: u8,
    pub message_hash: String,
    /// Unix millis at assembly time.
    pub timestamp: i64,
}

/// Run the full co-signing ceremony for `message`.
///
/// `encrypted_secp_key` is the persisted [`keycipher`] record; `hw_key_id`
/// names the hardware key whose round trip both authorizes the hash (and
/// triggers the user's biometric on a real device) and yields the decryption
/// secret. Any failing step aborts the whole ceremony with that step's
/// error; the recovered private key is zeroed on every exit path.
pub async fn sign_two_party(
    message: &[u8],
    encrypted_secp_key: &str,
    hw_key_id: &str,
    bridge: &NativeBridge,
) -> Result<CompositeSignature, SignerError> {
    let message_hash = bytes_to_hex(&secp::message_digest(message));
    tracing::info!(%hw_key_id, %message_hash, "starting co-signing ceremony");

    // Hardware authorization comes first: no local secret is touched until
    // the secure module has approved this exact hash.
    let hw = bridge
        .send(
            RequestKind::SignWithHw,
            json!({ "keyId": hw_key_id, "messageHash": message_hash }),
        )
        .await?;
    let hw_signature = require_str(&hw, "signature")?;
    let hw_algorithm = require_str(&hw, "algorithm")?;
    let hw_key = require_str(&hw, "keyId")?;

    let secret = bridge
        .send(RequestKind::DeriveEncKey, json!({ "keyId": hw_key_id }))
        .await?;
    let Value::String(secret) = secret else {
        return Err(SignerError::Bridge(
            "DERIVE_ENC_KEY result is not a string".to_owned(),
        ));
    };

    // Decryption is total; a wrong secret only surfaces as a software
    // signature that fails verification downstream.
    let private_key = keycipher::decrypt(encrypted_secp_key, &secret)?;
    let signed = secp::sign(message, &private_key);
    // Zeroed here on success and failure alike, before the error can escape.
    drop(private_key);
    let secp_sig = signed?;

    tracing::info!(%hw_key_id, "co-signing ceremony complete");
    Ok(CompositeSignature {
        hw_signature,
        hw_algorithm,
        hw_key_id: hw_key,
        secp_signature: secp_sig.signature,
        secp_recovery: secp_sig.recovery,
        message_hash: secp_sig.message_hash,
        timestamp: chrono::Utc::now().timestamp_millis(),
    })
}

fn require_str(v: &Value, field: &str) -> Result<String, SignerError> {
    v.get(field)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| SignerError::Bridge(format!("hardware reply missing `{field}`")))
}
