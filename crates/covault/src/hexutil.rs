use crate::errors::SignerError;

/// Decode a hex string into bytes.
///
/// Fail-fast: odd length or a non-hex digit anywhere is a
/// [`SignerError::Format`], never a truncated result.
pub fn hex_to_bytes(s: &str) -> Result<Vec<u8>, SignerError> {
    Ok(hex::decode(s)?)
}

/// Encode bytes as lowercase hex, two zero-padded digits per byte. Total.
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}
