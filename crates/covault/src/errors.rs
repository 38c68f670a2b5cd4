use thiserror::Error;

/// Error taxonomy for the signing core.
///
/// Signature verification failure is deliberately not represented here:
/// [`crate::secp::verify`] returns `false` for any malformed or mismatching
/// input because a failed verification is an expected outcome callers branch
/// on, not an exceptional condition.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignerError {
    /// Malformed hex or byte input. Local and recoverable: the caller must
    /// re-supply valid input.
    #[error("malformed input: {0}")]
    Format(String),

    /// A bridge request went unanswered within the configured window. The
    /// ceremony aborts; no retry is performed automatically.
    #[error("native request timeout ({0}s)")]
    Timeout(u64),

    /// The hardware module reported a failure. Its message is surfaced
    /// verbatim.
    #[error("native error: {0}")]
    Native(String),

    /// The entropy source is unavailable. Fatal to the calling operation.
    #[error("entropy source unavailable")]
    KeyGen,

    /// Local transport fault or a reply whose shape does not match the
    /// request contract. Distinct from [`SignerError::Native`] so callers can
    /// tell a broken bridge from a hardware-side refusal.
    #[error("bridge error: {0}")]
    Bridge(String),
}

impl From<hex::FromHexError> for SignerError {
    fn from(e: hex::FromHexError) -> Self {
        Self::Format(e.to_string())
    }
}
