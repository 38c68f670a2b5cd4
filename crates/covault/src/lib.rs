//! Signing core for a hybrid-custody wallet.
//!
//! A transaction authorization requires two signatures over the same message
//! hash: one from a hardware-backed key held by an external secure module
//! (secure enclave / `StrongBox`, gated by biometrics) and one from a software
//! secp256k1 key that is encrypted at rest. Neither secret alone can move
//! funds.
//!
//! The pieces:
//! - [`hexutil`]: hex/byte conversions.
//! - [`keycipher`]: at-rest encryption of the software private key.
//! - [`secp`]: secp256k1 keygen, deterministic signing, verification.
//! - [`bridge`]: request/response correlation with the secure module,
//!   including a simulated transport for running without real hardware.
//! - [`ceremony`]: the 2-of-2 co-signing ceremony tying it all together.
//!
//! Raw private key material only ever lives in [`zeroize::Zeroizing`] buffers
//! and is wiped on every exit path. The only secret-derived artifact that may
//! be persisted is the encrypted key record produced by [`keycipher`].

pub mod bridge;
pub mod ceremony;
pub mod errors;
pub mod hexutil;
pub mod keycipher;
pub mod secp;

pub use bridge::{
    BridgeConfig, BridgeRequest, DeliveryHandle, NativeBridge, RequestKind, ResponseEnvelope,
};
pub use ceremony::{sign_two_party, CompositeSignature};
pub use errors::SignerError;
pub use secp::{Keypair, SignatureResult};
