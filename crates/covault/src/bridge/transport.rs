//! Transport strategies for the native bridge.
//!
//! The host application supplies a [`BridgeTransport`] backed by its real
//! native layer (`WebView` message channel, JNI, ...). When no hardware module
//! is attached — local development, web preview, unit tests — the
//! [`SimulatedTransport`] stands in and synthesizes plausible replies.

use super::{BridgeRequest, DeliveryHandle, RequestKind, ResponseEnvelope};
use crate::errors::SignerError;
use serde_json::{json, Value};
use std::time::Duration;

/// How outbound frames reach the secure module.
///
/// `transmit` only hands the frame off; the reply arrives later through the
/// [`DeliveryHandle`], from whatever task pumps the inbound side.
#[async_trait::async_trait]
pub trait BridgeTransport: Send + Sync {
    async fn transmit(
        &self,
        request: BridgeRequest,
        delivery: DeliveryHandle,
    ) -> Result<(), SignerError>;
}

/// No-hardware fallback: answers every request with a canned reply after a
/// short artificial delay.
///
/// Every reply is marked `"simulated"` (a `simulated: true` field, or a
/// `simulated_` prefix for plain-string results) so it can never be mistaken
/// for a genuine hardware-backed result.
pub struct SimulatedTransport {
    delay: Duration,
}

impl SimulatedTransport {
    pub const fn new(delay: Duration) -> Self {
        Self { delay }
    }

    fn canned_response(request: &BridgeRequest) -> Value {
        let key_id = request
            .payload
            .get("keyId")
            .and_then(Value::as_str)
            .unwrap_or("sim");
        let now_millis = chrono::Utc::now().timestamp_millis();
        match request.kind {
            RequestKind::CheckSecurity => json!({
                "hasSecureEnclave": false,
                "hasStrongBox": false,
                "hasBiometric": true,
                "platform": "simulated",
                "securityLevel": "software",
                "simulated": true,
            }),
            RequestKind::GenerateHwKey => json!({
                "keyId": format!("hw_{now_millis}"),
                "publicKey": format!("02{}", "a".repeat(64)),
                "algorithm": "P-256",
                "createdAt": now_millis,
                "simulated": true,
            }),
            RequestKind::DeriveEncKey => {
                Value::String(format!("simulated_encryption_key_{key_id}"))
            }
            RequestKind::SignWithHw => json!({
                "signature": format!("simulated_hw_sig_{}", "b".repeat(120)),
                "algorithm": "P-256-SHA256",
                "keyId": key_id,
                "simulated": true,
            }),
            RequestKind::ListKeys => Value::Array(vec![]),
        }
    }
}

#[async_trait::async_trait]
impl BridgeTransport for SimulatedTransport {
    async fn transmit(
        &self,
        request: BridgeRequest,
        delivery: DeliveryHandle,
    ) -> Result<(), SignerError> {
        tracing::debug!(
            request_id = %request.request_id,
            kind = ?request.kind,
            "no native transport attached; synthesizing reply"
        );
        let delay = self.delay;
        drop(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let result = Self::canned_response(&request);
            delivery.deliver(ResponseEnvelope {
                request_id: request.request_id,
                success: true,
                result,
                error: None,
            });
        }));
        Ok(())
    }
}
