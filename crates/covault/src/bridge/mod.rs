//! Request/response bridge to the external secure module.
//!
//! One-shot correlation: every outbound request gets a process-unique id and
//! a pending entry; the transport (or its simulated stand-in) later delivers
//! a reply envelope carrying that id. An entry is completed exactly once —
//! matching delivery or timeout, whichever fires first — and the loser is a
//! silent no-op because the entry is already gone.

pub mod transport;

use crate::errors::SignerError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;

pub use transport::{BridgeTransport, SimulatedTransport};

/// Request kinds recognized by the secure module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestKind {
    CheckSecurity,
    GenerateHwKey,
    DeriveEncKey,
    SignWithHw,
    ListKeys,
}

/// Outbound wire frame handed to the transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeRequest {
    #[serde(rename = "type")]
    pub kind: RequestKind,
    pub payload: Value,
    #[serde(rename = "requestId")]
    pub request_id: String,
}

/// Inbound reply frame from the transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    pub request_id: String,
    pub success: bool,
    #[serde(default)]
    pub result: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Hard per-request deadline; an unanswered request rejects with
    /// [`SignerError::Timeout`] after this long.
    pub request_timeout: Duration,
    /// Artificial latency the simulated transport adds before replying.
    pub simulated_delay: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            simulated_delay: Duration::from_millis(100),
        }
    }
}

type PendingTable = Mutex<HashMap<String, oneshot::Sender<Result<Value, SignerError>>>>;

/// Shared handle the transport side uses to complete in-flight requests.
///
/// Cloning is cheap; all clones point at the same pending table.
#[derive(Clone)]
pub struct DeliveryHandle {
    pending: Arc<PendingTable>,
}

impl DeliveryHandle {
    /// Complete the pending request named by the envelope.
    ///
    /// Unknown, duplicate, stale, or already-timed-out ids are a silent
    /// no-op — never an error.
    pub fn deliver(&self, envelope: ResponseEnvelope) {
        let sender = {
            let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
            pending.remove(&envelope.request_id)
        };
        let Some(tx) = sender else {
            tracing::debug!(
                request_id = %envelope.request_id,
                "reply has no pending request; dropping"
            );
            return;
        };
        let outcome = if envelope.success {
            Ok(envelope.result)
        } else {
            Err(SignerError::Native(
                envelope.error.unwrap_or_else(|| "native error".to_owned()),
            ))
        };
        // The waiter may already be gone (task dropped); fine either way.
        let _delivered = tx.send(outcome);
    }
}

/// Correlates outbound requests to the secure module with their async
/// replies, enforcing a hard per-request timeout.
///
/// Each instance owns its request table and id counter — no ambient globals —
/// so independent bridges coexist, notably in tests.
pub struct NativeBridge {
    transport: Arc<dyn BridgeTransport>,
    pending: Arc<PendingTable>,
    counter: AtomicU64,
    config: BridgeConfig,
}

impl NativeBridge {
    pub fn new(transport: Arc<dyn BridgeTransport>, config: BridgeConfig) -> Self {
        Self {
            transport,
            pending: Arc::new(Mutex::new(HashMap::new())),
            counter: AtomicU64::new(0),
            config,
        }
    }

    /// Bridge with no real hardware attached: replies are synthesized by
    /// [`SimulatedTransport`] and marked as such.
    pub fn simulated(config: BridgeConfig) -> Self {
        let delay = config.simulated_delay;
        Self::new(Arc::new(SimulatedTransport::new(delay)), config)
    }

    /// Handle for the host's inbound message pump to complete requests with.
    pub fn delivery_handle(&self) -> DeliveryHandle {
        DeliveryHandle {
            pending: Arc::clone(&self.pending),
        }
    }

    /// Convenience passthrough to [`DeliveryHandle::deliver`].
    pub fn deliver(&self, envelope: ResponseEnvelope) {
        self.delivery_handle().deliver(envelope);
    }

    // Monotonic counter + wall clock. Unique within the process lifetime;
    // ids are never reused or persisted.
    fn next_request_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        let millis = chrono::Utc::now().timestamp_millis();
        format!("req_{n}_{millis}")
    }

    /// Send one request and wait for its correlated reply or the timeout.
    pub async fn send(&self, kind: RequestKind, payload: Value) -> Result<Value, SignerError> {
        let request_id = self.next_request_id();
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
            pending.insert(request_id.clone(), tx);
        }

        let request = BridgeRequest {
            kind,
            payload,
            request_id: request_id.clone(),
        };
        tracing::debug!(%request_id, ?kind, "bridge send");
        if let Err(e) = self
            .transport
            .transmit(request, self.delivery_handle())
            .await
        {
            self.remove_pending(&request_id);
            return Err(e);
        }

        match tokio::time::timeout(self.config.request_timeout, rx).await {
            Ok(Ok(outcome)) => outcome,
            // The sender vanished without replying; surface as a transport
            // fault rather than hanging until the deadline.
            Ok(Err(_)) => {
                self.remove_pending(&request_id);
                Err(SignerError::Bridge("reply channel closed".to_owned()))
            }
            Err(_) => {
                // Removing the entry here makes any late delivery a no-op.
                self.remove_pending(&request_id);
                tracing::warn!(%request_id, ?kind, "bridge request timed out");
                Err(SignerError::Timeout(self.config.request_timeout.as_secs()))
            }
        }
    }

    fn remove_pending(&self, request_id: &str) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending.remove(request_id);
    }

    #[cfg(test)]
    fn pending_len(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
