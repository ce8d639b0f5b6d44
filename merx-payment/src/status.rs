use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Payment lifecycle state as reported by a gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentState {
    Open,
    Authorized,
    Cleared,
    Cancelled,
}

impl PaymentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentState::Open => "OPEN",
            PaymentState::Authorized => "AUTHORIZED",
            PaymentState::Cleared => "CLEARED",
            PaymentState::Cancelled => "CANCELLED",
        }
    }

    /// Cleared and Cancelled are absorbing.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentState::Cleared | PaymentState::Cancelled)
    }
}

/// Transient result of a gateway interaction. Never persisted directly;
/// consumed by the order agent to advance order and payment state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentStatus {
    /// Internal payment id minted at `start_payment`; the correlation key
    /// across the asynchronous gateway round trip.
    pub reference: String,
    /// Gateway-side transaction id.
    pub transaction_id: String,
    pub message: String,
    pub state: PaymentState,
    /// Provider-specific auxiliary data from the callback.
    pub data: BTreeMap<String, String>,
}

impl PaymentStatus {
    /// Content digest used as the "already applied" marker when absorbing
    /// redelivered callbacks.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.reference.as_bytes());
        hasher.update(b"\n");
        hasher.update(self.transaction_id.as_bytes());
        hasher.update(b"\n");
        hasher.update(self.state.as_str().as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(state: PaymentState, txn: &str) -> PaymentStatus {
        PaymentStatus {
            reference: "ref-1".to_string(),
            transaction_id: txn.to_string(),
            message: String::new(),
            state,
            data: BTreeMap::new(),
        }
    }

    #[test]
    fn test_digest_stable_for_equal_statuses() {
        let a = status(PaymentState::Cleared, "txn-1");
        let b = status(PaymentState::Cleared, "txn-1");
        assert_eq!(a.digest(), b.digest());
    }

    #[test]
    fn test_digest_differs_across_states() {
        let a = status(PaymentState::Authorized, "txn-1");
        let b = status(PaymentState::Cleared, "txn-1");
        assert_ne!(a.digest(), b.digest());
    }

    #[test]
    fn test_terminal_states() {
        assert!(PaymentState::Cleared.is_terminal());
        assert!(PaymentState::Cancelled.is_terminal());
        assert!(!PaymentState::Authorized.is_terminal());
        assert!(!PaymentState::Open.is_terminal());
    }
}
