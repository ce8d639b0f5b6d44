use std::collections::BTreeMap;

use async_trait::async_trait;
use merx_core::money::Money;
use merx_core::Result;
use serde::{Deserialize, Serialize};

use crate::status::PaymentStatus;

/// Per-payment parameters handed to `init_payment`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequest {
    /// Internal payment id; round-tripped through the gateway.
    pub reference: String,
    pub return_url: Option<String>,
    pub description: Option<String>,
}

impl PaymentRequest {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            return_url: None,
            description: None,
        }
    }
}

/// How the client continues the payment after initialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", tag = "kind")]
pub enum InitPaymentResponse {
    /// Send the customer to the gateway with these query parameters.
    Redirect {
        url: String,
        params: BTreeMap<String, String>,
    },
    /// Render a self-submitting form posting these fields.
    Form {
        action: String,
        fields: BTreeMap<String, String>,
    },
}

/// Uniform contract over heterogeneous payment gateways.
///
/// Adapters verify callback fingerprints themselves and never log the shared
/// secret. They hold no per-order state: one instance serves every order of a
/// tenant, and anything order-scoped (authorization data included) lives on
/// the order's payment record. They do not retry failed outbound calls; the
/// caller owns the retry policy and bounds every call with a timeout.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Registry key of this adapter.
    fn name(&self) -> &str;

    /// Start a payment for the given amount.
    async fn init_payment(
        &self,
        price: &Money,
        request: &PaymentRequest,
    ) -> Result<InitPaymentResponse>;

    /// Verify and interpret a raw gateway callback (form post or redirect
    /// query string).
    async fn handle_response(&self, raw: &BTreeMap<String, String>) -> Result<PaymentStatus>;

    /// Server-to-server charge against a previously initialized payment.
    async fn execute_debit(&self, price: &Money, reference: &str) -> Result<PaymentStatus>;

    /// Server-to-server (partial) refund of a cleared transaction.
    async fn execute_credit(
        &self,
        price: &Money,
        reference: &str,
        transaction_id: &str,
    ) -> Result<PaymentStatus>;
}
