use std::collections::BTreeMap;

use async_trait::async_trait;
use merx_core::money::Money;
use merx_core::Result;

use crate::fingerprint;
use crate::provider::{InitPaymentResponse, PaymentProvider, PaymentRequest};
use crate::status::PaymentStatus;

/// In-process gateway with deterministic outcomes. Uses the same fingerprint
/// scheme as the hosted adapter, so callback verification behaves exactly
/// like production.
pub struct MockGateway {
    secret: String,
}

impl MockGateway {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Build a validly fingerprinted callback, as the gateway would deliver
    /// it. `state` uses the gateway vocabulary (SUCCESS, AUTHORIZED, ...).
    pub fn signed_callback(
        &self,
        reference: &str,
        transaction_id: &str,
        state: &str,
    ) -> Result<BTreeMap<String, String>> {
        let fingerprint =
            fingerprint::sign(&self.secret, &[reference, transaction_id, state])?;
        Ok(BTreeMap::from([
            ("reference".to_string(), reference.to_string()),
            ("transaction_id".to_string(), transaction_id.to_string()),
            ("state".to_string(), state.to_string()),
            ("fingerprint".to_string(), fingerprint),
        ]))
    }

    fn status(
        &self,
        reference: &str,
        transaction_id: String,
        message: &str,
    ) -> Result<PaymentStatus> {
        let raw = self.signed_callback(reference, &transaction_id, "SUCCESS")?;
        let mut status = fingerprint::verified_callback_status(&self.secret, &raw)?;
        status.message = message.to_string();
        Ok(status)
    }
}

#[async_trait]
impl PaymentProvider for MockGateway {
    fn name(&self) -> &str {
        "mock"
    }

    async fn init_payment(
        &self,
        price: &Money,
        request: &PaymentRequest,
    ) -> Result<InitPaymentResponse> {
        let amount = price.rounded().amount().to_string();
        let fingerprint = fingerprint::sign(
            &self.secret,
            &[&amount, price.currency(), &request.reference],
        )?;
        Ok(InitPaymentResponse::Form {
            action: "mock://gateway/pay".to_string(),
            fields: BTreeMap::from([
                ("amount".to_string(), amount),
                ("currency".to_string(), price.currency().to_string()),
                ("reference".to_string(), request.reference.clone()),
                ("fingerprint".to_string(), fingerprint),
            ]),
        })
    }

    async fn handle_response(&self, raw: &BTreeMap<String, String>) -> Result<PaymentStatus> {
        fingerprint::verified_callback_status(&self.secret, raw)
    }

    async fn execute_debit(&self, _price: &Money, reference: &str) -> Result<PaymentStatus> {
        self.status(reference, format!("dbt-{reference}"), "debit executed")
    }

    async fn execute_credit(
        &self,
        _price: &Money,
        reference: &str,
        transaction_id: &str,
    ) -> Result<PaymentStatus> {
        self.status(
            reference,
            format!("crd-{transaction_id}"),
            "credit executed",
        )
    }
}

impl std::fmt::Debug for MockGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockGateway")
            .field("secret", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::PaymentState;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_signed_callback_passes_handle_response() {
        let gw = MockGateway::new("s3cret");
        let raw = gw.signed_callback("ref-1", "txn-1", "SUCCESS").unwrap();
        let status = gw.handle_response(&raw).await.unwrap();
        assert_eq!(status.state, PaymentState::Cleared);
    }

    #[tokio::test]
    async fn test_tampered_callback_rejected() {
        let gw = MockGateway::new("s3cret");
        let mut raw = gw.signed_callback("ref-1", "txn-1", "SUCCESS").unwrap();
        raw.insert("state".to_string(), "CANCELLED".to_string());
        assert!(matches!(
            gw.handle_response(&raw).await,
            Err(merx_core::Error::Verification(_))
        ));
    }

    #[tokio::test]
    async fn test_debit_clears() {
        let gw = MockGateway::new("s3cret");
        let price = Money::new(dec!(10.00), "EUR");
        let status = gw.execute_debit(&price, "ref-1").await.unwrap();
        assert_eq!(status.state, PaymentState::Cleared);
        assert_eq!(status.transaction_id, "dbt-ref-1");
    }
}
