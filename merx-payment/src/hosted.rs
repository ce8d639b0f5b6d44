use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use merx_core::money::Money;
use merx_core::{Error, Result};

use crate::fingerprint;
use crate::provider::{InitPaymentResponse, PaymentProvider, PaymentRequest};
use crate::status::PaymentStatus;

/// Redirect-flow gateway adapter: the customer is sent to the gateway's
/// hosted payment page with signed parameters, the gateway calls back with a
/// fingerprinted result. Debit and credit run server-to-server.
pub struct HostedGateway {
    name: String,
    secret: String,
    base_url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl HostedGateway {
    pub fn new(
        name: impl Into<String>,
        secret: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Configuration(format!("http client: {e}")))?;
        Ok(Self {
            name: name.into(),
            secret: secret.into(),
            base_url: base_url.into(),
            timeout,
            client,
        })
    }

    fn signed_params(
        &self,
        price: &Money,
        reference: &str,
        extra: &[(&str, &str)],
    ) -> Result<BTreeMap<String, String>> {
        let amount = price.rounded().amount().to_string();
        let fingerprint =
            fingerprint::sign(&self.secret, &[&amount, price.currency(), reference])?;

        let mut params = BTreeMap::from([
            ("amount".to_string(), amount),
            ("currency".to_string(), price.currency().to_string()),
            ("reference".to_string(), reference.to_string()),
            ("fingerprint".to_string(), fingerprint),
        ]);
        for (key, value) in extra {
            params.insert((*key).to_string(), (*value).to_string());
        }
        Ok(params)
    }

    async fn post(
        &self,
        endpoint: &str,
        params: &BTreeMap<String, String>,
    ) -> Result<BTreeMap<String, String>> {
        let url = format!("{}/{endpoint}", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .form(params)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            return Err(Error::Gateway(format!(
                "gateway returned HTTP {}",
                response.status()
            )));
        }

        response
            .json::<BTreeMap<String, String>>()
            .await
            .map_err(|e| self.transport_error(e))
    }

    fn transport_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::GatewayTimeout(self.timeout)
        } else {
            // reqwest errors never carry the request body, so the shared
            // secret cannot leak here.
            Error::Gateway(e.to_string())
        }
    }
}

#[async_trait]
impl PaymentProvider for HostedGateway {
    fn name(&self) -> &str {
        &self.name
    }

    async fn init_payment(
        &self,
        price: &Money,
        request: &PaymentRequest,
    ) -> Result<InitPaymentResponse> {
        let mut extra: Vec<(&str, &str)> = Vec::new();
        if let Some(url) = &request.return_url {
            extra.push(("return_url", url));
        }
        if let Some(description) = &request.description {
            extra.push(("description", description));
        }
        let params = self.signed_params(price, &request.reference, &extra)?;

        tracing::info!(
            provider = %self.name,
            reference = %request.reference,
            "payment initialized, redirecting to gateway"
        );
        Ok(InitPaymentResponse::Redirect {
            url: format!("{}/pay", self.base_url.trim_end_matches('/')),
            params,
        })
    }

    async fn handle_response(&self, raw: &BTreeMap<String, String>) -> Result<PaymentStatus> {
        let status = fingerprint::verified_callback_status(&self.secret, raw)?;
        tracing::info!(
            provider = %self.name,
            reference = %status.reference,
            state = status.state.as_str(),
            "gateway callback verified"
        );
        Ok(status)
    }

    async fn execute_debit(&self, price: &Money, reference: &str) -> Result<PaymentStatus> {
        let params = self.signed_params(price, reference, &[("operation", "debit")])?;
        let response = self.post("debit", &params).await?;
        fingerprint::verified_callback_status(&self.secret, &response)
    }

    async fn execute_credit(
        &self,
        price: &Money,
        reference: &str,
        transaction_id: &str,
    ) -> Result<PaymentStatus> {
        let params = self.signed_params(
            price,
            reference,
            &[("operation", "credit"), ("transaction_id", transaction_id)],
        )?;
        let response = self.post("credit", &params).await?;
        fingerprint::verified_callback_status(&self.secret, &response)
    }
}

// The shared secret must never appear in logs.
impl std::fmt::Debug for HostedGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostedGateway")
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .field("secret", &"<redacted>")
            .finish()
    }
}
