use std::sync::Arc;
use std::time::Duration;

use merx_core::config::PaymentConfig;
use merx_core::{Error, Result};

use crate::hosted::HostedGateway;
use crate::mock::MockGateway;
use crate::provider::PaymentProvider;

const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(30);

/// Name-keyed adapter factory, resolved when configuration is loaded.
/// An unknown provider name fails here, never at first use.
pub struct ProviderRegistry;

impl ProviderRegistry {
    pub fn build(config: &PaymentConfig) -> Result<Arc<dyn PaymentProvider>> {
        if config.secret.is_empty() {
            return Err(Error::Configuration(format!(
                "payment provider '{}': empty shared secret",
                config.provider
            )));
        }

        match config.provider.as_str() {
            "mock" => Ok(Arc::new(MockGateway::new(&config.secret))),
            "hosted" => {
                let url = config.gateway_url.as_deref().ok_or_else(|| {
                    Error::Configuration("hosted provider requires gateway_url".to_string())
                })?;
                let timeout = match config.options.get("timeout_secs") {
                    Some(raw) => Duration::from_secs(raw.parse().map_err(|_| {
                        Error::Configuration(format!("invalid timeout_secs '{raw}'"))
                    })?),
                    None => DEFAULT_GATEWAY_TIMEOUT,
                };
                Ok(Arc::new(HostedGateway::new(
                    "hosted",
                    &config.secret,
                    url,
                    timeout,
                )?))
            }
            other => Err(Error::Configuration(format!(
                "unknown payment provider '{other}'"
            ))),
        }
    }
}
