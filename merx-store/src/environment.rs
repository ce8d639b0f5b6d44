use std::collections::HashMap;
use std::sync::Arc;

use merx_core::config::{CheckoutConfig, TenantConfig};
use merx_core::{Error, Result};
use merx_order::{OrderManager, OrderStore};
use merx_payment::{PaymentProvider, ProviderRegistry};
use merx_pricing::PriceCalculator;

/// The only binding implementation shipped in this workspace. Configuration
/// naming anything else is rejected at startup.
const DEFAULT_BINDING: &str = "default";

struct TenantRuntime {
    calculator: Arc<PriceCalculator>,
    provider: Arc<dyn PaymentProvider>,
}

/// Fully resolved checkout configuration: every tenant's pricing pipeline and
/// payment provider built and validated eagerly, so a broken binding fails at
/// startup rather than at the first checkout.
pub struct CheckoutEnvironment {
    default_currency: String,
    tenants: HashMap<String, TenantRuntime>,
}

impl CheckoutEnvironment {
    pub fn from_config(config: &CheckoutConfig) -> Result<Self> {
        if config.default_currency.is_empty() {
            return Err(Error::Configuration("empty default_currency".to_string()));
        }

        let mut tenants = HashMap::new();
        for (name, tenant) in &config.tenants {
            validate_bindings(name, tenant)?;
            let calculator = PriceCalculator::from_config(&tenant.pricing)
                .map_err(|e| Error::Configuration(format!("tenant '{name}': {e}")))?;
            let provider = ProviderRegistry::build(&tenant.payment)
                .map_err(|e| Error::Configuration(format!("tenant '{name}': {e}")))?;
            tenants.insert(
                name.clone(),
                TenantRuntime {
                    calculator: Arc::new(calculator),
                    provider,
                },
            );
            tracing::info!(tenant = %name, "checkout tenant resolved");
        }

        Ok(Self {
            default_currency: config.default_currency.clone(),
            tenants,
        })
    }

    /// Load configuration from `config/checkout.*` plus `MERX__`-prefixed
    /// environment overrides, then resolve it.
    pub fn load() -> Result<Self> {
        let raw = config::Config::builder()
            .add_source(config::File::with_name("config/checkout"))
            .add_source(config::Environment::with_prefix("MERX").separator("__"))
            .build()
            .map_err(|e| Error::Configuration(e.to_string()))?;
        let parsed: CheckoutConfig = raw
            .try_deserialize()
            .map_err(|e| Error::Configuration(e.to_string()))?;
        Self::from_config(&parsed)
    }

    pub fn default_currency(&self) -> &str {
        &self.default_currency
    }

    pub fn calculator(&self, tenant: &str) -> Result<Arc<PriceCalculator>> {
        Ok(Arc::clone(&self.runtime(tenant)?.calculator))
    }

    pub fn provider(&self, tenant: &str) -> Result<Arc<dyn PaymentProvider>> {
        Ok(Arc::clone(&self.runtime(tenant)?.provider))
    }

    /// Build an order manager for one tenant over the given store.
    pub fn order_manager(&self, tenant: &str, store: Arc<dyn OrderStore>) -> Result<OrderManager> {
        let runtime = self.runtime(tenant)?;
        Ok(OrderManager::new(
            store,
            Arc::clone(&runtime.calculator),
            Arc::clone(&runtime.provider),
        ))
    }

    fn runtime(&self, tenant: &str) -> Result<&TenantRuntime> {
        self.tenants
            .get(tenant)
            .ok_or_else(|| Error::Configuration(format!("unknown tenant '{tenant}'")))
    }
}

fn validate_bindings(name: &str, tenant: &TenantConfig) -> Result<()> {
    for (key, value) in [
        ("cart_manager_id", &tenant.cart_manager_id),
        ("order_manager_id", &tenant.order_manager_id),
        ("agent_factory_id", &tenant.agent_factory_id),
    ] {
        if value != DEFAULT_BINDING {
            return Err(Error::Configuration(format!(
                "tenant '{name}': unresolved {key} binding '{value}'"
            )));
        }
    }
    Ok(())
}
