use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Top-level checkout configuration, one entry per tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutConfig {
    pub default_currency: String,
    pub tenants: HashMap<String, TenantConfig>,
}

impl CheckoutConfig {
    pub fn tenant(&self, name: &str) -> Result<&TenantConfig> {
        self.tenants
            .get(name)
            .ok_or_else(|| Error::Configuration(format!("unknown tenant '{name}'")))
    }
}

/// Per-tenant bindings: which cart/order/agent implementations to use and how
/// to price and charge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantConfig {
    #[serde(default = "default_binding")]
    pub cart_manager_id: String,
    #[serde(default = "default_binding")]
    pub order_manager_id: String,
    #[serde(default = "default_binding")]
    pub agent_factory_id: String,
    pub pricing: PricingConfig,
    pub payment: PaymentConfig,
}

fn default_binding() -> String {
    "default".to_string()
}

/// Ordered price-modifier chain. The order of `modifiers` is the order of
/// application; it is never sorted or inferred.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PricingConfig {
    pub modifiers: Vec<ModifierConfig>,
}

/// One stage of the pricing pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModifierConfig {
    Tax {
        name: String,
        rate_percent: Decimal,
    },
    Discount {
        name: String,
        percent: Option<Decimal>,
        absolute: Option<Decimal>,
        min_subtotal: Option<Decimal>,
    },
    Shipping {
        name: String,
        charge: Decimal,
        free_above: Option<Decimal>,
    },
    Voucher {
        name: String,
        code: String,
        amount: Decimal,
    },
}

/// Payment provider binding and credentials for one tenant.
#[derive(Clone, Serialize, Deserialize)]
pub struct PaymentConfig {
    /// Registry key of the provider adapter, e.g. "hosted" or "mock".
    pub provider: String,
    /// Shared secret used to fingerprint gateway callbacks. Never logged.
    pub secret: String,
    pub gateway_url: Option<String>,
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl std::fmt::Debug for PaymentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentConfig")
            .field("provider", &self.provider)
            .field("secret", &"<redacted>")
            .field("gateway_url", &self.gateway_url)
            .field("options", &self.options)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifier_config_roundtrip() {
        let json = r#"{
            "default_currency": "EUR",
            "tenants": {
                "web": {
                    "pricing": {
                        "modifiers": [
                            {"kind": "tax", "name": "vat", "rate_percent": "19"},
                            {"kind": "shipping", "name": "standard", "charge": "4.90", "free_above": "100"}
                        ]
                    },
                    "payment": {"provider": "mock", "secret": "s3cret", "gateway_url": null}
                }
            }
        }"#;

        let cfg: CheckoutConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.default_currency, "EUR");
        let tenant = cfg.tenant("web").unwrap();
        assert_eq!(tenant.cart_manager_id, "default");
        assert_eq!(tenant.pricing.modifiers.len(), 2);
        assert!(matches!(
            tenant.pricing.modifiers[0],
            ModifierConfig::Tax { .. }
        ));
    }

    #[test]
    fn test_unknown_tenant_is_configuration_error() {
        let cfg = CheckoutConfig {
            default_currency: "EUR".to_string(),
            tenants: HashMap::new(),
        };
        assert!(matches!(
            cfg.tenant("missing"),
            Err(Error::Configuration(_))
        ));
    }
}
