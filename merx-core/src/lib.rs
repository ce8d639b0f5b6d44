pub mod config;
pub mod error;
pub mod money;

pub use config::{CheckoutConfig, ModifierConfig, PaymentConfig, PricingConfig, TenantConfig};
pub use error::{Error, Result};
pub use money::Money;
