use merx_core::config::{ModifierConfig, PricingConfig};
use merx_core::money::Money;
use merx_core::Result;

use crate::modifier::{PriceModifier, PricedAmount, PricingContext};
use crate::modifiers::{DiscountModifier, ShippingModifier, TaxModifier, VoucherModifier};

/// Applies a configured chain of price modifiers in order.
///
/// Construction validates every stage; a bad chain never makes it to pricing
/// time. Calculation is pure: the same base amount and context always yield
/// the same result.
pub struct PriceCalculator {
    modifiers: Vec<Box<dyn PriceModifier>>,
}

impl PriceCalculator {
    pub fn new(modifiers: Vec<Box<dyn PriceModifier>>) -> Self {
        Self { modifiers }
    }

    /// Build the pipeline from configuration, in configured order.
    pub fn from_config(config: &PricingConfig) -> Result<Self> {
        let mut modifiers: Vec<Box<dyn PriceModifier>> = Vec::with_capacity(config.modifiers.len());
        for entry in &config.modifiers {
            let stage: Box<dyn PriceModifier> = match entry {
                ModifierConfig::Tax { name, rate_percent } => {
                    Box::new(TaxModifier::new(name.clone(), *rate_percent)?)
                }
                ModifierConfig::Discount {
                    name,
                    percent,
                    absolute,
                    min_subtotal,
                } => Box::new(DiscountModifier::new(
                    name.clone(),
                    *percent,
                    *absolute,
                    *min_subtotal,
                )?),
                ModifierConfig::Shipping {
                    name,
                    charge,
                    free_above,
                } => Box::new(ShippingModifier::new(name.clone(), *charge, *free_above)?),
                ModifierConfig::Voucher { name, code, amount } => {
                    Box::new(VoucherModifier::new(name.clone(), code.clone(), *amount)?)
                }
            };
            modifiers.push(stage);
        }
        Ok(Self::new(modifiers))
    }

    /// Run the pipeline over a base amount.
    pub fn calculate(&self, base: &Money, ctx: &PricingContext) -> Result<PricedAmount> {
        let mut running = PricedAmount::from_base(base);
        for modifier in &self.modifiers {
            if let Some(modification) = modifier.apply(&running, ctx)? {
                tracing::debug!(
                    modifier = modifier.name(),
                    delta = %modification.delta,
                    "price modification applied"
                );
                running.push(modification);
            }
        }
        Ok(running)
    }
}
