use merx_core::{Error, Result};
use rust_decimal::Decimal;

use crate::modifier::{ModificationKind, PriceModification, PriceModifier, PricedAmount, PricingContext};

/// Percentage tax over the running gross amount. Gross-only.
pub struct TaxModifier {
    name: String,
    rate_percent: Decimal,
}

impl TaxModifier {
    pub fn new(name: impl Into<String>, rate_percent: Decimal) -> Result<Self> {
        let name = name.into();
        if rate_percent.is_sign_negative() {
            return Err(Error::Configuration(format!(
                "tax modifier '{name}': negative rate {rate_percent}"
            )));
        }
        Ok(Self { name, rate_percent })
    }
}

impl PriceModifier for TaxModifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(
        &self,
        running: &PricedAmount,
        _ctx: &PricingContext,
    ) -> Result<Option<PriceModification>> {
        let delta = running.gross * self.rate_percent / Decimal::ONE_HUNDRED;
        Ok(Some(PriceModification {
            name: self.name.clone(),
            delta,
            kind: ModificationKind::Gross,
        }))
    }
}

enum DiscountMode {
    Percent(Decimal),
    Absolute(Decimal),
}

/// Percentage or absolute discount, optionally gated on a minimum subtotal.
pub struct DiscountModifier {
    name: String,
    mode: DiscountMode,
    min_subtotal: Option<Decimal>,
}

impl DiscountModifier {
    pub fn new(
        name: impl Into<String>,
        percent: Option<Decimal>,
        absolute: Option<Decimal>,
        min_subtotal: Option<Decimal>,
    ) -> Result<Self> {
        let name = name.into();
        let mode = match (percent, absolute) {
            (Some(p), None) => DiscountMode::Percent(p),
            (None, Some(a)) => DiscountMode::Absolute(a),
            _ => {
                return Err(Error::Configuration(format!(
                    "discount modifier '{name}': exactly one of percent/absolute required"
                )))
            }
        };
        let value = match mode {
            DiscountMode::Percent(p) => p,
            DiscountMode::Absolute(a) => a,
        };
        if value.is_sign_negative() {
            return Err(Error::Configuration(format!(
                "discount modifier '{name}': negative discount"
            )));
        }
        Ok(Self {
            name,
            mode,
            min_subtotal,
        })
    }
}

impl PriceModifier for DiscountModifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(
        &self,
        running: &PricedAmount,
        _ctx: &PricingContext,
    ) -> Result<Option<PriceModification>> {
        if let Some(min) = self.min_subtotal {
            if running.net < min {
                return Ok(None);
            }
        }
        let delta = match self.mode {
            DiscountMode::Percent(p) => -(running.net * p / Decimal::ONE_HUNDRED),
            DiscountMode::Absolute(a) => -a,
        };
        Ok(Some(PriceModification {
            name: self.name.clone(),
            delta,
            kind: ModificationKind::Net,
        }))
    }
}

/// Flat shipping charge, waived above an optional free-shipping threshold.
pub struct ShippingModifier {
    name: String,
    charge: Decimal,
    free_above: Option<Decimal>,
}

impl ShippingModifier {
    pub fn new(
        name: impl Into<String>,
        charge: Decimal,
        free_above: Option<Decimal>,
    ) -> Result<Self> {
        let name = name.into();
        if charge.is_sign_negative() {
            return Err(Error::Configuration(format!(
                "shipping modifier '{name}': negative charge {charge}"
            )));
        }
        Ok(Self {
            name,
            charge,
            free_above,
        })
    }
}

impl PriceModifier for ShippingModifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(
        &self,
        running: &PricedAmount,
        _ctx: &PricingContext,
    ) -> Result<Option<PriceModification>> {
        if self.free_above.is_some_and(|t| running.net >= t) {
            return Ok(None);
        }
        Ok(Some(PriceModification {
            name: self.name.clone(),
            delta: self.charge,
            kind: ModificationKind::Net,
        }))
    }
}

/// Fixed-amount voucher, applied only when its code was presented and clamped
/// so the running gross never goes negative.
pub struct VoucherModifier {
    name: String,
    code: String,
    amount: Decimal,
}

impl VoucherModifier {
    pub fn new(
        name: impl Into<String>,
        code: impl Into<String>,
        amount: Decimal,
    ) -> Result<Self> {
        let name = name.into();
        let code = code.into();
        if code.is_empty() {
            return Err(Error::Configuration(format!(
                "voucher modifier '{name}': empty code"
            )));
        }
        if amount.is_sign_negative() {
            return Err(Error::Configuration(format!(
                "voucher modifier '{name}': negative amount {amount}"
            )));
        }
        Ok(Self { name, code, amount })
    }
}

impl PriceModifier for VoucherModifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(
        &self,
        running: &PricedAmount,
        ctx: &PricingContext,
    ) -> Result<Option<PriceModification>> {
        if !ctx.voucher_codes.iter().any(|c| c == &self.code) {
            return Ok(None);
        }
        let delta = -self.amount.min(running.gross.max(Decimal::ZERO));
        Ok(Some(PriceModification {
            name: self.name.clone(),
            delta,
            kind: ModificationKind::Net,
        }))
    }
}
