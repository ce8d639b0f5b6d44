use merx_core::money::Money;
use merx_core::Result;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Whether a modification changes the net amount or only the gross amount.
///
/// `Net` modifications (discounts, shipping, vouchers) move both the net and
/// the gross running amount. `Gross` modifications (taxes) leave the net
/// amount untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModificationKind {
    Net,
    Gross,
}

/// One applied pipeline stage: a named, signed delta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceModification {
    pub name: String,
    pub delta: Decimal,
    pub kind: ModificationKind,
}

/// Context handed to every modifier: the cart or line item being priced.
#[derive(Debug, Clone)]
pub struct PricingContext {
    pub currency: String,
    /// Total quantity across the priced lines.
    pub quantity: Decimal,
    /// Voucher codes presented at checkout.
    pub voucher_codes: Vec<String>,
}

impl PricingContext {
    pub fn new(currency: impl Into<String>) -> Self {
        Self {
            currency: currency.into(),
            quantity: Decimal::ONE,
            voucher_codes: Vec::new(),
        }
    }

    pub fn with_quantity(mut self, quantity: Decimal) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn with_voucher_codes(mut self, codes: Vec<String>) -> Self {
        self.voucher_codes = codes;
        self
    }
}

/// Running result of the pipeline. `net` and `gross` stay unrounded between
/// stages; rounding happens only in [`PricedAmount::total`] and
/// [`PricedAmount::subtotal`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricedAmount {
    pub currency: String,
    pub net: Decimal,
    pub gross: Decimal,
    pub modifications: Vec<PriceModification>,
}

impl PricedAmount {
    pub fn from_base(base: &Money) -> Self {
        Self {
            currency: base.currency().to_string(),
            net: base.amount(),
            gross: base.amount(),
            modifications: Vec::new(),
        }
    }

    /// Record a modification and adjust the running amounts.
    pub fn push(&mut self, modification: PriceModification) {
        self.gross += modification.delta;
        if modification.kind == ModificationKind::Net {
            self.net += modification.delta;
        }
        self.modifications.push(modification);
    }

    /// Final payable amount, rounded to the currency minor unit.
    pub fn total(&self) -> Money {
        Money::new(self.gross, &self.currency).rounded()
    }

    /// Net amount before gross-only modifications, rounded.
    pub fn subtotal(&self) -> Money {
        Money::new(self.net, &self.currency).rounded()
    }
}

/// One pluggable stage of the pricing pipeline.
///
/// A stage may skip silently by returning `Ok(None)`. Misconfiguration must
/// be rejected when the stage is built, never here.
pub trait PriceModifier: Send + Sync {
    fn name(&self) -> &str;

    fn apply(
        &self,
        running: &PricedAmount,
        ctx: &PricingContext,
    ) -> Result<Option<PriceModification>>;
}
