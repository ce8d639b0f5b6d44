pub mod calculator;
pub mod modifier;
pub mod modifiers;

pub use calculator::PriceCalculator;
pub use modifier::{ModificationKind, PriceModification, PriceModifier, PricedAmount, PricingContext};
pub use modifiers::{DiscountModifier, ShippingModifier, TaxModifier, VoucherModifier};
