use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One line in a cart. Owned exclusively by its cart; bundle components live
/// in `sub_items` and never appear as top-level lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    pub item_key: String,
    pub product_id: Uuid,
    pub product_name: String,
    pub unit_price: Decimal,
    pub quantity: Decimal,
    pub comment: Option<String>,
    pub sub_items: Vec<CartItem>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl CartItem {
    pub fn new(
        product_id: Uuid,
        product_name: impl Into<String>,
        unit_price: Decimal,
        quantity: Decimal,
        comment: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            item_key: item_key_for(product_id),
            product_id,
            product_name: product_name.into(),
            unit_price,
            quantity,
            comment,
            sub_items: Vec::new(),
            created_at: now,
            modified_at: now,
        }
    }

    /// Line amount: own quantity times unit price plus all sub-item lines.
    pub fn line_amount(&self) -> Decimal {
        let own = self.unit_price * self.quantity;
        self.sub_items
            .iter()
            .fold(own, |acc, sub| acc + sub.line_amount())
    }

    pub fn touch(&mut self) {
        self.modified_at = Utc::now();
    }
}

/// Stable item key derived from the product reference, so repeated adds of
/// the same product merge into one line.
pub(crate) fn item_key_for(product_id: Uuid) -> String {
    product_id.simple().to_string()
}
