use chrono::{DateTime, Utc};
use merx_core::money::Money;
use merx_core::{Error, Result};
use merx_pricing::{PriceCalculator, PriceModification, PricingContext};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::item::{item_key_for, CartItem};
use crate::store::CartStore;

/// Who owns the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", tag = "kind", content = "id")]
pub enum CartOwner {
    User(String),
    Guest,
}

/// Priced line within a [`CartPrice`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinePrice {
    pub item_key: String,
    pub quantity: Decimal,
    pub unit_price: Money,
    pub line_total: Money,
}

/// Result of running the pricing pipeline over a cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartPrice {
    pub lines: Vec<LinePrice>,
    pub subtotal: Money,
    pub total: Money,
    pub modifications: Vec<PriceModification>,
}

/// Mutable collection of line items for one checkout tenant.
///
/// The id is assigned lazily on the first `save`. Every mutation bumps
/// `modified_at`, which downstream callers read to short-circuit stale price
/// caches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    id: Option<Uuid>,
    pub tenant: String,
    pub owner: CartOwner,
    pub currency: String,
    items: Vec<CartItem>,
    pub voucher_codes: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl Cart {
    pub fn new(tenant: impl Into<String>, owner: CartOwner, currency: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            tenant: tenant.into(),
            owner,
            currency: currency.into(),
            items: Vec::new(),
            voucher_codes: Vec::new(),
            created_at: now,
            modified_at: now,
        }
    }

    pub fn id(&self) -> Option<Uuid> {
        self.id
    }

    /// Items in insertion order.
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn item(&self, item_key: &str) -> Option<&CartItem> {
        self.items.iter().find(|i| i.item_key == item_key)
    }

    /// Add a product line. Adding a product already in the cart merges the
    /// quantities into the existing line and returns its key.
    pub fn add_item(
        &mut self,
        product_id: Uuid,
        product_name: &str,
        unit_price: Decimal,
        quantity: Decimal,
        comment: Option<String>,
    ) -> Result<String> {
        if quantity.is_sign_negative() {
            return Err(Error::InvalidArgument(format!(
                "negative quantity {quantity} for product '{product_name}'"
            )));
        }

        let key = item_key_for(product_id);
        if let Some(existing) = self.items.iter_mut().find(|i| i.item_key == key) {
            existing.quantity += quantity;
            if comment.is_some() {
                existing.comment = comment;
            }
            existing.touch();
        } else {
            self.items.push(CartItem::new(
                product_id,
                product_name,
                unit_price,
                quantity,
                comment,
            ));
        }
        self.touch();
        Ok(key)
    }

    /// Attach a bundle component underneath an existing line.
    pub fn add_sub_item(
        &mut self,
        parent_key: &str,
        product_id: Uuid,
        product_name: &str,
        unit_price: Decimal,
        quantity: Decimal,
    ) -> Result<String> {
        if quantity.is_sign_negative() {
            return Err(Error::InvalidArgument(format!(
                "negative quantity {quantity} for product '{product_name}'"
            )));
        }
        let parent = self
            .items
            .iter_mut()
            .find(|i| i.item_key == parent_key)
            .ok_or_else(|| Error::NotFound(format!("cart item '{parent_key}'")))?;

        let sub = CartItem::new(product_id, product_name, unit_price, quantity, None);
        let key = sub.item_key.clone();
        parent.sub_items.push(sub);
        parent.touch();
        self.touch();
        Ok(key)
    }

    pub fn remove_item(&mut self, item_key: &str) -> Result<()> {
        let before = self.items.len();
        self.items.retain(|i| i.item_key != item_key);
        if self.items.len() == before {
            return Err(Error::NotFound(format!("cart item '{item_key}'")));
        }
        self.touch();
        Ok(())
    }

    /// Set a line's quantity; zero removes the line.
    pub fn update_quantity(&mut self, item_key: &str, quantity: Decimal) -> Result<()> {
        if quantity.is_sign_negative() {
            return Err(Error::InvalidArgument(format!(
                "negative quantity {quantity} for item '{item_key}'"
            )));
        }
        if quantity.is_zero() {
            return self.remove_item(item_key);
        }
        let item = self
            .items
            .iter_mut()
            .find(|i| i.item_key == item_key)
            .ok_or_else(|| Error::NotFound(format!("cart item '{item_key}'")))?;
        item.quantity = quantity;
        item.touch();
        self.touch();
        Ok(())
    }

    pub fn add_voucher_code(&mut self, code: impl Into<String>) {
        self.voucher_codes.push(code.into());
        self.touch();
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.voucher_codes.clear();
        self.touch();
    }

    /// Sum of all line amounts, before any modifier runs.
    pub fn subtotal(&self) -> Money {
        let amount = self.items.iter().map(CartItem::line_amount).sum();
        Money::new(amount, &self.currency)
    }

    pub fn total_quantity(&self) -> Decimal {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Run the pricing pipeline over the current cart contents.
    pub fn price(&self, calculator: &PriceCalculator) -> Result<CartPrice> {
        let subtotal = self.subtotal();
        let ctx = PricingContext::new(&self.currency)
            .with_quantity(self.total_quantity())
            .with_voucher_codes(self.voucher_codes.clone());
        let priced = calculator.calculate(&subtotal, &ctx)?;

        let lines = self
            .items
            .iter()
            .map(|item| LinePrice {
                item_key: item.item_key.clone(),
                quantity: item.quantity,
                unit_price: Money::new(item.unit_price, &self.currency),
                line_total: Money::new(item.line_amount(), &self.currency).rounded(),
            })
            .collect();

        Ok(CartPrice {
            lines,
            subtotal: priced.subtotal(),
            total: priced.total(),
            modifications: priced.modifications,
        })
    }

    /// Persist a full snapshot, assigning the id on the first call.
    pub async fn save(&mut self, store: &dyn CartStore) -> Result<Uuid> {
        let id = match self.id {
            Some(id) => id,
            None => {
                let id = Uuid::new_v4();
                self.id = Some(id);
                id
            }
        };
        store.put_cart(self).await?;
        tracing::debug!(cart_id = %id, items = self.items.len(), "cart saved");
        Ok(id)
    }

    /// Remove the cart from the store. Requires a prior successful save.
    /// The cart loses its id; a later save starts a fresh cart.
    pub async fn delete(&mut self, store: &dyn CartStore) -> Result<()> {
        let id = self
            .id
            .ok_or_else(|| Error::NotSaved("cart has no id; save it before delete".to_string()))?;
        self.clear();
        store.remove_cart(id).await?;
        self.id = None;
        tracing::info!(cart_id = %id, "cart deleted");
        Ok(())
    }

    fn touch(&mut self) {
        self.modified_at = Utc::now();
    }
}
