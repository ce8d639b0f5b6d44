use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use merx_core::{Error, Result};
use merx_payment::PaymentState;
use merx_pricing::PriceModification;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Order lifecycle. `Aborted` and `Cancelled` are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderState {
    Pending,
    Committed,
    Aborted,
    Cancelled,
}

impl OrderState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderState::Aborted | OrderState::Cancelled)
    }
}

/// Item-level status within an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderItemState {
    Open,
    Cancelled,
    Complaint,
    Changed,
}

impl FromStr for OrderItemState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "OPEN" => Ok(OrderItemState::Open),
            "CANCELLED" => Ok(OrderItemState::Cancelled),
            "COMPLAINT" => Ok(OrderItemState::Complaint),
            "CHANGED" => Ok(OrderItemState::Changed),
            other => Err(Error::InvalidArgument(format!(
                "unknown order item status '{other}'"
            ))),
        }
    }
}

/// Complaint sub-entry on an order item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Complaint {
    pub quantity: Decimal,
    pub created_at: DateTime<Utc>,
}

/// One product line of a durable order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub state: OrderItemState,
    pub sub_items: Vec<OrderItem>,
    pub complaints: Vec<Complaint>,
}

impl OrderItem {
    /// Enforced transition table: nothing leaves `Cancelled`.
    pub fn set_state(&mut self, state: OrderItemState) -> Result<()> {
        if self.state == OrderItemState::Cancelled && state != OrderItemState::Cancelled {
            return Err(Error::InvalidState(format!(
                "order item {} is cancelled and cannot move to {state:?}",
                self.id
            )));
        }
        self.state = state;
        Ok(())
    }

    /// Own line amount plus all sub-item lines.
    pub fn line_amount(&self) -> Decimal {
        let own = self.unit_price * self.quantity;
        self.sub_items
            .iter()
            .fold(own, |acc, sub| acc + sub.line_amount())
    }
}

/// Free-text audit record attached to an order. Consumed by external
/// reporting; never interpreted by the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    pub order_id: Uuid,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// One payment attempt on an order. Several may exist (retries); at most one
/// is active at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentInformation {
    /// Internal payment id; unguessable, round-tripped through the gateway.
    pub reference: String,
    pub provider: String,
    pub state: PaymentState,
    pub transaction_id: Option<String>,
    /// Provider-opaque blob: authorized data and raw callback payloads.
    pub provider_data: BTreeMap<String, String>,
    /// Digests of every status already applied to this payment; a redelivered
    /// callback carrying any of them is absorbed without side effects.
    pub processed_digests: Vec<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl PaymentInformation {
    pub fn new(reference: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            provider: provider.into(),
            state: PaymentState::Open,
            transaction_id: None,
            provider_data: BTreeMap::new(),
            processed_digests: Vec::new(),
            active: true,
            created_at: Utc::now(),
        }
    }
}

/// Durable record of a checked-out cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    /// Denormalized link back to the originating cart; unique per store.
    pub cart_id: Uuid,
    pub tenant: String,
    pub currency: String,
    pub items: Vec<OrderItem>,
    pub subtotal: Decimal,
    pub total: Decimal,
    pub modifications: Vec<PriceModification>,
    pub voucher_codes: Vec<String>,
    pub state: OrderState,
    pub notes: Vec<Note>,
    pub payments: Vec<PaymentInformation>,
    /// One-shot flag: set when checkout completion was recorded, so the
    /// side effect fires exactly once.
    pub completion_recorded: bool,
    /// Optimistic-concurrency version, bumped by the store on every save.
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn item(&self, item_id: Uuid) -> Result<&OrderItem> {
        self.items
            .iter()
            .find(|i| i.id == item_id)
            .ok_or_else(|| Error::NotFound(format!("order item {item_id}")))
    }

    pub fn item_mut(&mut self, item_id: Uuid) -> Result<&mut OrderItem> {
        self.items
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or_else(|| Error::NotFound(format!("order item {item_id}")))
    }

    /// The payment attempt currently driving this order, if any.
    pub fn active_payment(&self) -> Option<&PaymentInformation> {
        self.payments.iter().find(|p| p.active)
    }

    pub fn payment_by_reference(&self, reference: &str) -> Option<&PaymentInformation> {
        self.payments.iter().find(|p| p.reference == reference)
    }

    /// A payment that has cleared, for refund routing.
    pub fn cleared_payment(&self) -> Option<&PaymentInformation> {
        self.payments
            .iter()
            .find(|p| p.state == PaymentState::Cleared)
    }

    pub fn add_note(&mut self, title: impl Into<String>, description: impl Into<String>) -> Note {
        let note = Note {
            id: Uuid::new_v4(),
            order_id: self.id,
            title: title.into(),
            description: description.into(),
            created_at: Utc::now(),
        };
        self.notes.push(note.clone());
        note
    }

    pub fn all_items_cancelled(&self) -> bool {
        !self.items.is_empty()
            && self
                .items
                .iter()
                .all(|i| i.state == OrderItemState::Cancelled)
    }
}
