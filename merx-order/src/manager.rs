use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use merx_cart::{Cart, CartItem};
use merx_core::{Error, Result};
use merx_payment::{PaymentProvider, PaymentStatus};
use merx_pricing::PriceCalculator;
use uuid::Uuid;

use crate::agent::OrderAgent;
use crate::models::{Order, OrderItem, OrderItemState, OrderState};
use crate::store::OrderStore;

const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(30);

/// Converts carts into durable orders and looks orders up by cart or by
/// payment reference.
pub struct OrderManager {
    store: Arc<dyn OrderStore>,
    calculator: Arc<PriceCalculator>,
    provider: Arc<dyn PaymentProvider>,
    gateway_timeout: Duration,
}

impl OrderManager {
    pub fn new(
        store: Arc<dyn OrderStore>,
        calculator: Arc<PriceCalculator>,
        provider: Arc<dyn PaymentProvider>,
    ) -> Self {
        Self {
            store,
            calculator,
            provider,
            gateway_timeout: DEFAULT_GATEWAY_TIMEOUT,
        }
    }

    /// Bound for outbound gateway calls made by agents of this manager.
    pub fn with_gateway_timeout(mut self, timeout: Duration) -> Self {
        self.gateway_timeout = timeout;
        self
    }

    /// Return the order for this cart, creating it on first checkout.
    ///
    /// At most one order ever exists per cart id: creation is a conditional
    /// insert at the store layer, and a losing concurrent creator receives
    /// the winner's order.
    pub async fn get_or_create_order_from_cart(&self, cart: &Cart) -> Result<Order> {
        let cart_id = cart
            .id()
            .ok_or_else(|| Error::NotSaved("cart must be saved before checkout".to_string()))?;

        if let Some(existing) = self.store.find_order_by_cart(cart_id).await? {
            return Ok(existing);
        }

        let snapshot = self.order_snapshot(cart, cart_id)?;
        let order_id = snapshot.id;
        let stored = self.store.insert_order_for_cart(snapshot).await?;
        if stored.id == order_id {
            tracing::info!(order_id = %stored.id, cart_id = %cart_id, "order created from cart");
        } else {
            tracing::debug!(
                order_id = %stored.id,
                cart_id = %cart_id,
                "concurrent checkout lost the insert race, returning winner"
            );
        }
        Ok(stored)
    }

    /// Pure lookup, never creates.
    pub async fn get_order_from_cart(&self, cart: &Cart) -> Result<Order> {
        let cart_id = cart
            .id()
            .ok_or_else(|| Error::NotSaved("cart was never saved".to_string()))?;
        self.store
            .find_order_by_cart(cart_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("order for cart {cart_id}")))
    }

    pub async fn get_order(&self, id: Uuid) -> Result<Order> {
        self.store
            .get_order(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("order {id}")))
    }

    /// Resolve the order a gateway callback belongs to via its payment
    /// reference.
    pub async fn get_order_by_payment_status(&self, status: &PaymentStatus) -> Result<Order> {
        self.store
            .find_order_by_payment_reference(&status.reference)
            .await?
            .ok_or_else(|| Error::NotFound(format!("order for payment '{}'", status.reference)))
    }

    /// Bind an agent to one order instance.
    pub fn create_order_agent(&self, order: Order) -> OrderAgent {
        OrderAgent::new(
            order,
            Arc::clone(&self.store),
            Arc::clone(&self.calculator),
            Arc::clone(&self.provider),
            self.gateway_timeout,
        )
    }

    /// Snapshot the cart's current items and totals into a fresh order.
    fn order_snapshot(&self, cart: &Cart, cart_id: Uuid) -> Result<Order> {
        let price = cart.price(&self.calculator)?;
        let now = Utc::now();

        Ok(Order {
            id: Uuid::new_v4(),
            cart_id,
            tenant: cart.tenant.clone(),
            currency: cart.currency.clone(),
            items: cart.items().iter().map(order_item_from).collect(),
            subtotal: price.subtotal.amount(),
            total: price.total.amount(),
            modifications: price.modifications,
            voucher_codes: cart.voucher_codes.clone(),
            state: OrderState::Pending,
            notes: Vec::new(),
            payments: Vec::new(),
            completion_recorded: false,
            version: 0,
            created_at: now,
            updated_at: now,
        })
    }
}

fn order_item_from(item: &CartItem) -> OrderItem {
    OrderItem {
        id: Uuid::new_v4(),
        product_id: item.product_id,
        name: item.product_name.clone(),
        quantity: item.quantity,
        unit_price: item.unit_price,
        total_price: item.line_amount(),
        state: OrderItemState::Open,
        sub_items: item.sub_items.iter().map(order_item_from).collect(),
        complaints: Vec::new(),
    }
}
