use std::collections::HashMap;

use async_trait::async_trait;
use merx_cart::{Cart, CartStore};
use merx_core::{Error, Result};
use merx_order::{Order, OrderStore};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    carts: HashMap<Uuid, Cart>,
    orders: HashMap<Uuid, Order>,
    /// Unique index backing the at-most-one-order-per-cart guarantee.
    orders_by_cart: HashMap<Uuid, Uuid>,
    payment_refs: HashMap<String, Uuid>,
}

/// In-memory object store. One write lock spans every compound operation, so
/// the conditional insert and the version check are atomic, matching what a
/// SQL store would get from a unique index and an UPDATE ... WHERE version.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn index_payments(inner: &mut Inner, order: &Order) {
        for payment in &order.payments {
            inner
                .payment_refs
                .insert(payment.reference.clone(), order.id);
        }
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn put_cart(&self, cart: &Cart) -> Result<()> {
        let id = cart
            .id()
            .ok_or_else(|| Error::Store("cart snapshot without id".to_string()))?;
        self.inner.write().await.carts.insert(id, cart.clone());
        Ok(())
    }

    async fn get_cart(&self, id: Uuid) -> Result<Option<Cart>> {
        Ok(self.inner.read().await.carts.get(&id).cloned())
    }

    async fn remove_cart(&self, id: Uuid) -> Result<()> {
        self.inner.write().await.carts.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn insert_order_for_cart(&self, order: Order) -> Result<Order> {
        let mut inner = self.inner.write().await;
        if let Some(existing_id) = inner.orders_by_cart.get(&order.cart_id) {
            let existing = inner
                .orders
                .get(existing_id)
                .cloned()
                .ok_or_else(|| Error::Store("dangling cart index entry".to_string()))?;
            return Ok(existing);
        }
        inner.orders_by_cart.insert(order.cart_id, order.id);
        Self::index_payments(&mut inner, &order);
        inner.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>> {
        Ok(self.inner.read().await.orders.get(&id).cloned())
    }

    async fn find_order_by_cart(&self, cart_id: Uuid) -> Result<Option<Order>> {
        let inner = self.inner.read().await;
        Ok(inner
            .orders_by_cart
            .get(&cart_id)
            .and_then(|id| inner.orders.get(id))
            .cloned())
    }

    async fn find_order_by_payment_reference(&self, reference: &str) -> Result<Option<Order>> {
        let inner = self.inner.read().await;
        Ok(inner
            .payment_refs
            .get(reference)
            .and_then(|id| inner.orders.get(id))
            .cloned())
    }

    async fn save_order(&self, order: &mut Order) -> Result<()> {
        let mut inner = self.inner.write().await;
        let stored = inner
            .orders
            .get(&order.id)
            .ok_or_else(|| Error::NotFound(format!("order {}", order.id)))?;
        if stored.version != order.version {
            return Err(Error::Conflict(format!("order {}", order.id)));
        }
        order.version += 1;
        Self::index_payments(&mut inner, order);
        inner.orders.insert(order.id, order.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use merx_order::OrderState;
    use rust_decimal::Decimal;

    fn order(cart_id: Uuid) -> Order {
        let now = Utc::now();
        Order {
            id: Uuid::new_v4(),
            cart_id,
            tenant: "web".to_string(),
            currency: "EUR".to_string(),
            items: Vec::new(),
            subtotal: Decimal::ZERO,
            total: Decimal::ZERO,
            modifications: Vec::new(),
            voucher_codes: Vec::new(),
            state: OrderState::Pending,
            notes: Vec::new(),
            payments: Vec::new(),
            completion_recorded: false,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_conditional_insert_returns_winner() {
        let store = MemoryStore::new();
        let cart_id = Uuid::new_v4();

        let winner = store.insert_order_for_cart(order(cart_id)).await.unwrap();
        let loser = store.insert_order_for_cart(order(cart_id)).await.unwrap();
        assert_eq!(winner.id, loser.id);

        let stored = store.find_order_by_cart(cart_id).await.unwrap().unwrap();
        assert_eq!(stored.id, winner.id);
    }

    #[tokio::test]
    async fn test_stale_save_conflicts() {
        let store = MemoryStore::new();
        let mut first = store
            .insert_order_for_cart(order(Uuid::new_v4()))
            .await
            .unwrap();
        let mut stale = first.clone();

        store.save_order(&mut first).await.unwrap();
        assert_eq!(first.version, 1);

        assert!(matches!(
            store.save_order(&mut stale).await,
            Err(Error::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_save_of_unknown_order_is_not_found() {
        let store = MemoryStore::new();
        let mut o = order(Uuid::new_v4());
        assert!(matches!(
            store.save_order(&mut o).await,
            Err(Error::NotFound(_))
        ));
    }
}
