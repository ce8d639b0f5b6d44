use async_trait::async_trait;
use merx_core::Result;
use uuid::Uuid;

use crate::models::Order;

/// Object-store boundary for orders.
///
/// Implementations must guarantee uniqueness on the cart id (conditional
/// insert, not read-then-write) and optimistic concurrency on saves.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert the order unless one already exists for its cart id. Returns
    /// the stored order: the given one when the insert won, the existing
    /// winner otherwise.
    async fn insert_order_for_cart(&self, order: Order) -> Result<Order>;

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>>;

    async fn find_order_by_cart(&self, cart_id: Uuid) -> Result<Option<Order>>;

    /// Resolve an order through the internal payment reference minted at
    /// `start_payment`.
    async fn find_order_by_payment_reference(&self, reference: &str) -> Result<Option<Order>>;

    /// Persist a full snapshot. Fails with `Conflict` when the order's
    /// version does not match the stored version; on success the version is
    /// bumped in place.
    async fn save_order(&self, order: &mut Order) -> Result<()>;
}
