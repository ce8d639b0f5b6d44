use async_trait::async_trait;
use merx_core::Result;
use uuid::Uuid;

use crate::cart::Cart;

/// Object-store boundary for carts. Writes are full snapshots, never partial.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Persist a full snapshot under the cart's id (insert or replace).
    async fn put_cart(&self, cart: &Cart) -> Result<()>;

    async fn get_cart(&self, id: Uuid) -> Result<Option<Cart>>;

    /// Remove a cart. Removing an absent id is a no-op.
    async fn remove_cart(&self, id: Uuid) -> Result<()>;
}
