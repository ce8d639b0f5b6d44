pub mod cart;
pub mod item;
pub mod store;

pub use cart::{Cart, CartOwner, CartPrice, LinePrice};
pub use item::CartItem;
pub use store::CartStore;
