pub mod agent;
pub mod manager;
pub mod models;
pub mod store;

pub use agent::OrderAgent;
pub use manager::OrderManager;
pub use models::{Note, Order, OrderItem, OrderItemState, OrderState, PaymentInformation};
pub use store::OrderStore;
