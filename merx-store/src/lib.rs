pub mod environment;
pub mod memory;

pub use environment::CheckoutEnvironment;
pub use memory::MemoryStore;
