pub mod allocator;
pub mod error;
pub mod memory;
pub mod models;
pub mod service;
pub mod store;

pub use error::OrderError;
pub use memory::MemoryOrderStore;
pub use models::{Order, OrderLine, OrderStatus};
pub use service::OrderService;
pub use store::OrderStore;
