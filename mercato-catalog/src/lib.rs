pub mod ledger;
pub mod memory;
pub mod product;
pub mod service;
pub mod store;

pub use ledger::{InventoryLedger, LineRequest, ReservedLine};
pub use memory::MemoryProductStore;
pub use product::{CreateProduct, Product, ProductFilter, UpdateProduct};
pub use service::CatalogService;
pub use store::{CatalogError, ProductStore};
