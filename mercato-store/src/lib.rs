pub mod app_config;
pub mod cache;
pub mod database;
pub mod order_repo;
pub mod product_repo;

pub use app_config::Config;
pub use cache::RedisCache;
pub use database::DbClient;
pub use order_repo::PgOrderStore;
pub use product_repo::PgProductStore;
