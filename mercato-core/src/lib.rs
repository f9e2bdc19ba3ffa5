pub mod cache;
pub mod money;
pub mod page;
pub mod principal;

pub use cache::{Cache, CacheResult, MemoryCache};
pub use money::Money;
pub use page::{Page, PageRequest};
pub use principal::{CustomerTier, Principal};
