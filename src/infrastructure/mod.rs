pub mod catalog;
pub mod memory;
pub mod models;
pub mod order_repo;

pub use catalog::DieselCatalog;
pub use memory::{InMemoryCatalog, InMemoryOrderStore};
pub use order_repo::DieselOrderStore;
