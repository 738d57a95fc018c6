//! SQLite storage for invoices, clients, issuer settings and yearly tax rules.

pub mod decimal;
pub mod factory;
pub mod repository;

pub use factory::SqliteRepositoryFactory;
pub use repository::SqliteRepository;
