pub mod config;
pub mod database;
pub mod repository;

pub use config::DatabaseConfig;
pub use database::Database;
pub use repository::{CrawlResultRepository, ListParams, ListSort, SortColumn};
