pub mod config;
pub mod csv_utils;
pub mod dto;
mod error;
pub mod identity;
pub mod market;
pub mod notify;
pub mod query;
mod runner;
pub mod seed;
pub mod status;
pub mod storage;
mod stores;

pub use config::Config;
pub use dto::{NewProduct, Product, Role, Transaction, TransactionRow, User};
pub use error::{Error, Result};
pub use identity::IdentityStore;
pub use market::Marketplace;
pub use notify::{Level, Notification, Notifier};
pub use query::{CatalogSummary, Direction, Sort, SortKey, TransactionQuery, TransactionSummary};
pub use runner::run;
pub use status::{Actor, StatusPolicy, TransactionStatus};
pub use storage::{FileStorage, MemoryStorage, Storage};
