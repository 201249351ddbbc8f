//! Storage layer for the marketplace. Provides storage for:
//! - The product catalog and stock levels ([`ProductsStore`])
//! - Escrow transaction history ([`TransactionsStore`])
//!
//! Both are plain in-memory collections; the marketplace serializes access
//! and handles persistence.

mod products;
mod transactions;

pub use products::ProductsStore;
pub use transactions::TransactionsStore;
