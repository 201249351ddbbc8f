//! Domain-specific errors for the escrow marketplace.
//!
//! Contains error variants for common failure cases like:
//! - Identity errors (bad credentials, email already taken)
//! - Permission errors (only sellers list products, only buyers purchase)
//! - Catalog errors (product missing, out of stock)
//! - Escrow lifecycle errors (illegal status transition, acting on someone
//!   else's transaction)
//!
//! The display text of the business variants doubles as the user-facing
//! notification message. The technical variants wrap storage, CSV and
//! configuration failures.

use std::io;

use crate::status::{Actor, TransactionStatus};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Email already in use")]
    EmailInUse,
    #[error("The admin role cannot be self-assigned")]
    RoleNotSelfAssignable,
    #[error("Please log in to make a purchase")]
    NotAuthenticated,
    #[error("Only sellers can add products")]
    SellersOnly,
    #[error("Only buyers can make purchases")]
    BuyersOnly,
    #[error("Invalid product: {0}")]
    InvalidProduct(String),
    #[error("Product not found")]
    ProductNotFound,
    #[error("Product is out of stock")]
    OutOfStock,
    #[error("Transaction not found")]
    TransactionNotFound,
    #[error("Duplicate transaction")]
    DuplicateTransaction,
    #[error("Cannot move a {from} transaction to {to}")]
    IllegalTransition {
        from: TransactionStatus,
        to: TransactionStatus,
    },
    #[error("A {actor} cannot move a transaction to {to}")]
    ActorNotPermitted { actor: Actor, to: TransactionStatus },
    #[error("You are not a party to transaction {0}")]
    NotParty(u32),

    #[error("storage error: {0}")]
    Storage(#[from] io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advisory_messages() {
        assert_eq!(Error::OutOfStock.to_string(), "Product is out of stock");
        assert_eq!(
            Error::SellersOnly.to_string(),
            "Only sellers can add products"
        );
        assert_eq!(
            Error::InvalidCredentials.to_string(),
            "Invalid email or password"
        );
    }

    #[test]
    fn test_transition_messages_name_statuses() {
        let err = Error::IllegalTransition {
            from: TransactionStatus::Completed,
            to: TransactionStatus::Shipped,
        };
        assert_eq!(
            err.to_string(),
            "Cannot move a completed transaction to shipped"
        );

        let err = Error::ActorNotPermitted {
            actor: Actor::Buyer,
            to: TransactionStatus::Refunded,
        };
        assert_eq!(
            err.to_string(),
            "A buyer cannot move a transaction to refunded"
        );

        assert_eq!(
            Error::NotParty(7).to_string(),
            "You are not a party to transaction 7"
        );
    }

    #[test]
    fn test_io_error_converts() {
        let err: Error = io::Error::new(io::ErrorKind::PermissionDenied, "denied").into();
        assert!(matches!(err, Error::Storage(_)));
    }
}
