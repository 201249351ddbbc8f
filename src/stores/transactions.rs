//! Transaction history storage for the escrow lifecycle.
//!
//! Maintains every purchase ever initiated for:
//! - Looking up a transaction for a status update
//! - Preventing duplicate transaction ids
//! - Per-buyer and per-seller views

use crate::dto::Transaction;
use crate::Error;

#[derive(Debug, Default, Clone)]
pub struct TransactionsStore {
    transactions: Vec<Transaction>,
}

impl TransactionsStore {
    pub fn new(transactions: Vec<Transaction>) -> Self {
        Self { transactions }
    }

    pub fn next_id(&self) -> u32 {
        self.transactions.iter().map(|t| t.id).max().unwrap_or(0) + 1
    }

    /// Stores a new transaction.
    /// Returns an error if a transaction with the same id already exists.
    pub fn insert(&mut self, transaction: Transaction) -> Result<(), Error> {
        if self.get(transaction.id).is_some() {
            return Err(Error::DuplicateTransaction);
        }
        self.transactions.push(transaction);
        Ok(())
    }

    pub fn get(&self, id: u32) -> Option<&Transaction> {
        self.transactions.iter().find(|t| t.id == id)
    }

    /// Gets a stored transaction, or an error if it does not exist.
    pub fn get_mut(&mut self, id: u32) -> Result<&mut Transaction, Error> {
        self.transactions
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(Error::TransactionNotFound)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions.iter()
    }

    pub fn for_buyer(&self, buyer_id: u32) -> impl Iterator<Item = &Transaction> {
        self.iter().filter(move |t| t.buyer_id == buyer_id)
    }

    pub fn for_seller(&self, seller_id: u32) -> impl Iterator<Item = &Transaction> {
        self.iter().filter(move |t| t.seller_id == seller_id)
    }

    pub fn as_slice(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }
}
