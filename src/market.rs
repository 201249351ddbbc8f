//! The catalog and escrow transaction store.
//!
//! [`Marketplace`] is a cheaply cloneable handle onto shared state. Every
//! mutation runs under one lock and is staged on a copy of the affected
//! store. The copy is saved to storage and only then installed, so a failed
//! save leaves memory as it was. Outcomes are reported through the
//! [`Notifier`].
//!
//! Buying a product schedules a payment capture: a Tokio task that moves the
//! new transaction from pending to secured after the configured delay. Each
//! capture owns a cancellation channel registered against its transaction.
//! Dropping the sender (transaction left pending some other way, or
//! [`Marketplace::shutdown`]) cancels the capture, and a capture that fires
//! re-checks that its transaction is still pending before touching it.

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tokio::sync::{broadcast, watch};

use crate::config::Config;
use crate::csv_utils::{read_csv, write_csv};
use crate::dto::{NewProduct, Product, Role, Transaction, TransactionRow, User};
use crate::notify::{Notification, Notifier};
use crate::query::{self, CatalogSummary, TransactionQuery, TransactionSummary};
use crate::seed;
use crate::status::{Actor, StatusPolicy, TransactionStatus};
use crate::storage::{self, Storage, PRODUCTS_KEY, TRANSACTIONS_KEY};
use crate::stores::{ProductsStore, TransactionsStore};
use crate::{Error, Result};

struct MarketState {
    products: ProductsStore,
    transactions: TransactionsStore,
    /// Cancellation senders of the captures still waiting, by transaction id.
    captures: HashMap<u32, watch::Sender<()>>,
}

#[derive(Clone)]
pub struct Marketplace {
    state: Arc<Mutex<MarketState>>,
    storage: Arc<dyn Storage>,
    notifier: Notifier,
    capture_delay: Duration,
    policy: StatusPolicy,
}

impl Marketplace {
    /// Loads products and transactions from storage, seeding whichever list
    /// is missing. The resulting state is saved straight away.
    ///
    /// Pending transactions found in storage are not captured until
    /// [`resume_captures`](Self::resume_captures) is called.
    pub fn open(storage: Arc<dyn Storage>, notifier: Notifier, config: &Config) -> Result<Self> {
        let products = ProductsStore::new(
            storage::load_json(storage.as_ref(), PRODUCTS_KEY)?.unwrap_or_else(seed::products),
        );
        let transactions = TransactionsStore::new(
            storage::load_json(storage.as_ref(), TRANSACTIONS_KEY)?
                .unwrap_or_else(|| seed::transactions(Utc::now())),
        );

        tracing::info!(
            products = products.len(),
            transactions = transactions.len(),
            "marketplace opened"
        );

        let market = Self {
            state: Arc::new(Mutex::new(MarketState {
                products,
                transactions,
                captures: HashMap::new(),
            })),
            storage,
            notifier,
            capture_delay: config.capture_delay,
            policy: config.status_policy,
        };
        {
            let state = market.state.lock();
            market.save_products(&state.products)?;
            market.save_transactions(&state.transactions)?;
        }
        Ok(market)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notifier.subscribe()
    }

    pub fn policy(&self) -> StatusPolicy {
        self.policy
    }

    /// Lists a new product owned by the caller, who must be a seller.
    pub fn add_product(&self, caller: Option<&User>, fields: NewProduct) -> Result<Product> {
        let result = self.try_add_products(caller, vec![fields]).and_then(|mut added| {
            added.pop().ok_or_else(|| Error::InvalidProduct("nothing added".into()))
        });
        if result.is_ok() {
            self.notifier.success("Product added successfully!");
        }
        self.report(result)
    }

    /// Lists every row of a catalog CSV (`name,description,price,image,
    /// category,stock`). Either every row is added or none is.
    pub fn import_products<P: AsRef<Path>>(
        &self,
        caller: Option<&User>,
        path: P,
    ) -> Result<Vec<Product>> {
        let result =
            read_csv::<NewProduct, _>(path).and_then(|rows| self.try_add_products(caller, rows));
        if let Ok(added) = &result {
            self.notifier
                .success(format!("Imported {} products", added.len()));
        }
        self.report(result)
    }

    fn try_add_products(&self, caller: Option<&User>, rows: Vec<NewProduct>) -> Result<Vec<Product>> {
        let seller = match caller {
            Some(user) if user.role == Role::Seller => user,
            _ => return Err(Error::SellersOnly),
        };
        for row in &rows {
            validate_product(row)?;
        }

        let mut state = self.state.lock();
        let mut products = state.products.clone();
        let mut added = Vec::with_capacity(rows.len());
        for row in rows {
            let product = Product {
                id: products.next_id(),
                name: row.name,
                description: row.description,
                price: row.price,
                image: row.image,
                seller_id: seller.id,
                seller_name: seller.name.clone(),
                category: row.category,
                stock: row.stock,
            };
            products.insert(product.clone());
            added.push(product);
        }
        self.save_products(&products)?;
        state.products = products;

        for product in &added {
            tracing::info!(product_id = product.id, seller_id = seller.id, "product added");
        }
        Ok(added)
    }

    /// Buys one unit of a product on behalf of a signed-in buyer.
    ///
    /// Stock is taken and a pending transaction recorded atomically; payment
    /// capture then follows after the configured delay.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime, which runs the capture.
    pub fn initiate_transaction(&self, caller: Option<&User>, product_id: u32) -> Result<Transaction> {
        let result = self.try_initiate(caller, product_id);
        if let Ok(transaction) = &result {
            self.notifier
                .success("Transaction initiated! Proceed to payment.");
            self.spawn_capture(transaction.id);
        }
        self.report(result)
    }

    fn try_initiate(&self, caller: Option<&User>, product_id: u32) -> Result<Transaction> {
        let buyer = caller.ok_or(Error::NotAuthenticated)?;
        if buyer.role != Role::Buyer {
            return Err(Error::BuyersOnly);
        }

        let mut state = self.state.lock();
        let mut products = state.products.clone();
        let mut transactions = state.transactions.clone();
        let product = products.take_one(product_id)?.clone();
        let now = Utc::now();
        let transaction = Transaction {
            id: transactions.next_id(),
            product_id: product.id,
            product_name: product.name,
            product_image: product.image,
            buyer_id: buyer.id,
            buyer_name: buyer.name.clone(),
            seller_id: product.seller_id,
            seller_name: product.seller_name,
            amount: product.price,
            status: TransactionStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        transactions.insert(transaction.clone())?;
        self.commit(&mut state, products, transactions)?;

        tracing::info!(
            transaction_id = transaction.id,
            product_id,
            buyer_id = buyer.id,
            stock_left = product.stock,
            "transaction initiated"
        );
        Ok(transaction)
    }

    /// Moves a transaction to `new_status` on behalf of `caller`.
    ///
    /// A missing transaction leaves the list untouched. Under
    /// [`StatusPolicy::Enforced`] the step must be an edge of the escrow
    /// graph owned by the caller's role, and buyers and sellers may only act
    /// on their own transactions.
    pub fn update_transaction_status(
        &self,
        caller: &User,
        transaction_id: u32,
        new_status: TransactionStatus,
    ) -> Result<Transaction> {
        let result = {
            let mut state = self.state.lock();
            self.apply_status(
                &mut state,
                Actor::from(caller.role),
                Some(caller.id),
                transaction_id,
                new_status,
            )
        };
        if result.is_ok() {
            self.notifier.info(new_status.notice());
        }
        self.report(result)
    }

    /// `user_id` identifies the acting buyer or seller; the system has none.
    fn apply_status(
        &self,
        state: &mut MarketState,
        actor: Actor,
        user_id: Option<u32>,
        transaction_id: u32,
        new_status: TransactionStatus,
    ) -> Result<Transaction> {
        let mut transactions = state.transactions.clone();
        let transaction = transactions.get_mut(transaction_id)?;
        let from = transaction.status;
        self.policy.check(actor, from, new_status)?;
        if self.policy == StatusPolicy::Enforced {
            ensure_party(actor, user_id, transaction)?;
        }

        transaction.status = new_status;
        transaction.updated_at = Utc::now();
        let updated = transaction.clone();

        self.save_transactions(&transactions)?;
        state.transactions = transactions;
        if from == TransactionStatus::Pending && new_status != TransactionStatus::Pending {
            // Drops the sender, which cancels a capture still waiting
            state.captures.remove(&transaction_id);
        }

        tracing::info!(
            transaction_id,
            %actor,
            %from,
            to = %new_status,
            "transaction status updated"
        );
        Ok(updated)
    }

    fn spawn_capture(&self, transaction_id: u32) {
        let (cancel_tx, mut cancel_rx) = watch::channel(());
        self.state.lock().captures.insert(transaction_id, cancel_tx);

        let market = self.clone();
        let delay = self.capture_delay;
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => market.capture(transaction_id),
                _ = cancel_rx.changed() => {
                    tracing::debug!(transaction_id, "payment capture cancelled");
                }
            }
        });
        tracing::debug!(transaction_id, ?delay, "payment capture scheduled");
    }

    fn capture(&self, transaction_id: u32) {
        let result = {
            let mut state = self.state.lock();
            state.captures.remove(&transaction_id);
            match state.transactions.get(transaction_id).map(|t| t.status) {
                Some(TransactionStatus::Pending) => self.apply_status(
                    &mut state,
                    Actor::System,
                    None,
                    transaction_id,
                    TransactionStatus::Secured,
                ),
                status => {
                    tracing::debug!(transaction_id, ?status, "capture skipped: no longer pending");
                    return;
                }
            }
        };
        match result {
            Ok(_) => {
                self.notifier.info(TransactionStatus::Secured.notice());
                self.notifier
                    .success("Payment successful! Funds are now held in escrow.");
            }
            Err(e) => {
                // Still pending and unscheduled, so resume_captures retries it
                tracing::error!(transaction_id, error = %e, "payment capture failed");
                self.notifier.error(e.to_string());
            }
        }
    }

    /// Schedules a capture for every pending transaction that has none,
    /// e.g. after reopening from storage. Returns how many were scheduled.
    pub fn resume_captures(&self) -> usize {
        let waiting: Vec<u32> = {
            let state = self.state.lock();
            state
                .transactions
                .iter()
                .filter(|t| t.status == TransactionStatus::Pending)
                .filter(|t| !state.captures.contains_key(&t.id))
                .map(|t| t.id)
                .collect()
        };
        for &transaction_id in &waiting {
            self.spawn_capture(transaction_id);
        }
        waiting.len()
    }

    /// Number of captures still waiting to fire.
    pub fn pending_captures(&self) -> usize {
        self.state.lock().captures.len()
    }

    /// Cancels every waiting capture. Returns how many were cancelled.
    pub fn shutdown(&self) -> usize {
        let cancelled = self.state.lock().captures.drain().count();
        tracing::info!(cancelled, "marketplace shut down");
        cancelled
    }

    pub fn get_product_by_id(&self, product_id: u32) -> Option<Product> {
        self.state.lock().products.get(product_id).cloned()
    }

    pub fn products(&self) -> Vec<Product> {
        self.state.lock().products.as_slice().to_vec()
    }

    pub fn products_by_seller(&self, seller_id: u32) -> Vec<Product> {
        self.state
            .lock()
            .products
            .iter()
            .filter(|p| p.seller_id == seller_id)
            .cloned()
            .collect()
    }

    pub fn search_products(&self, term: &str, category: Option<&str>) -> Vec<Product> {
        let state = self.state.lock();
        query::search_products(state.products.iter(), term, category)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn categories(&self) -> Vec<String> {
        query::categories(self.state.lock().products.iter())
    }

    pub fn catalog_summary(&self) -> CatalogSummary {
        self.state.lock().products.iter().collect()
    }

    pub fn transaction(&self, transaction_id: u32) -> Option<Transaction> {
        self.state.lock().transactions.get(transaction_id).cloned()
    }

    pub fn transactions(&self) -> Vec<Transaction> {
        self.state.lock().transactions.as_slice().to_vec()
    }

    /// What a user's dashboard shows: buyers their purchases, sellers their
    /// sales, admins everything.
    pub fn transactions_for(&self, user: &User) -> Vec<Transaction> {
        let state = self.state.lock();
        let visible: Vec<&Transaction> = match user.role {
            Role::Buyer => state.transactions.for_buyer(user.id).collect(),
            Role::Seller => state.transactions.for_seller(user.id).collect(),
            Role::Admin => state.transactions.iter().collect(),
        };
        visible.into_iter().cloned().collect()
    }

    pub fn summary_for(&self, user: &User) -> TransactionSummary {
        self.transactions_for(user).iter().collect()
    }

    pub fn transaction_summary(&self) -> TransactionSummary {
        self.state.lock().transactions.iter().collect()
    }

    pub fn query_transactions(&self, query: &TransactionQuery) -> Vec<Transaction> {
        let state = self.state.lock();
        query
            .apply(state.transactions.iter())
            .into_iter()
            .cloned()
            .collect()
    }

    /// Writes the transaction table matching `query` as CSV.
    pub fn export_transactions<W: Write>(&self, writer: W, query: &TransactionQuery) -> Result<()> {
        let rows: Vec<TransactionRow> = {
            let state = self.state.lock();
            query
                .apply(state.transactions.iter())
                .into_iter()
                .map(TransactionRow::from)
                .collect()
        };
        let written = write_csv(writer, rows)?;
        tracing::debug!(written, "transaction table exported");
        Ok(())
    }

    /// Saves both staged stores and installs them. If the second save fails
    /// the previous products are written back, and memory is left untouched.
    fn commit(
        &self,
        state: &mut MarketState,
        products: ProductsStore,
        transactions: TransactionsStore,
    ) -> Result<()> {
        self.save_products(&products)?;
        if let Err(e) = self.save_transactions(&transactions) {
            if let Err(restore) = self.save_products(&state.products) {
                tracing::error!(error = %restore, "could not restore saved products");
            }
            return Err(e);
        }
        state.products = products;
        state.transactions = transactions;
        Ok(())
    }

    fn save_products(&self, products: &ProductsStore) -> Result<()> {
        storage::save_json(self.storage.as_ref(), PRODUCTS_KEY, products.as_slice())
    }

    fn save_transactions(&self, transactions: &TransactionsStore) -> Result<()> {
        storage::save_json(self.storage.as_ref(), TRANSACTIONS_KEY, transactions.as_slice())
    }

    fn report<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            tracing::warn!(error = %e, "marketplace operation rejected");
            self.notifier.error(e.to_string());
        }
        result
    }
}

/// Buyers and sellers may only move transactions they are party to.
fn ensure_party(actor: Actor, user_id: Option<u32>, transaction: &Transaction) -> Result<()> {
    let owner = match actor {
        Actor::Buyer => transaction.buyer_id,
        Actor::Seller => transaction.seller_id,
        Actor::System | Actor::Admin => return Ok(()),
    };
    if user_id == Some(owner) {
        Ok(())
    } else {
        Err(Error::NotParty(transaction.id))
    }
}

fn validate_product(fields: &NewProduct) -> Result<()> {
    if fields.name.trim().is_empty() {
        return Err(Error::InvalidProduct("name must not be empty".into()));
    }
    if fields.price <= Decimal::ZERO {
        return Err(Error::InvalidProduct("price must be positive".into()));
    }
    Ok(())
}
