//! Scripted walkthrough of one escrow purchase.
//!
//! A seller lists a single-unit product, a buyer purchases it, the payment
//! capture secures the funds and the seller ships. The resulting transaction
//! table is written to the provided writer as CSV.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::dto::NewProduct;
use crate::identity::IdentityStore;
use crate::market::Marketplace;
use crate::notify::{Notification, Notifier};
use crate::query::TransactionQuery;
use crate::seed::DEMO_PASSWORD;
use crate::status::TransactionStatus;
use crate::storage::Storage;
use crate::Result;

const SELLER_EMAIL: &str = "seller@example.com";
const BUYER_EMAIL: &str = "buyer@example.com";

/// How often the walkthrough checks whether the payment was captured.
const CAPTURE_POLL: Duration = Duration::from_millis(50);
/// Grace period past the capture delay before giving up on the capture.
const CAPTURE_GRACE: Duration = Duration::from_secs(5);

fn record_player() -> NewProduct {
    NewProduct {
        name: "Vintage Record Player".to_owned(),
        description: "Restored 1970s turntable, one of a kind.".to_owned(),
        price: Decimal::new(34900, 2),
        image: "https://images.unsplash.com/photo-1461360228754-6e81c478b882?w=500".to_owned(),
        category: "Music".to_owned(),
        stock: 1,
    }
}

/// Runs the walkthrough against `storage` and writes the transaction table to
/// `writer`.
///
/// # Errors
/// Returns an error if:
/// * Storage cannot be read or written
/// * Any step of the walkthrough is rejected
/// * Writing to the output fails
pub async fn run<W: Write>(storage: Arc<dyn Storage>, config: &Config, writer: W) -> Result<()> {
    let notifier = Notifier::new();
    let toasts = forward_notifications(notifier.subscribe());

    let identity = IdentityStore::open(storage.clone(), notifier.clone(), config.login_latency)?;
    let market = Marketplace::open(storage, notifier, config)?;
    let resumed = market.resume_captures();
    if resumed > 0 {
        tracing::info!(resumed, "resumed payment captures");
    }

    let seller = identity.login(SELLER_EMAIL, DEMO_PASSWORD).await?;
    let product = market.add_product(Some(&seller), record_player())?;
    identity.logout()?;

    let buyer = identity.login(BUYER_EMAIL, DEMO_PASSWORD).await?;
    let transaction = market.initiate_transaction(Some(&buyer), product.id)?;
    tracing::info!(
        transaction_id = transaction.id,
        stock_left = market.get_product_by_id(product.id).map(|p| p.stock),
        "waiting for payment capture"
    );
    let wait = config.capture_delay + CAPTURE_GRACE;
    if tokio::time::timeout(wait, wait_for_capture(&market, transaction.id))
        .await
        .is_err()
    {
        tracing::warn!(transaction_id = transaction.id, ?wait, "payment not captured in time");
    }

    market.update_transaction_status(&seller, transaction.id, TransactionStatus::Shipped)?;
    identity.logout()?;

    market.export_transactions(writer, &TransactionQuery::default())?;

    market.shutdown();
    toasts.abort();
    Ok(())
}

/// Resolves once the transaction has left `pending`.
async fn wait_for_capture(market: &Marketplace, transaction_id: u32) {
    let mut ticks = tokio::time::interval(CAPTURE_POLL);
    loop {
        ticks.tick().await;
        match market.transaction(transaction_id) {
            Some(tx) if tx.status == TransactionStatus::Pending => continue,
            _ => return,
        }
    }
}

/// Logs every notification until the channel closes or the task is aborted.
fn forward_notifications(mut rx: broadcast::Receiver<Notification>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(notification) => {
                    tracing::info!(level = ?notification.level, "{}", notification.message)
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "notifications dropped")
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}
