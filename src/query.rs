//! Filtering, sorting and statistics for the catalog and transaction tables.

use std::cmp::Ordering;

use crate::dto::{Product, Transaction};
use crate::status::TransactionStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Id,
    ProductName,
    BuyerName,
    SellerName,
    Amount,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    pub key: SortKey,
    pub direction: Direction,
}

impl Default for Sort {
    /// Newest first.
    fn default() -> Self {
        Self {
            key: SortKey::CreatedAt,
            direction: Direction::Desc,
        }
    }
}

impl Sort {
    /// Clicking a column: the active column flips from ascending to
    /// descending, anything else starts ascending.
    pub fn toggle(self, key: SortKey) -> Self {
        let direction = if self.key == key && self.direction == Direction::Asc {
            Direction::Desc
        } else {
            Direction::Asc
        };
        Self { key, direction }
    }

    fn compare(&self, a: &Transaction, b: &Transaction) -> Ordering {
        let ordering = match self.key {
            SortKey::Id => a.id.cmp(&b.id),
            SortKey::ProductName => a.product_name.cmp(&b.product_name),
            SortKey::BuyerName => a.buyer_name.cmp(&b.buyer_name),
            SortKey::SellerName => a.seller_name.cmp(&b.seller_name),
            SortKey::Amount => a.amount.cmp(&b.amount),
            SortKey::Status => a.status.as_str().cmp(b.status.as_str()),
            SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
            SortKey::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        };
        match self.direction {
            Direction::Asc => ordering,
            Direction::Desc => ordering.reverse(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionQuery {
    /// Case-insensitive substring over id, product, buyer, seller and status.
    pub search: Option<String>,
    pub status: Option<TransactionStatus>,
    pub sort: Sort,
}

impl TransactionQuery {
    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn status(mut self, status: TransactionStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn sort_by(mut self, key: SortKey, direction: Direction) -> Self {
        self.sort = Sort { key, direction };
        self
    }

    pub fn matches(&self, tx: &Transaction) -> bool {
        if self.status.is_some_and(|status| tx.status != status) {
            return false;
        }
        let term = match self.search.as_deref().map(str::trim) {
            None | Some("") => return true,
            Some(term) => term.to_lowercase(),
        };
        let id = tx.id.to_string();
        let fields = [
            id.as_str(),
            tx.product_name.as_str(),
            tx.buyer_name.as_str(),
            tx.seller_name.as_str(),
            tx.status.as_str(),
        ];
        fields
            .iter()
            .any(|field| field.to_lowercase().contains(&term))
    }

    /// Matching transactions in sort order. Ties keep their input order.
    pub fn apply<'a>(
        &self,
        transactions: impl IntoIterator<Item = &'a Transaction>,
    ) -> Vec<&'a Transaction> {
        let mut rows: Vec<&Transaction> = transactions
            .into_iter()
            .filter(|tx| self.matches(tx))
            .collect();
        rows.sort_by(|a, b| self.sort.compare(a, b));
        rows
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionSummary {
    pub total: usize,
    pub pending: usize,
    /// Secured, shipped or delivered.
    pub active: usize,
    pub completed: usize,
    pub disputed: usize,
}

impl<'a> FromIterator<&'a Transaction> for TransactionSummary {
    fn from_iter<I: IntoIterator<Item = &'a Transaction>>(iter: I) -> Self {
        iter.into_iter().fold(Self::default(), |mut summary, tx| {
            summary.total += 1;
            match tx.status {
                TransactionStatus::Pending => summary.pending += 1,
                TransactionStatus::Completed => summary.completed += 1,
                TransactionStatus::Disputed => summary.disputed += 1,
                status if status.is_active() => summary.active += 1,
                _ => {}
            }
            summary
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogSummary {
    pub total_products: usize,
    pub total_stock: u64,
    pub out_of_stock: usize,
}

impl<'a> FromIterator<&'a Product> for CatalogSummary {
    fn from_iter<I: IntoIterator<Item = &'a Product>>(iter: I) -> Self {
        iter.into_iter().fold(Self::default(), |mut summary, product| {
            summary.total_products += 1;
            summary.total_stock += u64::from(product.stock);
            if product.stock == 0 {
                summary.out_of_stock += 1;
            }
            summary
        })
    }
}

/// Catalog search: case-insensitive on name or description, optionally
/// narrowed to one category.
pub fn search_products<'a>(
    products: impl IntoIterator<Item = &'a Product>,
    term: &str,
    category: Option<&str>,
) -> Vec<&'a Product> {
    let term = term.trim().to_lowercase();
    products
        .into_iter()
        .filter(|p| category.is_none_or(|c| p.category == c))
        .filter(|p| {
            term.is_empty()
                || p.name.to_lowercase().contains(&term)
                || p.description.to_lowercase().contains(&term)
        })
        .collect()
}

/// Distinct categories in the order they first appear.
pub fn categories<'a>(products: impl IntoIterator<Item = &'a Product>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for product in products {
        if !seen.contains(&product.category) {
            seen.push(product.category.clone());
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed;
    use chrono::{Duration, Utc};
    use rust_decimal_macros::dec;
    use TransactionStatus::*;

    fn ids(rows: &[&Transaction]) -> Vec<u32> {
        rows.iter().map(|t| t.id).collect()
    }

    fn table() -> Vec<Transaction> {
        let now = Utc::now();
        let mut txs = seed::transactions(now);
        let mut third = txs[0].clone();
        third.id = 3;
        third.product_name = "Designer Handbag".into();
        third.buyer_name = "Mia".into();
        third.amount = dec!(499.99);
        third.status = Disputed;
        third.created_at = now - Duration::days(1);
        txs.push(third);
        txs
    }

    #[test]
    fn test_default_sort_is_newest_first() {
        let txs = table();
        let rows = TransactionQuery::default().apply(&txs);
        assert_eq!(ids(&rows), vec![3, 1, 2]);
    }

    #[test]
    fn test_search_is_case_insensitive_across_fields() {
        let txs = table();
        let search = |term: &str| ids(&TransactionQuery::default().search(term).apply(&txs));
        assert_eq!(search("HANDBAG"), vec![3]);
        assert_eq!(search("mia"), vec![3]);
        assert_eq!(search("ship"), vec![2]);
        assert_eq!(search("2"), vec![2]);
        assert_eq!(search("   ").len(), 3);
    }

    #[test]
    fn test_status_filter() {
        let txs = table();
        let rows = TransactionQuery::default().status(Secured).apply(&txs);
        assert_eq!(ids(&rows), vec![1]);
    }

    #[test]
    fn test_sort_by_amount_both_directions() {
        let txs = table();
        let asc = TransactionQuery::default()
            .sort_by(SortKey::Amount, Direction::Asc)
            .apply(&txs);
        assert_eq!(ids(&asc), vec![1, 3, 2]);
        let desc = TransactionQuery::default()
            .sort_by(SortKey::Amount, Direction::Desc)
            .apply(&txs);
        assert_eq!(ids(&desc), vec![2, 3, 1]);
    }

    #[test]
    fn test_sort_by_status_uses_names() {
        let txs = table();
        let rows = TransactionQuery::default()
            .sort_by(SortKey::Status, Direction::Asc)
            .apply(&txs);
        // disputed < secured < shipped
        assert_eq!(ids(&rows), vec![3, 1, 2]);
    }

    #[test]
    fn test_toggle_sort() {
        let sort = Sort::default().toggle(SortKey::Amount);
        assert_eq!(sort.direction, Direction::Asc);
        let sort = sort.toggle(SortKey::Amount);
        assert_eq!(sort.direction, Direction::Desc);
        let sort = sort.toggle(SortKey::Amount);
        assert_eq!(sort.direction, Direction::Asc);
        let sort = sort.toggle(SortKey::Id);
        assert_eq!(
            sort,
            Sort {
                key: SortKey::Id,
                direction: Direction::Asc
            }
        );
    }

    #[test]
    fn test_transaction_summary() {
        let txs = table();
        let summary: TransactionSummary = txs.iter().collect();
        assert_eq!(
            summary,
            TransactionSummary {
                total: 3,
                pending: 0,
                active: 2,
                completed: 0,
                disputed: 1,
            }
        );
    }

    #[test]
    fn test_catalog_summary() {
        let mut products = seed::products();
        products[3].stock = 0;
        let summary: CatalogSummary = products.iter().collect();
        assert_eq!(summary.total_products, 4);
        assert_eq!(summary.total_stock, 15 + 8 + 3);
        assert_eq!(summary.out_of_stock, 1);
    }

    #[test]
    fn test_search_products_and_categories() {
        let products = seed::products();
        assert_eq!(categories(&products), vec!["Electronics", "Fashion"]);

        let hits = search_products(&products, "premium", None);
        let names: Vec<&str> = hits.iter().map(|p| p.name.as_str()).collect();
        // name match, description match, description match
        assert_eq!(
            names,
            vec![
                "Premium Wireless Headphones",
                "Smart Watch Series 5",
                "Designer Handbag"
            ]
        );

        let fashion = search_products(&products, "premium", Some("Fashion"));
        assert_eq!(fashion.len(), 1);
        assert_eq!(search_products(&products, "", Some("Electronics")).len(), 3);
    }
}
