use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::RoundingStrategy;
use serde::de::Deserializer;
use serde::{Deserialize, Serialize};

use crate::status::TransactionStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Buyer,
    Seller,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: u32,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: u32,
    pub name: String,
    pub description: String,
    #[serde(deserialize_with = "deserialize_price_2dp")]
    pub price: Decimal,
    pub image: String,
    pub seller_id: u32,
    pub seller_name: String,
    pub category: String,
    pub stock: u32,
}

/// Seller-supplied product fields. Identity and ownership are filled in by
/// the marketplace. Also the row format for catalog CSV imports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    #[serde(deserialize_with = "deserialize_price_2dp")]
    pub price: Decimal,
    pub image: String,
    pub category: String,
    pub stock: u32,
}

/// A purchase held in escrow. The product fields are a snapshot taken at
/// creation and are not kept in sync with the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: u32,
    pub product_id: u32,
    pub product_name: String,
    pub product_image: String,
    pub buyer_id: u32,
    pub buyer_name: String,
    pub seller_id: u32,
    pub seller_name: String,
    #[serde(deserialize_with = "deserialize_price_2dp")]
    pub amount: Decimal,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One line of the exported transaction table.
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRow {
    pub id: u32,
    pub product_id: u32,
    pub product_name: String,
    pub buyer_name: String,
    pub seller_name: String,
    pub amount: Decimal,
    pub status: TransactionStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Transaction> for TransactionRow {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: tx.id,
            product_id: tx.product_id,
            product_name: tx.product_name.clone(),
            buyer_name: tx.buyer_name.clone(),
            seller_name: tx.seller_name.clone(),
            amount: tx.amount.normalize(),
            status: tx.status,
            created_at: tx.created_at.to_rfc3339(),
            updated_at: tx.updated_at.to_rfc3339(),
        }
    }
}

fn deserialize_price_2dp<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    <Decimal as Deserialize>::deserialize(deserializer)
        .map(|dec| dec.round_dp_with_strategy(2, RoundingStrategy::ToZero))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn parse_csv_row(row: &str) -> Result<NewProduct, csv::Error> {
        let data_with_header = format!("name,description,price,image,category,stock\n{}", row);
        let mut reader = csv::Reader::from_reader(data_with_header.as_bytes());
        reader.deserialize().next().unwrap()
    }

    #[test]
    fn test_parse_new_product() {
        assert_eq!(
            parse_csv_row("Desk Lamp,Warm LED lamp,39.90,lamp.jpg,Home,12").unwrap(),
            NewProduct {
                name: "Desk Lamp".into(),
                description: "Warm LED lamp".into(),
                price: dec!(39.90),
                image: "lamp.jpg".into(),
                category: "Home".into(),
                stock: 12,
            }
        );
    }

    #[test]
    fn test_price_rounds_to_cents() {
        let product = parse_csv_row("Pen,Blue ink,1.999,pen.jpg,Office,3").unwrap();
        assert_eq!(product.price, dec!(1.99));
    }

    #[test]
    fn test_negative_stock_rejected() {
        assert!(parse_csv_row("Pen,Blue ink,1.00,pen.jpg,Office,-1").is_err());
    }

    #[test]
    fn test_invalid_price_rejected() {
        assert!(parse_csv_row("Pen,Blue ink,cheap,pen.jpg,Office,1").is_err());
    }

    #[test]
    fn test_user_json_layout() {
        let user = User {
            id: 1,
            name: "John Buyer".into(),
            email: "buyer@example.com".into(),
            role: Role::Buyer,
            avatar_url: None,
        };
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": 1,
                "name": "John Buyer",
                "email": "buyer@example.com",
                "role": "buyer"
            })
        );
        let back: User = serde_json::from_value(json).unwrap();
        assert_eq!(back, user);
    }

    #[test]
    fn test_transaction_uses_camel_case_keys() {
        let now = Utc::now();
        let tx = Transaction {
            id: 7,
            product_id: 1,
            product_name: "Lamp".into(),
            product_image: "lamp.jpg".into(),
            buyer_id: 1,
            buyer_name: "John Buyer".into(),
            seller_id: 2,
            seller_name: "Sarah Seller".into(),
            amount: dec!(39.90),
            status: TransactionStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["productName"], "Lamp");
        assert_eq!(json["status"], "pending");
        assert!(json.get("createdAt").is_some());
    }

    #[test]
    fn test_row_normalizes_amount() {
        let now = Utc::now();
        let tx = Transaction {
            id: 1,
            product_id: 1,
            product_name: "Lamp".into(),
            product_image: String::new(),
            buyer_id: 1,
            buyer_name: "B".into(),
            seller_id: 2,
            seller_name: "S".into(),
            amount: dec!(40.00),
            status: TransactionStatus::Secured,
            created_at: now,
            updated_at: now,
        };
        let row = TransactionRow::from(&tx);
        assert_eq!(row.amount.to_string(), "40");
        assert_eq!(row.created_at, now.to_rfc3339());
    }
}
