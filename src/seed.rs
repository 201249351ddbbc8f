//! Synthetic data the marketplace starts with when storage is empty.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use crate::dto::{Product, Role, Transaction, User};
use crate::status::TransactionStatus;

pub const DEMO_PASSWORD: &str = "password123";

const HEADPHONES_IMAGE: &str = "https://images.unsplash.com/photo-1505740420928-5e560c06d30e?w=500&auto=format&fit=crop&q=60";
const WATCH_IMAGE: &str = "https://images.unsplash.com/photo-1579586337278-3befd40fd17a?q=80&w=500&auto=format&fit=crop";
const CAMERA_IMAGE: &str = "https://images.unsplash.com/photo-1516035069371-29a1b244cc32?q=80&w=500&auto=format&fit=crop";
const HANDBAG_IMAGE: &str = "https://images.unsplash.com/photo-1584917865442-de89df76afd3?q=80&w=500&auto=format&fit=crop";

/// A login that exists before anyone registers.
#[derive(Debug, Clone)]
pub struct SeededAccount {
    pub user: User,
    pub password: String,
}

pub fn avatar_for(name: &str) -> String {
    format!("https://api.dicebear.com/7.x/avataaars/svg?seed={name}")
}

fn account(id: u32, name: &str, email: &str, role: Role, seed: &str) -> SeededAccount {
    SeededAccount {
        user: User {
            id,
            name: name.to_owned(),
            email: email.to_owned(),
            role,
            avatar_url: Some(avatar_for(seed)),
        },
        password: DEMO_PASSWORD.to_owned(),
    }
}

pub fn accounts() -> Vec<SeededAccount> {
    vec![
        account(1, "John Buyer", "buyer@example.com", Role::Buyer, "John"),
        account(2, "Sarah Seller", "seller@example.com", Role::Seller, "Sarah"),
        account(3, "Admin User", "admin@example.com", Role::Admin, "Admin"),
    ]
}

fn product(
    id: u32,
    name: &str,
    description: &str,
    price: Decimal,
    image: &str,
    category: &str,
    stock: u32,
) -> Product {
    Product {
        id,
        name: name.to_owned(),
        description: description.to_owned(),
        price,
        image: image.to_owned(),
        seller_id: 2,
        seller_name: "Sarah Seller".to_owned(),
        category: category.to_owned(),
        stock,
    }
}

pub fn products() -> Vec<Product> {
    vec![
        product(
            1,
            "Premium Wireless Headphones",
            "Noise-cancelling wireless headphones with premium sound quality and 30-hour battery life.",
            Decimal::new(19999, 2),
            HEADPHONES_IMAGE,
            "Electronics",
            15,
        ),
        product(
            2,
            "Smart Watch Series 5",
            "Track your fitness, receive notifications, and more with this premium smartwatch.",
            Decimal::new(29999, 2),
            WATCH_IMAGE,
            "Electronics",
            8,
        ),
        product(
            3,
            "Professional Camera Kit",
            "Full-frame DSLR camera with multiple lenses, perfect for professional photography.",
            Decimal::new(129999, 2),
            CAMERA_IMAGE,
            "Electronics",
            3,
        ),
        product(
            4,
            "Designer Handbag",
            "Luxury designer handbag made with genuine leather and premium materials.",
            Decimal::new(49999, 2),
            HANDBAG_IMAGE,
            "Fashion",
            5,
        ),
    ]
}

/// Two purchases by the seeded buyer, already in flight. Timestamps are
/// relative to `now`.
pub fn transactions(now: DateTime<Utc>) -> Vec<Transaction> {
    let catalog = products();
    let snapshot = |id: u32, product: &Product, status, created_days: i64, updated_days: i64| {
        Transaction {
            id,
            product_id: product.id,
            product_name: product.name.clone(),
            product_image: product.image.clone(),
            buyer_id: 1,
            buyer_name: "John Buyer".to_owned(),
            seller_id: product.seller_id,
            seller_name: product.seller_name.clone(),
            amount: product.price,
            status,
            created_at: now - Duration::days(created_days),
            updated_at: now - Duration::days(updated_days),
        }
    };
    vec![
        snapshot(1, &catalog[0], TransactionStatus::Secured, 3, 2),
        snapshot(2, &catalog[2], TransactionStatus::Shipped, 10, 5),
    ]
}
