//! Product catalog storage.
//!
//! Products keep their insertion order, which is the order the catalog is
//! shown in. Nothing is ever removed, so the highest id is also the newest.

use crate::dto::Product;
use crate::Error;

#[derive(Debug, Default, Clone)]
pub struct ProductsStore {
    products: Vec<Product>,
}

impl ProductsStore {
    pub fn new(products: Vec<Product>) -> Self {
        Self { products }
    }

    pub fn next_id(&self) -> u32 {
        self.products.iter().map(|p| p.id).max().unwrap_or(0) + 1
    }

    pub fn get(&self, id: u32) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    /// Gets a product entry, or returns an error if it doesn't exist.
    pub fn get_mut(&mut self, id: u32) -> Result<&mut Product, Error> {
        self.products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(Error::ProductNotFound)
    }

    pub fn insert(&mut self, product: Product) {
        self.products.push(product);
    }

    /// Takes one unit out of stock.
    /// Returns an error if the product does not exist or none are left.
    pub fn take_one(&mut self, id: u32) -> Result<&Product, Error> {
        let product = self.get_mut(id)?;
        product.stock = product.stock.checked_sub(1).ok_or(Error::OutOfStock)?;
        Ok(product)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Product> {
        self.products.iter()
    }

    pub fn as_slice(&self) -> &[Product] {
        &self.products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }
}
