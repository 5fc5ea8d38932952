//! Persistence for products, orders and revenue.
//!
//! Route handlers only see the [`MarketStore`] trait. `PgStore` backs the
//! deployed service; `MemoryStore` keeps everything in process for tests and
//! for running without a database.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Order, OrderStatus, Product, Revenue};

/// Outcome of [`MarketStore::settle_payment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    Settled,
    /// The order was no longer awaiting payment, or was already credited.
    Stale,
    /// The listing is gone or holds less than the ordered quantity.
    OutOfStock,
}

// The store is shared across handler futures that may move between worker
// threads, hence the `Send + Sync` super-traits.
#[async_trait]
pub trait MarketStore: Send + Sync {
    async fn insert_product(&self, product: &Product) -> Result<()>;
    async fn fetch_product(&self, id: Uuid) -> Result<Option<Product>>;
    /// All listings, newest first.
    async fn list_products(&self) -> Result<Vec<Product>>;
    async fn products_by_farmer(&self, aadhaar: &str) -> Result<Vec<Product>>;
    /// Overwrite an existing listing. Returns false if it no longer exists.
    async fn save_product(&self, product: &Product) -> Result<bool>;
    async fn delete_product(&self, id: Uuid) -> Result<bool>;

    async fn insert_order(&self, order: &Order) -> Result<()>;
    async fn fetch_order(&self, id: Uuid) -> Result<Option<Order>>;
    /// Orders for a farmer, newest first.
    async fn orders_by_farmer(&self, aadhaar: &str) -> Result<Vec<Order>>;
    /// Orders placed from a customer mobile number, newest first.
    async fn orders_by_customer(&self, mobile: &str) -> Result<Vec<Order>>;
    /// Write `order` only if the stored copy still has status `expected`.
    /// Returns false when another writer got there first.
    async fn update_order(&self, order: &Order, expected: OrderStatus) -> Result<bool>;
    /// Apply a completed payment in one step: write the paid order (guarded
    /// on `payment_pending`), insert its revenue entry and take the ordered
    /// quantity off the product's stock. Unless the outcome is
    /// [`Settlement::Settled`], nothing is written.
    async fn settle_payment(&self, order: &Order, revenue: &Revenue) -> Result<Settlement>;

    async fn revenue_for_order(&self, order_id: Uuid) -> Result<Option<Revenue>>;
    /// Revenue entries for a farmer, newest first.
    async fn revenue_by_farmer(&self, aadhaar: &str) -> Result<Vec<Revenue>>;
}
