use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{MarketStore, Settlement};
use crate::error::Result;
use crate::models::{Order, OrderStatus, Product, Revenue};

#[derive(Default)]
struct Tables {
    products: HashMap<Uuid, Product>,
    orders: HashMap<Uuid, Order>,
    revenue: HashMap<Uuid, Revenue>,
}

/// In-process store. One lock covers all three tables so a settlement is
/// observed either completely or not at all.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first<T, F>(mut rows: Vec<T>, key: F) -> Vec<T>
where
    F: Fn(&T) -> chrono::DateTime<chrono::Utc>,
{
    rows.sort_by_key(|r| std::cmp::Reverse(key(r)));
    rows
}

#[async_trait]
impl MarketStore for MemoryStore {
    async fn insert_product(&self, product: &Product) -> Result<()> {
        let mut t = self.tables.lock().await;
        t.products.insert(product.id, product.clone());
        Ok(())
    }

    async fn fetch_product(&self, id: Uuid) -> Result<Option<Product>> {
        Ok(self.tables.lock().await.products.get(&id).cloned())
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        let t = self.tables.lock().await;
        Ok(newest_first(t.products.values().cloned().collect(), |p| p.created_at))
    }

    async fn products_by_farmer(&self, aadhaar: &str) -> Result<Vec<Product>> {
        let t = self.tables.lock().await;
        let rows = t
            .products
            .values()
            .filter(|p| p.farmer_aadhaar == aadhaar)
            .cloned()
            .collect();
        Ok(newest_first(rows, |p| p.created_at))
    }

    async fn save_product(&self, product: &Product) -> Result<bool> {
        let mut t = self.tables.lock().await;
        match t.products.get_mut(&product.id) {
            Some(slot) => {
                *slot = product.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_product(&self, id: Uuid) -> Result<bool> {
        Ok(self.tables.lock().await.products.remove(&id).is_some())
    }

    async fn insert_order(&self, order: &Order) -> Result<()> {
        let mut t = self.tables.lock().await;
        t.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn fetch_order(&self, id: Uuid) -> Result<Option<Order>> {
        Ok(self.tables.lock().await.orders.get(&id).cloned())
    }

    async fn orders_by_farmer(&self, aadhaar: &str) -> Result<Vec<Order>> {
        let t = self.tables.lock().await;
        let rows = t
            .orders
            .values()
            .filter(|o| o.farmer_aadhaar == aadhaar)
            .cloned()
            .collect();
        Ok(newest_first(rows, |o| o.created_at))
    }

    async fn orders_by_customer(&self, mobile: &str) -> Result<Vec<Order>> {
        let t = self.tables.lock().await;
        let rows = t
            .orders
            .values()
            .filter(|o| o.customer_mobile == mobile)
            .cloned()
            .collect();
        Ok(newest_first(rows, |o| o.created_at))
    }

    async fn update_order(&self, order: &Order, expected: OrderStatus) -> Result<bool> {
        let mut t = self.tables.lock().await;
        match t.orders.get_mut(&order.id) {
            Some(slot) if slot.status == expected => {
                *slot = order.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn settle_payment(&self, order: &Order, revenue: &Revenue) -> Result<Settlement> {
        let mut t = self.tables.lock().await;
        let awaiting = t
            .orders
            .get(&order.id)
            .is_some_and(|o| o.status == OrderStatus::PaymentPending);
        let already_credited = t.revenue.values().any(|r| r.order_id == order.id);
        if !awaiting || already_credited {
            return Ok(Settlement::Stale);
        }

        match t.products.get_mut(&order.product_id) {
            Some(product) if product.quantity >= order.quantity => {
                product.quantity -= order.quantity;
            }
            _ => return Ok(Settlement::OutOfStock),
        }
        t.orders.insert(order.id, order.clone());
        t.revenue.insert(revenue.id, revenue.clone());
        Ok(Settlement::Settled)
    }

    async fn revenue_for_order(&self, order_id: Uuid) -> Result<Option<Revenue>> {
        let t = self.tables.lock().await;
        Ok(t.revenue.values().find(|r| r.order_id == order_id).cloned())
    }

    async fn revenue_by_farmer(&self, aadhaar: &str) -> Result<Vec<Revenue>> {
        let t = self.tables.lock().await;
        let rows = t
            .revenue
            .values()
            .filter(|r| r.farmer_aadhaar == aadhaar)
            .cloned()
            .collect();
        Ok(newest_first(rows, |r| r.created_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle;
    use crate::models::{CreateOrderRequest, DeliveryType};
    use chrono::{Duration, Utc};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rust_decimal::Decimal;

    fn product() -> Product {
        Product {
            id: Uuid::new_v4(),
            farmer_aadhaar: "999988887777".into(),
            farmer_name: "Sunita".into(),
            contact_number: "9123456780".into(),
            name: "Onions".into(),
            description: "Red onions".into(),
            price: Decimal::new(30, 0),
            quantity: 10,
            unit: "kg".into(),
            category: "vegetables".into(),
            location: "Lasalgaon".into(),
            image_url: None,
            created_at: Utc::now(),
        }
    }

    fn accepted_order(p: &Product) -> Order {
        accepted_order_of(p, 4)
    }

    fn accepted_order_of(p: &Product, quantity: i32) -> Order {
        let now = Utc::now();
        let req = CreateOrderRequest {
            product_id: p.id,
            quantity,
            unit: None,
            customer_name: "Vikram".into(),
            customer_mobile: "9000011111".into(),
            delivery_type: DeliveryType::Pickup,
            delivery_location: String::new(),
            customer_location: None,
            date: None,
        };
        let mut order = lifecycle::open_order(p, req, now).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        lifecycle::accept(&mut order, &mut rng, now, Duration::seconds(60)).unwrap();
        order
    }

    #[tokio::test]
    async fn update_is_guarded_on_status() {
        let store = MemoryStore::new();
        let p = product();
        store.insert_product(&p).await.unwrap();
        let order = accepted_order(&p);
        let mut pending = order.clone();
        pending.status = OrderStatus::Pending;
        store.insert_order(&pending).await.unwrap();

        assert!(store.update_order(&order, OrderStatus::Pending).await.unwrap());
        // A second writer that also read `pending` loses.
        assert!(!store.update_order(&order, OrderStatus::Pending).await.unwrap());
    }

    #[tokio::test]
    async fn settlement_applies_once() {
        let store = MemoryStore::new();
        let p = product();
        store.insert_product(&p).await.unwrap();
        let order = accepted_order(&p);
        store.insert_order(&order).await.unwrap();

        let mut paid = order.clone();
        let revenue = lifecycle::pay(&mut paid, Utc::now()).unwrap();
        assert_eq!(store.settle_payment(&paid, &revenue).await.unwrap(), Settlement::Settled);

        let mut again = order.clone();
        let second = lifecycle::pay(&mut again, Utc::now()).unwrap();
        assert_eq!(store.settle_payment(&again, &second).await.unwrap(), Settlement::Stale);

        let stock = store.fetch_product(p.id).await.unwrap().unwrap();
        assert_eq!(stock.quantity, 6);
        assert_eq!(store.revenue_by_farmer(&p.farmer_aadhaar).await.unwrap().len(), 1);
        assert_eq!(
            store.fetch_order(order.id).await.unwrap().unwrap().status,
            OrderStatus::Confirmed
        );
    }

    #[tokio::test]
    async fn settlement_never_takes_stock_below_zero() {
        let store = MemoryStore::new();
        let mut p = product();
        p.quantity = 3;
        store.insert_product(&p).await.unwrap();

        // Both orders passed the stock check when they were placed.
        let first = accepted_order_of(&p, 3);
        let second = accepted_order_of(&p, 3);
        store.insert_order(&first).await.unwrap();
        store.insert_order(&second).await.unwrap();

        let mut paid = first.clone();
        let revenue = lifecycle::pay(&mut paid, Utc::now()).unwrap();
        assert_eq!(store.settle_payment(&paid, &revenue).await.unwrap(), Settlement::Settled);

        let mut short = second.clone();
        let revenue = lifecycle::pay(&mut short, Utc::now()).unwrap();
        assert_eq!(store.settle_payment(&short, &revenue).await.unwrap(), Settlement::OutOfStock);

        assert_eq!(store.fetch_product(p.id).await.unwrap().unwrap().quantity, 0);
        assert_eq!(store.revenue_by_farmer(&p.farmer_aadhaar).await.unwrap().len(), 1);
        assert_eq!(
            store.fetch_order(second.id).await.unwrap().unwrap().status,
            OrderStatus::PaymentPending
        );
    }

    #[tokio::test]
    async fn settlement_needs_the_listing() {
        let store = MemoryStore::new();
        let p = product();
        let order = accepted_order(&p);
        store.insert_order(&order).await.unwrap();

        let mut paid = order.clone();
        let revenue = lifecycle::pay(&mut paid, Utc::now()).unwrap();
        assert_eq!(store.settle_payment(&paid, &revenue).await.unwrap(), Settlement::OutOfStock);
        assert!(store.revenue_for_order(order.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn listings_are_newest_first() {
        let store = MemoryStore::new();
        let mut older = product();
        older.created_at = Utc::now() - Duration::hours(1);
        let newer = product();
        store.insert_product(&older).await.unwrap();
        store.insert_product(&newer).await.unwrap();

        let ids: Vec<Uuid> = store.list_products().await.unwrap().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![newer.id, older.id]);
    }
}
