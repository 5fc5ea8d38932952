//! PostgreSQL store.
//!
//! Plain `sqlx` queries against the tables in `migrations/`. Status guards are
//! expressed in the `WHERE` clause so a lost race shows up as zero affected
//! rows instead of a silent overwrite.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use super::{MarketStore, Settlement};
use crate::error::Result;
use crate::models::{
    DeliveryType, GeoPoint, Order, OrderStatus, PaymentStatus, Product, Revenue,
};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Row shape of `orders`; locations are JSONB columns.
#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    product_id: Uuid,
    product_name: String,
    unit_price: Decimal,
    quantity: i32,
    unit: String,
    base_amount: Decimal,
    delivery_charge: Decimal,
    final_amount: Decimal,
    delivery_type: DeliveryType,
    farmer_aadhaar: String,
    farmer_name: String,
    customer_name: String,
    customer_mobile: String,
    status: OrderStatus,
    payment_status: PaymentStatus,
    payment_qr_code: Option<String>,
    payment_expiry: Option<DateTime<Utc>>,
    rejection_reason: Option<String>,
    delivery_location: String,
    customer_location: Option<Json<GeoPoint>>,
    farmer_location: Option<Json<GeoPoint>>,
    order_date: NaiveDate,
    accepted_at: Option<DateTime<Utc>>,
    paid_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Order {
            id: row.id,
            product_id: row.product_id,
            product_name: row.product_name,
            unit_price: row.unit_price,
            quantity: row.quantity,
            unit: row.unit,
            base_amount: row.base_amount,
            delivery_charge: row.delivery_charge,
            final_amount: row.final_amount,
            delivery_type: row.delivery_type,
            farmer_aadhaar: row.farmer_aadhaar,
            farmer_name: row.farmer_name,
            customer_name: row.customer_name,
            customer_mobile: row.customer_mobile,
            status: row.status,
            payment_status: row.payment_status,
            payment_qr_code: row.payment_qr_code,
            payment_expiry: row.payment_expiry,
            rejection_reason: row.rejection_reason,
            delivery_location: row.delivery_location,
            customer_location: row.customer_location.map(|Json(p)| p),
            farmer_location: row.farmer_location.map(|Json(p)| p),
            order_date: row.order_date,
            accepted_at: row.accepted_at,
            paid_at: row.paid_at,
            completed_at: row.completed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const UPDATE_ORDER: &str = r#"
    UPDATE orders SET
        status = $3,
        payment_status = $4,
        payment_qr_code = $5,
        payment_expiry = $6,
        rejection_reason = $7,
        delivery_location = $8,
        farmer_location = $9,
        accepted_at = $10,
        paid_at = $11,
        completed_at = $12,
        updated_at = $13
    WHERE id = $1 AND status = $2
"#;

fn bind_order_update<'q>(
    order: &'q Order,
    expected: OrderStatus,
) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
    sqlx::query(UPDATE_ORDER)
        .bind(order.id)
        .bind(expected)
        .bind(order.status)
        .bind(order.payment_status)
        .bind(order.payment_qr_code.as_deref())
        .bind(order.payment_expiry)
        .bind(order.rejection_reason.as_deref())
        .bind(order.delivery_location.as_str())
        .bind(order.farmer_location.clone().map(Json))
        .bind(order.accepted_at)
        .bind(order.paid_at)
        .bind(order.completed_at)
        .bind(order.updated_at)
}

#[async_trait]
impl MarketStore for PgStore {
    async fn insert_product(&self, product: &Product) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, farmer_aadhaar, farmer_name, contact_number, name,
                description, price, quantity, unit, category, location, image_url, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(product.id)
        .bind(&product.farmer_aadhaar)
        .bind(&product.farmer_name)
        .bind(&product.contact_number)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.quantity)
        .bind(&product.unit)
        .bind(&product.category)
        .bind(&product.location)
        .bind(product.image_url.as_deref())
        .bind(product.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn fetch_product(&self, id: Uuid) -> Result<Option<Product>> {
        let product = sqlx::query_as("SELECT * FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        let products = sqlx::query_as("SELECT * FROM products ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;
        Ok(products)
    }

    async fn products_by_farmer(&self, aadhaar: &str) -> Result<Vec<Product>> {
        let products = sqlx::query_as(
            "SELECT * FROM products WHERE farmer_aadhaar = $1 ORDER BY created_at DESC",
        )
        .bind(aadhaar)
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    async fn save_product(&self, product: &Product) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE products SET name = $2, description = $3, price = $4, quantity = $5,
                unit = $6, category = $7, location = $8, image_url = $9
            WHERE id = $1
            "#,
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.quantity)
        .bind(&product.unit)
        .bind(&product.category)
        .bind(&product.location)
        .bind(product.image_url.as_deref())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete_product(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn insert_order(&self, order: &Order) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, product_id, product_name, unit_price, quantity, unit,
                base_amount, delivery_charge, final_amount, delivery_type, farmer_aadhaar,
                farmer_name, customer_name, customer_mobile, status, payment_status,
                payment_qr_code, payment_expiry, rejection_reason, delivery_location,
                customer_location, farmer_location, order_date, accepted_at, paid_at,
                completed_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28)
            "#,
        )
        .bind(order.id)
        .bind(order.product_id)
        .bind(&order.product_name)
        .bind(order.unit_price)
        .bind(order.quantity)
        .bind(&order.unit)
        .bind(order.base_amount)
        .bind(order.delivery_charge)
        .bind(order.final_amount)
        .bind(order.delivery_type)
        .bind(&order.farmer_aadhaar)
        .bind(&order.farmer_name)
        .bind(&order.customer_name)
        .bind(&order.customer_mobile)
        .bind(order.status)
        .bind(order.payment_status)
        .bind(order.payment_qr_code.as_deref())
        .bind(order.payment_expiry)
        .bind(order.rejection_reason.as_deref())
        .bind(&order.delivery_location)
        .bind(order.customer_location.clone().map(Json))
        .bind(order.farmer_location.clone().map(Json))
        .bind(order.order_date)
        .bind(order.accepted_at)
        .bind(order.paid_at)
        .bind(order.completed_at)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn fetch_order(&self, id: Uuid) -> Result<Option<Order>> {
        let row: Option<OrderRow> = sqlx::query_as("SELECT * FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Order::from))
    }

    async fn orders_by_farmer(&self, aadhaar: &str) -> Result<Vec<Order>> {
        let rows: Vec<OrderRow> = sqlx::query_as(
            "SELECT * FROM orders WHERE farmer_aadhaar = $1 ORDER BY created_at DESC",
        )
        .bind(aadhaar)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Order::from).collect())
    }

    async fn orders_by_customer(&self, mobile: &str) -> Result<Vec<Order>> {
        let rows: Vec<OrderRow> = sqlx::query_as(
            "SELECT * FROM orders WHERE customer_mobile = $1 ORDER BY created_at DESC",
        )
        .bind(mobile)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Order::from).collect())
    }

    async fn update_order(&self, order: &Order, expected: OrderStatus) -> Result<bool> {
        let result = bind_order_update(order, expected).execute(&self.pool).await?;
        Ok(result.rows_affected() == 1)
    }

    async fn settle_payment(&self, order: &Order, revenue: &Revenue) -> Result<Settlement> {
        let mut tx = self.pool.begin().await?;

        let updated = bind_order_update(order, OrderStatus::PaymentPending)
            .execute(&mut *tx)
            .await?;
        if updated.rows_affected() != 1 {
            tx.rollback().await?;
            return Ok(Settlement::Stale);
        }

        let taken = sqlx::query(
            "UPDATE products SET quantity = quantity - $2 WHERE id = $1 AND quantity >= $2",
        )
        .bind(order.product_id)
        .bind(order.quantity)
        .execute(&mut *tx)
        .await?;
        if taken.rows_affected() != 1 {
            tx.rollback().await?;
            return Ok(Settlement::OutOfStock);
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO revenue (id, farmer_aadhaar, farmer_name, order_id, product_name, amount,
                base_amount, delivery_charge, delivery_type, quantity, unit, date,
                payment_method, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (order_id) DO NOTHING
            "#,
        )
        .bind(revenue.id)
        .bind(&revenue.farmer_aadhaar)
        .bind(&revenue.farmer_name)
        .bind(revenue.order_id)
        .bind(&revenue.product_name)
        .bind(revenue.amount)
        .bind(revenue.base_amount)
        .bind(revenue.delivery_charge)
        .bind(revenue.delivery_type)
        .bind(revenue.quantity)
        .bind(&revenue.unit)
        .bind(revenue.date)
        .bind(&revenue.payment_method)
        .bind(revenue.created_at)
        .execute(&mut *tx)
        .await?;
        if inserted.rows_affected() != 1 {
            tx.rollback().await?;
            return Ok(Settlement::Stale);
        }

        tx.commit().await?;
        Ok(Settlement::Settled)
    }

    async fn revenue_for_order(&self, order_id: Uuid) -> Result<Option<Revenue>> {
        let revenue = sqlx::query_as("SELECT * FROM revenue WHERE order_id = $1")
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(revenue)
    }

    async fn revenue_by_farmer(&self, aadhaar: &str) -> Result<Vec<Revenue>> {
        let revenue = sqlx::query_as(
            "SELECT * FROM revenue WHERE farmer_aadhaar = $1 ORDER BY created_at DESC",
        )
        .bind(aadhaar)
        .fetch_all(&self.pool)
        .await?;
        Ok(revenue)
    }
}
