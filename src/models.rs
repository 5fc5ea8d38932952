//! Domain models for the marketplace.
//!
//! Orders, products and revenue entries as they are stored and served. JSON
//! uses camelCase field names to match the web clients; monetary values are
//! `Decimal` and travel as strings.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Enumerations
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "order_status", rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    PaymentPending,
    Confirmed,
    Delivery,
    Rejected,
    Completed,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::PaymentPending => "payment_pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Delivery => "delivery",
            OrderStatus::Rejected => "rejected",
            OrderStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Expired,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "delivery_type", rename_all = "snake_case")]
pub enum DeliveryType {
    #[default]
    Pickup,
    HomeDelivery,
}

/// A map position with a human readable address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
    pub address: String,
}

// ============================================================================
// Stored records
// ============================================================================

/// A customer's order for a single product listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub unit: String,
    pub base_amount: Decimal,
    pub delivery_charge: Decimal,
    pub final_amount: Decimal,
    pub delivery_type: DeliveryType,
    pub farmer_aadhaar: String,
    pub farmer_name: String,
    pub customer_name: String,
    pub customer_mobile: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_qr_code: Option<String>,
    pub payment_expiry: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub delivery_location: String,
    pub customer_location: Option<GeoPoint>,
    pub farmer_location: Option<GeoPoint>,
    pub order_date: NaiveDate,
    pub accepted_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A farmer's product listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub farmer_aadhaar: String,
    pub farmer_name: String,
    pub contact_number: String,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub quantity: i32,
    pub unit: String,
    pub category: String,
    pub location: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Money credited to a farmer when a customer pays for an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Revenue {
    pub id: Uuid,
    pub farmer_aadhaar: String,
    pub farmer_name: String,
    pub order_id: Uuid,
    pub product_name: String,
    pub amount: Decimal,
    pub base_amount: Decimal,
    pub delivery_charge: Decimal,
    pub delivery_type: DeliveryType,
    pub quantity: i32,
    pub unit: String,
    pub date: NaiveDate,
    pub payment_method: String,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Request Models
// ============================================================================

/// Request body for placing an order.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub product_id: Uuid,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    pub unit: Option<String>,
    pub customer_name: String,
    pub customer_mobile: String,
    #[serde(default)]
    pub delivery_type: DeliveryType,
    #[serde(default)]
    pub delivery_location: String,
    pub customer_location: Option<GeoPoint>,
    pub date: Option<NaiveDate>,
}

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectOrderRequest {
    #[serde(default)]
    pub rejection_reason: String,
}

/// Request body for listing a product.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub farmer_aadhaar: String,
    pub farmer_name: String,
    pub contact_number: String,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub quantity: i32,
    pub unit: String,
    pub category: String,
    pub location: String,
    pub image_url: Option<String>,
}

/// Partial update of a listing; absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub quantity: Option<i32>,
    pub unit: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub image_url: Option<String>,
}

// ============================================================================
// Response Models
// ============================================================================

/// Generic API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub message: String,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T, message: impl Into<String>) -> Self {
        Self {
            data,
            message: message.into(),
        }
    }
}

/// Returned by accept and regenerate-qr.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentQrResponse {
    pub order: Order,
    pub qr_code: String,
    pub payment_expiry: DateTime<Utc>,
}

/// Returned by process-payment.
#[derive(Debug, Serialize)]
pub struct SettlementResponse {
    pub order: Order,
    pub revenue: Revenue,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueTotals {
    pub total_revenue: Decimal,
    pub monthly_revenue: Decimal,
    pub total_transactions: usize,
    pub delivery_earnings: Decimal,
}

#[derive(Debug, Serialize)]
pub struct RevenueSummary {
    pub transactions: Vec<Revenue>,
    pub totals: RevenueTotals,
}
