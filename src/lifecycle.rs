//! # Order Lifecycle
//!
//! Pure transitions over an [`Order`]. Nothing here touches storage; route
//! handlers load an order, apply one of these functions with the current time
//! and write the result back guarded on the status they read.
//!
//! ```text
//! pending --accept--> payment_pending --pay--> confirmed | delivery --complete--> completed
//! pending --reject--> rejected
//! payment_pending --(expiry elapsed, next touch)--> pending
//! ```
//!
//! Expiry is a plain timestamp comparison made whenever an order is touched.

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    CreateOrderRequest, DeliveryType, GeoPoint, Order, OrderStatus, PaymentStatus, Product, Revenue,
};
use crate::qr;

pub const PAYMENT_METHOD_QR: &str = "qr_payment";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("order already processed (status {0})")]
    AlreadyProcessed(OrderStatus),

    #[error("payment not required or already processed")]
    PaymentNotRequired,

    #[error("payment QR code expired; regenerate the QR code and pay before it expires")]
    Expired,

    #[error("rejection reason is required")]
    MissingReason,

    #[error("cannot {action} an order in status {from}")]
    NotAllowed {
        action: &'static str,
        from: OrderStatus,
    },
}

/// The order's amounts do not fit a decimal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("order amount is too large")]
pub struct AmountOverflow;

// ============================================================================
// Pricing
// ============================================================================

/// Share of the base amount charged for home delivery (3%).
pub fn delivery_rate() -> Decimal {
    Decimal::new(3, 2)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quote {
    pub base_amount: Decimal,
    pub delivery_charge: Decimal,
    pub final_amount: Decimal,
}

/// Price `quantity` units at `unit_price`, adding the delivery surcharge
/// (rounded to paise) for home delivery.
pub fn quote(
    unit_price: Decimal,
    quantity: i32,
    delivery_type: DeliveryType,
) -> Result<Quote, AmountOverflow> {
    let base_amount = unit_price
        .checked_mul(Decimal::from(quantity))
        .ok_or(AmountOverflow)?;
    let delivery_charge = match delivery_type {
        DeliveryType::HomeDelivery => base_amount
            .checked_mul(delivery_rate())
            .ok_or(AmountOverflow)?
            .round_dp(2),
        DeliveryType::Pickup => Decimal::ZERO,
    };
    let final_amount = base_amount
        .checked_add(delivery_charge)
        .ok_or(AmountOverflow)?;
    Ok(Quote {
        base_amount,
        delivery_charge,
        final_amount,
    })
}

// ============================================================================
// Creation
// ============================================================================

/// Open a pending order for `product`. Price, name and farmer identity come
/// from the listing; the request only chooses quantity and delivery.
pub fn open_order(
    product: &Product,
    req: CreateOrderRequest,
    now: DateTime<Utc>,
) -> Result<Order, AmountOverflow> {
    let quote = quote(product.price, req.quantity, req.delivery_type)?;
    let customer_location = match req.delivery_type {
        DeliveryType::HomeDelivery => req.customer_location,
        DeliveryType::Pickup => None,
    };

    Ok(Order {
        id: Uuid::new_v4(),
        product_id: product.id,
        product_name: product.name.clone(),
        unit_price: product.price,
        quantity: req.quantity,
        unit: req
            .unit
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| product.unit.clone()),
        base_amount: quote.base_amount,
        delivery_charge: quote.delivery_charge,
        final_amount: quote.final_amount,
        delivery_type: req.delivery_type,
        farmer_aadhaar: product.farmer_aadhaar.clone(),
        farmer_name: product.farmer_name.clone(),
        customer_name: req.customer_name.trim().to_string(),
        customer_mobile: req.customer_mobile.trim().to_string(),
        status: OrderStatus::Pending,
        payment_status: PaymentStatus::Pending,
        payment_qr_code: None,
        payment_expiry: None,
        rejection_reason: None,
        delivery_location: req.delivery_location,
        customer_location,
        farmer_location: None,
        order_date: req.date.unwrap_or_else(|| now.date_naive()),
        accepted_at: None,
        paid_at: None,
        completed_at: None,
        created_at: now,
        updated_at: now,
    })
}

// ============================================================================
// Transitions
// ============================================================================

/// Revert a `payment_pending` order whose QR has lapsed back to `pending`.
/// Returns true when the order changed.
pub fn expire_if_elapsed(order: &mut Order, now: DateTime<Utc>) -> bool {
    let lapsed = order.status == OrderStatus::PaymentPending
        && order.payment_expiry.is_some_and(|expiry| now > expiry);
    if lapsed {
        order.status = OrderStatus::Pending;
        order.payment_status = PaymentStatus::Expired;
        order.payment_qr_code = None;
        order.payment_expiry = None;
        order.updated_at = now;
    }
    lapsed
}

fn issue_qr<R: RngCore>(order: &mut Order, rng: &mut R, now: DateTime<Utc>, ttl: Duration) {
    order.payment_qr_code = Some(qr::payment_token(rng, order.id, order.final_amount, now));
    order.payment_expiry = Some(now + ttl);
    order.payment_status = PaymentStatus::Pending;
    order.status = OrderStatus::PaymentPending;
    order.updated_at = now;
}

/// Farmer accepts a pending order and a payment QR valid for `ttl` is issued.
pub fn accept<R: RngCore>(
    order: &mut Order,
    rng: &mut R,
    now: DateTime<Utc>,
    ttl: Duration,
) -> Result<(), TransitionError> {
    expire_if_elapsed(order, now);
    if order.status != OrderStatus::Pending {
        return Err(TransitionError::AlreadyProcessed(order.status));
    }
    issue_qr(order, rng, now, ttl);
    order.accepted_at = Some(now);
    Ok(())
}

/// Issue a fresh QR for an order awaiting payment, or for one whose previous
/// QR expired.
pub fn regenerate_qr<R: RngCore>(
    order: &mut Order,
    rng: &mut R,
    now: DateTime<Utc>,
    ttl: Duration,
) -> Result<(), TransitionError> {
    expire_if_elapsed(order, now);
    match (order.status, order.payment_status) {
        (OrderStatus::PaymentPending, _) | (OrderStatus::Pending, PaymentStatus::Expired) => {
            issue_qr(order, rng, now, ttl);
            Ok(())
        }
        (from, _) => Err(TransitionError::NotAllowed {
            action: "regenerate the QR code for",
            from,
        }),
    }
}

pub fn reject(order: &mut Order, reason: &str, now: DateTime<Utc>) -> Result<(), TransitionError> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(TransitionError::MissingReason);
    }
    expire_if_elapsed(order, now);
    if order.status != OrderStatus::Pending {
        return Err(TransitionError::NotAllowed {
            action: "reject",
            from: order.status,
        });
    }
    order.status = OrderStatus::Rejected;
    order.rejection_reason = Some(reason.to_string());
    order.updated_at = now;
    Ok(())
}

/// Customer confirms payment. On success the order moves to `confirmed`
/// (pickup) or `delivery` (home delivery) and the farmer's revenue entry is
/// returned for the caller to store together with the order.
///
/// An expired QR normalizes the order back to `pending` before failing with
/// [`TransitionError::Expired`]; the caller must persist that change too.
pub fn pay(order: &mut Order, now: DateTime<Utc>) -> Result<Revenue, TransitionError> {
    if expire_if_elapsed(order, now) {
        return Err(TransitionError::Expired);
    }
    if order.status == OrderStatus::Pending && order.payment_status == PaymentStatus::Expired {
        return Err(TransitionError::Expired);
    }
    if order.status != OrderStatus::PaymentPending {
        return Err(TransitionError::PaymentNotRequired);
    }

    order.payment_status = PaymentStatus::Completed;
    order.status = match order.delivery_type {
        DeliveryType::HomeDelivery => OrderStatus::Delivery,
        DeliveryType::Pickup => OrderStatus::Confirmed,
    };
    order.payment_qr_code = None;
    order.payment_expiry = None;
    order.paid_at = Some(now);
    order.updated_at = now;

    Ok(revenue_for(order, now))
}

fn revenue_for(order: &Order, now: DateTime<Utc>) -> Revenue {
    Revenue {
        id: Uuid::new_v4(),
        farmer_aadhaar: order.farmer_aadhaar.clone(),
        farmer_name: order.farmer_name.clone(),
        order_id: order.id,
        product_name: order.product_name.clone(),
        amount: order.final_amount,
        base_amount: order.base_amount,
        delivery_charge: order.delivery_charge,
        delivery_type: order.delivery_type,
        quantity: order.quantity,
        unit: order.unit.clone(),
        date: now.date_naive(),
        payment_method: PAYMENT_METHOD_QR.to_string(),
        created_at: now,
    }
}

pub fn complete(order: &mut Order, now: DateTime<Utc>) -> Result<(), TransitionError> {
    match order.status {
        OrderStatus::Confirmed | OrderStatus::Delivery => {
            order.status = OrderStatus::Completed;
            order.completed_at = Some(now);
            order.updated_at = now;
            Ok(())
        }
        from => Err(TransitionError::NotAllowed {
            action: "complete",
            from,
        }),
    }
}

/// Record where the farmer hands the produce over; the address doubles as
/// the delivery location.
pub fn set_farmer_location(order: &mut Order, point: GeoPoint, now: DateTime<Utc>) {
    order.delivery_location = point.address.clone();
    order.farmer_location = Some(point);
    order.updated_at = now;
}

// ============================================================================
// Payment status view
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentView {
    pub payment_status: PaymentStatus,
    pub order_status: OrderStatus,
    pub is_qr_valid: bool,
    pub qr_code: Option<String>,
    pub payment_expiry: Option<DateTime<Utc>>,
    pub time_remaining: i64,
    pub final_amount: Decimal,
    pub revenue_created: bool,
    pub revenue_amount: Decimal,
}

impl PaymentView {
    pub fn message(&self) -> String {
        if self.is_qr_valid {
            format!("QR code valid for {} seconds", self.time_remaining)
        } else if self.payment_status == PaymentStatus::Completed {
            "Payment completed".to_string()
        } else {
            "QR code expired".to_string()
        }
    }
}

pub fn payment_view(order: &Order, revenue: Option<&Revenue>, now: DateTime<Utc>) -> PaymentView {
    let expiry = order
        .payment_expiry
        .filter(|_| order.status == OrderStatus::PaymentPending);
    let is_qr_valid = expiry.is_some_and(|e| now < e);
    let time_remaining = match expiry {
        Some(e) if is_qr_valid => (e - now).num_seconds().max(0),
        _ => 0,
    };

    PaymentView {
        payment_status: order.payment_status,
        order_status: order.status,
        is_qr_valid,
        qr_code: if is_qr_valid {
            order.payment_qr_code.clone()
        } else {
            None
        },
        payment_expiry: order.payment_expiry,
        time_remaining,
        final_amount: order.final_amount,
        revenue_created: revenue.is_some(),
        revenue_amount: revenue.map(|r| r.amount).unwrap_or(Decimal::ZERO),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn product(price: Decimal) -> Product {
        Product {
            id: Uuid::new_v4(),
            farmer_aadhaar: "123412341234".into(),
            farmer_name: "Ramesh".into(),
            contact_number: "9000000000".into(),
            name: "Tomatoes".into(),
            description: "Fresh red tomatoes".into(),
            price,
            quantity: 50,
            unit: "kg".into(),
            category: "vegetables".into(),
            location: "Nashik".into(),
            image_url: None,
            created_at: Utc::now(),
        }
    }

    fn request(product: &Product, quantity: i32, delivery_type: DeliveryType) -> CreateOrderRequest {
        CreateOrderRequest {
            product_id: product.id,
            quantity,
            unit: None,
            customer_name: "Asha".into(),
            customer_mobile: "9876543210".into(),
            delivery_type,
            delivery_location: String::new(),
            customer_location: Some(GeoPoint {
                lat: 19.99,
                lng: 73.78,
                address: "Gangapur Road".into(),
            }),
            date: None,
        }
    }

    fn order(delivery_type: DeliveryType, now: DateTime<Utc>) -> Order {
        let p = product(Decimal::new(100, 0));
        open_order(&p, request(&p, 2, delivery_type), now).unwrap()
    }

    fn ttl() -> Duration {
        Duration::seconds(60)
    }

    #[test]
    fn home_delivery_adds_three_percent() {
        let q = quote(Decimal::new(100, 0), 2, DeliveryType::HomeDelivery).unwrap();
        assert_eq!(q.base_amount, Decimal::new(200, 0));
        assert_eq!(q.delivery_charge, Decimal::new(600, 2));
        assert_eq!(q.final_amount.to_string(), "206.00");
    }

    #[test]
    fn pickup_has_no_delivery_charge() {
        let q = quote(Decimal::new(4550, 2), 3, DeliveryType::Pickup).unwrap();
        assert_eq!(q.delivery_charge, Decimal::ZERO);
        assert_eq!(q.final_amount, Decimal::new(13650, 2));
    }

    #[test]
    fn delivery_charge_rounds_to_paise() {
        let q = quote(Decimal::new(3333, 2), 1, DeliveryType::HomeDelivery).unwrap();
        // 33.33 * 0.03 = 0.9999
        assert_eq!(q.delivery_charge, Decimal::new(100, 2));
        assert_eq!(q.final_amount, Decimal::new(3433, 2));
    }

    #[test]
    fn quote_reports_overflow_instead_of_panicking() {
        assert_eq!(quote(Decimal::MAX, 2, DeliveryType::Pickup), Err(AmountOverflow));
        assert_eq!(quote(Decimal::MAX, 1, DeliveryType::HomeDelivery), Err(AmountOverflow));
        assert!(quote(Decimal::MAX, 1, DeliveryType::Pickup).is_ok());
    }

    #[test]
    fn open_order_refuses_unrepresentable_amounts() {
        let p = product(Decimal::MAX);
        let result = open_order(&p, request(&p, 2, DeliveryType::Pickup), Utc::now());
        assert_eq!(result.unwrap_err(), AmountOverflow);
    }

    #[test]
    fn open_order_takes_listing_details() {
        let now = Utc::now();
        let p = product(Decimal::new(100, 0));
        let o = open_order(&p, request(&p, 2, DeliveryType::Pickup), now).unwrap();
        assert_eq!(o.status, OrderStatus::Pending);
        assert_eq!(o.payment_status, PaymentStatus::Pending);
        assert_eq!(o.unit, "kg");
        assert_eq!(o.farmer_aadhaar, p.farmer_aadhaar);
        assert_eq!(o.final_amount, Decimal::new(200, 0));
        assert!(o.customer_location.is_none(), "pickup orders drop the customer location");
        assert_eq!(o.order_date, now.date_naive());
    }

    #[test]
    fn accept_sets_payment_pending_with_expiry() {
        let now = Utc::now();
        let mut rng = StdRng::seed_from_u64(1);
        let mut o = order(DeliveryType::Pickup, now);

        accept(&mut o, &mut rng, now, ttl()).unwrap();
        assert_eq!(o.status, OrderStatus::PaymentPending);
        assert_eq!(o.payment_expiry, Some(now + Duration::seconds(60)));
        assert_eq!(o.accepted_at, Some(now));
        assert!(o.payment_qr_code.is_some());
    }

    #[test]
    fn accept_twice_fails() {
        let now = Utc::now();
        let mut rng = StdRng::seed_from_u64(1);
        let mut o = order(DeliveryType::Pickup, now);
        accept(&mut o, &mut rng, now, ttl()).unwrap();

        let err = accept(&mut o, &mut rng, now, ttl()).unwrap_err();
        assert_eq!(err, TransitionError::AlreadyProcessed(OrderStatus::PaymentPending));
    }

    #[test]
    fn pay_before_expiry_confirms_pickup() {
        let now = Utc::now();
        let mut rng = StdRng::seed_from_u64(1);
        let mut o = order(DeliveryType::Pickup, now);
        accept(&mut o, &mut rng, now, ttl()).unwrap();

        let revenue = pay(&mut o, now + Duration::seconds(59)).unwrap();
        assert_eq!(o.status, OrderStatus::Confirmed);
        assert_eq!(o.payment_status, PaymentStatus::Completed);
        assert!(o.payment_expiry.is_none());
        assert_eq!(revenue.order_id, o.id);
        assert_eq!(revenue.amount, Decimal::new(200, 0));
        assert_eq!(revenue.payment_method, PAYMENT_METHOD_QR);
    }

    #[test]
    fn pay_home_delivery_moves_to_delivery() {
        let now = Utc::now();
        let mut rng = StdRng::seed_from_u64(1);
        let mut o = order(DeliveryType::HomeDelivery, now);
        accept(&mut o, &mut rng, now, ttl()).unwrap();

        let revenue = pay(&mut o, now).unwrap();
        assert_eq!(o.status, OrderStatus::Delivery);
        assert_eq!(revenue.amount, Decimal::new(20600, 2));
        assert_eq!(revenue.base_amount, Decimal::new(200, 0));
        assert_eq!(revenue.delivery_charge, Decimal::new(600, 2));
    }

    #[test]
    fn pay_after_expiry_resets_to_pending() {
        let now = Utc::now();
        let mut rng = StdRng::seed_from_u64(1);
        let mut o = order(DeliveryType::Pickup, now);
        accept(&mut o, &mut rng, now, ttl()).unwrap();

        let err = pay(&mut o, now + Duration::seconds(61)).unwrap_err();
        assert_eq!(err, TransitionError::Expired);
        assert_eq!(o.status, OrderStatus::Pending);
        assert_eq!(o.payment_status, PaymentStatus::Expired);
        assert!(o.payment_expiry.is_none());
        assert!(o.payment_qr_code.is_none());

        // Still expired on a second attempt, not "payment not required".
        let err = pay(&mut o, now + Duration::seconds(62)).unwrap_err();
        assert_eq!(err, TransitionError::Expired);
    }

    #[test]
    fn pay_exactly_at_expiry_still_succeeds() {
        let now = Utc::now();
        let mut rng = StdRng::seed_from_u64(1);
        let mut o = order(DeliveryType::Pickup, now);
        accept(&mut o, &mut rng, now, ttl()).unwrap();

        assert!(pay(&mut o, now + ttl()).is_ok());
    }

    #[test]
    fn pay_without_acceptance_is_not_required() {
        let now = Utc::now();
        let mut o = order(DeliveryType::Pickup, now);
        assert_eq!(pay(&mut o, now).unwrap_err(), TransitionError::PaymentNotRequired);
    }

    #[test]
    fn regenerate_after_expiry_reopens_payment() {
        let now = Utc::now();
        let mut rng = StdRng::seed_from_u64(1);
        let mut o = order(DeliveryType::Pickup, now);
        accept(&mut o, &mut rng, now, ttl()).unwrap();
        let first_qr = o.payment_qr_code.clone();

        let later = now + Duration::seconds(120);
        regenerate_qr(&mut o, &mut rng, later, ttl()).unwrap();
        assert_eq!(o.status, OrderStatus::PaymentPending);
        assert_eq!(o.payment_status, PaymentStatus::Pending);
        assert_eq!(o.payment_expiry, Some(later + ttl()));
        assert_ne!(o.payment_qr_code, first_qr);
        assert!(pay(&mut o, later + Duration::seconds(10)).is_ok());
    }

    #[test]
    fn regenerate_on_fresh_pending_order_fails() {
        let now = Utc::now();
        let mut rng = StdRng::seed_from_u64(1);
        let mut o = order(DeliveryType::Pickup, now);
        let err = regenerate_qr(&mut o, &mut rng, now, ttl()).unwrap_err();
        assert!(matches!(err, TransitionError::NotAllowed { from: OrderStatus::Pending, .. }));
    }

    #[test]
    fn reject_requires_reason() {
        let now = Utc::now();
        let mut o = order(DeliveryType::Pickup, now);
        assert_eq!(reject(&mut o, "   ", now).unwrap_err(), TransitionError::MissingReason);
        assert_eq!(o.status, OrderStatus::Pending);

        reject(&mut o, " out of stock ", now).unwrap();
        assert_eq!(o.status, OrderStatus::Rejected);
        assert_eq!(o.rejection_reason.as_deref(), Some("out of stock"));
    }

    #[test]
    fn reject_after_acceptance_fails_until_expiry() {
        let now = Utc::now();
        let mut rng = StdRng::seed_from_u64(1);
        let mut o = order(DeliveryType::Pickup, now);
        accept(&mut o, &mut rng, now, ttl()).unwrap();

        assert!(reject(&mut o, "changed my mind", now).is_err());
        reject(&mut o, "customer did not pay", now + Duration::seconds(90)).unwrap();
        assert_eq!(o.status, OrderStatus::Rejected);
    }

    #[test]
    fn complete_only_after_payment() {
        let now = Utc::now();
        let mut rng = StdRng::seed_from_u64(1);
        let mut o = order(DeliveryType::HomeDelivery, now);
        assert!(complete(&mut o, now).is_err());

        accept(&mut o, &mut rng, now, ttl()).unwrap();
        pay(&mut o, now).unwrap();
        complete(&mut o, now).unwrap();
        assert_eq!(o.status, OrderStatus::Completed);
        assert_eq!(o.completed_at, Some(now));
    }

    #[test]
    fn payment_view_counts_down() {
        let now = Utc::now();
        let mut rng = StdRng::seed_from_u64(1);
        let mut o = order(DeliveryType::Pickup, now);
        accept(&mut o, &mut rng, now, ttl()).unwrap();

        let view = payment_view(&o, None, now + Duration::milliseconds(20_500));
        assert!(view.is_qr_valid);
        assert_eq!(view.time_remaining, 39);
        assert!(view.qr_code.is_some());
        assert!(!view.revenue_created);
        assert_eq!(view.message(), "QR code valid for 39 seconds");

        let view = payment_view(&o, None, now + Duration::seconds(61));
        assert!(!view.is_qr_valid);
        assert_eq!(view.time_remaining, 0);
        assert!(view.qr_code.is_none());
        assert_eq!(view.message(), "QR code expired");
    }

    #[test]
    fn payment_view_reports_revenue() {
        let now = Utc::now();
        let mut rng = StdRng::seed_from_u64(1);
        let mut o = order(DeliveryType::Pickup, now);
        accept(&mut o, &mut rng, now, ttl()).unwrap();
        let revenue = pay(&mut o, now).unwrap();

        let view = payment_view(&o, Some(&revenue), now);
        assert!(view.revenue_created);
        assert_eq!(view.revenue_amount, Decimal::new(200, 0));
        assert_eq!(view.message(), "Payment completed");
    }

    #[test]
    fn farmer_location_sets_delivery_address() {
        let now = Utc::now();
        let mut o = order(DeliveryType::Pickup, now);
        set_farmer_location(
            &mut o,
            GeoPoint {
                lat: 20.0,
                lng: 73.8,
                address: "Farm gate, Dindori".into(),
            },
            now,
        );
        assert_eq!(o.delivery_location, "Farm gate, Dindori");
        assert!(o.farmer_location.is_some());
    }
}
