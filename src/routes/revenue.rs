//! Revenue routes.
//!
//! GET /revenue/farmer/{aadhaar} - Ledger entries and totals for a farmer

use axum::routing::get;
use axum::{Extension, Json, Router};
use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;

use crate::error::Result;
use crate::extract::AppPath;
use crate::models::{ApiResponse, DeliveryType, Revenue, RevenueSummary, RevenueTotals};
use crate::state::AppState;

/// Build the revenue router.
pub fn router() -> Router {
    Router::new().route("/revenue/farmer/{aadhaar}", get(farmer_revenue))
}

fn saturating_sum(amounts: impl Iterator<Item = Decimal>) -> Decimal {
    amounts.fold(Decimal::ZERO, |acc, amount| acc.saturating_add(amount))
}

/// Totals over `entries`; the monthly figure covers the calendar month of
/// `now`.
pub fn totals(entries: &[Revenue], now: DateTime<Utc>) -> RevenueTotals {
    let total_revenue = saturating_sum(entries.iter().map(|r| r.amount));
    let monthly_revenue = saturating_sum(
        entries
            .iter()
            .filter(|r| r.created_at.year() == now.year() && r.created_at.month() == now.month())
            .map(|r| r.amount),
    );
    let delivery_earnings = saturating_sum(
        entries
            .iter()
            .filter(|r| r.delivery_type == DeliveryType::HomeDelivery)
            .map(|r| r.delivery_charge),
    );

    RevenueTotals {
        total_revenue,
        monthly_revenue,
        total_transactions: entries.len(),
        delivery_earnings,
    }
}

async fn farmer_revenue(
    Extension(state): Extension<AppState>,
    AppPath(aadhaar): AppPath<String>,
) -> Result<Json<ApiResponse<RevenueSummary>>> {
    let transactions = state.store.revenue_by_farmer(&aadhaar).await?;
    let totals = totals(&transactions, state.clock.now());
    let message = format!("{} transactions", totals.total_transactions);

    Ok(Json(ApiResponse::new(
        RevenueSummary {
            transactions,
            totals,
        },
        message,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn entry(amount: i64, charge: i64, delivery_type: DeliveryType, at: DateTime<Utc>) -> Revenue {
        Revenue {
            id: Uuid::new_v4(),
            farmer_aadhaar: "123412341234".into(),
            farmer_name: "Ramesh".into(),
            order_id: Uuid::new_v4(),
            product_name: "Tomatoes".into(),
            amount: Decimal::new(amount, 2),
            base_amount: Decimal::new(amount - charge, 2),
            delivery_charge: Decimal::new(charge, 2),
            delivery_type,
            quantity: 1,
            unit: "kg".into(),
            date: at.date_naive(),
            payment_method: "qr_payment".into(),
            created_at: at,
        }
    }

    #[test]
    fn totals_split_month_and_delivery() {
        let now = Utc.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap();
        let entries = vec![
            entry(20600, 600, DeliveryType::HomeDelivery, now),
            entry(10000, 0, DeliveryType::Pickup, now - Duration::days(2)),
            entry(5150, 150, DeliveryType::HomeDelivery, now - Duration::days(40)),
        ];

        let t = totals(&entries, now);
        assert_eq!(t.total_revenue, Decimal::new(35750, 2));
        assert_eq!(t.monthly_revenue, Decimal::new(30600, 2));
        assert_eq!(t.delivery_earnings, Decimal::new(750, 2));
        assert_eq!(t.total_transactions, 3);
    }

    #[test]
    fn huge_totals_saturate() {
        let now = Utc::now();
        let mut big = entry(0, 0, DeliveryType::Pickup, now);
        big.amount = Decimal::MAX;
        let t = totals(&[big.clone(), big], now);
        assert_eq!(t.total_revenue, Decimal::MAX);
        assert_eq!(t.total_transactions, 2);
    }

    #[test]
    fn empty_ledger_is_zero() {
        let t = totals(&[], Utc::now());
        assert_eq!(t.total_revenue, Decimal::ZERO);
        assert_eq!(t.total_transactions, 0);
    }
}
