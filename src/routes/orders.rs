//! Order routes.
//!
//! POST  /orders                          - Place an order (status=pending)
//! GET   /orders/{id}                     - Retrieve an order
//! GET   /orders/farmer/{aadhaar}         - Orders received by a farmer
//! GET   /orders/customer/{mobile}        - Orders placed by a customer
//! POST  /orders/{id}/accept              - Farmer accepts, payment QR issued
//! POST  /orders/{id}/reject              - Farmer rejects with a reason
//! POST  /orders/{id}/process-payment     - Customer confirms payment
//! GET   /orders/{id}/payment-status      - QR validity and countdown
//! POST  /orders/{id}/regenerate-qr       - Issue a fresh payment QR
//! PATCH /orders/{id}/farmer-location     - Set the pickup point
//! POST  /orders/{id}/complete            - Mark a paid order completed
//!
//! Every handler that changes an order writes it back guarded on the status
//! it was loaded with; losing that race answers 409.

use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Extension, Json, Router};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::extract::{AppJson, AppPath};
use crate::lifecycle::{self, PaymentView};
use crate::models::{
    ApiResponse, CreateOrderRequest, GeoPoint, Order, PaymentQrResponse, RejectOrderRequest,
    SettlementResponse,
};
use crate::state::AppState;
use crate::store::Settlement;

/// Build the orders router.
pub fn router() -> Router {
    Router::new()
        .route("/orders", post(create_order))
        .route("/orders/{id}", get(get_order))
        .route("/orders/farmer/{aadhaar}", get(farmer_orders))
        .route("/orders/customer/{mobile}", get(customer_orders))
        .route("/orders/{id}/accept", post(accept_order))
        .route("/orders/{id}/reject", post(reject_order))
        .route("/orders/{id}/process-payment", post(process_payment))
        .route("/orders/{id}/payment-status", get(payment_status))
        .route("/orders/{id}/regenerate-qr", post(regenerate_qr))
        .route("/orders/{id}/farmer-location", patch(set_farmer_location))
        .route("/orders/{id}/complete", post(complete_order))
}

// ============================================================================
// Helpers
// ============================================================================

async fn load_order(state: &AppState, id: Uuid) -> Result<Order> {
    state
        .store
        .fetch_order(id)
        .await?
        .ok_or(AppError::NotFound("order"))
}

/// Persist `order` if it differs from `before`, guarded on `before.status`.
async fn write_back(state: &AppState, before: &Order, order: &Order) -> Result<()> {
    if order == before {
        return Ok(());
    }
    if state.store.update_order(order, before.status).await? {
        Ok(())
    } else {
        Err(AppError::Conflict(format!(
            "order {} was modified by another request, reload and retry",
            order.id
        )))
    }
}

/// Normalize lapsed QR payments in a listing and store the ones that changed.
async fn normalize_all(state: &AppState, mut orders: Vec<Order>) -> Result<Vec<Order>> {
    let now = state.clock.now();
    for order in orders.iter_mut() {
        let status = order.status;
        if lifecycle::expire_if_elapsed(order, now)
            && !state.store.update_order(order, status).await?
        {
            // Someone else moved it on; serve what is stored now.
            if let Some(fresh) = state.store.fetch_order(order.id).await? {
                *order = fresh;
            }
        }
    }
    Ok(orders)
}

fn qr_response(order: Order) -> Result<PaymentQrResponse> {
    match (order.payment_qr_code.clone(), order.payment_expiry) {
        (Some(qr_code), Some(payment_expiry)) => Ok(PaymentQrResponse {
            order,
            qr_code,
            payment_expiry,
        }),
        _ => Err(AppError::Internal(format!(
            "order {} has no payment QR after issuing one",
            order.id
        ))),
    }
}

fn validate_new_order(req: &CreateOrderRequest) -> Result<()> {
    if req.customer_name.trim().is_empty() || req.customer_mobile.trim().is_empty() {
        return Err(AppError::Validation(
            "customerName and customerMobile are required".to_string(),
        ));
    }
    if req.quantity < 1 {
        return Err(AppError::Validation("Quantity must be at least 1".to_string()));
    }
    Ok(())
}

fn validate_location(point: &GeoPoint) -> Result<()> {
    let lat_ok = point.lat.is_finite() && (-90.0..=90.0).contains(&point.lat);
    let lng_ok = point.lng.is_finite() && (-180.0..=180.0).contains(&point.lng);
    if !lat_ok || !lng_ok {
        return Err(AppError::Validation("lat/lng are out of range".to_string()));
    }
    if point.address.trim().is_empty() {
        return Err(AppError::Validation("address is required".to_string()));
    }
    Ok(())
}

// ============================================================================
// Handlers
// ============================================================================

/// Place an order against a product listing.
///
/// Price, product name and farmer identity are read from the listing; the
/// ordered quantity must be in stock.
async fn create_order(
    Extension(state): Extension<AppState>,
    AppJson(req): AppJson<CreateOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Order>>)> {
    validate_new_order(&req)?;

    let product = state
        .store
        .fetch_product(req.product_id)
        .await?
        .ok_or(AppError::NotFound("product"))?;

    if product.quantity < req.quantity {
        return Err(AppError::Validation(format!(
            "Only {} {} available",
            product.quantity, product.unit
        )));
    }

    let order = lifecycle::open_order(&product, req, state.clock.now())?;
    state.store.insert_order(&order).await?;

    info!(
        "Order {} created for {} ({} x {} {})",
        order.id, order.customer_mobile, order.product_name, order.quantity, order.unit
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(order, "Order created successfully")),
    ))
}

/// Retrieve an order by ID.
async fn get_order(
    Extension(state): Extension<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<ApiResponse<Order>>> {
    let mut order = load_order(&state, id).await?;
    let before = order.clone();
    lifecycle::expire_if_elapsed(&mut order, state.clock.now());
    write_back(&state, &before, &order).await?;

    Ok(Json(ApiResponse::new(order, "Order retrieved")))
}

async fn farmer_orders(
    Extension(state): Extension<AppState>,
    AppPath(aadhaar): AppPath<String>,
) -> Result<Json<ApiResponse<Vec<Order>>>> {
    let orders = state.store.orders_by_farmer(&aadhaar).await?;
    let orders = normalize_all(&state, orders).await?;
    let message = format!("{} orders", orders.len());
    Ok(Json(ApiResponse::new(orders, message)))
}

async fn customer_orders(
    Extension(state): Extension<AppState>,
    AppPath(mobile): AppPath<String>,
) -> Result<Json<ApiResponse<Vec<Order>>>> {
    let orders = state.store.orders_by_customer(&mobile).await?;
    let orders = normalize_all(&state, orders).await?;
    let message = format!("{} orders", orders.len());
    Ok(Json(ApiResponse::new(orders, message)))
}

/// Farmer accepts a pending order; the response carries the payment QR and
/// its expiry.
async fn accept_order(
    Extension(state): Extension<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<ApiResponse<PaymentQrResponse>>> {
    let mut order = load_order(&state, id).await?;
    let before = order.clone();
    let ttl = state.config.payment_qr_ttl;

    let outcome = lifecycle::accept(&mut order, &mut rand::thread_rng(), state.clock.now(), ttl);
    write_back(&state, &before, &order).await?;
    outcome?;

    info!("Order {} accepted, payment QR valid until {:?}", order.id, order.payment_expiry);

    let message = format!(
        "Order accepted. QR code generated for payment. Valid for {} seconds.",
        ttl.num_seconds()
    );
    Ok(Json(ApiResponse::new(qr_response(order)?, message)))
}

async fn reject_order(
    Extension(state): Extension<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(req): AppJson<RejectOrderRequest>,
) -> Result<Json<ApiResponse<Order>>> {
    let mut order = load_order(&state, id).await?;
    let before = order.clone();

    let outcome = lifecycle::reject(&mut order, &req.rejection_reason, state.clock.now());
    write_back(&state, &before, &order).await?;
    outcome?;

    info!("Order {} rejected: {}", order.id, req.rejection_reason.trim());
    Ok(Json(ApiResponse::new(order, "Order rejected successfully")))
}

/// Customer confirms payment. The paid order, the farmer's revenue entry and
/// the stock decrement are stored together.
async fn process_payment(
    Extension(state): Extension<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<ApiResponse<SettlementResponse>>> {
    let mut order = load_order(&state, id).await?;
    let before = order.clone();

    match lifecycle::pay(&mut order, state.clock.now()) {
        Ok(revenue) => {
            match state.store.settle_payment(&order, &revenue).await? {
                Settlement::Settled => {}
                Settlement::Stale => {
                    return Err(AppError::Conflict(format!(
                        "order {} is no longer awaiting payment",
                        order.id
                    )))
                }
                Settlement::OutOfStock => {
                    return Err(AppError::Conflict(format!(
                        "not enough {} left to fill order {}",
                        order.product_name, order.id
                    )))
                }
            }
            info!(
                "Order {} paid ({}), {} credited to farmer {}",
                order.id, order.status, revenue.amount, revenue.farmer_aadhaar
            );
            Ok(Json(ApiResponse::new(
                SettlementResponse { order, revenue },
                "Payment completed successfully and amount credited to farmer revenue",
            )))
        }
        Err(e) => {
            if order != before {
                warn!("Order {} payment QR expired, reverted to {}", order.id, order.status);
            }
            write_back(&state, &before, &order).await?;
            Err(e.into())
        }
    }
}

async fn payment_status(
    Extension(state): Extension<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<ApiResponse<PaymentView>>> {
    let mut order = load_order(&state, id).await?;
    let before = order.clone();
    let now = state.clock.now();
    lifecycle::expire_if_elapsed(&mut order, now);
    write_back(&state, &before, &order).await?;

    let revenue = state.store.revenue_for_order(order.id).await?;
    let view = lifecycle::payment_view(&order, revenue.as_ref(), now);
    let message = view.message();
    Ok(Json(ApiResponse::new(view, message)))
}

async fn regenerate_qr(
    Extension(state): Extension<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<ApiResponse<PaymentQrResponse>>> {
    let mut order = load_order(&state, id).await?;
    let before = order.clone();
    let ttl = state.config.payment_qr_ttl;

    let outcome =
        lifecycle::regenerate_qr(&mut order, &mut rand::thread_rng(), state.clock.now(), ttl);
    write_back(&state, &before, &order).await?;
    outcome?;

    info!("Order {} payment QR regenerated", order.id);

    let message = format!("New QR code generated. Valid for {} seconds.", ttl.num_seconds());
    Ok(Json(ApiResponse::new(qr_response(order)?, message)))
}

async fn set_farmer_location(
    Extension(state): Extension<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(point): AppJson<GeoPoint>,
) -> Result<Json<ApiResponse<Order>>> {
    validate_location(&point)?;

    let mut order = load_order(&state, id).await?;
    let before = order.clone();
    lifecycle::set_farmer_location(&mut order, point, state.clock.now());
    write_back(&state, &before, &order).await?;

    Ok(Json(ApiResponse::new(order, "Farmer location updated successfully")))
}

async fn complete_order(
    Extension(state): Extension<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<ApiResponse<Order>>> {
    let mut order = load_order(&state, id).await?;
    let before = order.clone();

    lifecycle::complete(&mut order, state.clock.now())?;
    write_back(&state, &before, &order).await?;

    info!("Order {} completed", order.id);
    Ok(Json(ApiResponse::new(order, "Order completed")))
}
