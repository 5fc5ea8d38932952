//! Product listing routes.
//!
//! POST   /products                  - List a product
//! GET    /products                  - All listings, newest first
//! GET    /products/{id}             - One listing
//! GET    /products/farmer/{aadhaar} - A farmer's listings
//! PUT    /products/{id}             - Update listing fields
//! DELETE /products/{id}             - Remove a listing
//!
//! Images are hosted elsewhere; listings only carry the image URL.

use axum::http::StatusCode;
use axum::routing::get;
use axum::{Extension, Json, Router};
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::extract::{AppJson, AppPath};
use crate::models::{ApiResponse, CreateProductRequest, Product, UpdateProductRequest};
use crate::state::AppState;

/// Build the products router.
pub fn router() -> Router {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/products/farmer/{aadhaar}", get(farmer_products))
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

/// Highest accepted unit price (one billion).
fn max_price() -> Decimal {
    Decimal::new(1_000_000_000, 0)
}

fn check_price(price: Decimal) -> Result<()> {
    if price <= Decimal::ZERO {
        return Err(AppError::Validation("price must be positive".to_string()));
    }
    if price > max_price() {
        return Err(AppError::Validation(format!(
            "price cannot exceed {}",
            max_price()
        )));
    }
    Ok(())
}

fn check_quantity(quantity: i32) -> Result<()> {
    if quantity < 0 {
        return Err(AppError::Validation("quantity cannot be negative".to_string()));
    }
    Ok(())
}

fn validate_new_product(req: &CreateProductRequest) -> Result<()> {
    require("farmerAadhaar", &req.farmer_aadhaar)?;
    require("farmerName", &req.farmer_name)?;
    require("contactNumber", &req.contact_number)?;
    require("name", &req.name)?;
    require("description", &req.description)?;
    require("unit", &req.unit)?;
    require("category", &req.category)?;
    require("location", &req.location)?;
    check_price(req.price)?;
    check_quantity(req.quantity)
}

/// Apply the fields present in `req` to `product`.
fn apply_update(product: &mut Product, req: UpdateProductRequest) -> Result<()> {
    if let Some(name) = req.name {
        require("name", &name)?;
        product.name = name;
    }
    if let Some(description) = req.description {
        product.description = description;
    }
    if let Some(price) = req.price {
        check_price(price)?;
        product.price = price;
    }
    if let Some(quantity) = req.quantity {
        check_quantity(quantity)?;
        product.quantity = quantity;
    }
    if let Some(unit) = req.unit {
        require("unit", &unit)?;
        product.unit = unit;
    }
    if let Some(category) = req.category {
        require("category", &category)?;
        product.category = category;
    }
    if let Some(location) = req.location {
        product.location = location;
    }
    if let Some(image_url) = req.image_url {
        product.image_url = Some(image_url).filter(|u| !u.trim().is_empty());
    }
    Ok(())
}

async fn create_product(
    Extension(state): Extension<AppState>,
    AppJson(req): AppJson<CreateProductRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Product>>)> {
    validate_new_product(&req)?;

    let product = Product {
        id: Uuid::new_v4(),
        farmer_aadhaar: req.farmer_aadhaar.trim().to_string(),
        farmer_name: req.farmer_name,
        contact_number: req.contact_number,
        name: req.name,
        description: req.description,
        price: req.price,
        quantity: req.quantity,
        unit: req.unit,
        category: req.category,
        location: req.location,
        image_url: req.image_url.filter(|u| !u.trim().is_empty()),
        created_at: state.clock.now(),
    };
    state.store.insert_product(&product).await?;

    info!("Product {} listed by farmer {}", product.id, product.farmer_aadhaar);

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(product, "Product listed successfully")),
    ))
}

async fn list_products(
    Extension(state): Extension<AppState>,
) -> Result<Json<ApiResponse<Vec<Product>>>> {
    let products = state.store.list_products().await?;
    let message = format!("{} products", products.len());
    Ok(Json(ApiResponse::new(products, message)))
}

async fn get_product(
    Extension(state): Extension<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<ApiResponse<Product>>> {
    let product = state
        .store
        .fetch_product(id)
        .await?
        .ok_or(AppError::NotFound("product"))?;
    Ok(Json(ApiResponse::new(product, "Product retrieved")))
}

async fn farmer_products(
    Extension(state): Extension<AppState>,
    AppPath(aadhaar): AppPath<String>,
) -> Result<Json<ApiResponse<Vec<Product>>>> {
    let products = state.store.products_by_farmer(&aadhaar).await?;
    let message = format!("{} products", products.len());
    Ok(Json(ApiResponse::new(products, message)))
}

async fn update_product(
    Extension(state): Extension<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(req): AppJson<UpdateProductRequest>,
) -> Result<Json<ApiResponse<Product>>> {
    let mut product = state
        .store
        .fetch_product(id)
        .await?
        .ok_or(AppError::NotFound("product"))?;

    apply_update(&mut product, req)?;
    if !state.store.save_product(&product).await? {
        return Err(AppError::NotFound("product"));
    }

    Ok(Json(ApiResponse::new(product, "Product updated successfully")))
}

async fn delete_product(
    Extension(state): Extension<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<ApiResponse<Uuid>>> {
    if !state.store.delete_product(id).await? {
        return Err(AppError::NotFound("product"));
    }
    info!("Product {} deleted", id);
    Ok(Json(ApiResponse::new(id, "Product deleted successfully")))
}
