//! Pseudo-QR payment tokens.
//!
//! The token is the JSON text a client renders as a QR code. Nothing scans or
//! verifies it; it only has to be unique per issue.

use chrono::{DateTime, Utc};
use rand::RngCore;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrPayload {
    pub order_id: Uuid,
    pub amount: Decimal,
    pub timestamp: i64,
    pub token: String,
}

/// Build a payment token for `order_id` carrying `amount` and a fresh nonce.
pub fn payment_token<R: RngCore>(
    rng: &mut R,
    order_id: Uuid,
    amount: Decimal,
    issued_at: DateTime<Utc>,
) -> String {
    let mut nonce = [0u8; 8];
    rng.fill_bytes(&mut nonce);
    let token = nonce.iter().map(|b| format!("{:02x}", b)).collect::<String>();

    let payload = QrPayload {
        order_id,
        amount,
        timestamp: issued_at.timestamp_millis(),
        token,
    };
    // A struct of plain fields always serializes.
    serde_json::to_string(&payload).unwrap_or_default()
}
