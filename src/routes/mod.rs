//! HTTP route modules.
//!
//! - `orders`: order placement and the accept / pay / complete lifecycle
//! - `products`: farmer product listings
//! - `revenue`: farmer revenue ledger and totals
//! - `insights`: mock disease detection and sensor insight fallbacks

pub mod insights;
pub mod orders;
pub mod products;
pub mod revenue;
