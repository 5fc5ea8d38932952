//! Mock analysis generators.
//!
//! - `disease`: canned plant-disease reports picked by coin flip
//! - `sensor`: fixtures served when the sensor prediction backend is
//!   unavailable
//!
//! None of this is inference; the generators stand in for a model service
//! so the dashboards have something to render.

pub mod disease;
pub mod sensor;
