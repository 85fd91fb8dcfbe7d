//! Axum handlers for the gateway and control-plane routes.

pub mod control;
pub mod events;
pub mod socket;
pub mod stream;
