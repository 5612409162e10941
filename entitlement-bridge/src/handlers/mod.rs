//! HTTP handlers for the entitlement bridge.

pub mod events;
pub mod health;

pub use events::{approve, revoke};
pub use health::{health_check, metrics, readiness_check};
