//! Entitlement notifications as REMS posts them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One entitlement change for a user on a resource.
///
/// The wire names (`application`, `user`, `mail`, `end`) are the ones REMS
/// uses in its entitlement-post payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitlementEvent {
    #[serde(rename = "application")]
    pub application_id: i64,
    pub resource: String,
    #[serde(rename = "user")]
    pub user_external_id: String,
    #[serde(rename = "mail")]
    pub user_email: String,
    #[serde(rename = "end", default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Entitlement granted; same shape as a revocation.
pub type ApproveEvent = EntitlementEvent;

/// Entitlement withdrawn.
pub type RevokeEvent = EntitlementEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Approve,
    Revoke,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Approve => "approve",
            EventKind::Revoke => "revoke",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
