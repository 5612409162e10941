//! Directory client for the COmanage Registry.

pub mod classify;
pub mod client;
pub mod dto;
pub mod error;

pub use classify::{
    AddMembershipOutcome, ReasonTextClassifier, ResponseClassifier, ResponseDescriptor,
};
pub use client::RegistryClient;
pub use error::{RegistryError, RegistryResult};

use crate::models::{Group, Person};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Registry operations the reconciler depends on.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Find the person whose email matches and who holds `external_id` as an
    /// identifier. Candidates are checked in registry order; first match wins.
    async fn resolve_person(&self, email: &str, external_id: &str) -> RegistryResult<Person>;

    /// Exact-name lookup; `Ok(None)` when no such group exists.
    async fn find_group_by_name(&self, name: &str) -> RegistryResult<Option<Group>>;

    async fn create_group(&self, name: &str) -> RegistryResult<Group>;

    /// Fails with [`RegistryError::AlreadyMember`] for a duplicate.
    async fn add_membership(
        &self,
        person_id: i64,
        group_id: i64,
        valid_through: Option<DateTime<Utc>>,
    ) -> RegistryResult<()>;

    /// Deletes every membership record for the pair. Fails with
    /// [`RegistryError::MembershipNotFound`] when there is none.
    async fn remove_membership(&self, person_id: i64, group_id: i64) -> RegistryResult<()>;
}
