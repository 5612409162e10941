//! Applies entitlement events to registry group membership.
//!
//! Per event: resolve the person, resolve the group, optionally create the
//! group, then add or remove the membership. Expected registry outcomes
//! (unknown person, duplicate membership, missing membership) end the event
//! successfully; only API errors escape.

use super::policy::GroupCreationPolicy;
use crate::models::{ApproveEvent, EntitlementEvent, Person, RevokeEvent};
use crate::registry::{Directory, RegistryError, RegistryResult};
use std::sync::Arc;
use tracing::{info, warn};

/// How an event was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Membership added; `group_created` when the group had to be created first.
    MembershipAdded { group_created: bool },
    AlreadyMember,
    /// Group missing and the allow-list forbids creating it.
    GroupCreationDisallowed,
    MembershipRemoved,
    NotAMember,
    /// Revocation for a resource that has no group.
    GroupAbsent,
    PersonUnknown,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::MembershipAdded {
                group_created: true,
            } => "group_created_and_added",
            Outcome::MembershipAdded {
                group_created: false,
            } => "added",
            Outcome::AlreadyMember => "already_member",
            Outcome::GroupCreationDisallowed => "group_creation_disallowed",
            Outcome::MembershipRemoved => "removed",
            Outcome::NotAMember => "not_a_member",
            Outcome::GroupAbsent => "group_absent",
            Outcome::PersonUnknown => "person_unknown",
        }
    }

    /// True when the event changed nothing in the registry.
    pub fn is_noop(&self) -> bool {
        !matches!(
            self,
            Outcome::MembershipAdded { .. } | Outcome::MembershipRemoved
        )
    }
}

pub struct Reconciler {
    directory: Arc<dyn Directory>,
    policy: GroupCreationPolicy,
}

impl Reconciler {
    pub fn new(directory: Arc<dyn Directory>, policy: GroupCreationPolicy) -> Self {
        Self { directory, policy }
    }

    #[tracing::instrument(
        name = "reconcile_approve",
        skip(self, event),
        fields(resource = %event.resource, application_id = event.application_id)
    )]
    pub async fn approve(&self, event: &ApproveEvent) -> RegistryResult<Outcome> {
        let may_create = self.policy.should_create_group(&event.resource);

        let Some(person) = self.resolve_person(event).await? else {
            return Ok(Outcome::PersonUnknown);
        };

        let existing = self.directory.find_group_by_name(&event.resource).await?;
        let (group, group_created) = match existing {
            Some(group) => (group, false),
            None if may_create => (self.directory.create_group(&event.resource).await?, true),
            None => {
                info!(
                    resource = %event.resource,
                    "Group not found and creation not allowed by pattern policy"
                );
                return Ok(Outcome::GroupCreationDisallowed);
            }
        };

        match self
            .directory
            .add_membership(person.id, group.id, event.expires_at)
            .await
        {
            Ok(()) => {
                info!(
                    person_id = person.id,
                    group_id = group.id,
                    group_created,
                    valid_through = ?event.expires_at,
                    "Added person to group"
                );
                Ok(Outcome::MembershipAdded { group_created })
            }
            Err(RegistryError::AlreadyMember { .. }) => {
                info!(
                    person_id = person.id,
                    group_id = group.id,
                    "Person already a member of group"
                );
                Ok(Outcome::AlreadyMember)
            }
            Err(e) => Err(e),
        }
    }

    #[tracing::instrument(
        name = "reconcile_revoke",
        skip(self, event),
        fields(resource = %event.resource, application_id = event.application_id)
    )]
    pub async fn revoke(&self, event: &RevokeEvent) -> RegistryResult<Outcome> {
        let Some(person) = self.resolve_person(event).await? else {
            return Ok(Outcome::PersonUnknown);
        };

        let Some(group) = self.directory.find_group_by_name(&event.resource).await? else {
            info!(
                resource = %event.resource,
                "Group not found during revoke, no action taken"
            );
            return Ok(Outcome::GroupAbsent);
        };

        match self.directory.remove_membership(person.id, group.id).await {
            Ok(()) => {
                info!(
                    person_id = person.id,
                    group_id = group.id,
                    "Removed person from group"
                );
                Ok(Outcome::MembershipRemoved)
            }
            Err(RegistryError::MembershipNotFound { .. }) => {
                info!(
                    person_id = person.id,
                    group_id = group.id,
                    "Person was not a member of group"
                );
                Ok(Outcome::NotAMember)
            }
            Err(e) => Err(e),
        }
    }

    /// `Ok(None)` when the registry has no matching person.
    async fn resolve_person(&self, event: &EntitlementEvent) -> RegistryResult<Option<Person>> {
        match self
            .directory
            .resolve_person(&event.user_email, &event.user_external_id)
            .await
        {
            Ok(person) => Ok(Some(person)),
            Err(RegistryError::PersonNotFound { .. }) => {
                warn!(
                    email = %event.user_email,
                    user = %event.user_external_id,
                    "Person not found in registry, skipping event"
                );
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
