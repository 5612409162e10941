use thiserror::Error;

pub type RegistryResult<T> = Result<T, RegistryError>;

/// Failures and expected outcomes of registry operations.
///
/// `PersonNotFound`, `MembershipNotFound` and `AlreadyMember` come out of a
/// successful HTTP exchange and describe registry state. The remaining
/// variants are API errors: the exchange itself failed.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("No matching person found with email={email} and identifier={external_id}")]
    PersonNotFound { email: String, external_id: String },

    #[error("No group membership found for person={person_id} and group={group_id}")]
    MembershipNotFound { person_id: i64, group_id: i64 },

    #[error("Person {person_id} is already a member of group {group_id}")]
    AlreadyMember { person_id: i64, group_id: i64 },

    #[error("{method} {path} failed: {status} - {body}")]
    Status {
        method: String,
        path: String,
        status: u16,
        body: String,
    },

    #[error("{method} {path} failed: {source}")]
    Transport {
        method: String,
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{method} {path} returned an unreadable payload: {source}")]
    Decode {
        method: String,
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl RegistryError {
    /// True for the API error class: transport faults, error statuses and
    /// undecodable bodies.
    pub fn is_api_error(&self) -> bool {
        matches!(
            self,
            Self::Status { .. } | Self::Transport { .. } | Self::Decode { .. }
        )
    }

    /// HTTP status of the failed exchange, when the registry answered.
    pub fn status(&self) -> Option<u16> {
        if let Self::Status { status, .. } = self {
            Some(*status)
        } else {
            None
        }
    }
}
