//! Classification of membership-add responses.
//!
//! The registry reports a duplicate membership as a 403 whose status-line
//! reason phrase says so. Some deployments put the reason in the body
//! instead. Call sites go through [`ResponseClassifier`] so the
//! detection rule can be swapped without touching them.

use reqwest::StatusCode;

/// The parts of a registry response a classifier may inspect.
#[derive(Debug, Clone, Copy)]
pub struct ResponseDescriptor<'a> {
    pub status: StatusCode,
    /// Reason phrase from the status line, when it differs from the canonical one.
    pub reason: Option<&'a str>,
    pub body: &'a str,
}

/// What a membership-add response means for the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddMembershipOutcome {
    Added,
    AlreadyMember,
    Failed,
}

pub trait ResponseClassifier: Send + Sync {
    fn classify_add_membership(&self, response: &ResponseDescriptor<'_>) -> AddMembershipOutcome;
}

/// Treats a 403 whose reason phrase, or failing that its body, mentions
/// "already a member" as a duplicate.
///
/// Only 403 qualifies: other 4xx statuses with the same wording are request
/// errors and stay failures.
#[derive(Debug, Clone)]
pub struct ReasonTextClassifier {
    phrase: String,
}

impl ReasonTextClassifier {
    pub fn new(phrase: impl Into<String>) -> Self {
        Self {
            phrase: phrase.into().to_lowercase(),
        }
    }

    fn mentions_phrase(&self, text: &str) -> bool {
        text.to_lowercase().contains(&self.phrase)
    }
}

impl Default for ReasonTextClassifier {
    fn default() -> Self {
        Self::new("already a member")
    }
}

impl ResponseClassifier for ReasonTextClassifier {
    fn classify_add_membership(&self, response: &ResponseDescriptor<'_>) -> AddMembershipOutcome {
        if response.status.is_success() {
            return AddMembershipOutcome::Added;
        }

        if response.status != StatusCode::FORBIDDEN {
            return AddMembershipOutcome::Failed;
        }

        let in_reason = response.reason.is_some_and(|r| self.mentions_phrase(r));
        if in_reason || self.mentions_phrase(response.body) {
            AddMembershipOutcome::AlreadyMember
        } else {
            AddMembershipOutcome::Failed
        }
    }
}
