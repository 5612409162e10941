//! COmanage Registry REST client.
//!
//! Every call goes through [`RegistryClient::send`], which retries transport
//! faults and hands back the raw status and body. Status handling happens
//! afterwards and is never retried.

use super::classify::{
    AddMembershipOutcome, ReasonTextClassifier, ResponseClassifier, ResponseDescriptor,
};
use super::dto::{
    AddGroupMemberRequest, AddGroupRequest, CoGroupMembersResponse, CoGroupsResponse,
    CoPeopleResponse, IdentifiersResponse, NewObjectResponse,
};
use super::error::{RegistryError, RegistryResult};
use super::Directory;
use crate::config::RegistryConfig;
use crate::models::{Group, Person};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hyper::ext::ReasonPhrase;
use reqwest::{Client, Method, StatusCode};
use secrecy::{ExposeSecret, Secret};
use serde::de::DeserializeOwned;
use serde::Serialize;
use service_core::http::{retry_http_call, RetryConfig};
use std::sync::Arc;

/// Status line and body of a completed exchange.
#[derive(Debug)]
struct RawResponse {
    status: StatusCode,
    reason: Option<String>,
    body: String,
}

/// Non-canonical reason phrase hyper kept from the status line.
fn reason_phrase(response: &reqwest::Response) -> Option<String> {
    response
        .extensions()
        .get::<ReasonPhrase>()
        .and_then(|reason| std::str::from_utf8(reason.as_bytes()).ok())
        .map(str::to_string)
}

/// Authenticated client for one CO in a COmanage Registry.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct RegistryClient {
    client: Client,
    base_url: String,
    co_id: i64,
    api_user_id: String,
    api_key: Secret<String>,
    retry: RetryConfig,
    classifier: Arc<dyn ResponseClassifier>,
}

impl RegistryClient {
    pub fn new(config: &RegistryConfig, retry: RetryConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            co_id: config.coid,
            api_user_id: config.api_user_id.clone(),
            api_key: config.api_key.clone(),
            retry,
            classifier: Arc::new(ReasonTextClassifier::default()),
        })
    }

    /// Replace the rule that recognises duplicate-membership responses.
    pub fn with_classifier(mut self, classifier: Arc<dyn ResponseClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    async fn send(
        &self,
        operation: &'static str,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&serde_json::Value>,
    ) -> RegistryResult<RawResponse> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(operation, method = %method, url = %url, "Calling registry");

        let result = retry_http_call(&self.retry, operation, || {
            let mut request = self
                .client
                .request(method.clone(), &url)
                .basic_auth(&self.api_user_id, Some(self.api_key.expose_secret()))
                .header("Accept", "application/json")
                .query(query);
            if let Some(body) = body {
                request = request.json(body);
            }

            async move {
                let response = request.send().await?;
                let status = response.status();
                let reason = reason_phrase(&response);
                let body = response.text().await?;
                Ok::<_, reqwest::Error>(RawResponse {
                    status,
                    reason,
                    body,
                })
            }
        })
        .await;

        match result {
            Ok(raw) => {
                metrics::counter!(
                    "registry_requests_total",
                    "operation" => operation,
                    "status" => raw.status.as_u16().to_string()
                )
                .increment(1);
                Ok(raw)
            }
            Err(source) => {
                metrics::counter!(
                    "registry_requests_total",
                    "operation" => operation,
                    "status" => "transport_error"
                )
                .increment(1);
                Err(RegistryError::Transport {
                    method: method.to_string(),
                    path: path.to_string(),
                    source,
                })
            }
        }
    }

    fn status_error(method: &Method, path: &str, raw: RawResponse) -> RegistryError {
        RegistryError::Status {
            method: method.to_string(),
            path: path.to_string(),
            status: raw.status.as_u16(),
            body: raw.body,
        }
    }

    fn decode<T: DeserializeOwned + Default>(
        method: &Method,
        path: &str,
        raw: &RawResponse,
    ) -> RegistryResult<T> {
        if raw.body.trim().is_empty() {
            return Ok(T::default());
        }

        serde_json::from_str(&raw.body).map_err(|source| RegistryError::Decode {
            method: method.to_string(),
            path: path.to_string(),
            source,
        })
    }

    async fn get_json<T: DeserializeOwned + Default>(
        &self,
        operation: &'static str,
        path: &str,
        query: &[(&str, String)],
    ) -> RegistryResult<T> {
        let raw = self.send(operation, Method::GET, path, query, None).await?;
        if !raw.status.is_success() {
            return Err(Self::status_error(&Method::GET, path, raw));
        }
        Self::decode(&Method::GET, path, &raw)
    }

    async fn post_json<B: Serialize>(
        &self,
        operation: &'static str,
        path: &str,
        body: &B,
    ) -> RegistryResult<RawResponse> {
        let body = serde_json::to_value(body).map_err(|source| RegistryError::Decode {
            method: Method::POST.to_string(),
            path: path.to_string(),
            source,
        })?;
        self.send(operation, Method::POST, path, &[], Some(&body))
            .await
    }

    async fn delete(&self, operation: &'static str, path: &str) -> RegistryResult<()> {
        let raw = self.send(operation, Method::DELETE, path, &[], None).await?;
        if !raw.status.is_success() {
            return Err(Self::status_error(&Method::DELETE, path, raw));
        }
        Ok(())
    }
}

#[async_trait]
impl Directory for RegistryClient {
    async fn resolve_person(&self, email: &str, external_id: &str) -> RegistryResult<Person> {
        let people: CoPeopleResponse = self
            .get_json(
                "list_people_by_mail",
                "/co_people.json",
                &[
                    ("coid", self.co_id.to_string()),
                    ("search.mail", email.to_string()),
                ],
            )
            .await?;

        tracing::debug!(
            email = %email,
            candidates = people.co_people.len(),
            "Resolving person among email matches"
        );

        for candidate in people.co_people {
            let identifiers: IdentifiersResponse = self
                .get_json(
                    "list_identifiers",
                    "/identifiers.json",
                    &[("copersonid", candidate.id.to_string())],
                )
                .await?;

            if let Some(matched) = identifiers
                .identifiers
                .iter()
                .find(|ident| ident.identifier == external_id)
            {
                tracing::debug!(
                    person_id = candidate.id,
                    identifier_type = %matched.kind,
                    "Matched person by identifier"
                );
                return Ok(Person {
                    id: candidate.id,
                    email: email.to_string(),
                    external_identifier: external_id.to_string(),
                });
            }
        }

        Err(RegistryError::PersonNotFound {
            email: email.to_string(),
            external_id: external_id.to_string(),
        })
    }

    async fn find_group_by_name(&self, name: &str) -> RegistryResult<Option<Group>> {
        let groups: CoGroupsResponse = self
            .get_json(
                "list_groups",
                "/co_groups.json",
                &[("coid", self.co_id.to_string())],
            )
            .await?;

        Ok(groups
            .co_groups
            .into_iter()
            .find(|g| g.name == name)
            .map(|g| Group {
                id: g.id,
                name: g.name,
            }))
    }

    async fn create_group(&self, name: &str) -> RegistryResult<Group> {
        let path = "/co_groups.json";
        let raw = self
            .post_json(
                "create_group",
                path,
                &AddGroupRequest::single(self.co_id, name),
            )
            .await?;

        if !raw.status.is_success() {
            return Err(Self::status_error(&Method::POST, path, raw));
        }

        let created: NewObjectResponse =
            serde_json::from_str(&raw.body).map_err(|source| RegistryError::Decode {
                method: Method::POST.to_string(),
                path: path.to_string(),
                source,
            })?;

        tracing::info!(
            group_id = created.id,
            object_type = created.object_type.as_deref().unwrap_or("CoGroup"),
            name = %name,
            "Created registry group"
        );

        Ok(Group {
            id: created.id,
            name: name.to_string(),
        })
    }

    async fn add_membership(
        &self,
        person_id: i64,
        group_id: i64,
        valid_through: Option<DateTime<Utc>>,
    ) -> RegistryResult<()> {
        let path = "/co_group_members.json";
        let raw = self
            .post_json(
                "add_membership",
                path,
                &AddGroupMemberRequest::single(person_id, group_id, valid_through),
            )
            .await?;

        let descriptor = ResponseDescriptor {
            status: raw.status,
            reason: raw.reason.as_deref(),
            body: &raw.body,
        };

        match self.classifier.classify_add_membership(&descriptor) {
            AddMembershipOutcome::Added => Ok(()),
            AddMembershipOutcome::AlreadyMember => Err(RegistryError::AlreadyMember {
                person_id,
                group_id,
            }),
            AddMembershipOutcome::Failed => Err(Self::status_error(&Method::POST, path, raw)),
        }
    }

    async fn remove_membership(&self, person_id: i64, group_id: i64) -> RegistryResult<()> {
        let members: CoGroupMembersResponse = self
            .get_json(
                "list_memberships",
                "/co_group_members.json",
                &[
                    ("cogroupid", group_id.to_string()),
                    ("copersonid", person_id.to_string()),
                ],
            )
            .await?;

        if members.co_group_members.is_empty() {
            return Err(RegistryError::MembershipNotFound {
                person_id,
                group_id,
            });
        }

        for member in &members.co_group_members {
            self.delete(
                "delete_membership",
                &format!("/co_group_members/{}.json", member.id),
            )
            .await?;
        }

        tracing::info!(
            person_id,
            group_id,
            removed = members.co_group_members.len(),
            "Removed registry group memberships"
        );

        Ok(())
    }
}
