#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use entitlement_bridge::config::{
    BridgeConfig, GroupPolicyConfig, RegistryConfig, RetrySettings,
};
use entitlement_bridge::models::{EntitlementEvent, Group, Person};
use entitlement_bridge::registry::{Directory, RegistryClient, RegistryError, RegistryResult};
use entitlement_bridge::startup::Application;
use secrecy::Secret;
use service_core::config::Config as CoreConfig;
use service_core::http::RetryConfig;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const TEST_COID: i64 = 7;
pub const TEST_API_USER: &str = "co_7.bridge";
pub const TEST_API_KEY: &str = "s3cret";

pub fn test_config(registry_url: &str) -> BridgeConfig {
    BridgeConfig {
        common: CoreConfig {
            port: 0,
            ..CoreConfig::default()
        },
        registry: RegistryConfig {
            url: registry_url.to_string(),
            coid: TEST_COID,
            api_user_id: TEST_API_USER.to_string(),
            api_key: Secret::new(TEST_API_KEY.to_string()),
            timeout_seconds: 5,
            connect_timeout_seconds: 2,
        },
        retry: RetrySettings {
            attempts: 1,
            backoff_multiplier: 0.0,
        },
        groups: GroupPolicyConfig::default(),
    }
}

/// Retries without sleeping between attempts.
pub fn instant_retry(max_attempts: u32) -> RetryConfig {
    RetryConfig {
        max_attempts,
        backoff_multiplier: 0.0,
        min_backoff: Duration::ZERO,
        max_backoff: Duration::ZERO,
    }
}

pub fn registry_client(registry_url: &str, max_attempts: u32) -> RegistryClient {
    RegistryClient::new(&test_config(registry_url).registry, instant_retry(max_attempts))
        .expect("Failed to build registry client")
}

pub fn event(resource: &str, user: &str, mail: &str) -> EntitlementEvent {
    EntitlementEvent {
        application_id: 1,
        resource: resource.to_string(),
        user_external_id: user.to_string(),
        user_email: mail.to_string(),
        expires_at: None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    pub person_id: i64,
    pub group_id: i64,
    pub valid_through: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct FakeState {
    people: Vec<Person>,
    groups: Vec<Group>,
    memberships: Vec<Membership>,
    broken_resources: Vec<String>,
    calls: Vec<String>,
}

/// In-memory registry with the same duplicate/missing semantics as the real one.
#[derive(Default)]
pub struct FakeDirectory {
    state: Mutex<FakeState>,
}

impl FakeDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_person(self, id: i64, email: &str, external_id: &str) -> Self {
        self.state.lock().unwrap().people.push(Person {
            id,
            email: email.to_string(),
            external_identifier: external_id.to_string(),
        });
        self
    }

    pub fn with_group(self, id: i64, name: &str) -> Self {
        self.state.lock().unwrap().groups.push(Group {
            id,
            name: name.to_string(),
        });
        self
    }

    pub fn with_membership(self, person_id: i64, group_id: i64) -> Self {
        self.state.lock().unwrap().memberships.push(Membership {
            person_id,
            group_id,
            valid_through: None,
        });
        self
    }

    /// Group lookups for `resource` fail with a 500 from the registry.
    pub fn failing_on(self, resource: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .broken_resources
            .push(resource.to_string());
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn groups(&self) -> Vec<Group> {
        self.state.lock().unwrap().groups.clone()
    }

    pub fn memberships(&self) -> Vec<Membership> {
        self.state.lock().unwrap().memberships.clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }
}

#[async_trait]
impl Directory for FakeDirectory {
    async fn resolve_person(&self, email: &str, external_id: &str) -> RegistryResult<Person> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("resolve_person:{}", external_id));
        state
            .people
            .iter()
            .find(|p| p.email == email && p.external_identifier == external_id)
            .cloned()
            .ok_or_else(|| RegistryError::PersonNotFound {
                email: email.to_string(),
                external_id: external_id.to_string(),
            })
    }

    async fn find_group_by_name(&self, name: &str) -> RegistryResult<Option<Group>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("find_group:{}", name));
        if state.broken_resources.iter().any(|r| r == name) {
            return Err(RegistryError::Status {
                method: "GET".to_string(),
                path: "/co_groups.json".to_string(),
                status: 500,
                body: "Internal Server Error".to_string(),
            });
        }
        Ok(state.groups.iter().find(|g| g.name == name).cloned())
    }

    async fn create_group(&self, name: &str) -> RegistryResult<Group> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("create_group:{}", name));
        let group = Group {
            id: 100 + state.groups.len() as i64,
            name: name.to_string(),
        };
        state.groups.push(group.clone());
        Ok(group)
    }

    async fn add_membership(
        &self,
        person_id: i64,
        group_id: i64,
        valid_through: Option<DateTime<Utc>>,
    ) -> RegistryResult<()> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(format!("add_membership:{}:{}", person_id, group_id));
        if state
            .memberships
            .iter()
            .any(|m| m.person_id == person_id && m.group_id == group_id)
        {
            return Err(RegistryError::AlreadyMember {
                person_id,
                group_id,
            });
        }
        state.memberships.push(Membership {
            person_id,
            group_id,
            valid_through,
        });
        Ok(())
    }

    async fn remove_membership(&self, person_id: i64, group_id: i64) -> RegistryResult<()> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(format!("remove_membership:{}:{}", person_id, group_id));
        let before = state.memberships.len();
        state
            .memberships
            .retain(|m| !(m.person_id == person_id && m.group_id == group_id));
        if state.memberships.len() == before {
            return Err(RegistryError::MembershipNotFound {
                person_id,
                group_id,
            });
        }
        Ok(())
    }
}

pub struct TestApp {
    pub address: String,
    pub port: u16,
}

impl TestApp {
    /// Start the real application against `registry_url` on a random port.
    pub async fn spawn(registry_url: &str) -> Self {
        let app = Application::build(test_config(registry_url), None)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server to be ready by polling the health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        TestApp { address, port }
    }
}
