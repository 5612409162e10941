//! Request and response bodies of the COmanage Registry v1 REST API.
//!
//! Field names follow the registry's PascalCase JSON. Response wrappers
//! default to empty so a `204 No Content` reads as "no records".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

const API_VERSION: &str = "1.0";

/// The registry renders numeric ids as JSON strings in some responses.
fn flexible_id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Int(i64),
        Str(String),
    }

    match RawId::deserialize(deserializer)? {
        RawId::Int(id) => Ok(id),
        RawId::Str(raw) => raw.trim().parse().map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CoPerson {
    #[serde(deserialize_with = "flexible_id")]
    pub id: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CoPeopleResponse {
    pub co_people: Vec<CoPerson>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Identifier {
    pub identifier: String,
    #[serde(rename = "Type", default)]
    pub kind: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct IdentifiersResponse {
    pub identifiers: Vec<Identifier>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CoGroup {
    #[serde(deserialize_with = "flexible_id")]
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CoGroupsResponse {
    pub co_groups: Vec<CoGroup>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CoGroupMember {
    #[serde(deserialize_with = "flexible_id")]
    pub id: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CoGroupMembersResponse {
    pub co_group_members: Vec<CoGroupMember>,
}

/// Reply to any object-creating POST.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NewObjectResponse {
    #[serde(default)]
    pub object_type: Option<String>,
    #[serde(deserialize_with = "flexible_id")]
    pub id: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CoGroupPayload {
    pub version: &'static str,
    pub co_id: i64,
    pub name: String,
    pub description: String,
    pub open: bool,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AddGroupRequest {
    pub request_type: &'static str,
    pub version: &'static str,
    pub co_groups: Vec<CoGroupPayload>,
}

impl AddGroupRequest {
    /// Envelope for a single closed, active group.
    pub fn single(co_id: i64, name: &str) -> Self {
        Self {
            request_type: "CoGroups",
            version: API_VERSION,
            co_groups: vec![CoGroupPayload {
                version: API_VERSION,
                co_id,
                name: name.to_string(),
                description: format!("Group associated with read access to resource {}", name),
                open: false,
                status: "Active",
            }],
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PersonRef {
    #[serde(rename = "Type")]
    pub kind: &'static str,
    pub id: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CoGroupMemberPayload {
    pub version: &'static str,
    pub co_group_id: i64,
    pub person: PersonRef,
    pub member: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_through: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AddGroupMemberRequest {
    pub request_type: &'static str,
    pub version: &'static str,
    pub co_group_members: Vec<CoGroupMemberPayload>,
}

impl AddGroupMemberRequest {
    pub fn single(person_id: i64, group_id: i64, valid_through: Option<DateTime<Utc>>) -> Self {
        Self {
            request_type: "CoGroupMembers",
            version: API_VERSION,
            co_group_members: vec![CoGroupMemberPayload {
                version: API_VERSION,
                co_group_id: group_id,
                person: PersonRef {
                    kind: "CO",
                    id: person_id,
                },
                member: true,
                valid_through,
            }],
        }
    }
}
