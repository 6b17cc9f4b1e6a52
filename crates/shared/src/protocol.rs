use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{AnnouncementId, AttachmentId, RoleId, SchoolId, TenantId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSummary {
    pub id: RoleId,
    pub name: String,
}

/// Role reference embedded on a user record. Some backend versions omit the id
/// on embedded roles, so only the name is required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleTag {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RoleId>,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default)]
    pub roles: Vec<RoleTag>,
    pub status: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRecord {
    pub id: AttachmentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnouncementRecord {
    pub id: AnnouncementId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub attachments: Vec<AttachmentRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Message-only body. Doubles as the "no data" sentinel on list reads and as
/// the "not found" marker on single-entity reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerMessage {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageData<T> {
    pub data: Vec<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedEnvelope<T> {
    pub data: PageData<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inactive_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Every list endpoint answers in one of three shapes. Decoding is an
/// exhaustive union rather than shape-sniffing on optional fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ListResponse<T> {
    Paged(PagedEnvelope<T>),
    Flat(Vec<T>),
    Sentinel(ServerMessage),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SingleEnvelope<T> {
    pub data: T,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SingleResponse<T> {
    Found(SingleEnvelope<T>),
    Missing(ServerMessage),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolesEnvelope {
    pub data: Vec<RoleSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkStatusRequest {
    pub user_ids: Vec<UserId>,
    pub school_id: SchoolId,
    pub tenant_id: TenantId,
    pub status: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkRoleRequest {
    pub user_ids: Vec<UserId>,
    pub roles_ids: Vec<RoleId>,
    pub school_id: SchoolId,
    pub tenant_id: TenantId,
}

/// Mutation endpoints report success in the body, independent of the HTTP
/// status line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationAck {
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl MutationAck {
    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_response_decodes_paged_envelope_with_counts() {
        let body = r#"{
            "data": {"data": [{"id": 7, "full_name": "Ann Lee", "status": 1}], "total": 42},
            "active_count": 30,
            "inactive_count": 12
        }"#;
        let decoded: ListResponse<UserRecord> = serde_json::from_str(body).unwrap();
        match decoded {
            ListResponse::Paged(envelope) => {
                assert_eq!(envelope.data.data.len(), 1);
                assert_eq!(envelope.data.data[0].id, UserId(7));
                assert_eq!(envelope.data.total, Some(42));
                assert_eq!(envelope.active_count, Some(30));
                assert_eq!(envelope.inactive_count, Some(12));
            }
            other => panic!("expected paged envelope, got {other:?}"),
        }
    }

    #[test]
    fn list_response_decodes_flat_array() {
        let body = r#"[{"id": 1, "status": 0}, {"id": 2, "status": 1}]"#;
        let decoded: ListResponse<UserRecord> = serde_json::from_str(body).unwrap();
        match decoded {
            ListResponse::Flat(rows) => {
                assert_eq!(rows.len(), 2);
                assert_eq!(rows[1].id, UserId(2));
            }
            other => panic!("expected flat array, got {other:?}"),
        }
    }

    #[test]
    fn list_response_decodes_message_only_body_as_sentinel() {
        let body = r#"{"message": "Data not found for this User"}"#;
        let decoded: ListResponse<UserRecord> = serde_json::from_str(body).unwrap();
        match decoded {
            ListResponse::Sentinel(sentinel) => {
                assert_eq!(sentinel.message, "Data not found for this User");
            }
            other => panic!("expected sentinel, got {other:?}"),
        }
    }

    #[test]
    fn nested_envelope_without_total_still_decodes() {
        let body = r#"{"data": {"data": [{"id": 3, "title": "Sports day"}]}}"#;
        let decoded: ListResponse<AnnouncementRecord> = serde_json::from_str(body).unwrap();
        match decoded {
            ListResponse::Paged(envelope) => {
                assert_eq!(envelope.data.total, None);
                assert_eq!(envelope.data.data[0].title, "Sports day");
            }
            other => panic!("expected paged envelope, got {other:?}"),
        }
    }

    #[test]
    fn single_response_distinguishes_found_from_missing() {
        let found = r#"{"data": {"id": 5, "status": 1}, "message": "User fetched successfully"}"#;
        let decoded: SingleResponse<UserRecord> = serde_json::from_str(found).unwrap();
        assert!(matches!(decoded, SingleResponse::Found(_)));

        let missing = r#"{"message": "Data not found for this User"}"#;
        let decoded: SingleResponse<UserRecord> = serde_json::from_str(missing).unwrap();
        assert!(matches!(decoded, SingleResponse::Missing(_)));
    }

    #[test]
    fn mutation_ack_success_is_body_status_not_http_status() {
        let ack: MutationAck = serde_json::from_str(r#"{"status": 200}"#).unwrap();
        assert!(ack.is_success());

        let ack: MutationAck =
            serde_json::from_str(r#"{"status": 422, "message": "No users matched"}"#).unwrap();
        assert!(!ack.is_success());
        assert_eq!(ack.message.as_deref(), Some("No users matched"));
    }

    #[test]
    fn embedded_role_tags_tolerate_missing_ids() {
        let body = r#"{"id": 9, "status": 1, "roles": [{"name": "Teacher"}, {"id": 4, "name": "Admin"}]}"#;
        let decoded: UserRecord = serde_json::from_str(body).unwrap();
        assert_eq!(decoded.roles[0].id, None);
        assert_eq!(decoded.roles[1].id, Some(RoleId(4)));
    }
}
