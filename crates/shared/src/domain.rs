use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);
    };
}

id_newtype!(UserId);
id_newtype!(RoleId);
id_newtype!(SchoolId);
id_newtype!(AnnouncementId);
id_newtype!(AttachmentId);

/// Tenants are addressed by subdomain-style slugs, not numeric ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantId(pub String);

impl TenantId {
    pub fn new(slug: impl Into<String>) -> Self {
        Self(slug.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Active,
    Inactive,
}

impl UserStatus {
    /// The backend encodes status as an integer flag: 1 active, anything else inactive.
    pub fn from_flag(flag: i64) -> Self {
        if flag == 1 {
            UserStatus::Active
        } else {
            UserStatus::Inactive
        }
    }

    pub fn flag(self) -> u8 {
        match self {
            UserStatus::Active => 1,
            UserStatus::Inactive => 0,
        }
    }
}

/// Scoping context attached to every mutating call. Supplied by the session
/// collaborator at startup and treated as immutable downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantContext {
    pub school_id: SchoolId,
    pub tenant_id: TenantId,
}

impl TenantContext {
    pub fn new(school_id: SchoolId, tenant_id: TenantId) -> Self {
        Self {
            school_id,
            tenant_id,
        }
    }
}
