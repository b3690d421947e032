//! Response DTOs for the REST API.

use serde::Serialize;

use crate::datetime::to_rfc3339;
use crate::file::FileDescriptor;
use crate::identity::UserSummary;
use crate::share::{
    AccessGrant, GrantSubject, Permission, PublicLink, ResolvedShare, ShareEntry,
    SharedFileSummary,
};

/// Generic API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a new API response.
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// File information in responses.
#[derive(Debug, Serialize)]
pub struct FileResponse {
    /// File ID.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Size in bytes.
    pub size: i64,
    /// MIME type.
    pub mime_type: String,
    /// Owner user ID.
    pub owner_id: i64,
}

impl From<FileDescriptor> for FileResponse {
    fn from(file: FileDescriptor) -> Self {
        Self {
            id: file.id,
            name: file.name,
            size: file.size,
            mime_type: file.mime_type,
            owner_id: file.owner_id,
        }
    }
}

/// A grant as shown to its owner.
#[derive(Debug, Serialize)]
pub struct ShareResponse {
    /// Grant ID.
    pub id: i64,
    /// Shared file ID.
    pub file_id: String,
    /// "user" or "public".
    pub kind: &'static str,
    /// Recipient user ID (direct shares).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    /// Recipient details (direct shares).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient: Option<UserSummary>,
    /// Link token (public links).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Permission level.
    pub permission: Permission,
    /// Expiry time.
    pub expires_at: Option<String>,
    /// Creation time.
    pub created_at: String,
    /// Last update time.
    pub updated_at: String,
}

impl ShareResponse {
    fn build(grant: AccessGrant, recipient: Option<UserSummary>) -> Self {
        let kind = grant.subject.kind();
        let (user_id, token) = match grant.subject {
            GrantSubject::DirectUser { user_id } => (Some(user_id), None),
            GrantSubject::Public { token } => (None, Some(token)),
        };
        Self {
            id: grant.id,
            file_id: grant.file_id,
            kind,
            user_id,
            recipient,
            token,
            permission: grant.permission,
            expires_at: grant.expires_at.as_ref().map(to_rfc3339),
            created_at: to_rfc3339(&grant.created_at),
            updated_at: to_rfc3339(&grant.updated_at),
        }
    }
}

impl From<AccessGrant> for ShareResponse {
    fn from(grant: AccessGrant) -> Self {
        Self::build(grant, None)
    }
}

impl From<ShareEntry> for ShareResponse {
    fn from(entry: ShareEntry) -> Self {
        Self::build(entry.grant, entry.recipient)
    }
}

/// A newly created public link.
#[derive(Debug, Serialize)]
pub struct LinkResponse {
    /// Token to embed in the link.
    pub token: String,
    /// Backing grant.
    pub grant: ShareResponse,
}

impl From<PublicLink> for LinkResponse {
    fn from(link: PublicLink) -> Self {
        Self {
            token: link.token,
            grant: link.grant.into(),
        }
    }
}

/// Result of revoking every share on a file.
#[derive(Debug, Serialize)]
pub struct UnshareAllResponse {
    /// Number of grants revoked.
    pub revoked: u64,
}

/// An entry in the "shared with me" listing.
#[derive(Debug, Serialize)]
pub struct SharedFileResponse {
    /// Grant ID (used to hide the entry).
    pub grant_id: i64,
    /// The shared file.
    pub file: FileResponse,
    /// Permission level.
    pub permission: Permission,
    /// Who shared it.
    pub shared_by: i64,
    /// When it was shared.
    pub shared_at: String,
    /// When the share lapses.
    pub expires_at: Option<String>,
}

impl From<SharedFileSummary> for SharedFileResponse {
    fn from(summary: SharedFileSummary) -> Self {
        Self {
            grant_id: summary.grant_id,
            file: summary.file.into(),
            permission: summary.permission,
            shared_by: summary.shared_by,
            shared_at: to_rfc3339(&summary.shared_at),
            expires_at: summary.expires_at.as_ref().map(to_rfc3339),
        }
    }
}

/// A resolved public link.
#[derive(Debug, Serialize)]
pub struct PublicShareResponse {
    /// The shared file.
    pub file: FileResponse,
    /// Permission carried by the link.
    pub permission: Permission,
}

impl From<ResolvedShare> for PublicShareResponse {
    fn from(resolved: ResolvedShare) -> Self {
        Self {
            file: resolved.file.into(),
            permission: resolved.permission,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn grant(subject: GrantSubject) -> AccessGrant {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        AccessGrant {
            id: 5,
            file_id: "f1".to_string(),
            granted_by: 1,
            subject,
            permission: Permission::Read,
            expires_at: None,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_direct_share_response() {
        let json = serde_json::to_value(ShareResponse::from(grant(GrantSubject::DirectUser {
            user_id: 2,
        })))
        .unwrap();

        assert_eq!(json["kind"], "user");
        assert_eq!(json["user_id"], 2);
        assert_eq!(json["permission"], "read");
        assert!(json.get("token").is_none());
        assert_eq!(json["created_at"], "2024-01-01T00:00:00Z");
    }

    #[test]
    fn test_public_share_response() {
        let json = serde_json::to_value(ShareResponse::from(grant(GrantSubject::Public {
            token: "abc".to_string(),
        })))
        .unwrap();

        assert_eq!(json["kind"], "public");
        assert_eq!(json["token"], "abc");
        assert!(json.get("user_id").is_none());
    }
}
