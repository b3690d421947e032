//! Access grant types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::datetime;
use crate::file::FileDescriptor;
use crate::identity::UserSummary;
use crate::{NimbusError, Result};

/// Permission level carried by a grant.
///
/// Levels are totally ordered, so collaborators can gate mutating operations
/// with range checks such as `permission >= Permission::Write`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    /// View and download.
    Read = 0,
    /// Modify contents.
    Write = 1,
    /// Full control short of ownership.
    Admin = 2,
}

impl Permission {
    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::Read => "read",
            Permission::Write => "write",
            Permission::Admin => "admin",
        }
    }

    /// Check if this level satisfies the required level.
    ///
    /// # Examples
    ///
    /// ```
    /// use nimbus::share::Permission;
    ///
    /// assert!(Permission::Admin.allows(Permission::Read));
    /// assert!(Permission::Write.allows(Permission::Write));
    /// assert!(!Permission::Read.allows(Permission::Write));
    /// ```
    pub fn allows(&self, required: Permission) -> bool {
        *self >= required
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Permission {
    type Err = NimbusError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "read" => Ok(Permission::Read),
            "write" => Ok(Permission::Write),
            "admin" => Ok(Permission::Admin),
            _ => Err(NimbusError::InvalidPermission(s.to_string())),
        }
    }
}

/// Who a grant is for. Exactly one variant per grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GrantSubject {
    /// Usable only by this user.
    DirectUser {
        /// Recipient user ID.
        user_id: i64,
    },
    /// Usable by anyone holding the token.
    Public {
        /// Opaque unguessable token.
        token: String,
    },
}

impl GrantSubject {
    /// Database discriminator for this variant.
    pub fn kind(&self) -> &'static str {
        match self {
            GrantSubject::DirectUser { .. } => "user",
            GrantSubject::Public { .. } => "public",
        }
    }
}

/// A durable record authorizing one subject to access one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessGrant {
    /// Grant ID, never reused.
    pub id: i64,
    /// File being shared.
    pub file_id: String,
    /// Owner who created the grant.
    pub granted_by: i64,
    /// Recipient.
    pub subject: GrantSubject,
    /// Permission level.
    pub permission: Permission,
    /// Expiry; `None` never expires.
    pub expires_at: Option<DateTime<Utc>>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last permission change.
    pub updated_at: DateTime<Utc>,
}

impl AccessGrant {
    /// Whether the grant is usable at `now`.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |expires_at| expires_at > now)
    }

    /// Recipient user ID for direct grants.
    pub fn recipient_id(&self) -> Option<i64> {
        match self.subject {
            GrantSubject::DirectUser { user_id } => Some(user_id),
            GrantSubject::Public { .. } => None,
        }
    }

    /// Token for public grants.
    pub fn token(&self) -> Option<&str> {
        match &self.subject {
            GrantSubject::Public { token } => Some(token),
            GrantSubject::DirectUser { .. } => None,
        }
    }

    /// Whether this is a public link grant.
    pub fn is_public(&self) -> bool {
        matches!(self.subject, GrantSubject::Public { .. })
    }
}

/// Raw `access_grants` row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct GrantRow {
    pub id: i64,
    pub file_id: String,
    pub granted_by: i64,
    pub subject_kind: String,
    pub subject_user_id: Option<i64>,
    pub token: Option<String>,
    pub permission: String,
    pub expires_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<GrantRow> for AccessGrant {
    type Error = NimbusError;

    fn try_from(row: GrantRow) -> Result<Self> {
        let subject = match (row.subject_kind.as_str(), row.subject_user_id, row.token) {
            ("user", Some(user_id), None) => GrantSubject::DirectUser { user_id },
            ("public", None, Some(token)) => GrantSubject::Public { token },
            (kind, _, _) => {
                return Err(NimbusError::CorruptRecord(format!(
                    "grant {} has a malformed subject ({kind})",
                    row.id
                )))
            }
        };

        let permission = row.permission.parse().map_err(|_| {
            NimbusError::CorruptRecord(format!(
                "grant {} has unknown permission {:?}",
                row.id, row.permission
            ))
        })?;

        Ok(AccessGrant {
            id: row.id,
            file_id: row.file_id,
            granted_by: row.granted_by,
            subject,
            permission,
            expires_at: datetime::from_db_opt(row.expires_at.as_deref())?,
            created_at: datetime::from_db(&row.created_at)?,
            updated_at: datetime::from_db(&row.updated_at)?,
        })
    }
}

/// A grant as listed to the file owner, with recipient details for direct grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShareEntry {
    /// The grant.
    #[serde(flatten)]
    pub grant: AccessGrant,
    /// Recipient display info; `None` for public links or vanished accounts.
    pub recipient: Option<UserSummary>,
}

/// A file shown in a recipient's "shared with me" listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SharedFileSummary {
    /// The direct grant giving access.
    pub grant_id: i64,
    /// The shared file.
    pub file: FileDescriptor,
    /// Permission level granted.
    pub permission: Permission,
    /// Who shared it.
    pub shared_by: i64,
    /// When it was shared.
    pub shared_at: DateTime<Utc>,
    /// When the share lapses.
    pub expires_at: Option<DateTime<Utc>>,
}

/// A successfully resolved public link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedShare {
    /// The shared file.
    pub file: FileDescriptor,
    /// The public grant the token belongs to.
    #[serde(skip_serializing)]
    pub grant: AccessGrant,
    /// Permission carried by the link.
    pub permission: Permission,
}
