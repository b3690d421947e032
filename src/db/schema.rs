//! Database schema and migrations for Nimbus.
//!
//! This module contains all database migrations that will be applied
//! sequentially when the database is first opened or upgraded.

/// Database migrations.
///
/// Each migration is a SQL script that will be executed in order.
/// The schema_version table tracks which migrations have been applied.
pub const MIGRATIONS: &[&str] = &[
    // v1: Users table (identity collaborator)
    r#"
CREATE TABLE users (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    username    TEXT NOT NULL,
    email       TEXT,
    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE UNIQUE INDEX idx_users_username_nocase ON users(username COLLATE NOCASE);
"#,
    // v2: File records (file directory collaborator)
    r#"
CREATE TABLE files (
    id                  TEXT PRIMARY KEY,
    owner_id            INTEGER NOT NULL,
    parent_folder_id    TEXT,
    name                TEXT NOT NULL,
    storage_key         TEXT NOT NULL,
    size                INTEGER NOT NULL DEFAULT 0,
    mime_type           TEXT NOT NULL DEFAULT 'application/octet-stream',
    is_deleted          INTEGER NOT NULL DEFAULT 0,
    created_at          TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX idx_files_owner_id ON files(owner_id);
"#,
    // v3: Access grants
    r#"
-- No foreign key to files: a grant on a missing or deleted file is inert
-- but kept as share history.
CREATE TABLE access_grants (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    file_id             TEXT NOT NULL,
    granted_by          INTEGER NOT NULL,
    subject_kind        TEXT NOT NULL,          -- 'user' or 'public'
    subject_user_id     INTEGER,
    token               TEXT,
    permission          TEXT NOT NULL,          -- 'read', 'write', 'admin'
    expires_at          TEXT,
    created_at          TEXT NOT NULL,
    updated_at          TEXT NOT NULL,
    superseded_at       TEXT,                   -- set when an expired direct grant is replaced
    CHECK (
        (subject_kind = 'user' AND subject_user_id IS NOT NULL AND token IS NULL)
        OR (subject_kind = 'public' AND token IS NOT NULL AND subject_user_id IS NULL)
    ),
    CHECK (permission IN ('read', 'write', 'admin'))
);

-- One current direct grant per triple; replaced expired rows stay as history.
CREATE UNIQUE INDEX idx_access_grants_direct
    ON access_grants(file_id, granted_by, subject_user_id)
    WHERE subject_kind = 'user' AND superseded_at IS NULL;
CREATE UNIQUE INDEX idx_access_grants_token ON access_grants(token);
CREATE INDEX idx_access_grants_file_id ON access_grants(file_id);
CREATE INDEX idx_access_grants_subject ON access_grants(subject_user_id);
"#,
    // v4: Retired tokens, so a token is never handed out twice
    r#"
CREATE TABLE retired_share_tokens (
    token       TEXT PRIMARY KEY,
    retired_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TRIGGER trg_access_grants_retire_token
AFTER DELETE ON access_grants
WHEN OLD.token IS NOT NULL
BEGIN
    INSERT OR IGNORE INTO retired_share_tokens (token) VALUES (OLD.token);
END;
"#,
    // v5: Recipient-side hide markers for "shared with me"
    r#"
CREATE TABLE share_suppressions (
    grant_id        INTEGER PRIMARY KEY,
    recipient_id    INTEGER NOT NULL,
    hidden_at       TEXT NOT NULL
);

CREATE INDEX idx_share_suppressions_recipient ON share_suppressions(recipient_id);

CREATE TRIGGER trg_access_grants_drop_suppression
AFTER DELETE ON access_grants
BEGIN
    DELETE FROM share_suppressions WHERE grant_id = OLD.id;
END;
"#,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_not_empty() {
        assert!(!MIGRATIONS.is_empty());
    }

    #[test]
    fn test_migrations_are_valid_sql() {
        for migration in MIGRATIONS {
            assert!(!migration.trim().is_empty());
            assert!(
                migration.contains("CREATE TABLE")
                    || migration.contains("ALTER TABLE")
                    || migration.contains("CREATE INDEX")
            );
        }
    }

    #[test]
    fn test_access_grants_migration() {
        let grants = MIGRATIONS[2];
        assert!(grants.contains("CREATE TABLE access_grants"));
        assert!(grants.contains("subject_kind"));
        assert!(grants.contains("expires_at"));
        assert!(grants.contains("idx_access_grants_direct"));
        assert!(grants.contains("WHERE subject_kind = 'user' AND superseded_at IS NULL"));
        assert!(grants.contains("CREATE UNIQUE INDEX idx_access_grants_token"));
    }

    #[test]
    fn test_token_retirement_trigger() {
        let retired = MIGRATIONS[3];
        assert!(retired.contains("CREATE TABLE retired_share_tokens"));
        assert!(retired.contains("AFTER DELETE ON access_grants"));
    }

    #[test]
    fn test_suppression_migration() {
        let hidden = MIGRATIONS[4];
        assert!(hidden.contains("CREATE TABLE share_suppressions"));
        assert!(hidden.contains("grant_id        INTEGER PRIMARY KEY"));
    }
}
