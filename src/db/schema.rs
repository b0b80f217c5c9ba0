//! Database schema and migrations for folio.
//!
//! This module contains all database migrations that will be applied
//! sequentially when the database is first opened or upgraded.

/// Database migrations.
///
/// Each migration is a SQL script that will be executed in order.
/// The schema_version table tracks which migrations have been applied.
pub const MIGRATIONS: &[&str] = &[
    // v1: Folders (galleries)
    r#"
CREATE TABLE folders (
    folder_id     TEXT PRIMARY KEY,        -- path-safe token, also the storage prefix
    display_name  TEXT NOT NULL,
    created_at    TEXT NOT NULL,
    created_by    TEXT NOT NULL,
    invite_code   TEXT                     -- set on first invite, then reused
);

CREATE INDEX idx_folders_created_at ON folders(created_at);
"#,
    // v2: Invites
    r#"
CREATE TABLE invites (
    invite_code  TEXT PRIMARY KEY,
    folder_id    TEXT NOT NULL,
    expires_at   INTEGER NOT NULL,         -- epoch seconds
    created_at   TEXT NOT NULL,
    created_by   TEXT NOT NULL
);

CREATE INDEX idx_invites_folder_id ON invites(folder_id);
CREATE INDEX idx_invites_expires_at ON invites(expires_at);
"#,
    // v3: Folder membership with reverse index by username
    r#"
CREATE TABLE folder_users (
    folder_id   TEXT NOT NULL,
    username    TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    PRIMARY KEY (folder_id, username)
);

CREATE INDEX idx_folder_users_username ON folder_users(username, folder_id);
"#,
    // v4: Per-folder ban list
    r#"
CREATE TABLE banned_users (
    folder_id  TEXT NOT NULL,
    username   TEXT NOT NULL,
    banned_at  TEXT NOT NULL,
    PRIMARY KEY (folder_id, username)
);
"#,
];
