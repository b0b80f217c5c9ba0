//! Invite table access.

use serde::Serialize;

use crate::db::DbPool;
use crate::Result;

/// A time-limited bearer token that grants membership in a folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Invite {
    /// 128-bit random code, hex encoded.
    pub invite_code: String,
    /// Folder joined on acceptance.
    pub folder_id: String,
    /// Unix epoch seconds after which the invite is dead.
    pub expires_at: i64,
    /// RFC 3339 time of the latest write.
    pub created_at: String,
    /// Operator who issued (or refreshed) the invite.
    pub created_by: String,
}

impl Invite {
    /// Whether the invite is past its expiry at `now` (epoch seconds).
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at < now
    }
}

/// Repository for invite rows.
pub struct InviteRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> InviteRepository<'a> {
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Write an invite, replacing any row with the same code.
    pub async fn put(&self, invite: &Invite) -> Result<()> {
        sqlx::query(
            "INSERT INTO invites (invite_code, folder_id, expires_at, created_at, created_by)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT (invite_code) DO UPDATE SET
                folder_id = excluded.folder_id,
                expires_at = excluded.expires_at,
                created_at = excluded.created_at,
                created_by = excluded.created_by",
        )
        .bind(&invite.invite_code)
        .bind(&invite.folder_id)
        .bind(invite.expires_at)
        .bind(&invite.created_at)
        .bind(&invite.created_by)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    pub async fn get(&self, invite_code: &str) -> Result<Option<Invite>> {
        let invite = sqlx::query_as::<_, Invite>(
            "SELECT invite_code, folder_id, expires_at, created_at, created_by
             FROM invites WHERE invite_code = ?",
        )
        .bind(invite_code)
        .fetch_optional(self.pool)
        .await?;

        Ok(invite)
    }

    /// Delete every invite that expired before `now`. Returns the count.
    pub async fn purge_expired(&self, now: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM invites WHERE expires_at < ?")
            .bind(now)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
