//! Per-folder ban list.

use serde::Serialize;

use super::store::DEFAULT_PAGE_SIZE;
use crate::db::{collect_pages, DbPool, PageCursor};
use crate::folder::FolderId;
use crate::Result;

/// A principal denied access to one folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BanRecord {
    pub folder_id: String,
    pub username: String,
    /// RFC 3339 time of the first ban.
    pub banned_at: String,
}

impl PageCursor for BanRecord {
    fn cursor(&self) -> String {
        self.username.clone()
    }
}

/// Deny-list of principals per folder.
///
/// A ban row may coexist with a membership row for the same pair. Readers
/// decide what the combination means; the access path treats a ban as
/// overriding membership.
pub struct BanLedger<'a> {
    pool: &'a DbPool,
    page_size: u32,
}

impl<'a> BanLedger<'a> {
    pub fn new(pool: &'a DbPool) -> Self {
        Self {
            pool,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Ban `username` from `folder_id`.
    ///
    /// Re-banning keeps the original `banned_at`. Returns `true` if a new
    /// row was written.
    pub async fn add(&self, folder_id: &FolderId, username: &str, banned_at: &str) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO banned_users (folder_id, username, banned_at) VALUES (?, ?, ?)
             ON CONFLICT (folder_id, username) DO NOTHING",
        )
        .bind(folder_id.as_str())
        .bind(username)
        .bind(banned_at)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Lift a ban. Idempotent; returns `true` if a row was deleted.
    pub async fn remove(&self, folder_id: &FolderId, username: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM banned_users WHERE folder_id = ? AND username = ?")
            .bind(folder_id.as_str())
            .bind(username)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn is_banned(&self, folder_id: &FolderId, username: &str) -> Result<bool> {
        let banned: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM banned_users WHERE folder_id = ? AND username = ?)",
        )
        .bind(folder_id.as_str())
        .bind(username)
        .fetch_one(self.pool)
        .await?;

        Ok(banned)
    }

    /// Every ban on a folder, paged internally.
    pub async fn list_by_folder(&self, folder_id: &FolderId) -> Result<Vec<BanRecord>> {
        let pool = self.pool;
        let folder_id = folder_id.as_str();

        collect_pages(self.page_size, |after, limit| async move {
            let rows = sqlx::query_as::<_, BanRecord>(
                "SELECT folder_id, username, banned_at FROM banned_users
                 WHERE folder_id = ? AND username > ?
                 ORDER BY username LIMIT ?",
            )
            .bind(folder_id)
            .bind(after.unwrap_or_default())
            .bind(limit)
            .fetch_all(pool)
            .await?;
            Ok(rows)
        })
        .await
    }
}
