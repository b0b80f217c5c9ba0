//! Folder membership store.

use serde::Serialize;

use crate::db::{collect_pages, DbPool, PageCursor};
use crate::folder::FolderId;
use crate::Result;

/// Default rows per internal page.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// A durable grant of read access to a folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MembershipRecord {
    /// Folder the principal may read.
    pub folder_id: String,
    /// Principal's username.
    pub username: String,
    /// RFC 3339 time the grant was first written.
    pub created_at: String,
}

/// Cursor over the folder side of the key, used when paging by username.
struct ByUsername(MembershipRecord);

impl PageCursor for MembershipRecord {
    fn cursor(&self) -> String {
        self.username.clone()
    }
}

impl PageCursor for ByUsername {
    fn cursor(&self) -> String {
        self.0.folder_id.clone()
    }
}

/// Many-to-many mapping between folders and principals.
///
/// `add` and `remove` are idempotent, so callers may retry them freely.
/// Both list operations page through the table internally and return the
/// complete result set.
pub struct MembershipStore<'a> {
    pool: &'a DbPool,
    page_size: u32,
}

impl<'a> MembershipStore<'a> {
    /// Create a new store with the default page size.
    pub fn new(pool: &'a DbPool) -> Self {
        Self {
            pool,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Set how many rows each internal query fetches.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Grant `username` access to `folder_id`.
    ///
    /// Returns `true` if a new record was written, `false` if it already
    /// existed (the original `created_at` is kept).
    pub async fn add(
        &self,
        folder_id: &FolderId,
        username: &str,
        created_at: &str,
    ) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO folder_users (folder_id, username, created_at) VALUES (?, ?, ?)
             ON CONFLICT (folder_id, username) DO NOTHING",
        )
        .bind(folder_id.as_str())
        .bind(username)
        .bind(created_at)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Revoke a grant. Returns `true` if a record was deleted.
    pub async fn remove(&self, folder_id: &FolderId, username: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM folder_users WHERE folder_id = ? AND username = ?")
            .bind(folder_id.as_str())
            .bind(username)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Check a single grant.
    pub async fn is_member(&self, folder_id: &FolderId, username: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM folder_users WHERE folder_id = ? AND username = ?)",
        )
        .bind(folder_id.as_str())
        .bind(username)
        .fetch_one(self.pool)
        .await?;

        Ok(exists)
    }

    /// All principals with access to a folder.
    pub async fn list_by_folder(&self, folder_id: &FolderId) -> Result<Vec<MembershipRecord>> {
        let pool = self.pool;
        let folder_id = folder_id.as_str();

        collect_pages(self.page_size, |after, limit| async move {
            let rows = sqlx::query_as::<_, MembershipRecord>(
                "SELECT folder_id, username, created_at FROM folder_users
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

    /// All folders a principal can read, served from the username index.
    pub async fn list_by_username(&self, username: &str) -> Result<Vec<MembershipRecord>> {
        let pool = self.pool;

        let rows = collect_pages(self.page_size, |after, limit| async move {
            let rows = sqlx::query_as::<_, MembershipRecord>(
                "SELECT folder_id, username, created_at FROM folder_users
                 WHERE username = ? AND folder_id > ?
                 ORDER BY folder_id LIMIT ?",
            )
            .bind(username)
            .bind(after.unwrap_or_default())
            .bind(limit)
            .fetch_all(pool)
            .await?;
            Ok(rows.into_iter().map(ByUsername).collect())
        })
        .await?;

        Ok(rows.into_iter().map(|row| row.0).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    const NOW: &str = "2024-05-01T10:00:00Z";

    fn folder(id: &str) -> FolderId {
        FolderId::parse(id).unwrap()
    }

    #[tokio::test]
    async fn test_add_is_idempotent() {
        let db = Database::open_in_memory().await.unwrap();
        let store = MembershipStore::new(db.pool());

        assert!(store.add(&folder("f1"), "ann", NOW).await.unwrap());
        assert!(!store
            .add(&folder("f1"), "ann", "2030-01-01T00:00:00Z")
            .await
            .unwrap());

        let members = store.list_by_folder(&folder("f1")).await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].created_at, NOW);
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let db = Database::open_in_memory().await.unwrap();
        let store = MembershipStore::new(db.pool());

        store.add(&folder("f1"), "ann", NOW).await.unwrap();
        assert!(store.remove(&folder("f1"), "ann").await.unwrap());
        assert!(!store.remove(&folder("f1"), "ann").await.unwrap());
        assert!(!store.is_member(&folder("f1"), "ann").await.unwrap());
    }

    #[tokio::test]
    async fn test_is_member_is_exact() {
        let db = Database::open_in_memory().await.unwrap();
        let store = MembershipStore::new(db.pool());

        store.add(&folder("f2"), "ann", NOW).await.unwrap();
        assert!(store.is_member(&folder("f2"), "ann").await.unwrap());
        assert!(!store.is_member(&folder("f1"), "ann").await.unwrap());
        assert!(!store.is_member(&folder("f2"), "Ann").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_by_folder_pages_through_everything() {
        let db = Database::open_in_memory().await.unwrap();
        let store = MembershipStore::new(db.pool()).with_page_size(3);

        for i in 0..10 {
            store
                .add(&folder("big"), &format!("user{i:02}"), NOW)
                .await
                .unwrap();
        }
        store.add(&folder("other"), "user00", NOW).await.unwrap();

        let members = store.list_by_folder(&folder("big")).await.unwrap();
        assert_eq!(members.len(), 10);
        assert!(members.iter().all(|m| m.folder_id == "big"));
    }

    #[tokio::test]
    async fn test_list_by_folder_exact_page_multiple() {
        let db = Database::open_in_memory().await.unwrap();
        let store = MembershipStore::new(db.pool()).with_page_size(2);

        for name in ["a", "b", "c", "d"] {
            store.add(&folder("f"), name, NOW).await.unwrap();
        }

        assert_eq!(store.list_by_folder(&folder("f")).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_list_by_username_uses_reverse_direction() {
        let db = Database::open_in_memory().await.unwrap();
        let store = MembershipStore::new(db.pool()).with_page_size(2);

        for id in ["f1", "f2", "f3", "f4", "f5"] {
            store.add(&folder(id), "ann", NOW).await.unwrap();
        }
        store.add(&folder("f1"), "bob", NOW).await.unwrap();

        let mut folders: Vec<_> = store
            .list_by_username("ann")
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.folder_id)
            .collect();
        folders.sort();
        assert_eq!(folders, vec!["f1", "f2", "f3", "f4", "f5"]);

        assert!(store.list_by_username("nobody").await.unwrap().is_empty());
    }
}
