//! Folder types and repository.

use serde::Serialize;
use sqlx::{QueryBuilder, Sqlite};

use super::FolderId;
use crate::db::DbPool;
use crate::{FolioError, Result};

/// Folder ids per lookup round-trip in [`FolderRepository::get_many`].
const LOOKUP_CHUNK: usize = 100;

/// A gallery folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    /// Folder id (also the storage prefix).
    pub folder_id: String,
    /// Human-readable name.
    pub display_name: String,
    /// RFC 3339 creation time.
    pub created_at: String,
    /// Operator who created the folder.
    pub created_by: String,
    /// Cached invite code, set on first invite creation.
    #[serde(skip_serializing)]
    pub invite_code: Option<String>,
}

/// Data for creating a new folder.
#[derive(Debug, Clone)]
pub struct NewFolder {
    /// Folder id.
    pub folder_id: FolderId,
    /// Display name, defaults to the folder id.
    pub display_name: String,
    /// Creating operator.
    pub created_by: String,
    /// RFC 3339 creation time.
    pub created_at: String,
}

impl NewFolder {
    /// Create a new folder record named after its id.
    pub fn new(
        folder_id: FolderId,
        created_by: impl Into<String>,
        created_at: impl Into<String>,
    ) -> Self {
        Self {
            display_name: folder_id.to_string(),
            folder_id,
            created_by: created_by.into(),
            created_at: created_at.into(),
        }
    }

    /// Set the display name. Blank names keep the default.
    pub fn with_display_name(mut self, display_name: &str) -> Self {
        let display_name = display_name.trim();
        if !display_name.is_empty() {
            self.display_name = display_name.to_string();
        }
        self
    }
}

/// Repository for folder operations.
pub struct FolderRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> FolderRepository<'a> {
    /// Create a new FolderRepository with the given database pool reference.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create a new folder. Fails with `Conflict` if the id is taken.
    pub async fn create(&self, folder: &NewFolder) -> Result<Folder> {
        let result = sqlx::query(
            "INSERT INTO folders (folder_id, display_name, created_at, created_by)
             VALUES (?, ?, ?, ?)",
        )
        .bind(folder.folder_id.as_str())
        .bind(&folder.display_name)
        .bind(&folder.created_at)
        .bind(&folder.created_by)
        .execute(self.pool)
        .await;

        match result {
            Ok(_) => {}
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                return Err(FolioError::Conflict("folder already exists".to_string()));
            }
            Err(e) => return Err(e.into()),
        }

        self.get(&folder.folder_id)
            .await?
            .ok_or_else(|| FolioError::NotFound("folder".to_string()))
    }

    /// Get a folder by id.
    pub async fn get(&self, folder_id: &FolderId) -> Result<Option<Folder>> {
        let folder = sqlx::query_as::<_, Folder>(
            "SELECT folder_id, display_name, created_at, created_by, invite_code
             FROM folders WHERE folder_id = ?",
        )
        .bind(folder_id.as_str())
        .fetch_optional(self.pool)
        .await?;

        Ok(folder)
    }

    /// List all folders, oldest first.
    pub async fn list(&self) -> Result<Vec<Folder>> {
        let folders = sqlx::query_as::<_, Folder>(
            "SELECT folder_id, display_name, created_at, created_by, invite_code
             FROM folders ORDER BY created_at, folder_id",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(folders)
    }

    /// Look up several folders at once, ordered by display name then id.
    /// Unknown ids are skipped.
    pub async fn get_many(&self, folder_ids: &[String]) -> Result<Vec<Folder>> {
        let mut folders = Vec::with_capacity(folder_ids.len());

        for chunk in folder_ids.chunks(LOOKUP_CHUNK) {
            let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(
                "SELECT folder_id, display_name, created_at, created_by, invite_code
                 FROM folders WHERE folder_id IN (",
            );
            let mut separated = query.separated(", ");
            for folder_id in chunk {
                separated.push_bind(folder_id);
            }
            separated.push_unseparated(")");

            let found = query
                .build_query_as::<Folder>()
                .fetch_all(self.pool)
                .await?;
            folders.extend(found);
        }

        folders.sort_by(|a, b| {
            (&a.display_name, &a.folder_id).cmp(&(&b.display_name, &b.folder_id))
        });
        Ok(folders)
    }

    /// Cache an invite code on a folder that has none yet.
    ///
    /// The write is conditional: if another request cached a code first,
    /// that code wins and is returned instead. Returns `None` if the folder
    /// no longer exists.
    pub async fn cache_invite_code(
        &self,
        folder_id: &FolderId,
        invite_code: &str,
    ) -> Result<Option<String>> {
        let result = sqlx::query(
            "UPDATE folders SET invite_code = ? WHERE folder_id = ? AND invite_code IS NULL",
        )
        .bind(invite_code)
        .bind(folder_id.as_str())
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(Some(invite_code.to_string()));
        }

        Ok(self.get(folder_id).await?.and_then(|f| f.invite_code))
    }

    /// Delete a folder together with its invites, memberships and bans.
    ///
    /// Storage objects are not touched here. Returns `false` if no folder row
    /// existed (dependent rows are still cleared).
    pub async fn delete_cascade(&self, folder_id: &FolderId) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        for table in ["invites", "folder_users", "banned_users"] {
            sqlx::query(&format!("DELETE FROM {table} WHERE folder_id = ?"))
                .bind(folder_id.as_str())
                .execute(&mut *tx)
                .await?;
        }

        let result = sqlx::query("DELETE FROM folders WHERE folder_id = ?")
            .bind(folder_id.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    async fn setup_db() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    fn new_folder(id: &str) -> NewFolder {
        NewFolder::new(
            FolderId::parse(id).unwrap(),
            "photographer",
            "2024-05-01T10:00:00Z",
        )
    }

    #[tokio::test]
    async fn test_create_folder() {
        let db = setup_db().await;
        let repo = FolderRepository::new(db.pool());

        let folder = repo
            .create(&new_folder("smith-wedding").with_display_name("Smith Wedding"))
            .await
            .unwrap();

        assert_eq!(folder.folder_id, "smith-wedding");
        assert_eq!(folder.display_name, "Smith Wedding");
        assert_eq!(folder.created_by, "photographer");
        assert!(folder.invite_code.is_none());
    }

    #[tokio::test]
    async fn test_display_name_defaults_to_id() {
        let db = setup_db().await;
        let repo = FolderRepository::new(db.pool());

        let folder = repo
            .create(&new_folder("f1").with_display_name("   "))
            .await
            .unwrap();
        assert_eq!(folder.display_name, "f1");
    }

    #[tokio::test]
    async fn test_create_duplicate_is_conflict() {
        let db = setup_db().await;
        let repo = FolderRepository::new(db.pool());

        repo.create(&new_folder("f1")).await.unwrap();
        let result = repo.create(&new_folder("f1")).await;
        assert!(matches!(result, Err(FolioError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_get_folder_not_found() {
        let db = setup_db().await;
        let repo = FolderRepository::new(db.pool());

        let found = repo.get(&FolderId::parse("missing").unwrap()).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_get_many_skips_unknown() {
        let db = setup_db().await;
        let repo = FolderRepository::new(db.pool());

        repo.create(&new_folder("a").with_display_name("Alpha"))
            .await
            .unwrap();
        repo.create(&new_folder("b").with_display_name("Beta"))
            .await
            .unwrap();

        let ids = vec!["b".to_string(), "ghost".to_string(), "a".to_string()];
        let folders = repo.get_many(&ids).await.unwrap();
        let names: Vec<_> = folders.iter().map(|f| f.display_name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Beta"]);

        assert!(repo.get_many(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_many_orders_across_chunks() {
        let db = setup_db().await;
        let repo = FolderRepository::new(db.pool());

        let count = LOOKUP_CHUNK + 5;
        let mut ids = Vec::with_capacity(count);
        for i in 0..count {
            let id = format!("f{i:03}");
            let name = format!("Name {:03}", count - 1 - i);
            repo.create(&new_folder(&id).with_display_name(&name))
                .await
                .unwrap();
            ids.push(id);
        }

        let folders = repo.get_many(&ids).await.unwrap();
        assert_eq!(folders.len(), count);
        assert_eq!(folders[0].display_name, "Name 000");
        assert_eq!(folders[0].folder_id, format!("f{:03}", count - 1));
        assert!(folders
            .windows(2)
            .all(|pair| pair[0].display_name <= pair[1].display_name));
    }

    #[tokio::test]
    async fn test_cache_invite_code_first_writer_wins() {
        let db = setup_db().await;
        let repo = FolderRepository::new(db.pool());
        let id = FolderId::parse("f1").unwrap();
        repo.create(&new_folder("f1")).await.unwrap();

        let first = repo.cache_invite_code(&id, "code-a").await.unwrap();
        assert_eq!(first.as_deref(), Some("code-a"));

        let second = repo.cache_invite_code(&id, "code-b").await.unwrap();
        assert_eq!(second.as_deref(), Some("code-a"));

        let folder = repo.get(&id).await.unwrap().unwrap();
        assert_eq!(folder.invite_code.as_deref(), Some("code-a"));
    }

    #[tokio::test]
    async fn test_cache_invite_code_missing_folder() {
        let db = setup_db().await;
        let repo = FolderRepository::new(db.pool());

        let cached = repo
            .cache_invite_code(&FolderId::parse("gone").unwrap(), "code")
            .await
            .unwrap();
        assert!(cached.is_none());
    }

    #[tokio::test]
    async fn test_delete_cascade_clears_dependent_rows() {
        let db = setup_db().await;
        let repo = FolderRepository::new(db.pool());
        let id = FolderId::parse("f1").unwrap();
        repo.create(&new_folder("f1")).await.unwrap();

        sqlx::query(
            "INSERT INTO folder_users (folder_id, username, created_at) VALUES ('f1', 'ann', 'x')",
        )
        .execute(db.pool())
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO banned_users (folder_id, username, banned_at) VALUES ('f1', 'bob', 'x')",
        )
        .execute(db.pool())
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO folder_users (folder_id, username, created_at) VALUES ('f2', 'ann', 'x')",
        )
        .execute(db.pool())
        .await
        .unwrap();

        assert!(repo.delete_cascade(&id).await.unwrap());
        assert!(repo.get(&id).await.unwrap().is_none());

        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM folder_users")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(remaining, 1);
        let bans: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM banned_users")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(bans, 0);

        assert!(!repo.delete_cascade(&id).await.unwrap());
    }
}
