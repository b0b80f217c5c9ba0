//! Authorization for folder listing requests.

use tracing::debug;

use super::claims::PrincipalClaims;
use super::permission::require_identity;
use crate::db::DbPool;
use crate::folder::FolderId;
use crate::membership::{BanLedger, MembershipStore};
use crate::{FolioError, Result};

/// Outcome of an access check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    /// Read access to this folder.
    Grant(FolderId),
    /// No access. The reason is for logs only.
    Deny(&'static str),
}

impl AccessDecision {
    /// Turn a denial into `Forbidden`.
    pub fn into_result(self) -> Result<FolderId> {
        match self {
            AccessDecision::Grant(folder_id) => Ok(folder_id),
            AccessDecision::Deny(reason) => Err(FolioError::Forbidden(reason.to_string())),
        }
    }

    pub fn is_granted(&self) -> bool {
        matches!(self, AccessDecision::Grant(_))
    }
}

const NO_FOLDER: &str = "no folder access available";
const NOT_MEMBER: &str = "folder access not available";

/// Decides which folder, if any, a principal may list.
///
/// The checks run in a fixed order:
///
/// 1. Admins are granted without touching the membership table. They get
///    the requested folder, else their home folder.
/// 2. A non-admin with no requested folder falls back to the home folder.
/// 3. A non-admin requesting a folder must hold a membership for it, and
///    the requested folder wins over the home folder.
///
/// A ban on the folder denies non-admins in both 2 and 3. Every granted
/// folder comes out as a [`FolderId`], so it has been sanitized before it
/// can be used as a storage prefix.
pub struct AccessEvaluator<'a> {
    pool: &'a DbPool,
    admin_group: &'a str,
}

impl<'a> AccessEvaluator<'a> {
    pub fn new(pool: &'a DbPool, admin_group: &'a str) -> Self {
        Self { pool, admin_group }
    }

    /// Evaluate a listing request for `requested` (blank means none).
    ///
    /// Only an admin's malformed folder id is reported as
    /// `InvalidArgument`. For everyone else it is a plain denial. The
    /// username is trimmed before any lookup; a blank one is `Unauthorized`.
    pub async fn evaluate(
        &self,
        claims: &PrincipalClaims,
        requested: Option<&str>,
    ) -> Result<AccessDecision> {
        let username = require_identity(claims)?;
        let requested = requested.map(str::trim).filter(|raw| !raw.is_empty());

        if claims.is_admin(self.admin_group) {
            let Some(raw) = requested.or(claims.home_folder_id.as_deref()) else {
                return Ok(AccessDecision::Deny(NO_FOLDER));
            };
            return Ok(AccessDecision::Grant(FolderId::parse(raw)?));
        }

        let (folder_id, require_membership, reason) = match requested {
            None => match FolderId::parse_optional(claims.home_folder_id.as_deref()) {
                Some(home) => (home, false, NO_FOLDER),
                None => return Ok(AccessDecision::Deny(NO_FOLDER)),
            },
            Some(raw) => match FolderId::parse(raw) {
                Ok(folder_id) => (folder_id, true, NOT_MEMBER),
                Err(_) => return Ok(AccessDecision::Deny(NOT_MEMBER)),
            },
        };

        if BanLedger::new(self.pool)
            .is_banned(&folder_id, username)
            .await?
        {
            debug!(folder_id = %folder_id, "Access denied for banned principal");
            return Ok(AccessDecision::Deny(reason));
        }

        if require_membership
            && !MembershipStore::new(self.pool)
                .is_member(&folder_id, username)
                .await?
        {
            return Ok(AccessDecision::Deny(reason));
        }

        Ok(AccessDecision::Grant(folder_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    const NOW: &str = "2024-05-01T10:00:00Z";

    fn f(id: &str) -> FolderId {
        FolderId::parse(id).unwrap()
    }

    fn admin() -> PrincipalClaims {
        PrincipalClaims::new("boss").with_group("admin")
    }

    #[tokio::test]
    async fn test_admin_bypasses_membership() {
        let db = Database::open_in_memory().await.unwrap();
        let access = AccessEvaluator::new(db.pool(), "admin");

        let decision = access.evaluate(&admin(), Some("/f9/")).await.unwrap();
        assert_eq!(decision, AccessDecision::Grant(f("f9")));
    }

    #[tokio::test]
    async fn test_admin_without_folder() {
        let db = Database::open_in_memory().await.unwrap();
        let access = AccessEvaluator::new(db.pool(), "admin");

        assert!(!access.evaluate(&admin(), None).await.unwrap().is_granted());

        let with_home = admin().with_home_folder("f3");
        assert_eq!(
            access.evaluate(&with_home, Some("  ")).await.unwrap(),
            AccessDecision::Grant(f("f3"))
        );
    }

    #[tokio::test]
    async fn test_admin_malformed_folder_is_invalid_argument() {
        let db = Database::open_in_memory().await.unwrap();
        let access = AccessEvaluator::new(db.pool(), "admin");

        let result = access.evaluate(&admin(), Some("../etc")).await;
        assert!(matches!(result, Err(FolioError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_home_folder_fallback() {
        let db = Database::open_in_memory().await.unwrap();
        let access = AccessEvaluator::new(db.pool(), "admin");

        let claims = PrincipalClaims::new("ann").with_home_folder("f1/");
        assert_eq!(
            access.evaluate(&claims, None).await.unwrap(),
            AccessDecision::Grant(f("f1"))
        );

        let homeless = PrincipalClaims::new("ann");
        assert_eq!(
            access.evaluate(&homeless, None).await.unwrap(),
            AccessDecision::Deny(NO_FOLDER)
        );

        let bad_home = PrincipalClaims::new("ann").with_home_folder("a b");
        assert!(!access.evaluate(&bad_home, None).await.unwrap().is_granted());
    }

    #[tokio::test]
    async fn test_requested_folder_requires_membership() {
        let db = Database::open_in_memory().await.unwrap();
        MembershipStore::new(db.pool())
            .add(&f("f2"), "ann", NOW)
            .await
            .unwrap();
        let access = AccessEvaluator::new(db.pool(), "admin");
        let claims = PrincipalClaims::new("ann").with_home_folder("f1");

        assert_eq!(
            access.evaluate(&claims, Some("f2")).await.unwrap(),
            AccessDecision::Grant(f("f2"))
        );
        // The requested folder wins over the home folder
        assert_eq!(
            access.evaluate(&claims, Some("f1")).await.unwrap(),
            AccessDecision::Deny(NOT_MEMBER)
        );
        assert_eq!(
            access.evaluate(&claims, Some("../f2")).await.unwrap(),
            AccessDecision::Deny(NOT_MEMBER)
        );
    }

    #[tokio::test]
    async fn test_username_is_trimmed_before_lookup() {
        let db = Database::open_in_memory().await.unwrap();
        MembershipStore::new(db.pool())
            .add(&f("f1"), "ann", NOW)
            .await
            .unwrap();
        let access = AccessEvaluator::new(db.pool(), "admin");

        let padded = PrincipalClaims::new(" ann ");
        assert_eq!(
            access.evaluate(&padded, Some("f1")).await.unwrap(),
            AccessDecision::Grant(f("f1"))
        );
        assert!(matches!(
            access.evaluate(&PrincipalClaims::new("  "), Some("f1")).await,
            Err(FolioError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_ban_overrides_membership() {
        let db = Database::open_in_memory().await.unwrap();
        MembershipStore::new(db.pool())
            .add(&f("f1"), "ann", NOW)
            .await
            .unwrap();
        BanLedger::new(db.pool())
            .add(&f("f1"), "ann", NOW)
            .await
            .unwrap();
        let access = AccessEvaluator::new(db.pool(), "admin");

        let claims = PrincipalClaims::new("ann").with_home_folder("f1");
        assert!(!access.evaluate(&claims, Some("f1")).await.unwrap().is_granted());
        assert!(!access.evaluate(&claims, None).await.unwrap().is_granted());
    }

    #[test]
    fn test_into_result() {
        assert_eq!(AccessDecision::Grant(f("x")).into_result().unwrap(), f("x"));
        assert!(matches!(
            AccessDecision::Deny(NOT_MEMBER).into_result(),
            Err(FolioError::Forbidden(_))
        ));
    }
}
