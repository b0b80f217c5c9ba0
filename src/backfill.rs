//! Membership backfill for principals carrying a legacy home folder.
//!
//! Before folder membership existed, access was granted solely through the
//! `custom:folderId` attribute. This job walks the whole directory and
//! writes the matching membership records. It is safe to re-run.

use serde::Serialize;
use tracing::{info, warn};

use crate::auth::{require_admin, PrincipalClaims};
use crate::datetime::Clock;
use crate::db::DbPool;
use crate::folder::FolderId;
use crate::identity::{IdentityProvider, PrincipalProfile};
use crate::membership::MembershipStore;
use crate::Result;

/// Counts from one backfill run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BackfillReport {
    /// Principals read from the directory.
    pub scanned: u64,
    /// Memberships newly written.
    pub updated: u64,
    /// Principals whose home folder could not be recorded.
    pub failed: u64,
}

/// One-shot repair job.
pub struct BackfillJob<'a> {
    pool: &'a DbPool,
    identity: &'a dyn IdentityProvider,
    clock: &'a dyn Clock,
}

impl<'a> BackfillJob<'a> {
    pub fn new(pool: &'a DbPool, identity: &'a dyn IdentityProvider, clock: &'a dyn Clock) -> Self {
        Self {
            pool,
            identity,
            clock,
        }
    }

    /// Page through every principal and record their home folder membership.
    ///
    /// Only members of `admin_group` may run it. A failure listing the
    /// directory aborts the run. A failure for a single principal is logged
    /// and counted in `failed`.
    pub async fn run(
        &self,
        actor: &PrincipalClaims,
        admin_group: &str,
    ) -> Result<BackfillReport> {
        require_admin(actor, admin_group)?;

        let memberships = MembershipStore::new(self.pool);
        let mut report = BackfillReport::default();
        let mut token = None;

        loop {
            let page = self.identity.list_principals(token.take()).await?;

            for principal in &page.principals {
                report.scanned += 1;
                match self.backfill_one(&memberships, principal).await {
                    Ok(true) => report.updated += 1,
                    Ok(false) => {}
                    Err(e) => {
                        warn!(
                            username = %principal.username,
                            error = %e,
                            "Backfill failed for principal"
                        );
                        report.failed += 1;
                    }
                }
            }

            match page.next_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }

        info!(
            scanned = report.scanned,
            updated = report.updated,
            failed = report.failed,
            "Membership backfill complete"
        );
        Ok(report)
    }

    async fn backfill_one(
        &self,
        memberships: &MembershipStore<'_>,
        principal: &PrincipalProfile,
    ) -> Result<bool> {
        let Some(raw) = principal.home_folder_id.as_deref() else {
            return Ok(false);
        };
        if raw.trim().is_empty() {
            return Ok(false);
        }

        let folder_id = FolderId::parse(raw)?;
        memberships
            .add(&folder_id, &principal.username, &self.clock.now_rfc3339())
            .await
    }
}
