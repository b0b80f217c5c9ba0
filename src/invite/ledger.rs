//! Invite issuance and resolution.

use tracing::{debug, info};

use super::repository::{Invite, InviteRepository};
use crate::datetime::{Clock, SECONDS_PER_DAY};
use crate::db::DbPool;
use crate::folder::{FolderId, FolderRepository};
use crate::{FolioError, Result};

/// Validity window when the caller gives none.
pub const DEFAULT_TTL_DAYS: i64 = 30;

/// Generate a new invite code: 128 random bits, lowercase hex.
pub fn generate_invite_code() -> String {
    let bytes: [u8; 16] = rand::random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Creates and reads invites.
///
/// Each folder carries at most one cached code. Issuing an invite for a
/// folder that already has one rewrites the invite row with a new expiry
/// instead of minting a second code.
pub struct InviteLedger<'a> {
    pool: &'a DbPool,
    clock: &'a dyn Clock,
    default_ttl_days: i64,
}

impl<'a> InviteLedger<'a> {
    pub fn new(pool: &'a DbPool, clock: &'a dyn Clock) -> Self {
        Self {
            pool,
            clock,
            default_ttl_days: DEFAULT_TTL_DAYS,
        }
    }

    /// Override the validity window used when none (or a non-positive one)
    /// is requested.
    pub fn with_default_ttl_days(mut self, days: i64) -> Self {
        if days > 0 {
            self.default_ttl_days = days;
        }
        self
    }

    /// Issue an invite for `folder_id`, reusing its cached code if any.
    ///
    /// The folder must exist. The code is cached with a conditional write
    /// before the invite row is stored, so concurrent first issues agree on
    /// one code. The two writes are not atomic: an invite row written by
    /// some other path without a cached code is not detected, and a fresh
    /// code is minted next to it.
    pub async fn create_or_reuse(
        &self,
        folder_id: &FolderId,
        ttl_days: Option<i64>,
        actor: &str,
    ) -> Result<Invite> {
        let folders = FolderRepository::new(self.pool);
        let folder = folders
            .get(folder_id)
            .await?
            .ok_or_else(|| FolioError::NotFound("folder".to_string()))?;

        let ttl_days = ttl_days
            .filter(|days| *days > 0)
            .unwrap_or(self.default_ttl_days);

        let invite_code = match folder.invite_code {
            Some(code) => {
                debug!(folder_id = %folder_id, "Reusing cached invite code");
                code
            }
            None => folders
                .cache_invite_code(folder_id, &generate_invite_code())
                .await?
                .ok_or_else(|| FolioError::NotFound("folder".to_string()))?,
        };

        let now = self.clock.now_epoch();
        let invite = Invite {
            invite_code,
            folder_id: folder_id.to_string(),
            expires_at: now + ttl_days * SECONDS_PER_DAY,
            created_at: self.clock.now_rfc3339(),
            created_by: actor.to_string(),
        };
        InviteRepository::new(self.pool).put(&invite).await?;

        info!(
            folder_id = %folder_id,
            ttl_days,
            expires_at = invite.expires_at,
            "Invite issued"
        );
        Ok(invite)
    }

    /// Look up an invite by code.
    ///
    /// Expiry is checked here rather than trusted to the purge, which runs
    /// out of band.
    pub async fn resolve(&self, invite_code: &str) -> Result<Invite> {
        let invite = InviteRepository::new(self.pool)
            .get(invite_code)
            .await?
            .ok_or_else(|| FolioError::NotFound("invite".to_string()))?;

        if invite.is_expired_at(self.clock.now_epoch()) {
            return Err(FolioError::Expired("invite".to_string()));
        }

        Ok(invite)
    }

    /// Remove invite rows past their expiry.
    pub async fn purge_expired(&self) -> Result<u64> {
        let purged = InviteRepository::new(self.pool)
            .purge_expired(self.clock.now_epoch())
            .await?;
        if purged > 0 {
            info!(purged, "Purged expired invites");
        }
        Ok(purged)
    }
}
