//! The gallery service.
//!
//! [`Gallery`] wires the stores, the identity provider and the object store
//! together and exposes every request flow: photo listing, invites, folder
//! and roster administration, photo administration and the membership
//! backfill. Each call takes the caller's [`PrincipalClaims`]; operator
//! operations require the configured admin group.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::auth::{
    require_admin, require_identity, AccessEvaluator, ClaimsReader, PrincipalClaims,
};
use crate::backfill::{BackfillJob, BackfillReport};
use crate::config::Config;
use crate::datetime::{Clock, SystemClock};
use crate::db::Database;
use crate::folder::{Folder, FolderId, FolderRepository, NewFolder};
use crate::identity::{IdentityProvider, PrincipalProfile};
use crate::invite::{Invite, InviteLedger};
use crate::membership::{BanLedger, MembershipStore};
use crate::photo::{PhotoSampler, PhotoService, PhotoTransfer, SampleMeta, SampleRequest};
use crate::storage::{DeliveryResolver, ObjectStore};
use crate::{FolioError, Result};

/// Parameters of a photo listing request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PhotoListRequest {
    /// Folder to list; blank means the caller's home folder.
    pub folder_id: Option<String>,
    /// Maximum number of photos; the configured default when absent.
    pub limit: Option<i64>,
    /// Keys the client already has.
    pub exclude_keys: Vec<String>,
    /// More keys to exclude, comma separated.
    #[serde(rename = "exclude")]
    pub exclude_csv: Option<String>,
}

impl PhotoListRequest {
    fn exclusions(&self) -> HashSet<String> {
        let csv = self.exclude_csv.as_deref().unwrap_or_default().split(',');
        self.exclude_keys
            .iter()
            .map(String::as_str)
            .chain(csv)
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// A sampled photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhotoEntry {
    pub key: String,
    pub url: String,
}

/// Sampling metadata plus the folder that was listed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoListMeta {
    #[serde(flatten)]
    pub sample: SampleMeta,
    pub folder_id: FolderId,
}

/// Response of [`Gallery::list_photos`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhotoList {
    pub photos: Vec<PhotoEntry>,
    pub meta: PhotoListMeta,
}

/// Response of [`Gallery::accept_invite`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptedInvite {
    pub folder_id: FolderId,
    pub username: String,
    /// Whether a new membership record was written.
    pub membership_created: bool,
    /// Whether the principal's home folder was set by this call.
    pub home_folder_set: bool,
}

/// Response of [`Gallery::delete_folder`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderDeletion {
    pub folder_id: FolderId,
    pub objects_deleted: u64,
    pub folder_existed: bool,
}

/// A folder member with profile details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderUser {
    #[serde(flatten)]
    pub profile: PrincipalProfile,
    /// When the membership was granted.
    pub added_at: String,
}

/// A banned principal with profile details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BannedUser {
    #[serde(flatten)]
    pub profile: PrincipalProfile,
    pub banned_at: String,
}

/// Response of [`Gallery::list_folder_users`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderRoster {
    pub folder_id: FolderId,
    pub users: Vec<FolderUser>,
    pub banned_users: Vec<BannedUser>,
}

/// A folder the caller can open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFolder {
    pub folder_id: String,
    pub display_name: String,
}

/// Gallery service over its collaborators.
pub struct Gallery {
    config: Config,
    db: Database,
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn ObjectStore>,
    clock: Arc<dyn Clock>,
    delivery: DeliveryResolver,
    claims_reader: ClaimsReader,
}

impl Gallery {
    /// Create a gallery. Fails with `Misconfigured` if the configuration
    /// does not validate or the delivery domain is unusable.
    pub fn new(
        config: Config,
        db: Database,
        identity: Arc<dyn IdentityProvider>,
        store: Arc<dyn ObjectStore>,
    ) -> Result<Self> {
        config.validate()?;
        let delivery = DeliveryResolver::new(&config.storage.delivery_domain)?;
        let claims_reader = ClaimsReader::new(&config.identity.jwt_secret);

        Ok(Self {
            config,
            db,
            identity,
            store,
            clock: Arc::new(SystemClock),
            delivery,
            claims_reader,
        })
    }

    /// Replace the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Reader for bearer tokens signed with the configured secret.
    pub fn claims_reader(&self) -> &ClaimsReader {
        &self.claims_reader
    }

    fn admin_group(&self) -> &str {
        &self.config.identity.admin_group
    }

    fn require_admin(&self, claims: &PrincipalClaims) -> Result<()> {
        require_admin(claims, self.admin_group())
    }

    fn memberships(&self) -> MembershipStore<'_> {
        MembershipStore::new(self.db.pool()).with_page_size(self.config.database.page_size)
    }

    fn bans(&self) -> BanLedger<'_> {
        BanLedger::new(self.db.pool()).with_page_size(self.config.database.page_size)
    }

    fn invites(&self) -> InviteLedger<'_> {
        InviteLedger::new(self.db.pool(), self.clock.as_ref())
            .with_default_ttl_days(self.config.invites.default_ttl_days)
    }

    fn photos(&self) -> PhotoService<'_> {
        PhotoService::new(self.store.as_ref(), self.clock.as_ref())
            .with_max_size(self.config.storage.max_upload_bytes)
    }

    /// Return a random selection of photos from a folder the caller may read.
    pub async fn list_photos(
        &self,
        claims: &PrincipalClaims,
        request: &PhotoListRequest,
    ) -> Result<PhotoList> {
        let username = require_identity(claims)?;

        let limit = match request.limit {
            None => self.config.sampler.default_limit,
            Some(limit) if limit > 0 => usize::try_from(limit).map_err(|_| {
                FolioError::InvalidArgument("limit is too large".to_string())
            })?,
            Some(_) => {
                return Err(FolioError::InvalidArgument(
                    "limit must be a positive integer".to_string(),
                ))
            }
        };

        let decision = AccessEvaluator::new(self.db.pool(), self.admin_group())
            .evaluate(claims, request.folder_id.as_deref())
            .await?;
        let folder_id = decision.into_result().inspect_err(|e| {
            debug!(username, error = %e, "Photo listing denied");
        })?;

        let sample_request = SampleRequest {
            limit,
            exclude: request.exclusions(),
        };
        let mut rng = StdRng::from_rng(&mut rand::rng());
        let sample = PhotoSampler::new(self.config.sampler.max_scan)
            .sample(self.store.as_ref(), &folder_id, &sample_request, &mut rng)
            .await
            .inspect_err(|e| log_failure("list_photos", folder_id.as_str(), e))?;

        let photos = sample
            .keys
            .into_iter()
            .map(|key| PhotoEntry {
                url: self.delivery.to_public_url(&key),
                key,
            })
            .collect();

        Ok(PhotoList {
            photos,
            meta: PhotoListMeta {
                sample: sample.meta,
                folder_id,
            },
        })
    }

    /// Issue (or refresh) the invite for a folder.
    pub async fn create_invite(
        &self,
        claims: &PrincipalClaims,
        folder_id: &str,
        ttl_days: Option<i64>,
    ) -> Result<Invite> {
        self.require_admin(claims)?;
        let actor = require_identity(claims)?;
        let folder_id = FolderId::parse(folder_id)?;

        self.invites()
            .create_or_reuse(&folder_id, ttl_days, actor)
            .await
            .inspect_err(|e| log_failure("create_invite", folder_id.as_str(), e))
    }

    /// Turn an invite into a membership for the caller.
    ///
    /// An unknown or expired invite performs no writes. A principal banned
    /// from the folder is refused before anything is written.
    pub async fn accept_invite(
        &self,
        claims: &PrincipalClaims,
        invite_code: &str,
    ) -> Result<AcceptedInvite> {
        let username = require_identity(claims)?;
        let invite_code = invite_code.trim();
        if invite_code.is_empty() {
            return Err(FolioError::InvalidArgument(
                "inviteCode is required".to_string(),
            ));
        }

        let invite = self.invites().resolve(invite_code).await?;
        let folder_id = FolderId::parse(&invite.folder_id)?;

        if self.bans().is_banned(&folder_id, username).await? {
            info!(folder_id = %folder_id, username, "Invite refused for banned principal");
            return Err(FolioError::Forbidden("principal is banned".to_string()));
        }

        let membership_created = self
            .memberships()
            .add(&folder_id, username, &self.clock.now_rfc3339())
            .await
            .inspect_err(|e| log_failure("accept_invite", folder_id.as_str(), e))?;

        let home_folder_set = match claims.home_folder_id {
            Some(_) => false,
            None => self
                .identity
                .set_home_folder_if_unset(username, &folder_id)
                .await
                .inspect_err(|e| log_failure("accept_invite", folder_id.as_str(), e))?,
        };

        self.identity
            .add_to_group(username, &self.config.identity.member_group)
            .await
            .inspect_err(|e| log_failure("accept_invite", folder_id.as_str(), e))?;

        info!(folder_id = %folder_id, username, membership_created, "Invite accepted");
        Ok(AcceptedInvite {
            folder_id,
            username: username.to_string(),
            membership_created,
            home_folder_set,
        })
    }

    /// Drop invites past their expiry.
    pub async fn purge_expired_invites(&self, claims: &PrincipalClaims) -> Result<u64> {
        self.require_admin(claims)?;
        self.invites().purge_expired().await
    }

    pub async fn create_folder(
        &self,
        claims: &PrincipalClaims,
        folder_id: &str,
        display_name: Option<&str>,
    ) -> Result<Folder> {
        self.require_admin(claims)?;
        let actor = require_identity(claims)?;
        let folder_id = FolderId::parse(folder_id)?;

        let new_folder = NewFolder::new(folder_id, actor, self.clock.now_rfc3339())
            .with_display_name(display_name.unwrap_or_default());
        let folder = FolderRepository::new(self.db.pool()).create(&new_folder).await?;

        info!(folder_id = %folder.folder_id, "Folder created");
        Ok(folder)
    }

    pub async fn list_folders(&self, claims: &PrincipalClaims) -> Result<Vec<Folder>> {
        self.require_admin(claims)?;
        FolderRepository::new(self.db.pool()).list().await
    }

    /// Delete a folder's objects, then the folder with its invites,
    /// memberships and bans.
    pub async fn delete_folder(
        &self,
        claims: &PrincipalClaims,
        folder_id: &str,
    ) -> Result<FolderDeletion> {
        self.require_admin(claims)?;
        let folder_id = FolderId::parse(folder_id)?;

        let objects_deleted = self
            .store
            .delete_prefix(&folder_id.prefix())
            .await
            .inspect_err(|e| log_failure("delete_folder", folder_id.as_str(), e))?;
        let folder_existed = FolderRepository::new(self.db.pool())
            .delete_cascade(&folder_id)
            .await?;

        info!(folder_id = %folder_id, objects_deleted, folder_existed, "Folder deleted");
        Ok(FolderDeletion {
            folder_id,
            objects_deleted,
            folder_existed,
        })
    }

    /// Members and banned principals of a folder, with profile details.
    ///
    /// Principals whose profile cannot be loaded are left out.
    pub async fn list_folder_users(
        &self,
        claims: &PrincipalClaims,
        folder_id: &str,
    ) -> Result<FolderRoster> {
        self.require_admin(claims)?;
        let folder_id = FolderId::parse(folder_id)?;

        let members = self.memberships().list_by_folder(&folder_id).await?;
        let banned = self.bans().list_by_folder(&folder_id).await?;

        let member_profiles =
            join_all(members.iter().map(|m| self.load_profile(&m.username))).await;
        let banned_profiles =
            join_all(banned.iter().map(|b| self.load_profile(&b.username))).await;

        let users = members
            .into_iter()
            .zip(member_profiles)
            .filter_map(|(member, profile)| {
                Some(FolderUser {
                    profile: profile?,
                    added_at: member.created_at,
                })
            })
            .collect();
        let banned_users = banned
            .into_iter()
            .zip(banned_profiles)
            .filter_map(|(ban, profile)| {
                Some(BannedUser {
                    profile: profile?,
                    banned_at: ban.banned_at,
                })
            })
            .collect();

        Ok(FolderRoster {
            folder_id,
            users,
            banned_users,
        })
    }

    async fn load_profile(&self, username: &str) -> Option<PrincipalProfile> {
        match self.identity.get_principal(username).await {
            Ok(Some(profile)) => Some(profile),
            Ok(None) => {
                warn!(username, "Principal not found in identity provider");
                None
            }
            Err(e) => {
                warn!(username, error = %e, "Failed to load principal profile");
                None
            }
        }
    }

    /// Revoke a membership. Returns whether one existed.
    pub async fn remove_folder_user(
        &self,
        claims: &PrincipalClaims,
        folder_id: &str,
        username: &str,
    ) -> Result<bool> {
        self.require_admin(claims)?;
        let (folder_id, username) = folder_and_username(folder_id, username)?;

        let removed = self.memberships().remove(&folder_id, username).await?;
        info!(folder_id = %folder_id, username, removed, "Folder user removed");
        Ok(removed)
    }

    /// Ban a principal from a folder. Returns whether the ban is new.
    pub async fn ban_folder_user(
        &self,
        claims: &PrincipalClaims,
        folder_id: &str,
        username: &str,
    ) -> Result<bool> {
        self.require_admin(claims)?;
        let (folder_id, username) = folder_and_username(folder_id, username)?;

        let banned = self
            .bans()
            .add(&folder_id, username, &self.clock.now_rfc3339())
            .await?;
        info!(folder_id = %folder_id, username, "Folder user banned");
        Ok(banned)
    }

    /// Lift a ban. Returns whether one existed.
    pub async fn unban_folder_user(
        &self,
        claims: &PrincipalClaims,
        folder_id: &str,
        username: &str,
    ) -> Result<bool> {
        self.require_admin(claims)?;
        let (folder_id, username) = folder_and_username(folder_id, username)?;

        let lifted = self.bans().remove(&folder_id, username).await?;
        info!(folder_id = %folder_id, username, lifted, "Folder user unbanned");
        Ok(lifted)
    }

    /// Folders the caller belongs to, with display names.
    ///
    /// Memberships of folders that were never registered are skipped.
    pub async fn list_user_folders(&self, claims: &PrincipalClaims) -> Result<Vec<UserFolder>> {
        let username = require_identity(claims)?;

        let folder_ids: Vec<String> = self
            .memberships()
            .list_by_username(username)
            .await?
            .into_iter()
            .map(|m| m.folder_id)
            .collect();
        if folder_ids.is_empty() {
            return Ok(Vec::new());
        }

        let folders = FolderRepository::new(self.db.pool())
            .get_many(&folder_ids)
            .await?;
        Ok(folders
            .into_iter()
            .map(|folder| UserFolder {
                folder_id: folder.folder_id,
                display_name: folder.display_name,
            })
            .collect())
    }

    /// Every principal in the directory.
    pub async fn list_all_users(&self, claims: &PrincipalClaims) -> Result<Vec<PrincipalProfile>> {
        self.require_admin(claims)?;

        let mut users = Vec::new();
        let mut token = None;
        loop {
            let page = self.identity.list_principals(token.take()).await?;
            users.extend(page.principals);
            match page.next_token {
                Some(next) => token = Some(next),
                None => return Ok(users),
            }
        }
    }

    /// Write memberships for principals carrying a legacy home folder.
    pub async fn backfill_memberships(&self, claims: &PrincipalClaims) -> Result<BackfillReport> {
        BackfillJob::new(self.db.pool(), self.identity.as_ref(), self.clock.as_ref())
            .run(claims, self.admin_group())
            .await
    }

    /// Upload a photo into a folder. Returns the object key.
    pub async fn upload_photo(
        &self,
        claims: &PrincipalClaims,
        folder_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<String> {
        self.require_admin(claims)?;
        let folder_id = FolderId::parse(folder_id)?;

        self.photos()
            .upload(&folder_id, file_name, bytes)
            .await
            .inspect_err(|e| log_failure("upload_photo", folder_id.as_str(), e))
    }

    pub async fn move_photo(
        &self,
        claims: &PrincipalClaims,
        source_key: &str,
        destination_folder_id: &str,
    ) -> Result<PhotoTransfer> {
        self.require_admin(claims)?;
        let destination = FolderId::parse(destination_folder_id)?;

        self.photos()
            .move_photo(source_key, &destination)
            .await
            .inspect_err(|e| log_failure("move_photo", destination.as_str(), e))
    }

    pub async fn duplicate_photo(
        &self,
        claims: &PrincipalClaims,
        source_key: &str,
        destination_folder_id: &str,
        destination_name: Option<&str>,
    ) -> Result<PhotoTransfer> {
        self.require_admin(claims)?;
        let destination = FolderId::parse(destination_folder_id)?;

        self.photos()
            .duplicate_photo(source_key, &destination, destination_name)
            .await
            .inspect_err(|e| log_failure("duplicate_photo", destination.as_str(), e))
    }

    pub async fn delete_photo(&self, claims: &PrincipalClaims, key: &str) -> Result<()> {
        self.require_admin(claims)?;
        self.photos()
            .delete_photo(key)
            .await
            .inspect_err(|e| log_failure("delete_photo", "-", e))
    }
}

fn folder_and_username<'u>(folder_id: &str, username: &'u str) -> Result<(FolderId, &'u str)> {
    let folder_id = FolderId::parse(folder_id)?;
    let username = username.trim();
    if username.is_empty() {
        return Err(FolioError::InvalidArgument(
            "folderId and username are required".to_string(),
        ));
    }
    Ok((folder_id, username))
}

fn log_failure(operation: &str, folder_id: &str, e: &FolioError) {
    if e.is_internal() {
        error!(operation, folder_id, error = %e, "Operation failed");
    } else {
        debug!(operation, folder_id, error = %e, "Operation rejected");
    }
}
