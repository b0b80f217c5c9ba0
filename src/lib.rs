//! folio - private client galleries
//!
//! Invite-based folder membership, access decisions for listing requests
//! and bounded random photo selection over a paged object store.

pub mod auth;
pub mod backfill;
pub mod config;
pub mod datetime;
pub mod db;
pub mod error;
pub mod folder;
pub mod gallery;
pub mod identity;
pub mod invite;
pub mod logging;
pub mod membership;
pub mod photo;
pub mod storage;

pub use auth::{
    require_admin, AccessDecision, AccessEvaluator, ClaimsReader, PrincipalClaims,
};
pub use backfill::{BackfillJob, BackfillReport};
pub use config::Config;
pub use datetime::{Clock, ManualClock, SystemClock};
pub use db::Database;
pub use error::{FolioError, Result};
pub use folder::{Folder, FolderId, FolderRepository, NewFolder};
pub use gallery::{
    AcceptedInvite, BannedUser, FolderDeletion, FolderRoster, FolderUser, Gallery, PhotoEntry,
    PhotoList, PhotoListMeta, PhotoListRequest, UserFolder,
};
pub use identity::{IdentityProvider, InMemoryIdentityProvider, PrincipalPage, PrincipalProfile};
pub use invite::{Invite, InviteLedger};
pub use membership::{BanLedger, BanRecord, MembershipRecord, MembershipStore};
pub use photo::{PhotoSampler, PhotoService, Sample, SampleMeta, SampleRequest};
pub use storage::{DeliveryResolver, InMemoryObjectStore, ListPage, ObjectStore, ObjectSummary};
