//! Folder membership and ban bookkeeping.

mod ban;
mod store;

pub use ban::{BanLedger, BanRecord};
pub use store::{MembershipRecord, MembershipStore, DEFAULT_PAGE_SIZE};
