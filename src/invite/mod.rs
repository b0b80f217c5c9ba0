//! Time-limited folder invites.

mod ledger;
mod repository;

pub use ledger::{generate_invite_code, InviteLedger, DEFAULT_TTL_DAYS};
pub use repository::{Invite, InviteRepository};
