//! Authentication and authorization for folio.
//!
//! This module normalizes identity claims, decides folder access for
//! listing requests and guards operator-only operations.

mod access;
mod claims;
mod permission;

pub use access::{AccessDecision, AccessEvaluator};
pub use claims::{parse_groups, ClaimsReader, PrincipalClaims, GROUPS_CLAIM, HOME_FOLDER_CLAIM};
pub use permission::{require_admin, require_identity};
