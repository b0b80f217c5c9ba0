//! Permission checks for operator operations.

use super::claims::PrincipalClaims;
use crate::{FolioError, Result};

/// Require membership in the admin group.
///
/// # Examples
///
/// ```
/// use folio::auth::{require_admin, PrincipalClaims};
///
/// let operator = PrincipalClaims::new("boss").with_group("admin");
/// assert!(require_admin(&operator, "admin").is_ok());
///
/// let client = PrincipalClaims::new("ann").with_group("user");
/// assert!(require_admin(&client, "admin").is_err());
/// ```
pub fn require_admin(claims: &PrincipalClaims, admin_group: &str) -> Result<()> {
    if claims.is_admin(admin_group) {
        Ok(())
    } else {
        Err(FolioError::Forbidden("admin group required".to_string()))
    }
}

/// Require a non-empty username.
pub fn require_identity(claims: &PrincipalClaims) -> Result<&str> {
    let username = claims.username.trim();
    if username.is_empty() {
        return Err(FolioError::Unauthorized);
    }
    Ok(username)
}
