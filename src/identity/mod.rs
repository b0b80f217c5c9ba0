//! Identity provider interface.
//!
//! The user directory lives outside this crate. The gallery only needs to
//! read profiles, tag a principal's home folder, add principals to groups
//! and enumerate everyone for the membership backfill.

pub mod memory;

use async_trait::async_trait;
use serde::Serialize;

use crate::folder::FolderId;
use crate::Result;

pub use memory::InMemoryIdentityProvider;

/// A principal as stored by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrincipalProfile {
    pub username: String,
    /// Legacy home folder attribute.
    pub home_folder_id: Option<String>,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub enabled: bool,
    pub created_at: Option<String>,
}

impl PrincipalProfile {
    /// An enabled principal with no attributes.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            enabled: true,
            ..Default::default()
        }
    }

    pub fn with_home_folder(mut self, folder_id: impl Into<String>) -> Self {
        self.home_folder_id = Some(folder_id.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// One page of [`IdentityProvider::list_principals`].
#[derive(Debug, Clone, Default)]
pub struct PrincipalPage {
    pub principals: Vec<PrincipalProfile>,
    /// Token for the next page, `None` on the last one.
    pub next_token: Option<String>,
}

/// Operations the gallery consumes from the user directory.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Look up one principal.
    async fn get_principal(&self, username: &str) -> Result<Option<PrincipalProfile>>;

    /// Set the home folder attribute unless one is already set.
    ///
    /// Returns `true` if the attribute was written.
    async fn set_home_folder_if_unset(&self, username: &str, folder_id: &FolderId) -> Result<bool>;

    /// Add a principal to a group. Adding twice is not an error.
    async fn add_to_group(&self, username: &str, group: &str) -> Result<()>;

    /// List principals one page at a time.
    async fn list_principals(&self, page_token: Option<String>) -> Result<PrincipalPage>;
}
