//! In-memory identity provider.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{IdentityProvider, PrincipalPage, PrincipalProfile};
use crate::folder::FolderId;
use crate::{FolioError, Result};

const DEFAULT_PAGE_SIZE: usize = 60;

#[derive(Debug, Default)]
struct Entry {
    profile: PrincipalProfile,
    groups: BTreeSet<String>,
}

/// Identity provider held in memory, for tests and local runs.
///
/// Principals listed with [`fail_for`](Self::fail_for) make every
/// per-principal call return `Upstream`.
#[derive(Debug)]
pub struct InMemoryIdentityProvider {
    entries: RwLock<BTreeMap<String, Entry>>,
    failing: RwLock<HashSet<String>>,
    page_size: usize,
}

impl Default for InMemoryIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            failing: RwLock::new(HashSet::new()),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Add or replace a principal.
    pub async fn insert(&self, profile: PrincipalProfile) {
        let mut entries = self.entries.write().await;
        let entry = entries.entry(profile.username.clone()).or_default();
        entry.profile = profile;
    }

    /// Make calls about `username` fail.
    pub async fn fail_for(&self, username: &str) {
        self.failing.write().await.insert(username.to_string());
    }

    /// Groups a principal belongs to.
    pub async fn groups_of(&self, username: &str) -> BTreeSet<String> {
        self.entries
            .read()
            .await
            .get(username)
            .map(|entry| entry.groups.clone())
            .unwrap_or_default()
    }

    async fn check(&self, username: &str) -> Result<()> {
        if self.failing.read().await.contains(username) {
            return Err(FolioError::Upstream(format!(
                "identity provider unavailable for {username}"
            )));
        }
        Ok(())
    }
}

fn unknown(username: &str) -> FolioError {
    FolioError::Upstream(format!("unknown principal {username}"))
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn get_principal(&self, username: &str) -> Result<Option<PrincipalProfile>> {
        self.check(username).await?;
        Ok(self
            .entries
            .read()
            .await
            .get(username)
            .map(|entry| entry.profile.clone()))
    }

    async fn set_home_folder_if_unset(&self, username: &str, folder_id: &FolderId) -> Result<bool> {
        self.check(username).await?;
        let mut entries = self.entries.write().await;
        let entry = entries.get_mut(username).ok_or_else(|| unknown(username))?;

        if entry.profile.home_folder_id.is_some() {
            return Ok(false);
        }
        entry.profile.home_folder_id = Some(folder_id.to_string());
        Ok(true)
    }

    async fn add_to_group(&self, username: &str, group: &str) -> Result<()> {
        self.check(username).await?;
        let mut entries = self.entries.write().await;
        let entry = entries.get_mut(username).ok_or_else(|| unknown(username))?;
        entry.groups.insert(group.to_string());
        Ok(())
    }

    async fn list_principals(&self, page_token: Option<String>) -> Result<PrincipalPage> {
        let entries = self.entries.read().await;
        let mut remaining = entries
            .iter()
            .filter(|(name, _)| {
                page_token
                    .as_deref()
                    .map_or(true, |after| name.as_str() > after)
            })
            .map(|(_, entry)| entry.profile.clone());

        let principals: Vec<_> = remaining.by_ref().take(self.page_size).collect();
        let next_token = match remaining.next() {
            Some(_) => principals.last().map(|p| p.username.clone()),
            None => None,
        };

        Ok(PrincipalPage {
            principals,
            next_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_home_folder_only_set_once() {
        let idp = InMemoryIdentityProvider::new();
        idp.insert(PrincipalProfile::new("ann")).await;

        let f1 = FolderId::parse("f1").unwrap();
        let f2 = FolderId::parse("f2").unwrap();
        assert!(idp.set_home_folder_if_unset("ann", &f1).await.unwrap());
        assert!(!idp.set_home_folder_if_unset("ann", &f2).await.unwrap());

        let profile = idp.get_principal("ann").await.unwrap().unwrap();
        assert_eq!(profile.home_folder_id.as_deref(), Some("f1"));
    }

    #[tokio::test]
    async fn test_add_to_group() {
        let idp = InMemoryIdentityProvider::new();
        idp.insert(PrincipalProfile::new("ann")).await;

        idp.add_to_group("ann", "user").await.unwrap();
        idp.add_to_group("ann", "user").await.unwrap();
        assert_eq!(idp.groups_of("ann").await.len(), 1);

        assert!(idp.add_to_group("ghost", "user").await.is_err());
    }

    #[tokio::test]
    async fn test_list_principals_pages() {
        let idp = InMemoryIdentityProvider::new().with_page_size(2);
        for name in ["a", "b", "c", "d", "e"] {
            idp.insert(PrincipalProfile::new(name)).await;
        }

        let mut seen = Vec::new();
        let mut token = None;
        let mut pages = 0;
        loop {
            let page = idp.list_principals(token).await.unwrap();
            pages += 1;
            seen.extend(page.principals.into_iter().map(|p| p.username));
            token = page.next_token;
            if token.is_none() {
                break;
            }
        }

        assert_eq!(seen, vec!["a", "b", "c", "d", "e"]);
        assert_eq!(pages, 3);
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let idp = InMemoryIdentityProvider::new();
        idp.insert(PrincipalProfile::new("ann")).await;
        idp.fail_for("ann").await;

        assert!(matches!(
            idp.get_principal("ann").await,
            Err(FolioError::Upstream(_))
        ));
    }
}
