//! Test helpers for integration tests.
//!
//! Builds a [`Gallery`] over an in-memory database, identity provider and
//! object store, with a manual clock.

#![allow(dead_code)]

use std::sync::Arc;

use folio::{
    Config, Database, Gallery, IdentityProvider, InMemoryIdentityProvider, InMemoryObjectStore,
    ManualClock, PrincipalClaims, PrincipalProfile,
};

/// 2024-05-01T10:00:00Z
pub const T0: i64 = 1_714_557_600;

pub const DELIVERY_DOMAIN: &str = "photos.example.com";

/// A gallery plus handles on its in-memory collaborators.
pub struct TestGallery {
    pub gallery: Gallery,
    pub identity: Arc<InMemoryIdentityProvider>,
    pub store: Arc<InMemoryObjectStore>,
    pub clock: Arc<ManualClock>,
}

/// Create a test configuration.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.storage.delivery_domain = DELIVERY_DOMAIN.to_string();
    config.database.page_size = 3;
    config
}

impl TestGallery {
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(config: Config) -> Self {
        Self::build(config, InMemoryIdentityProvider::new(), InMemoryObjectStore::new()).await
    }

    pub async fn build(
        config: Config,
        identity: InMemoryIdentityProvider,
        store: InMemoryObjectStore,
    ) -> Self {
        let db = Database::open_in_memory()
            .await
            .expect("Failed to create test database");
        let identity = Arc::new(identity);
        let store = Arc::new(store);
        let clock = Arc::new(ManualClock::new(T0));

        let gallery = Gallery::new(config, db, identity.clone(), store.clone())
            .expect("Failed to create gallery")
            .with_clock(clock.clone());

        Self {
            gallery,
            identity,
            store,
            clock,
        }
    }

    /// Register a principal with the identity provider.
    pub async fn add_principal(&self, username: &str, home_folder: Option<&str>) {
        let mut profile =
            PrincipalProfile::new(username).with_email(format!("{username}@example.com"));
        profile.home_folder_id = home_folder.map(str::to_string);
        self.identity.insert(profile).await;
    }

    /// Current profile of a registered principal.
    pub async fn profile(&self, username: &str) -> PrincipalProfile {
        self.identity
            .get_principal(username)
            .await
            .expect("identity lookup failed")
            .expect("principal not registered")
    }

    /// Create a folder as the operator.
    pub async fn create_folder(&self, folder_id: &str) {
        self.gallery
            .create_folder(&admin(), folder_id, None)
            .await
            .expect("Failed to create folder");
    }

    /// Store `count` non-empty photos directly under `folder_id`.
    pub async fn seed_photos(&self, folder_id: &str, count: usize) -> Vec<String> {
        let mut keys = Vec::with_capacity(count);
        for i in 0..count {
            let key = format!("{folder_id}/photo-{i:04}.jpg");
            self.store.insert_sized(&key, 128).await;
            keys.push(key);
        }
        keys
    }
}

/// Operator claims.
pub fn admin() -> PrincipalClaims {
    PrincipalClaims::new("photographer").with_group("admin")
}

/// Client claims with no home folder.
pub fn client(username: &str) -> PrincipalClaims {
    PrincipalClaims::new(username).with_group("user")
}
