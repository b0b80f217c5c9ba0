//! Public URLs for stored objects.

use url::Url;

use crate::{FolioError, Result};

/// Maps object keys to URLs on the content delivery domain.
#[derive(Debug, Clone)]
pub struct DeliveryResolver {
    base: String,
}

impl DeliveryResolver {
    /// Build a resolver for `domain`.
    ///
    /// A bare host gets `https://` prepended. Trailing slashes are dropped.
    /// An empty or unparseable domain is a deployment error.
    pub fn new(domain: &str) -> Result<Self> {
        let domain = domain.trim();
        if domain.is_empty() {
            return Err(FolioError::Misconfigured(
                "storage.delivery_domain is not set".to_string(),
            ));
        }

        let with_scheme = if domain.contains("://") {
            domain.to_string()
        } else {
            format!("https://{domain}")
        };
        let base = with_scheme.trim_end_matches('/').to_string();

        let parsed = Url::parse(&base).map_err(|e| {
            FolioError::Misconfigured(format!("invalid delivery domain: {e}"))
        })?;
        if parsed.host_str().is_none() {
            return Err(FolioError::Misconfigured(
                "delivery domain has no host".to_string(),
            ));
        }

        Ok(Self { base })
    }

    /// Base URL without trailing slash.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Public URL for `key`. Each path segment is percent-encoded.
    ///
    /// # Examples
    ///
    /// ```
    /// use folio::storage::DeliveryResolver;
    ///
    /// let resolver = DeliveryResolver::new("cdn.example.com/").unwrap();
    /// assert_eq!(
    ///     resolver.to_public_url("f1/beach day.jpg"),
    ///     "https://cdn.example.com/f1/beach%20day.jpg"
    /// );
    /// ```
    pub fn to_public_url(&self, key: &str) -> String {
        let encoded: Vec<_> = key
            .trim_start_matches('/')
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!("{}/{}", self.base, encoded.join("/"))
    }
}
