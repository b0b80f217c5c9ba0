//! Principal claims extraction.
//!
//! Identity arrives either as an authoriser context (a JSON object the
//! gateway attaches to the request) or as a bearer JWT. Both are normalized
//! here into [`PrincipalClaims`], so nothing downstream branches on the
//! payload shape.

use std::collections::BTreeSet;

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde_json::{Map, Value};
use tracing::debug;

use crate::{FolioError, Result};

/// Claim carrying the principal's groups.
pub const GROUPS_CLAIM: &str = "cognito:groups";
/// Claim carrying the legacy home folder.
pub const HOME_FOLDER_CLAIM: &str = "custom:folderId";
/// Username claims, in lookup order.
const USERNAME_CLAIMS: [&str; 3] = ["cognito:username", "username", "sub"];

/// Authenticated principal, derived per request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PrincipalClaims {
    pub username: String,
    pub groups: BTreeSet<String>,
    pub home_folder_id: Option<String>,
}

impl PrincipalClaims {
    /// Claims for `username` with no groups and no home folder.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            ..Default::default()
        }
    }

    /// Add a group.
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.insert(group.into());
        self
    }

    /// Set the home folder attribute.
    pub fn with_home_folder(mut self, folder_id: impl Into<String>) -> Self {
        self.home_folder_id = Some(folder_id.into());
        self
    }

    /// Exact group membership test.
    pub fn is_in_group(&self, group: &str) -> bool {
        self.groups.contains(group)
    }

    pub fn is_admin(&self, admin_group: &str) -> bool {
        self.is_in_group(admin_group)
    }
}

/// Normalizes identity payloads into [`PrincipalClaims`].
#[derive(Clone)]
pub struct ClaimsReader {
    decoding_key: Option<DecodingKey>,
    validation: Validation,
}

impl ClaimsReader {
    /// Create a reader verifying HS256 bearer tokens with `jwt_secret`.
    ///
    /// An empty secret disables bearer tokens; authoriser contexts still work.
    pub fn new(jwt_secret: &str) -> Self {
        let decoding_key =
            (!jwt_secret.is_empty()).then(|| DecodingKey::from_secret(jwt_secret.as_bytes()));
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        Self {
            decoding_key,
            validation,
        }
    }

    /// Read claims from an authoriser context.
    ///
    /// Accepts `{"claims": {..}}`, `{"jwt": {"claims": {..}}}` or a flat
    /// claim object.
    pub fn from_authorizer(context: &Value) -> Result<PrincipalClaims> {
        let bag = claim_bag(context).ok_or(FolioError::Unauthorized)?;
        normalize(bag)
    }

    /// Verify a bearer token and read its claims.
    ///
    /// A leading `Bearer ` is stripped if present.
    pub fn from_bearer_token(&self, token: &str) -> Result<PrincipalClaims> {
        let key = self
            .decoding_key
            .as_ref()
            .ok_or_else(|| FolioError::Misconfigured("identity.jwt_secret is not set".into()))?;

        let token = token.trim();
        let token = token.strip_prefix("Bearer ").unwrap_or(token).trim();
        if token.is_empty() {
            return Err(FolioError::Unauthorized);
        }

        let data = decode::<Map<String, Value>>(token, key, &self.validation).map_err(|e| {
            debug!("JWT validation failed: {}", e);
            FolioError::Unauthorized
        })?;

        normalize(&data.claims)
    }
}

fn claim_bag(context: &Value) -> Option<&Map<String, Value>> {
    if let Some(claims) = context.pointer("/jwt/claims").and_then(Value::as_object) {
        return Some(claims);
    }
    if let Some(claims) = context.get("claims").and_then(Value::as_object) {
        return Some(claims);
    }
    let flat = context.as_object()?;
    // A bare wrapper with no claims inside is not a claim bag
    if flat.contains_key("claims") || flat.contains_key("jwt") {
        return None;
    }
    Some(flat)
}

fn normalize(bag: &Map<String, Value>) -> Result<PrincipalClaims> {
    let username = USERNAME_CLAIMS
        .iter()
        .filter_map(|claim| bag.get(*claim).and_then(Value::as_str))
        .map(str::trim)
        .find(|name| !name.is_empty())
        .ok_or(FolioError::Unauthorized)?;

    let home_folder_id = bag
        .get(HOME_FOLDER_CLAIM)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|folder| !folder.is_empty())
        .map(str::to_string);

    Ok(PrincipalClaims {
        username: username.to_string(),
        groups: bag.get(GROUPS_CLAIM).map(parse_groups).unwrap_or_default(),
        home_folder_id,
    })
}

/// Parse a groups claim: a JSON array, a comma or whitespace separated
/// string, or a bracketed string such as `"[admin user]"`.
pub fn parse_groups(value: &Value) -> BTreeSet<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .flat_map(split_groups)
            .collect(),
        Value::String(raw) => split_groups(raw).collect(),
        _ => BTreeSet::new(),
    }
}

fn split_groups(raw: &str) -> impl Iterator<Item = String> + '_ {
    let raw = raw.trim();
    let raw = raw.strip_prefix('[').unwrap_or(raw);
    let raw = raw.strip_suffix(']').unwrap_or(raw);
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .map(|group| group.trim_matches('"'))
        .filter(|group| !group.is_empty())
        .map(str::to_string)
}
