//! Bearer token validation against a remote JSON Web Key Set.

use async_trait::async_trait;
use jsonwebtoken::jwk::Jwk;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use ragbridge_config::AuthConfig;
use ragbridge_core::auth::{TokenValidator, bearer_token, is_blank_header};
use ragbridge_core::error::AuthError;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, warn};

/// The part of the OpenID discovery document we need.
#[derive(Debug, Deserialize)]
struct OpenIdConfiguration {
    jwks_uri: String,
}

/// Key set as published. Keys are parsed one by one so a single entry with
/// an unsupported key type does not invalidate the others.
#[derive(Debug, Deserialize)]
struct RawKeySet {
    #[serde(default)]
    keys: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Claims {
    #[serde(default)]
    iss: Option<String>,
}

struct CachedKeys {
    fetched_at: Instant,
    keys: Vec<Jwk>,
}

impl CachedKeys {
    fn find(&self, kid: &str) -> Option<&Jwk> {
        self.keys
            .iter()
            .find(|k| k.common.key_id.as_deref() == Some(kid))
    }
}

/// Validates `Authorization: Bearer <jwt>` headers against the issuer's
/// published signing keys.
pub struct JwksTokenValidator {
    openid_config_url: String,
    issuer_prefix: String,
    audience: Option<String>,
    allowed_algorithms: Vec<Algorithm>,
    allow_local_tests: bool,
    cache_ttl: Duration,
    cache: RwLock<Option<CachedKeys>>,
    client: reqwest::Client,
}

impl JwksTokenValidator {
    /// Strict validator: RS256 only, no audience, no local-test allowance,
    /// one hour key-set cache.
    pub fn new(
        openid_config_url: impl Into<String>,
        issuer_prefix: impl Into<String>,
    ) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AuthError::Discovery(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            openid_config_url: openid_config_url.into(),
            issuer_prefix: issuer_prefix.into(),
            audience: None,
            allowed_algorithms: vec![Algorithm::RS256],
            allow_local_tests: false,
            cache_ttl: Duration::from_secs(3600),
            cache: RwLock::new(None),
            client,
        })
    }

    /// Build a validator from the `[auth]` config section.
    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        let algorithms = config
            .allowed_algorithms
            .iter()
            .map(|name| {
                Algorithm::from_str(name).map_err(|_| AuthError::AlgorithmNotAllowed(name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        if config.app_id.is_none() {
            warn!("No app id configured; token audience will not be verified");
        }
        if config.local_tests_enabled() {
            warn!(
                environment = %config.environment,
                "Local test mode: requests without an Authorization header are accepted"
            );
        }

        let mut validator = Self::new(&config.openid_config_url, &config.issuer_prefix)?
            .with_algorithms(algorithms)
            .with_local_tests(config.local_tests_enabled())
            .with_cache_ttl(Duration::from_secs(config.jwks_cache_ttl_secs));
        validator.audience = config.app_id.clone();
        Ok(validator)
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    pub fn with_algorithms(mut self, algorithms: Vec<Algorithm>) -> Self {
        self.allowed_algorithms = algorithms;
        self
    }

    pub fn with_local_tests(mut self, allow: bool) -> Self {
        self.allow_local_tests = allow;
        self
    }

    /// Zero disables caching: every validation fetches discovery and keys.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Full verification of a present header. Returns the issuer on success.
    pub async fn verify(&self, auth_header: &str) -> Result<String, AuthError> {
        if is_blank_header(Some(auth_header)) {
            return Err(AuthError::MissingToken);
        }
        let token = bearer_token(Some(auth_header))
            .ok_or_else(|| AuthError::MalformedToken("expected 'Bearer <token>'".into()))?;

        let header = decode_header(token).map_err(|e| AuthError::MalformedToken(e.to_string()))?;
        if !self.allowed_algorithms.contains(&header.alg) {
            return Err(AuthError::AlgorithmNotAllowed(format!("{:?}", header.alg)));
        }

        let jwk = self.find_key(header.kid.as_deref()).await?;
        let key = DecodingKey::from_jwk(&jwk).map_err(|e| AuthError::Verification(e.to_string()))?;

        let mut validation = Validation::new(header.alg);
        match &self.audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }

        let data = decode::<Claims>(token, &key, &validation)
            .map_err(|e| AuthError::Verification(e.to_string()))?;

        match data.claims.iss {
            Some(iss) if iss.starts_with(&self.issuer_prefix) => Ok(iss),
            issuer => Err(AuthError::IssuerMismatch {
                issuer,
                expected: self.issuer_prefix.clone(),
            }),
        }
    }

    /// Find the signing key for `kid`, refetching once on a cache miss so a
    /// rotated key is picked up without waiting for the TTL.
    async fn find_key(&self, kid: Option<&str>) -> Result<Jwk, AuthError> {
        let kid = kid.ok_or(AuthError::UnknownKey(None))?;

        if !self.cache_ttl.is_zero() {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref().filter(|c| c.fetched_at.elapsed() < self.cache_ttl) {
                if let Some(jwk) = cached.find(kid) {
                    return Ok(jwk.clone());
                }
            }
        }

        let fresh = CachedKeys {
            fetched_at: Instant::now(),
            keys: self.fetch_keys().await?,
        };
        let found = fresh.find(kid).cloned();

        if !self.cache_ttl.is_zero() {
            *self.cache.write().await = Some(fresh);
        }

        found.ok_or_else(|| AuthError::UnknownKey(Some(kid.to_string())))
    }

    async fn fetch_keys(&self) -> Result<Vec<Jwk>, AuthError> {
        let discovery: OpenIdConfiguration = self
            .client
            .get(&self.openid_config_url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AuthError::Discovery(e.to_string()))?
            .json()
            .await
            .map_err(|e| AuthError::Discovery(e.to_string()))?;

        let raw: RawKeySet = self
            .client
            .get(&discovery.jwks_uri)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AuthError::KeySet(e.to_string()))?
            .json()
            .await
            .map_err(|e| AuthError::KeySet(e.to_string()))?;

        let keys: Vec<Jwk> = raw
            .keys
            .into_iter()
            .filter_map(|v| match serde_json::from_value::<Jwk>(v) {
                Ok(jwk) => Some(jwk),
                Err(e) => {
                    debug!(error = %e, "Skipping unsupported key in key set");
                    None
                }
            })
            .collect();

        debug!(jwks_uri = %discovery.jwks_uri, count = keys.len(), "Fetched signing keys");
        Ok(keys)
    }
}

#[async_trait]
impl TokenValidator for JwksTokenValidator {
    async fn validate(&self, auth_header: Option<&str>) -> bool {
        let header = match auth_header {
            Some(h) if !is_blank_header(Some(h)) => h,
            _ => {
                if self.allow_local_tests {
                    debug!("No Authorization header; allowed by local test mode");
                    return true;
                }
                warn!("Rejecting request without Authorization header");
                return false;
            }
        };

        match self.verify(header).await {
            Ok(issuer) => {
                debug!(issuer = %issuer, "Token accepted");
                true
            }
            Err(e) => {
                warn!(error = %e, "Token rejected");
                false
            }
        }
    }
}
