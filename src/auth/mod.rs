//! Token authentication for every RPC.
//!
//! Each request carries a bearer token, either in its `token` field or in the
//! `authorization` metadata. The gate only checks that the configured verifier
//! accepts it; claims are not inspected further.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use jsonwebtoken::jwk::{AlgorithmParameters, JwkSet};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use subtle::ConstantTimeEq;
use tonic::metadata::MetadataMap;

use crate::config::{AuthConfig, JwksSource};
use crate::errors::{AppError, AppResult};

/// Metadata key checked when the request's `token` field is empty.
pub const AUTHORIZATION_METADATA: &str = "authorization";

/// Verifies a caller-supplied bearer token.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> AppResult<()>;
}

/// Accepts every token. Used by tests and when no verifier is configured.
#[derive(Debug, Clone, Default)]
pub struct AcceptAll;

#[async_trait]
impl TokenVerifier for AcceptAll {
    async fn verify(&self, _token: &str) -> AppResult<()> {
        Ok(())
    }
}

/// Pre-shared service token, compared in constant time.
#[derive(Clone)]
pub struct StaticTokenVerifier {
    expected: String,
}

impl StaticTokenVerifier {
    pub fn new(expected: impl Into<String>) -> Self {
        Self {
            expected: expected.into(),
        }
    }
}

#[async_trait]
impl TokenVerifier for StaticTokenVerifier {
    async fn verify(&self, token: &str) -> AppResult<()> {
        if constant_time_compare(token, &self.expected) {
            Ok(())
        } else {
            Err(AppError::Unauthenticated("invalid token".to_string()))
        }
    }
}

/// Only read for logging. Signature, `exp`, `iss` and `aud` are checked by
/// the decoder; nothing else is required of the token.
#[derive(Debug, Default, Deserialize)]
struct Claims {
    #[serde(default)]
    sub: Option<String>,
}

fn validation_for(algorithm: Algorithm, issuer: Option<&str>, audience: Option<&str>) -> Validation {
    let mut validation = Validation::new(algorithm);
    if let Some(issuer) = issuer {
        validation.set_issuer(&[issuer]);
    }
    match audience {
        Some(audience) => validation.set_audience(&[audience]),
        None => validation.validate_aud = false,
    }
    validation
}

fn decode_token(token: &str, key: &DecodingKey, validation: &Validation) -> AppResult<()> {
    jsonwebtoken::decode::<Claims>(token, key, validation)
        .map(|data| tracing::debug!(subject = ?data.claims.sub, "Token verified"))
        .map_err(|e| AppError::Unauthenticated(format!("invalid token: {}", e)))
}

/// HS256 JWT verification with optional issuer and audience checks.
#[derive(Clone)]
pub struct JwtVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str, issuer: Option<&str>, audience: Option<&str>) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: validation_for(Algorithm::HS256, issuer, audience),
        }
    }
}

#[async_trait]
impl TokenVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> AppResult<()> {
        decode_token(token, &self.decoding_key, &self.validation)
    }
}

struct SigningKey {
    key: DecodingKey,
    algorithms: &'static [Algorithm],
}

/// Asymmetric JWT verification against a JSON Web Key Set.
///
/// The set is loaded once at startup and cached. A token selects its key by
/// `kid`; a token without one is only accepted when the set holds a single
/// key. Symmetric (`oct`) keys in the set are ignored.
pub struct JwksVerifier {
    keys: HashMap<String, SigningKey>,
    validation: Validation,
}

impl JwksVerifier {
    /// Load the key set from a file or URL.
    pub async fn load(
        source: &JwksSource,
        issuer: Option<&str>,
        audience: Option<&str>,
    ) -> AppResult<Self> {
        let set: JwkSet = match source {
            JwksSource::Path(path) => {
                let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
                    AppError::Config(format!("failed to read JWKS {}: {}", path.display(), e))
                })?;
                serde_json::from_str(&raw).map_err(|e| {
                    AppError::Config(format!("invalid JWKS {}: {}", path.display(), e))
                })?
            }
            JwksSource::Url(url) => fetch_jwks(url).await?,
        };

        Self::from_jwk_set(&set, issuer, audience)
    }

    pub fn from_jwk_set(
        set: &JwkSet,
        issuer: Option<&str>,
        audience: Option<&str>,
    ) -> AppResult<Self> {
        let mut keys = HashMap::new();
        for jwk in &set.keys {
            let Some(algorithms) = signing_algorithms(&jwk.algorithm) else {
                tracing::warn!(kid = ?jwk.common.key_id, "Ignoring symmetric key in JWKS");
                continue;
            };
            let key = DecodingKey::from_jwk(jwk)
                .map_err(|e| AppError::Config(format!("invalid JWK: {}", e)))?;
            keys.insert(
                jwk.common.key_id.clone().unwrap_or_default(),
                SigningKey { key, algorithms },
            );
        }

        if keys.is_empty() {
            return Err(AppError::Config(
                "JWKS contains no usable signing keys".to_string(),
            ));
        }
        tracing::debug!("Loaded {} signing keys", keys.len());

        Ok(Self {
            keys,
            validation: validation_for(Algorithm::RS256, issuer, audience),
        })
    }

    fn key_for(&self, kid: Option<&str>) -> Option<&SigningKey> {
        match kid {
            Some(kid) => self.keys.get(kid),
            None if self.keys.len() == 1 => self.keys.values().next(),
            None => None,
        }
    }
}

#[async_trait]
impl TokenVerifier for JwksVerifier {
    async fn verify(&self, token: &str) -> AppResult<()> {
        let header = jsonwebtoken::decode_header(token)
            .map_err(|e| AppError::Unauthenticated(format!("invalid token: {}", e)))?;

        let signing = self
            .key_for(header.kid.as_deref())
            .ok_or_else(|| AppError::Unauthenticated("unknown signing key".to_string()))?;
        if !signing.algorithms.contains(&header.alg) {
            return Err(AppError::Unauthenticated(format!(
                "algorithm {:?} not allowed for this key",
                header.alg
            )));
        }

        let mut validation = self.validation.clone();
        validation.algorithms = vec![header.alg];
        decode_token(token, &signing.key, &validation)
    }
}

const RSA_ALGORITHMS: &[Algorithm] = &[
    Algorithm::RS256,
    Algorithm::RS384,
    Algorithm::RS512,
    Algorithm::PS256,
    Algorithm::PS384,
    Algorithm::PS512,
];
const EC_ALGORITHMS: &[Algorithm] = &[Algorithm::ES256, Algorithm::ES384];
const OKP_ALGORITHMS: &[Algorithm] = &[Algorithm::EdDSA];

/// Algorithms a key of this type may sign with. `None` for symmetric keys.
fn signing_algorithms(params: &AlgorithmParameters) -> Option<&'static [Algorithm]> {
    match params {
        AlgorithmParameters::RSA(_) => Some(RSA_ALGORITHMS),
        AlgorithmParameters::EllipticCurve(_) => Some(EC_ALGORITHMS),
        AlgorithmParameters::OctetKeyPair(_) => Some(OKP_ALGORITHMS),
        _ => None,
    }
}

async fn fetch_jwks(url: &str) -> AppResult<JwkSet> {
    let response = reqwest::get(url)
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| AppError::Config(format!("failed to fetch JWKS from {}: {}", url, e)))?;

    response
        .json::<JwkSet>()
        .await
        .map_err(|e| AppError::Config(format!("invalid JWKS from {}: {}", url, e)))
}

/// The check run at the entry of every RPC.
#[derive(Clone)]
pub struct AuthGate {
    verifier: Arc<dyn TokenVerifier>,
}

impl AuthGate {
    pub fn new(verifier: Arc<dyn TokenVerifier>) -> Self {
        Self { verifier }
    }

    /// Gate that accepts any non-empty token.
    pub fn accept_all() -> Self {
        Self::new(Arc::new(AcceptAll))
    }

    /// Build the gate from configuration.
    ///
    /// Precedence is JWKS, then JWT secret, then static token. With none
    /// configured every non-empty token is accepted.
    pub async fn from_config(config: &AuthConfig) -> AppResult<Self> {
        if let Some(source) = &config.jwks {
            tracing::info!("Verifying bearer tokens against JWKS {}", source);
            let verifier = JwksVerifier::load(
                source,
                config.issuer.as_deref(),
                config.audience.as_deref(),
            )
            .await?;
            return Ok(Self::new(Arc::new(verifier)));
        }

        if let Some(secret) = &config.jwt_secret {
            tracing::info!("Verifying bearer tokens as HS256 JWTs");
            return Ok(Self::new(Arc::new(JwtVerifier::new(
                secret,
                config.issuer.as_deref(),
                config.audience.as_deref(),
            ))));
        }

        if let Some(token) = &config.static_token {
            tracing::info!("Verifying bearer tokens against AUTH_TOKEN");
            return Ok(Self::new(Arc::new(StaticTokenVerifier::new(token.clone()))));
        }

        tracing::warn!(
            "No token verifier configured (AUTH_JWKS_URL / AUTH_JWKS_PATH / AUTH_JWT_SECRET / AUTH_TOKEN). Any non-empty token is accepted!"
        );
        Ok(Self::accept_all())
    }

    /// Verify the request's token, falling back to the `authorization` metadata.
    pub async fn check(&self, metadata: &MetadataMap, token: &str) -> AppResult<()> {
        let token = if token.is_empty() {
            bearer_from_metadata(metadata).unwrap_or_default()
        } else {
            token
        };

        if token.is_empty() {
            return Err(AppError::Unauthenticated("missing token".to_string()));
        }

        self.verifier.verify(token).await
    }
}

/// The scheme name is case-insensitive.
fn bearer_from_metadata(metadata: &MetadataMap) -> Option<&str> {
    let value = metadata.get(AUTHORIZATION_METADATA)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| token.trim())
}

/// Perform constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
