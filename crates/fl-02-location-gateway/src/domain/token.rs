//! Producer token validation.
//!
//! HS256 signature, issuer, audience and expiry are checked with zero clock
//! skew, then the configured subject claim must equal the subject the
//! connection claims to be. Every failure collapses to [`Unauthorized`];
//! which check failed is only visible in `debug` logs.

use crate::domain::config::TokenConfig;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde_json::{Map, Value};
use shared_types::SubjectId;
use thiserror::Error;
use tracing::debug;

/// Uniform token rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unauthorized")]
pub struct Unauthorized;

pub struct TokenValidator {
    key: DecodingKey,
    validation: Validation,
    subject_claim: String,
}

impl TokenValidator {
    pub fn new(config: &TokenConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.set_audience(&[config.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);

        Self {
            key: DecodingKey::from_secret(config.signing_key.as_bytes()),
            validation,
            subject_claim: config.subject_claim.clone(),
        }
    }

    /// Verify `token` and require its subject claim to equal `expected`.
    pub fn validate(&self, token: &str, expected: &SubjectId) -> Result<SubjectId, Unauthorized> {
        let data = decode::<Map<String, Value>>(token, &self.key, &self.validation).map_err(|e| {
            debug!(subject_id = %expected, error = %e, "Token verification failed");
            Unauthorized
        })?;

        let subject = match data.claims.get(&self.subject_claim) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) if n.is_i64() || n.is_u64() => n.to_string(),
            _ => {
                debug!(subject_id = %expected, claim = %self.subject_claim, "Token missing subject claim");
                return Err(Unauthorized);
            }
        };

        if subject != expected.as_str() {
            debug!(subject_id = %expected, "Token subject mismatch");
            return Err(Unauthorized);
        }

        Ok(expected.clone())
    }
}
