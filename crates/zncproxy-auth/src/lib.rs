//! Auth Port (C10): validates the bearer JWT presented on management
//! endpoints and extracts the authenticated principal (spec.md §4.10).
//!
//! This port never issues tokens; login/issuance is an external
//! collaborator. Grounded on
//! `examples/other_examples/manifests/cypher-asi-z-billing/Cargo.toml`'s
//! use of `jsonwebtoken` — no teacher crate validates JWTs, since chronx
//! authenticates its own transactions with Dilithium signatures, so this
//! is pack enrichment rather than an adaptation of teacher code.

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use zncproxy_core::error::ZncProxyError;

/// The JWT's registered and private claims. `sub` carries the user id;
/// `elevated` feeds the Rate Limiter's admin bypass (spec.md §4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub elevated: bool,
    pub exp: i64,
}

#[derive(Debug, Clone, Copy)]
pub struct Principal {
    pub user_id: Uuid,
    pub is_elevated: bool,
}

#[derive(Clone)]
pub struct AuthPort {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl AuthPort {
    pub fn new(signing_secret: &str) -> Self {
        let mut validation = Validation::new(jsonwebtoken::Algorithm::HS256);
        validation.validate_exp = true;
        Self {
            decoding_key: DecodingKey::from_secret(signing_secret.as_bytes()),
            validation,
        }
    }

    /// Verifies `token` and returns the authenticated principal. Any
    /// signature, expiry, or structural failure collapses to
    /// `Unauthorized` (spec.md §4.10) — callers never need to distinguish
    /// the JWT-library failure mode from "no token presented".
    pub fn authenticate(&self, token: &str) -> Result<Principal, ZncProxyError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|_| ZncProxyError::Unauthorized)?;
        Ok(Principal {
            user_id: data.claims.sub,
            is_elevated: data.claims.elevated,
        })
    }
}

pub fn expiry_from_now(now: DateTime<Utc>, ttl: chrono::Duration) -> i64 {
    (now + ttl).timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn token_for(secret: &str, claims: &Claims) -> String {
        encode(&Header::default(), claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    #[test]
    fn valid_token_yields_principal() {
        let secret = "test-secret";
        let auth = AuthPort::new(secret);
        let claims = Claims {
            sub: Uuid::new_v4(),
            elevated: true,
            exp: expiry_from_now(Utc::now(), chrono::Duration::hours(1)),
        };
        let token = token_for(secret, &claims);
        let principal = auth.authenticate(&token).unwrap();
        assert_eq!(principal.user_id, claims.sub);
        assert!(principal.is_elevated);
    }

    #[test]
    fn expired_token_is_unauthorized() {
        let secret = "test-secret";
        let auth = AuthPort::new(secret);
        let claims = Claims {
            sub: Uuid::new_v4(),
            elevated: false,
            exp: expiry_from_now(Utc::now(), chrono::Duration::hours(-1)),
        };
        let token = token_for(secret, &claims);
        assert!(matches!(
            auth.authenticate(&token),
            Err(ZncProxyError::Unauthorized)
        ));
    }

    #[test]
    fn wrong_secret_is_unauthorized() {
        let auth = AuthPort::new("right-secret");
        let claims = Claims {
            sub: Uuid::new_v4(),
            elevated: false,
            exp: expiry_from_now(Utc::now(), chrono::Duration::hours(1)),
        };
        let token = token_for("wrong-secret", &claims);
        assert!(matches!(
            auth.authenticate(&token),
            Err(ZncProxyError::Unauthorized)
        ));
    }
}
