use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use pitboss_core::types::{ActorType, Timestamp};

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token encoding failed: {0}")]
    Encode(jsonwebtoken::errors::Error),
    #[error("token is malformed or expired")]
    Invalid,
}

/// Claims carried by the signed, time-limited access-token bearer. `sub` is
/// the actor id; `typ` is the wire form of `ActorType` so a decoded token is
/// self-describing without a second lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: String,
    pub typ: String,
    pub exp: i64,
    pub iat: i64,
}

impl AccessClaims {
    pub fn actor_type(&self) -> ActorType {
        ActorType::from_wire(&self.typ)
    }
}

/// Signs and verifies access-token bearers. Holds the symmetric signing
/// secret; the node binary constructs one from its configuration at startup.
pub struct AccessTokenSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl AccessTokenSigner {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        }
    }

    pub fn mint(
        &self,
        actor_id: &str,
        actor_type: ActorType,
        now: Timestamp,
        ttl_minutes: i64,
    ) -> Result<String, TokenError> {
        let claims = AccessClaims {
            sub: actor_id.to_string(),
            typ: actor_type.as_wire().to_string(),
            iat: now.timestamp(),
            exp: now.timestamp() + ttl_minutes * 60,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(TokenError::Encode)
    }

    pub fn verify(&self, token: &str) -> Result<AccessClaims, TokenError> {
        let data = decode::<AccessClaims>(token, &self.decoding_key, &Validation::new(Algorithm::HS256))
            .map_err(|_| TokenError::Invalid)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn signer() -> AccessTokenSigner {
        AccessTokenSigner::new(b"test-secret-key-not-for-prod")
    }

    #[test]
    fn mints_and_verifies_a_token() {
        let s = signer();
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let token = s.mint("player-1", ActorType::Player, now, 15).unwrap();
        let claims = s.verify(&token).unwrap();
        assert_eq!(claims.sub, "player-1");
        assert_eq!(claims.actor_type(), ActorType::Player);
    }

    #[test]
    fn rejects_a_token_signed_with_a_different_secret() {
        let s1 = signer();
        let s2 = AccessTokenSigner::new(b"a-completely-different-secret");
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let token = s1.mint("player-1", ActorType::Player, now, 15).unwrap();
        assert!(s2.verify(&token).is_err());
    }
}
