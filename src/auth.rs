use jsonwebtoken::{decode, DecodingKey, Validation};
#[cfg(test)]
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// HS256 keys derived from the secret shared with the auth provider.
#[derive(Clone)]
pub struct JwtKeys {
    #[cfg(test)]
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtKeys {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            #[cfg(test)]
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    /// Profile id carried in `sub`, if the token is well-formed, signed and unexpired.
    pub fn verify(&self, token: &str) -> Result<Uuid, jsonwebtoken::errors::Error> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())?;
        Uuid::parse_str(&data.claims.sub)
            .map_err(|_| jsonwebtoken::errors::ErrorKind::InvalidSubject.into())
    }

    /// Tokens are minted by the auth provider in production.
    #[cfg(test)]
    pub fn issue(&self, user_id: Uuid, ttl_secs: i64) -> String {
        let claims = Claims {
            sub: user_id.to_string(),
            exp: (chrono::Utc::now().timestamp() + ttl_secs) as usize,
        };
        encode(&Header::default(), &claims, &self.encoding).unwrap()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifies_tokens_signed_with_the_same_secret() {
        let keys = JwtKeys::new(b"secret");
        let user_id = Uuid::new_v4();

        let token = keys.issue(user_id, 60);
        assert_eq!(keys.verify(&token).unwrap(), user_id);
    }

    #[test]
    fn rejects_foreign_and_expired_tokens() {
        let keys = JwtKeys::new(b"secret");
        let other = JwtKeys::new(b"other");
        let user_id = Uuid::new_v4();

        assert!(keys.verify(&other.issue(user_id, 60)).is_err());
        assert!(keys.verify(&keys.issue(user_id, -3600)).is_err());
        assert!(keys.verify("not-a-token").is_err());
    }
}
