use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use crate::{error::TokenError, types::Claims};

/// Issues and checks HS256 bearer tokens. The secret only lives on in the
/// derived keys.
#[derive(Clone)]
pub struct TokenIssuer {
    issuer: String,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        }
    }

    pub fn issue(
        &self,
        username: &str,
        ttl: Duration,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let iat = now_secs();

        let claims = Claims {
            sub: username.to_owned(),
            iat,
            exp: iat.saturating_add(ttl.as_secs()),
            iss: self.issuer.clone(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, now_secs())
    }

    pub fn remaining_minutes(&self, claims: &Claims) -> u64 {
        remaining_minutes_at(claims, now_secs())
    }

    fn verify_at(&self, token: &str, now: u64) -> Result<Claims, TokenError> {
        // jsonwebtoken treats `exp == now` as still valid; expiry is checked
        // here instead so a token is only good while `now < exp`.
        let mut validation = Validation::default();
        validation.leeway = 0;
        validation.validate_exp = false;
        validation.set_issuer(&[&self.issuer]);

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)?.claims;

        if now >= claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}

pub(crate) fn remaining_minutes_at(claims: &Claims, now: u64) -> u64 {
    claims.exp.saturating_sub(now) / 60
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}
