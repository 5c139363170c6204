use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Bearer-token payload. `sub` carries the user id as a string so the
/// token stays readable with standard JWT tooling.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user_id: i64, email: String, expiration_hours: i64) -> Self {
        let issued = Utc::now();
        let expires = issued + Duration::hours(expiration_hours);
        Claims {
            sub: user_id.to_string(),
            email,
            exp: expires.timestamp(),
            iat: issued.timestamp(),
        }
    }

    /// The user id the token was issued for, or None if the subject
    /// is not a numeric id.
    pub fn user_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}

pub fn create_token(claims: &Claims, secret: &str) -> Result<String, anyhow::Error> {
    let key = EncodingKey::from_secret(secret.as_bytes());
    Ok(encode(&Header::default(), claims, &key)?)
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, anyhow::Error> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let data = decode::<Claims>(token, &key, &Validation::default())?;
    Ok(data.claims)
}
