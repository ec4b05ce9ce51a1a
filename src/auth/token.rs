//! Bearer tokens: signed JSON Web Tokens naming the user they were issued to.

use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use time::{Duration, OffsetDateTime};

use crate::{Error, auth::UserID};

/// The contents of a JSON Web Token.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// The user the token was issued to.
    pub sub: UserID,
    /// When the token was issued, as a unix timestamp.
    pub iat: i64,
    /// When the token expires, as a unix timestamp.
    pub exp: i64,
}

/// The keys used to sign and verify tokens.
#[derive(Clone)]
pub struct JwtKeys {
    /// Signs new tokens.
    pub encoding_key: EncodingKey,
    /// Verifies tokens sent by clients.
    pub decoding_key: DecodingKey,
}

impl JwtKeys {
    /// Derive the signing keys from a `secret` string.
    ///
    /// The secret is stretched with SHA-512 so that short secrets still give
    /// a full length HMAC key.
    pub fn from_secret(secret: &str) -> Self {
        let hash = Sha512::digest(secret);

        Self {
            encoding_key: EncodingKey::from_secret(&hash),
            decoding_key: DecodingKey::from_secret(&hash),
        }
    }
}

/// Create a token for `user_id` that is valid from `issued_at` for `duration`.
///
/// # Errors
///
/// Returns [Error::TokenCreation] if the token could not be signed.
pub fn encode_token(
    user_id: UserID,
    issued_at: OffsetDateTime,
    duration: Duration,
    encoding_key: &EncodingKey,
) -> Result<String, Error> {
    let claims = Claims {
        sub: user_id,
        iat: issued_at.unix_timestamp(),
        exp: (issued_at + duration).unix_timestamp(),
    };

    encode(&Header::default(), &claims, encoding_key)
        .map_err(|error| Error::TokenCreation(error.to_string()))
}

/// Verify the signature and expiry of `token` and return its claims.
///
/// # Errors
///
/// Returns [Error::InvalidToken] if the token is malformed, was signed with
/// another key or has expired.
pub fn decode_token(token: &str, decoding_key: &DecodingKey) -> Result<Claims, Error> {
    decode::<Claims>(token, decoding_key, &Validation::default())
        .map(|token_data| token_data.claims)
        .map_err(|error| {
            tracing::debug!("Rejected bearer token: {error}");
            Error::InvalidToken
        })
}
