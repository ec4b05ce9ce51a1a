//! Authentication middleware that checks the bearer token on protected routes.

use std::sync::{Arc, Mutex};

use axum::{
    RequestPartsExt,
    extract::{FromRef, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use jsonwebtoken::DecodingKey;
use rusqlite::Connection;

use crate::{
    AppState, Error,
    auth::{UserID, decode_token, get_user_by_id},
};

/// The state needed for the auth middleware
#[derive(Clone)]
pub struct AuthState {
    /// Verifies the bearer tokens sent by clients.
    pub decoding_key: DecodingKey,
    /// The database connection, used to check the token's user still exists.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            decoding_key: state.jwt_keys.decoding_key.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Middleware function that checks for a valid bearer token.
///
/// The user ID is placed into the request and the request executed normally if the token is
/// valid and names an existing user, otherwise a 401 JSON error is returned.
///
/// **Note**: Route handlers can use the function argument `Extension(user_id): Extension<UserID>` to receive the user ID.
pub async fn auth_guard(State(state): State<AuthState>, request: Request, next: Next) -> Response {
    let (mut parts, body) = request.into_parts();

    let user_id = match authenticate(&mut parts, &state).await {
        Ok(user_id) => user_id,
        Err(error) => {
            tracing::warn!(
                "Rejected request to {} {}: {error}",
                parts.method,
                parts.uri.path()
            );
            return error.into_response();
        }
    };

    parts.extensions.insert(user_id);
    let request = Request::from_parts(parts, body);

    next.run(request).await
}

async fn authenticate(parts: &mut Parts, state: &AuthState) -> Result<UserID, Error> {
    let TypedHeader(Authorization(bearer)) = parts
        .extract::<TypedHeader<Authorization<Bearer>>>()
        .await
        .map_err(|rejection| {
            if rejection.is_missing() {
                Error::MissingToken
            } else {
                Error::InvalidToken
            }
        })?;

    let claims = decode_token(bearer.token(), &state.decoding_key)?;

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    match get_user_by_id(claims.sub, &connection) {
        Ok(user) => Ok(user.id),
        Err(Error::NotFound) => Err(Error::UnknownTokenUser),
        Err(error) => Err(error),
    }
}
