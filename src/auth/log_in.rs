//! The route handlers for logging in and out.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use time::OffsetDateTime;

use crate::{
    Error,
    auth::{PublicUser, SessionState, encode_token, get_user_by_identifier},
};

/// The credentials sent by the client to log in.
#[derive(Debug, Deserialize)]
pub struct LogInData {
    /// The user's email or username.
    pub identifier: Option<String>,
    /// The raw password.
    pub password: Option<String>,
}

/// Check the user's credentials and return a new bearer token.
///
/// # Errors
///
/// Returns a 400 if the identifier or password is missing and a 401 if they
/// do not match a user.
pub async fn log_in(
    State(state): State<SessionState>,
    payload: Result<Json<LogInData>, JsonRejection>,
) -> Response {
    let result = payload
        .map_err(Error::from)
        .and_then(|Json(data)| check_credentials(&state, data));

    match result {
        Ok((token, user)) => Json(json!({
            "success": true,
            "message": "Login successful",
            "token": token,
            "user": user,
        }))
        .into_response(),
        Err(error) => error.into_response(),
    }
}

fn check_credentials(state: &SessionState, data: LogInData) -> Result<(String, PublicUser), Error> {
    let (identifier, password) = match (data.identifier, data.password) {
        (Some(identifier), Some(password))
            if !identifier.trim().is_empty() && !password.is_empty() =>
        {
            (identifier, password)
        }
        _ => return Err(Error::MissingCredentials),
    };

    let user = {
        let connection = state
            .db_connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;

        match get_user_by_identifier(&identifier, &connection) {
            Ok(user) => user,
            Err(Error::NotFound) => return Err(Error::InvalidCredentials),
            Err(error) => return Err(error),
        }
    };

    if !user.password_hash.verify(&password)? {
        tracing::info!("Failed log-in attempt for user {}", user.id);
        return Err(Error::InvalidCredentials);
    }

    let token = encode_token(
        user.id,
        OffsetDateTime::now_utc(),
        state.token_duration,
        &state.encoding_key,
    )?;

    Ok((token, PublicUser::from(&user)))
}

/// Acknowledge a log-out.
///
/// Tokens are stateless, so the client logs out by discarding its token.
pub async fn log_out() -> Response {
    Json(json!({
        "success": true,
        "message": "Logged out successfully",
    }))
    .into_response()
}
