//! The route handler for registering a new user.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use jsonwebtoken::EncodingKey;
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::json;
use time::{Duration, OffsetDateTime};

use crate::{
    AppState, Error,
    auth::{
        NewUser, PasswordHash, PublicUser, ValidatedPassword, create_user, encode_token,
        normalize_email,
    },
};

/// The state needed to register users and log them in.
#[derive(Clone)]
pub struct SessionState {
    /// Signs the tokens handed out at registration and log-in.
    pub encoding_key: EncodingKey,
    /// How long new tokens are valid.
    pub token_duration: Duration,
    /// The bcrypt cost for new password hashes.
    pub password_cost: u32,
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for SessionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            encoding_key: state.jwt_keys.encoding_key.clone(),
            token_duration: state.token_duration,
            password_cost: state.password_cost,
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The data sent by the client to register a new account.
#[derive(Debug, Deserialize)]
pub struct RegisterData {
    /// The display name.
    pub name: String,
    /// The handle the user may log in with.
    pub username: String,
    /// The email the user may log in with.
    pub email: String,
    /// The raw password.
    pub password: String,
}

/// Create a new user and return a bearer token for them.
///
/// Responds with 201 and `{success, message, token, user}`.
///
/// # Errors
///
/// Returns a 400 if a field is empty, the email is invalid, the password is
/// too weak or the email/username is already taken.
pub async fn register(
    State(state): State<SessionState>,
    payload: Result<Json<RegisterData>, JsonRejection>,
) -> Response {
    let result = payload
        .map_err(Error::from)
        .and_then(|Json(data)| register_user(&state, data));

    match result {
        Ok((token, user)) => (
            StatusCode::CREATED,
            Json(json!({
                "success": true,
                "message": "User registered successfully",
                "token": token,
                "user": user,
            })),
        )
            .into_response(),
        Err(error) => error.into_response(),
    }
}

fn register_user(state: &SessionState, data: RegisterData) -> Result<(String, PublicUser), Error> {
    let name = data.name.trim();
    if name.is_empty() {
        return Err(Error::EmptyField("name"));
    }

    let username = data.username.trim();
    if username.is_empty() {
        return Err(Error::EmptyField("username"));
    }

    let email = normalize_email(&data.email)?;
    let password = ValidatedPassword::new(&data.password, &[name, username, &email])?;
    let password_hash = PasswordHash::new(&password, state.password_cost)?;

    let now = OffsetDateTime::now_utc();
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;
    let user = create_user(
        NewUser {
            name: name.to_owned(),
            username: username.to_owned(),
            email,
            password_hash,
        },
        now,
        &connection,
    )?;
    drop(connection);

    tracing::info!("Registered user {}", user.id);

    let token = encode_token(user.id, now, state.token_duration, &state.encoding_key)?;

    Ok((token, PublicUser::from(&user)))
}

#[cfg(test)]
mod register_tests {
    use axum::{Router, http::StatusCode, routing::post};
    use axum_test::TestServer;
    use serde_json::{Value, json};

    use crate::{auth::get_user_by_identifier, endpoints, test_utils::get_test_app_state};

    use super::register;

    fn get_test_server() -> TestServer {
        let app = Router::new()
            .route(endpoints::REGISTER, post(register))
            .with_state(get_test_app_state());

        TestServer::try_new(app).expect("Could not create test server.")
    }

    fn registration(username: &str, email: &str) -> Value {
        json!({
            "name": "Jordan",
            "username": username,
            "email": email,
            "password": "asomewhatlongpassword1",
        })
    }

    #[tokio::test]
    async fn register_returns_token_and_user() {
        let server = get_test_server();

        let response = server
            .post(endpoints::REGISTER)
            .json(&registration("jordan", "Jordan@Example.com"))
            .await;

        response.assert_status(StatusCode::CREATED);
        let body = response.json::<Value>();
        assert_eq!(body["success"], true);
        assert!(body["token"].as_str().is_some_and(|token| !token.is_empty()));
        assert_eq!(body["user"]["email"], "jordan@example.com");
        assert_eq!(body["user"]["username"], "jordan");
        assert!(body["user"].get("password").is_none());
    }

    #[tokio::test]
    async fn registered_user_is_stored() {
        let state = get_test_app_state();
        let app = Router::new()
            .route(endpoints::REGISTER, post(register))
            .with_state(state.clone());
        let server = TestServer::try_new(app).expect("Could not create test server.");

        let body = server
            .post(endpoints::REGISTER)
            .json(&registration("jordan", "jordan@example.com"))
            .await
            .json::<Value>();

        let stored = get_user_by_identifier("jordan", &state.db_connection.lock().unwrap())
            .expect("registered user should be stored");
        assert_eq!(body["user"]["id"], stored.id.as_i64());
        assert_eq!(stored.email, "jordan@example.com");
    }

    #[tokio::test]
    async fn duplicate_email_is_bad_request() {
        let server = get_test_server();
        server
            .post(endpoints::REGISTER)
            .json(&registration("jordan", "jordan@example.com"))
            .await
            .assert_status(StatusCode::CREATED);

        let response = server
            .post(endpoints::REGISTER)
            .json(&registration("other", "jordan@example.com"))
            .await;

        response.assert_status_bad_request();
        response.assert_json(&json!({"error": "A user already exists with this email"}));
    }

    #[tokio::test]
    async fn duplicate_username_is_bad_request() {
        let server = get_test_server();
        server
            .post(endpoints::REGISTER)
            .json(&registration("jordan", "jordan@example.com"))
            .await
            .assert_status(StatusCode::CREATED);

        let response = server
            .post(endpoints::REGISTER)
            .json(&registration("jordan", "other@example.com"))
            .await;

        response.assert_status_bad_request();
        response.assert_json(&json!({"error": "A user already exists with this username"}));
    }

    #[tokio::test]
    async fn weak_password_is_bad_request() {
        let server = get_test_server();

        server
            .post(endpoints::REGISTER)
            .json(&json!({
                "name": "Jordan",
                "username": "jordan",
                "email": "jordan@example.com",
                "password": "password",
            }))
            .await
            .assert_status_bad_request();
    }

    #[tokio::test]
    async fn empty_name_is_bad_request() {
        let server = get_test_server();

        server
            .post(endpoints::REGISTER)
            .json(&json!({
                "name": "  ",
                "username": "jordan",
                "email": "jordan@example.com",
                "password": "asomewhatlongpassword1",
            }))
            .await
            .assert_status_bad_request();
    }
}
