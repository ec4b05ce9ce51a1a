#![allow(missing_docs)]

use rusqlite::Connection;
use time::OffsetDateTime;

use crate::{
    AppState, RecurringDeletion,
    auth::{NewUser, PasswordHash, UserID, ValidatedPassword, create_user, encode_token},
};

/// The password every test user is registered with.
pub(crate) const TEST_PASSWORD: &str = "roostersgocockledoodledoo";

/// An app state backed by an in-memory database, with a bcrypt cost low
/// enough to keep tests fast.
pub(crate) fn get_test_app_state() -> AppState {
    get_test_app_state_with_policy(RecurringDeletion::Delete)
}

pub(crate) fn get_test_app_state_with_policy(policy: RecurringDeletion) -> AppState {
    let connection =
        Connection::open_in_memory().expect("Could not open in-memory SQLite database");

    AppState::new(connection, "foobar", "Etc/UTC", policy)
        .expect("Could not create app state")
        .with_password_cost(4)
}

/// Insert a user named `username` and return their ID and a valid bearer token.
///
/// The user's email is `<username>@example.com` and their password is [TEST_PASSWORD].
#[track_caller]
pub(crate) fn register_test_user(state: &AppState, username: &str) -> (UserID, String) {
    let password_hash = PasswordHash::new(
        &ValidatedPassword::new_unchecked(TEST_PASSWORD),
        state.password_cost,
    )
    .expect("Could not hash password");
    let now = OffsetDateTime::now_utc();

    let user = create_user(
        NewUser {
            name: username.to_owned(),
            username: username.to_owned(),
            email: format!("{username}@example.com"),
            password_hash,
        },
        now,
        &state.db_connection.lock().unwrap(),
    )
    .expect("Could not create test user");

    let token = encode_token(
        user.id,
        now,
        state.token_duration,
        &state.jwt_keys.encoding_key,
    )
    .expect("Could not create token");

    (user.id, token)
}
