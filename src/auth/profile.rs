//! Route handlers for the current user's profile and preferences.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State, rejection::JsonRejection},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::json;

use crate::{
    AppState, Error,
    auth::{PublicUser, UserID, get_user_by_id, user::update_preferences},
};

/// The state needed to read and update the current user.
#[derive(Debug, Clone)]
pub struct ProfileState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ProfileState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Return the logged-in user.
pub async fn get_me(
    State(state): State<ProfileState>,
    Extension(user_id): Extension<UserID>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(_) => return Error::DatabaseLockError.into_response(),
    };

    match get_user_by_id(user_id, &connection) {
        Ok(user) => Json(json!({
            "success": true,
            "user": PublicUser::from(&user),
        }))
        .into_response(),
        Err(error) => error.into_response(),
    }
}

/// Return the logged-in user's preferences.
pub async fn get_preferences(
    State(state): State<ProfileState>,
    Extension(user_id): Extension<UserID>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(_) => return Error::DatabaseLockError.into_response(),
    };

    match get_user_by_id(user_id, &connection) {
        Ok(user) => Json(json!({
            "success": true,
            "preferences": user.preferences,
        }))
        .into_response(),
        Err(error) => error.into_response(),
    }
}

/// The preferences a client may change. Omitted fields keep their value.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesUpdate {
    /// The new default currency code.
    pub default_currency: Option<String>,
    /// Whether to enable notifications.
    pub enable_notifications: Option<bool>,
}

/// Update the logged-in user's preferences and return the result.
///
/// # Errors
///
/// Returns a 400 if the currency is empty.
pub async fn put_preferences(
    State(state): State<ProfileState>,
    Extension(user_id): Extension<UserID>,
    payload: Result<Json<PreferencesUpdate>, JsonRejection>,
) -> Response {
    let Json(update) = match payload {
        Ok(update) => update,
        Err(rejection) => return Error::from(rejection).into_response(),
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(_) => return Error::DatabaseLockError.into_response(),
    };

    let result = get_user_by_id(user_id, &connection).and_then(|user| {
        let mut preferences = user.preferences;

        if let Some(currency) = update.default_currency {
            let currency = currency.trim().to_uppercase();
            if currency.is_empty() {
                return Err(Error::EmptyField("defaultCurrency"));
            }
            preferences.default_currency = currency;
        }

        if let Some(enable_notifications) = update.enable_notifications {
            preferences.enable_notifications = enable_notifications;
        }

        update_preferences(user_id, &preferences, &connection)?;

        Ok(preferences)
    });

    match result {
        Ok(preferences) => Json(json!({
            "success": true,
            "preferences": preferences,
        }))
        .into_response(),
        Err(error) => error.into_response(),
    }
}
