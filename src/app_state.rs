//! Implements a struct that holds the state of the REST server.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use time::Duration;

use crate::{
    Error,
    auth::{JwtKeys, PasswordHash},
    db::initialize,
    recurring::RecurringDeletion,
    timezone::get_local_offset,
};

/// How long a bearer token stays valid after log-in.
pub const DEFAULT_TOKEN_DURATION: Duration = Duration::days(30);

/// The state of the REST server.
#[derive(Clone)]
pub struct AppState {
    /// The keys for signing and verifying bearer tokens.
    pub jwt_keys: JwtKeys,

    /// The duration for which bearer tokens are valid.
    pub token_duration: Duration,

    /// The bcrypt cost used when hashing new passwords.
    pub password_cost: u32,

    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,

    /// What deleting a recurring expense does.
    pub recurring_deletion: RecurringDeletion,

    /// The database connection
    pub db_connection: Arc<Mutex<Connection>>,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for the domain models.
    /// `local_timezone` should be a valid, canonical timezone name, e.g. "Pacific/Auckland".
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized or the timezone is not known.
    pub fn new(
        db_connection: Connection,
        jwt_secret: &str,
        local_timezone: &str,
        recurring_deletion: RecurringDeletion,
    ) -> Result<Self, Error> {
        if get_local_offset(local_timezone).is_none() {
            return Err(Error::InvalidTimezoneError(local_timezone.to_owned()));
        }

        initialize(&db_connection)?;

        Ok(Self {
            jwt_keys: JwtKeys::from_secret(jwt_secret),
            token_duration: DEFAULT_TOKEN_DURATION,
            password_cost: PasswordHash::DEFAULT_COST,
            local_timezone: local_timezone.to_owned(),
            recurring_deletion,
            db_connection: Arc::new(Mutex::new(db_connection)),
        })
    }

    /// Set how long bearer tokens stay valid.
    pub fn with_token_duration(mut self, token_duration: Duration) -> Self {
        self.token_duration = token_duration;
        self
    }

    /// Set the bcrypt cost, e.g. a low cost to keep tests fast.
    pub fn with_password_cost(mut self, password_cost: u32) -> Self {
        self.password_cost = password_cost;
        self
    }
}
