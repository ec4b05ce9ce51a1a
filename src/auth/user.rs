//! Code for creating the user table and fetching users from the database.

use std::{fmt::Display, str::FromStr};

use email_address::EmailAddress;
use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, auth::PasswordHash};

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to better compile time
/// errors, and more flexible generics that can have distinct implementations for multiple ID types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct UserID(i64);

impl UserID {
    /// Create a new user ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the user ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// The currency new records fall back to when the client does not name one.
pub const DEFAULT_CURRENCY: &str = "USD";

/// Per-user settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    /// ISO currency code, always uppercase.
    pub default_currency: String,
    /// Whether the user wants reminders about upcoming recurring expenses.
    pub enable_notifications: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            default_currency: DEFAULT_CURRENCY.to_owned(),
            enable_notifications: true,
        }
    }
}

/// A user of the application.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// The user's ID in the application database.
    pub id: UserID,
    /// The user's display name.
    pub name: String,
    /// A unique handle that can be used instead of the email to log in.
    pub username: String,
    /// A unique, lowercase email address.
    pub email: String,
    /// The user's password hash.
    pub password_hash: PasswordHash,
    /// The user's settings.
    pub preferences: Preferences,
    /// When the user registered.
    pub created_at: OffsetDateTime,
}

/// The parts of a [User] that may be sent to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    /// The user's ID.
    pub id: UserID,
    /// The user's display name.
    pub name: String,
    /// The user's handle.
    pub username: String,
    /// The user's email address.
    pub email: String,
    /// When the user registered.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            created_at: user.created_at,
        }
    }
}

/// The validated data needed to insert a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// The user's display name, non-empty.
    pub name: String,
    /// The user's handle, non-empty.
    pub username: String,
    /// A valid, lowercase email address.
    pub email: String,
    /// The hash of a validated password.
    pub password_hash: PasswordHash,
}

/// Trim and lowercase `raw_email` and check that it is an email address.
///
/// # Errors
///
/// Returns [Error::InvalidEmail] if the string is not a valid email address.
pub fn normalize_email(raw_email: &str) -> Result<String, Error> {
    let email = raw_email.trim().to_lowercase();

    EmailAddress::from_str(&email)
        .map(|address| address.to_string())
        .map_err(|_| Error::InvalidEmail(raw_email.to_owned()))
}

/// Create the user table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                username TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL UNIQUE,
                password TEXT NOT NULL,
                default_currency TEXT NOT NULL DEFAULT 'USD',
                enable_notifications INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL
                )",
        (),
    )?;

    Ok(())
}

const USER_COLUMNS: &str =
    "id, name, username, email, password, default_currency, enable_notifications, created_at";

/// Create and insert a new user into the database with default preferences.
///
/// # Errors
///
/// Returns a:
/// - [Error::DuplicateEmail] or [Error::DuplicateUsername] if another user has the same email or username,
/// - or [Error::SqlError] if some other SQL related error occurred.
pub fn create_user(
    new_user: NewUser,
    created_at: OffsetDateTime,
    connection: &Connection,
) -> Result<User, Error> {
    let preferences = Preferences::default();

    connection.execute(
        "INSERT INTO user (name, username, email, password, default_currency, enable_notifications, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        (
            &new_user.name,
            &new_user.username,
            &new_user.email,
            new_user.password_hash.as_ref(),
            &preferences.default_currency,
            preferences.enable_notifications,
            created_at,
        ),
    )?;

    let id = UserID::new(connection.last_insert_rowid());

    Ok(User {
        id,
        name: new_user.name,
        username: new_user.username,
        email: new_user.email,
        password_hash: new_user.password_hash,
        preferences,
        created_at,
    })
}

/// Get the user from the database with an ID equal to `user_id`.
///
/// # Errors
///
/// This function will return an error if:
/// - `user_id` does not belong to a registered user.
/// - there was an error trying to access the store.
pub fn get_user_by_id(user_id: UserID, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare(&format!("SELECT {USER_COLUMNS} FROM user WHERE id = :id"))?
        .query_row(&[(":id", &user_id.as_i64())], map_user_row)
        .map_err(|error| error.into())
}

/// Get the user whose email or username equals `identifier`.
///
/// Emails are stored lowercase, so the identifier is also compared lowercase
/// against the email column.
///
/// # Errors
///
/// Returns [Error::NotFound] if no user matches.
pub fn get_user_by_identifier(identifier: &str, connection: &Connection) -> Result<User, Error> {
    let identifier = identifier.trim();

    connection
        .prepare(&format!(
            "SELECT {USER_COLUMNS} FROM user WHERE email = :email OR username = :username"
        ))?
        .query_row(
            &[
                (":email", &identifier.to_lowercase()),
                (":username", &identifier.to_owned()),
            ],
            map_user_row,
        )
        .map_err(|error| error.into())
}

/// Replace the preferences of `user_id`.
///
/// # Errors
///
/// Returns [Error::NotFound] if the user does not exist.
pub fn update_preferences(
    user_id: UserID,
    preferences: &Preferences,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE user SET default_currency = ?1, enable_notifications = ?2 WHERE id = ?3",
        (
            &preferences.default_currency,
            preferences.enable_notifications,
            user_id.as_i64(),
        ),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

fn map_user_row(row: &Row) -> Result<User, rusqlite::Error> {
    let raw_password_hash: String = row.get(4)?;

    Ok(User {
        id: UserID::new(row.get(0)?),
        name: row.get(1)?,
        username: row.get(2)?,
        email: row.get(3)?,
        password_hash: PasswordHash::from_stored(raw_password_hash),
        preferences: Preferences {
            default_currency: row.get(5)?,
            enable_notifications: row.get(6)?,
        },
        created_at: row.get(7)?,
    })
}

#[cfg(test)]
mod user_tests {
    use rusqlite::Connection;
    use time::macros::datetime;

    use crate::{
        Error,
        auth::{
            PasswordHash,
            user::{
                NewUser, Preferences, UserID, create_user, create_user_table, get_user_by_id,
                get_user_by_identifier, normalize_email, update_preferences,
            },
        },
    };

    fn get_db_connection() -> Connection {
        let conn =
            Connection::open_in_memory().expect("Could not create in-memory SQLite database");
        create_user_table(&conn).expect("Could not create user table");

        conn
    }

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            name: "Jordan".to_owned(),
            username: username.to_owned(),
            email: email.to_owned(),
            password_hash: PasswordHash::from_stored("hunter2".to_owned()),
        }
    }

    #[test]
    fn insert_user_succeeds() {
        let conn = get_db_connection();
        let created_at = datetime!(2024-05-01 12:00 UTC);

        let user = create_user(new_user("jordan", "jordan@example.com"), created_at, &conn)
            .expect("Could not create user");

        assert!(user.id.as_i64() > 0);
        assert_eq!(user.preferences, Preferences::default());
        assert_eq!(get_user_by_id(user.id, &conn), Ok(user));
    }

    #[test]
    fn duplicate_email_is_rejected() {
        let conn = get_db_connection();
        let created_at = datetime!(2024-05-01 12:00 UTC);
        create_user(new_user("jordan", "jordan@example.com"), created_at, &conn).unwrap();

        let result = create_user(new_user("other", "jordan@example.com"), created_at, &conn);

        assert_eq!(result, Err(Error::DuplicateEmail));
    }

    #[test]
    fn duplicate_username_is_rejected() {
        let conn = get_db_connection();
        let created_at = datetime!(2024-05-01 12:00 UTC);
        create_user(new_user("jordan", "jordan@example.com"), created_at, &conn).unwrap();

        let result = create_user(new_user("jordan", "other@example.com"), created_at, &conn);

        assert_eq!(result, Err(Error::DuplicateUsername));
    }

    #[test]
    fn find_by_email_or_username() {
        let conn = get_db_connection();
        let user = create_user(
            new_user("jordan", "jordan@example.com"),
            datetime!(2024-05-01 12:00 UTC),
            &conn,
        )
        .unwrap();

        assert_eq!(get_user_by_identifier("jordan", &conn), Ok(user.clone()));
        assert_eq!(
            get_user_by_identifier("Jordan@Example.com", &conn),
            Ok(user)
        );
    }

    #[test]
    fn unknown_identifier_is_not_found() {
        let conn = get_db_connection();

        assert_eq!(
            get_user_by_identifier("nobody", &conn),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn get_missing_user_is_not_found() {
        let conn = get_db_connection();

        assert_eq!(get_user_by_id(UserID::new(42), &conn), Err(Error::NotFound));
    }

    #[test]
    fn update_preferences_persists() {
        let conn = get_db_connection();
        let user = create_user(
            new_user("jordan", "jordan@example.com"),
            datetime!(2024-05-01 12:00 UTC),
            &conn,
        )
        .unwrap();
        let preferences = Preferences {
            default_currency: "NZD".to_owned(),
            enable_notifications: false,
        };

        update_preferences(user.id, &preferences, &conn).unwrap();

        assert_eq!(get_user_by_id(user.id, &conn).unwrap().preferences, preferences);
    }

    #[test]
    fn normalize_email_lowercases_and_validates() {
        assert_eq!(
            normalize_email("  Jordan@Example.COM "),
            Ok("jordan@example.com".to_owned())
        );
        assert_eq!(
            normalize_email("not an email"),
            Err(Error::InvalidEmail("not an email".to_owned()))
        );
    }
}
