//! Cashflow Vision is a personal finance tracker.
//!
//! This library provides a JSON REST API for recording transactions, setting
//! budgets per spending category, tracking recurring expenses and summarising
//! where the money went.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::json;
use time::Date;
use tokio::signal;

mod analytics;
mod app_state;
mod auth;
mod budget;
mod category;
mod database_id;
mod db;
mod endpoints;
mod frequency;
mod logging;
mod recurring;
mod routing;
mod timezone;
mod transaction;
mod validation;

#[cfg(test)]
mod test_utils;

pub use app_state::{AppState, DEFAULT_TOKEN_DURATION};
pub use auth::{NewUser, PasswordHash, UserID, ValidatedPassword, create_user};
pub use budget::{
    Budget, BudgetSummary, BudgetWindow, NewBudget, create_budget, link_transactions_to_budget,
    resolve_window,
};
pub use category::Category;
pub use db::initialize as initialize_db;
pub use frequency::Frequency;
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use recurring::{
    NewRecurringExpense, RecurringDeletion, RecurringExpense, create_recurring_expense,
    next_occurrence,
};
pub use routing::build_router;
pub use timezone::{get_local_offset, today_in};
pub use transaction::{Transaction, TransactionBuilder, TransactionType, create_transaction};

use crate::database_id::BudgetId;

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The identifier or password given at log-in did not match a user.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// The log-in request was missing the identifier or the password.
    #[error("Please provide username/email and password")]
    MissingCredentials,

    /// The request did not carry a bearer token.
    #[error("Not authorized, no token")]
    MissingToken,

    /// The bearer token could not be decoded, was signed with another key or
    /// has expired.
    #[error("Not authorized, token failed")]
    InvalidToken,

    /// The bearer token is valid but the user it names no longer exists.
    #[error("Not authorized, user not found")]
    UnknownTokenUser,

    /// The JWT library failed to sign a new token.
    ///
    /// The error string should only be logged for debugging on the server.
    #[error("could not create token: {0}")]
    TokenCreation(String),

    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// When communicating with the application client this error should be
    /// replaced with a general error type indicating an internal server error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// The string given as an email address is not a valid email address.
    #[error("\"{0}\" is not a valid email address")]
    InvalidEmail(String),

    /// The request body or query string could not be parsed, e.g. an unknown
    /// category or a malformed date.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A required text field was empty or only whitespace.
    #[error("{0} cannot be empty")]
    EmptyField(&'static str),

    /// Amounts are stored as non-negative numbers, the transaction type or
    /// budget decides the direction of the money.
    #[error("amount must be a non-negative number, got {0}")]
    InvalidAmount(f64),

    /// An end date came before its start date.
    #[error("the end date {end} is before the start date {start}")]
    InvalidDateRange {
        /// The start of the range.
        start: Date,
        /// The offending end of the range.
        end: Date,
    },

    /// A date could not be moved forward without leaving the supported
    /// calendar range.
    #[error("cannot project an occurrence after {0}")]
    DateOutOfRange(Date),

    /// A transaction was marked as recurring without saying how often it recurs.
    #[error("a recurring transaction needs a recurring pattern")]
    MissingRecurringPattern,

    /// A transaction referenced a budget that does not exist for the user.
    #[error("the budget {0} does not exist")]
    InvalidBudget(BudgetId),

    /// A user already exists with the email address.
    #[error("A user already exists with this email")]
    DuplicateEmail,

    /// A user already exists with the username.
    #[error("A user already exists with this username")]
    DuplicateUsername,

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the resource has been created.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// The budget was saved but its transactions could not be linked or
    /// unlinked afterwards.
    ///
    /// The primary write is not rolled back.
    #[error("the budget was saved but its transactions could not be updated: {0}")]
    BudgetLinkFailed(String),

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// The transactions could not be written as CSV.
    #[error("could not write CSV: {0}")]
    CsvError(String),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    && desc.ends_with("user.email") =>
            {
                Error::DuplicateEmail
            }
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    && desc.ends_with("user.username") =>
            {
                Error::DuplicateUsername
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::InvalidRequest(rejection.body_text())
    }
}

impl From<PathRejection> for Error {
    fn from(rejection: PathRejection) -> Self {
        Error::InvalidRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for Error {
    fn from(rejection: QueryRejection) -> Self {
        Error::InvalidRequest(rejection.body_text())
    }
}

impl Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidCredentials
            | Error::MissingToken
            | Error::InvalidToken
            | Error::UnknownTokenUser => StatusCode::UNAUTHORIZED,
            Error::MissingCredentials
            | Error::TooWeak(_)
            | Error::InvalidEmail(_)
            | Error::InvalidRequest(_)
            | Error::EmptyField(_)
            | Error::InvalidAmount(_)
            | Error::InvalidDateRange { .. }
            | Error::DateOutOfRange(_)
            | Error::MissingRecurringPattern
            | Error::InvalidBudget(_)
            | Error::DuplicateEmail
            | Error::DuplicateUsername => StatusCode::BAD_REQUEST,
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::TokenCreation(_)
            | Error::HashingError(_)
            | Error::BudgetLinkFailed(_)
            | Error::SqlError(_)
            | Error::DatabaseLockError
            | Error::InvalidTimezoneError(_)
            | Error::CsvError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            // Internal details are for the server logs, not the client.
            tracing::error!("An unexpected error occurred: {}", self);
            match self {
                Error::BudgetLinkFailed(_) => {
                    "The budget was saved but its transactions could not be updated".to_owned()
                }
                _ => "Something went wrong!".to_owned(),
            }
        } else {
            self.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
