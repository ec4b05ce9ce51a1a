//! The budget model and its database queries.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error,
    auth::UserID,
    category::Category,
    database_id::{BudgetId, RowsAffected},
    frequency::Frequency,
};

/// A spending limit for one category over a period.
///
/// How much has been spent is never stored, see [crate::budget::BudgetSummary].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    /// The ID of the budget.
    pub id: BudgetId,
    /// The user that owns the budget.
    pub user_id: UserID,
    /// A name for the budget, e.g. "Groceries".
    pub name: String,
    /// The category whose expenses count against the budget.
    pub category: Category,
    /// The spending limit, always non-negative.
    pub amount: f64,
    /// How long the budget lasts.
    pub period: Frequency,
    /// The first day of the budget.
    pub start_date: Date,
    /// The last day of the budget, never before `start_date`.
    pub end_date: Date,
    /// The uppercase currency code.
    pub currency: String,
}

/// The validated fields needed to create a [Budget].
#[derive(Debug, Clone, PartialEq)]
pub struct NewBudget {
    /// A non-empty name.
    pub name: String,
    /// The category whose expenses count against the budget.
    pub category: Category,
    /// The non-negative spending limit.
    pub amount: f64,
    /// How long the budget lasts.
    pub period: Frequency,
    /// The first day of the budget.
    pub start_date: Date,
    /// The last day of the budget.
    pub end_date: Date,
    /// The uppercase currency code.
    pub currency: String,
}

const BUDGET_COLUMNS: &str =
    "id, user_id, name, category, amount, period, start_date, end_date, currency";

/// Create the budget table.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_budget_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS budget (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                category TEXT NOT NULL,
                amount REAL NOT NULL CHECK (amount >= 0),
                period TEXT NOT NULL DEFAULT 'monthly',
                start_date TEXT NOT NULL,
                end_date TEXT NOT NULL,
                currency TEXT NOT NULL DEFAULT 'USD',
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    Ok(())
}

/// Insert a budget for `user_id`.
///
/// This does not link any transactions, see
/// [crate::budget::link_transactions_to_budget].
///
/// # Errors
/// Returns [Error::SqlError] if there is some SQL error.
pub fn create_budget(
    user_id: UserID,
    new_budget: NewBudget,
    connection: &Connection,
) -> Result<Budget, Error> {
    connection
        .prepare(&format!(
            "INSERT INTO budget (user_id, name, category, amount, period, start_date, end_date, currency)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             RETURNING {BUDGET_COLUMNS}"
        ))?
        .query_row(
            rusqlite::params![
                user_id.as_i64(),
                new_budget.name,
                new_budget.category,
                new_budget.amount,
                new_budget.period,
                new_budget.start_date,
                new_budget.end_date,
                new_budget.currency,
            ],
            map_budget_row,
        )
        .map_err(|error| error.into())
}

/// Get the budget `id` owned by `user_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a budget owned by the user,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_budget(id: BudgetId, user_id: UserID, connection: &Connection) -> Result<Budget, Error> {
    connection
        .prepare(&format!(
            "SELECT {BUDGET_COLUMNS} FROM budget WHERE id = :id AND user_id = :user_id"
        ))?
        .query_row(
            &[(":id", &id), (":user_id", &user_id.as_i64())],
            map_budget_row,
        )
        .map_err(|error| error.into())
}

/// Check that the budget `id` exists and belongs to `user_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidBudget] if it does not,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn check_budget_owner(
    id: BudgetId,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    match get_budget(id, user_id, connection) {
        Ok(_) => Ok(()),
        Err(Error::NotFound) => Err(Error::InvalidBudget(id)),
        Err(error) => Err(error),
    }
}

/// Get the budgets of `user_id`, most recently created first.
///
/// # Errors
/// Returns [Error::SqlError] if there is some SQL error.
pub fn get_budgets(user_id: UserID, connection: &Connection) -> Result<Vec<Budget>, Error> {
    connection
        .prepare(&format!(
            "SELECT {BUDGET_COLUMNS} FROM budget WHERE user_id = :user_id ORDER BY id DESC"
        ))?
        .query_map(&[(":user_id", &user_id.as_i64())], map_budget_row)?
        .map(|budget_result| budget_result.map_err(Error::SqlError))
        .collect()
}

/// Get the budgets of `user_id` for `category`, oldest first.
///
/// # Errors
/// Returns [Error::SqlError] if there is some SQL error.
pub fn get_budgets_by_category(
    user_id: UserID,
    category: Category,
    connection: &Connection,
) -> Result<Vec<Budget>, Error> {
    connection
        .prepare(&format!(
            "SELECT {BUDGET_COLUMNS} FROM budget WHERE user_id = ?1 AND category = ?2 ORDER BY id ASC"
        ))?
        .query_map((user_id.as_i64(), category), map_budget_row)?
        .map(|budget_result| budget_result.map_err(Error::SqlError))
        .collect()
}

/// Overwrite the stored fields of `budget`.
///
/// Changing the category does not move any transaction links.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the budget does not exist for its user,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_budget(budget: &Budget, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE budget
         SET name = ?1, category = ?2, amount = ?3, period = ?4, start_date = ?5, end_date = ?6,
             currency = ?7
         WHERE id = ?8 AND user_id = ?9",
        rusqlite::params![
            budget.name,
            budget.category,
            budget.amount,
            budget.period,
            budget.start_date,
            budget.end_date,
            budget.currency,
            budget.id,
            budget.user_id.as_i64(),
        ],
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Delete the budget `id` owned by `user_id`.
///
/// Returns the number of deleted rows, zero when the budget does not exist
/// for the user. Transactions that reference the budget are left untouched,
/// see [crate::budget::unlink_transactions_from_budget].
///
/// # Errors
/// Returns [Error::SqlError] if there is some SQL error.
pub fn delete_budget(
    id: BudgetId,
    user_id: UserID,
    connection: &Connection,
) -> Result<RowsAffected, Error> {
    connection
        .execute(
            "DELETE FROM budget WHERE id = :id AND user_id = :user_id",
            &[(":id", &id), (":user_id", &user_id.as_i64())],
        )
        .map_err(|error| error.into())
}

fn map_budget_row(row: &Row) -> Result<Budget, rusqlite::Error> {
    Ok(Budget {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        name: row.get(2)?,
        category: row.get(3)?,
        amount: row.get(4)?,
        period: row.get(5)?,
        start_date: row.get(6)?,
        end_date: row.get(7)?,
        currency: row.get(8)?,
    })
}
