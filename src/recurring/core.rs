//! The recurring expense model and its database queries.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error,
    auth::UserID,
    category::Category,
    database_id::{RecurringExpenseId, RowsAffected},
    frequency::Frequency,
    recurring::next_occurrence,
};

/// What deleting a recurring expense does.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum RecurringDeletion {
    /// Remove the record.
    #[default]
    Delete,
    /// Keep the record but mark it inactive.
    Cancel,
}

/// A template for an expense that repeats on a calendar cadence.
///
/// Nothing advances `next_occurrence` on its own, it is only set when the
/// expense is created or its schedule is edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringExpense {
    /// The ID of the recurring expense.
    pub id: RecurringExpenseId,
    /// The user that owns the recurring expense.
    pub user_id: UserID,
    /// What the expense is for.
    pub description: String,
    /// How much each occurrence costs, always non-negative.
    pub amount: f64,
    /// What the money is spent on.
    pub category: Category,
    /// How often the expense repeats.
    pub frequency: Frequency,
    /// The first day of the schedule.
    pub start_date: Date,
    /// The last day of the schedule, if it ends.
    pub end_date: Option<Date>,
    /// The projected next due date.
    pub next_occurrence: Date,
    /// The last date the expense was paid, if known.
    pub last_occurrence: Option<Date>,
    /// False once the expense has been cancelled.
    pub active: bool,
}

/// The validated fields needed to create a [RecurringExpense].
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecurringExpense {
    /// What the expense is for.
    pub description: String,
    /// How much each occurrence costs.
    pub amount: f64,
    /// What the money is spent on.
    pub category: Category,
    /// How often the expense repeats.
    pub frequency: Frequency,
    /// The first day of the schedule.
    pub start_date: Date,
    /// The last day of the schedule, if it ends.
    pub end_date: Option<Date>,
}

const RECURRING_EXPENSE_COLUMNS: &str = "id, user_id, description, amount, category, frequency, \
    start_date, end_date, next_occurrence, last_occurrence, active";

/// Create the recurring expense table.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_recurring_expense_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS recurring_expense (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                description TEXT NOT NULL,
                amount REAL NOT NULL CHECK (amount >= 0),
                category TEXT NOT NULL,
                frequency TEXT NOT NULL,
                start_date TEXT NOT NULL,
                end_date TEXT,
                next_occurrence TEXT NOT NULL,
                last_occurrence TEXT,
                active INTEGER NOT NULL DEFAULT 1,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    Ok(())
}

/// Insert a recurring expense for `user_id`, projecting its next occurrence
/// from the start date.
///
/// # Errors
/// This function will return a:
/// - [Error::DateOutOfRange] if the next occurrence cannot be projected,
/// - or [Error::SqlError] if there is some SQL error.
pub fn create_recurring_expense(
    user_id: UserID,
    new_expense: NewRecurringExpense,
    connection: &Connection,
) -> Result<RecurringExpense, Error> {
    let next = next_occurrence(new_expense.start_date, new_expense.frequency)?;

    connection
        .prepare(&format!(
            "INSERT INTO recurring_expense
             (user_id, description, amount, category, frequency, start_date, end_date, next_occurrence)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             RETURNING {RECURRING_EXPENSE_COLUMNS}"
        ))?
        .query_row(
            rusqlite::params![
                user_id.as_i64(),
                new_expense.description,
                new_expense.amount,
                new_expense.category,
                new_expense.frequency,
                new_expense.start_date,
                new_expense.end_date,
                next,
            ],
            map_recurring_expense_row,
        )
        .map_err(|error| error.into())
}

/// Get the recurring expense `id` owned by `user_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the expense does not exist for the user,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_recurring_expense(
    id: RecurringExpenseId,
    user_id: UserID,
    connection: &Connection,
) -> Result<RecurringExpense, Error> {
    connection
        .prepare(&format!(
            "SELECT {RECURRING_EXPENSE_COLUMNS} FROM recurring_expense
             WHERE id = ?1 AND user_id = ?2"
        ))?
        .query_row((id, user_id.as_i64()), map_recurring_expense_row)
        .map_err(|error| error.into())
}

/// Get every recurring expense of `user_id`, soonest due first.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub fn get_recurring_expenses(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<RecurringExpense>, Error> {
    connection
        .prepare(&format!(
            "SELECT {RECURRING_EXPENSE_COLUMNS} FROM recurring_expense
             WHERE user_id = ?1 ORDER BY next_occurrence ASC, id ASC"
        ))?
        .query_map([user_id.as_i64()], map_recurring_expense_row)?
        .map(|row| row.map_err(Error::SqlError))
        .collect()
}

/// Overwrite the stored fields of `expense`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the expense does not exist for its user,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_recurring_expense(
    expense: &RecurringExpense,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE recurring_expense
         SET description = ?1, amount = ?2, category = ?3, frequency = ?4, start_date = ?5,
             end_date = ?6, next_occurrence = ?7, last_occurrence = ?8, active = ?9
         WHERE id = ?10 AND user_id = ?11",
        rusqlite::params![
            expense.description,
            expense.amount,
            expense.category,
            expense.frequency,
            expense.start_date,
            expense.end_date,
            expense.next_occurrence,
            expense.last_occurrence,
            expense.active,
            expense.id,
            expense.user_id.as_i64(),
        ],
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Remove the recurring expense `id` owned by `user_id`, or mark it inactive,
/// depending on `policy`.
///
/// Returns the number of affected rows, zero when the expense does not exist
/// for the user.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub fn delete_recurring_expense(
    id: RecurringExpenseId,
    user_id: UserID,
    policy: RecurringDeletion,
    connection: &Connection,
) -> Result<RowsAffected, Error> {
    let query = match policy {
        RecurringDeletion::Delete => "DELETE FROM recurring_expense WHERE id = ?1 AND user_id = ?2",
        RecurringDeletion::Cancel => {
            "UPDATE recurring_expense SET active = 0 WHERE id = ?1 AND user_id = ?2"
        }
    };

    connection
        .execute(query, (id, user_id.as_i64()))
        .map_err(|error| error.into())
}

fn map_recurring_expense_row(row: &Row) -> Result<RecurringExpense, rusqlite::Error> {
    Ok(RecurringExpense {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        description: row.get(2)?,
        amount: row.get(3)?,
        category: row.get(4)?,
        frequency: row.get(5)?,
        start_date: row.get(6)?,
        end_date: row.get(7)?,
        next_occurrence: row.get(8)?,
        last_occurrence: row.get(9)?,
        active: row.get(10)?,
    })
}
