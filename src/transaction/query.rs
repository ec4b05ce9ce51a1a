//! Database query helpers for listing a user's transactions.

use std::{fmt::Display, str::FromStr};

use rusqlite::{Connection, ToSql};
use serde::{Deserialize, Deserializer, de};
use time::Date;

use crate::{
    Error,
    auth::UserID,
    category::Category,
    database_id::{RowsAffected, TransactionId},
    frequency::Frequency,
    transaction::{
        Transaction, TransactionType,
        core::TRANSACTION_COLUMNS,
        map_transaction_row,
    },
};

/// Narrows down a transaction listing. Every field is optional and the date
/// bounds are inclusive.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionFilter {
    /// Only expenses or only income.
    #[serde(rename = "type", default, deserialize_with = "all_as_none")]
    pub transaction_type: Option<TransactionType>,
    /// Only this category.
    #[serde(default, deserialize_with = "all_as_none")]
    pub category: Option<Category>,
    /// Only transactions on or after this date.
    pub start_date: Option<Date>,
    /// Only transactions on or before this date.
    pub end_date: Option<Date>,
}

/// Parse a filter value where an empty string or "all" means no filter.
fn all_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(value) if value.is_empty() || value == "all" => Ok(None),
        Some(value) => value.parse().map(Some).map_err(de::Error::custom),
    }
}

/// Get the transactions of `user_id` that match `filter`, newest first.
///
/// Transactions on the same date are ordered by ID so the listing is stable
/// after updates.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub fn query_transactions(
    user_id: UserID,
    filter: &TransactionFilter,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let user_id = user_id.as_i64();
    let mut clauses = vec!["user_id = :user_id"];
    let mut params: Vec<(&str, &dyn ToSql)> = vec![(":user_id", &user_id)];

    if let Some(transaction_type) = &filter.transaction_type {
        clauses.push("type = :type");
        params.push((":type", transaction_type));
    }

    if let Some(category) = &filter.category {
        clauses.push("category = :category");
        params.push((":category", category));
    }

    if let Some(start_date) = &filter.start_date {
        clauses.push("date >= :start_date");
        params.push((":start_date", start_date));
    }

    if let Some(end_date) = &filter.end_date {
        clauses.push("date <= :end_date");
        params.push((":end_date", end_date));
    }

    let query = format!(
        "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" WHERE {} ORDER BY date DESC, id DESC",
        clauses.join(" AND ")
    );

    connection
        .prepare(&query)?
        .query_map(params.as_slice(), map_transaction_row)?
        .map(|transaction_result| transaction_result.map_err(Error::SqlError))
        .collect()
}

/// Get the transactions of `user_id` that are flagged as recurring,
/// optionally only those with `pattern`.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub fn get_recurring_transactions(
    user_id: UserID,
    pattern: Option<Frequency>,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\"
             WHERE user_id = ?1 AND is_recurring = 1
               AND (?2 IS NULL OR recurring_pattern = ?2)
             ORDER BY date DESC, id DESC"
        ))?
        .query_map((user_id.as_i64(), pattern), map_transaction_row)?
        .map(|transaction_result| transaction_result.map_err(Error::SqlError))
        .collect()
}

/// Clear the recurring flag of the transaction `id` without deleting it.
///
/// The recurring pattern is kept so the client can see what the transaction
/// used to repeat as.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub fn cancel_recurring_flag(
    id: TransactionId,
    user_id: UserID,
    connection: &Connection,
) -> Result<RowsAffected, Error> {
    connection
        .execute(
            "UPDATE \"transaction\" SET is_recurring = 0 WHERE id = ?1 AND user_id = ?2",
            (id, user_id.as_i64()),
        )
        .map_err(|error| error.into())
}
