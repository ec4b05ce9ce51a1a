//! Route handlers for creating, reading, updating and deleting transactions.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{
        FromRef, Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::json;
use time::Date;

use crate::{
    AppState, Error,
    auth::UserID,
    budget::check_budget_owner,
    category::Category,
    database_id::{BudgetId, TransactionId},
    frequency::Frequency,
    recurring::{NewRecurringExpense, create_recurring_expense},
    transaction::{
        Transaction, TransactionFilter, TransactionType, cancel_recurring_flag,
        create_transaction, delete_transaction, get_recurring_transactions, get_transaction,
        query_transactions, update_transaction,
    },
    validation::{currency_code, date_range, non_empty, non_negative_amount, nullable},
};

/// The state needed by the transaction routes.
#[derive(Debug, Clone)]
pub struct TransactionState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for TransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The data sent by the client to create a transaction.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionData {
    /// Text detailing the transaction.
    pub description: String,
    /// The non-negative amount of money.
    pub amount: f64,
    /// Defaults to an expense.
    #[serde(rename = "type")]
    pub transaction_type: Option<TransactionType>,
    /// What the money was for.
    pub category: Category,
    /// When the money moved.
    pub date: Date,
    /// Defaults to US dollars.
    pub currency: Option<String>,
    /// A link to or name of a receipt.
    pub receipt: Option<String>,
    /// Also creates a recurring expense when set.
    #[serde(default)]
    pub is_recurring: bool,
    /// Required when `is_recurring` is set.
    pub recurring_pattern: Option<Frequency>,
    /// The first day of the recurring expense, defaults to `date`.
    pub recurring_start_date: Option<Date>,
    /// The last day of the recurring expense.
    pub recurring_end_date: Option<Date>,
    /// A budget of the user to count the transaction towards.
    pub budget_id: Option<BudgetId>,
}

/// A partial update of a transaction. Omitted fields keep their value, and
/// `null` clears the receipt, recurring pattern and budget.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionUpdate {
    pub description: Option<String>,
    pub amount: Option<f64>,
    #[serde(rename = "type")]
    pub transaction_type: Option<TransactionType>,
    pub category: Option<Category>,
    pub date: Option<Date>,
    pub currency: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub receipt: Option<Option<String>>,
    pub is_recurring: Option<bool>,
    #[serde(default, deserialize_with = "nullable")]
    pub recurring_pattern: Option<Option<Frequency>>,
    #[serde(default, deserialize_with = "nullable")]
    pub budget_id: Option<Option<BudgetId>>,
}

/// The query string of the legacy recurring transaction listing.
#[derive(Debug, Default, Deserialize)]
pub struct RecurringTransactionQuery {
    /// Only transactions that recur with this frequency.
    pub pattern: Option<Frequency>,
}

/// A route handler that lists the user's transactions, newest first.
///
/// Accepts the optional query parameters `type`, `category`, `startDate` and
/// `endDate`.
pub async fn list_transactions(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    query: Result<Query<TransactionFilter>, QueryRejection>,
) -> Result<impl IntoResponse, Error> {
    let Query(filter) = query?;

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    Ok(Json(query_transactions(user_id, &filter, &connection)?))
}

/// A route handler that returns one of the user's transactions.
pub async fn get_transaction_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    path: Result<Path<TransactionId>, PathRejection>,
) -> Result<impl IntoResponse, Error> {
    let Path(transaction_id) = path?;
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    Ok(Json(get_transaction(transaction_id, user_id, &connection)?))
}

/// A route handler for creating a new transaction, responds with 201.
///
/// A transaction flagged as recurring also creates a recurring expense. The
/// two rows are written in one database transaction.
pub async fn create_transaction_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    payload: Result<Json<TransactionData>, JsonRejection>,
) -> Result<impl IntoResponse, Error> {
    let Json(data) = payload?;

    let description = non_empty("description", &data.description)?;
    let amount = non_negative_amount(data.amount)?;
    let recurring_pattern = match (data.is_recurring, data.recurring_pattern) {
        (true, None) => return Err(Error::MissingRecurringPattern),
        (true, pattern) => pattern,
        (false, _) => None,
    };

    let builder = Transaction::build(amount, data.date, &description)
        .transaction_type(data.transaction_type.unwrap_or(TransactionType::Expense))
        .category(data.category)
        .currency(&currency_code(data.currency.as_deref())?)
        .receipt(data.receipt)
        .recurring_pattern(recurring_pattern)
        .budget_id(data.budget_id);

    let recurring_expense = match recurring_pattern {
        Some(frequency) => {
            let start_date = data.recurring_start_date.unwrap_or(data.date);
            date_range(start_date, data.recurring_end_date)?;

            Some(NewRecurringExpense {
                description,
                amount,
                category: data.category,
                frequency,
                start_date,
                end_date: data.recurring_end_date,
            })
        }
        None => None,
    };

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    if let Some(budget_id) = data.budget_id {
        check_budget_owner(budget_id, user_id, &connection)?;
    }

    let sql_transaction = connection.unchecked_transaction()?;
    let transaction = create_transaction(user_id, builder, &sql_transaction)?;
    if let Some(new_expense) = recurring_expense {
        let expense = create_recurring_expense(user_id, new_expense, &sql_transaction)?;
        tracing::debug!(
            "Created recurring expense {} for transaction {}",
            expense.id,
            transaction.id
        );
    }
    sql_transaction.commit()?;

    Ok((StatusCode::CREATED, Json(transaction)))
}

/// A route handler that applies a partial update to a transaction.
///
/// Flagging an existing transaction as recurring does not create a recurring
/// expense.
pub async fn update_transaction_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    path: Result<Path<TransactionId>, PathRejection>,
    payload: Result<Json<TransactionUpdate>, JsonRejection>,
) -> Result<impl IntoResponse, Error> {
    let Path(transaction_id) = path?;
    let Json(update) = payload?;

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let existing = get_transaction(transaction_id, user_id, &connection)?;
    if let Some(budget_id) = update
        .budget_id
        .flatten()
        .filter(|&id| existing.budget_id != Some(id))
    {
        check_budget_owner(budget_id, user_id, &connection)?;
    }

    let updated = apply_update(existing, update)?;
    update_transaction(&updated, &connection)?;

    Ok(Json(updated))
}

fn apply_update(
    mut transaction: Transaction,
    update: TransactionUpdate,
) -> Result<Transaction, Error> {
    if let Some(description) = update.description {
        transaction.description = non_empty("description", &description)?;
    }
    if let Some(amount) = update.amount {
        transaction.amount = non_negative_amount(amount)?;
    }
    if let Some(transaction_type) = update.transaction_type {
        transaction.transaction_type = transaction_type;
    }
    if let Some(category) = update.category {
        transaction.category = category;
    }
    if let Some(date) = update.date {
        transaction.date = date;
    }
    if let Some(currency) = update.currency {
        transaction.currency = currency_code(Some(&currency))?;
    }
    if let Some(receipt) = update.receipt {
        transaction.receipt = receipt;
    }
    if let Some(recurring_pattern) = update.recurring_pattern {
        transaction.recurring_pattern = recurring_pattern;
    }
    if let Some(is_recurring) = update.is_recurring {
        transaction.is_recurring = is_recurring;
    }
    if let Some(budget_id) = update.budget_id {
        transaction.budget_id = budget_id;
    }

    if !transaction.is_recurring {
        transaction.recurring_pattern = None;
    }

    if transaction.is_recurring && transaction.recurring_pattern.is_none() {
        return Err(Error::MissingRecurringPattern);
    }

    Ok(transaction)
}

/// A route handler for deleting a transaction.
pub async fn delete_transaction_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    path: Result<Path<TransactionId>, PathRejection>,
) -> Result<impl IntoResponse, Error> {
    let Path(transaction_id) = path?;
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    match delete_transaction(transaction_id, user_id, &connection)? {
        0 => Err(Error::NotFound),
        _ => Ok(Json(json!({ "message": "Transaction deleted successfully" }))),
    }
}

/// A route handler that lists the transactions flagged as recurring,
/// optionally only those with the frequency given as `?pattern=`.
pub async fn list_recurring_transactions(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    query: Result<Query<RecurringTransactionQuery>, QueryRejection>,
) -> Result<impl IntoResponse, Error> {
    let Query(query) = query?;

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    Ok(Json(get_recurring_transactions(
        user_id,
        query.pattern,
        &connection,
    )?))
}

/// A route handler that clears the recurring flag of a transaction and keeps
/// the transaction.
pub async fn cancel_recurring_transaction(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    path: Result<Path<TransactionId>, PathRejection>,
) -> Result<impl IntoResponse, Error> {
    let Path(transaction_id) = path?;
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    match cancel_recurring_flag(transaction_id, user_id, &connection)? {
        0 => Err(Error::NotFound),
        _ => Ok(Json(
            json!({ "message": "Recurring transaction cancelled successfully" }),
        )),
    }
}

#[cfg(test)]
mod apply_update_tests {
    use time::macros::date;

    use crate::{
        Error,
        auth::UserID,
        category::Category,
        frequency::Frequency,
        transaction::{Transaction, TransactionType},
    };

    use super::{TransactionUpdate, apply_update};

    fn coffee() -> Transaction {
        Transaction {
            id: 1,
            user_id: UserID::new(1),
            description: "Coffee".to_owned(),
            amount: 4.5,
            transaction_type: TransactionType::Expense,
            category: Category::Food,
            date: date!(2024 - 03 - 01),
            currency: "USD".to_owned(),
            receipt: None,
            is_recurring: false,
            recurring_pattern: None,
            budget_id: None,
        }
    }

    #[test]
    fn omitted_fields_are_kept() {
        let got = apply_update(
            coffee(),
            TransactionUpdate {
                amount: Some(5.0),
                currency: Some("eur".to_owned()),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(
            got,
            Transaction {
                amount: 5.0,
                currency: "EUR".to_owned(),
                ..coffee()
            }
        );
    }

    #[test]
    fn recurring_flag_needs_pattern() {
        let got = apply_update(
            coffee(),
            TransactionUpdate {
                is_recurring: Some(true),
                ..Default::default()
            },
        );

        assert_eq!(got, Err(Error::MissingRecurringPattern));
    }

    #[test]
    fn recurring_flag_with_pattern() {
        let got = apply_update(
            coffee(),
            TransactionUpdate {
                is_recurring: Some(true),
                recurring_pattern: Some(Some(Frequency::Daily)),
                ..Default::default()
            },
        )
        .unwrap();

        assert!(got.is_recurring);
        assert_eq!(got.recurring_pattern, Some(Frequency::Daily));
    }

    #[test]
    fn clearing_recurring_flag_drops_pattern() {
        let recurring = Transaction {
            is_recurring: true,
            recurring_pattern: Some(Frequency::Weekly),
            ..coffee()
        };

        let got = apply_update(
            recurring,
            TransactionUpdate {
                is_recurring: Some(false),
                ..Default::default()
            },
        )
        .unwrap();

        assert!(!got.is_recurring);
        assert_eq!(got.recurring_pattern, None);
    }

    #[test]
    fn null_clears_receipt_and_budget() {
        let linked = Transaction {
            receipt: Some("r.png".to_owned()),
            budget_id: Some(5),
            ..coffee()
        };
        let update: TransactionUpdate =
            serde_json::from_str(r#"{"budgetId": null, "receipt": null}"#).unwrap();

        let got = apply_update(linked, update).unwrap();

        assert_eq!(got.receipt, None);
        assert_eq!(got.budget_id, None);
    }

    #[test]
    fn omitted_receipt_and_budget_are_kept() {
        let linked = Transaction {
            receipt: Some("r.png".to_owned()),
            budget_id: Some(5),
            ..coffee()
        };
        let update: TransactionUpdate = serde_json::from_str(r#"{"amount": 6.0}"#).unwrap();

        let got = apply_update(linked, update).unwrap();

        assert_eq!(got.receipt, Some("r.png".to_owned()));
        assert_eq!(got.budget_id, Some(5));
    }

    #[test]
    fn blank_description_is_rejected() {
        let got = apply_update(
            coffee(),
            TransactionUpdate {
                description: Some("  ".to_owned()),
                ..Default::default()
            },
        );

        assert_eq!(got, Err(Error::EmptyField("description")));
    }
}
