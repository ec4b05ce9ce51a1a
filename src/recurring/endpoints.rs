//! Route handlers for managing recurring expenses.
//!
//! Responses are wrapped as `{"success": true, "data": ...}`.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{
        FromRef, Path, State,
        rejection::{JsonRejection, PathRejection},
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
    category::Category,
    database_id::RecurringExpenseId,
    frequency::Frequency,
    recurring::{
        NewRecurringExpense, RecurringDeletion, RecurringExpense, create_recurring_expense,
        delete_recurring_expense, get_recurring_expense, get_recurring_expenses,
        next_occurrence, update_recurring_expense,
    },
    validation::{date_range, non_empty, non_negative_amount, nullable},
};

/// The state needed by the recurring expense routes.
#[derive(Debug, Clone)]
pub struct RecurringState {
    /// What deleting a recurring expense does.
    pub recurring_deletion: RecurringDeletion,
    /// The database connection for managing recurring expenses.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for RecurringState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            recurring_deletion: state.recurring_deletion,
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The data sent by the client to create a recurring expense.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringExpenseData {
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
    /// The last day of the schedule.
    pub end_date: Option<Date>,
}

/// A partial update of a recurring expense. Omitted fields keep their value,
/// and `null` clears the end date or the last occurrence.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringExpenseUpdate {
    /// What the expense is for.
    pub description: Option<String>,
    /// How much each occurrence costs.
    pub amount: Option<f64>,
    /// What the money is spent on.
    pub category: Option<Category>,
    /// How often the expense repeats.
    pub frequency: Option<Frequency>,
    /// The first day of the schedule.
    pub start_date: Option<Date>,
    /// The last day of the schedule.
    #[serde(default, deserialize_with = "nullable")]
    pub end_date: Option<Option<Date>>,
    /// The last date the expense was paid.
    #[serde(default, deserialize_with = "nullable")]
    pub last_occurrence: Option<Option<Date>>,
    /// Whether the expense is still active.
    pub active: Option<bool>,
}

/// A route handler that lists the user's recurring expenses.
pub async fn list_recurring_expenses(
    State(state): State<RecurringState>,
    Extension(user_id): Extension<UserID>,
) -> Result<impl IntoResponse, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let expenses = get_recurring_expenses(user_id, &connection)?;

    Ok(Json(json!({ "success": true, "data": expenses })))
}

/// A route handler that returns one of the user's recurring expenses.
pub async fn get_recurring_expense_endpoint(
    State(state): State<RecurringState>,
    Extension(user_id): Extension<UserID>,
    path: Result<Path<RecurringExpenseId>, PathRejection>,
) -> Result<impl IntoResponse, Error> {
    let Path(id) = path?;
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let expense = get_recurring_expense(id, user_id, &connection)?;

    Ok(Json(json!({ "success": true, "data": expense })))
}

/// A route handler that creates a recurring expense and projects its first
/// due date, responds with 201.
pub async fn create_recurring_expense_endpoint(
    State(state): State<RecurringState>,
    Extension(user_id): Extension<UserID>,
    payload: Result<Json<RecurringExpenseData>, JsonRejection>,
) -> Result<impl IntoResponse, Error> {
    let Json(data) = payload?;

    date_range(data.start_date, data.end_date)?;
    let new_expense = NewRecurringExpense {
        description: non_empty("description", &data.description)?,
        amount: non_negative_amount(data.amount)?,
        category: data.category,
        frequency: data.frequency,
        start_date: data.start_date,
        end_date: data.end_date,
    };

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let expense = create_recurring_expense(user_id, new_expense, &connection)?;
    tracing::debug!("Created recurring expense {} for user {user_id}", expense.id);

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": expense })),
    ))
}

/// A route handler that applies a partial update to a recurring expense.
///
/// The next occurrence is projected again only when the start date or the
/// frequency actually changes.
pub async fn update_recurring_expense_endpoint(
    State(state): State<RecurringState>,
    Extension(user_id): Extension<UserID>,
    path: Result<Path<RecurringExpenseId>, PathRejection>,
    payload: Result<Json<RecurringExpenseUpdate>, JsonRejection>,
) -> Result<impl IntoResponse, Error> {
    let Path(id) = path?;
    let Json(update) = payload?;

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let existing = get_recurring_expense(id, user_id, &connection)?;
    let updated = apply_update(existing, update)?;
    update_recurring_expense(&updated, &connection)?;

    Ok(Json(json!({ "success": true, "data": updated })))
}

fn apply_update(
    mut expense: RecurringExpense,
    update: RecurringExpenseUpdate,
) -> Result<RecurringExpense, Error> {
    let schedule_changed = update
        .start_date
        .is_some_and(|start_date| start_date != expense.start_date)
        || update
            .frequency
            .is_some_and(|frequency| frequency != expense.frequency);

    if let Some(description) = update.description {
        expense.description = non_empty("description", &description)?;
    }
    if let Some(amount) = update.amount {
        expense.amount = non_negative_amount(amount)?;
    }
    if let Some(category) = update.category {
        expense.category = category;
    }
    if let Some(frequency) = update.frequency {
        expense.frequency = frequency;
    }
    if let Some(start_date) = update.start_date {
        expense.start_date = start_date;
    }
    if let Some(end_date) = update.end_date {
        expense.end_date = end_date;
    }
    if let Some(last_occurrence) = update.last_occurrence {
        expense.last_occurrence = last_occurrence;
    }
    if let Some(active) = update.active {
        expense.active = active;
    }

    date_range(expense.start_date, expense.end_date)?;

    if schedule_changed {
        expense.next_occurrence = next_occurrence(expense.start_date, expense.frequency)?;
    }

    Ok(expense)
}

/// A route handler that deletes or cancels a recurring expense, depending on
/// the server's [RecurringDeletion] policy.
pub async fn delete_recurring_expense_endpoint(
    State(state): State<RecurringState>,
    Extension(user_id): Extension<UserID>,
    path: Result<Path<RecurringExpenseId>, PathRejection>,
) -> Result<impl IntoResponse, Error> {
    let Path(id) = path?;
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    match delete_recurring_expense(id, user_id, state.recurring_deletion, &connection)? {
        0 => Err(Error::NotFound),
        _ => {
            tracing::debug!(
                "Applied {:?} to recurring expense {id} for user {user_id}",
                state.recurring_deletion
            );
            Ok(Json(json!({ "success": true, "data": {} })))
        }
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
        recurring::RecurringExpense,
    };

    use super::{RecurringExpenseUpdate, apply_update};

    fn rent() -> RecurringExpense {
        RecurringExpense {
            id: 1,
            user_id: UserID::new(1),
            description: "Rent".to_owned(),
            amount: 1200.0,
            category: Category::Bills,
            frequency: Frequency::Monthly,
            start_date: date!(2024 - 01 - 31),
            end_date: None,
            // Not the projection of the start date.
            next_occurrence: date!(2024 - 05 - 31),
            last_occurrence: None,
            active: true,
        }
    }

    #[test]
    fn unrelated_change_keeps_next_occurrence() {
        let got = apply_update(
            rent(),
            RecurringExpenseUpdate {
                amount: Some(1300.0),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(got.amount, 1300.0);
        assert_eq!(got.next_occurrence, date!(2024 - 05 - 31));
    }

    #[test]
    fn same_schedule_keeps_next_occurrence() {
        let got = apply_update(
            rent(),
            RecurringExpenseUpdate {
                start_date: Some(date!(2024 - 01 - 31)),
                frequency: Some(Frequency::Monthly),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(got.next_occurrence, date!(2024 - 05 - 31));
    }

    #[test]
    fn new_frequency_recomputes_next_occurrence() {
        let got = apply_update(
            rent(),
            RecurringExpenseUpdate {
                frequency: Some(Frequency::Weekly),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(got.next_occurrence, date!(2024 - 02 - 07));
    }

    #[test]
    fn new_start_date_recomputes_next_occurrence() {
        let got = apply_update(
            rent(),
            RecurringExpenseUpdate {
                start_date: Some(date!(2024 - 03 - 10)),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(got.next_occurrence, date!(2024 - 04 - 10));
    }

    #[test]
    fn end_before_start_is_rejected() {
        let got = apply_update(
            rent(),
            RecurringExpenseUpdate {
                end_date: Some(Some(date!(2024 - 01 - 01))),
                ..Default::default()
            },
        );

        assert_eq!(
            got,
            Err(Error::InvalidDateRange {
                start: date!(2024 - 01 - 31),
                end: date!(2024 - 01 - 01)
            })
        );
    }

    #[test]
    fn null_clears_end_date_and_last_occurrence() {
        let ending = RecurringExpense {
            end_date: Some(date!(2024 - 12 - 31)),
            last_occurrence: Some(date!(2024 - 04 - 30)),
            ..rent()
        };
        let update: RecurringExpenseUpdate =
            serde_json::from_str(r#"{"endDate": null, "lastOccurrence": null}"#).unwrap();

        let got = apply_update(ending, update).unwrap();

        assert_eq!(got.end_date, None);
        assert_eq!(got.last_occurrence, None);
    }

    #[test]
    fn omitted_end_date_is_kept() {
        let ending = RecurringExpense {
            end_date: Some(date!(2024 - 12 - 31)),
            ..rent()
        };
        let update: RecurringExpenseUpdate =
            serde_json::from_str(r#"{"amount": 1250.0}"#).unwrap();

        let got = apply_update(ending, update).unwrap();

        assert_eq!(got.end_date, Some(date!(2024 - 12 - 31)));
    }
}
