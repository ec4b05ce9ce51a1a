//! Route handlers for managing budgets.

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
    budget::{
        Budget, NewBudget, create_budget, delete_budget, get_budget, get_budgets,
        get_budgets_by_category, link_transactions_to_budget, load_summary, update_budget,
        unlink_transactions_from_budget,
    },
    category::Category,
    database_id::BudgetId,
    frequency::Frequency,
    timezone::today_in,
    validation::{currency_code, date_range, non_empty, non_negative_amount},
};

/// The state needed by the budget routes.
#[derive(Debug, Clone)]
pub struct BudgetState {
    /// The timezone that decides which month "today" is in.
    pub local_timezone: String,
    /// The database connection for managing budgets.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for BudgetState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            local_timezone: state.local_timezone.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The data sent by the client to create a budget.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetData {
    pub name: String,
    pub category: Category,
    pub amount: f64,
    /// Defaults to monthly.
    pub period: Option<Frequency>,
    pub start_date: Date,
    pub end_date: Date,
    /// Defaults to US dollars.
    pub currency: Option<String>,
}

/// A partial update of a budget. Omitted fields keep their value.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetUpdate {
    pub name: Option<String>,
    pub category: Option<Category>,
    pub amount: Option<f64>,
    pub period: Option<Frequency>,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub currency: Option<String>,
}

/// A route handler that lists the user's budgets with what has been spent
/// against each.
pub async fn list_budgets(
    State(state): State<BudgetState>,
    Extension(user_id): Extension<UserID>,
) -> Result<impl IntoResponse, Error> {
    let today = today_in(&state.local_timezone)?;
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let summaries = get_budgets(user_id, &connection)?
        .iter()
        .map(|budget| load_summary(budget, today, &connection))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(summaries))
}

/// A route handler that returns one budget with what has been spent against it.
pub async fn get_budget_endpoint(
    State(state): State<BudgetState>,
    Extension(user_id): Extension<UserID>,
    path: Result<Path<BudgetId>, PathRejection>,
) -> Result<impl IntoResponse, Error> {
    let Path(budget_id) = path?;
    let today = today_in(&state.local_timezone)?;
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let budget = get_budget(budget_id, user_id, &connection)?;

    Ok(Json(load_summary(&budget, today, &connection)?))
}

/// A route handler that creates a budget and links the user's transactions
/// in its category to it, responds with 201.
pub async fn create_budget_endpoint(
    State(state): State<BudgetState>,
    Extension(user_id): Extension<UserID>,
    payload: Result<Json<BudgetData>, JsonRejection>,
) -> Result<impl IntoResponse, Error> {
    let Json(data) = payload?;

    date_range(data.start_date, Some(data.end_date))?;
    let new_budget = NewBudget {
        name: non_empty("name", &data.name)?,
        category: data.category,
        amount: non_negative_amount(data.amount)?,
        period: data.period.unwrap_or(Frequency::Monthly),
        start_date: data.start_date,
        end_date: data.end_date,
        currency: currency_code(data.currency.as_deref())?,
    };

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let budget = create_budget(user_id, new_budget, &connection)?;
    let linked = link_transactions_to_budget(&budget, &connection).inspect_err(|error| {
        tracing::error!("Budget {} was created but linking failed: {error}", budget.id)
    })?;
    tracing::debug!(
        "Created budget {} for user {user_id} and linked {linked} transactions",
        budget.id
    );

    Ok((StatusCode::CREATED, Json(budget)))
}

/// A route handler that applies a partial update to a budget.
///
/// Transaction links are not moved when the category changes.
pub async fn update_budget_endpoint(
    State(state): State<BudgetState>,
    Extension(user_id): Extension<UserID>,
    path: Result<Path<BudgetId>, PathRejection>,
    payload: Result<Json<BudgetUpdate>, JsonRejection>,
) -> Result<impl IntoResponse, Error> {
    let Path(budget_id) = path?;
    let Json(update) = payload?;

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let existing = get_budget(budget_id, user_id, &connection)?;
    let updated = apply_update(existing, update)?;
    update_budget(&updated, &connection)?;

    Ok(Json(updated))
}

fn apply_update(mut budget: Budget, update: BudgetUpdate) -> Result<Budget, Error> {
    if let Some(name) = update.name {
        budget.name = non_empty("name", &name)?;
    }
    if let Some(category) = update.category {
        budget.category = category;
    }
    if let Some(amount) = update.amount {
        budget.amount = non_negative_amount(amount)?;
    }
    if let Some(period) = update.period {
        budget.period = period;
    }
    if let Some(start_date) = update.start_date {
        budget.start_date = start_date;
    }
    if let Some(end_date) = update.end_date {
        budget.end_date = end_date;
    }
    if let Some(currency) = update.currency {
        budget.currency = currency_code(Some(&currency))?;
    }

    date_range(budget.start_date, Some(budget.end_date))?;

    Ok(budget)
}

/// A route handler that deletes a budget and clears the link of every
/// transaction that pointed at it.
pub async fn delete_budget_endpoint(
    State(state): State<BudgetState>,
    Extension(user_id): Extension<UserID>,
    path: Result<Path<BudgetId>, PathRejection>,
) -> Result<impl IntoResponse, Error> {
    let Path(budget_id) = path?;
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    if delete_budget(budget_id, user_id, &connection)? == 0 {
        return Err(Error::NotFound);
    }

    let unlinked = unlink_transactions_from_budget(budget_id, user_id, &connection)
        .inspect_err(|error| {
            tracing::error!("Budget {budget_id} was deleted but unlinking failed: {error}")
        })?;
    tracing::debug!("Deleted budget {budget_id} and unlinked {unlinked} transactions");

    Ok(Json(json!({ "message": "Budget deleted successfully" })))
}

/// A route handler that summarises every budget of the user in a category.
///
/// Responds with an empty list when the user has no budget for the category.
pub async fn get_budget_summary(
    State(state): State<BudgetState>,
    Extension(user_id): Extension<UserID>,
    path: Result<Path<Category>, PathRejection>,
) -> Result<impl IntoResponse, Error> {
    let Path(category) = path?;
    let today = today_in(&state.local_timezone)?;
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let summaries = get_budgets_by_category(user_id, category, &connection)?
        .iter()
        .map(|budget| load_summary(budget, today, &connection))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(summaries))
}
