//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Json, Router, middleware,
    response::IntoResponse,
    routing::{delete, get, post},
};
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::{
    AppState, Error,
    analytics::{get_cash_flow, get_spending_by_category},
    auth::{auth_guard, get_me, get_preferences, log_in, log_out, put_preferences, register},
    budget::{
        create_budget_endpoint, delete_budget_endpoint, get_budget_endpoint, get_budget_summary,
        list_budgets, update_budget_endpoint,
    },
    endpoints,
    recurring::{
        create_recurring_expense_endpoint, delete_recurring_expense_endpoint,
        get_recurring_expense_endpoint, list_recurring_expenses,
        update_recurring_expense_endpoint,
    },
    transaction::{
        cancel_recurring_transaction, create_transaction_endpoint, delete_transaction_endpoint,
        export_transactions_csv, get_transaction_endpoint, list_recurring_transactions,
        list_transactions, update_transaction_endpoint,
    },
};

/// Return a router with all the app's routes.
///
/// Every route except the root, registration and log-in requires a bearer token.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::ROOT, get(get_root))
        .route(endpoints::REGISTER, post(register))
        .route(endpoints::LOG_IN, post(log_in));

    let protected_routes = Router::new()
        .route(endpoints::LOG_OUT, post(log_out))
        .route(endpoints::ME, get(get_me))
        .route(
            endpoints::PREFERENCES,
            get(get_preferences).put(put_preferences),
        )
        .route(
            endpoints::TRANSACTIONS,
            get(list_transactions).post(create_transaction_endpoint),
        )
        .route(endpoints::TRANSACTIONS_CSV, get(export_transactions_csv))
        .route(
            endpoints::RECURRING_TRANSACTIONS,
            get(list_recurring_transactions),
        )
        .route(
            endpoints::CANCEL_RECURRING_TRANSACTION,
            delete(cancel_recurring_transaction),
        )
        .route(
            endpoints::TRANSACTION,
            get(get_transaction_endpoint)
                .put(update_transaction_endpoint)
                .delete(delete_transaction_endpoint),
        )
        .route(
            endpoints::BUDGETS,
            get(list_budgets).post(create_budget_endpoint),
        )
        .route(endpoints::BUDGET_SUMMARY, get(get_budget_summary))
        .route(
            endpoints::BUDGET,
            get(get_budget_endpoint)
                .put(update_budget_endpoint)
                .delete(delete_budget_endpoint),
        )
        .route(
            endpoints::RECURRING,
            get(list_recurring_expenses).post(create_recurring_expense_endpoint),
        )
        .route(
            endpoints::RECURRING_EXPENSE,
            get(get_recurring_expense_endpoint)
                .put(update_recurring_expense_endpoint)
                .delete(delete_recurring_expense_endpoint),
        )
        .route(
            endpoints::SPENDING_BY_CATEGORY,
            get(get_spending_by_category),
        )
        .route(endpoints::CASH_FLOW, get(get_cash_flow))
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    protected_routes
        .merge(unprotected_routes)
        .fallback(get_404_not_found)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Report that the API is up.
async fn get_root() -> impl IntoResponse {
    Json(json!({ "message": "Cashflow Vision API is running" }))
}

async fn get_404_not_found() -> Error {
    Error::NotFound
}
