//! Route handlers for the spending and cash flow reports.

use axum::{
    Extension, Json,
    extract::{Query, State, rejection::QueryRejection},
    response::IntoResponse,
};
use serde::Deserialize;
use time::Date;

use crate::{
    Error,
    analytics::{Interval, cash_flow, spending_by_category},
    auth::UserID,
    transaction::{TransactionFilter, TransactionState, TransactionType, query_transactions},
};

/// The query string of the analytics routes. The date bounds are inclusive.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsQuery {
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    /// One of "daily", "weekly" or "monthly", only used by the cash flow.
    pub interval: Option<String>,
}

/// A route handler for the user's expense totals per category, largest first.
pub async fn get_spending_by_category(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    query: Result<Query<AnalyticsQuery>, QueryRejection>,
) -> Result<impl IntoResponse, Error> {
    let Query(query) = query?;
    let filter = TransactionFilter {
        transaction_type: Some(TransactionType::Expense),
        start_date: query.start_date,
        end_date: query.end_date,
        ..Default::default()
    };

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;
    let transactions = query_transactions(user_id, &filter, &connection)?;

    Ok(Json(spending_by_category(&transactions)))
}

/// A route handler for the user's income and expense totals per period,
/// oldest first.
pub async fn get_cash_flow(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    query: Result<Query<AnalyticsQuery>, QueryRejection>,
) -> Result<impl IntoResponse, Error> {
    let Query(query) = query?;
    let interval = Interval::from_query(query.interval.as_deref());
    let filter = TransactionFilter {
        start_date: query.start_date,
        end_date: query.end_date,
        ..Default::default()
    };

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;
    let transactions = query_transactions(user_id, &filter, &connection)?;

    Ok(Json(cash_flow(&transactions, interval)))
}

#[cfg(test)]
mod tests {
    use axum::{Router, middleware, routing::get};
    use axum_test::TestServer;
    use serde_json::json;
    use time::macros::date;

    use crate::{
        auth::auth_guard,
        category::Category,
        endpoints,
        test_utils::{get_test_app_state, register_test_user},
        transaction::{Transaction, TransactionType, create_transaction},
    };

    use super::{get_cash_flow, get_spending_by_category};

    fn get_test_server() -> (TestServer, String) {
        let state = get_test_app_state();
        let (user_id, token) = register_test_user(&state, "jordan");
        {
            let connection = state.db_connection.lock().unwrap();
            for (amount, transaction_type, category, date) in [
                (30.0, TransactionType::Expense, Category::Food, date!(2024 - 02 - 20)),
                (45.0, TransactionType::Expense, Category::Food, date!(2024 - 03 - 05)),
                (60.0, TransactionType::Expense, Category::Bills, date!(2024 - 03 - 06)),
                (900.0, TransactionType::Income, Category::Salary, date!(2024 - 03 - 01)),
            ] {
                create_transaction(
                    user_id,
                    Transaction::build(amount, date, "test")
                        .transaction_type(transaction_type)
                        .category(category),
                    &connection,
                )
                .unwrap();
            }
        }

        let app = Router::new()
            .route(endpoints::SPENDING_BY_CATEGORY, get(get_spending_by_category))
            .route(endpoints::CASH_FLOW, get(get_cash_flow))
            .layer(middleware::from_fn_with_state(state.clone(), auth_guard))
            .with_state(state);

        (
            TestServer::try_new(app).expect("Could not create test server."),
            token,
        )
    }

    #[tokio::test]
    async fn spending_by_category_in_range() {
        let (server, token) = get_test_server();

        server
            .get(endpoints::SPENDING_BY_CATEGORY)
            .authorization_bearer(&token)
            .add_query_param("startDate", "2024-03-01")
            .add_query_param("endDate", "2024-03-31")
            .await
            .assert_json(&json!([
                {"category": "Bills", "totalAmount": 60.0},
                {"category": "Food", "totalAmount": 45.0},
            ]));
    }

    #[tokio::test]
    async fn cash_flow_defaults_to_monthly() {
        let (server, token) = get_test_server();

        server
            .get(endpoints::CASH_FLOW)
            .authorization_bearer(&token)
            .await
            .assert_json(&json!([
                {"period": {"year": 2024, "month": 2}, "totalIncome": 0.0, "totalExpenses": 30.0},
                {"period": {"year": 2024, "month": 3}, "totalIncome": 900.0, "totalExpenses": 105.0},
            ]));
    }

    #[tokio::test]
    async fn analytics_require_token() {
        let (server, _) = get_test_server();

        server
            .get(endpoints::CASH_FLOW)
            .await
            .assert_status_unauthorized();
    }
}
