//! Downloads the user's transactions as a CSV file.

use axum::{
    Extension,
    extract::{Query, State, rejection::QueryRejection},
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::IntoResponse,
};
use serde::Serialize;

use crate::{
    Error,
    auth::UserID,
    transaction::{Transaction, TransactionFilter, TransactionState, query_transactions},
};

#[derive(Serialize)]
struct CsvRow<'a> {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Description")]
    description: &'a str,
    #[serde(rename = "Category")]
    category: &'a str,
    #[serde(rename = "Type")]
    transaction_type: &'a str,
    #[serde(rename = "Amount")]
    amount: f64,
    #[serde(rename = "Currency")]
    currency: &'a str,
    #[serde(rename = "Recurring")]
    recurring: &'a str,
}

impl<'a> From<&'a Transaction> for CsvRow<'a> {
    fn from(transaction: &'a Transaction) -> Self {
        Self {
            date: transaction.date.to_string(),
            description: &transaction.description,
            category: transaction.category.as_str(),
            transaction_type: transaction.transaction_type.as_str(),
            amount: transaction.amount,
            currency: &transaction.currency,
            recurring: transaction
                .recurring_pattern
                .filter(|_| transaction.is_recurring)
                .map_or("", |pattern| pattern.as_str()),
        }
    }
}

/// Write `transactions` as CSV with a header row.
///
/// # Errors
/// Returns [Error::CsvError] if a row cannot be written.
pub fn write_csv(transactions: &[Transaction]) -> Result<String, Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    if transactions.is_empty() {
        writer
            .write_record([
                "Date",
                "Description",
                "Category",
                "Type",
                "Amount",
                "Currency",
                "Recurring",
            ])
            .map_err(|error| Error::CsvError(error.to_string()))?;
    }

    for transaction in transactions {
        writer
            .serialize(CsvRow::from(transaction))
            .map_err(|error| Error::CsvError(error.to_string()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|error| Error::CsvError(error.to_string()))?;

    String::from_utf8(bytes).map_err(|error| Error::CsvError(error.to_string()))
}

/// A route handler that responds with the user's transactions as a CSV file.
///
/// Takes the same query parameters as the transaction listing.
pub async fn export_transactions_csv(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    query: Result<Query<TransactionFilter>, QueryRejection>,
) -> Result<impl IntoResponse, Error> {
    let Query(filter) = query?;

    let transactions = {
        let connection = state
            .db_connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;

        query_transactions(user_id, &filter, &connection)?
    };

    let body = write_csv(&transactions)?;
    tracing::debug!("Exported {} transactions for user {user_id}", transactions.len());

    Ok((
        [
            (CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                CONTENT_DISPOSITION,
                "attachment; filename=\"transactions.csv\"",
            ),
        ],
        body,
    ))
}


#[cfg(test)]
mod endpoint_tests {
    use axum::{Router, http::header::CONTENT_TYPE, middleware, routing::get};
    use axum_test::TestServer;
    use time::macros::date;

    use crate::{
        auth::auth_guard,
        category::Category,
        endpoints,
        test_utils::{get_test_app_state, register_test_user},
        transaction::{Transaction, create_transaction},
    };

    use super::export_transactions_csv;

    #[tokio::test]
    async fn exports_filtered_transactions() {
        let state = get_test_app_state();
        let (user_id, token) = register_test_user(&state, "jordan");
        {
            let connection = state.db_connection.lock().unwrap();
            for (description, category) in [("Lunch", Category::Food), ("Bus", Category::Transport)]
            {
                create_transaction(
                    user_id,
                    Transaction::build(3.0, date!(2024 - 03 - 10), description).category(category),
                    &connection,
                )
                .unwrap();
            }
        }
        let app = Router::new()
            .route(endpoints::TRANSACTIONS_CSV, get(export_transactions_csv))
            .layer(middleware::from_fn_with_state(state.clone(), auth_guard))
            .with_state(state);
        let server = TestServer::try_new(app).expect("Could not create test server.");

        let response = server
            .get(endpoints::TRANSACTIONS_CSV)
            .authorization_bearer(&token)
            .add_query_param("category", "Food")
            .await;

        response.assert_status_ok();
        assert!(
            response
                .headers()
                .get(CONTENT_TYPE)
                .unwrap()
                .to_str()
                .unwrap()
                .starts_with("text/csv")
        );
        let body = response.text();
        assert!(body.contains("Lunch"));
        assert!(!body.contains("Bus"));
    }
}
