//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/api/budgets/{budget_id}', use [format_endpoint].

/// The root route which reports that the API is running.
pub const ROOT: &str = "/";

/// The route for registering a new user.
pub const REGISTER: &str = "/api/auth/register";
/// The route for logging in a user.
pub const LOG_IN: &str = "/api/auth/login";
/// The route for the client to log out the current user.
pub const LOG_OUT: &str = "/api/auth/logout";
/// The route to get the current user.
pub const ME: &str = "/api/auth/me";
/// The route to read and change the current user's preferences.
pub const PREFERENCES: &str = "/api/user/preferences";

/// The route to list and create transactions.
pub const TRANSACTIONS: &str = "/api/transactions";
/// The route to download the filtered transactions as CSV.
pub const TRANSACTIONS_CSV: &str = "/api/transactions/export/csv";
/// The route to list transactions flagged as recurring.
pub const RECURRING_TRANSACTIONS: &str = "/api/transactions/recurring";
/// The route to clear the recurring flag of a transaction.
pub const CANCEL_RECURRING_TRANSACTION: &str = "/api/transactions/{transaction_id}/recurring";
/// The route to access a single transaction.
pub const TRANSACTION: &str = "/api/transactions/{transaction_id}";

/// The route to list and create budgets.
pub const BUDGETS: &str = "/api/budgets";
/// The route to summarise the budgets of a category.
pub const BUDGET_SUMMARY: &str = "/api/budgets/summary/{category}";
/// The route to access a single budget.
pub const BUDGET: &str = "/api/budgets/{budget_id}";

/// The route to list and create recurring expenses.
pub const RECURRING: &str = "/api/recurring";
/// The route to access a single recurring expense.
pub const RECURRING_EXPENSE: &str = "/api/recurring/{recurring_expense_id}";

/// The route for expense totals per category.
pub const SPENDING_BY_CATEGORY: &str = "/api/analytics/spending-by-category";
/// The route for income and expense totals over time.
pub const CASH_FLOW: &str = "/api/analytics/cash-flow";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/api/budgets/{budget_id}', '{budget_id}' is the parameter.
///
/// This function assumes that an endpoint path only contains ASCII characters
/// and a single parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: impl std::fmt::Display) -> String {
    let param_start = match endpoint_path.find('{') {
        Some(start) => start,
        None => return endpoint_path.to_string(),
    };

    let param_end = endpoint_path[param_start..]
        .find('}')
        .map(|end| param_start + end + 1)
        .unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}

// These tests are here so that we know when we call `Uri::from_shared` it will not panic.
#[cfg(test)]
mod endpoints_tests {
    use axum::http::Uri;

    use crate::endpoints;

    use super::format_endpoint;

    fn assert_endpoint_is_valid_uri(uri: &str) {
        assert!(uri.parse::<Uri>().is_ok());
    }

    #[test]
    fn endpoints_are_valid_uris() {
        assert_endpoint_is_valid_uri(endpoints::ROOT);

        assert_endpoint_is_valid_uri(endpoints::REGISTER);
        assert_endpoint_is_valid_uri(endpoints::LOG_IN);
        assert_endpoint_is_valid_uri(endpoints::LOG_OUT);
        assert_endpoint_is_valid_uri(endpoints::ME);
        assert_endpoint_is_valid_uri(endpoints::PREFERENCES);

        assert_endpoint_is_valid_uri(endpoints::TRANSACTIONS);
        assert_endpoint_is_valid_uri(endpoints::TRANSACTIONS_CSV);
        assert_endpoint_is_valid_uri(endpoints::RECURRING_TRANSACTIONS);
        assert_endpoint_is_valid_uri(endpoints::CANCEL_RECURRING_TRANSACTION);
        assert_endpoint_is_valid_uri(endpoints::TRANSACTION);

        assert_endpoint_is_valid_uri(endpoints::BUDGETS);
        assert_endpoint_is_valid_uri(endpoints::BUDGET_SUMMARY);
        assert_endpoint_is_valid_uri(endpoints::BUDGET);

        assert_endpoint_is_valid_uri(endpoints::RECURRING);
        assert_endpoint_is_valid_uri(endpoints::RECURRING_EXPENSE);

        assert_endpoint_is_valid_uri(endpoints::SPENDING_BY_CATEGORY);
        assert_endpoint_is_valid_uri(endpoints::CASH_FLOW);
    }

    #[test]
    fn formats_id_parameter() {
        assert_eq!(format_endpoint(endpoints::BUDGET, 42), "/api/budgets/42");
    }

    #[test]
    fn formats_parameter_in_middle_of_path() {
        assert_eq!(
            format_endpoint(endpoints::CANCEL_RECURRING_TRANSACTION, 7),
            "/api/transactions/7/recurring"
        );
    }

    #[test]
    fn formats_text_parameter() {
        assert_eq!(
            format_endpoint(endpoints::BUDGET_SUMMARY, "Food"),
            "/api/budgets/summary/Food"
        );
    }

    #[test]
    fn path_without_parameter_is_unchanged() {
        assert_eq!(
            format_endpoint(endpoints::BUDGETS, 1),
            endpoints::BUDGETS
        );
    }
}
