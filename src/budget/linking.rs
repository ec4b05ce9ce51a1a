//! Keeps the `budgetId` of transactions in step with the budgets of their
//! category.
//!
//! These run as separate statements after the budget itself has been written.
//! A failure here is reported as [Error::BudgetLinkFailed] and does not undo
//! the budget write.

use rusqlite::Connection;

use crate::{
    Error,
    auth::UserID,
    budget::Budget,
    database_id::{BudgetId, RowsAffected},
};

/// Point every transaction of `budget`'s owner in `budget`'s category at
/// `budget`, replacing any previous link.
///
/// # Errors
/// Returns [Error::BudgetLinkFailed] if the update fails.
pub fn link_transactions_to_budget(
    budget: &Budget,
    connection: &Connection,
) -> Result<RowsAffected, Error> {
    connection
        .execute(
            "UPDATE \"transaction\" SET budget_id = ?1 WHERE user_id = ?2 AND category = ?3",
            (budget.id, budget.user_id.as_i64(), budget.category),
        )
        .map_err(|error| Error::BudgetLinkFailed(error.to_string()))
}

/// Clear the link of every transaction of `user_id` that points at `budget_id`.
/// No transaction is deleted.
///
/// # Errors
/// Returns [Error::BudgetLinkFailed] if the update fails.
pub fn unlink_transactions_from_budget(
    budget_id: BudgetId,
    user_id: UserID,
    connection: &Connection,
) -> Result<RowsAffected, Error> {
    connection
        .execute(
            "UPDATE \"transaction\" SET budget_id = NULL WHERE user_id = ?1 AND budget_id = ?2",
            (user_id.as_i64(), budget_id),
        )
        .map_err(|error| Error::BudgetLinkFailed(error.to_string()))
}
