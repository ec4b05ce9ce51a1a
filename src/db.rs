//! Creates the application's database schema.

use rusqlite::{Connection, Transaction as SqlTransaction};

use crate::{
    auth::create_user_table, budget::create_budget_table,
    recurring::create_recurring_expense_table, transaction::create_transaction_table,
};

/// Create the all of the database tables for the application.
///
/// The tables are created inside a single exclusive transaction, so either
/// every table exists afterwards or none were added.
///
/// # Errors
/// This function may return a [rusqlite::Error] if something went wrong creating the tables.
pub fn initialize(connection: &Connection) -> Result<(), rusqlite::Error> {
    let transaction =
        SqlTransaction::new_unchecked(connection, rusqlite::TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;
    create_budget_table(&transaction)?;
    create_transaction_table(&transaction)?;
    create_recurring_expense_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}
