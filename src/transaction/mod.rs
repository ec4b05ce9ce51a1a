//! Transaction management for the budgeting application.
//!
//! This module contains everything related to transactions:
//! - The `Transaction` model and `TransactionBuilder` for creating transactions
//! - Database functions for storing, querying, and managing transactions
//! - Route handlers for the transaction API and the CSV export

mod core;
mod endpoints;
mod export;
mod query;

pub use core::{
    Transaction, TransactionBuilder, TransactionType, create_transaction,
    create_transaction_table, delete_transaction, get_transaction, map_transaction_row,
    update_transaction,
};
pub use endpoints::{
    TransactionState, cancel_recurring_transaction, create_transaction_endpoint,
    delete_transaction_endpoint, get_transaction_endpoint, list_recurring_transactions,
    list_transactions, update_transaction_endpoint,
};
pub use export::export_transactions_csv;
pub use query::{
    TransactionFilter, cancel_recurring_flag, get_recurring_transactions, query_transactions,
};
