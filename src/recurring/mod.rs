//! Recurring expenses: templates for expenses that repeat on a calendar
//! cadence, and the projection of their next due date.

mod core;
mod endpoints;
mod projection;

pub use core::{
    NewRecurringExpense, RecurringDeletion, RecurringExpense, create_recurring_expense,
    create_recurring_expense_table, delete_recurring_expense, get_recurring_expense,
    get_recurring_expenses, update_recurring_expense,
};
pub use endpoints::{
    create_recurring_expense_endpoint, delete_recurring_expense_endpoint,
    get_recurring_expense_endpoint, list_recurring_expenses, update_recurring_expense_endpoint,
};
pub use projection::next_occurrence;
