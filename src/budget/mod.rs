//! Budgets: spending limits per category, the window their spending is
//! measured over, and the links between budgets and transactions.

mod core;
mod endpoints;
mod linking;
mod summary;
mod window;

pub use core::{
    Budget, NewBudget, check_budget_owner, create_budget, create_budget_table, delete_budget,
    get_budget, get_budgets, get_budgets_by_category, update_budget,
};
pub use endpoints::{
    create_budget_endpoint, delete_budget_endpoint, get_budget_endpoint, get_budget_summary,
    list_budgets, update_budget_endpoint,
};
pub use linking::{link_transactions_to_budget, unlink_transactions_from_budget};
pub use summary::{BudgetSummary, load_summary};
pub use window::{BudgetWindow, resolve_window};
