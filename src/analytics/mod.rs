//! Reports over a user's transactions: where the money went and how it
//! flowed over time.

mod aggregate;
mod endpoints;

pub use aggregate::{Interval, cash_flow, spending_by_category};
pub use endpoints::{get_cash_flow, get_spending_by_category};
