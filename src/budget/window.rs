//! Resolves the date range a budget's spending is measured over.

use serde::Serialize;
use time::{Date, Duration};

use crate::{budget::Budget, frequency::Frequency, frequency::days_in_month};

/// An inclusive date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetWindow {
    /// The first day counted.
    pub start: Date,
    /// The last day counted.
    pub end: Date,
}

impl BudgetWindow {
    /// Whether `date` lies in the window, both ends included.
    pub fn contains(&self, date: Date) -> bool {
        self.start <= date && date <= self.end
    }
}

/// The window that `budget`'s spending is measured over on `today`.
///
/// Monthly budgets track the calendar month containing `today` and ignore
/// their stored dates. Every other period uses the stored start and end
/// dates as they are.
pub fn resolve_window(budget: &Budget, today: Date) -> BudgetWindow {
    match budget.period {
        Frequency::Monthly => month_bounds(today),
        Frequency::Daily | Frequency::Weekly | Frequency::Yearly => BudgetWindow {
            start: budget.start_date,
            end: budget.end_date,
        },
    }
}

fn month_bounds(date: Date) -> BudgetWindow {
    let start = date - Duration::days(i64::from(date.day()) - 1);
    let length = days_in_month(date.year(), date.month());
    let end = start + Duration::days(i64::from(length) - 1);

    BudgetWindow { start, end }
}
