//! Aggregates the spending against a budget.

use rusqlite::Connection;
use serde::Serialize;
use time::Date;

use crate::{
    Error,
    budget::{Budget, BudgetWindow, resolve_window},
    transaction::{Transaction, TransactionFilter, TransactionType, query_transactions},
};

/// A budget with how much of it has been spent in its current window.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetSummary {
    /// The budget being summarised.
    #[serde(flatten)]
    pub budget: Budget,
    /// The total of the matching expenses.
    pub spent: f64,
    /// The amount minus what was spent, negative when overspent.
    pub remaining: f64,
    /// What was spent as a percentage of the amount, zero for a zero amount.
    pub percentage: f64,
}

/// Sum the expenses in `transactions` that count against `budget` in `window`.
///
/// Only expenses in the budget's category whose date lies in the window
/// count, income never does.
pub fn summarize(budget: &Budget, window: BudgetWindow, transactions: &[Transaction]) -> BudgetSummary {
    let spent: f64 = transactions
        .iter()
        .filter(|transaction| {
            transaction.transaction_type == TransactionType::Expense
                && transaction.category == budget.category
                && window.contains(transaction.date)
        })
        .map(|transaction| transaction.amount)
        .sum();

    let percentage = if budget.amount > 0.0 {
        spent / budget.amount * 100.0
    } else {
        0.0
    };

    BudgetSummary {
        budget: budget.clone(),
        spent,
        remaining: budget.amount - spent,
        percentage,
    }
}

/// Load the user's expenses for `budget`'s window on `today` and summarise them.
///
/// # Errors
/// Returns [Error::SqlError] if the transactions cannot be queried.
pub fn load_summary(budget: &Budget, today: Date, connection: &Connection) -> Result<BudgetSummary, Error> {
    let window = resolve_window(budget, today);
    let filter = TransactionFilter {
        transaction_type: Some(TransactionType::Expense),
        category: Some(budget.category),
        start_date: Some(window.start),
        end_date: Some(window.end),
    };
    let transactions = query_transactions(budget.user_id, &filter, connection)?;

    Ok(summarize(budget, window, &transactions))
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use crate::{
        auth::UserID,
        budget::{Budget, BudgetWindow},
        category::Category,
        frequency::Frequency,
        transaction::{Transaction, TransactionType},
    };

    use super::summarize;

    fn budget(amount: f64) -> Budget {
        Budget {
            id: 1,
            user_id: UserID::new(1),
            name: "Groceries".to_owned(),
            category: Category::Food,
            amount,
            period: Frequency::Monthly,
            start_date: date!(2024 - 03 - 01),
            end_date: date!(2024 - 03 - 31),
            currency: "USD".to_owned(),
        }
    }

    fn transaction(
        amount: f64,
        transaction_type: TransactionType,
        category: Category,
        date: time::Date,
    ) -> Transaction {
        Transaction {
            id: 0,
            user_id: UserID::new(1),
            description: "test".to_owned(),
            amount,
            transaction_type,
            category,
            date,
            currency: "USD".to_owned(),
            receipt: None,
            is_recurring: false,
            recurring_pattern: None,
            budget_id: None,
        }
    }

    const MARCH: BudgetWindow = BudgetWindow {
        start: date!(2024 - 03 - 01),
        end: date!(2024 - 03 - 31),
    };

    #[test]
    fn sums_matching_expenses() {
        let transactions = [
            transaction(30.0, TransactionType::Expense, Category::Food, date!(2024 - 03 - 05)),
            transaction(45.0, TransactionType::Expense, Category::Food, date!(2024 - 03 - 31)),
        ];

        let summary = summarize(&budget(100.0), MARCH, &transactions);

        assert_eq!(summary.spent, 75.0);
        assert_eq!(summary.remaining, 25.0);
        assert_eq!(summary.percentage, 75.0);
    }

    #[test]
    fn ignores_income_other_categories_and_dates_outside_window() {
        let transactions = [
            transaction(10.0, TransactionType::Expense, Category::Food, date!(2024 - 03 - 01)),
            transaction(500.0, TransactionType::Income, Category::Food, date!(2024 - 03 - 10)),
            transaction(20.0, TransactionType::Expense, Category::Bills, date!(2024 - 03 - 10)),
            transaction(40.0, TransactionType::Expense, Category::Food, date!(2024 - 02 - 29)),
            transaction(80.0, TransactionType::Expense, Category::Food, date!(2024 - 04 - 01)),
        ];

        let summary = summarize(&budget(100.0), MARCH, &transactions);

        assert_eq!(summary.spent, 10.0);
    }

    #[test]
    fn overspending_gives_negative_remaining() {
        let transactions = [transaction(
            150.0,
            TransactionType::Expense,
            Category::Food,
            date!(2024 - 03 - 05),
        )];

        let summary = summarize(&budget(100.0), MARCH, &transactions);

        assert_eq!(summary.remaining, -50.0);
        assert_eq!(summary.percentage, 150.0);
    }

    #[test]
    fn zero_amount_has_zero_percentage() {
        let transactions = [transaction(
            12.0,
            TransactionType::Expense,
            Category::Food,
            date!(2024 - 03 - 05),
        )];

        let summary = summarize(&budget(0.0), MARCH, &transactions);

        assert_eq!(summary.spent, 12.0);
        assert_eq!(summary.percentage, 0.0);
        assert!(summary.percentage.is_finite());
    }

    #[test]
    fn no_transactions_spends_nothing() {
        let summary = summarize(&budget(100.0), MARCH, &[]);

        assert_eq!(summary.spent, 0.0);
        assert_eq!(summary.remaining, 100.0);
        assert_eq!(summary.percentage, 0.0);
    }

    #[test]
    fn serializes_budget_fields_alongside_derived_fields() {
        let summary = summarize(&budget(100.0), MARCH, &[]);

        let json = serde_json::to_value(&summary).unwrap();

        assert_eq!(json["name"], "Groceries");
        assert_eq!(json["startDate"], "2024-03-01");
        assert_eq!(json["spent"], 0.0);
        assert_eq!(json["remaining"], 100.0);
    }
}
