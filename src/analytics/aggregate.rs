//! Totals over a user's transactions, grouped by category or by period.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::{
    category::Category,
    transaction::{Transaction, TransactionType},
};

/// The total spent in one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySpending {
    pub category: Category,
    pub total_amount: f64,
}

/// Sum the expenses in `transactions` per category, largest total first.
///
/// Income is ignored. Categories with equal totals are ordered by name.
pub fn spending_by_category(transactions: &[Transaction]) -> Vec<CategorySpending> {
    let mut totals: HashMap<Category, f64> = HashMap::new();

    for transaction in transactions
        .iter()
        .filter(|transaction| transaction.transaction_type == TransactionType::Expense)
    {
        *totals.entry(transaction.category).or_default() += transaction.amount;
    }

    let mut spending: Vec<CategorySpending> = totals
        .into_iter()
        .map(|(category, total_amount)| CategorySpending {
            category,
            total_amount,
        })
        .collect();

    spending.sort_by(|a, b| {
        b.total_amount
            .total_cmp(&a.total_amount)
            .then_with(|| a.category.cmp(&b.category))
    });

    spending
}

/// How finely the cash flow is grouped.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Interval {
    Daily,
    /// Weeks start on Sunday, days before the first Sunday of the year are week 0.
    Weekly,
    #[default]
    Monthly,
}

impl Interval {
    /// Parse the `interval` query parameter, falling back to monthly for
    /// missing or unknown values.
    pub fn from_query(value: Option<&str>) -> Self {
        match value {
            Some("daily") => Interval::Daily,
            Some("weekly") => Interval::Weekly,
            _ => Interval::Monthly,
        }
    }
}

/// The calendar period a cash flow total covers. Only the fields that the
/// interval groups by are set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Period {
    pub year: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub week: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day: Option<u8>,
}

impl Period {
    fn of(transaction: &Transaction, interval: Interval) -> Self {
        let date = transaction.date;

        match interval {
            Interval::Daily => Period {
                year: date.year(),
                month: Some(date.month().into()),
                week: None,
                day: Some(date.day()),
            },
            Interval::Weekly => Period {
                year: date.year(),
                month: None,
                week: Some(date.sunday_based_week()),
                day: None,
            },
            Interval::Monthly => Period {
                year: date.year(),
                month: Some(date.month().into()),
                week: None,
                day: None,
            },
        }
    }
}

/// The income and expenses of one period.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CashFlow {
    pub period: Period,
    pub total_income: f64,
    pub total_expenses: f64,
}

/// Sum income and expenses in `transactions` per period, oldest period first.
pub fn cash_flow(transactions: &[Transaction], interval: Interval) -> Vec<CashFlow> {
    let mut totals: BTreeMap<Period, (f64, f64)> = BTreeMap::new();

    for transaction in transactions {
        let (income, expenses) = totals
            .entry(Period::of(transaction, interval))
            .or_default();

        match transaction.transaction_type {
            TransactionType::Income => *income += transaction.amount,
            TransactionType::Expense => *expenses += transaction.amount,
        }
    }

    totals
        .into_iter()
        .map(|(period, (total_income, total_expenses))| CashFlow {
            period,
            total_income,
            total_expenses,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use time::{Date, macros::date};

    use crate::{
        auth::UserID,
        category::Category,
        transaction::{Transaction, TransactionType},
    };

    use super::{CashFlow, CategorySpending, Interval, Period, cash_flow, spending_by_category};

    fn transaction(
        amount: f64,
        transaction_type: TransactionType,
        category: Category,
        date: Date,
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

    fn expense(amount: f64, category: Category) -> Transaction {
        transaction(amount, TransactionType::Expense, category, date!(2024 - 03 - 10))
    }

    #[test]
    fn spending_is_sorted_by_total() {
        let transactions = [
            expense(10.0, Category::Food),
            expense(50.0, Category::Bills),
            expense(15.0, Category::Food),
            transaction(
                1000.0,
                TransactionType::Income,
                Category::Salary,
                date!(2024 - 03 - 10),
            ),
        ];

        let got = spending_by_category(&transactions);

        assert_eq!(
            got,
            [
                CategorySpending {
                    category: Category::Bills,
                    total_amount: 50.0
                },
                CategorySpending {
                    category: Category::Food,
                    total_amount: 25.0
                },
            ]
        );
    }

    #[test]
    fn no_expenses_gives_empty_spending() {
        assert!(spending_by_category(&[]).is_empty());
    }

    #[test]
    fn unknown_interval_falls_back_to_monthly() {
        assert_eq!(Interval::from_query(Some("daily")), Interval::Daily);
        assert_eq!(Interval::from_query(Some("weekly")), Interval::Weekly);
        assert_eq!(Interval::from_query(Some("hourly")), Interval::Monthly);
        assert_eq!(Interval::from_query(None), Interval::Monthly);
    }

    #[test]
    fn monthly_cash_flow_is_oldest_first() {
        let transactions = [
            transaction(100.0, TransactionType::Income, Category::Salary, date!(2024 - 04 - 01)),
            transaction(30.0, TransactionType::Expense, Category::Food, date!(2024 - 03 - 15)),
            transaction(20.0, TransactionType::Expense, Category::Food, date!(2024 - 03 - 31)),
            transaction(500.0, TransactionType::Income, Category::Salary, date!(2023 - 12 - 25)),
        ];

        let got = cash_flow(&transactions, Interval::Monthly);

        let month = |year, month| Period {
            year,
            month: Some(month),
            week: None,
            day: None,
        };
        assert_eq!(
            got,
            [
                CashFlow {
                    period: month(2023, 12),
                    total_income: 500.0,
                    total_expenses: 0.0
                },
                CashFlow {
                    period: month(2024, 3),
                    total_income: 0.0,
                    total_expenses: 50.0
                },
                CashFlow {
                    period: month(2024, 4),
                    total_income: 100.0,
                    total_expenses: 0.0
                },
            ]
        );
    }

    #[test]
    fn weekly_cash_flow_starts_weeks_on_sunday() {
        // 2024-03-09 is a Saturday and 2024-03-10 is a Sunday.
        let transactions = [
            transaction(5.0, TransactionType::Expense, Category::Food, date!(2024 - 03 - 09)),
            transaction(7.0, TransactionType::Expense, Category::Food, date!(2024 - 03 - 10)),
            transaction(9.0, TransactionType::Expense, Category::Food, date!(2024 - 03 - 16)),
        ];

        let got = cash_flow(&transactions, Interval::Weekly);

        assert_eq!(got.len(), 2);
        assert_eq!(got[0].period.week, Some(9));
        assert_eq!(got[0].total_expenses, 5.0);
        assert_eq!(got[1].period.week, Some(10));
        assert_eq!(got[1].total_expenses, 16.0);
    }

    #[test]
    fn daily_cash_flow_groups_by_date() {
        let transactions = [
            transaction(5.0, TransactionType::Expense, Category::Food, date!(2024 - 03 - 09)),
            transaction(9.0, TransactionType::Income, Category::Gift, date!(2024 - 03 - 09)),
            transaction(7.0, TransactionType::Expense, Category::Food, date!(2024 - 03 - 10)),
        ];

        let got = cash_flow(&transactions, Interval::Daily);

        assert_eq!(got.len(), 2);
        assert_eq!(got[0].period.day, Some(9));
        assert_eq!(got[0].total_income, 9.0);
        assert_eq!(got[0].total_expenses, 5.0);
    }

    #[test]
    fn period_serializes_only_grouped_fields() {
        let period = Period {
            year: 2024,
            month: None,
            week: Some(10),
            day: None,
        };

        assert_eq!(
            serde_json::to_value(period).unwrap(),
            serde_json::json!({"year": 2024, "week": 10})
        );
    }
}
