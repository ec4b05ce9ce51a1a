//! Defines the core data models and database queries for transactions.

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    Connection, Row, ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error,
    auth::{DEFAULT_CURRENCY, UserID},
    category::Category,
    database_id::{BudgetId, RowsAffected, TransactionId},
    frequency::Frequency,
};

// ============================================================================
// MODELS
// ============================================================================

/// Whether money was spent or earned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Money spent.
    Expense,
    /// Money earned.
    Income,
}

impl TransactionType {
    /// The lowercase name used on the wire and in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Expense => "expense",
            TransactionType::Income => "income",
        }
    }
}

impl Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "expense" => Ok(TransactionType::Expense),
            "income" => Ok(TransactionType::Income),
            other => Err(format!("unknown transaction type \"{other}\"")),
        }
    }
}

impl ToSql for TransactionType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TransactionType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error: String| FromSqlError::Other(error.into()))
    }
}

/// An expense or income, i.e. an event where money was either spent or earned.
///
/// To create a new `Transaction`, use [Transaction::build].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The user that owns the transaction.
    pub user_id: UserID,
    /// A text description of what the transaction was for.
    pub description: String,
    /// The amount of money spent or earned, always non-negative.
    pub amount: f64,
    /// Whether the money was spent or earned.
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// What the money was spent on or where it came from.
    pub category: Category,
    /// When the transaction happened.
    pub date: Date,
    /// The uppercase currency code.
    pub currency: String,
    /// A link to or name of a receipt.
    pub receipt: Option<String>,
    /// Whether the transaction is flagged as recurring.
    pub is_recurring: bool,
    /// How often a recurring transaction repeats.
    pub recurring_pattern: Option<Frequency>,
    /// The budget the transaction counts towards.
    pub budget_id: Option<BudgetId>,
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// Shortcut for [TransactionBuilder] for discoverability.
    pub fn build(amount: f64, date: Date, description: &str) -> TransactionBuilder {
        TransactionBuilder {
            description: description.to_owned(),
            amount,
            transaction_type: TransactionType::Expense,
            category: Category::Other,
            date,
            currency: DEFAULT_CURRENCY.to_owned(),
            receipt: None,
            recurring_pattern: None,
            budget_id: None,
        }
    }
}

/// A builder for creating [Transaction] instances.
///
/// Expenses in the "Other" category and in US dollars are the defaults.
/// The builder does not validate its fields, use it with input that has
/// already been checked.
///
/// # Examples
///
/// ```ignore
/// use time::macros::date;
///
/// let builder = Transaction::build(45.99, date!(2025 - 01 - 15), "Groceries")
///     .category(Category::Food);
/// let transaction = create_transaction(user_id, builder, &connection)?;
/// ```
#[derive(Debug, PartialEq, Clone)]
pub struct TransactionBuilder {
    /// A human-readable description of the transaction.
    pub description: String,
    /// The non-negative amount of money.
    pub amount: f64,
    /// Whether the money was spent or earned.
    pub transaction_type: TransactionType,
    /// What the money was for.
    pub category: Category,
    /// When the money moved.
    pub date: Date,
    /// The uppercase currency code.
    pub currency: String,
    /// A link to or name of a receipt.
    pub receipt: Option<String>,
    /// `Some` marks the transaction as recurring with this frequency.
    pub recurring_pattern: Option<Frequency>,
    /// The budget the transaction counts towards.
    pub budget_id: Option<BudgetId>,
}

impl TransactionBuilder {
    /// Set whether the transaction is an expense or income.
    pub fn transaction_type(mut self, transaction_type: TransactionType) -> Self {
        self.transaction_type = transaction_type;
        self
    }

    /// Set the category for the transaction.
    pub fn category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    /// Set the currency code for the transaction.
    pub fn currency(mut self, currency: &str) -> Self {
        self.currency = currency.to_owned();
        self
    }

    /// Set the receipt for the transaction.
    pub fn receipt(mut self, receipt: Option<String>) -> Self {
        self.receipt = receipt;
        self
    }

    /// Flag the transaction as recurring with `pattern`.
    pub fn recurring_pattern(mut self, pattern: Option<Frequency>) -> Self {
        self.recurring_pattern = pattern;
        self
    }

    /// Set the budget the transaction counts towards.
    pub fn budget_id(mut self, budget_id: Option<BudgetId>) -> Self {
        self.budget_id = budget_id;
        self
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

pub(crate) const TRANSACTION_COLUMNS: &str = "id, user_id, description, amount, type, category, \
    date, currency, receipt, is_recurring, recurring_pattern, budget_id";

/// Create a new transaction for `user_id` in the database from a builder.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn create_transaction(
    user_id: UserID,
    builder: TransactionBuilder,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(&format!(
            "INSERT INTO \"transaction\" (user_id, description, amount, type, category, date, \
             currency, receipt, is_recurring, recurring_pattern, budget_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             RETURNING {TRANSACTION_COLUMNS}"
        ))?
        .query_row(
            rusqlite::params![
                user_id.as_i64(),
                builder.description,
                builder.amount,
                builder.transaction_type,
                builder.category,
                builder.date,
                builder.currency,
                builder.receipt,
                builder.recurring_pattern.is_some(),
                builder.recurring_pattern,
                builder.budget_id,
            ],
            map_transaction_row,
        )?;

    Ok(transaction)
}

/// Retrieve the transaction `id` owned by `user_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a transaction owned by the user,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_transaction(
    id: TransactionId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" WHERE id = :id AND user_id = :user_id"
        ))?
        .query_row(
            &[(":id", &id), (":user_id", &user_id.as_i64())],
            map_transaction_row,
        )?;

    Ok(transaction)
}

/// Overwrite the stored fields of `transaction`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the transaction does not exist for its user,
/// - or [Error::SqlError] there is some other SQL error.
pub fn update_transaction(transaction: &Transaction, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE \"transaction\"
         SET description = ?1, amount = ?2, type = ?3, category = ?4, date = ?5, currency = ?6,
             receipt = ?7, is_recurring = ?8, recurring_pattern = ?9, budget_id = ?10
         WHERE id = ?11 AND user_id = ?12",
        rusqlite::params![
            transaction.description,
            transaction.amount,
            transaction.transaction_type,
            transaction.category,
            transaction.date,
            transaction.currency,
            transaction.receipt,
            transaction.is_recurring,
            transaction.recurring_pattern,
            transaction.budget_id,
            transaction.id,
            transaction.user_id.as_i64(),
        ],
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Delete the transaction `id` owned by `user_id`.
///
/// Returns the number of deleted rows, zero when the transaction does not
/// exist for the user.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn delete_transaction(
    id: TransactionId,
    user_id: UserID,
    connection: &Connection,
) -> Result<RowsAffected, Error> {
    connection
        .execute(
            "DELETE FROM \"transaction\" WHERE id = :id AND user_id = :user_id",
            &[(":id", &id), (":user_id", &user_id.as_i64())],
        )
        .map_err(|err| err.into())
}

/// Create the transaction table in the database.
///
/// `budget_id` is not a foreign key. Deleting a budget clears its links in a
/// separate statement.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                description TEXT NOT NULL,
                amount REAL NOT NULL CHECK (amount >= 0),
                type TEXT NOT NULL,
                category TEXT NOT NULL,
                date TEXT NOT NULL,
                currency TEXT NOT NULL DEFAULT 'USD',
                receipt TEXT,
                is_recurring INTEGER NOT NULL DEFAULT 0,
                recurring_pattern TEXT,
                budget_id INTEGER,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    // Used by the budget summaries and the filtered transaction list.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_user_category_date
         ON \"transaction\"(user_id, category, date);",
        (),
    )?;

    Ok(())
}

/// Map a database row to a Transaction.
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        description: row.get(2)?,
        amount: row.get(3)?,
        transaction_type: row.get(4)?,
        category: row.get(5)?,
        date: row.get(6)?,
        currency: row.get(7)?,
        receipt: row.get(8)?,
        is_recurring: row.get(9)?,
        recurring_pattern: row.get(10)?,
        budget_id: row.get(11)?,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod database_tests {
    use rusqlite::Connection;
    use time::{OffsetDateTime, macros::date};

    use crate::{
        Error,
        auth::{NewUser, PasswordHash, UserID, create_user},
        category::Category,
        db::initialize,
        frequency::Frequency,
        transaction::{
            Transaction, TransactionType, create_transaction, delete_transaction,
            get_transaction, update_transaction,
        },
    };

    fn get_test_connection() -> (Connection, UserID) {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        let user = create_user(
            NewUser {
                name: "Test".to_owned(),
                username: "test".to_owned(),
                email: "test@example.com".to_owned(),
                password_hash: PasswordHash::from_stored("hunter2".to_owned()),
            },
            OffsetDateTime::now_utc(),
            &conn,
        )
        .unwrap();

        (conn, user.id)
    }

    #[test]
    fn create_succeeds() {
        let (conn, user_id) = get_test_connection();

        let transaction = create_transaction(
            user_id,
            Transaction::build(12.3, date!(2025 - 10 - 05), "Lunch")
                .category(Category::Food)
                .currency("NZD"),
            &conn,
        )
        .expect("Could not create transaction");

        assert_eq!(transaction.amount, 12.3);
        assert_eq!(transaction.user_id, user_id);
        assert_eq!(transaction.category, Category::Food);
        assert_eq!(transaction.transaction_type, TransactionType::Expense);
        assert_eq!(transaction.currency, "NZD");
        assert!(!transaction.is_recurring);
        assert_eq!(transaction.budget_id, None);
    }

    #[test]
    fn create_with_pattern_flags_recurring() {
        let (conn, user_id) = get_test_connection();

        let transaction = create_transaction(
            user_id,
            Transaction::build(15.0, date!(2025 - 10 - 05), "Streaming")
                .recurring_pattern(Some(Frequency::Monthly)),
            &conn,
        )
        .unwrap();

        assert!(transaction.is_recurring);
        assert_eq!(transaction.recurring_pattern, Some(Frequency::Monthly));
    }

    #[test]
    fn get_is_scoped_to_owner() {
        let (conn, user_id) = get_test_connection();
        let transaction = create_transaction(
            user_id,
            Transaction::build(1.0, date!(2025 - 10 - 05), ""),
            &conn,
        )
        .unwrap();

        assert_eq!(
            get_transaction(transaction.id, user_id, &conn),
            Ok(transaction.clone())
        );
        assert_eq!(
            get_transaction(transaction.id, UserID::new(user_id.as_i64() + 1), &conn),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn update_overwrites_fields() {
        let (conn, user_id) = get_test_connection();
        let mut transaction = create_transaction(
            user_id,
            Transaction::build(1.0, date!(2025 - 10 - 05), "Old"),
            &conn,
        )
        .unwrap();

        transaction.description = "New".to_owned();
        transaction.transaction_type = TransactionType::Income;
        transaction.category = Category::Salary;
        update_transaction(&transaction, &conn).unwrap();

        assert_eq!(get_transaction(transaction.id, user_id, &conn), Ok(transaction));
    }

    #[test]
    fn update_missing_transaction_is_not_found() {
        let (conn, user_id) = get_test_connection();
        let mut transaction = create_transaction(
            user_id,
            Transaction::build(1.0, date!(2025 - 10 - 05), ""),
            &conn,
        )
        .unwrap();
        transaction.id += 100;

        assert_eq!(update_transaction(&transaction, &conn), Err(Error::NotFound));
    }

    #[test]
    fn delete_removes_only_owned_transaction() {
        let (conn, user_id) = get_test_connection();
        let transaction = create_transaction(
            user_id,
            Transaction::build(1.0, date!(2025 - 10 - 05), ""),
            &conn,
        )
        .unwrap();

        let other_user = UserID::new(user_id.as_i64() + 1);
        assert_eq!(delete_transaction(transaction.id, other_user, &conn), Ok(0));
        assert_eq!(delete_transaction(transaction.id, user_id, &conn), Ok(1));
        assert_eq!(
            get_transaction(transaction.id, user_id, &conn),
            Err(Error::NotFound)
        );
    }
}
