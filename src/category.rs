//! The fixed set of categories that transactions, budgets and recurring
//! expenses are filed under.

use std::{fmt::Display, str::FromStr};

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

/// The string did not name one of the known categories.
#[derive(Debug, thiserror::Error, PartialEq)]
#[error("\"{0}\" is not a valid category")]
pub struct CategoryError(pub String);

/// What a transaction was for, e.g. 'Food' for an expense or 'Salary' for income.
///
/// The set is closed: the API rejects names that are not listed here.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Food,
    Transport,
    Shopping,
    Bills,
    Entertainment,
    Healthcare,
    Salary,
    Freelance,
    Investment,
    Gift,
    Other,
}

impl Category {
    /// Every category, in display order.
    pub const ALL: [Category; 11] = [
        Category::Food,
        Category::Transport,
        Category::Shopping,
        Category::Bills,
        Category::Entertainment,
        Category::Healthcare,
        Category::Salary,
        Category::Freelance,
        Category::Investment,
        Category::Gift,
        Category::Other,
    ];

    /// The name used on the wire and in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Food => "Food",
            Category::Transport => "Transport",
            Category::Shopping => "Shopping",
            Category::Bills => "Bills",
            Category::Entertainment => "Entertainment",
            Category::Healthcare => "Healthcare",
            Category::Salary => "Salary",
            Category::Freelance => "Freelance",
            Category::Investment => "Investment",
            Category::Gift => "Gift",
            Category::Other => "Other",
        }
    }
}

impl FromStr for Category {
    type Err = CategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| CategoryError(s.to_owned()))
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for Category {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Category {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error| FromSqlError::Other(Box::new(error)))
    }
}
