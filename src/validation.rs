//! Checks shared by the transaction, budget and recurring expense inputs.

use serde::{Deserialize, Deserializer};
use time::Date;

use crate::{Error, auth::DEFAULT_CURRENCY};

/// Trim `value` and check that something is left.
///
/// # Errors
///
/// Returns [Error::EmptyField] naming `field` if the trimmed value is empty.
pub(crate) fn non_empty(field: &'static str, value: &str) -> Result<String, Error> {
    let value = value.trim();

    if value.is_empty() {
        return Err(Error::EmptyField(field));
    }

    Ok(value.to_owned())
}

/// Check that `amount` is a finite, non-negative number.
///
/// # Errors
///
/// Returns [Error::InvalidAmount] for negative amounts, NaN and infinities.
pub(crate) fn non_negative_amount(amount: f64) -> Result<f64, Error> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(Error::InvalidAmount(amount));
    }

    Ok(amount)
}

/// Uppercase a currency code, falling back to [DEFAULT_CURRENCY] when none is given.
///
/// # Errors
///
/// Returns [Error::EmptyField] if the code is present but blank.
pub(crate) fn currency_code(currency: Option<&str>) -> Result<String, Error> {
    match currency {
        Some(currency) => non_empty("currency", currency).map(|code| code.to_uppercase()),
        None => Ok(DEFAULT_CURRENCY.to_owned()),
    }
}

/// Check that `end` is not before `start`, if there is an end.
///
/// # Errors
///
/// Returns [Error::InvalidDateRange] if `end` is before `start`.
pub(crate) fn date_range(start: Date, end: Option<Date>) -> Result<(), Error> {
    match end {
        Some(end) if end < start => Err(Error::InvalidDateRange { start, end }),
        _ => Ok(()),
    }
}

/// Deserialize a field of a partial update that may be cleared.
///
/// Use with `#[serde(default, deserialize_with = "nullable")]` on an
/// `Option<Option<T>>`: an omitted field is `None`, `null` is `Some(None)`
/// and a value is `Some(Some(value))`.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
