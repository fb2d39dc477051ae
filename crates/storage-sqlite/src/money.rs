//! Money columns are stored as TEXT to keep decimal values lossless in
//! SQLite.

use rust_decimal::Decimal;
use shoplink_core::errors::{DatabaseError, Error, Result};

pub(crate) fn decimal_to_db(value: &Decimal) -> String {
    value.to_string()
}

pub(crate) fn decimal_from_db(value: &str) -> Result<Decimal> {
    value.parse::<Decimal>().map_err(|err| {
        Error::Database(DatabaseError::Internal(format!(
            "Invalid decimal column value '{}': {}",
            value, err
        )))
    })
}
