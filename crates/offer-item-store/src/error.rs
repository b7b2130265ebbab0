//! Translation of driver errors into domain errors.

use offer_item_core::error::DomainError;
use tracing::warn;

/// `serialization_failure`: a concurrent transaction won.
const SERIALIZATION_FAILURE: &str = "40001";
/// `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

/// Maps a driver error onto the domain taxonomy. Serialization failures and
/// unique violations become conflicts; everything else is infrastructure.
pub(crate) fn map_sqlx(err: sqlx::Error) -> DomainError {
    if let sqlx::Error::Database(db) = &err {
        match db.code().as_deref() {
            Some(SERIALIZATION_FAILURE) => {
                warn!(error = %db, "serialization failure");
                return DomainError::Conflict("concurrent update, retry the request".into());
            }
            Some(UNIQUE_VIOLATION) => {
                return DomainError::Conflict(db.message().to_owned());
            }
            _ => {}
        }
    }
    DomainError::Infrastructure(err.to_string())
}

/// Wraps a failed decode of a stored value. Stored rows that no longer
/// decode are a server fault, not a client one.
pub(crate) fn corrupt(column: &str, err: impl std::fmt::Display) -> DomainError {
    DomainError::Infrastructure(format!("cannot decode column {column}: {err}"))
}
