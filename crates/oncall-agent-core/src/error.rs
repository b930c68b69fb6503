//! Error types for the table metadata check

use thiserror::Error;

/// Errors that can occur while answering a `check_table_metadata` call
#[derive(Debug, Error)]
pub enum CheckError {
    /// A mandatory action parameter was absent or blank
    #[error("Missing mandatory parameter: {0}")]
    MissingParameter(&'static str),

    /// The table name cannot be used as a warehouse identifier
    #[error("Invalid table name '{name}': {reason}")]
    InvalidTableName { name: String, reason: String },

    /// The connection secret could not be fetched
    #[error("Secret '{secret_id}' could not be retrieved: {reason}")]
    SecretUnavailable { secret_id: String, reason: String },

    /// The connection secret was fetched but is not a usable warehouse secret
    #[error("Secret '{secret_id}' is malformed: {reason}")]
    MalformedSecret { secret_id: String, reason: String },

    /// A warehouse call failed
    #[error("Warehouse {operation} failed: {reason}")]
    Warehouse {
        operation: &'static str,
        reason: String,
    },
}

impl CheckError {
    pub fn warehouse(operation: &'static str, reason: impl std::fmt::Display) -> Self {
        Self::Warehouse {
            operation,
            reason: reason.to_string(),
        }
    }

    /// True when the caller supplied bad input rather than the backend failing
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::MissingParameter(_) | Self::InvalidTableName { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_parameter_message_names_the_parameter() {
        let err = CheckError::MissingParameter("table_name");
        assert_eq!(err.to_string(), "Missing mandatory parameter: table_name");
        assert!(err.is_client_error());
    }

    #[test]
    fn warehouse_errors_are_not_client_errors() {
        let err = CheckError::warehouse("query", "statement FAILED");
        assert_eq!(err.to_string(), "Warehouse query failed: statement FAILED");
        assert!(!err.is_client_error());
    }
}
