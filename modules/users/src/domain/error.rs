use thiserror::Error;

use crate::contract::model::User;
use crate::domain::validation::ValidationError;

/// Failures reported by a `UsersRepository`.
///
/// An absent row is never an error; lookups return `Ok(None)`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Connection could not be established (refused, auth, timeout).
    #[error("backend unavailable: {message}")]
    Unavailable { message: String },

    #[error("unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    #[error("{op} failed: {message}")]
    Statement { op: &'static str, message: String },
}

impl StoreError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn unique_violation(constraint: impl Into<String>) -> Self {
        Self::UniqueViolation {
            constraint: constraint.into(),
        }
    }

    pub fn statement(op: &'static str, message: impl Into<String>) -> Self {
        Self::Statement {
            op,
            message: message.into(),
        }
    }
}

/// Domain-specific errors using thiserror
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("User with email '{email}' already exists")]
    EmailAlreadyExists {
        email: String,
        existing: Option<User>,
    },

    #[error("User not found: {id}")]
    UserNotFound { id: i32 },

    #[error("User not found: {email}")]
    EmailNotFound { email: String },

    #[error("User '{email}' was not found after insert")]
    NotPersisted { email: String },

    #[error("Backend unavailable: {message}")]
    BackendUnavailable { message: String },

    #[error("Database error: {message}")]
    Database { message: String },
}

impl DomainError {
    pub fn email_already_exists(email: impl Into<String>, existing: Option<User>) -> Self {
        Self::EmailAlreadyExists {
            email: email.into(),
            existing,
        }
    }

    pub fn user_not_found(id: i32) -> Self {
        Self::UserNotFound { id }
    }

    pub fn email_not_found(email: impl Into<String>) -> Self {
        Self::EmailNotFound {
            email: email.into(),
        }
    }

    pub fn not_persisted(email: impl Into<String>) -> Self {
        Self::NotPersisted {
            email: email.into(),
        }
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    /// True for failures caused by the request itself (bad input, unknown user, taken email).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::EmailAlreadyExists { .. }
                | Self::UserNotFound { .. }
                | Self::EmailNotFound { .. }
        )
    }
}

impl From<StoreError> for DomainError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Unavailable { message } => Self::BackendUnavailable { message },
            other => Self::database(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_store_error_stays_distinct() {
        let e: DomainError = StoreError::unavailable("connection refused").into();
        assert_eq!(
            e,
            DomainError::BackendUnavailable {
                message: "connection refused".into()
            }
        );
    }

    #[test]
    fn other_store_errors_become_database_errors() {
        let e: DomainError = StoreError::statement("insert", "syntax error").into();
        assert!(matches!(e, DomainError::Database { ref message } if message == "insert failed: syntax error"));

        let e: DomainError = StoreError::unique_violation("users_email_key").into();
        assert!(matches!(e, DomainError::Database { .. }));
    }

    #[test]
    fn only_request_caused_failures_are_client_errors() {
        assert!(DomainError::from(ValidationError::NameTooShort).is_client_error());
        assert!(DomainError::email_already_exists("a@b.com", None).is_client_error());
        assert!(DomainError::user_not_found(7).is_client_error());
        assert!(DomainError::email_not_found("x@y.com").is_client_error());

        assert!(!DomainError::not_persisted("a@b.com").is_client_error());
        assert!(!DomainError::database("boom").is_client_error());
        assert!(!DomainError::from(StoreError::unavailable("refused")).is_client_error());
    }

    #[test]
    fn validation_message_is_the_rule_text() {
        let e = DomainError::from(ValidationError::NameNotAlphabetic);
        assert_eq!(e.to_string(), "Name must be alphabetic");
    }
}
