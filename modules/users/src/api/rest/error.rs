use axum::http::StatusCode;

use crate::api::rest::problem::{FieldViolation, Problem, ProblemResponse};
use crate::contract::model::User;
use crate::domain::error::DomainError;

/// Helper to create a ProblemResponse with less boilerplate
pub fn from_parts(
    status: StatusCode,
    code: &str,
    title: &str,
    detail: impl Into<String>,
    instance: &str,
) -> Problem {
    let problem = Problem::new(status, title, detail)
        .with_type(format!("https://errors.example.com/{code}"))
        .with_code(code)
        .with_instance(instance);

    // Add request ID from current tracing span if available
    if let Some(id) = tracing::Span::current().id() {
        problem.with_request_id(id.into_u64().to_string())
    } else {
        problem
    }
}

fn describe(user: &User) -> String {
    format!(
        "{{name: {}, age: {}, email: {}}}",
        user.name, user.age, user.email
    )
}

/// Map domain error to RFC9457 ProblemResponse
pub fn map_domain_error(e: &DomainError, instance: &str) -> ProblemResponse {
    let problem = match e {
        DomainError::Validation(v) => from_parts(
            StatusCode::BAD_REQUEST,
            "USERS_VALIDATION",
            "Validation error",
            v.to_string(),
            instance,
        )
        .with_errors(vec![FieldViolation {
            detail: v.to_string(),
            pointer: format!("/{}", v.field()),
        }]),
        DomainError::EmailAlreadyExists { email, existing } => {
            let who = existing
                .as_ref()
                .map(describe)
                .unwrap_or_else(|| email.clone());
            from_parts(
                StatusCode::CONFLICT,
                "USERS_EMAIL_CONFLICT",
                "Email already exists",
                format!("User already exists: {who}"),
                instance,
            )
        }
        DomainError::UserNotFound { .. } | DomainError::EmailNotFound { .. } => from_parts(
            StatusCode::NOT_FOUND,
            "USERS_NOT_FOUND",
            "User not found",
            "User not found",
            instance,
        ),
        DomainError::NotPersisted { .. } => {
            tracing::error!(error = %e, "Insert reported success but row is missing");
            from_parts(
                StatusCode::INTERNAL_SERVER_ERROR,
                "USERS_NOT_PERSISTED",
                "Internal error",
                "User not inserted. Check logs for details.",
                instance,
            )
        }
        DomainError::BackendUnavailable { .. } => {
            tracing::error!(error = %e, "Backend unavailable");
            from_parts(
                StatusCode::SERVICE_UNAVAILABLE,
                "USERS_BACKEND_UNAVAILABLE",
                "Service unavailable",
                "The user store is currently unavailable",
                instance,
            )
        }
        DomainError::Database { .. } => {
            // Log the internal error details but don't expose them to the client
            tracing::error!(error = ?e, "Database error occurred");
            from_parts(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_DB",
                "Internal error",
                "An internal database error occurred",
                instance,
            )
        }
    };
    ProblemResponse(problem)
}
