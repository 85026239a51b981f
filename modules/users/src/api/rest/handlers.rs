use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    http::{StatusCode, Uri},
    response::Json,
    Extension,
};
use tracing::{debug, error, info};

use crate::api::rest::dto::{
    CreateUserReq, EmailQuery, MessageResponse, UpdateUserReq, UserDto, UserResponse,
    UsersResponse,
};
use crate::api::rest::error::map_domain_error;
use crate::api::rest::problem::{Problem, ProblemResponse};
use crate::domain::error::DomainError;
use crate::domain::service::Service;

/// 4xx outcomes log at debug, everything else at error.
fn log_failure(context: &str, e: &DomainError) {
    if e.is_client_error() {
        debug!("{context}: {e}");
    } else {
        error!("{context}: {e}");
    }
}

/// Create a new user
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreateUserReq,
    responses(
        (status = 201, description = "Created user", body = UserResponse),
        (status = 400, description = "Validation failed", body = Problem, content_type = "application/problem+json"),
        (status = 409, description = "Email already in use", body = Problem, content_type = "application/problem+json"),
        (status = 500, description = "Internal error", body = Problem, content_type = "application/problem+json"),
        (status = 503, description = "Backend unavailable", body = Problem, content_type = "application/problem+json")
    ),
    tag = "users",
    operation_id = "users.create_user"
)]
pub async fn create_user(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    Json(req_body): Json<CreateUserReq>,
) -> Result<(StatusCode, Json<UserResponse>), ProblemResponse> {
    info!("Creating user: {:?}", req_body);

    match svc.create_user(req_body.into()).await {
        Ok(user) => Ok((
            StatusCode::CREATED,
            Json(UserResponse {
                message: format!("User created successfully - {}", user.name),
                data: UserDto::from(user),
            }),
        )),
        Err(e) => {
            log_failure("Failed to create user", &e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Get a user by email address
#[utoipa::path(
    get,
    path = "/api/users/email",
    params(EmailQuery),
    responses(
        (status = 200, description = "User found", body = UserResponse),
        (status = 404, description = "Not found", body = Problem, content_type = "application/problem+json"),
        (status = 503, description = "Backend unavailable", body = Problem, content_type = "application/problem+json")
    ),
    tag = "users",
    operation_id = "users.get_user_by_email"
)]
pub async fn get_user_by_email(
    Extension(svc): Extension<Arc<Service>>,
    Query(query): Query<EmailQuery>,
    uri: Uri,
) -> Result<Json<UserResponse>, ProblemResponse> {
    info!("Getting user with email: {}", query.email);

    match svc.get_user_by_email(&query.email).await {
        Ok(user) => Ok(Json(UserResponse {
            message: format!("User with ID {} retrieved successfully", user.id),
            data: UserDto::from(user),
        })),
        Err(e) => {
            log_failure(&format!("Failed to get user {}", query.email), &e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Get a specific user by ID
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(("id" = i32, Path, description = "User id")),
    responses(
        (status = 200, description = "User found", body = UserResponse),
        (status = 404, description = "Not found", body = Problem, content_type = "application/problem+json"),
        (status = 503, description = "Backend unavailable", body = Problem, content_type = "application/problem+json")
    ),
    tag = "users",
    operation_id = "users.get_user"
)]
pub async fn get_user(
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<i32>,
    uri: Uri,
) -> Result<Json<UserResponse>, ProblemResponse> {
    info!("Getting user with id: {}", id);

    match svc.get_user(id).await {
        Ok(user) => Ok(Json(UserResponse {
            message: format!("User with ID {} retrieved successfully", user.id),
            data: UserDto::from(user),
        })),
        Err(e) => {
            log_failure(&format!("Failed to get user {id}"), &e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// List every user
#[utoipa::path(
    get,
    path = "/api/users",
    responses(
        (status = 200, description = "All users, possibly none", body = UsersResponse),
        (status = 500, description = "Internal error", body = Problem, content_type = "application/problem+json"),
        (status = 503, description = "Backend unavailable", body = Problem, content_type = "application/problem+json")
    ),
    tag = "users",
    operation_id = "users.list_users"
)]
pub async fn list_users(
    Extension(svc): Extension<Arc<Service>>,
    uri: Uri,
) -> Result<Json<UsersResponse>, ProblemResponse> {
    info!("Listing users");

    match svc.list_users().await {
        Ok(users) => {
            let message = if users.is_empty() {
                "Users not found"
            } else {
                "Users retrieved successfully"
            };
            Ok(Json(UsersResponse {
                message: message.to_owned(),
                data: users.into_iter().map(UserDto::from).collect(),
            }))
        }
        Err(e) => {
            log_failure("Failed to list users", &e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Update an existing user
#[utoipa::path(
    put,
    path = "/api/users/{id}",
    params(("id" = i32, Path, description = "User id")),
    request_body = UpdateUserReq,
    responses(
        (status = 200, description = "Updated user", body = UserResponse),
        (status = 400, description = "Validation failed", body = Problem, content_type = "application/problem+json"),
        (status = 404, description = "Not found", body = Problem, content_type = "application/problem+json"),
        (status = 409, description = "Email already in use", body = Problem, content_type = "application/problem+json"),
        (status = 503, description = "Backend unavailable", body = Problem, content_type = "application/problem+json")
    ),
    tag = "users",
    operation_id = "users.update_user"
)]
pub async fn update_user(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<i32>,
    Json(req_body): Json<UpdateUserReq>,
) -> Result<Json<UserResponse>, ProblemResponse> {
    info!("Updating user {} with: {:?}", id, req_body);

    match svc.update_user(id, req_body.into()).await {
        Ok(user) => Ok(Json(UserResponse {
            message: format!("User with ID {} updated successfully", user.id),
            data: UserDto::from(user),
        })),
        Err(e) => {
            log_failure(&format!("Failed to update user {id}"), &e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Acknowledge a delete request. No row is removed.
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(("id" = i32, Path, description = "User id")),
    responses(
        (status = 200, description = "Acknowledged", body = MessageResponse)
    ),
    tag = "users",
    operation_id = "users.delete_user"
)]
pub async fn delete_user(
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<i32>,
    uri: Uri,
) -> Result<Json<MessageResponse>, ProblemResponse> {
    info!("Deleting user: {}", id);

    match svc.delete_user(id).await {
        Ok(()) => Ok(Json(MessageResponse {
            message: format!("User with ID {id} deleted successfully"),
        })),
        Err(e) => {
            log_failure(&format!("Failed to delete user {id}"), &e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}
