use utoipa::OpenApi;

use crate::api::rest::{dto, handlers, problem};

/// OpenAPI document for the users endpoints.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Users service API",
        description = "Create, read and update user records."
    ),
    paths(
        handlers::create_user,
        handlers::get_user_by_email,
        handlers::get_user,
        handlers::list_users,
        handlers::update_user,
        handlers::delete_user,
    ),
    components(schemas(
        dto::UserDto,
        dto::CreateUserReq,
        dto::UpdateUserReq,
        dto::UserResponse,
        dto::UsersResponse,
        dto::MessageResponse,
        problem::Problem,
        problem::FieldViolation,
    )),
    tags((name = "users", description = "User records"))
)]
pub struct UsersApiDoc;
