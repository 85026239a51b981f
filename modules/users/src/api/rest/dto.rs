use serde::{Deserialize, Serialize};
use serde_json::Number;
use utoipa::{IntoParams, ToSchema};

use crate::contract::model::{AgeInput, User, UserDraft, UserPatch};

/// REST DTO for user representation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserDto {
    pub id: i32,
    pub name: String,
    pub age: i32,
    pub email: String,
}

/// REST DTO for creating a new user.
///
/// Fields are optional on the wire so a missing one is reported by the
/// validator ("Name is required") rather than by the JSON extractor.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateUserReq {
    pub name: Option<String>,
    /// Whole number. `30.0` is accepted, `30.5` is not.
    #[schema(value_type = Option<f64>)]
    pub age: Option<Number>,
    pub email: Option<String>,
}

/// REST DTO for updating a user (partial)
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateUserReq {
    pub name: Option<String>,
    #[schema(value_type = Option<f64>)]
    pub age: Option<Number>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub message: String,
    pub data: UserDto,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UsersResponse {
    pub message: String,
    pub data: Vec<UserDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EmailQuery {
    /// Exact address to look up.
    pub email: String,
}

// Conversion implementations between REST DTOs and contract models

fn age_input(n: &Number) -> AgeInput {
    match n.as_i64() {
        Some(v) => AgeInput::Whole(v),
        // u64 beyond i64 and every float land here; the validator sorts them out.
        None => AgeInput::Fractional(n.as_f64().unwrap_or(f64::NAN)),
    }
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            age: user.age,
            email: user.email,
        }
    }
}

impl From<CreateUserReq> for UserDraft {
    fn from(req: CreateUserReq) -> Self {
        Self {
            name: req.name,
            age: req.age.as_ref().map(age_input),
            email: req.email,
        }
    }
}

impl From<UpdateUserReq> for UserPatch {
    fn from(req: UpdateUserReq) -> Self {
        Self {
            name: req.name,
            age: req.age.as_ref().map(age_input),
            email: req.email,
        }
    }
}
