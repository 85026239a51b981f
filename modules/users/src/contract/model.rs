/// A persisted user row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub age: i32,
    pub email: String,
}

/// An age value as the client sent it, before the whole-number check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AgeInput {
    Whole(i64),
    Fractional(f64),
}

/// Candidate record for a create. `None` means the field was not supplied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserDraft {
    pub name: Option<String>,
    pub age: Option<AgeInput>,
    pub email: Option<String>,
}

/// Partial update. Only `Some` fields are validated and applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserPatch {
    pub name: Option<String>,
    pub age: Option<AgeInput>,
    pub email: Option<String>,
}

impl UserDraft {
    pub fn new(name: impl Into<String>, age: i64, email: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            age: Some(AgeInput::Whole(age)),
            email: Some(email.into()),
        }
    }
}
