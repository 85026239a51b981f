pub mod model;

pub use model::{AgeInput, User, UserDraft, UserPatch};
