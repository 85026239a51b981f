//! HTTP surface of the users module.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod openapi;
pub mod problem;
pub mod routes;

pub use openapi::UsersApiDoc;
pub use routes::register_routes;
