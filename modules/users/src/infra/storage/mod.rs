pub mod memory_repo;
pub mod pg_repo;

pub use memory_repo::InMemoryUsersRepository;
pub use pg_repo::{PgConnParams, PgUsersRepository};

/// Table name shared by the catalog probe and the DDL.
pub const USERS_TABLE: &str = "users";

pub(crate) const CREATE_USERS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS users (
        id SERIAL PRIMARY KEY,
        name VARCHAR(50) NOT NULL,
        age INTEGER NOT NULL,
        email VARCHAR(254) NOT NULL UNIQUE
    )
";
