use async_trait::async_trait;

use crate::contract::model::User;
use crate::domain::error::StoreError;
use crate::domain::validation::ValidUser;

/// Port for the domain layer: every backend read/write for the `users` table.
/// Object-safe and async-friendly via `async_trait`.
#[async_trait]
pub trait UsersRepository: Send + Sync {
    /// Create the `users` table if absent. Idempotent.
    async fn create_table(&self) -> Result<(), StoreError>;
    /// Whether the `users` table is present in the catalog.
    async fn table_exists(&self) -> Result<bool, StoreError>;
    /// Run a statement verbatim inside a transaction; returns rows affected.
    ///
    /// Nothing is bound or escaped here. Callers own the statement's safety.
    async fn execute(&self, statement: &str) -> Result<u64, StoreError>;
    /// Insert a validated user; the backend assigns the id.
    async fn insert(&self, user: &ValidUser) -> Result<(), StoreError>;
    async fn find_by_id(&self, id: i32) -> Result<Option<User>, StoreError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    /// Every row, ordered by id. Unbounded.
    async fn list_all(&self) -> Result<Vec<User>, StoreError>;
    /// Overwrite name, age and email of the row with `user.id`.
    /// Callers confirm the row exists first.
    async fn update(&self, user: &User) -> Result<(), StoreError>;
}
