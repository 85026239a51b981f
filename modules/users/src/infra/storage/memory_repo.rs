//! Volatile repository used by `--mock` runs and tests.
//!
//! Mirrors the table's observable rules: ids come from a serial counter starting
//! at 1 and emails are unique.

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::contract::model::User;
use crate::domain::error::StoreError;
use crate::domain::repo::UsersRepository;
use crate::domain::validation::ValidUser;

const EMAIL_CONSTRAINT: &str = "users_email_key";

#[derive(Default)]
struct Table {
    created: bool,
    last_id: i32,
    rows: Vec<User>,
}

#[derive(Default)]
pub struct InMemoryUsersRepository {
    table: Mutex<Table>,
}

impl InMemoryUsersRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows.
    pub fn len(&self) -> usize {
        self.table.lock().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl UsersRepository for InMemoryUsersRepository {
    async fn create_table(&self) -> Result<(), StoreError> {
        self.table.lock().created = true;
        Ok(())
    }

    async fn table_exists(&self) -> Result<bool, StoreError> {
        Ok(self.table.lock().created)
    }

    async fn execute(&self, _statement: &str) -> Result<u64, StoreError> {
        Err(StoreError::statement(
            "execute",
            "raw statements are not supported by the in-memory store",
        ))
    }

    async fn insert(&self, user: &ValidUser) -> Result<(), StoreError> {
        let mut t = self.table.lock();
        if t.rows.iter().any(|r| r.email == user.email) {
            return Err(StoreError::unique_violation(EMAIL_CONSTRAINT));
        }
        // SERIAL consumes the value even on later failure; here there is none.
        t.last_id += 1;
        let id = t.last_id;
        t.rows.push(User {
            id,
            name: user.name.clone(),
            age: user.age,
            email: user.email.clone(),
        });
        Ok(())
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<User>, StoreError> {
        Ok(self.table.lock().rows.iter().find(|r| r.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .table
            .lock()
            .rows
            .iter()
            .find(|r| r.email == email)
            .cloned())
    }

    async fn list_all(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.table.lock().rows.clone())
    }

    async fn update(&self, user: &User) -> Result<(), StoreError> {
        let mut t = self.table.lock();
        if t
            .rows
            .iter()
            .any(|r| r.id != user.id && r.email == user.email)
        {
            return Err(StoreError::unique_violation(EMAIL_CONSTRAINT));
        }
        // UPDATE ... WHERE id = $4 on a missing id affects zero rows.
        if let Some(row) = t.rows.iter_mut().find(|r| r.id == user.id) {
            row.name = user.name.clone();
            row.age = user.age;
            row.email = user.email.clone();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid(name: &str, email: &str) -> ValidUser {
        ValidUser {
            name: name.into(),
            age: 30,
            email: email.into(),
        }
    }

    #[tokio::test]
    async fn ids_are_serial_from_one() {
        let repo = InMemoryUsersRepository::new();
        repo.insert(&valid("alice", "a@b.com")).await.unwrap();
        repo.insert(&valid("bob", "b@b.com")).await.unwrap();

        let ids: Vec<i32> = repo.list_all().await.unwrap().iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn duplicate_email_is_a_unique_violation() {
        let repo = InMemoryUsersRepository::new();
        repo.insert(&valid("alice", "a@b.com")).await.unwrap();
        let err = repo.insert(&valid("alicia", "a@b.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation { .. }));
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn update_to_taken_email_is_rejected() {
        let repo = InMemoryUsersRepository::new();
        repo.insert(&valid("alice", "a@b.com")).await.unwrap();
        repo.insert(&valid("bob", "b@b.com")).await.unwrap();

        let mut bob = repo.find_by_id(2).await.unwrap().unwrap();
        bob.email = "a@b.com".into();
        let err = repo.update(&bob).await.unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn table_flag_follows_create_table() {
        let repo = InMemoryUsersRepository::new();
        assert!(!repo.table_exists().await.unwrap());
        repo.create_table().await.unwrap();
        repo.create_table().await.unwrap();
        assert!(repo.table_exists().await.unwrap());
    }

    #[tokio::test]
    async fn raw_execute_is_unsupported() {
        let repo = InMemoryUsersRepository::new();
        let err = repo.execute("DELETE FROM users").await.unwrap_err();
        assert!(matches!(err, StoreError::Statement { op: "execute", .. }));
    }
}
