use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use crate::contract::model::{User, UserDraft, UserPatch};
use crate::domain::error::{DomainError, StoreError};
use crate::domain::repo::UsersRepository;
use crate::domain::validation::{validate_new_user, validate_user_patch};

/// Domain service with business rules for user management.
/// Depends only on the repository port, not on infra types.
#[derive(Clone)]
pub struct Service {
    repo: Arc<dyn UsersRepository>,
}

impl Service {
    pub fn new(repo: Arc<dyn UsersRepository>) -> Self {
        Self { repo }
    }

    /// Ensure the `users` table exists. Never fails: backend errors are logged and dropped
    /// so the server can still start and report 503s per request.
    #[instrument(name = "users.service.bootstrap", skip(self))]
    pub async fn bootstrap(&self) {
        if let Err(e) = self.repo.create_table().await {
            error!(error = %e, "Failed to create users table");
        }
        match self.repo.table_exists().await {
            Ok(present) => info!(present, "users table check"),
            Err(e) => warn!(error = %e, "Could not check users table"),
        }
    }

    #[instrument(name = "users.service.create_user", skip(self, draft))]
    pub async fn create_user(&self, draft: UserDraft) -> Result<User, DomainError> {
        let valid = validate_new_user(&draft)
            .inspect_err(|e| debug!(field = e.field(), "Rejected new user: {e}"))?;

        if let Some(existing) = self.repo.find_by_email(&valid.email).await? {
            info!(email = %valid.email, "Email already in use");
            return Err(DomainError::email_already_exists(valid.email, Some(existing)));
        }

        self.repo.insert(&valid).await.map_err(|e| match e {
            // lost a race with a concurrent insert of the same email
            StoreError::UniqueViolation { .. } => {
                DomainError::email_already_exists(valid.email.clone(), None)
            }
            other => other.into(),
        })?;

        let user = self
            .repo
            .find_by_email(&valid.email)
            .await?
            .ok_or_else(|| DomainError::not_persisted(valid.email.clone()))?;

        info!(user_id = user.id, "Created user");
        Ok(user)
    }

    #[instrument(name = "users.service.get_user", skip(self), fields(user_id = id))]
    pub async fn get_user(&self, id: i32) -> Result<User, DomainError> {
        debug!("Getting user by id");
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::user_not_found(id))
    }

    #[instrument(name = "users.service.get_user_by_email", skip(self))]
    pub async fn get_user_by_email(&self, email: &str) -> Result<User, DomainError> {
        debug!("Getting user by email");
        self.repo
            .find_by_email(email)
            .await?
            .ok_or_else(|| DomainError::email_not_found(email))
    }

    #[instrument(name = "users.service.list_users", skip(self))]
    pub async fn list_users(&self) -> Result<Vec<User>, DomainError> {
        let users = self.repo.list_all().await?;
        debug!("Listed {} users", users.len());
        Ok(users)
    }

    /// Apply a partial update. Supplied fields replace stored ones, omitted fields keep
    /// their stored values, and all three columns are written back.
    #[instrument(name = "users.service.update_user", skip(self, patch), fields(user_id = id))]
    pub async fn update_user(&self, id: i32, patch: UserPatch) -> Result<User, DomainError> {
        let patch = validate_user_patch(&patch)
            .inspect_err(|e| debug!(field = e.field(), "Rejected patch: {e}"))?;

        let mut current = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::user_not_found(id))?;

        if let Some(new_email) = patch.email.as_deref() {
            if new_email != current.email {
                if let Some(holder) = self.repo.find_by_email(new_email).await? {
                    return Err(DomainError::email_already_exists(new_email, Some(holder)));
                }
            }
        }

        if let Some(name) = patch.name {
            current.name = name;
        }
        if let Some(age) = patch.age {
            current.age = age;
        }
        if let Some(email) = patch.email {
            current.email = email;
        }

        self.repo.update(&current).await.map_err(|e| match e {
            StoreError::UniqueViolation { .. } => {
                DomainError::email_already_exists(current.email.clone(), None)
            }
            other => other.into(),
        })?;

        info!("Updated user");
        Ok(current)
    }

    /// Deletion is not offered: this acknowledges the request and leaves storage untouched.
    #[instrument(name = "users.service.delete_user", skip(self), fields(user_id = id))]
    pub async fn delete_user(&self, id: i32) -> Result<(), DomainError> {
        info!("Delete requested; storage left unchanged");
        Ok(())
    }
}
