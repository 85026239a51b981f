//! sqlx/PostgreSQL implementation of the repository port.
//!
//! Every call opens its own connection, runs inside one transaction and closes the
//! connection on the way out, whatever the outcome. There is no pool and no handle
//! kept between calls.

use std::fmt;
use std::time::Duration;

use futures::future::BoxFuture;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::{Connection, FromRow};
use tracing::{debug, error, warn};

use crate::contract::model::User;
use crate::domain::error::StoreError;
use crate::domain::repo::UsersRepository;
use crate::domain::validation::ValidUser;
use crate::infra::storage::{CREATE_USERS_TABLE, USERS_TABLE};

/// SQLSTATE for unique_violation.
const PG_UNIQUE_VIOLATION: &str = "23505";

/// Connection parameters; passed in by the caller, never read from global state.
#[derive(Clone)]
pub struct PgConnParams {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub connect_timeout: Duration,
}

impl fmt::Debug for PgConnParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgConnParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"***")
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: i32,
    name: String,
    age: i32,
    email: String,
}

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        Self {
            id: r.id,
            name: r.name,
            age: r.age,
            email: r.email,
        }
    }
}

pub struct PgUsersRepository {
    options: PgConnectOptions,
    connect_timeout: Duration,
}

impl PgUsersRepository {
    pub fn new(params: &PgConnParams) -> Self {
        let options = PgConnectOptions::new()
            .host(&params.host)
            .port(params.port)
            .database(&params.database)
            .username(&params.user)
            .password(&params.password);
        Self {
            options,
            connect_timeout: params.connect_timeout,
        }
    }

    async fn connect(&self) -> Result<PgConnection, StoreError> {
        match tokio::time::timeout(self.connect_timeout, PgConnection::connect_with(&self.options))
            .await
        {
            Ok(Ok(conn)) => Ok(conn),
            Ok(Err(e)) => {
                error!(error = %e, "Error connecting to PostgreSQL");
                Err(StoreError::unavailable(e.to_string()))
            }
            Err(_) => {
                error!(timeout = ?self.connect_timeout, "Timed out connecting to PostgreSQL");
                Err(StoreError::unavailable(format!(
                    "connect timed out after {:?}",
                    self.connect_timeout
                )))
            }
        }
    }

    /// Open a connection, run `work` inside one transaction, commit, and close the
    /// connection on every exit path.
    async fn in_transaction<T, F>(&self, op: &'static str, work: F) -> Result<T, StoreError>
    where
        T: Send,
        F: for<'c> FnOnce(&'c mut PgConnection) -> BoxFuture<'c, Result<T, sqlx::Error>> + Send,
    {
        let mut conn = self.connect().await?;

        let outcome = async {
            let mut tx = conn.begin().await?;
            let value = work(&mut *tx).await?;
            tx.commit().await?;
            Ok::<T, sqlx::Error>(value)
        }
        .await;

        if let Err(e) = conn.close().await {
            warn!(op, error = %e, "Error closing PostgreSQL connection");
        }

        outcome.map_err(|e| {
            let mapped = map_sqlx_error(op, e);
            error!(op, error = %mapped, "Error executing query");
            mapped
        })
    }
}

fn map_sqlx_error(op: &'static str, e: sqlx::Error) -> StoreError {
    match e {
        sqlx::Error::Database(db) if db.code().as_deref() == Some(PG_UNIQUE_VIOLATION) => {
            StoreError::unique_violation(db.constraint().unwrap_or("unknown"))
        }
        // A connection dropped mid-call is still an availability problem.
        sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::PoolTimedOut => {
            StoreError::unavailable(e.to_string())
        }
        other => StoreError::statement(op, other.to_string()),
    }
}

#[async_trait::async_trait]
impl UsersRepository for PgUsersRepository {
    async fn create_table(&self) -> Result<(), StoreError> {
        self.in_transaction("create_table", |conn| {
            Box::pin(async move {
                sqlx::query(CREATE_USERS_TABLE).execute(conn).await?;
                Ok(())
            })
        })
        .await
    }

    async fn table_exists(&self) -> Result<bool, StoreError> {
        self.in_transaction("table_exists", |conn| {
            Box::pin(async move {
                sqlx::query_scalar::<_, bool>(
                    "SELECT EXISTS (SELECT FROM pg_tables WHERE schemaname = 'public' AND tablename = $1)",
                )
                .bind(USERS_TABLE)
                .fetch_one(conn)
                .await
            })
        })
        .await
    }

    async fn execute(&self, statement: &str) -> Result<u64, StoreError> {
        let statement = statement.to_owned();
        debug!(len = statement.len(), "Executing raw statement");
        self.in_transaction("execute", move |conn| {
            Box::pin(async move {
                let res = sqlx::Executor::execute(conn, statement.as_str()).await?;
                Ok(res.rows_affected())
            })
        })
        .await
    }

    async fn insert(&self, user: &ValidUser) -> Result<(), StoreError> {
        let user = user.clone();
        self.in_transaction("insert", move |conn| {
            Box::pin(async move {
                sqlx::query("INSERT INTO users (name, age, email) VALUES ($1, $2, $3)")
                    .bind(user.name)
                    .bind(user.age)
                    .bind(user.email)
                    .execute(conn)
                    .await?;
                Ok(())
            })
        })
        .await
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<User>, StoreError> {
        self.in_transaction("find_by_id", move |conn| {
            Box::pin(async move {
                let row = sqlx::query_as::<_, UserRow>(
                    "SELECT id, name, age, email FROM users WHERE id = $1",
                )
                .bind(id)
                .fetch_optional(conn)
                .await?;
                Ok(row.map(User::from))
            })
        })
        .await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let email = email.to_owned();
        self.in_transaction("find_by_email", move |conn| {
            Box::pin(async move {
                let row = sqlx::query_as::<_, UserRow>(
                    "SELECT id, name, age, email FROM users WHERE email = $1",
                )
                .bind(email)
                .fetch_optional(conn)
                .await?;
                Ok(row.map(User::from))
            })
        })
        .await
    }

    async fn list_all(&self) -> Result<Vec<User>, StoreError> {
        self.in_transaction("list_all", |conn| {
            Box::pin(async move {
                let rows =
                    sqlx::query_as::<_, UserRow>("SELECT id, name, age, email FROM users ORDER BY id")
                        .fetch_all(conn)
                        .await?;
                Ok(rows.into_iter().map(User::from).collect())
            })
        })
        .await
    }

    async fn update(&self, user: &User) -> Result<(), StoreError> {
        let user = user.clone();
        self.in_transaction("update", move |conn| {
            Box::pin(async move {
                sqlx::query("UPDATE users SET name = $1, age = $2, email = $3 WHERE id = $4")
                    .bind(user.name)
                    .bind(user.age)
                    .bind(user.email)
                    .bind(user.id)
                    .execute(conn)
                    .await?;
                Ok(())
            })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_debug_hides_password() {
        let p = PgConnParams {
            host: "localhost".into(),
            port: 5432,
            database: "db_users".into(),
            user: "postgres".into(),
            password: "hunter2".into(),
            connect_timeout: Duration::from_secs(5),
        };
        let out = format!("{p:?}");
        assert!(!out.contains("hunter2"));
        assert!(out.contains("db_users"));
    }

    #[test]
    fn io_errors_map_to_unavailable() {
        let e = sqlx::Error::Io(std::io::Error::from(std::io::ErrorKind::ConnectionReset));
        assert!(matches!(
            map_sqlx_error("find_by_id", e),
            StoreError::Unavailable { .. }
        ));
    }

    #[test]
    fn row_not_found_maps_to_statement_error() {
        let e = map_sqlx_error("table_exists", sqlx::Error::RowNotFound);
        assert!(matches!(e, StoreError::Statement { op: "table_exists", .. }));
    }
}
