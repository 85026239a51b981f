#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::Router;
use testcontainers::{runners::AsyncRunner, ImageExt};

use users::api::rest::register_routes;
use users::domain::service::Service;
use users::infra::storage::{InMemoryUsersRepository, PgConnParams};

/// Service over a fresh in-memory store with the table already bootstrapped.
pub async fn memory_service() -> (Arc<Service>, Arc<InMemoryUsersRepository>) {
    let repo = Arc::new(InMemoryUsersRepository::new());
    let svc = Arc::new(Service::new(repo.clone()));
    svc.bootstrap().await;
    (svc, repo)
}

pub fn router_for(svc: Arc<Service>) -> Router {
    register_routes(Router::new(), svc)
}

pub struct DbUnderTest {
    pub params: PgConnParams,
    #[allow(clippy::type_complexity)]
    _cleanup: Option<Box<dyn FnOnce() + Send + Sync>>,
}

pub async fn bring_up_postgres() -> Result<DbUnderTest> {
    use testcontainers::ContainerRequest;
    use testcontainers_modules::postgres::Postgres;

    let postgres_image = Postgres::default();
    let container_request = ContainerRequest::from(postgres_image)
        .with_env_var("POSTGRES_PASSWORD", "pass")
        .with_env_var("POSTGRES_USER", "user")
        .with_env_var("POSTGRES_DB", "db_users");

    let container = container_request.start().await?;
    let port = container.get_host_port_ipv4(5432).await?;
    wait_for_tcp("127.0.0.1", port, Duration::from_secs(20)).await?;

    Ok(DbUnderTest {
        params: PgConnParams {
            host: "127.0.0.1".into(),
            port,
            database: "db_users".into(),
            user: "user".into(),
            password: "pass".into(),
            connect_timeout: Duration::from_secs(5),
        },
        _cleanup: Some(Box::new(move || drop(container))),
    })
}

async fn wait_for_tcp(host: &str, port: u16, timeout: Duration) -> Result<()> {
    use tokio::{
        net::TcpStream,
        time::{sleep, Instant},
    };
    let deadline = Instant::now() + timeout;
    loop {
        if TcpStream::connect((host, port)).await.is_ok() {
            return Ok(());
        }
        if Instant::now() >= deadline {
            anyhow::bail!("Timeout waiting for {host}:{port}");
        }
        sleep(Duration::from_millis(200)).await;
    }
}
