use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{http::StatusCode, middleware::from_fn, response::Json, routing::get, Router};
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
};
use utoipa::openapi::OpenApi;

mod config;
pub mod request_id;
pub mod shutdown;
mod web;

pub use config::ApiIngressConfig;
pub use shutdown::wait_for_shutdown;

/// Default request body limit.
pub const BODY_LIMIT_BYTES: usize = 16 * 1024 * 1024;

/// HTTP host: owns the middleware stack, the service endpoints and the server loop.
pub struct ApiIngress {
    config: ApiIngressConfig,
    openapi: Option<Arc<OpenApi>>,
}

impl ApiIngress {
    pub fn new(config: ApiIngressConfig) -> Self {
        Self {
            config,
            openapi: None,
        }
    }

    /// Document served at `/api/openapi.json` when docs are enabled.
    pub fn with_openapi(mut self, doc: OpenApi) -> Self {
        self.openapi = Some(Arc::new(doc));
        self
    }

    pub fn config(&self) -> &ApiIngressConfig {
        &self.config
    }

    /// Merge module routes with the service endpoints and wrap everything in the middleware stack.
    pub fn build_router(&self, routes: Router) -> Router {
        tracing::debug!("Building router");
        let mut router = Router::new()
            .route("/health", get(web::health_check))
            .merge(routes);

        if self.config.enable_docs {
            if let Some(doc) = self.openapi.clone() {
                router = router
                    .route(
                        "/api/openapi.json",
                        get(move || {
                            let doc = doc.clone();
                            async move { Json((*doc).clone()) }
                        }),
                    )
                    .route("/docs", get(web::serve_docs));
            }
        }

        // Layers wrap everything added before them, so they are applied innermost first.
        // Resulting order, outermost to innermost:
        // SetRequestId -> PropagateRequestId -> Trace -> push_req_id_to_extensions
        //   -> Timeout -> CORS -> BodyLimit
        let x_request_id = request_id::header();

        // 7. Body limit layer
        router = router.layer(RequestBodyLimitLayer::new(BODY_LIMIT_BYTES));

        // 6. CORS layer (if enabled)
        if self.config.cors_enabled {
            router = router.layer(CorsLayer::permissive());
        }

        // 5. Timeout layer
        router = router.layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            self.config.request_timeout,
        ));

        // 4. Put request_id into extensions and the trace span
        router = router.layer(from_fn(request_id::push_req_id_to_extensions));

        // 3. Trace with request_id/status/latency
        router = router.layer(request_id::create_trace_layer());

        // 2. Echo x-request-id on the response
        router = router.layer(PropagateRequestIdLayer::new(x_request_id.clone()));

        // 1. Generate x-request-id when missing
        router = router.layer(SetRequestIdLayer::new(x_request_id, request_id::MakeReqId));

        router
    }

    /// Bind `bind_addr` and serve until `shutdown` resolves.
    pub async fn bind_and_serve<F>(&self, router: Router, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr: SocketAddr = self
            .config
            .bind_addr
            .parse()
            .with_context(|| format!("Invalid bind address '{}'", self.config.bind_addr))?;

        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;
        tracing::info!("HTTP server bound on {}", addr);

        serve(listener, router, shutdown).await
    }
}

/// Run `router` on an already bound listener with graceful shutdown.
pub async fn serve<F>(listener: TcpListener, router: Router, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let shutdown = async move {
        shutdown.await;
        tracing::info!("HTTP server shutting down gracefully");
    };

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| anyhow::anyhow!(e))
}
