use std::time::Duration;

/// HTTP host settings, derived from the server section of the app config.
#[derive(Debug, Clone)]
pub struct ApiIngressConfig {
    pub bind_addr: String,
    pub cors_enabled: bool,
    /// Serve `/api/openapi.json` and the `/docs` viewer.
    pub enable_docs: bool,
    /// Upper bound for a single request, after which the client gets 408.
    pub request_timeout: Duration,
}

impl Default for ApiIngressConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".to_string(),
            cors_enabled: false,
            enable_docs: true,
            request_timeout: Duration::from_secs(30),
        }
    }
}
