//! Caixa Web Server
//!
//! Axum-based REST API for the Caixa small-business finance tracker.
//!
//! Security features:
//! - API key authentication (secure by default, use --no-auth for local dev)
//! - Restrictive CORS policy
//! - Input validation (pagination limits, file size limits)
//! - Sanitized error responses

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::{
    cors::CorsLayer, services::ServeDir, set_header::SetResponseHeaderLayer, trace::TraceLayer,
};
use tracing::{error, info, warn};

use caixa_core::ai::{AIClient, LlmBackend};
use caixa_core::config::CaixaConfig;
use caixa_core::db::Database;
use caixa_core::import::{ImportError, ImportPipeline};
use caixa_core::prompts::PromptLibrary;
use caixa_core::storage::LocalFileStorage;

mod handlers;

/// Maximum file upload size (10 MB)
pub const MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;

/// Maximum pagination limit
pub const MAX_PAGE_LIMIT: i64 = 1000;

/// Comma-separated API keys accepted as `Authorization: Bearer <key>`
pub const API_KEYS_ENV: &str = "CAIXA_API_KEYS";

/// Comma-separated CORS origins
pub const ALLOWED_ORIGINS_ENV: &str = "CAIXA_ALLOWED_ORIGINS";

/// Header carrying the signed-in user's email, set by the front-end proxy
const USER_HEADER: &str = "x-caixa-user";

/// Authorization header for API key auth
const AUTHORIZATION_HEADER: &str = "authorization";

/// Server configuration
#[derive(Clone)]
pub struct ServerConfig {
    /// Whether authentication is required (secure by default)
    pub require_auth: bool,
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
    /// API keys, sent as "Bearer <key>" in the Authorization header
    pub api_keys: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            require_auth: true,
            allowed_origins: vec![],
            api_keys: vec![],
        }
    }
}

impl ServerConfig {
    /// Read API keys and allowed origins from the environment
    pub fn from_env(require_auth: bool) -> Self {
        Self {
            require_auth,
            allowed_origins: split_env_list(ALLOWED_ORIGINS_ENV),
            api_keys: split_env_list(API_KEYS_ENV),
        }
    }
}

fn split_env_list(name: &str) -> Vec<String> {
    std::env::var(name)
        .map(|v| {
            v.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Shared application state
pub struct AppState {
    pub db: Database,
    pub config: ServerConfig,
    pub ai: Option<AIClient>,
    /// Statement importer; absent when no LLM backend is configured
    pub import: Option<ImportPipeline>,
    pub prompts: PromptLibrary,
}

impl AppState {
    pub fn new(
        db: Database,
        config: ServerConfig,
        ai: Option<AIClient>,
        settings: &CaixaConfig,
        prompts: PromptLibrary,
    ) -> Self {
        let import = ai.as_ref().map(|client| {
            ImportPipeline::new(
                Arc::new(client.clone()),
                Arc::new(db.clone()),
                Arc::new(LocalFileStorage::new(&settings.upload_dir)),
            )
            .with_batch_size(settings.batch_size)
            .with_prompts(prompts.clone())
        });

        Self {
            db,
            config,
            ai,
            import,
            prompts,
        }
    }
}

/// Authentication middleware - validates API keys
///
/// Keys are compared in constant time. The user header is only informative
/// and never authenticates a request by itself.
async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if !state.config.require_auth || request.uri().path() == "/api/health" {
        return next.run(request).await;
    }

    let api_key_valid = request
        .headers()
        .get(AUTHORIZATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(|key| validate_api_key(key, &state.config.api_keys))
        .unwrap_or(false);

    if api_key_valid {
        return next.run(request).await;
    }

    warn!(path = %request.uri().path(), "Unauthorized request - no valid auth");
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "error": "Authentication required"
        })),
    )
        .into_response()
}

/// Validate an API key against the configured keys using constant-time comparison
fn validate_api_key(provided: &str, valid_keys: &[String]) -> bool {
    use subtle::ConstantTimeEq;

    let provided_bytes = provided.as_bytes();
    valid_keys.iter().any(|key| {
        let key_bytes = key.as_bytes();
        provided_bytes.len() == key_bytes.len() && bool::from(provided_bytes.ct_eq(key_bytes))
    })
}

/// Extract the acting user from request headers
///
/// Returns the proxy-supplied email, "api-key" for API key auth, or
/// "local-dev" for unauthenticated requests.
pub fn get_user_email(headers: &axum::http::HeaderMap) -> String {
    if let Some(email) = headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        return email.to_string();
    }

    if headers
        .get(AUTHORIZATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .is_some()
    {
        return "api-key".to_string();
    }

    "local-dev".to_string()
}

/// Success response
#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Create the application router, configuring the LLM from the environment
pub fn create_router(db: Database, static_dir: Option<&str>, config: ServerConfig) -> Router {
    let settings = match CaixaConfig::load() {
        Ok(settings) => settings,
        Err(e) => {
            warn!(error = %e, "Invalid config file, using defaults");
            CaixaConfig::default()
        }
    };

    let ai = AIClient::from_env_with_timeout(Some(settings.request_timeout));
    if let Some(ref client) = ai {
        info!(
            "LLM backend configured: {} (model: {})",
            client.host(),
            client.model()
        );
    } else {
        info!("ℹ️  LLM backend not configured (set OPENAI_COMPATIBLE_API_KEY to enable imports)");
    }

    let state = AppState::new(db, config, ai, &settings, PromptLibrary::new());
    create_router_with_state(Arc::new(state), static_dir)
}

/// Create the router around prepared state (for testing)
pub fn create_router_with_state(state: Arc<AppState>, static_dir: Option<&str>) -> Router {
    let config = state.config.clone();

    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/categories", get(handlers::list_categories))
        // Statement import
        .route("/import", post(handlers::import_statement))
        .route("/import/status", get(handlers::import_status))
        .route("/import/retry", post(handlers::retry_import))
        // Ledger
        .route(
            "/transactions",
            get(handlers::list_transactions).post(handlers::create_transaction),
        )
        .route("/transactions/:id", delete(handlers::delete_transaction))
        // Analytics
        .route("/dashboard", get(handlers::get_dashboard))
        .route("/reports/monthly.csv", get(handlers::monthly_report))
        // Recurring expenses
        .route(
            "/recurring",
            get(handlers::list_recurring).post(handlers::create_recurring),
        )
        .route("/recurring/upcoming", get(handlers::upcoming_recurring))
        .route(
            "/recurring/:id",
            patch(handlers::update_recurring).delete(handlers::delete_recurring),
        )
        // Advisor
        .route("/chat", post(handlers::chat));

    let methods = [
        Method::GET,
        Method::POST,
        Method::PATCH,
        Method::DELETE,
        Method::OPTIONS,
    ];
    let cors = if config.allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        CorsLayer::new()
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    };

    let csp_value = HeaderValue::from_static(
        "default-src 'self'; script-src 'self'; style-src 'self' 'unsafe-inline'; img-src 'self' blob: data:; font-src 'self'; connect-src 'self'; frame-ancestors 'none'"
    );

    let mut app = Router::new()
        .nest("/api", api_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state)
        // Multipart overhead on top of the file itself
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE + 64 * 1024))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            csp_value,
        ));

    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app
}

/// Start the server
pub async fn serve(
    db: Database,
    host: &str,
    port: u16,
    static_dir: Option<&str>,
    config: ServerConfig,
) -> anyhow::Result<()> {
    if !config.require_auth {
        warn!("⚠️  Authentication disabled - do not expose to network!");
    } else if config.api_keys.is_empty() {
        warn!("⚠️  No API keys configured ({}) - every request will be rejected", API_KEYS_ENV);
    }

    check_ai_connection().await;

    let app = create_router(db, static_dir, config);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Check and log LLM backend connection status
async fn check_ai_connection() {
    match AIClient::from_env() {
        Some(client) => {
            if client.health_check().await {
                info!(
                    "✅ LLM backend connected: {} (model: {})",
                    client.host(),
                    client.model()
                );
            } else {
                warn!(
                    "⚠️  LLM backend configured but not responding: {}",
                    client.host()
                );
            }
        }
        None => {
            info!("ℹ️  LLM backend not configured");
        }
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
pub struct AppError {
    status: StatusCode,
    message: String,
    detail: Option<String>,
    internal: Option<anyhow::Error>,
}

impl AppError {
    fn with_status(status: StatusCode, msg: &str) -> Self {
        Self {
            status,
            message: msg.to_string(),
            detail: None,
            internal: None,
        }
    }

    pub fn bad_request(msg: &str) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, msg)
    }

    pub fn not_found(msg: &str) -> Self {
        Self::with_status(StatusCode::NOT_FOUND, msg)
    }

    pub fn internal(msg: &str) -> Self {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    pub fn conflict(msg: &str) -> Self {
        Self::with_status(StatusCode::CONFLICT, msg)
    }

    pub fn unavailable(msg: &str) -> Self {
        Self::with_status(StatusCode::SERVICE_UNAVAILABLE, msg)
    }

    /// Map a core error, exposing only validation and lookup failures
    pub fn from_core(err: caixa_core::Error) -> Self {
        match err {
            caixa_core::Error::InvalidData(msg) => Self::bad_request(&msg),
            caixa_core::Error::NotFound(msg) => Self::not_found(&msg),
            other => Self::from(other),
        }
    }

    /// Map an import failure to its user-facing title and detail
    pub fn from_import(err: ImportError) -> Self {
        let status = match &err {
            ImportError::MissingBankAccount => StatusCode::BAD_REQUEST,
            ImportError::AlreadyRunning | ImportError::NothingToRetry => StatusCode::CONFLICT,
            ImportError::NoTransactionsFound | ImportError::NoValidTransactions => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ImportError::Read(_) => StatusCode::BAD_REQUEST,
            ImportError::Llm(_) if err.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            ImportError::Llm(_) => StatusCode::BAD_GATEWAY,
            ImportError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let message = err.user_message();
        if status.is_server_error() {
            error!(error = %err, "Import failed");
        }
        Self {
            status,
            message: message.title,
            detail: Some(message.detail),
            internal: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = match self.detail {
            Some(detail) => Json(serde_json::json!({
                "error": self.message,
                "detail": detail,
            })),
            None => Json(serde_json::json!({
                "error": self.message
            })),
        };

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            // Return generic message to client
            message: "An internal error occurred".to_string(),
            detail: None,
            // Keep full error for logging
            internal: Some(err),
        }
    }
}

#[cfg(test)]
mod tests;
