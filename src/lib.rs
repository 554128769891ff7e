use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::Next,
    response::Response,
};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod storage;
pub mod validation;

// Routing segregation (Public, Authenticated, Admin).
pub mod routes;
use auth::{AdminUser, AuthUser};
use handlers::{blogs, categories, images, users};
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::{AppConfig, Env};
pub use error::{AppError, AppResult};
pub use repository::{PostgresRepository, Repository, RepositoryState};
pub use storage::{LocalDiskStorage, MockStorageService, StorageService, StorageState};

/// ApiDoc
///
/// OpenAPI document for every documented handler and schema, served at
/// `/api-docs/openapi.json` with Swagger UI at `/swagger-ui`.
#[derive(OpenApi)]
#[openapi(
    paths(
        blogs::get_blogs, blogs::get_blog, blogs::create_blog, blogs::update_blog,
        blogs::delete_blog, blogs::delete_blogs_bulk,
        categories::get_categories, categories::get_category, categories::create_category,
        categories::update_category, categories::delete_category,
        images::get_images, images::delete_image, images::remove_unused_images,
        images::upload_image,
        users::login, users::register_user, users::get_profile, users::update_profile,
        users::get_users, users::get_user_by_id, users::update_user, users::delete_user
    ),
    components(
        schemas(
            models::Role, models::User, models::Blog, models::Category,
            models::CategorySummary, models::BlogWithCategories, models::CreateBlogRequest,
            models::UpdateBlogRequest, models::BulkDeleteRequest, models::CategoryRequest,
            models::LoginRequest, models::RegisterUserRequest, models::UpdateProfileRequest,
            models::AdminUpdateUserRequest, models::AuthResponse, models::MessageResponse,
            models::BulkDeleteResponse, models::ImageListResponse, models::ImageDeleteResponse,
            models::CleanupResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "blog-cms", description = "Blog CMS API")
    )
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme referenced by protected paths.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// AppState
///
/// The single shared container for the repository, storage and configuration.
#[derive(Clone)]
pub struct AppState {
    /// Repository Layer: blogs, categories and users.
    pub repo: RepositoryState,
    /// Storage Layer: the uploads directory.
    pub storage: StorageState,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Guards `authenticated_routes`. A failed `AuthUser` extraction rejects with 401
/// before the handler runs; on success the identity is stored in the request
/// extensions so the handler's own extractor does not query the database again.
pub(crate) async fn auth_middleware(auth_user: AuthUser, mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(auth_user);
    next.run(request).await
}

/// admin_middleware
///
/// Same as `auth_middleware` but also requires `is_admin`.
pub(crate) async fn admin_middleware(
    AdminUser(admin): AdminUser,
    mut request: Request,
    next: Next,
) -> Response {
    request.extensions_mut().insert(admin);
    next.run(request).await
}

/// create_router
///
/// Assembles the public, authenticated and admin routers, static upload serving
/// and the observability layers.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    let uploads = ServeDir::new(&state.config.uploads_dir);

    // 2. Base Router Assembly
    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(authenticated::authenticated_routes(state.clone()))
        .merge(admin::admin_routes(state.clone()))
        // GET /uploads/{filename}
        // Files written by `POST /api/uploads`, served as-is.
        .nest_service(storage::PUBLIC_PREFIX, uploads)
        .with_state(state);

    // 3. Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer
        .layer(cors)
}

/// trace_span_logger
///
/// Span for `TraceLayer` carrying the method, URI and `x-request-id`, so every log
/// line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
