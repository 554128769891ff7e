use crate::{
    AppState,
    handlers::{blogs, categories, users},
};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints that need no token. Everything here is read-only except the two
/// identity gateways, login and registration.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness check for load balancers; answers "ok" without touching the database.
        .route("/health", get(|| async { "ok" }))
        // GET /api/blogs?search=...
        // All blogs with their categories, newest first.
        .route("/api/blogs", get(blogs::get_blogs))
        .route("/api/blogs/{id}", get(blogs::get_blog))
        // GET /api/blogs/{id}/categories[/{category_id}]
        // Categories are always addressed through the blog that owns them.
        .route("/api/blogs/{id}/categories", get(categories::get_categories))
        .route(
            "/api/blogs/{id}/categories/{category_id}",
            get(categories::get_category),
        )
        // POST /api/users/login
        .route("/api/users/login", post(users::login))
        // POST /api/users
        // Registration. New accounts are never administrators.
        .route("/api/users", post(users::register_user))
}
