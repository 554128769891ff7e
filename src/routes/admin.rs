use crate::{
    AppState, admin_middleware,
    handlers::{blogs, categories, images, users},
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post, put},
};

/// Largest accepted upload body.
const UPLOAD_BODY_LIMIT: usize = 10 * 1024 * 1024;

/// Admin Router Module
///
/// Routes restricted to accounts with `isAdmin` set. Each method router carries
/// `admin_middleware` as a route layer, so only matched methods are guarded and an
/// unsupported method still answers 405. Handlers additionally take `AdminUser`.
///
/// Several paths are shared with the public router (GET there, PUT/DELETE here);
/// axum merges the method routers.
pub fn admin_routes(state: AppState) -> Router<AppState> {
    let guard = middleware::from_fn_with_state(state, admin_middleware);

    Router::new()
        // --- Blogs ---
        .route(
            "/api/blogs",
            post(blogs::create_blog).route_layer(guard.clone()),
        )
        // DELETE /api/blogs/delete-bulk
        // Static segment, so it wins over `/api/blogs/{id}`.
        .route(
            "/api/blogs/delete-bulk",
            delete(blogs::delete_blogs_bulk).route_layer(guard.clone()),
        )
        .route(
            "/api/blogs/{id}",
            put(blogs::update_blog)
                .delete(blogs::delete_blog)
                .route_layer(guard.clone()),
        )
        // --- Categories ---
        .route(
            "/api/blogs/{id}/categories",
            post(categories::create_category).route_layer(guard.clone()),
        )
        .route(
            "/api/blogs/{id}/categories/{category_id}",
            put(categories::update_category)
                .delete(categories::delete_category)
                .route_layer(guard.clone()),
        )
        // --- Images ---
        .route(
            "/api/images",
            get(images::get_images).route_layer(guard.clone()),
        )
        .route(
            "/api/images/{filename}",
            delete(images::delete_image).route_layer(guard.clone()),
        )
        // DELETE /api/images/cleanup/unused
        // Removes files no blog references any more.
        .route(
            "/api/images/cleanup/unused",
            delete(images::remove_unused_images).route_layer(guard.clone()),
        )
        // POST /api/uploads
        // multipart/form-data with one `image` field; answers with the public path.
        .route(
            "/api/uploads",
            post(images::upload_image)
                .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT))
                .route_layer(guard.clone()),
        )
        // --- Users ---
        .route("/api/users", get(users::get_users).route_layer(guard.clone()))
        .route(
            "/api/users/{id}",
            get(users::get_user_by_id)
                .put(users::update_user)
                .delete(users::delete_user)
                .route_layer(guard),
        )
}
