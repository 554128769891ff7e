use crate::{AppState, auth_middleware, handlers::users};
use axum::{Router, middleware, routing::get};

/// Authenticated Router Module
///
/// Routes for any signed-in user, guarded per method by `auth_middleware`. Every
/// handler also takes `AuthUser`, so the caller's id always comes from the token and
/// never from the request body.
pub fn authenticated_routes(state: AppState) -> Router<AppState> {
    let guard = middleware::from_fn_with_state(state, auth_middleware);

    Router::<AppState>::new()
        // GET/PUT /api/users/profile
        // Read or update the caller's own account. The update returns a fresh token.
        .route(
            "/api/users/profile",
            get(users::get_profile)
                .put(users::update_profile)
                .route_layer(guard),
        )
}
