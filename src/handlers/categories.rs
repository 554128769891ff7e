use crate::{
    AppState,
    auth::AdminUser,
    error::{AppError, AppResult},
    handlers::non_blank,
    models::{Category, CategoryRequest, MessageResponse},
    validation::{JsonBody, PathParam},
};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
};

// Every category route is nested under its blog: /api/blogs/{id}/categories[/{category_id}].

/// get_categories
///
/// [Public Route] The categories of one blog, by name.
#[utoipa::path(
    get,
    path = "/api/blogs/{id}/categories",
    params(("id" = i64, Path, description = "Blog ID")),
    responses(
        (status = 200, description = "Categories", body = [Category]),
        (status = 404, description = "Blog not found")
    )
)]
pub async fn get_categories(
    State(state): State<AppState>,
    PathParam(blog_id): PathParam<i64>,
) -> AppResult<Json<Vec<Category>>> {
    if !state.repo.blog_exists(blog_id).await? {
        return Err(AppError::not_found("Blog not found"));
    }
    Ok(Json(state.repo.list_categories(blog_id).await?))
}

/// get_category
#[utoipa::path(
    get,
    path = "/api/blogs/{id}/categories/{category_id}",
    params(
        ("id" = i64, Path, description = "Blog ID"),
        ("category_id" = i64, Path, description = "Category ID")
    ),
    responses(
        (status = 200, description = "Found", body = Category),
        (status = 404, description = "Category not found")
    )
)]
pub async fn get_category(
    State(state): State<AppState>,
    PathParam((blog_id, id)): PathParam<(i64, i64)>,
) -> AppResult<Json<Category>> {
    state
        .repo
        .get_category(blog_id, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Category not found"))
}

/// create_category
///
/// [Admin Route] Adds a named category to an existing blog.
#[utoipa::path(
    post,
    path = "/api/blogs/{id}/categories",
    params(("id" = i64, Path, description = "Blog ID")),
    request_body = CategoryRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Created", body = Category),
        (status = 400, description = "Missing name"),
        (status = 404, description = "Blog not found")
    )
)]
pub async fn create_category(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    PathParam(blog_id): PathParam<i64>,
    JsonBody(payload): JsonBody<CategoryRequest>,
) -> AppResult<(StatusCode, Json<Category>)> {
    let name = non_blank(payload.name)
        .ok_or_else(|| AppError::bad_request("Please provide a category name"))?;

    if !state.repo.blog_exists(blog_id).await? {
        return Err(AppError::not_found("Blog not found"));
    }

    let category = state.repo.create_category(blog_id, name).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// update_category
///
/// [Admin Route] Renames a category. An empty or absent name leaves it unchanged.
#[utoipa::path(
    put,
    path = "/api/blogs/{id}/categories/{category_id}",
    params(
        ("id" = i64, Path, description = "Blog ID"),
        ("category_id" = i64, Path, description = "Category ID")
    ),
    request_body = CategoryRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Updated", body = Category),
        (status = 404, description = "Category not found")
    )
)]
pub async fn update_category(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    PathParam((blog_id, id)): PathParam<(i64, i64)>,
    JsonBody(payload): JsonBody<CategoryRequest>,
) -> AppResult<Json<Category>> {
    state
        .repo
        .update_category(blog_id, id, non_blank(payload.name))
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Category not found"))
}

/// delete_category
#[utoipa::path(
    delete,
    path = "/api/blogs/{id}/categories/{category_id}",
    params(
        ("id" = i64, Path, description = "Blog ID"),
        ("category_id" = i64, Path, description = "Category ID")
    ),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 404, description = "Category not found")
    )
)]
pub async fn delete_category(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    PathParam((blog_id, id)): PathParam<(i64, i64)>,
) -> AppResult<Json<MessageResponse>> {
    if !state.repo.delete_category(blog_id, id).await? {
        return Err(AppError::not_found("Category not found"));
    }
    Ok(Json(MessageResponse::new("Category removed")))
}
