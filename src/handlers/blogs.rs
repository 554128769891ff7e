use crate::{
    AppState,
    auth::AdminUser,
    error::{AppError, AppResult},
    handlers::{SearchFilter, clean_category_names, non_blank},
    models::{
        BlogWithCategories, BulkDeleteRequest, BulkDeleteResponse, CreateBlogRequest,
        MessageResponse, UpdateBlogRequest,
    },
    validation::{JsonBody, PathParam, ValidatedJson},
};
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use chrono::{DateTime, NaiveDate, Utc};

/// get_blogs
///
/// [Public Route] Lists every blog with its categories, newest first. `search`
/// narrows the list to blogs whose title or any category name contains it.
#[utoipa::path(
    get,
    path = "/api/blogs",
    params(SearchFilter),
    responses((status = 200, description = "Blogs", body = [BlogWithCategories]))
)]
pub async fn get_blogs(
    State(state): State<AppState>,
    Query(filter): Query<SearchFilter>,
) -> AppResult<Json<Vec<BlogWithCategories>>> {
    let blogs = state.repo.list_blogs(non_blank(filter.search)).await?;
    Ok(Json(blogs))
}

/// get_blog
///
/// [Public Route] One blog with its categories.
#[utoipa::path(
    get,
    path = "/api/blogs/{id}",
    params(("id" = i64, Path, description = "Blog ID")),
    responses(
        (status = 200, description = "Found", body = BlogWithCategories),
        (status = 404, description = "Blog not found")
    )
)]
pub async fn get_blog(
    State(state): State<AppState>,
    PathParam(id): PathParam<i64>,
) -> AppResult<Json<BlogWithCategories>> {
    state
        .repo
        .get_blog(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Blog not found"))
}

/// create_blog
///
/// [Admin Route] Creates a blog. Category names in the payload become categories
/// owned by the new blog.
#[utoipa::path(
    post,
    path = "/api/blogs",
    request_body = CreateBlogRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Created", body = BlogWithCategories),
        (status = 400, description = "Missing title or article")
    )
)]
pub async fn create_blog(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateBlogRequest>,
) -> AppResult<(StatusCode, Json<BlogWithCategories>)> {
    let title = payload.title.trim().to_string();
    let article = payload.article.trim().to_string();
    if title.is_empty() || article.is_empty() {
        return Err(AppError::bad_request("Please provide a title and an article"));
    }

    let req = CreateBlogRequest {
        author: non_blank(payload.author),
        title,
        article,
        image: non_blank(payload.image),
        video: non_blank(payload.video),
        categories: payload.categories.map(clean_category_names),
    };

    let blog = state.repo.create_blog(req).await?;
    tracing::info!(blog_id = blog.blog.id, admin_id = admin.id, "blog created");
    Ok((StatusCode::CREATED, Json(blog)))
}

/// update_blog
///
/// [Admin Route] Partial update. Absent or blank fields keep their value; a
/// non-empty `categories` list replaces the blog's categories.
#[utoipa::path(
    put,
    path = "/api/blogs/{id}",
    params(("id" = i64, Path, description = "Blog ID")),
    request_body = UpdateBlogRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Updated", body = BlogWithCategories),
        (status = 404, description = "Blog not found")
    )
)]
pub async fn update_blog(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    PathParam(id): PathParam<i64>,
    JsonBody(payload): JsonBody<UpdateBlogRequest>,
) -> AppResult<Json<BlogWithCategories>> {
    let req = UpdateBlogRequest {
        author: non_blank(payload.author),
        title: non_blank(payload.title),
        article: non_blank(payload.article),
        image: non_blank(payload.image),
        video: non_blank(payload.video),
        categories: payload
            .categories
            .map(clean_category_names)
            .filter(|names| !names.is_empty()),
    };

    state
        .repo
        .update_blog(id, req)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Blog not found"))
}

/// delete_blog
///
/// [Admin Route] Deletes a blog and its categories. The blog's image file stays on
/// disk until the orphan cleanup runs.
#[utoipa::path(
    delete,
    path = "/api/blogs/{id}",
    params(("id" = i64, Path, description = "Blog ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 404, description = "Blog not found")
    )
)]
pub async fn delete_blog(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    PathParam(id): PathParam<i64>,
) -> AppResult<Json<MessageResponse>> {
    if !state.repo.delete_blog(id).await? {
        return Err(AppError::not_found("Blog not found"));
    }
    tracing::info!(blog_id = id, admin_id = admin.id, "blog deleted");
    Ok(Json(MessageResponse::new("Blog removed")))
}

/// delete_blogs_bulk
///
/// [Admin Route] Deletes every blog created between `startDate` and `endDate`,
/// both inclusive.
#[utoipa::path(
    delete,
    path = "/api/blogs/delete-bulk",
    request_body = BulkDeleteRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Deleted", body = BulkDeleteResponse),
        (status = 400, description = "Missing or invalid dates")
    )
)]
pub async fn delete_blogs_bulk(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<BulkDeleteRequest>,
) -> AppResult<Json<BulkDeleteResponse>> {
    let (Some(start), Some(end)) = (non_blank(payload.start_date), non_blank(payload.end_date))
    else {
        return Err(AppError::bad_request(
            "Please provide both start and end dates",
        ));
    };

    let start = parse_date_boundary(&start)
        .ok_or_else(|| AppError::bad_request(format!("Invalid start date: {start}")))?;
    let end = parse_date_boundary(&end)
        .ok_or_else(|| AppError::bad_request(format!("Invalid end date: {end}")))?;

    if start > end {
        return Err(AppError::bad_request("Start date must not be after end date"));
    }

    let deleted = state.repo.delete_blogs_between(start, end).await?;
    tracing::info!(deleted, %start, %end, admin_id = admin.id, "bulk blog deletion");

    Ok(Json(BulkDeleteResponse {
        message: format!("{deleted} blogs deleted"),
        deleted,
    }))
}

/// parse_date_boundary
///
/// RFC 3339 timestamps keep their instant; plain `YYYY-MM-DD` dates mean midnight UTC.
pub fn parse_date_boundary(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}
