use crate::{
    AppState,
    auth::AdminUser,
    error::{AppError, AppResult},
    models::{CleanupResponse, ImageDeleteResponse, ImageListResponse},
    storage::{
        allowed_image_extension, find_orphans, generate_upload_name, is_safe_filename, public_path,
    },
    validation::PathParam,
};
use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartRejection},
};

/// The multipart field carrying the uploaded file; also the stored name's prefix.
const UPLOAD_FIELD: &str = "image";

/// get_images
///
/// [Admin Route] Lists every file in the uploads directory.
#[utoipa::path(
    get,
    path = "/api/images",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Stored files", body = ImageListResponse))
)]
pub async fn get_images(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
) -> AppResult<Json<ImageListResponse>> {
    let images = state.storage.list().await?;
    Ok(Json(ImageListResponse {
        success: true,
        images,
    }))
}

/// delete_image
///
/// [Admin Route] Removes a single stored file by name.
#[utoipa::path(
    delete,
    path = "/api/images/{filename}",
    params(("filename" = String, Path, description = "Stored file name")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Deleted", body = ImageDeleteResponse),
        (status = 400, description = "Invalid filename"),
        (status = 404, description = "File not found")
    )
)]
pub async fn delete_image(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    PathParam(filename): PathParam<String>,
) -> AppResult<Json<ImageDeleteResponse>> {
    if !is_safe_filename(&filename) {
        tracing::warn!(%filename, admin_id = admin.id, "rejected unsafe filename");
        return Err(AppError::bad_request("Invalid filename"));
    }

    if !state.storage.delete(&filename).await? {
        return Err(AppError::not_found("File not found"));
    }

    tracing::info!(%filename, admin_id = admin.id, "image deleted");
    Ok(Json(ImageDeleteResponse {
        success: true,
        message: "File deleted successfully".to_string(),
    }))
}

/// remove_unused_images
///
/// [Admin Route] Deletes every stored file that no blog's `image` points at.
///
/// A file that disappears between listing and deleting is skipped, not reported.
#[utoipa::path(
    delete,
    path = "/api/images/cleanup/unused",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Orphans removed", body = CleanupResponse))
)]
pub async fn remove_unused_images(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
) -> AppResult<Json<CleanupResponse>> {
    let files = state.storage.list().await?;
    let referenced = state.repo.blog_image_paths().await?;

    let mut deleted_files = Vec::new();
    for orphan in find_orphans(&files, &referenced) {
        if state.storage.delete(&orphan).await? {
            deleted_files.push(orphan);
        }
    }

    tracing::info!(
        deleted = deleted_files.len(),
        admin_id = admin.id,
        "removed unused images"
    );

    Ok(Json(CleanupResponse {
        success: true,
        message: format!("Deleted {} redundant images.", deleted_files.len()),
        deleted_files,
    }))
}

/// upload_image
///
/// [Admin Route] Accepts one `image` field (jpeg/jpg/png/webp), stores it under a
/// generated name and returns its public path as plain text.
#[utoipa::path(
    post,
    path = "/api/uploads",
    security(("bearer_auth" = [])),
    request_body(
        content = String,
        content_type = "multipart/form-data",
        description = "Form with an `image` file field"
    ),
    responses(
        (status = 200, description = "Public path of the stored file", body = String, content_type = "text/plain"),
        (status = 400, description = "No file uploaded or not an image")
    )
)]
pub async fn upload_image(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<String> {
    let mut multipart = multipart.map_err(|_| AppError::bad_request("No file uploaded"))?;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(format!("Invalid upload: {}", e.body_text())))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let original_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();

        let Some(ext) = allowed_image_extension(&original_name, &content_type) else {
            tracing::warn!(%original_name, %content_type, "rejected non-image upload");
            return Err(AppError::bad_request("Only images are allowed"));
        };

        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::bad_request(format!("Invalid upload: {}", e.body_text())))?;

        let filename = generate_upload_name(UPLOAD_FIELD, &ext);
        state.storage.save(&filename, &bytes).await?;

        tracing::info!(%filename, size = bytes.len(), admin_id = admin.id, "image uploaded");
        return Ok(public_path(&filename));
    }

    Err(AppError::bad_request("No file uploaded"))
}
