use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use validator::Validate;

// --- Core Application Schemas (Mapped to Database) ---

/// Role
///
/// The persisted role enum (`user_role` in Postgres). Admin privileges are granted by
/// the separate `is_admin` flag; the role is descriptive metadata shown to clients.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS, ToSchema, sqlx::Type,
)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    #[default]
    User,
    Admin,
}

/// User
///
/// A row of the `users` table without the password hash. This is the only user shape
/// that is ever serialized.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    pub id: i64,
    pub name: String,
    // Unique across all users.
    pub email: String,
    pub phone: Option<String>,
    #[serde(rename = "isAdmin")]
    pub is_admin: bool,
    pub role: Role,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// UserRecord
///
/// Internal row used for login: the public user plus the Argon2id PHC hash.
#[derive(Debug, Clone, FromRow, Default)]
pub struct UserRecord {
    #[sqlx(flatten)]
    pub user: User,
    #[sqlx(rename = "password")]
    pub password_hash: String,
}

/// Blog
///
/// A row of the `blogs` table. `image` and `video` hold relative upload paths such as
/// `/uploads/image-1741423276761-3fa2c9d1.webp`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Blog {
    pub id: i64,
    pub author: Option<String>,
    pub title: String,
    pub article: String,
    pub image: Option<String>,
    pub video: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Category
///
/// A row of the `categories` table. Always owned by exactly one blog.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub blog_id: i64,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// CategorySummary
///
/// The `{id, name}` projection embedded in blog responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CategorySummary {
    pub id: i64,
    pub name: String,
}

impl From<&Category> for CategorySummary {
    fn from(category: &Category) -> Self {
        Self {
            id: category.id,
            name: category.name.clone(),
        }
    }
}

/// BlogWithCategories
///
/// A blog as returned by the API: the blog columns with its categories inlined.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct BlogWithCategories {
    #[serde(flatten)]
    pub blog: Blog,
    pub categories: Vec<CategorySummary>,
}

// --- Request Payloads (Input Schemas) ---

/// CreateBlogRequest
///
/// Input payload for `POST /api/blogs`. `categories` are names; each becomes a
/// category owned by the new blog.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct CreateBlogRequest {
    pub author: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Article is required"))]
    pub article: String,
    pub image: Option<String>,
    pub video: Option<String>,
    pub categories: Option<Vec<String>>,
}

/// UpdateBlogRequest
///
/// Partial update for `PUT /api/blogs/{id}`. Absent or empty fields keep their
/// current value; a non-empty `categories` list replaces the blog's categories.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateBlogRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub article: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
}

/// BulkDeleteRequest
///
/// Body of `DELETE /api/blogs/delete-bulk`. Dates are RFC 3339 timestamps or plain
/// `YYYY-MM-DD` days (midnight UTC).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BulkDeleteRequest {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// CategoryRequest
///
/// Body for creating (name required) or renaming (name optional) a category.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CategoryRequest {
    pub name: Option<String>,
}

/// LoginRequest
///
/// No format rules: any bad or missing credential answers "Invalid email or password".
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// RegisterUserRequest
///
/// Public registration. The role and admin flag are not accepted here; new accounts
/// are always plain users.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct RegisterUserRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[serde(default)]
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    pub phone: Option<String>,
    #[serde(default)]
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

/// UpdateProfileRequest
///
/// Self-service update of the caller's own account.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    #[validate(email(message = "A valid email is required"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: Option<String>,
}

/// AdminUpdateUserRequest
///
/// Admin edit of any account, including privilege fields.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct AdminUpdateUserRequest {
    pub name: Option<String>,
    #[validate(email(message = "A valid email is required"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: Option<String>,
    #[serde(rename = "isAdmin")]
    pub is_admin: Option<bool>,
    pub role: Option<Role>,
}

/// NewUser
///
/// Insert payload handed to the repository once the password has been hashed.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password_hash: String,
}

/// UserChanges
///
/// Column-level patch applied by the repository. `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password_hash: Option<String>,
    pub is_admin: Option<bool>,
    pub role: Option<Role>,
}

// --- Response Schemas (Output) ---

/// AuthResponse
///
/// The user plus a freshly issued bearer token.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AuthResponse {
    #[serde(flatten)]
    pub user: User,
    pub token: String,
}

/// MessageResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// BulkDeleteResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct BulkDeleteResponse {
    pub message: String,
    pub deleted: u64,
}

/// ImageListResponse
///
/// Output of `GET /api/images`: every filename in the uploads directory.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ImageListResponse {
    pub success: bool,
    pub images: Vec<String>,
}

/// ImageDeleteResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ImageDeleteResponse {
    pub success: bool,
    pub message: String,
}

/// CleanupResponse
///
/// Output of the orphan cleanup: how many files went and which ones.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CleanupResponse {
    pub success: bool,
    pub message: String,
    #[serde(rename = "deletedFiles")]
    pub deleted_files: Vec<String>,
}
