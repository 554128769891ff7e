use crate::{
    AppState,
    auth::{AdminUser, AuthUser, generate_token, hash_password, verify_password},
    error::{AppError, AppResult},
    handlers::{SearchFilter, non_blank},
    models::{
        AdminUpdateUserRequest, AuthResponse, LoginRequest, NewUser, RegisterUserRequest,
        UpdateProfileRequest, User, UserChanges,
    },
    validation::{JsonBody, PathParam, validate_payload},
};
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};

const INVALID_CREDENTIALS: &str = "Invalid email or password";
const USER_EXISTS: &str = "User already exists";

/// Emails are stored and compared trimmed and lowercased.
fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Passwords are kept verbatim; only an empty one counts as absent.
fn non_empty_password(password: Option<String>) -> Option<String> {
    password.filter(|p| !p.is_empty())
}

/// Fails with "User already exists" when `email` belongs to someone other than `user_id`.
async fn ensure_email_free(state: &AppState, email: &str, user_id: i64) -> AppResult<()> {
    match state.repo.find_user_by_email(email).await? {
        Some(existing) if existing.user.id != user_id => Err(AppError::bad_request(USER_EXISTS)),
        _ => Ok(()),
    }
}

/// Applies the shared name/email/phone/password rules of both update routes.
async fn base_changes(
    state: &AppState,
    user_id: i64,
    name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    password: Option<String>,
) -> AppResult<UserChanges> {
    let email = non_blank(email).map(|e| normalize_email(&e));
    if let Some(email) = &email {
        ensure_email_free(state, email, user_id).await?;
    }

    let password_hash = match non_empty_password(password) {
        Some(password) => Some(hash_password(&password)?),
        None => None,
    };

    Ok(UserChanges {
        name: non_blank(name),
        email,
        phone: non_blank(phone),
        password_hash,
        ..UserChanges::default()
    })
}

fn auth_response(user: User, state: &AppState) -> AppResult<AuthResponse> {
    let token = generate_token(user.id, &state.config)?;
    Ok(AuthResponse { user, token })
}

// --- Public ---

/// login
///
/// [Public Route] Exchanges email and password for the user and a bearer token.
/// Unknown email and wrong password answer identically.
#[utoipa::path(
    post,
    path = "/api/users/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 401, description = "Invalid email or password")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let email = normalize_email(&payload.email);

    let Some(record) = state.repo.find_user_by_email(&email).await? else {
        tracing::debug!(%email, "login for unknown email");
        return Err(AppError::unauthorized(INVALID_CREDENTIALS));
    };

    if !verify_password(&payload.password, &record.password_hash)? {
        tracing::debug!(user_id = record.user.id, "login with wrong password");
        return Err(AppError::unauthorized(INVALID_CREDENTIALS));
    }

    tracing::info!(user_id = record.user.id, "user logged in");
    Ok(Json(auth_response(record.user, &state)?))
}

/// register_user
///
/// [Public Route] Creates a plain user account and signs it in.
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = RegisterUserRequest,
    responses(
        (status = 201, description = "Registered", body = AuthResponse),
        (status = 400, description = "Invalid input or user already exists")
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<RegisterUserRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let payload = RegisterUserRequest {
        name: payload.name.trim().to_string(),
        email: normalize_email(&payload.email),
        phone: non_blank(payload.phone),
        password: payload.password,
    };
    validate_payload(&payload)?;

    if state.repo.find_user_by_email(&payload.email).await?.is_some() {
        return Err(AppError::bad_request(USER_EXISTS));
    }

    let user = state
        .repo
        .create_user(NewUser {
            name: payload.name,
            email: payload.email,
            phone: payload.phone,
            password_hash: hash_password(&payload.password)?,
        })
        .await?;

    tracing::info!(user_id = user.id, "user registered");
    Ok((StatusCode::CREATED, Json(auth_response(user, &state)?)))
}

// --- Authenticated ---

/// get_profile
///
/// [Authenticated Route] The caller's own account.
#[utoipa::path(
    get,
    path = "/api/users/profile",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Profile", body = User),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_profile(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<User>> {
    state
        .repo
        .get_user(auth.id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("User not found"))
}

/// update_profile
///
/// [Authenticated Route] Updates the caller's own name, email, phone or password and
/// returns a fresh token. Privilege fields cannot be changed here.
#[utoipa::path(
    put,
    path = "/api/users/profile",
    request_body = UpdateProfileRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Updated", body = AuthResponse),
        (status = 400, description = "Invalid input or email taken"),
        (status = 404, description = "User not found")
    )
)]
pub async fn update_profile(
    auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<UpdateProfileRequest>,
) -> AppResult<Json<AuthResponse>> {
    let payload = UpdateProfileRequest {
        name: non_blank(payload.name),
        email: non_blank(payload.email),
        phone: non_blank(payload.phone),
        password: non_empty_password(payload.password),
    };
    validate_payload(&payload)?;

    let changes = base_changes(
        &state,
        auth.id,
        payload.name,
        payload.email,
        payload.phone,
        payload.password,
    )
    .await?;

    let user = state
        .repo
        .update_user(auth.id, changes)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    Ok(Json(auth_response(user, &state)?))
}

// --- Admin ---

/// get_users
///
/// [Admin Route] Every user, newest first, optionally filtered by name or email.
#[utoipa::path(
    get,
    path = "/api/users",
    params(SearchFilter),
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Users", body = [User]))
)]
pub async fn get_users(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Query(filter): Query<SearchFilter>,
) -> AppResult<Json<Vec<User>>> {
    Ok(Json(state.repo.list_users(non_blank(filter.search)).await?))
}

/// get_user_by_id
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(("id" = i64, Path, description = "User ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Found", body = User),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user_by_id(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    PathParam(id): PathParam<i64>,
) -> AppResult<Json<User>> {
    state
        .repo
        .get_user(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("User not found"))
}

/// update_user
///
/// [Admin Route] Edits any account, including `isAdmin` and `role`, and returns a
/// token for that account.
#[utoipa::path(
    put,
    path = "/api/users/{id}",
    params(("id" = i64, Path, description = "User ID")),
    request_body = AdminUpdateUserRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Updated", body = AuthResponse),
        (status = 400, description = "Invalid input or email taken"),
        (status = 404, description = "User not found")
    )
)]
pub async fn update_user(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    PathParam(id): PathParam<i64>,
    JsonBody(payload): JsonBody<AdminUpdateUserRequest>,
) -> AppResult<Json<AuthResponse>> {
    let payload = AdminUpdateUserRequest {
        name: non_blank(payload.name),
        email: non_blank(payload.email),
        phone: non_blank(payload.phone),
        password: non_empty_password(payload.password),
        ..payload
    };
    validate_payload(&payload)?;

    if state.repo.get_user(id).await?.is_none() {
        return Err(AppError::not_found("User not found"));
    }

    let changes = UserChanges {
        is_admin: payload.is_admin,
        role: payload.role,
        ..base_changes(
            &state,
            id,
            payload.name,
            payload.email,
            payload.phone,
            payload.password,
        )
        .await?
    };

    let user = state
        .repo
        .update_user(id, changes)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    tracing::info!(user_id = id, admin_id = admin.id, "user updated by admin");
    Ok(Json(auth_response(user, &state)?))
}

/// delete_user
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(("id" = i64, Path, description = "User ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "User not found")
    )
)]
pub async fn delete_user(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    PathParam(id): PathParam<i64>,
) -> AppResult<StatusCode> {
    if !state.repo.delete_user(id).await? {
        return Err(AppError::not_found("User not found"));
    }
    tracing::info!(user_id = id, admin_id = admin.id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}
