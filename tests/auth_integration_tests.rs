mod common;

use axum::{
    extract::FromRequestParts,
    http::{Method, Request, StatusCode, header, request::Parts},
};
use blog_cms::{
    AppError,
    auth::{ADMIN_ONLY, AdminUser, AuthUser, Claims, NO_TOKEN, TOKEN_FAILED},
    models::Role,
    storage::MockStorageService,
};
use chrono::Utc;
use common::{MemoryRepository, test_config, test_state, token_for};
use jsonwebtoken::{EncodingKey, Header, encode};
use std::sync::Arc;

fn get_request_parts(authorization: Option<&str>) -> Parts {
    let mut builder = Request::builder().method(Method::GET).uri("/api/users/profile");
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    let (parts, _) = builder.body(axum::body::Body::empty()).unwrap().into_parts();
    parts
}

fn assert_unauthorized(err: AppError, expected: &str) {
    let (status, message) = err.status_and_message();
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(message, expected);
}

#[tokio::test]
async fn valid_token_resolves_the_user() {
    let repo = Arc::new(MemoryRepository::new());
    let user = repo.seed_user("Grace", "grace@example.com", "password1", false);
    let state = test_state(repo, Arc::new(MockStorageService::new()));

    let mut parts = get_request_parts(Some(&format!("Bearer {}", token_for(user.id))));
    let auth = AuthUser::from_request_parts(&mut parts, &state).await.unwrap();

    assert_eq!(auth.id, user.id);
    assert_eq!(auth.email, "grace@example.com");
    assert!(!auth.is_admin);
    assert_eq!(auth.role, Role::User);
}

#[tokio::test]
async fn missing_or_malformed_header_means_no_token() {
    let state = test_state(
        Arc::new(MemoryRepository::new()),
        Arc::new(MockStorageService::new()),
    );

    for header_value in [None, Some("Basic abc"), Some("Bearer "), Some("token-without-scheme")] {
        let mut parts = get_request_parts(header_value);
        let err = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert_unauthorized(err, NO_TOKEN);
    }
}

#[tokio::test]
async fn token_signed_with_another_secret_fails() {
    let repo = Arc::new(MemoryRepository::new());
    let user = repo.seed_user("Grace", "grace@example.com", "password1", false);
    let state = test_state(repo, Arc::new(MockStorageService::new()));

    let now = Utc::now().timestamp() as usize;
    let claims = Claims {
        sub: user.id,
        iat: now,
        exp: now + 3600,
    };
    let forged = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"not-the-server-secret"),
    )
    .unwrap();

    let mut parts = get_request_parts(Some(&format!("Bearer {forged}")));
    let err = AuthUser::from_request_parts(&mut parts, &state)
        .await
        .unwrap_err();
    assert_unauthorized(err, TOKEN_FAILED);
}

#[tokio::test]
async fn expired_token_fails() {
    let repo = Arc::new(MemoryRepository::new());
    let user = repo.seed_user("Grace", "grace@example.com", "password1", false);
    let state = test_state(repo, Arc::new(MockStorageService::new()));

    let issued = (Utc::now().timestamp() - 7200) as usize;
    let claims = Claims {
        sub: user.id,
        iat: issued,
        exp: issued + 60,
    };
    let expired = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(test_config().jwt_secret.as_bytes()),
    )
    .unwrap();

    let mut parts = get_request_parts(Some(&format!("Bearer {expired}")));
    let err = AuthUser::from_request_parts(&mut parts, &state)
        .await
        .unwrap_err();
    assert_unauthorized(err, TOKEN_FAILED);
}

#[tokio::test]
async fn admin_extractor_checks_the_flag() {
    let repo = Arc::new(MemoryRepository::new());
    let admin = repo.seed_user("Root", "root@example.com", "password1", true);
    let user = repo.seed_user("Guest", "guest@example.com", "password2", false);
    let state = test_state(repo, Arc::new(MockStorageService::new()));

    let mut parts = get_request_parts(Some(&format!("Bearer {}", token_for(admin.id))));
    let AdminUser(resolved) = AdminUser::from_request_parts(&mut parts, &state)
        .await
        .unwrap();
    assert_eq!(resolved.id, admin.id);
    assert_eq!(resolved.role, Role::Admin);

    let mut parts = get_request_parts(Some(&format!("Bearer {}", token_for(user.id))));
    let err = AdminUser::from_request_parts(&mut parts, &state)
        .await
        .unwrap_err();
    assert_unauthorized(err, ADMIN_ONLY);
}

#[tokio::test]
async fn identity_in_extensions_skips_the_lookup() {
    // Empty repository: a database lookup would fail.
    let state = test_state(
        Arc::new(MemoryRepository::new()),
        Arc::new(MockStorageService::new()),
    );

    let mut parts = get_request_parts(None);
    parts.extensions.insert(AuthUser {
        id: 77,
        name: "Cached".to_string(),
        email: "cached@example.com".to_string(),
        is_admin: true,
        role: Role::Admin,
    });

    let auth = AuthUser::from_request_parts(&mut parts, &state).await.unwrap();
    assert_eq!(auth.id, 77);
    let AdminUser(admin) = AdminUser::from_request_parts(&mut parts, &state)
        .await
        .unwrap();
    assert_eq!(admin.name, "Cached");
}
