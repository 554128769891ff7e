#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response, header},
};
use blog_cms::{
    AppConfig, AppError, AppResult, AppState, create_router,
    auth::{generate_token, hash_password},
    models::{
        Blog, BlogWithCategories, Category, CategorySummary, CreateBlogRequest, NewUser, Role,
        UpdateBlogRequest, User, UserChanges, UserRecord,
    },
    repository::{Repository, RepositoryState},
    storage::{MockStorageService, StorageState},
};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard};

// --- In-memory Repository ---

#[derive(Default)]
struct Tables {
    blogs: Vec<Blog>,
    categories: Vec<Category>,
    users: Vec<UserRecord>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn summaries(&self, blog_id: i64) -> Vec<CategorySummary> {
        let mut cats: Vec<&Category> = self
            .categories
            .iter()
            .filter(|c| c.blog_id == blog_id)
            .collect();
        cats.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        cats.into_iter().map(CategorySummary::from).collect()
    }

    fn with_categories(&self, blog: &Blog) -> BlogWithCategories {
        BlogWithCategories {
            blog: blog.clone(),
            categories: self.summaries(blog.id),
        }
    }

    fn add_categories(&mut self, blog_id: i64, names: &[String]) {
        for name in names {
            let id = self.next_id();
            let now = Utc::now();
            self.categories.push(Category {
                id,
                name: name.clone(),
                blog_id,
                created_at: now,
                updated_at: now,
            });
        }
    }
}

/// MemoryRepository
///
/// A `Repository` over plain vectors so router tests run without Postgres. Ordering
/// and matching follow the SQL implementation.
#[derive(Default)]
pub struct MemoryRepository {
    tables: Mutex<Tables>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap()
    }

    /// Inserts a blog with an explicit creation time.
    pub fn seed_blog(
        &self,
        title: &str,
        image: Option<&str>,
        categories: &[&str],
        created_at: DateTime<Utc>,
    ) -> Blog {
        let mut t = self.lock();
        let id = t.next_id();
        let blog = Blog {
            id,
            author: Some("Seeder".to_string()),
            title: title.to_string(),
            article: format!("Body of {title}"),
            image: image.map(str::to_string),
            video: None,
            created_at,
            updated_at: created_at,
        };
        t.blogs.push(blog.clone());
        let names: Vec<String> = categories.iter().map(|c| c.to_string()).collect();
        t.add_categories(id, &names);
        blog
    }

    /// Inserts a user with a real Argon2 hash of `password`.
    pub fn seed_user(&self, name: &str, email: &str, password: &str, is_admin: bool) -> User {
        let password_hash = hash_password(password).unwrap();
        let mut t = self.lock();
        let id = t.next_id();
        let now = Utc::now();
        let user = User {
            id,
            name: name.to_string(),
            email: email.to_string(),
            phone: None,
            is_admin,
            role: if is_admin { Role::Admin } else { Role::User },
            created_at: now,
            updated_at: now,
        };
        t.users.push(UserRecord {
            user: user.clone(),
            password_hash,
        });
        user
    }

    pub fn blog_count(&self) -> usize {
        self.lock().blogs.len()
    }

    pub fn password_hash_of(&self, id: i64) -> Option<String> {
        self.lock()
            .users
            .iter()
            .find(|r| r.user.id == id)
            .map(|r| r.password_hash.clone())
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn list_blogs(&self, search: Option<String>) -> AppResult<Vec<BlogWithCategories>> {
        let t = self.lock();
        let mut blogs: Vec<&Blog> = t
            .blogs
            .iter()
            .filter(|b| match search.as_deref() {
                Some(s) => {
                    contains_ci(&b.title, s)
                        || t.categories
                            .iter()
                            .any(|c| c.blog_id == b.id && contains_ci(&c.name, s))
                }
                None => true,
            })
            .collect();
        blogs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(blogs.into_iter().map(|b| t.with_categories(b)).collect())
    }

    async fn get_blog(&self, id: i64) -> AppResult<Option<BlogWithCategories>> {
        let t = self.lock();
        Ok(t.blogs.iter().find(|b| b.id == id).map(|b| t.with_categories(b)))
    }

    async fn create_blog(&self, req: CreateBlogRequest) -> AppResult<BlogWithCategories> {
        let mut t = self.lock();
        let id = t.next_id();
        let now = Utc::now();
        let blog = Blog {
            id,
            author: req.author,
            title: req.title,
            article: req.article,
            image: req.image,
            video: req.video,
            created_at: now,
            updated_at: now,
        };
        t.blogs.push(blog.clone());
        t.add_categories(id, &req.categories.unwrap_or_default());
        Ok(t.with_categories(&blog))
    }

    async fn update_blog(
        &self,
        id: i64,
        req: UpdateBlogRequest,
    ) -> AppResult<Option<BlogWithCategories>> {
        let mut t = self.lock();
        let Some(blog) = t.blogs.iter_mut().find(|b| b.id == id) else {
            return Ok(None);
        };
        if let Some(v) = req.author {
            blog.author = Some(v);
        }
        if let Some(v) = req.title {
            blog.title = v;
        }
        if let Some(v) = req.article {
            blog.article = v;
        }
        if let Some(v) = req.image {
            blog.image = Some(v);
        }
        if let Some(v) = req.video {
            blog.video = Some(v);
        }
        blog.updated_at = Utc::now();
        let blog = blog.clone();

        if let Some(names) = req.categories {
            t.categories.retain(|c| c.blog_id != id);
            t.add_categories(id, &names);
        }
        Ok(Some(t.with_categories(&blog)))
    }

    async fn delete_blog(&self, id: i64) -> AppResult<bool> {
        let mut t = self.lock();
        let before = t.blogs.len();
        t.blogs.retain(|b| b.id != id);
        t.categories.retain(|c| c.blog_id != id);
        Ok(t.blogs.len() < before)
    }

    async fn delete_blogs_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<u64> {
        let mut t = self.lock();
        let doomed: Vec<i64> = t
            .blogs
            .iter()
            .filter(|b| b.created_at >= start && b.created_at <= end)
            .map(|b| b.id)
            .collect();
        t.blogs.retain(|b| !doomed.contains(&b.id));
        t.categories.retain(|c| !doomed.contains(&c.blog_id));
        Ok(doomed.len() as u64)
    }

    async fn blog_image_paths(&self) -> AppResult<Vec<String>> {
        Ok(self.lock().blogs.iter().filter_map(|b| b.image.clone()).collect())
    }

    async fn blog_exists(&self, id: i64) -> AppResult<bool> {
        Ok(self.lock().blogs.iter().any(|b| b.id == id))
    }

    async fn list_categories(&self, blog_id: i64) -> AppResult<Vec<Category>> {
        let t = self.lock();
        let mut cats: Vec<Category> = t
            .categories
            .iter()
            .filter(|c| c.blog_id == blog_id)
            .cloned()
            .collect();
        cats.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(cats)
    }

    async fn get_category(&self, blog_id: i64, id: i64) -> AppResult<Option<Category>> {
        Ok(self
            .lock()
            .categories
            .iter()
            .find(|c| c.id == id && c.blog_id == blog_id)
            .cloned())
    }

    async fn create_category(&self, blog_id: i64, name: String) -> AppResult<Category> {
        let mut t = self.lock();
        t.add_categories(blog_id, &[name]);
        t.categories
            .last()
            .cloned()
            .ok_or_else(|| AppError::Internal("category insert failed".into()))
    }

    async fn update_category(
        &self,
        blog_id: i64,
        id: i64,
        name: Option<String>,
    ) -> AppResult<Option<Category>> {
        let mut t = self.lock();
        Ok(t.categories
            .iter_mut()
            .find(|c| c.id == id && c.blog_id == blog_id)
            .map(|c| {
                if let Some(name) = name {
                    c.name = name;
                }
                c.updated_at = Utc::now();
                c.clone()
            }))
    }

    async fn delete_category(&self, blog_id: i64, id: i64) -> AppResult<bool> {
        let mut t = self.lock();
        let before = t.categories.len();
        t.categories.retain(|c| !(c.id == id && c.blog_id == blog_id));
        Ok(t.categories.len() < before)
    }

    async fn get_user(&self, id: i64) -> AppResult<Option<User>> {
        Ok(self
            .lock()
            .users
            .iter()
            .find(|r| r.user.id == id)
            .map(|r| r.user.clone()))
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<UserRecord>> {
        Ok(self
            .lock()
            .users
            .iter()
            .find(|r| r.user.email == email)
            .cloned())
    }

    async fn create_user(&self, new: NewUser) -> AppResult<User> {
        let mut t = self.lock();
        if t.users.iter().any(|r| r.user.email == new.email) {
            return Err(AppError::bad_request("User already exists"));
        }
        let id = t.next_id();
        let now = Utc::now();
        let user = User {
            id,
            name: new.name,
            email: new.email,
            phone: new.phone,
            is_admin: false,
            role: Role::User,
            created_at: now,
            updated_at: now,
        };
        t.users.push(UserRecord {
            user: user.clone(),
            password_hash: new.password_hash,
        });
        Ok(user)
    }

    async fn list_users(&self, search: Option<String>) -> AppResult<Vec<User>> {
        let t = self.lock();
        let mut users: Vec<User> = t
            .users
            .iter()
            .map(|r| r.user.clone())
            .filter(|u| match search.as_deref() {
                Some(s) => contains_ci(&u.name, s) || contains_ci(&u.email, s),
                None => true,
            })
            .collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(users)
    }

    async fn update_user(&self, id: i64, changes: UserChanges) -> AppResult<Option<User>> {
        let mut t = self.lock();
        let Some(record) = t.users.iter_mut().find(|r| r.user.id == id) else {
            return Ok(None);
        };
        if let Some(v) = changes.name {
            record.user.name = v;
        }
        if let Some(v) = changes.email {
            record.user.email = v;
        }
        if let Some(v) = changes.phone {
            record.user.phone = Some(v);
        }
        if let Some(v) = changes.password_hash {
            record.password_hash = v;
        }
        if let Some(v) = changes.is_admin {
            record.user.is_admin = v;
        }
        if let Some(v) = changes.role {
            record.user.role = v;
        }
        record.user.updated_at = Utc::now();
        Ok(Some(record.user.clone()))
    }

    async fn delete_user(&self, id: i64) -> AppResult<bool> {
        let mut t = self.lock();
        let before = t.users.len();
        t.users.retain(|r| r.user.id != id);
        Ok(t.users.len() < before)
    }
}

// --- App Helpers ---

pub fn test_config() -> AppConfig {
    AppConfig {
        jwt_secret: "integration-test-secret".to_string(),
        ..AppConfig::default()
    }
}

pub fn test_state(repo: Arc<MemoryRepository>, storage: Arc<MockStorageService>) -> AppState {
    AppState {
        repo: repo as RepositoryState,
        storage: storage as StorageState,
        config: test_config(),
    }
}

pub fn test_app(repo: Arc<MemoryRepository>, storage: Arc<MockStorageService>) -> Router {
    create_router(test_state(repo, storage))
}

pub fn token_for(user_id: i64) -> String {
    generate_token(user_id, &test_config()).unwrap()
}

/// A request with an optional bearer token and an optional JSON body.
pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
