use crate::{
    error::{AppError, AppResult},
    models::{
        Blog, BlogWithCategories, Category, CategorySummary, CreateBlogRequest, NewUser,
        UpdateBlogRequest, User, UserChanges, UserRecord,
    },
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool, Postgres, query_builder::QueryBuilder};
use std::{collections::HashMap, sync::Arc};

/// Repository Trait
///
/// The persistence contract used by handlers and the auth extractor. `None` / `false`
/// mean "no such row"; `Err` is reserved for database failures.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Blogs ---
    // Newest first. `search` matches the title or any category name, case-insensitively.
    async fn list_blogs(&self, search: Option<String>) -> AppResult<Vec<BlogWithCategories>>;
    async fn get_blog(&self, id: i64) -> AppResult<Option<BlogWithCategories>>;
    // Inserts the blog and its named categories together.
    async fn create_blog(&self, req: CreateBlogRequest) -> AppResult<BlogWithCategories>;
    // `None` fields keep their value; `Some(categories)` replaces the category set.
    async fn update_blog(
        &self,
        id: i64,
        req: UpdateBlogRequest,
    ) -> AppResult<Option<BlogWithCategories>>;
    async fn delete_blog(&self, id: i64) -> AppResult<bool>;
    // Inclusive on both ends. Returns the number of deleted blogs.
    async fn delete_blogs_between(&self, start: DateTime<Utc>, end: DateTime<Utc>)
    -> AppResult<u64>;
    // Every non-null `blogs.image` value, used for orphan detection.
    async fn blog_image_paths(&self) -> AppResult<Vec<String>>;

    // --- Categories (scoped to a blog) ---
    async fn blog_exists(&self, id: i64) -> AppResult<bool>;
    async fn list_categories(&self, blog_id: i64) -> AppResult<Vec<Category>>;
    async fn get_category(&self, blog_id: i64, id: i64) -> AppResult<Option<Category>>;
    async fn create_category(&self, blog_id: i64, name: String) -> AppResult<Category>;
    async fn update_category(
        &self,
        blog_id: i64,
        id: i64,
        name: Option<String>,
    ) -> AppResult<Option<Category>>;
    async fn delete_category(&self, blog_id: i64, id: i64) -> AppResult<bool>;

    // --- Users ---
    async fn get_user(&self, id: i64) -> AppResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<UserRecord>>;
    async fn create_user(&self, user: NewUser) -> AppResult<User>;
    // Newest first. `search` matches name or email, case-insensitively.
    async fn list_users(&self, search: Option<String>) -> AppResult<Vec<User>>;
    async fn update_user(&self, id: i64, changes: UserChanges) -> AppResult<Option<User>>;
    async fn delete_user(&self, id: i64) -> AppResult<bool>;
}

/// RepositoryState
///
/// The shared handle stored in `AppState`.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The `Repository` backed by PostgreSQL through a sqlx pool.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Loads the categories of `blogs` in one query and pairs them up.
    async fn attach_categories(&self, blogs: Vec<Blog>) -> AppResult<Vec<BlogWithCategories>> {
        if blogs.is_empty() {
            return Ok(vec![]);
        }

        let ids: Vec<i64> = blogs.iter().map(|b| b.id).collect();
        let categories = sqlx::query_as::<_, Category>(
            r#"SELECT id, name, blog_id, created_at, updated_at
               FROM categories
               WHERE blog_id = ANY($1)
               ORDER BY name ASC, id ASC"#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_blog: HashMap<i64, Vec<CategorySummary>> = HashMap::new();
        for category in &categories {
            by_blog
                .entry(category.blog_id)
                .or_default()
                .push(CategorySummary::from(category));
        }

        Ok(blogs
            .into_iter()
            .map(|blog| {
                let categories = by_blog.remove(&blog.id).unwrap_or_default();
                BlogWithCategories { blog, categories }
            })
            .collect())
    }
}

/// Escapes `%`, `_` and `\` so user input is matched literally inside ILIKE.
pub(crate) fn like_pattern(search: &str) -> String {
    let mut escaped = String::with_capacity(search.len() + 2);
    escaped.push('%');
    for ch in search.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

async fn insert_categories(
    conn: &mut PgConnection,
    blog_id: i64,
    names: &[String],
) -> Result<Vec<Category>, sqlx::Error> {
    let mut created = Vec::with_capacity(names.len());
    for name in names {
        let category = sqlx::query_as::<_, Category>(
            r#"INSERT INTO categories (name, blog_id, created_at, updated_at)
               VALUES ($1, $2, NOW(), NOW())
               RETURNING id, name, blog_id, created_at, updated_at"#,
        )
        .bind(name)
        .bind(blog_id)
        .fetch_one(&mut *conn)
        .await?;
        created.push(category);
    }
    Ok(created)
}

#[async_trait]
impl Repository for PostgresRepository {
    /// list_blogs
    ///
    /// QueryBuilder keeps the optional search parameterized. Category matches use
    /// EXISTS so a blog with several matching categories appears once.
    async fn list_blogs(&self, search: Option<String>) -> AppResult<Vec<BlogWithCategories>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            r#"
            SELECT b.id, b.author, b.title, b.article, b.image, b.video,
                   b.created_at, b.updated_at
            FROM blogs b
            "#,
        );

        if let Some(s) = search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = like_pattern(s);
            builder.push(" WHERE b.title ILIKE ");
            builder.push_bind(pattern.clone());
            builder.push(
                " OR EXISTS (SELECT 1 FROM categories c WHERE c.blog_id = b.id AND c.name ILIKE ",
            );
            builder.push_bind(pattern);
            builder.push(")");
        }

        builder.push(" ORDER BY b.created_at DESC, b.id DESC");

        let blogs = builder.build_query_as::<Blog>().fetch_all(&self.pool).await?;
        self.attach_categories(blogs).await
    }

    async fn get_blog(&self, id: i64) -> AppResult<Option<BlogWithCategories>> {
        let blog = sqlx::query_as::<_, Blog>(
            r#"SELECT id, author, title, article, image, video, created_at, updated_at
               FROM blogs WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match blog {
            Some(blog) => Ok(self.attach_categories(vec![blog]).await?.pop()),
            None => Ok(None),
        }
    }

    /// create_blog
    ///
    /// Blog row and category rows are written in one transaction.
    async fn create_blog(&self, req: CreateBlogRequest) -> AppResult<BlogWithCategories> {
        let mut tx = self.pool.begin().await?;

        let blog = sqlx::query_as::<_, Blog>(
            r#"INSERT INTO blogs (author, title, article, image, video, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
               RETURNING id, author, title, article, image, video, created_at, updated_at"#,
        )
        .bind(req.author)
        .bind(req.title)
        .bind(req.article)
        .bind(req.image)
        .bind(req.video)
        .fetch_one(&mut *tx)
        .await?;

        let names = req.categories.unwrap_or_default();
        let categories = insert_categories(&mut tx, blog.id, &names).await?;

        tx.commit().await?;

        Ok(BlogWithCategories {
            blog,
            categories: categories.iter().map(CategorySummary::from).collect(),
        })
    }

    /// update_blog
    ///
    /// COALESCE keeps columns whose field is `None`.
    async fn update_blog(
        &self,
        id: i64,
        req: UpdateBlogRequest,
    ) -> AppResult<Option<BlogWithCategories>> {
        let mut tx = self.pool.begin().await?;

        let blog = sqlx::query_as::<_, Blog>(
            r#"
            UPDATE blogs
            SET author = COALESCE($2, author),
                title = COALESCE($3, title),
                article = COALESCE($4, article),
                image = COALESCE($5, image),
                video = COALESCE($6, video),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, author, title, article, image, video, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(req.author)
        .bind(req.title)
        .bind(req.article)
        .bind(req.image)
        .bind(req.video)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(blog) = blog else {
            return Ok(None);
        };

        if let Some(names) = req.categories {
            sqlx::query("DELETE FROM categories WHERE blog_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            insert_categories(&mut tx, id, &names).await?;
        }

        tx.commit().await?;

        Ok(self.attach_categories(vec![blog]).await?.pop())
    }

    async fn delete_blog(&self, id: i64) -> AppResult<bool> {
        let res = sqlx::query("DELETE FROM blogs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn delete_blogs_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<u64> {
        let res = sqlx::query("DELETE FROM blogs WHERE created_at BETWEEN $1 AND $2")
            .bind(start)
            .bind(end)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected())
    }

    async fn blog_image_paths(&self) -> AppResult<Vec<String>> {
        let paths =
            sqlx::query_scalar::<_, String>("SELECT image FROM blogs WHERE image IS NOT NULL")
                .fetch_all(&self.pool)
                .await?;
        Ok(paths)
    }

    // --- CATEGORIES ---

    async fn blog_exists(&self, id: i64) -> AppResult<bool> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM blogs WHERE id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn list_categories(&self, blog_id: i64) -> AppResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            r#"SELECT id, name, blog_id, created_at, updated_at
               FROM categories WHERE blog_id = $1
               ORDER BY name ASC, id ASC"#,
        )
        .bind(blog_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    async fn get_category(&self, blog_id: i64, id: i64) -> AppResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            r#"SELECT id, name, blog_id, created_at, updated_at
               FROM categories WHERE id = $1 AND blog_id = $2"#,
        )
        .bind(id)
        .bind(blog_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(category)
    }

    async fn create_category(&self, blog_id: i64, name: String) -> AppResult<Category> {
        let mut conn = self.pool.acquire().await?;
        let mut created = insert_categories(&mut conn, blog_id, &[name]).await?;
        created
            .pop()
            .ok_or(AppError::Database(sqlx::Error::RowNotFound))
    }

    async fn update_category(
        &self,
        blog_id: i64,
        id: i64,
        name: Option<String>,
    ) -> AppResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            r#"UPDATE categories
               SET name = COALESCE($3, name), updated_at = NOW()
               WHERE id = $1 AND blog_id = $2
               RETURNING id, name, blog_id, created_at, updated_at"#,
        )
        .bind(id)
        .bind(blog_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(category)
    }

    async fn delete_category(&self, blog_id: i64, id: i64) -> AppResult<bool> {
        let res = sqlx::query("DELETE FROM categories WHERE id = $1 AND blog_id = $2")
            .bind(id)
            .bind(blog_id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    // --- USERS ---

    async fn get_user(&self, id: i64) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"SELECT id, name, email, phone, is_admin, role, created_at, updated_at
               FROM users WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<UserRecord>> {
        let record = sqlx::query_as::<_, UserRecord>(
            r#"SELECT id, name, email, phone, is_admin, role, created_at, updated_at, password
               FROM users WHERE email = $1"#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn create_user(&self, user: NewUser) -> AppResult<User> {
        let created = sqlx::query_as::<_, User>(
            r#"INSERT INTO users (name, email, phone, password, created_at, updated_at)
               VALUES ($1, $2, $3, $4, NOW(), NOW())
               RETURNING id, name, email, phone, is_admin, role, created_at, updated_at"#,
        )
        .bind(user.name)
        .bind(user.email)
        .bind(user.phone)
        .bind(user.password_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn list_users(&self, search: Option<String>) -> AppResult<Vec<User>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            r#"
            SELECT id, name, email, phone, is_admin, role, created_at, updated_at
            FROM users
            "#,
        );

        if let Some(s) = search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = like_pattern(s);
            builder.push(" WHERE name ILIKE ");
            builder.push_bind(pattern.clone());
            builder.push(" OR email ILIKE ");
            builder.push_bind(pattern);
        }

        builder.push(" ORDER BY created_at DESC, id DESC");

        let users = builder.build_query_as::<User>().fetch_all(&self.pool).await?;
        Ok(users)
    }

    async fn update_user(&self, id: i64, changes: UserChanges) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                email = COALESCE($3, email),
                phone = COALESCE($4, phone),
                password = COALESCE($5, password),
                is_admin = COALESCE($6, is_admin),
                role = COALESCE($7, role),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, email, phone, is_admin, role, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(changes.name)
        .bind(changes.email)
        .bind(changes.phone)
        .bind(changes.password_hash)
        .bind(changes.is_admin)
        .bind(changes.role)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn delete_user(&self, id: i64) -> AppResult<bool> {
        let res = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::like_pattern;

    #[test]
    fn like_pattern_wraps_and_escapes() {
        assert_eq!(like_pattern("rust"), "%rust%");
        assert_eq!(like_pattern("100%"), "%100\\%%");
        assert_eq!(like_pattern("snake_case"), "%snake\\_case%");
    }
}
