//! PostgreSQL connection management and the sqlx-backed repositories

use async_trait::async_trait;
use log::info;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use std::str::FromStr;
use uuid::Uuid;

use crate::constants::SCHEMA_VERSION;
use crate::error::{AppError, Result};
use crate::models::{Link, LinkType, Media, MediaType, Session, Task, User};
use crate::queries::{ddl, links, media, metadata, sessions, tasks, users};
use crate::repository::{
    LinkRepository, MediaRepository, SessionRepository, TaskRepository, UserRepository,
};

/// Build a full PostgreSQL connection URL with password and database
///
/// Takes a base URL like `postgres://user@host:5432` and inserts the password
/// and appends the database name.
pub fn build_postgres_url(base_url: &str, password: &str, database: &str) -> Result<String> {
    let url = url::Url::parse(base_url)
        .map_err(|e| AppError::Config(format!("Invalid postgres url '{}': {}", base_url, e)))?;

    let user = url.username();
    let host = url
        .host_str()
        .ok_or_else(|| AppError::Config("Missing host in postgres url".to_string()))?;
    let port = url.port().unwrap_or(5432);

    Ok(format!(
        "postgres://{}:{}@{}:{}/{}",
        user,
        urlencoding::encode(password),
        host,
        port,
        database
    ))
}

/// Open a PostgreSQL connection pool
pub async fn open_postgres_connection(
    base_url: &str,
    password: &str,
    database: &str,
    max_connections: u32,
) -> Result<PgPool> {
    let full_url = build_postgres_url(base_url, password, database)?;
    let options = PgConnectOptions::from_str(&full_url)?;

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Create a PostgreSQL database if it doesn't exist
pub async fn create_database_if_not_exists(
    base_url: &str,
    password: &str,
    database: &str,
) -> Result<()> {
    let admin_url = build_postgres_url(base_url, password, "postgres")?;
    let admin_options = PgConnectOptions::from_str(&admin_url)?;

    let admin_pool = PgPoolOptions::new()
        .max_connections(1)
        .connect_with(admin_options)
        .await?;

    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
            .bind(database)
            .fetch_one(&admin_pool)
            .await?;

    if !exists {
        // CREATE DATABASE cannot use prepared statements
        let create_sql = format!("CREATE DATABASE \"{}\"", database.replace('"', "\"\""));
        if let Err(e) = sqlx::query(&create_sql).execute(&admin_pool).await {
            // 42P04 duplicate_database: another process won the race
            let err_str = e.to_string();
            if !err_str.contains("already exists") && !err_str.contains("42P04") {
                return Err(e.into());
            }
        }
        info!("Created database '{}'", database);
    }

    Ok(())
}

/// Create tables and indexes, then record the schema version
pub async fn init_schema(pool: &PgPool) -> Result<()> {
    for sql in ddl::all_statements() {
        sqlx::query(&sql).execute(pool).await?;
    }

    let existing = query_metadata(pool, "version").await?;
    match existing.as_deref() {
        Some(v) if v != SCHEMA_VERSION => {
            return Err(AppError::Config(format!(
                "Unsupported database version: '{}'. This application only supports version '{}'",
                v, SCHEMA_VERSION
            )));
        }
        Some(_) => {}
        None => upsert_metadata(pool, "version", SCHEMA_VERSION).await?,
    }

    Ok(())
}

/// Update or insert a metadata key-value pair
pub async fn upsert_metadata(pool: &PgPool, key: &str, value: &str) -> Result<()> {
    let sql = metadata::upsert(key, value);
    sqlx::query(&sql).execute(pool).await?;
    Ok(())
}

/// Query a single metadata value by key
pub async fn query_metadata(pool: &PgPool, key: &str) -> Result<Option<String>> {
    let sql = metadata::select_by_key(key);
    let row = sqlx::query(&sql).fetch_optional(pool).await?;
    Ok(row.map(|r| r.try_get::<String, _>(0)).transpose()?)
}

fn user_from_row(row: &PgRow) -> Result<User> {
    Ok(User {
        id: row.try_get("id")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        username: row.try_get("username")?,
    })
}

fn task_from_row(row: &PgRow) -> Result<Task> {
    Ok(Task {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        title: row.try_get("title")?,
        target_bpm: row.try_get("target_bpm")?,
        is_completed: row.try_get("is_completed")?,
        created_at: row.try_get("created_at")?,
    })
}

fn session_from_row(row: &PgRow) -> Result<Session> {
    Ok(Session {
        id: row.try_get("id")?,
        task_id: row.try_get("task_id")?,
        bpm: row.try_get("bpm")?,
        note: row.try_get("note")?,
        confidence: row.try_get("confidence")?,
        start_time: row.try_get("start_time")?,
        end_time: row.try_get("end_time")?,
    })
}

fn media_from_row(row: &PgRow) -> Result<Media> {
    let media_type: String = row.try_get("type")?;
    Ok(Media {
        id: row.try_get("id")?,
        task_id: row.try_get("task_id")?,
        media_type: MediaType::from_str(&media_type)
            .map_err(|_| AppError::Internal(format!("unknown media type in row: {}", media_type)))?,
        filename: row.try_get("filename")?,
        size: row.try_get("size")?,
        duration: row.try_get("duration")?,
        created_at: row.try_get("created_at")?,
    })
}

fn link_from_row(row: &PgRow) -> Result<Link> {
    let link_type: String = row.try_get("type")?;
    Ok(Link {
        id: row.try_get("id")?,
        task_id: row.try_get("task_id")?,
        url: row.try_get("url")?,
        title: row.try_get("title")?,
        link_type: LinkType::from_str(&link_type)
            .map_err(|_| AppError::Internal(format!("unknown link type in row: {}", link_type)))?,
        created_at: row.try_get("created_at")?,
    })
}

/// sqlx-backed implementation of every repository trait over one shared pool
#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_all<T>(&self, sql: &str, map: fn(&PgRow) -> Result<T>) -> Result<Vec<T>> {
        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;
        rows.iter().map(map).collect()
    }

    async fn fetch_one<T>(
        &self,
        sql: &str,
        map: fn(&PgRow) -> Result<T>,
        what: &str,
        id: Uuid,
    ) -> Result<T> {
        match sqlx::query(sql).fetch_optional(&self.pool).await? {
            Some(row) => map(&row),
            None => Err(AppError::not_found(what, id)),
        }
    }

    async fn delete_one(&self, sql: &str, what: &str, id: Uuid) -> Result<()> {
        let result = sqlx::query(sql).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found(what, id));
        }
        Ok(())
    }
}

#[async_trait]
impl TaskRepository for PgRepository {
    async fn list_by_user(&self, user_id: Uuid, is_completed: bool) -> Result<Vec<Task>> {
        self.fetch_all(&tasks::select_by_user(user_id, is_completed), task_from_row)
            .await
    }

    async fn get(&self, id: Uuid) -> Result<Task> {
        self.fetch_one(&tasks::select_by_id(id), task_from_row, "task", id)
            .await
    }

    async fn create(&self, task: &Task) -> Result<Task> {
        let row = sqlx::query(&tasks::insert(task))
            .fetch_one(&self.pool)
            .await?;
        task_from_row(&row)
    }

    async fn update(&self, task: &Task) -> Result<Task> {
        self.fetch_one(&tasks::update(task), task_from_row, "task", task.id)
            .await
    }
}

#[async_trait]
impl SessionRepository for PgRepository {
    async fn list_by_task(&self, task_id: Uuid) -> Result<Vec<Session>> {
        self.fetch_all(&sessions::select_by_task(task_id), session_from_row)
            .await
    }

    async fn get(&self, id: Uuid) -> Result<Session> {
        self.fetch_one(&sessions::select_by_id(id), session_from_row, "session", id)
            .await
    }

    async fn create(&self, session: &Session) -> Result<Session> {
        let row = sqlx::query(&sessions::insert(session))
            .fetch_one(&self.pool)
            .await?;
        session_from_row(&row)
    }
}

#[async_trait]
impl MediaRepository for PgRepository {
    async fn list_by_task(&self, task_id: Uuid) -> Result<Vec<Media>> {
        self.fetch_all(&media::select_by_task(task_id), media_from_row)
            .await
    }

    async fn get(&self, id: Uuid) -> Result<Media> {
        self.fetch_one(&media::select_by_id(id), media_from_row, "media", id)
            .await
    }

    async fn create(&self, record: &Media) -> Result<Media> {
        let row = sqlx::query(&media::insert(record))
            .fetch_one(&self.pool)
            .await?;
        media_from_row(&row)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.delete_one(&media::delete(id), "media", id).await
    }

    async fn delete_batch(&self, ids: &[Uuid]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query(&media::delete_batch(ids))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl LinkRepository for PgRepository {
    async fn list_by_task(&self, task_id: Uuid) -> Result<Vec<Link>> {
        self.fetch_all(&links::select_by_task(task_id), link_from_row)
            .await
    }

    async fn create(&self, link: &Link) -> Result<Link> {
        let row = sqlx::query(&links::insert(link))
            .fetch_one(&self.pool)
            .await?;
        link_from_row(&row)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.delete_one(&links::delete(id), "link", id).await
    }
}

#[async_trait]
impl UserRepository for PgRepository {
    async fn get(&self, id: Uuid) -> Result<User> {
        self.fetch_one(&users::select_by_id(id), user_from_row, "user", id)
            .await
    }

    async fn update(&self, user: &User) -> Result<User> {
        self.fetch_one(&users::update(user), user_from_row, "user", user.id)
            .await
    }
}
