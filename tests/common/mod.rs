#![allow(dead_code)]

//! In-memory repository and object store doubles shared by the integration tests

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

use trackmus::error::{AppError, Result};
use trackmus::media::{CleanupHandle, MediaCoordinator, MediaSettings};
use trackmus::models::{Link, Media, MediaType, Session, Task, User};
use trackmus::object_store::ObjectStore;
use trackmus::repository::{
    LinkRepository, MediaRepository, SessionRepository, TaskRepository, UserRepository,
};

#[derive(Default)]
pub struct MemoryRepo {
    pub users: Mutex<Vec<User>>,
    pub tasks: Mutex<Vec<Task>>,
    pub sessions: Mutex<Vec<Session>>,
    pub media: Mutex<Vec<Media>>,
    pub links: Mutex<Vec<Link>>,
    /// Every id slice passed to `delete_batch`
    pub batches: Mutex<Vec<Vec<Uuid>>>,
    pub fail_media_create: AtomicBool,
    pub fail_media_delete: AtomicBool,
}

impl MemoryRepo {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_user(&self, username: &str) -> User {
        let user = User {
            id: Uuid::new_v4(),
            first_name: "First".to_string(),
            last_name: "Last".to_string(),
            username: username.to_string(),
        };
        self.users.lock().unwrap().push(user.clone());
        user
    }

    pub fn add_task(&self, user_id: Uuid, title: &str, target_bpm: i32) -> Task {
        let task = Task {
            id: Uuid::new_v4(),
            user_id,
            title: title.to_string(),
            target_bpm,
            is_completed: false,
            created_at: Utc::now(),
        };
        self.tasks.lock().unwrap().push(task.clone());
        task
    }

    pub fn add_session(&self, task_id: Uuid, bpm: i32, confidence: i32) -> Session {
        let start = Utc::now();
        let session = Session {
            id: Uuid::new_v4(),
            task_id,
            bpm,
            note: String::new(),
            confidence,
            start_time: start,
            end_time: start + ChronoDuration::minutes(20),
        };
        self.sessions.lock().unwrap().push(session.clone());
        session
    }

    pub fn add_media(&self, task_id: Uuid, filename: &str) -> Media {
        let media = Media {
            id: Uuid::new_v4(),
            task_id,
            media_type: MediaType::Video,
            filename: filename.to_string(),
            size: 1024,
            duration: 30,
            created_at: Utc::now(),
        };
        self.media.lock().unwrap().push(media.clone());
        media
    }

    pub fn has_media(&self, id: Uuid) -> bool {
        self.media.lock().unwrap().iter().any(|m| m.id == id)
    }

    pub fn media_count(&self) -> usize {
        self.media.lock().unwrap().len()
    }

    pub fn batch_calls(&self) -> Vec<Vec<Uuid>> {
        self.batches.lock().unwrap().clone()
    }
}

fn db_down() -> AppError {
    AppError::Internal("database unavailable".to_string())
}

#[async_trait]
impl TaskRepository for MemoryRepo {
    async fn list_by_user(&self, user_id: Uuid, is_completed: bool) -> Result<Vec<Task>> {
        let mut tasks: Vec<Task> = self
            .tasks
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.user_id == user_id && t.is_completed == is_completed)
            .cloned()
            .collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tasks)
    }

    async fn get(&self, id: Uuid) -> Result<Task> {
        self.tasks
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or_else(|| AppError::not_found("task", id))
    }

    async fn create(&self, task: &Task) -> Result<Task> {
        self.tasks.lock().unwrap().push(task.clone());
        Ok(task.clone())
    }

    async fn update(&self, task: &Task) -> Result<Task> {
        let mut tasks = self.tasks.lock().unwrap();
        let existing = tasks
            .iter_mut()
            .find(|t| t.id == task.id)
            .ok_or_else(|| AppError::not_found("task", task.id))?;
        existing.title = task.title.clone();
        existing.target_bpm = task.target_bpm;
        existing.is_completed = task.is_completed;
        Ok(existing.clone())
    }
}

#[async_trait]
impl SessionRepository for MemoryRepo {
    async fn list_by_task(&self, task_id: Uuid) -> Result<Vec<Session>> {
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.task_id == task_id)
            .cloned()
            .collect())
    }

    async fn get(&self, id: Uuid) -> Result<Session> {
        self.sessions
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| AppError::not_found("session", id))
    }

    async fn create(&self, session: &Session) -> Result<Session> {
        self.sessions.lock().unwrap().push(session.clone());
        Ok(session.clone())
    }
}

#[async_trait]
impl MediaRepository for MemoryRepo {
    async fn list_by_task(&self, task_id: Uuid) -> Result<Vec<Media>> {
        Ok(self
            .media
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.task_id == task_id)
            .cloned()
            .collect())
    }

    async fn get(&self, id: Uuid) -> Result<Media> {
        self.media
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .ok_or_else(|| AppError::not_found("media", id))
    }

    async fn create(&self, media: &Media) -> Result<Media> {
        if self.fail_media_create.load(Ordering::SeqCst) {
            return Err(db_down());
        }
        self.media.lock().unwrap().push(media.clone());
        Ok(media.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        if self.fail_media_delete.load(Ordering::SeqCst) {
            return Err(db_down());
        }
        let mut media = self.media.lock().unwrap();
        let before = media.len();
        media.retain(|m| m.id != id);
        if media.len() == before {
            return Err(AppError::not_found("media", id));
        }
        Ok(())
    }

    async fn delete_batch(&self, ids: &[Uuid]) -> Result<u64> {
        self.batches.lock().unwrap().push(ids.to_vec());
        let mut media = self.media.lock().unwrap();
        let before = media.len();
        media.retain(|m| !ids.contains(&m.id));
        Ok((before - media.len()) as u64)
    }
}

#[async_trait]
impl LinkRepository for MemoryRepo {
    async fn list_by_task(&self, task_id: Uuid) -> Result<Vec<Link>> {
        Ok(self
            .links
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.task_id == task_id)
            .cloned()
            .collect())
    }

    async fn create(&self, link: &Link) -> Result<Link> {
        self.links.lock().unwrap().push(link.clone());
        Ok(link.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut links = self.links.lock().unwrap();
        let before = links.len();
        links.retain(|l| l.id != id);
        if links.len() == before {
            return Err(AppError::not_found("link", id));
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepository for MemoryRepo {
    async fn get(&self, id: Uuid) -> Result<User> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or_else(|| AppError::not_found("user", id))
    }

    async fn update(&self, user: &User) -> Result<User> {
        let mut users = self.users.lock().unwrap();
        let existing = users
            .iter_mut()
            .find(|u| u.id == user.id)
            .ok_or_else(|| AppError::not_found("user", user.id))?;
        *existing = user.clone();
        Ok(user.clone())
    }
}

/// Object store keyed by `bucket/key`, with switches to inject failures
#[derive(Default)]
pub struct MemoryStore {
    pub objects: Mutex<HashMap<String, u64>>,
    /// Keys whose existence check fails with a store error
    pub broken_keys: Mutex<HashSet<String>>,
    pub fail_presign_get: AtomicBool,
    pub fail_presign_put: AtomicBool,
    pub fail_delete: AtomicBool,
    pub delete_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn path(bucket: &str, key: &str) -> String {
        format!("{}/{}", bucket, key)
    }

    pub fn put(&self, bucket: &str, key: &str, size: u64) {
        self.objects
            .lock()
            .unwrap()
            .insert(Self::path(bucket, key), size);
    }

    pub fn contains(&self, bucket: &str, key: &str) -> bool {
        self.objects
            .lock()
            .unwrap()
            .contains_key(&Self::path(bucket, key))
    }

    pub fn break_key(&self, bucket: &str, key: &str) {
        self.broken_keys
            .lock()
            .unwrap()
            .insert(Self::path(bucket, key));
    }
}

fn store_down() -> AppError {
    AppError::StoreUnavailable("connection refused".to_string())
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn object_size(&self, bucket: &str, key: &str) -> Result<Option<u64>> {
        let path = Self::path(bucket, key);
        if self.broken_keys.lock().unwrap().contains(&path) {
            return Err(store_down());
        }
        Ok(self.objects.lock().unwrap().get(&path).copied())
    }

    async fn presigned_put_url(&self, bucket: &str, key: &str, ttl: Duration) -> Result<String> {
        if self.fail_presign_put.load(Ordering::SeqCst) {
            return Err(store_down());
        }
        Ok(format!(
            "http://store.test/{}?method=PUT&expires={}",
            Self::path(bucket, key),
            ttl.as_secs()
        ))
    }

    async fn presigned_get_url(
        &self,
        bucket: &str,
        key: &str,
        filename: &str,
        ttl: Duration,
    ) -> Result<String> {
        if self.fail_presign_get.load(Ordering::SeqCst) {
            return Err(store_down());
        }
        Ok(format!(
            "http://store.test/{}?method=GET&filename={}&expires={}",
            Self::path(bucket, key),
            urlencoding::encode(filename),
            ttl.as_secs()
        ))
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(store_down());
        }
        self.objects.lock().unwrap().remove(&Self::path(bucket, key));
        Ok(())
    }

    async fn ensure_bucket(&self, _bucket: &str) -> Result<()> {
        Ok(())
    }
}

pub const BUCKET: &str = "trackmus";

pub fn settings() -> MediaSettings {
    MediaSettings {
        bucket: BUCKET.to_string(),
        presign_ttl: Duration::from_secs(900),
        verify_upload_size: false,
        cleanup_queue: 8,
        existence_check_concurrency: 4,
    }
}

pub fn coordinator(
    repo: &Arc<MemoryRepo>,
    store: &Arc<MemoryStore>,
    settings: MediaSettings,
) -> (MediaCoordinator, CleanupHandle) {
    MediaCoordinator::new(repo.clone(), store.clone(), settings)
}
