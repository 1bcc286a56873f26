//! Persistence seams used by the service layer
//!
//! Every lookup by id returns `AppError::NotFound` when the row is absent,
//! so callers can tell a missing row apart from a failing database.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Link, Media, Session, Task, User};

#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn list_by_user(&self, user_id: Uuid, is_completed: bool) -> Result<Vec<Task>>;
    async fn get(&self, id: Uuid) -> Result<Task>;
    async fn create(&self, task: &Task) -> Result<Task>;
    /// Updates title, target tempo and completion; the owner never changes
    async fn update(&self, task: &Task) -> Result<Task>;
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn list_by_task(&self, task_id: Uuid) -> Result<Vec<Session>>;
    async fn get(&self, id: Uuid) -> Result<Session>;
    async fn create(&self, session: &Session) -> Result<Session>;
}

#[async_trait]
pub trait MediaRepository: Send + Sync {
    async fn list_by_task(&self, task_id: Uuid) -> Result<Vec<Media>>;
    async fn get(&self, id: Uuid) -> Result<Media>;
    async fn create(&self, media: &Media) -> Result<Media>;
    async fn delete(&self, id: Uuid) -> Result<()>;
    async fn delete_batch(&self, ids: &[Uuid]) -> Result<u64>;
}

#[async_trait]
pub trait LinkRepository: Send + Sync {
    async fn list_by_task(&self, task_id: Uuid) -> Result<Vec<Link>>;
    async fn create(&self, link: &Link) -> Result<Link>;
    async fn delete(&self, id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<User>;
    /// Updates the profile fields of an existing user; NotFound when absent
    async fn update(&self, user: &User) -> Result<User>;
}
