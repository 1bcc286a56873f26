//! Task service: validation, progress and composition of the task views

use chrono::Utc;
use log::{error, info, warn};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::media::MediaCoordinator;
use crate::models::{
    ConfirmMedia, Link, LinkView, MediaView, SaveLink, SaveSession, SaveTask, Session,
    SessionView, Task, TaskDetail, TaskSummary, UploadUrlView,
};
use crate::progress::{compute_task_progress, MAX_CONFIDENCE};
use crate::repository::{LinkRepository, SessionRepository, TaskRepository};

pub const MAX_TITLE_CHARS: usize = 50;

pub struct TaskService {
    tasks: Arc<dyn TaskRepository>,
    sessions: Arc<dyn SessionRepository>,
    links: Arc<dyn LinkRepository>,
    media: Arc<MediaCoordinator>,
}

impl TaskService {
    pub fn new(
        tasks: Arc<dyn TaskRepository>,
        sessions: Arc<dyn SessionRepository>,
        links: Arc<dyn LinkRepository>,
        media: Arc<MediaCoordinator>,
    ) -> Self {
        Self {
            tasks,
            sessions,
            links,
            media,
        }
    }

    pub async fn active_tasks(&self, user_id: Uuid) -> Result<Vec<TaskSummary>> {
        self.summaries(user_id, false).await
    }

    pub async fn completed_tasks(&self, user_id: Uuid) -> Result<Vec<TaskSummary>> {
        self.summaries(user_id, true).await
    }

    async fn summaries(&self, user_id: Uuid, completed: bool) -> Result<Vec<TaskSummary>> {
        let tasks = self.tasks.list_by_user(user_id, completed).await?;
        let mut result = Vec::with_capacity(tasks.len());
        for task in &tasks {
            let progress = self.progress_of(task).await?;
            result.push(TaskSummary::from_task(task, progress));
        }
        Ok(result)
    }

    pub async fn task_detail(&self, user_id: Uuid, id: Uuid) -> Result<TaskDetail> {
        let task = self.owned_task(user_id, id).await?;
        self.detail_of(task).await
    }

    /// New tasks start with no sessions, hence zero progress
    pub async fn create_task(&self, user_id: Uuid, req: SaveTask) -> Result<TaskSummary> {
        validate_task(&req)?;

        let task = Task {
            id: Uuid::new_v4(),
            user_id,
            title: req.title.trim().to_string(),
            target_bpm: req.target_bpm,
            is_completed: false,
            created_at: Utc::now(),
        };
        let task = self.tasks.create(&task).await.map_err(|e| {
            error!("Failed to create task for user {}: {}", user_id, e);
            e
        })?;

        info!("Created task {} for user {}", task.id, user_id);
        Ok(TaskSummary::from_task(&task, 0.0))
    }

    pub async fn update_task(
        &self,
        user_id: Uuid,
        id: Uuid,
        req: SaveTask,
    ) -> Result<TaskDetail> {
        validate_task(&req)?;

        let mut task = self.owned_task(user_id, id).await?;
        task.title = req.title.trim().to_string();
        task.target_bpm = req.target_bpm;

        let task = self.tasks.update(&task).await.map_err(|e| {
            error!("Failed to update task {}: {}", id, e);
            e
        })?;
        self.detail_of(task).await
    }

    pub async fn complete_task(&self, user_id: Uuid, id: Uuid) -> Result<TaskSummary> {
        let mut task = self.owned_task(user_id, id).await?;
        task.is_completed = true;

        let task = self.tasks.update(&task).await.map_err(|e| {
            error!("Failed to complete task {}: {}", id, e);
            e
        })?;
        let progress = self.progress_of(&task).await?;

        info!("Task {} completed at {:.1}%", id, progress);
        Ok(TaskSummary::from_task(&task, progress))
    }

    pub async fn session(&self, id: Uuid) -> Result<SessionView> {
        let session = self.sessions.get(id).await?;
        Ok(SessionView::from(&session))
    }

    pub async fn create_session(&self, task_id: Uuid, req: SaveSession) -> Result<SessionView> {
        validate_session(&req)?;
        self.tasks.get(task_id).await?;

        let session = Session {
            id: Uuid::new_v4(),
            task_id,
            bpm: req.bpm,
            note: req.note,
            confidence: req.confidence,
            start_time: req.start_time,
            end_time: req.end_time,
        };
        let session = self.sessions.create(&session).await.map_err(|e| {
            error!("Failed to create session for task {}: {}", task_id, e);
            e
        })?;
        Ok(SessionView::from(&session))
    }

    /// Issue a fresh media id and a presigned upload URL for it
    pub async fn request_upload_url(&self, task_id: Uuid) -> Result<UploadUrlView> {
        self.tasks.get(task_id).await?;
        self.media.request_upload_url(task_id, Uuid::new_v4()).await
    }

    pub async fn confirm_upload(
        &self,
        task_id: Uuid,
        media_id: Uuid,
        req: ConfirmMedia,
    ) -> Result<MediaView> {
        self.tasks.get(task_id).await?;
        self.media.confirm_upload(task_id, media_id, req).await
    }

    pub async fn list_media(&self, task_id: Uuid) -> Result<Vec<MediaView>> {
        self.tasks.get(task_id).await?;
        self.media.list_media(task_id).await
    }

    pub async fn remove_media(&self, media_id: Uuid) -> Result<()> {
        self.media.remove_media(media_id).await
    }

    pub async fn save_link(&self, task_id: Uuid, req: SaveLink) -> Result<LinkView> {
        validate_link(&req)?;
        self.tasks.get(task_id).await?;

        let link = Link {
            id: Uuid::new_v4(),
            task_id,
            url: req.url.trim().to_string(),
            title: req.title.trim().to_string(),
            link_type: req.link_type,
            created_at: Utc::now(),
        };
        let link = self.links.create(&link).await.map_err(|e| {
            error!("Failed to save link for task {}: {}", task_id, e);
            e
        })?;
        Ok(LinkView::from(&link))
    }

    pub async fn remove_link(&self, id: Uuid) -> Result<()> {
        self.links.delete(id).await
    }

    /// Another user's task is reported as missing so its existence does not leak
    async fn owned_task(&self, user_id: Uuid, id: Uuid) -> Result<Task> {
        let task = self.tasks.get(id).await?;
        if task.user_id != user_id {
            warn!("User {} asked for task {} owned by someone else", user_id, id);
            return Err(AppError::not_found("task", id));
        }
        Ok(task)
    }

    async fn progress_of(&self, task: &Task) -> Result<f64> {
        let sessions = self.sessions.list_by_task(task.id).await?;
        Ok(compute_task_progress(task.target_bpm, &sessions))
    }

    async fn detail_of(&self, task: Task) -> Result<TaskDetail> {
        let sessions = self.sessions.list_by_task(task.id).await?;
        let media = self.media.list_media(task.id).await?;
        let links = self.links.list_by_task(task.id).await?;

        Ok(TaskDetail {
            id: task.id,
            title: task.title,
            target_bpm: task.target_bpm,
            is_completed: task.is_completed,
            progress: compute_task_progress(task.target_bpm, &sessions),
            created_at: task.created_at,
            sessions: sessions.iter().map(SessionView::from).collect(),
            media,
            links: links.iter().map(LinkView::from).collect(),
        })
    }
}

fn validate_title(title: &str) -> Result<()> {
    let len = title.trim().chars().count();
    if len == 0 || len > MAX_TITLE_CHARS {
        return Err(AppError::invalid(format!(
            "title must be between 1 and {} characters",
            MAX_TITLE_CHARS
        )));
    }
    Ok(())
}

fn validate_task(req: &SaveTask) -> Result<()> {
    validate_title(&req.title)?;
    if req.target_bpm <= 0 {
        return Err(AppError::invalid("target_bpm must be positive"));
    }
    Ok(())
}

fn validate_session(req: &SaveSession) -> Result<()> {
    if req.bpm < 0 {
        return Err(AppError::invalid("bpm must not be negative"));
    }
    if req.confidence < 1 || req.confidence > MAX_CONFIDENCE as i32 {
        return Err(AppError::invalid(format!(
            "confidence must be between 1 and {}",
            MAX_CONFIDENCE as i32
        )));
    }
    if req.end_time < req.start_time {
        return Err(AppError::invalid("end_time must not be before start_time"));
    }
    Ok(())
}

fn validate_link(req: &SaveLink) -> Result<()> {
    if req.url.trim().is_empty() {
        return Err(AppError::invalid("url must not be empty"));
    }
    validate_title(&req.title)
}
