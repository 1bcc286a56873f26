use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Video,
    Audio,
    Image,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Video => "video",
            MediaType::Audio => "audio",
            MediaType::Image => "image",
        }
    }
}

impl FromStr for MediaType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "video" => Ok(MediaType::Video),
            "audio" => Ok(MediaType::Audio),
            "image" => Ok(MediaType::Image),
            other => Err(AppError::invalid(format!("invalid media type: {}", other))),
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    Youtube,
    Spotify,
    Other,
}

impl LinkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkType::Youtube => "youtube",
            LinkType::Spotify => "spotify",
            LinkType::Other => "other",
        }
    }
}

impl FromStr for LinkType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "youtube" => Ok(LinkType::Youtube),
            "spotify" => Ok(LinkType::Spotify),
            "other" => Ok(LinkType::Other),
            other => Err(AppError::invalid(format!("invalid link type: {}", other))),
        }
    }
}

/// A practice goal owned by a user
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub target_bpm: i32,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
}

/// One logged practice attempt against a task
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub id: Uuid,
    pub task_id: Uuid,
    pub bpm: i32,
    pub note: String,
    /// Self-reported, 1..=5
    pub confidence: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl Session {
    pub fn duration_seconds(&self) -> i64 {
        (self.end_time - self.start_time).num_seconds()
    }
}

/// Media metadata row; the payload lives in the object store under `{task_id}/{id}`
#[derive(Debug, Clone, PartialEq)]
pub struct Media {
    pub id: Uuid,
    pub task_id: Uuid,
    pub media_type: MediaType,
    pub filename: String,
    pub size: i64,
    pub duration: i32,
    pub created_at: DateTime<Utc>,
}

impl Media {
    pub fn object_key(&self) -> String {
        media_object_key(self.task_id, self.id)
    }
}

/// Flat two-segment key shared by the upload URL and the media row
pub fn media_object_key(task_id: Uuid, media_id: Uuid) -> String {
    format!("{}/{}", task_id, media_id)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub id: Uuid,
    pub task_id: Uuid,
    pub url: String,
    pub title: String,
    pub link_type: LinkType,
    pub created_at: DateTime<Utc>,
}

/// Profile row; the account itself is created by the auth service
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
}

// Requests

#[derive(Debug, Clone, Deserialize)]
pub struct SaveTask {
    pub title: String,
    pub target_bpm: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SaveSession {
    pub bpm: i32,
    #[serde(default)]
    pub note: String,
    pub confidence: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// Client-reported metadata sent once the PUT to the presigned URL finished
#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmMedia {
    #[serde(rename = "type")]
    pub media_type: MediaType,
    pub filename: String,
    pub size: i64,
    pub duration: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SaveLink {
    pub url: String,
    pub title: String,
    #[serde(rename = "type")]
    pub link_type: LinkType,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SaveUser {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
}

// Views

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSummary {
    pub id: Uuid,
    pub title: String,
    pub target_bpm: i32,
    pub is_completed: bool,
    pub progress: f64,
}

impl TaskSummary {
    pub fn from_task(task: &Task, progress: f64) -> Self {
        Self {
            id: task.id,
            title: task.title.clone(),
            target_bpm: task.target_bpm,
            is_completed: task.is_completed,
            progress,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDetail {
    pub id: Uuid,
    pub title: String,
    pub target_bpm: i32,
    pub is_completed: bool,
    pub progress: f64,
    pub created_at: DateTime<Utc>,
    pub sessions: Vec<SessionView>,
    pub media: Vec<MediaView>,
    pub links: Vec<LinkView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionView {
    pub id: Uuid,
    pub bpm: i32,
    pub note: String,
    pub confidence: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Seconds between start and end
    pub duration: i64,
}

impl From<&Session> for SessionView {
    fn from(s: &Session) -> Self {
        Self {
            id: s.id,
            bpm: s.bpm,
            note: s.note.clone(),
            confidence: s.confidence,
            start_time: s.start_time,
            end_time: s.end_time,
            duration: s.duration_seconds(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaView {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    pub filename: String,
    /// Presigned download URL, valid for the presign TTL
    pub url: String,
    pub size: i64,
    pub duration: i32,
    pub created_at: DateTime<Utc>,
}

impl MediaView {
    pub fn new(media: &Media, url: String) -> Self {
        Self {
            id: media.id,
            media_type: media.media_type,
            filename: media.filename.clone(),
            url,
            size: media.size,
            duration: media.duration,
            created_at: media.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadUrlView {
    pub media_id: Uuid,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkView {
    pub id: Uuid,
    pub url: String,
    pub title: String,
    #[serde(rename = "type")]
    pub link_type: LinkType,
    pub created_at: DateTime<Utc>,
}

impl From<&Link> for LinkView {
    fn from(l: &Link) -> Self {
        Self {
            id: l.id,
            url: l.url.clone(),
            title: l.title.clone(),
            link_type: l.link_type,
            created_at: l.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserView {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    /// None until the user uploads an avatar
    pub avatar_url: Option<String>,
}

impl UserView {
    pub fn new(user: &User, avatar_url: Option<String>) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            username: user.username.clone(),
            avatar_url,
        }
    }
}
