use log::error;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::constants::AVATAR_DOWNLOAD_NAME;
use crate::error::Result;
use crate::object_store::ObjectStore;

/// Profile avatars: one object per user in the avatar bucket, no database row
pub struct AvatarService {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    ttl: Duration,
}

impl AvatarService {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>, ttl: Duration) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            ttl,
        }
    }

    pub async fn upload_url(&self, user_id: Uuid) -> Result<String> {
        let key = user_id.to_string();
        self.store
            .presigned_put_url(&self.bucket, &key, self.ttl)
            .await
            .map_err(|e| {
                error!("Failed to generate avatar upload URL for user {}: {}", user_id, e);
                e
            })
    }

    /// None when the user never uploaded an avatar
    pub async fn download_url(&self, user_id: Uuid) -> Result<Option<String>> {
        let key = user_id.to_string();
        if !self.store.object_exists(&self.bucket, &key).await? {
            return Ok(None);
        }

        let url = self
            .store
            .presigned_get_url(&self.bucket, &key, AVATAR_DOWNLOAD_NAME, self.ttl)
            .await
            .map_err(|e| {
                error!("Failed to generate avatar URL for user {}: {}", user_id, e);
                e
            })?;
        Ok(Some(url))
    }
}
