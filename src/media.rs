//! Media upload and reconciliation
//!
//! Uploads are client driven: the API hands out a presigned PUT URL, the
//! client uploads straight to the object store and then confirms, which is
//! the moment the media row is written. Nothing makes the row and the object
//! agree transactionally, so availability is derived at read time: listing
//! checks each row against the store, hides rows without an object and hands
//! them to a background worker that deletes them.

use chrono::Utc;
use futures::stream::{self, StreamExt};
use log::{error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::{MediaConfig, ObjectStoreConfig};
use crate::constants::{DEFAULT_MEDIA_BUCKET, PRESIGNED_URL_TTL};
use crate::error::{AppError, Result};
use crate::models::{media_object_key, ConfirmMedia, Media, MediaView, UploadUrlView};
use crate::object_store::ObjectStore;
use crate::repository::MediaRepository;

#[derive(Debug, Clone)]
pub struct MediaSettings {
    pub bucket: String,
    pub presign_ttl: Duration,
    pub verify_upload_size: bool,
    pub cleanup_queue: usize,
    pub existence_check_concurrency: usize,
}

impl Default for MediaSettings {
    fn default() -> Self {
        Self {
            bucket: DEFAULT_MEDIA_BUCKET.to_string(),
            presign_ttl: PRESIGNED_URL_TTL,
            verify_upload_size: false,
            cleanup_queue: 64,
            existence_check_concurrency: 8,
        }
    }
}

impl MediaSettings {
    pub fn from_config(store: &ObjectStoreConfig, media: &MediaConfig) -> Self {
        Self {
            bucket: store.media_bucket.clone(),
            presign_ttl: Duration::from_secs(store.presign_ttl_secs),
            verify_upload_size: media.verify_upload_size,
            cleanup_queue: media.cleanup_queue.max(1),
            existence_check_concurrency: media.existence_check_concurrency.max(1),
        }
    }
}

pub struct MediaCoordinator {
    repo: Arc<dyn MediaRepository>,
    store: Arc<dyn ObjectStore>,
    settings: MediaSettings,
    cleanup_tx: mpsc::Sender<Vec<Uuid>>,
}

impl MediaCoordinator {
    /// Build the coordinator and spawn its orphan cleanup worker.
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(
        repo: Arc<dyn MediaRepository>,
        store: Arc<dyn ObjectStore>,
        settings: MediaSettings,
    ) -> (Self, CleanupHandle) {
        let (cleanup_tx, cleanup_rx) = mpsc::channel(settings.cleanup_queue.max(1));
        let worker = CleanupHandle {
            join: tokio::spawn(run_cleanup_worker(repo.clone(), cleanup_rx)),
        };

        let coordinator = Self {
            repo,
            store,
            settings,
            cleanup_tx,
        };
        (coordinator, worker)
    }

    pub fn bucket(&self) -> &str {
        &self.settings.bucket
    }

    /// Presigned PUT for `{task_id}/{media_id}`; no row is written yet
    pub async fn request_upload_url(&self, task_id: Uuid, media_id: Uuid) -> Result<UploadUrlView> {
        let key = media_object_key(task_id, media_id);
        let url = self
            .store
            .presigned_put_url(&self.settings.bucket, &key, self.settings.presign_ttl)
            .await
            .map_err(|e| {
                error!("Failed to generate upload URL for {}: {}", key, e);
                e
            })?;

        Ok(UploadUrlView { media_id, url })
    }

    /// Record an upload the client reports as finished and return it with a download URL
    pub async fn confirm_upload(
        &self,
        task_id: Uuid,
        media_id: Uuid,
        req: ConfirmMedia,
    ) -> Result<MediaView> {
        validate_confirm(&req)?;

        let key = media_object_key(task_id, media_id);

        if self.settings.verify_upload_size {
            match self.store.object_size(&self.settings.bucket, &key).await? {
                None => {
                    return Err(AppError::invalid(format!(
                        "no uploaded object found for media {}",
                        media_id
                    )))
                }
                Some(actual) if actual != req.size as u64 => {
                    warn!(
                        "Rejecting confirmation of {}: reported size {} but stored size {}",
                        key, req.size, actual
                    );
                    return Err(AppError::invalid(format!(
                        "reported size {} does not match uploaded size {}",
                        req.size, actual
                    )));
                }
                Some(_) => {}
            }
        }

        let record = Media {
            id: media_id,
            task_id,
            media_type: req.media_type,
            filename: req.filename,
            size: req.size,
            duration: req.duration,
            created_at: Utc::now(),
        };

        let media = self.repo.create(&record).await.map_err(|e| {
            error!("Failed to create media {} for task {}: {}", media_id, task_id, e);
            e
        })?;

        let url = match self
            .store
            .presigned_get_url(
                &self.settings.bucket,
                &key,
                &media.filename,
                self.settings.presign_ttl,
            )
            .await
        {
            Ok(url) => url,
            Err(e) => {
                error!("Failed to generate download URL for {}: {}", key, e);
                // Compensate; if this fails too the listing will find the orphan
                if let Err(del_err) = self.repo.delete(media.id).await {
                    warn!(
                        "Failed to delete media {} after failed confirmation: {}",
                        media.id, del_err
                    );
                }
                return Err(e);
            }
        };

        Ok(MediaView::new(&media, url))
    }

    /// Media of a task whose objects exist, each with a fresh download URL.
    ///
    /// Rows without an object are left out and queued for deletion. Rows whose
    /// existence check failed are left out but kept.
    pub async fn list_media(&self, task_id: Uuid) -> Result<Vec<MediaView>> {
        let rows = self.repo.list_by_task(task_id).await?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let store = self.store.as_ref();
        let bucket = self.settings.bucket.as_str();

        // buffered() keeps repository order, so each outcome stays paired with its row
        let checked: Vec<(Media, Result<bool>)> = stream::iter(rows)
            .map(|m| async move {
                let exists = store.object_exists(bucket, &m.object_key()).await;
                (m, exists)
            })
            .buffered(self.settings.existence_check_concurrency)
            .collect()
            .await;

        let mut result = Vec::with_capacity(checked.len());
        let mut orphans = Vec::new();

        for (media, exists) in checked {
            let key = media.object_key();
            match exists {
                Ok(true) => {
                    let url = store
                        .presigned_get_url(bucket, &key, &media.filename, self.settings.presign_ttl)
                        .await
                        .map_err(|e| {
                            error!("Failed to generate download URL for {}: {}", key, e);
                            e
                        })?;
                    result.push(MediaView::new(&media, url));
                }
                Ok(false) => {
                    warn!(
                        "Media {} of task {} has no object in the store",
                        media.id, task_id
                    );
                    orphans.push(media.id);
                }
                Err(e) => {
                    warn!("Failed to check existence of {}: {}", key, e);
                }
            }
        }

        if !orphans.is_empty() {
            self.schedule_cleanup(orphans);
        }

        Ok(result)
    }

    /// Delete the object (best effort) and then the row (authoritative)
    pub async fn remove_media(&self, media_id: Uuid) -> Result<()> {
        let media = self.repo.get(media_id).await?;
        let key = media.object_key();

        if let Err(e) = self.store.delete_object(&self.settings.bucket, &key).await {
            error!("Failed to delete object {}: {}", key, e);
        }

        self.repo.delete(media_id).await.map_err(|e| {
            error!("Failed to delete media {}: {}", media_id, e);
            e
        })?;

        info!("Media {} removed from task {}", media_id, media.task_id);
        Ok(())
    }

    /// Hand orphan ids to the cleanup worker without waiting
    fn schedule_cleanup(&self, ids: Vec<Uuid>) {
        let count = ids.len();
        match self.cleanup_tx.try_send(ids) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(
                    "Orphan cleanup queue full, dropping batch of {} (will be retried on next listing)",
                    count
                );
            }
            Err(TrySendError::Closed(_)) => {
                error!("Orphan cleanup worker stopped, dropping batch of {}", count);
            }
        }
    }
}

/// Owner of the background orphan cleanup task
pub struct CleanupHandle {
    join: JoinHandle<()>,
}

impl CleanupHandle {
    /// Wait up to `wait` for the worker to finish the batches already queued.
    ///
    /// The queue closes when the last `MediaCoordinator` is dropped, so drop
    /// the coordinator (or the server state holding it) before calling this.
    /// Returns false when the worker was still running at the deadline; it is
    /// left detached and any batches it had not reached are found again by
    /// the next listing.
    pub async fn shutdown(self, wait: Duration) -> bool {
        match tokio::time::timeout(wait, self.join).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                error!("Orphan cleanup worker failed: {}", e);
                true
            }
            Err(_) => {
                warn!(
                    "Orphan cleanup worker still running after {:?}, not waiting any longer",
                    wait
                );
                false
            }
        }
    }
}

fn validate_confirm(req: &ConfirmMedia) -> Result<()> {
    if req.filename.trim().is_empty() {
        return Err(AppError::invalid("filename must not be empty"));
    }
    if req.size < 0 {
        return Err(AppError::invalid("size must not be negative"));
    }
    if req.duration < 0 {
        return Err(AppError::invalid("duration must not be negative"));
    }
    Ok(())
}

async fn run_cleanup_worker(repo: Arc<dyn MediaRepository>, mut rx: mpsc::Receiver<Vec<Uuid>>) {
    while let Some(ids) = rx.recv().await {
        info!("Cleaning up {} orphaned media records", ids.len());
        match repo.delete_batch(&ids).await {
            Ok(deleted) => info!("Cleaned up {} orphaned media records", deleted),
            Err(e) => error!("Failed to clean up {} orphaned media records: {}", ids.len(), e),
        }
    }
}
