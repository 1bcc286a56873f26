use std::time::Duration;

/// Expected database schema version
/// Databases created by another version are refused at startup
pub const SCHEMA_VERSION: &str = "1";

/// Default bucket holding task media, keyed `{task_id}/{media_id}`
pub const DEFAULT_MEDIA_BUCKET: &str = "trackmus";

/// Default bucket holding user avatars, keyed `{user_id}`
pub const DEFAULT_AVATAR_BUCKET: &str = "trackmus-avatars";

/// Lifetime of presigned upload and download URLs
pub const PRESIGNED_URL_TTL: Duration = Duration::from_secs(15 * 60);

/// Filename offered in the Content-Disposition of avatar downloads
pub const AVATAR_DOWNLOAD_NAME: &str = "avatar";

/// How long shutdown waits for queued orphan cleanup batches
pub const CLEANUP_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);
