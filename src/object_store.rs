//! S3-compatible object store access
//!
//! Media bytes never pass through the API: clients upload and download
//! directly against presigned URLs. The API itself only issues HEAD and
//! DELETE requests (plus bucket bootstrap), all signed with AWS Signature V4.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use log::{debug, warn};
use reqwest::{Client, Method, StatusCode};
use sha2::{Digest, Sha256};
use std::time::Duration;
use url::Url;

use crate::error::{AppError, Result};

/// Presigned URLs cannot outlive seven days
const MAX_PRESIGN_SECS: u64 = 7 * 24 * 60 * 60;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";
/// sha256 of the empty string
const EMPTY_PAYLOAD_SHA256: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Size of the stored object, `None` when no object exists under `key`
    async fn object_size(&self, bucket: &str, key: &str) -> Result<Option<u64>>;

    async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool> {
        Ok(self.object_size(bucket, key).await?.is_some())
    }

    async fn presigned_put_url(&self, bucket: &str, key: &str, ttl: Duration) -> Result<String>;

    /// Download URL that makes browsers save the object as `filename`
    async fn presigned_get_url(
        &self,
        bucket: &str,
        key: &str,
        filename: &str,
        ttl: Duration,
    ) -> Result<String>;

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()>;

    /// Create the bucket when it does not exist yet
    async fn ensure_bucket(&self, bucket: &str) -> Result<()>;
}

/// Path-style S3 client (MinIO, Garage, AWS)
pub struct S3Store {
    endpoint: Url,
    region: String,
    access_key: String,
    secret_key: String,
    client: Client,
}

impl S3Store {
    pub fn new(endpoint: &str, region: &str, access_key: &str, secret_key: &str) -> Result<Self> {
        let endpoint = Url::parse(endpoint).map_err(|e| {
            AppError::Config(format!("Invalid object store endpoint '{}': {}", endpoint, e))
        })?;
        if endpoint.host_str().is_none() {
            return Err(AppError::Config(
                "Object store endpoint has no host".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            endpoint,
            region: region.to_string(),
            access_key: access_key.to_string(),
            secret_key: secret_key.to_string(),
            client,
        })
    }

    /// `host[:port]` exactly as the HTTP client will send it
    fn host(&self) -> String {
        let host = self.endpoint.host_str().unwrap_or_default();
        match self.endpoint.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        }
    }

    fn canonical_uri(bucket: &str, key: Option<&str>) -> String {
        let mut uri = format!("/{}", urlencoding::encode(bucket));
        if let Some(key) = key {
            for segment in key.split('/') {
                uri.push('/');
                uri.push_str(&urlencoding::encode(segment));
            }
        }
        uri
    }

    fn scope(&self, now: &DateTime<Utc>) -> String {
        format!("{}/{}/s3/aws4_request", now.format("%Y%m%d"), self.region)
    }

    fn signing_key(&self, now: &DateTime<Utc>) -> Result<Vec<u8>> {
        let date = now.format("%Y%m%d").to_string();
        let k_date = hmac_sha256(format!("AWS4{}", self.secret_key).as_bytes(), date.as_bytes())?;
        let k_region = hmac_sha256(&k_date, self.region.as_bytes())?;
        let k_service = hmac_sha256(&k_region, b"s3")?;
        hmac_sha256(&k_service, b"aws4_request")
    }

    fn signature(&self, canonical_request: &str, now: &DateTime<Utc>) -> Result<String> {
        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            ALGORITHM,
            now.format("%Y%m%dT%H%M%SZ"),
            self.scope(now),
            hex::encode(Sha256::digest(canonical_request.as_bytes()))
        );
        let signature = hmac_sha256(&self.signing_key(now)?, string_to_sign.as_bytes())?;
        Ok(hex::encode(signature))
    }

    /// Query-string presigned URL (AWS SigV4, UNSIGNED-PAYLOAD)
    pub fn presign(
        &self,
        method: &Method,
        bucket: &str,
        key: &str,
        ttl: Duration,
        extra_query: &[(&str, String)],
        now: DateTime<Utc>,
    ) -> Result<String> {
        let expires = ttl.as_secs();
        if expires == 0 || expires > MAX_PRESIGN_SECS {
            return Err(AppError::Internal(format!(
                "presign ttl out of range: {}s",
                expires
            )));
        }

        let uri = Self::canonical_uri(bucket, Some(key));
        let host = self.host();

        let mut params: Vec<(String, String)> = vec![
            ("X-Amz-Algorithm".to_string(), ALGORITHM.to_string()),
            (
                "X-Amz-Credential".to_string(),
                format!("{}/{}", self.access_key, self.scope(&now)),
            ),
            (
                "X-Amz-Date".to_string(),
                now.format("%Y%m%dT%H%M%SZ").to_string(),
            ),
            ("X-Amz-Expires".to_string(), expires.to_string()),
            ("X-Amz-SignedHeaders".to_string(), "host".to_string()),
        ];
        for (k, v) in extra_query {
            params.push((k.to_string(), v.clone()));
        }
        let mut encoded: Vec<(String, String)> = params
            .iter()
            .map(|(k, v)| {
                (
                    urlencoding::encode(k).into_owned(),
                    urlencoding::encode(v).into_owned(),
                )
            })
            .collect();
        encoded.sort();
        let query = encoded
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");

        let canonical_request = format!(
            "{}\n{}\n{}\nhost:{}\n\nhost\n{}",
            method.as_str(),
            uri,
            query,
            host,
            UNSIGNED_PAYLOAD
        );
        let signature = self.signature(&canonical_request, &now)?;

        Ok(format!(
            "{}://{}{}?{}&X-Amz-Signature={}",
            self.endpoint.scheme(),
            host,
            uri,
            query,
            signature
        ))
    }

    /// Send an empty-body request signed with an Authorization header
    async fn send_signed(
        &self,
        method: Method,
        bucket: &str,
        key: Option<&str>,
    ) -> Result<reqwest::Response> {
        let now = Utc::now();
        let uri = Self::canonical_uri(bucket, key);
        let host = self.host();
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();

        let canonical_request = format!(
            "{}\n{}\n\nhost:{}\nx-amz-content-sha256:{}\nx-amz-date:{}\n\nhost;x-amz-content-sha256;x-amz-date\n{}",
            method.as_str(),
            uri,
            host,
            EMPTY_PAYLOAD_SHA256,
            amz_date,
            EMPTY_PAYLOAD_SHA256
        );
        let authorization = format!(
            "{} Credential={}/{}, SignedHeaders=host;x-amz-content-sha256;x-amz-date, Signature={}",
            ALGORITHM,
            self.access_key,
            self.scope(&now),
            self.signature(&canonical_request, &now)?
        );

        let url = format!("{}://{}{}", self.endpoint.scheme(), host, uri);
        debug!("{} {}", method, url);

        let response = self
            .client
            .request(method, url)
            .header("x-amz-date", amz_date)
            .header("x-amz-content-sha256", EMPTY_PAYLOAD_SHA256)
            .header(reqwest::header::AUTHORIZATION, authorization)
            .send()
            .await?;
        Ok(response)
    }
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(key)
        .map_err(|e| AppError::Internal(format!("invalid signing key: {}", e)))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Object size from a HEAD response; S3 always sends Content-Length there
fn content_length(headers: &reqwest::header::HeaderMap) -> Result<u64> {
    let value = headers.get(reqwest::header::CONTENT_LENGTH).ok_or_else(|| {
        AppError::StoreUnavailable("HEAD response without Content-Length".to_string())
    })?;
    value
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .ok_or_else(|| {
            AppError::StoreUnavailable(format!("HEAD response with bad Content-Length {:?}", value))
        })
}

/// Quote-safe `attachment` disposition for presigned downloads
pub fn attachment_disposition(filename: &str) -> String {
    let clean: String = filename
        .chars()
        .filter(|c| *c != '"' && *c != '\\' && !c.is_control())
        .collect();
    format!("attachment; filename=\"{}\"", clean)
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn object_size(&self, bucket: &str, key: &str) -> Result<Option<u64>> {
        let response = self.send_signed(Method::HEAD, bucket, Some(key)).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let size = content_length(response.headers()).map_err(|e| {
                    warn!("HEAD {}/{} succeeded without a usable size", bucket, key);
                    e
                })?;
                Ok(Some(size))
            }
            status => Err(AppError::StoreUnavailable(format!(
                "HEAD {}/{} returned {}",
                bucket, key, status
            ))),
        }
    }

    async fn presigned_put_url(&self, bucket: &str, key: &str, ttl: Duration) -> Result<String> {
        self.presign(&Method::PUT, bucket, key, ttl, &[], Utc::now())
    }

    async fn presigned_get_url(
        &self,
        bucket: &str,
        key: &str,
        filename: &str,
        ttl: Duration,
    ) -> Result<String> {
        let extra = [(
            "response-content-disposition",
            attachment_disposition(filename),
        )];
        self.presign(&Method::GET, bucket, key, ttl, &extra, Utc::now())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        let response = self.send_signed(Method::DELETE, bucket, Some(key)).await?;
        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            Ok(())
        } else {
            Err(AppError::StoreUnavailable(format!(
                "DELETE {}/{} returned {}",
                bucket, key, status
            )))
        }
    }

    async fn ensure_bucket(&self, bucket: &str) -> Result<()> {
        let response = self.send_signed(Method::HEAD, bucket, None).await?;
        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => {
                let response = self.send_signed(Method::PUT, bucket, None).await?;
                let status = response.status();
                // 409 BucketAlreadyOwnedByYou when racing another instance
                if status.is_success() || status == StatusCode::CONFLICT {
                    Ok(())
                } else {
                    Err(AppError::StoreUnavailable(format!(
                        "create bucket {} returned {}",
                        bucket, status
                    )))
                }
            }
            status => Err(AppError::StoreUnavailable(format!(
                "HEAD bucket {} returned {}",
                bucket, status
            ))),
        }
    }
}
