//! Bulk S3 transfers over the shared transfer client.
//!
//! Uploads switch to multipart above a size threshold, with part uploads
//! running at bounded concurrency; downloads fetch ranged parts the same way
//! and write them to disk in order.

use std::path::Path;

use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use futures::StreamExt;
use futures::stream;
use tokio::io::AsyncWriteExt;
use tracing::warn;

use crate::errors::AwsClientError;

/// Part size for multipart transfers.
const PART_SIZE: u64 = 8 * 1024 * 1024;

/// Objects at or above this size move as multipart transfers.
const MULTIPART_THRESHOLD: u64 = 16 * 1024 * 1024;

/// How many parts are in flight at once.
const CONCURRENT_PARTS: usize = 4;

/// S3 caps multipart uploads at 10,000 parts.
const MAX_PARTS: usize = 10_000;

/// Orchestrates bulk uploads and downloads over a shared S3 client.
#[derive(Debug, Clone)]
pub struct S3TransferManager {
    client: aws_sdk_s3::Client,
}

impl S3TransferManager {
    pub(crate) fn new(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }

    /// The wrapped S3 client.
    #[must_use]
    pub fn client(&self) -> &aws_sdk_s3::Client {
        &self.client
    }

    /// Upload a local file to `bucket`/`key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or any S3 call fails.
    pub async fn upload_file(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
    ) -> Result<(), AwsClientError> {
        let size = tokio::fs::metadata(path)
            .await
            .map_err(|e| AwsClientError::Transfer(format!("stat {}: {e}", path.display())))?
            .len();

        if size < MULTIPART_THRESHOLD {
            let body = ByteStream::from_path(path)
                .await
                .map_err(|e| AwsClientError::Transfer(format!("read {}: {e}", path.display())))?;
            self.client
                .put_object()
                .bucket(bucket)
                .key(key)
                .body(body)
                .send()
                .await?;
            return Ok(());
        }

        self.upload_multipart(bucket, key, path, size).await
    }

    async fn upload_multipart(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        size: u64,
    ) -> Result<(), AwsClientError> {
        let created = self
            .client
            .create_multipart_upload()
            .bucket(bucket)
            .key(key)
            .send()
            .await?;
        let upload_id = created
            .upload_id()
            .ok_or_else(|| {
                AwsClientError::Transfer(format!("no upload id for s3://{bucket}/{key}"))
            })?
            .to_string();

        match self.upload_parts(bucket, key, path, size, &upload_id).await {
            Ok(parts) => {
                self.client
                    .complete_multipart_upload()
                    .bucket(bucket)
                    .key(key)
                    .upload_id(&upload_id)
                    .multipart_upload(
                        CompletedMultipartUpload::builder()
                            .set_parts(Some(parts))
                            .build(),
                    )
                    .send()
                    .await?;
                Ok(())
            }
            Err(e) => {
                // Orphaned parts are billed until aborted.
                if let Err(abort_err) = self
                    .client
                    .abort_multipart_upload()
                    .bucket(bucket)
                    .key(key)
                    .upload_id(&upload_id)
                    .send()
                    .await
                {
                    warn!("Failed to abort multipart upload {}: {}", upload_id, abort_err);
                }
                Err(e)
            }
        }
    }

    async fn upload_parts(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        size: u64,
        upload_id: &str,
    ) -> Result<Vec<CompletedPart>, AwsClientError> {
        let ranges = part_ranges(size, PART_SIZE);
        if ranges.len() > MAX_PARTS {
            return Err(AwsClientError::Transfer(format!(
                "s3://{bucket}/{key}: {size} bytes needs {} parts, limit is {MAX_PARTS}",
                ranges.len()
            )));
        }

        let uploads = ranges.into_iter().enumerate().map(|(idx, (offset, len))| {
            let client = self.client.clone();
            let path = path.to_path_buf();
            let bucket = bucket.to_string();
            let key = key.to_string();
            let upload_id = upload_id.to_string();
            async move {
                // Part numbers start at 1 and are bounded by MAX_PARTS.
                let part_number = i32::try_from(idx + 1).map_err(|_| {
                    AwsClientError::Transfer(format!("part index {idx} out of range"))
                })?;
                let body = read_file_range(&path, offset, len).await?;
                let resp = client
                    .upload_part()
                    .bucket(&bucket)
                    .key(&key)
                    .upload_id(&upload_id)
                    .part_number(part_number)
                    .body(ByteStream::from(body))
                    .send()
                    .await?;
                Ok::<CompletedPart, AwsClientError>(
                    CompletedPart::builder()
                        .part_number(part_number)
                        .set_e_tag(resp.e_tag().map(str::to_string))
                        .build(),
                )
            }
        });

        let mut parts = stream::iter(uploads)
            .buffer_unordered(CONCURRENT_PARTS)
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .collect::<Result<Vec<_>, _>>()?;
        parts.sort_by_key(CompletedPart::part_number);
        Ok(parts)
    }

    /// Download `bucket`/`key` to a local file, returning the byte count.
    ///
    /// # Errors
    ///
    /// Returns an error if any S3 call fails or the file cannot be written.
    pub async fn download_file(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
    ) -> Result<u64, AwsClientError> {
        let head = self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await?;
        let size = head
            .content_length()
            .and_then(|len| u64::try_from(len).ok())
            .unwrap_or(0);

        let mut file = tokio::fs::File::create(path)
            .await
            .map_err(|e| AwsClientError::Transfer(format!("create {}: {e}", path.display())))?;

        if size < MULTIPART_THRESHOLD {
            let resp = self
                .client
                .get_object()
                .bucket(bucket)
                .key(key)
                .send()
                .await?;
            let data = resp
                .body
                .collect()
                .await
                .map_err(|e| AwsClientError::Transfer(format!("read s3://{bucket}/{key}: {e}")))?
                .into_bytes();
            file.write_all(&data)
                .await
                .map_err(|e| AwsClientError::Transfer(format!("write {}: {e}", path.display())))?;
            file.flush()
                .await
                .map_err(|e| AwsClientError::Transfer(format!("flush {}: {e}", path.display())))?;
            return Ok(data.len() as u64);
        }

        // Ranged parts fetch concurrently; `buffered` preserves part order so
        // chunks can be written sequentially as they arrive.
        let fetches = part_ranges(size, PART_SIZE).into_iter().map(|(offset, len)| {
            let client = self.client.clone();
            let bucket = bucket.to_string();
            let key = key.to_string();
            async move {
                let end = offset + len - 1;
                let resp = client
                    .get_object()
                    .bucket(&bucket)
                    .key(&key)
                    .range(format!("bytes={offset}-{end}"))
                    .send()
                    .await?;
                resp.body
                    .collect()
                    .await
                    .map(|data| data.into_bytes())
                    .map_err(|e| {
                        AwsClientError::Transfer(format!(
                            "read bytes {offset}-{end} of s3://{bucket}/{key}: {e}"
                        ))
                    })
            }
        });

        let mut chunks = stream::iter(fetches).buffered(CONCURRENT_PARTS);
        let mut written = 0u64;
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk?;
            file.write_all(&chunk)
                .await
                .map_err(|e| AwsClientError::Transfer(format!("write {}: {e}", path.display())))?;
            written += chunk.len() as u64;
        }
        file.flush()
            .await
            .map_err(|e| AwsClientError::Transfer(format!("flush {}: {e}", path.display())))?;
        Ok(written)
    }
}

async fn read_file_range(path: &Path, offset: u64, len: u64) -> Result<Vec<u8>, AwsClientError> {
    use tokio::io::{AsyncReadExt, AsyncSeekExt};

    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| AwsClientError::Transfer(format!("open {}: {e}", path.display())))?;
    file.seek(std::io::SeekFrom::Start(offset))
        .await
        .map_err(|e| AwsClientError::Transfer(format!("seek {}: {e}", path.display())))?;
    let part_len = usize::try_from(len).map_err(|_| {
        AwsClientError::Transfer(format!("part of {len} bytes does not fit in memory"))
    })?;
    let mut buf = vec![0u8; part_len];
    file.read_exact(&mut buf)
        .await
        .map_err(|e| AwsClientError::Transfer(format!("read {}: {e}", path.display())))?;
    Ok(buf)
}

/// Split `total` bytes into `(offset, len)` ranges of at most `part_size`.
fn part_ranges(total: u64, part_size: u64) -> Vec<(u64, u64)> {
    let mut ranges = Vec::new();
    let mut offset = 0;
    while offset < total {
        let len = part_size.min(total - offset);
        ranges.push((offset, len));
        offset += len;
    }
    ranges
}
