use async_trait::async_trait;
use common::path::validate_object_path;
use common::storage::{ImageBucket, ObjectEntry, PublicUrlLayout, StorageError};
use ::s3::creds::Credentials;
use ::s3::{Bucket, Region};
use serde::Deserialize;
use tracing::debug;

/// Connection settings for an S3-compatible bucket.
#[derive(Debug, Deserialize, Clone)]
pub struct S3BucketConfig {
    pub endpoint: String,
    #[serde(default = "default_region")]
    pub region: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    /// Address the bucket as `{endpoint}/{bucket}` instead of a subdomain. Default: true.
    #[serde(default = "default_path_style")]
    pub path_style: bool,
}

fn default_region() -> String {
    "us-east-1".into()
}
fn default_path_style() -> bool {
    true
}

/// Image bucket on S3 or an S3-compatible object store.
pub struct S3ImageBucket {
    bucket: Box<Bucket>,
    layout: PublicUrlLayout,
}

impl S3ImageBucket {
    pub fn new(config: &S3BucketConfig, layout: PublicUrlLayout) -> Result<Self, StorageError> {
        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
        };
        let credentials = Credentials::new(
            Some(config.access_key.as_str()),
            Some(config.secret_key.as_str()),
            None,
            None,
            None,
        )
        .map_err(StorageError::backend)?;

        let mut bucket =
            Bucket::new(&config.bucket, region, credentials).map_err(StorageError::backend)?;
        if config.path_style {
            bucket = bucket.with_path_style();
        }

        Ok(Self { bucket, layout })
    }
}

fn checked_path(path: &str) -> Result<&str, StorageError> {
    validate_object_path(path).map_err(|msg| StorageError::InvalidPath(msg.to_string()))
}

fn check_status(code: u16, path: &str) -> Result<(), StorageError> {
    match code {
        200..=299 => Ok(()),
        404 => Err(StorageError::NotFound(path.to_string())),
        _ => Err(StorageError::Backend(format!(
            "object store returned HTTP {code} for {path}"
        ))),
    }
}

#[async_trait]
impl ImageBucket for S3ImageBucket {
    async fn put(
        &self,
        path: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<(), StorageError> {
        let path = checked_path(path)?;
        let response = self
            .bucket
            .put_object_with_content_type(path, bytes, content_type)
            .await
            .map_err(StorageError::backend)?;
        check_status(response.status_code(), path)?;
        debug!(path, size = bytes.len(), "Uploaded object");
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let path = checked_path(path)?;
        let response = self
            .bucket
            .get_object(path)
            .await
            .map_err(StorageError::backend)?;
        check_status(response.status_code(), path)?;
        Ok(response.bytes().to_vec())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectEntry>, StorageError> {
        let dir = format!("{}/", checked_path(prefix)?);
        let pages = self
            .bucket
            .list(dir.clone(), Some("/".to_string()))
            .await
            .map_err(StorageError::backend)?;

        let mut entries: Vec<ObjectEntry> = pages
            .into_iter()
            .flat_map(|page| page.contents)
            .filter_map(|object| {
                let name = object.key.strip_prefix(&dir)?;
                (!name.is_empty() && !name.contains('/')).then(|| ObjectEntry {
                    name: name.to_string(),
                })
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn remove(&self, paths: &[String]) -> Result<(), StorageError> {
        for path in paths {
            let path = checked_path(path)?;
            let response = self
                .bucket
                .delete_object(path)
                .await
                .map_err(StorageError::backend)?;
            match check_status(response.status_code(), path) {
                Ok(()) | Err(StorageError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn layout(&self) -> &PublicUrlLayout {
        &self.layout
    }
}
