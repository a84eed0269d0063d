use std::sync::Arc;

use object_store::ObjectStore;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;

use crate::conf::{LocalSourceConfig, S3SourceConfig};
use crate::core::LoadError;

/// Filesystem-rooted store plus the key prefix of the export directory.
pub fn create_local_store(
    config: &LocalSourceConfig,
) -> Result<(Arc<dyn ObjectStore>, String), LoadError> {
    let store = LocalFileSystem::new();
    // LocalFileSystem keys are absolute paths without the leading slash
    let prefix = config.path.trim_start_matches('/').trim_end_matches('/');
    Ok((Arc::new(store), prefix.to_string()))
}

pub fn create_s3_store(config: &S3SourceConfig) -> Result<Arc<dyn ObjectStore>, LoadError> {
    let mut builder = AmazonS3Builder::from_env()
        .with_bucket_name(&config.bucket)
        .with_region(&config.region);

    // MinIO, LocalStack, etc.
    if let Some(endpoint) = &config.endpoint {
        builder = builder.with_endpoint(endpoint);
        if endpoint.starts_with("http://") {
            builder = builder.with_allow_http(true);
        }
    }

    let store = builder.build().map_err(|e| {
        LoadError::StorageError(format!(
            "Failed to create S3 store for bucket '{}': {}",
            config.bucket, e
        ))
    })?;

    Ok(Arc::new(store))
}
