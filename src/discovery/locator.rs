use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use object_store::ObjectStore;
use object_store::path::Path as ObjectPath;
use tokio_stream::StreamExt;

use crate::conf::{SourceConfig, TablesConfig};
use crate::core::{LoadError, SourceFileReference};

use super::partition::{filter_data_files, find_date_partitions, success_marker_path};
use super::store::{create_local_store, create_s3_store};

/// Finds the source file a load should consume.
#[async_trait]
pub trait FileLocator: Send + Sync {
    /// Resolve the newest eligible file for `schema.table`, or the one for
    /// `date` when given. `LoadError::NotFoundError` when nothing qualifies.
    async fn resolve_latest(
        &self,
        schema: &str,
        table: &str,
        date: Option<DateTime<Utc>>,
    ) -> Result<SourceFileReference, LoadError>;
}

/// Locator over `<prefix>/<schema>/<table>/<YYYY-MM-DD>/` partitions.
///
/// A partition is eligible when it holds a `_SUCCESS` marker and at least one
/// `.json.gz` data file. Column declarations come from the table config.
pub struct ObjectStoreLocator {
    store: Arc<dyn ObjectStore>,
    prefix: String,
    /// Prepended to object keys to build the warehouse-visible location.
    url_base: String,
    tables: TablesConfig,
}

impl ObjectStoreLocator {
    pub fn new(source: &SourceConfig, tables: TablesConfig) -> Result<Self, LoadError> {
        match source {
            SourceConfig::Local(config) => {
                let (store, prefix) = create_local_store(config)?;
                Ok(Self {
                    store,
                    prefix,
                    url_base: String::from("file:///"),
                    tables,
                })
            }
            SourceConfig::S3(config) => {
                let store = create_s3_store(config)?;
                Ok(Self {
                    store,
                    prefix: config.prefix.trim_matches('/').to_string(),
                    url_base: format!("s3://{}/", config.bucket),
                    tables,
                })
            }
        }
    }

    /// Create from an existing store (useful for testing).
    pub fn with_store(
        store: Arc<dyn ObjectStore>,
        prefix: impl Into<String>,
        url_base: impl Into<String>,
        tables: TablesConfig,
    ) -> Self {
        Self {
            store,
            prefix: prefix.into(),
            url_base: url_base.into(),
            tables,
        }
    }

    fn table_prefix(&self, schema: &str, table: &str) -> String {
        if self.prefix.is_empty() {
            format!("{}/{}", schema, table)
        } else {
            format!("{}/{}/{}", self.prefix, schema, table)
        }
    }

    async fn list_all(&self, prefix: &ObjectPath) -> Result<Vec<ObjectPath>, LoadError> {
        let mut paths = Vec::new();
        let mut stream = self.store.list(Some(prefix));

        while let Some(result) = stream.next().await {
            let meta = result?;
            paths.push(meta.location);
        }

        Ok(paths)
    }

    async fn has_success_marker(&self, partition_path: &ObjectPath) -> bool {
        let marker = success_marker_path(partition_path);
        self.store.head(&marker).await.is_ok()
    }
}

#[async_trait]
impl FileLocator for ObjectStoreLocator {
    async fn resolve_latest(
        &self,
        schema: &str,
        table: &str,
        date: Option<DateTime<Utc>>,
    ) -> Result<SourceFileReference, LoadError> {
        let table_config = self.tables.get(table).ok_or_else(|| {
            LoadError::ConfigParsingError(format!("no [tables.{}] section configured", table))
        })?;

        let table_prefix = self.table_prefix(schema, table);
        log::info!("Looking for source files under '{}'", table_prefix);

        let all_paths = self.list_all(&ObjectPath::from(table_prefix.clone())).await?;
        let mut partitions = find_date_partitions(all_paths.iter().cloned(), &table_prefix);

        if let Some(pinned) = date {
            let pinned = pinned.date_naive();
            log::info!("Restricting to partition {}", pinned);
            partitions.retain(|p| p.date == pinned);
        }

        for partition in &partitions {
            if !self.has_success_marker(&partition.path).await {
                log::debug!(
                    "Partition {} missing _SUCCESS marker, skipping",
                    partition.date
                );
                continue;
            }

            let data_files = filter_data_files(all_paths.iter().cloned(), &partition.path);
            if data_files.is_empty() {
                log::debug!("Partition {} has no data files, skipping", partition.date);
                continue;
            }

            log::info!(
                "Selected partition {} with {} data files",
                partition.path,
                data_files.len()
            );

            return Ok(SourceFileReference {
                schema: schema.to_string(),
                table: table.to_string(),
                location: format!("{}{}/", self.url_base, partition.path),
                objects: data_files.iter().map(|p| p.to_string()).collect(),
                logical_date: partition.logical_date(),
                columns: table_config.columns.clone(),
            });
        }

        Err(LoadError::NotFoundError(match date {
            Some(d) => format!(
                "no complete partition for {}.{} on {}",
                schema,
                table,
                d.date_naive()
            ),
            None => format!("no complete partition for {}.{}", schema, table),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conf::{LocalSourceConfig, TableConfig};
    use crate::core::{DeclaredColumn, SemanticType};
    use chrono::TimeZone;
    use object_store::PutPayload;
    use object_store::memory::InMemory;
    use std::collections::HashMap;
    use std::fs::{self, File};
    use tempfile::TempDir;

    fn tables() -> TablesConfig {
        HashMap::from([(
            "users".to_string(),
            TableConfig {
                freshness_column: "_data_timestamp".to_string(),
                truncate: false,
                dist_key: None,
                sort_key: None,
                columns: vec![DeclaredColumn {
                    name: "id".to_string(),
                    dtype: SemanticType::Int,
                    nullable: false,
                }],
            },
        )])
    }

    async fn put(store: &InMemory, key: &str) {
        store
            .put(&ObjectPath::from(key), PutPayload::from_static(b""))
            .await
            .unwrap();
    }

    async fn memory_store() -> Arc<InMemory> {
        let store = InMemory::new();
        // older complete partition
        put(&store, "exports/mongo/users/2024-01-13/part_0000.json.gz").await;
        put(&store, "exports/mongo/users/2024-01-13/_SUCCESS").await;
        // latest complete partition
        put(&store, "exports/mongo/users/2024-01-14/part_0000.json.gz").await;
        put(&store, "exports/mongo/users/2024-01-14/part_0001.json.gz").await;
        put(&store, "exports/mongo/users/2024-01-14/_SUCCESS").await;
        // incomplete partition
        put(&store, "exports/mongo/users/2024-01-15/part_0000.json.gz").await;
        // complete but empty partition
        put(&store, "exports/mongo/users/2024-01-16/_SUCCESS").await;
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_resolve_selects_latest_complete_partition() {
        let locator = ObjectStoreLocator::with_store(
            memory_store().await,
            "exports",
            "s3://metrics/",
            tables(),
        );

        let file = locator.resolve_latest("mongo", "users", None).await.unwrap();

        assert_eq!(file.location, "s3://metrics/exports/mongo/users/2024-01-14/");
        assert_eq!(file.objects.len(), 2);
        assert_eq!(
            file.logical_date,
            Utc.with_ymd_and_hms(2024, 1, 14, 0, 0, 0).unwrap()
        );
        assert_eq!(file.columns[0].name, "id");
    }

    #[tokio::test]
    async fn test_resolve_pinned_date() {
        let locator = ObjectStoreLocator::with_store(
            memory_store().await,
            "exports",
            "s3://metrics/",
            tables(),
        );
        let pinned = Utc.with_ymd_and_hms(2024, 1, 13, 12, 30, 0).unwrap();

        let file = locator
            .resolve_latest("mongo", "users", Some(pinned))
            .await
            .unwrap();

        assert_eq!(file.location, "s3://metrics/exports/mongo/users/2024-01-13/");
        assert_eq!(file.objects.len(), 1);
    }

    #[tokio::test]
    async fn test_resolve_pinned_incomplete_partition_not_found() {
        let locator = ObjectStoreLocator::with_store(
            memory_store().await,
            "exports",
            "s3://metrics/",
            tables(),
        );
        let pinned = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();

        let result = locator.resolve_latest("mongo", "users", Some(pinned)).await;

        assert!(matches!(result, Err(LoadError::NotFoundError(_))));
    }

    #[tokio::test]
    async fn test_resolve_unconfigured_table() {
        let locator = ObjectStoreLocator::with_store(
            memory_store().await,
            "exports",
            "s3://metrics/",
            tables(),
        );

        let result = locator.resolve_latest("mongo", "orders", None).await;

        assert!(matches!(result, Err(LoadError::ConfigParsingError(_))));
    }

    #[tokio::test]
    async fn test_resolve_from_local_directory() {
        let dir = TempDir::new().unwrap();
        let partition = dir.path().join("mongo/users/2024-01-14");
        fs::create_dir_all(&partition).unwrap();
        File::create(partition.join("part_0000.json.gz")).unwrap();
        File::create(partition.join("_SUCCESS")).unwrap();

        let source = SourceConfig::Local(LocalSourceConfig {
            path: dir.path().to_string_lossy().to_string(),
        });
        let locator = ObjectStoreLocator::new(&source, tables()).unwrap();

        let file = locator.resolve_latest("mongo", "users", None).await.unwrap();

        assert!(file.location.starts_with("file:///"));
        assert!(file.location.ends_with("mongo/users/2024-01-14/"));
    }

    #[tokio::test]
    async fn test_resolve_empty_store() {
        let locator = ObjectStoreLocator::with_store(
            Arc::new(InMemory::new()),
            "",
            "s3://metrics/",
            tables(),
        );

        let result = locator.resolve_latest("mongo", "users", None).await;

        assert!(matches!(result, Err(LoadError::NotFoundError(_))));
    }
}
