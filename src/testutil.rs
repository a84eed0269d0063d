//! Test utilities.
//!
//! This module is only available in unit tests or when the `testutil`
//! feature is enabled.

use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use flate2::Compression;
use flate2::write::GzEncoder;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};
use serde_json::Value;

use crate::conf::{Config, LocalSourceConfig, SourceConfig, TableConfig, WarehouseConfig};
use crate::core::{DeclaredColumn, SemanticType, SourceFileReference};
use crate::discovery::ObjectStoreLocator;
use crate::warehouse::MemoryWarehouse;

pub const TEST_SCHEMA: &str = "mongo";
pub const TEST_URL_BASE: &str = "memory:///";

/// Gzip one JSON object per line.
pub fn gzip_json_lines(rows: &[Value]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
    for row in rows {
        encoder.write_all(row.to_string().as_bytes()).unwrap();
        encoder.write_all(b"\n").unwrap();
    }
    encoder.finish().unwrap()
}

/// Midnight UTC of a `YYYY-MM-DD` date.
pub fn logical_date(date: &str) -> DateTime<Utc> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .unwrap()
        .and_time(NaiveTime::MIN)
        .and_utc()
}

pub fn columns(layout: &[(&str, SemanticType)]) -> Vec<DeclaredColumn> {
    layout
        .iter()
        .map(|(name, dtype)| DeclaredColumn {
            name: name.to_string(),
            dtype: *dtype,
            nullable: true,
        })
        .collect()
}

pub fn table_config(freshness_column: &str, layout: &[(&str, SemanticType)]) -> TableConfig {
    TableConfig {
        freshness_column: freshness_column.to_string(),
        truncate: false,
        dist_key: None,
        sort_key: None,
        columns: columns(layout),
    }
}

/// Write a complete partition (data file plus `_SUCCESS`) for `schema.table`.
/// Returns the key of the data file.
pub async fn put_partition(
    store: &InMemory,
    schema: &str,
    table: &str,
    date: &str,
    rows: &[Value],
) -> String {
    let key = format!("{}/{}/{}/part_0000.json.gz", schema, table, date);
    store
        .put(&ObjectPath::from(key.as_str()), PutPayload::from(gzip_json_lines(rows)))
        .await
        .unwrap();
    store
        .put(
            &ObjectPath::from(format!("{}/{}/{}/_SUCCESS", schema, table, date)),
            PutPayload::from_static(b""),
        )
        .await
        .unwrap();
    key
}

/// A source file reference for a partition written by [`put_partition`].
pub fn source_file(
    table: &str,
    date: &str,
    object: &str,
    layout: &[(&str, SemanticType)],
) -> SourceFileReference {
    SourceFileReference {
        schema: TEST_SCHEMA.to_string(),
        table: table.to_string(),
        location: format!("{}{}/{}/{}/", TEST_URL_BASE, TEST_SCHEMA, table, date),
        objects: vec![object.to_string()],
        logical_date: logical_date(date),
        columns: columns(layout),
    }
}

pub fn test_config(tables: HashMap<String, TableConfig>) -> Config {
    Config {
        schema: TEST_SCHEMA.to_string(),
        source: SourceConfig::Local(LocalSourceConfig {
            path: "/unused".to_string(),
        }),
        warehouse: WarehouseConfig {
            host: "localhost".to_string(),
            port: 5439,
            database: "dev".to_string(),
            user: "loader".to_string(),
            password: String::new(),
            connect_timeout: Duration::from_secs(10),
            region: None,
            copy_credentials: None,
        },
        tables,
    }
}

/// Locator and warehouse sharing one in-memory object store.
pub fn memory_pair(
    store: Arc<InMemory>,
    tables: HashMap<String, TableConfig>,
) -> (ObjectStoreLocator, MemoryWarehouse) {
    let locator = ObjectStoreLocator::with_store(store.clone(), "", TEST_URL_BASE, tables);
    let warehouse = MemoryWarehouse::new(store);
    (locator, warehouse)
}
