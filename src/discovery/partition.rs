use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use object_store::path::Path as ObjectPath;

/// Suffix of the gzipped JSON-lines files the exporter writes.
pub const DATA_FILE_SUFFIX: &str = ".json.gz";

/// Represents a discovered date partition
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct DatePartition {
    pub date: NaiveDate,
    pub path: ObjectPath,
}

impl DatePartition {
    /// Midnight UTC of the partition date.
    pub fn logical_date(&self) -> DateTime<Utc> {
        self.date.and_time(NaiveTime::MIN).and_utc()
    }
}

/// Parses a path segment as a YYYY-MM-DD date.
/// Returns None if the segment doesn't match the expected format.
pub fn parse_date_partition(segment: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(segment, "%Y-%m-%d").ok()
}

/// For path "prefix/2024-01-14/file.json.gz" with prefix "prefix",
/// returns Some("2024-01-14").
fn extract_date_segment<'a>(path_str: &'a str, prefix: &str) -> Option<&'a str> {
    let relative = if prefix.is_empty() {
        path_str
    } else {
        let prefix_with_slash = if prefix.ends_with('/') {
            prefix.to_string()
        } else {
            format!("{}/", prefix)
        };
        path_str.strip_prefix(&prefix_with_slash)?
    };

    relative.split('/').next()
}

/// Returns partitions sorted most recent first, one per date.
pub fn find_date_partitions(
    paths: impl IntoIterator<Item = ObjectPath>,
    prefix: &str,
) -> Vec<DatePartition> {
    let mut partitions: Vec<DatePartition> = paths
        .into_iter()
        .filter_map(|path| {
            let segment = extract_date_segment(path.as_ref(), prefix)?;
            let date = parse_date_partition(segment)?;

            let partition_path = if prefix.is_empty() {
                ObjectPath::from(segment.to_string())
            } else {
                ObjectPath::from(format!("{}/{}", prefix.trim_end_matches('/'), segment))
            };

            Some(DatePartition {
                date,
                path: partition_path,
            })
        })
        .collect();

    partitions.sort_by(|a, b| b.date.cmp(&a.date));
    partitions.dedup_by(|a, b| a.date == b.date);

    partitions
}

pub fn success_marker_path(partition: &ObjectPath) -> ObjectPath {
    let path_str = partition.as_ref();
    ObjectPath::from(format!("{}/_SUCCESS", path_str.trim_end_matches('/')))
}

/// Keeps the data files directly inside a partition, skipping hidden
/// (`_`-prefixed) objects. Result is sorted by key.
pub fn filter_data_files(
    paths: impl IntoIterator<Item = ObjectPath>,
    partition: &ObjectPath,
) -> Vec<ObjectPath> {
    let partition_prefix = format!("{}/", partition.as_ref().trim_end_matches('/'));

    let mut files: Vec<ObjectPath> = paths
        .into_iter()
        .filter(|path| {
            let Some(filename) = path.as_ref().strip_prefix(&partition_prefix) else {
                return false;
            };
            filename.ends_with(DATA_FILE_SUFFIX)
                && !filename.starts_with('_')
                && !filename.contains('/')
        })
        .collect();
    files.sort();
    files
}
