use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use flate2::read::MultiGzDecoder;
use log::debug;
use object_store::ObjectStore;
use object_store::path::Path as ObjectPath;
use serde_json::{Map, Value};

use crate::core::{
    Column, FreshnessState, LoadError, ObservedTable, SourceFileReference, TableDefinition,
    WarehouseType,
};

use super::{CopyOptions, WarehouseDriver, WarehouseTransaction};

type Row = Map<String, Value>;

/// Transaction step at which an injected failure fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    Begin,
    Truncate,
    CreateTable,
    AlterTable,
    BulkCopy,
    Commit,
}

/// Statements the warehouse has executed, committed or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Begin,
    Truncate(String),
    CreateTable(String),
    AlterTable(String, Vec<String>),
    BulkCopy(String),
    Commit,
    Rollback,
}

#[derive(Debug, Clone)]
struct MemoryTable {
    definition: TableDefinition,
    rows: Vec<Row>,
}

type Tables = HashMap<String, MemoryTable>;

fn table_key(schema: &str, table: &str) -> String {
    format!("{}.{}", schema.to_lowercase(), table.to_lowercase())
}

/// In-process warehouse.
///
/// Tables live in a map; a transaction works on a copy of that map which
/// replaces the committed state only on a successful commit. Bulk copies read
/// the referenced objects from `store`.
pub struct MemoryWarehouse {
    store: Arc<dyn ObjectStore>,
    tables: Tables,
    fail_on: Option<FailPoint>,
    operations: Vec<Operation>,
}

impl MemoryWarehouse {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            tables: HashMap::new(),
            fail_on: None,
            operations: Vec::new(),
        }
    }

    /// Make every later transaction fail at `point` until cleared.
    pub fn fail_on(&mut self, point: Option<FailPoint>) {
        self.fail_on = point;
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn clear_operations(&mut self) {
        self.operations.clear();
    }

    /// Committed rows of a table, `None` when the table does not exist.
    pub fn row_count(&self, schema: &str, table: &str) -> Option<usize> {
        self.tables
            .get(&table_key(schema, table))
            .map(|t| t.rows.len())
    }

    /// Committed rows of a table, in load order.
    pub fn rows(&self, schema: &str, table: &str) -> Vec<Map<String, Value>> {
        self.tables
            .get(&table_key(schema, table))
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    fn check(&self, point: FailPoint) -> Result<(), LoadError> {
        if self.fail_on == Some(point) {
            return Err(LoadError::DriverError(format!(
                "injected failure at {:?}",
                point
            )));
        }
        Ok(())
    }
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let s = value.as_str()?;
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|dt| dt.and_utc())
}

fn freshness_of(table: &MemoryTable, freshness_column: &str) -> FreshnessState {
    let Some(column) = table.definition.column(freshness_column) else {
        return FreshnessState::NoRows;
    };
    table
        .rows
        .iter()
        .filter_map(|row| row.get(&column.name).and_then(parse_timestamp))
        .max()
        .map(FreshnessState::LatestAt)
        .unwrap_or(FreshnessState::NoRows)
}

/// Whether `value` can be stored in a column of type `dtype`.
fn value_fits(dtype: &WarehouseType, value: &Value) -> bool {
    match dtype {
        WarehouseType::Boolean => value.is_boolean(),
        WarehouseType::SmallInt => value.as_i64().is_some_and(|v| i16::try_from(v).is_ok()),
        WarehouseType::Integer => value.as_i64().is_some_and(|v| i32::try_from(v).is_ok()),
        WarehouseType::BigInt => value.is_i64(),
        WarehouseType::Real | WarehouseType::DoublePrecision => value.is_number(),
        WarehouseType::Varchar(width) => value
            .as_str()
            .is_some_and(|s| s.len() <= *width as usize),
        WarehouseType::Date | WarehouseType::Timestamp => value.is_string(),
        WarehouseType::Other(_) => true,
    }
}

/// Map one JSON record onto the table's columns. Keys match columns
/// case-insensitively; unknown keys are ignored, missing ones become null.
fn project_record(definition: &TableDefinition, record: &Row) -> Result<Row, String> {
    let mut row = Map::new();
    for column in &definition.columns {
        let value = record
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(&column.name))
            .map(|(_, v)| v.clone())
            .unwrap_or(Value::Null);

        if value.is_null() {
            if !column.nullable {
                return Err(format!("null value in NOT NULL column '{}'", column.name));
            }
        } else if !value_fits(&column.dtype, &value) {
            return Err(format!(
                "value {} does not fit column '{}' of type {}",
                value, column.name, column.dtype
            ));
        }
        row.insert(column.name.clone(), value);
    }
    Ok(row)
}

async fn read_object(
    store: &Arc<dyn ObjectStore>,
    key: &str,
    gzip: bool,
) -> Result<String, LoadError> {
    let bytes = store
        .get(&ObjectPath::from(key))
        .await
        .map_err(|e| LoadError::DriverError(format!("reading {}: {}", key, e)))?
        .bytes()
        .await
        .map_err(|e| LoadError::DriverError(format!("reading {}: {}", key, e)))?;

    let mut text = String::new();
    let result = if gzip {
        MultiGzDecoder::new(&bytes[..]).read_to_string(&mut text)
    } else {
        (&bytes[..]).read_to_string(&mut text)
    };
    result.map_err(|e| LoadError::DriverError(format!("decoding {}: {}", key, e)))?;
    Ok(text)
}

#[async_trait]
impl WarehouseDriver for MemoryWarehouse {
    async fn introspect_table(
        &self,
        schema: &str,
        table: &str,
        freshness_column: &str,
    ) -> Result<(ObservedTable, FreshnessState), LoadError> {
        match self.tables.get(&table_key(schema, table)) {
            None => Ok((ObservedTable::Absent, FreshnessState::TableAbsent)),
            Some(existing) => Ok((
                ObservedTable::Present(existing.definition.clone()),
                freshness_of(existing, freshness_column),
            )),
        }
    }

    async fn begin(&mut self) -> Result<Box<dyn WarehouseTransaction + '_>, LoadError> {
        self.operations.push(Operation::Begin);
        self.check(FailPoint::Begin)?;
        let staged = self.tables.clone();
        Ok(Box::new(MemoryTransaction {
            warehouse: self,
            staged,
        }))
    }
}

struct MemoryTransaction<'a> {
    warehouse: &'a mut MemoryWarehouse,
    staged: Tables,
}

impl MemoryTransaction<'_> {
    fn record(&mut self, operation: Operation, point: FailPoint) -> Result<(), LoadError> {
        self.warehouse.operations.push(operation);
        self.warehouse.check(point)
    }

    fn staged_table(&mut self, schema: &str, table: &str) -> Result<&mut MemoryTable, LoadError> {
        self.staged
            .get_mut(&table_key(schema, table))
            .ok_or_else(|| {
                LoadError::DriverError(format!("relation {}.{} does not exist", schema, table))
            })
    }
}

#[async_trait]
impl<'a> WarehouseTransaction for MemoryTransaction<'a> {
    async fn truncate(&mut self, schema: &str, table: &str) -> Result<(), LoadError> {
        self.record(
            Operation::Truncate(table_key(schema, table)),
            FailPoint::Truncate,
        )?;
        self.staged_table(schema, table)?.rows.clear();
        Ok(())
    }

    async fn create_table(
        &mut self,
        schema: &str,
        definition: &TableDefinition,
    ) -> Result<(), LoadError> {
        let key = table_key(schema, &definition.name);
        self.record(Operation::CreateTable(key.clone()), FailPoint::CreateTable)?;
        if self.staged.contains_key(&key) {
            return Err(LoadError::DriverError(format!(
                "relation {} already exists",
                key
            )));
        }
        self.staged.insert(
            key,
            MemoryTable {
                definition: definition.clone(),
                rows: Vec::new(),
            },
        );
        Ok(())
    }

    async fn alter_table(
        &mut self,
        schema: &str,
        table: &str,
        columns: &[Column],
    ) -> Result<(), LoadError> {
        self.record(
            Operation::AlterTable(
                table_key(schema, table),
                columns.iter().map(|c| c.name.clone()).collect(),
            ),
            FailPoint::AlterTable,
        )?;
        let existing = self.staged_table(schema, table)?;
        for column in columns {
            if existing.definition.column(&column.name).is_some() {
                return Err(LoadError::DriverError(format!(
                    "column '{}' already exists",
                    column.name
                )));
            }
            // existing rows get NULL, so added columns are always nullable
            existing.definition.columns.push(Column {
                nullable: true,
                ..column.clone()
            });
            for row in existing.rows.iter_mut() {
                row.insert(column.name.clone(), Value::Null);
            }
        }
        Ok(())
    }

    async fn bulk_copy(
        &mut self,
        file: &SourceFileReference,
        options: CopyOptions,
    ) -> Result<(), LoadError> {
        self.record(
            Operation::BulkCopy(table_key(&file.schema, &file.table)),
            FailPoint::BulkCopy,
        )?;
        if !options.json {
            return Err(LoadError::DriverError(
                "only JSON-lines copies are supported".to_string(),
            ));
        }

        let store = self.warehouse.store.clone();
        let mut texts = Vec::with_capacity(file.objects.len());
        for key in &file.objects {
            texts.push(read_object(&store, key, options.gzip).await?);
        }

        let target = self.staged_table(&file.schema, &file.table)?;
        let mut loaded = Vec::new();
        for (key, text) in file.objects.iter().zip(&texts) {
            for (line_no, line) in text.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                let record: Row = serde_json::from_str(line).map_err(|e| {
                    LoadError::DriverError(format!("{} line {}: {}", key, line_no + 1, e))
                })?;
                let row = project_record(&target.definition, &record).map_err(|e| {
                    LoadError::DriverError(format!("{} line {}: {}", key, line_no + 1, e))
                })?;
                loaded.push(row);
            }
        }

        debug!(
            "Copied {} rows into {}.{}",
            loaded.len(),
            file.schema,
            file.table
        );
        target.rows.extend(loaded);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), LoadError> {
        let MemoryTransaction { warehouse, staged } = *self;
        warehouse.operations.push(Operation::Commit);
        if warehouse.fail_on == Some(FailPoint::Commit) {
            return Err(LoadError::CommitError(
                "injected failure at Commit".to_string(),
            ));
        }
        warehouse.tables = staged;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), LoadError> {
        let MemoryTransaction { warehouse, .. } = *self;
        warehouse.operations.push(Operation::Rollback);
        Ok(())
    }
}
