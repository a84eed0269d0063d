//! Warehouse drivers.
//!
//! The load core talks to the warehouse only through [`WarehouseDriver`] and
//! the [`WarehouseTransaction`] it hands out. Two drivers ship with the crate:
//! [`MemoryWarehouse`] keeps tables in process and reads source files from an
//! `ObjectStore`; [`RedshiftWarehouse`] speaks to Redshift over the Postgres
//! wire protocol.

mod memory;
mod redshift;
mod sql;

pub use memory::{FailPoint, MemoryWarehouse, Operation};
pub use redshift::RedshiftWarehouse;

use async_trait::async_trait;

use crate::core::{
    Column, FreshnessState, LoadError, ObservedTable, SourceFileReference, TableDefinition,
};

/// How the warehouse should read the source file during a bulk copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyOptions {
    pub gzip: bool,
    /// One JSON object per line, keys matched to columns by name.
    pub json: bool,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            gzip: true,
            json: true,
        }
    }
}

#[async_trait]
pub trait WarehouseDriver: Send + Sync {
    /// Current shape of `schema.table` and the newest value in its
    /// freshness column. A missing table is `ObservedTable::Absent`, not an
    /// error.
    async fn introspect_table(
        &self,
        schema: &str,
        table: &str,
        freshness_column: &str,
    ) -> Result<(ObservedTable, FreshnessState), LoadError>;

    /// Open a transaction. Holding it borrows the driver exclusively.
    async fn begin(&mut self) -> Result<Box<dyn WarehouseTransaction + '_>, LoadError>;
}

/// A single warehouse transaction.
///
/// Nothing done through it is visible to other readers until `commit`
/// succeeds. Dropping it without committing discards every step.
#[async_trait]
pub trait WarehouseTransaction: Send {
    /// Remove every row of an existing table.
    async fn truncate(&mut self, schema: &str, table: &str) -> Result<(), LoadError>;

    async fn create_table(
        &mut self,
        schema: &str,
        definition: &TableDefinition,
    ) -> Result<(), LoadError>;

    /// Append `columns` to an existing table, in order.
    async fn alter_table(
        &mut self,
        schema: &str,
        table: &str,
        columns: &[Column],
    ) -> Result<(), LoadError>;

    /// Copy the contents of `file` into `file.schema.file.table`.
    async fn bulk_copy(
        &mut self,
        file: &SourceFileReference,
        options: CopyOptions,
    ) -> Result<(), LoadError>;

    async fn commit(self: Box<Self>) -> Result<(), LoadError>;

    async fn rollback(self: Box<Self>) -> Result<(), LoadError>;
}
