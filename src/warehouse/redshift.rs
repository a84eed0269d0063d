use async_trait::async_trait;
use chrono::NaiveDateTime;
use log::{error, info};
use tokio_postgres::{Client, NoTls, Transaction};

use crate::conf::WarehouseConfig;
use crate::core::{
    Column, FreshnessState, LoadError, ObservedTable, SourceFileReference, TableDefinition,
    WarehouseType,
};

use super::sql;
use super::{CopyOptions, WarehouseDriver, WarehouseTransaction};

/// Redshift over the Postgres wire protocol.
///
/// Introspection reads `information_schema`, so distribution and sort keys of
/// existing tables are not reported.
pub struct RedshiftWarehouse {
    client: Client,
    config: WarehouseConfig,
}

impl RedshiftWarehouse {
    pub async fn connect(config: &WarehouseConfig) -> Result<Self, LoadError> {
        let mut pg = tokio_postgres::Config::new();
        pg.host(&config.host)
            .port(config.port)
            .dbname(&config.database)
            .user(&config.user)
            .password(&config.password)
            .connect_timeout(config.connect_timeout);

        let (client, connection) = pg.connect(NoTls).await.map_err(|e| {
            LoadError::DriverError(format!(
                "connecting to {}:{}/{}: {}",
                config.host, config.port, config.database, e
            ))
        })?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("Warehouse connection error: {}", e);
            }
        });

        info!(
            "Connected to warehouse {}:{}/{}",
            config.host, config.port, config.database
        );

        Ok(Self {
            client,
            config: config.clone(),
        })
    }
}

fn observed_column(
    name: String,
    data_type: String,
    char_len: Option<i32>,
    is_nullable: String,
) -> Column {
    let dtype = match (data_type.as_str(), char_len) {
        ("character varying", Some(len)) if len > 0 => WarehouseType::Varchar(len as u32),
        _ => data_type
            .parse::<WarehouseType>()
            .unwrap_or_else(|never| match never {}),
    };
    Column::new(name, dtype, is_nullable.eq_ignore_ascii_case("yes"))
}

#[async_trait]
impl WarehouseDriver for RedshiftWarehouse {
    async fn introspect_table(
        &self,
        schema: &str,
        table: &str,
        freshness_column: &str,
    ) -> Result<(ObservedTable, FreshnessState), LoadError> {
        let catalog_schema = sql::catalog_name(schema);
        let catalog_table = sql::catalog_name(table);
        let rows = self
            .client
            .query(sql::INTROSPECT_COLUMNS, &[&catalog_schema, &catalog_table])
            .await?;

        if rows.is_empty() {
            return Ok((ObservedTable::Absent, FreshnessState::TableAbsent));
        }

        let mut columns = Vec::with_capacity(rows.len());
        for row in &rows {
            columns.push(observed_column(
                row.try_get(0)?,
                row.try_get(1)?,
                row.try_get(2)?,
                row.try_get(3)?,
            ));
        }

        let definition = TableDefinition {
            name: table.to_string(),
            columns,
            dist_key: None,
            sort_key: None,
            freshness_column: freshness_column.to_string(),
        };

        let freshness = match definition.column(freshness_column) {
            None => FreshnessState::NoRows,
            Some(column) => {
                let row = self
                    .client
                    .query_one(&sql::max_freshness(schema, table, &column.name), &[])
                    .await?;
                match row.try_get::<_, Option<NaiveDateTime>>(0)? {
                    Some(latest) => FreshnessState::LatestAt(latest.and_utc()),
                    None => FreshnessState::NoRows,
                }
            }
        };

        Ok((ObservedTable::Present(definition), freshness))
    }

    async fn begin(&mut self) -> Result<Box<dyn WarehouseTransaction + '_>, LoadError> {
        let Self { client, config } = self;
        let tx = client.transaction().await?;
        Ok(Box::new(RedshiftTransaction { tx, config }))
    }
}

/// Rolls back on drop, courtesy of `tokio_postgres::Transaction`.
struct RedshiftTransaction<'a> {
    tx: Transaction<'a>,
    config: &'a WarehouseConfig,
}

impl RedshiftTransaction<'_> {
    async fn execute(&self, statement: &str) -> Result<(), LoadError> {
        self.tx
            .batch_execute(statement)
            .await
            .map_err(|e| LoadError::DriverError(format!("{}: {}", statement_kind(statement), e)))
    }
}

/// First words of a statement, so credentials in COPY never reach the logs.
fn statement_kind(statement: &str) -> String {
    statement
        .split_whitespace()
        .take(3)
        .collect::<Vec<_>>()
        .join(" ")
}

#[async_trait]
impl<'a> WarehouseTransaction for RedshiftTransaction<'a> {
    async fn truncate(&mut self, schema: &str, table: &str) -> Result<(), LoadError> {
        self.execute(&sql::delete_all(schema, table)).await
    }

    async fn create_table(
        &mut self,
        schema: &str,
        definition: &TableDefinition,
    ) -> Result<(), LoadError> {
        self.execute(&sql::create_table(schema, definition)).await
    }

    async fn alter_table(
        &mut self,
        schema: &str,
        table: &str,
        columns: &[Column],
    ) -> Result<(), LoadError> {
        for statement in sql::add_columns(schema, table, columns) {
            self.execute(&statement).await?;
        }
        Ok(())
    }

    async fn bulk_copy(
        &mut self,
        file: &SourceFileReference,
        options: CopyOptions,
    ) -> Result<(), LoadError> {
        if !file.location.starts_with("s3://") {
            return Err(LoadError::DriverError(format!(
                "Redshift can only COPY from s3://, got '{}'",
                file.location
            )));
        }
        let credentials = self.config.copy_credentials.as_ref().ok_or_else(|| {
            LoadError::DriverError("warehouse.copy_credentials is not configured".to_string())
        })?;
        let statement = sql::copy(
            &file.schema,
            &file.table,
            &file.location,
            self.config.region.as_deref(),
            credentials,
            options,
        );
        self.execute(&statement).await
    }

    async fn commit(self: Box<Self>) -> Result<(), LoadError> {
        self.tx
            .commit()
            .await
            .map_err(|e| LoadError::CommitError(e.to_string()))
    }

    async fn rollback(self: Box<Self>) -> Result<(), LoadError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
