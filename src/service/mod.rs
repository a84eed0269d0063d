use chrono::{DateTime, Utc};
use log::{error, info, warn};

use crate::conf::Config;
use crate::core::{CliArgs, LoadError};
use crate::discovery::FileLocator;
use crate::load::{LoadOutcome, LoadRequest, run_load};
use crate::warehouse::WarehouseDriver;

/// What to load in one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    pub schema: String,
    pub tables: Vec<String>,
    /// Truncate every table, on top of per-table config.
    pub truncate: bool,
    pub force: bool,
    pub date: Option<DateTime<Utc>>,
}

impl RunOptions {
    pub fn from_args(args: &CliArgs, config: &Config) -> Self {
        Self {
            schema: args.schema.clone().unwrap_or_else(|| config.schema.clone()),
            tables: args
                .tables
                .iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
            truncate: args.truncate,
            force: args.force,
            date: args.date,
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum TableReport {
    Loaded(LoadOutcome),
    /// No eligible source file; not a failure.
    NoSourceFile(String),
    /// The source could not be resolved.
    Unresolved(LoadError),
}

impl TableReport {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            TableReport::Loaded(LoadOutcome::Failed(_)) | TableReport::Unresolved(_)
        )
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct RunSummary {
    pub reports: Vec<(String, TableReport)>,
}

impl RunSummary {
    pub fn has_failures(&self) -> bool {
        self.failures() > 0
    }

    pub fn failures(&self) -> usize {
        self.reports.iter().filter(|(_, r)| r.is_failure()).count()
    }

    pub fn report(&self, table: &str) -> Option<&TableReport> {
        self.reports
            .iter()
            .find(|(name, _)| name == table)
            .map(|(_, report)| report)
    }
}

/// Loads tables one after another, each in its own transaction.
pub struct LoadService<L, D> {
    config: Config,
    locator: L,
    driver: D,
}

impl<L, D> LoadService<L, D>
where
    L: FileLocator,
    D: WarehouseDriver,
{
    pub fn new(config: Config, locator: L, driver: D) -> Self {
        Self {
            config,
            locator,
            driver,
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub async fn run(&mut self, options: &RunOptions) -> RunSummary {
        let mut summary = RunSummary::default();

        for table in &options.tables {
            info!(
                "Attempting to run on schema: {} table: {}",
                options.schema, table
            );
            let report = self.run_table(options, table).await;
            summary.reports.push((table.clone(), report));
        }

        info!(
            "Done with full run: {} tables, {} failed",
            summary.reports.len(),
            summary.failures()
        );
        summary
    }

    async fn run_table(&mut self, options: &RunOptions, table: &str) -> TableReport {
        let Some(table_config) = self.config.tables.get(table) else {
            let err = LoadError::ConfigParsingError(format!(
                "no [tables.{}] section configured",
                table
            ));
            error!("{}", err);
            return TableReport::Unresolved(err);
        };

        let file = match self
            .locator
            .resolve_latest(&options.schema, table, options.date)
            .await
        {
            Ok(file) => file,
            Err(LoadError::NotFoundError(msg)) => {
                warn!("Nothing to load for {}.{}: {}", options.schema, table, msg);
                return TableReport::NoSourceFile(msg);
            }
            Err(err) => {
                error!(
                    "Issue getting latest input data for {}.{}: {}",
                    options.schema, table, err
                );
                return TableReport::Unresolved(err);
            }
        };

        let mut request = LoadRequest::for_table(&file, table_config, options.force);
        request.truncate |= options.truncate;

        TableReport::Loaded(run_load(&mut self.driver, &request).await)
    }
}
