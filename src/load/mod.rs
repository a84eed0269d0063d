//! Load orchestration.
//!
//! A load runs in four steps: build the desired table definition from the
//! source file, check the destination's freshness, reconcile schemas, then
//! apply everything in a single [`LoadTransaction`].

mod builder;
mod freshness;
mod reconcile;
mod transaction;

pub use builder::{TableKeys, build_table_definition};
pub use freshness::should_proceed;
pub use reconcile::{Reconciliation, reconcile};
pub use transaction::{LoadDecision, LoadTransaction};

use log::{error, info};

use crate::conf::TableConfig;
use crate::core::{LoadError, SourceFileReference};
use crate::warehouse::{CopyOptions, WarehouseDriver};

/// Result of one load attempt.
#[derive(Debug, PartialEq)]
pub enum LoadOutcome {
    Committed,
    /// The destination already holds data at least as new as the source.
    SkippedAlreadyFresh,
    Failed(LoadError),
}

/// Everything `run_load` needs for one table.
#[derive(Debug, Clone)]
pub struct LoadRequest<'a> {
    /// Also names the destination: `file.schema.file.table`.
    pub file: &'a SourceFileReference,
    pub freshness_column: &'a str,
    pub keys: TableKeys<'a>,
    pub truncate: bool,
    pub force: bool,
}

impl<'a> LoadRequest<'a> {
    pub fn for_table(file: &'a SourceFileReference, config: &'a TableConfig, force: bool) -> Self {
        Self {
            file,
            freshness_column: &config.freshness_column,
            keys: TableKeys {
                dist_key: config.dist_key.as_deref(),
                sort_key: config.sort_key.as_deref(),
            },
            truncate: config.truncate,
            force,
        }
    }
}

/// Load `request.file` into its destination table.
///
/// Never retries; a failure is reported once as `LoadOutcome::Failed`.
pub async fn run_load<D>(driver: &mut D, request: &LoadRequest<'_>) -> LoadOutcome
where
    D: WarehouseDriver + ?Sized,
{
    let file = request.file;
    match try_load(driver, request).await {
        Ok(outcome) => outcome,
        Err(err) => {
            error!(
                "Load of {}.{} failed (retryable: {}): {}",
                file.schema,
                file.table,
                err.is_retryable(),
                err
            );
            LoadOutcome::Failed(err)
        }
    }
}

async fn try_load<D>(driver: &mut D, request: &LoadRequest<'_>) -> Result<LoadOutcome, LoadError>
where
    D: WarehouseDriver + ?Sized,
{
    let file = request.file;
    let definition = build_table_definition(file, request.freshness_column, &request.keys)?;

    let (observed, freshness) = driver
        .introspect_table(&file.schema, &definition.name, request.freshness_column)
        .await?;

    let proceed = should_proceed(file.logical_date, &freshness, request.force);
    if !proceed {
        info!(
            "{}.{} already holds data up to {:?}, source is dated {}; skipping",
            file.schema,
            definition.name,
            freshness.latest(),
            file.logical_date
        );
        return Ok(LoadOutcome::SkippedAlreadyFresh);
    }
    if request.force && freshness.latest().is_some_and(|latest| file.logical_date <= latest) {
        info!("Forcing load of {}.{}", file.schema, definition.name);
    }

    let reconciliation = reconcile(&definition, &observed)?;
    let decision = LoadDecision::new(proceed, reconciliation.creates_table(), request.truncate);

    LoadTransaction {
        definition: &definition,
        reconciliation: &reconciliation,
        decision,
        file,
        copy: CopyOptions::default(),
    }
    .execute(driver)
    .await?;

    info!(
        "Loaded {}.{} from {}",
        file.schema, definition.name, file.location
    );
    Ok(LoadOutcome::Committed)
}
