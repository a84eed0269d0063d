use log::{debug, info, warn};

use crate::core::{LoadError, SourceFileReference, TableDefinition};
use crate::warehouse::{CopyOptions, WarehouseDriver, WarehouseTransaction};

use super::reconcile::Reconciliation;

/// Per-attempt decision, computed once and consumed by [`LoadTransaction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadDecision {
    pub proceed: bool,
    pub create_table: bool,
    pub truncate: bool,
}

impl LoadDecision {
    /// A table about to be created has nothing to truncate, so `truncate` is
    /// dropped when `create_table` is set.
    pub fn new(proceed: bool, create_table: bool, truncate_requested: bool) -> Self {
        Self {
            proceed,
            create_table,
            truncate: truncate_requested && !create_table,
        }
    }
}

/// The atomic truncate, create-or-alter, copy, commit unit for one table.
pub struct LoadTransaction<'a> {
    pub definition: &'a TableDefinition,
    pub reconciliation: &'a Reconciliation,
    pub decision: LoadDecision,
    pub file: &'a SourceFileReference,
    pub copy: CopyOptions,
}

impl LoadTransaction<'_> {
    fn schema(&self) -> &str {
        &self.file.schema
    }

    /// Run every step inside one warehouse transaction. Any failure rolls the
    /// whole transaction back; success is reported only once the commit is
    /// acknowledged. A decision that does not proceed opens no transaction.
    pub async fn execute<D>(&self, driver: &mut D) -> Result<(), LoadError>
    where
        D: WarehouseDriver + ?Sized,
    {
        if !self.decision.proceed {
            debug!("Nothing to do for {}.{}", self.schema(), self.definition.name);
            return Ok(());
        }

        let mut tx = driver.begin().await?;

        if let Err(err) = self.apply(tx.as_mut()).await {
            warn!(
                "Rolling back load of {}.{}: {}",
                self.schema(), self.definition.name, err
            );
            if let Err(rollback_err) = tx.rollback().await {
                warn!(
                    "Rollback of {}.{} failed: {}",
                    self.schema(), self.definition.name, rollback_err
                );
            }
            return Err(err);
        }

        tx.commit().await.map_err(|err| match err {
            LoadError::CommitError(_) => err,
            other => LoadError::CommitError(other.to_string()),
        })?;
        info!("Committed load of {}.{}", self.schema(), self.definition.name);
        Ok(())
    }

    async fn apply(&self, tx: &mut (dyn WarehouseTransaction + '_)) -> Result<(), LoadError> {
        let table = &self.definition.name;

        if self.decision.truncate && !self.decision.create_table {
            warn!("Truncating {}.{}", self.schema(), table);
            tx.truncate(self.schema(), table).await?;
        }

        match self.reconciliation {
            Reconciliation::Create => {
                info!(
                    "Creating {}.{} with {} columns",
                    self.schema(),
                    table,
                    self.definition.columns.len()
                );
                tx.create_table(self.schema(), self.definition).await?;
            }
            Reconciliation::Update { added } if added.is_empty() => {}
            Reconciliation::Update { added } => {
                let names: Vec<&str> = added.iter().map(|c| c.name.as_str()).collect();
                info!("Adding columns {:?} to {}.{}", names, self.schema(), table);
                tx.alter_table(self.schema(), table, added).await?;
            }
        }

        info!("Copying {} into {}.{}", self.file.location, self.schema(), table);
        tx.bulk_copy(self.file, self.copy).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SemanticType;
    use crate::load::{TableKeys, build_table_definition};
    use crate::testutil::source_file;
    use crate::warehouse::MemoryWarehouse;
    use object_store::memory::InMemory;
    use std::sync::Arc;

    #[test]
    fn test_decision_never_truncates_new_table() {
        let decision = LoadDecision::new(true, true, true);
        assert!(decision.create_table);
        assert!(!decision.truncate);
    }

    #[test]
    fn test_decision_truncates_existing_table_on_request() {
        assert!(LoadDecision::new(true, false, true).truncate);
        assert!(!LoadDecision::new(true, false, false).truncate);
    }

    #[tokio::test]
    async fn test_declined_decision_opens_no_transaction() {
        let file = source_file(
            "events",
            "2024-01-01",
            "mongo/events/2024-01-01/part_0000.json.gz",
            &[("id", SemanticType::Int), ("loaded_at", SemanticType::Timestamp)],
        );
        let definition = build_table_definition(&file, "loaded_at", &TableKeys::default()).unwrap();
        let mut warehouse = MemoryWarehouse::new(Arc::new(InMemory::new()));

        LoadTransaction {
            definition: &definition,
            reconciliation: &Reconciliation::Create,
            decision: LoadDecision::new(false, true, false),
            file: &file,
            copy: CopyOptions::default(),
        }
        .execute(&mut warehouse)
        .await
        .unwrap();

        assert!(warehouse.operations().is_empty());
        assert_eq!(warehouse.row_count("mongo", "events"), None);
    }
}
