use log::warn;

use crate::core::{Column, LoadError, ObservedTable, TableDefinition};

/// How the destination must change before data can be copied in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// The table does not exist and is created from the desired definition.
    Create,
    /// The table exists; `added` columns are appended in desired order.
    Update { added: Vec<Column> },
}

impl Reconciliation {
    pub fn creates_table(&self) -> bool {
        matches!(self, Reconciliation::Create)
    }
}

/// Compare the desired definition with what the warehouse holds.
///
/// Evolution is additive only: columns missing from `desired` are left alone,
/// columns missing from the warehouse are added, and a column present on both
/// sides with a different type is a `StructuralConflictError`.
pub fn reconcile(
    desired: &TableDefinition,
    observed: &ObservedTable,
) -> Result<Reconciliation, LoadError> {
    let existing = match observed {
        ObservedTable::Absent => return Ok(Reconciliation::Create),
        ObservedTable::Present(existing) => existing,
    };

    let mut added = Vec::new();
    for column in &desired.columns {
        match existing.column(&column.name) {
            None => added.push(column.clone()),
            Some(current) if current.dtype != column.dtype => {
                return Err(LoadError::StructuralConflictError {
                    column: column.name.clone(),
                    observed: current.dtype.to_string(),
                    desired: column.dtype.to_string(),
                });
            }
            Some(_) => {}
        }
    }

    warn_on_key_drift("dist key", &existing.dist_key, &desired.dist_key, &desired.name);
    warn_on_key_drift("sort key", &existing.sort_key, &desired.sort_key, &desired.name);

    Ok(Reconciliation::Update { added })
}

fn warn_on_key_drift(role: &str, current: &Option<String>, wanted: &Option<String>, table: &str) {
    if let (Some(current), Some(wanted)) = (current, wanted)
        && !current.eq_ignore_ascii_case(wanted)
    {
        warn!(
            "Table '{}' has {} '{}' but config asks for '{}'; keys are never changed",
            table, role, current, wanted
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::WarehouseType;

    fn table(columns: Vec<Column>) -> TableDefinition {
        TableDefinition {
            name: "users".into(),
            columns,
            dist_key: None,
            sort_key: None,
            freshness_column: "loaded_at".into(),
        }
    }

    fn id() -> Column {
        Column::new("id", WarehouseType::Integer, false)
    }

    fn loaded_at() -> Column {
        Column::new("loaded_at", WarehouseType::Timestamp, true)
    }

    fn region() -> Column {
        Column::new("region", WarehouseType::Varchar(256), true)
    }

    #[test]
    fn test_absent_table_is_created() {
        let desired = table(vec![id(), loaded_at()]);
        assert_eq!(
            reconcile(&desired, &ObservedTable::Absent).unwrap(),
            Reconciliation::Create
        );
    }

    #[test]
    fn test_same_columns_ignoring_case_yield_empty_diff() {
        let desired = table(vec![id(), loaded_at()]);
        let observed = table(vec![
            Column::new("LOADED_AT", WarehouseType::Timestamp, true),
            Column::new("Id", WarehouseType::Integer, false),
        ]);

        let result = reconcile(&desired, &ObservedTable::Present(observed)).unwrap();

        assert_eq!(result, Reconciliation::Update { added: vec![] });
    }

    #[test]
    fn test_new_columns_in_desired_order() {
        let age = Column::new("age", WarehouseType::SmallInt, true);
        let desired = table(vec![region(), id(), age.clone(), loaded_at()]);
        let observed = table(vec![id(), loaded_at()]);

        let result = reconcile(&desired, &ObservedTable::Present(observed)).unwrap();

        assert_eq!(
            result,
            Reconciliation::Update {
                added: vec![region(), age]
            }
        );
    }

    #[test]
    fn test_extra_observed_columns_are_kept() {
        let desired = table(vec![id()]);
        let observed = table(vec![id(), region(), loaded_at()]);

        let result = reconcile(&desired, &ObservedTable::Present(observed)).unwrap();

        assert_eq!(result, Reconciliation::Update { added: vec![] });
    }

    #[test]
    fn test_type_mismatch_is_conflict() {
        let desired = table(vec![region(), Column::new("id", WarehouseType::BigInt, false)]);
        let observed = table(vec![id()]);

        let err = reconcile(&desired, &ObservedTable::Present(observed)).unwrap_err();

        assert_eq!(
            err,
            LoadError::StructuralConflictError {
                column: "id".into(),
                observed: "INTEGER".into(),
                desired: "BIGINT".into(),
            }
        );
    }

    #[test]
    fn test_varchar_width_mismatch_is_conflict() {
        let desired = table(vec![Column::new("region", WarehouseType::Varchar(65535), true)]);
        let observed = table(vec![region()]);

        assert!(matches!(
            reconcile(&desired, &ObservedTable::Present(observed)),
            Err(LoadError::StructuralConflictError { column, .. }) if column == "region"
        ));
    }

    #[test]
    fn test_nullability_difference_is_not_conflict() {
        let desired = table(vec![Column::new("id", WarehouseType::Integer, true)]);
        let observed = table(vec![id()]);

        assert!(reconcile(&desired, &ObservedTable::Present(observed)).is_ok());
    }
}
