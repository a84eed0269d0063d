use std::collections::HashSet;

use crate::core::{Column, LoadError, SourceFileReference, TableDefinition, WarehouseType};

/// Distribution and sort keys requested for a destination table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableKeys<'a> {
    pub dist_key: Option<&'a str>,
    pub sort_key: Option<&'a str>,
}

/// Derive the desired destination table from a source file's declared columns.
///
/// Column order follows the declaration. Fails with `SchemaError` when the
/// declaration is empty, repeats a name (ignoring case), or lacks the
/// freshness column or a requested key column.
pub fn build_table_definition(
    file: &SourceFileReference,
    freshness_column: &str,
    keys: &TableKeys<'_>,
) -> Result<TableDefinition, LoadError> {
    if file.columns.is_empty() {
        return Err(LoadError::SchemaError(format!(
            "{}.{} declares no columns",
            file.schema, file.table
        )));
    }

    let mut seen = HashSet::with_capacity(file.columns.len());
    let mut columns = Vec::with_capacity(file.columns.len());
    for declared in &file.columns {
        if declared.name.trim().is_empty() {
            return Err(LoadError::SchemaError(format!(
                "{}.{} declares a column with an empty name",
                file.schema, file.table
            )));
        }
        if !seen.insert(declared.name.to_lowercase()) {
            return Err(LoadError::SchemaError(format!(
                "{}.{} declares column '{}' more than once",
                file.schema, file.table, declared.name
            )));
        }
        columns.push(Column::new(
            declared.name.clone(),
            WarehouseType::from(declared.dtype),
            declared.nullable,
        ));
    }

    let definition = TableDefinition {
        name: file.table.clone(),
        columns,
        dist_key: keys.dist_key.map(str::to_string),
        sort_key: keys.sort_key.map(str::to_string),
        freshness_column: freshness_column.to_string(),
    };

    let required = [
        ("freshness column", Some(freshness_column)),
        ("dist key", keys.dist_key),
        ("sort key", keys.sort_key),
    ];
    for (role, name) in required {
        if let Some(name) = name
            && definition.column(name).is_none()
        {
            return Err(LoadError::SchemaError(format!(
                "{} '{}' is not among the declared columns of {}.{}",
                role, name, file.schema, file.table
            )));
        }
    }

    Ok(definition)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DeclaredColumn, SemanticType};
    use chrono::{TimeZone, Utc};

    fn file(columns: &[(&str, SemanticType)]) -> SourceFileReference {
        SourceFileReference {
            schema: "mongo".into(),
            table: "users".into(),
            location: "s3://metrics/mongo/users/2024-01-01/".into(),
            objects: vec![],
            logical_date: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            columns: columns
                .iter()
                .map(|(name, dtype)| DeclaredColumn {
                    name: name.to_string(),
                    dtype: *dtype,
                    nullable: true,
                })
                .collect(),
        }
    }

    #[test]
    fn test_builds_columns_in_declared_order() {
        let source = file(&[
            ("id", SemanticType::Int),
            ("name", SemanticType::Text),
            ("loaded_at", SemanticType::Timestamp),
        ]);
        let keys = TableKeys {
            dist_key: Some("id"),
            sort_key: Some("loaded_at"),
        };

        let def = build_table_definition(&source, "loaded_at", &keys).unwrap();

        assert_eq!(def.name, "users");
        assert_eq!(
            def.columns,
            vec![
                Column::new("id", WarehouseType::Integer, true),
                Column::new("name", WarehouseType::Varchar(256), true),
                Column::new("loaded_at", WarehouseType::Timestamp, true),
            ]
        );
        assert_eq!(def.dist_key.as_deref(), Some("id"));
        assert_eq!(def.freshness_column, "loaded_at");
    }

    #[test]
    fn test_missing_freshness_column() {
        let source = file(&[("id", SemanticType::Int)]);
        let err = build_table_definition(&source, "loaded_at", &TableKeys::default()).unwrap_err();
        assert!(matches!(err, LoadError::SchemaError(msg) if msg.contains("loaded_at")));
    }

    #[test]
    fn test_freshness_column_matches_ignoring_case() {
        let source = file(&[("Loaded_At", SemanticType::Timestamp)]);
        assert!(build_table_definition(&source, "loaded_at", &TableKeys::default()).is_ok());
    }

    #[test]
    fn test_case_insensitive_duplicate() {
        let source = file(&[
            ("id", SemanticType::Int),
            ("ID", SemanticType::BigInt),
            ("loaded_at", SemanticType::Timestamp),
        ]);
        let err = build_table_definition(&source, "loaded_at", &TableKeys::default()).unwrap_err();
        assert!(matches!(err, LoadError::SchemaError(msg) if msg.contains("ID")));
    }

    #[test]
    fn test_empty_declaration() {
        let source = file(&[]);
        assert!(matches!(
            build_table_definition(&source, "loaded_at", &TableKeys::default()),
            Err(LoadError::SchemaError(_))
        ));
    }

    #[test]
    fn test_unknown_sort_key() {
        let source = file(&[("loaded_at", SemanticType::Timestamp)]);
        let keys = TableKeys {
            dist_key: None,
            sort_key: Some("created"),
        };
        assert!(matches!(
            build_table_definition(&source, "loaded_at", &keys),
            Err(LoadError::SchemaError(_))
        ));
    }
}
