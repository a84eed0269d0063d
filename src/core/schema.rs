use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Column type as declared by the export that produced a source file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    Boolean,
    SmallInt,
    Int,
    BigInt,
    Float,
    Double,
    Text,
    LongText,
    Date,
    Timestamp,
}

/// Column type as it exists in the warehouse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarehouseType {
    Boolean,
    SmallInt,
    Integer,
    BigInt,
    Real,
    DoublePrecision,
    Varchar(u32),
    Date,
    Timestamp,
    /// A type this loader never creates, kept verbatim from introspection.
    Other(String),
}

pub const TEXT_WIDTH: u32 = 256;
pub const LONG_TEXT_WIDTH: u32 = 65535;

impl From<SemanticType> for WarehouseType {
    fn from(semantic: SemanticType) -> Self {
        match semantic {
            SemanticType::Boolean => WarehouseType::Boolean,
            SemanticType::SmallInt => WarehouseType::SmallInt,
            SemanticType::Int => WarehouseType::Integer,
            SemanticType::BigInt => WarehouseType::BigInt,
            SemanticType::Float => WarehouseType::Real,
            SemanticType::Double => WarehouseType::DoublePrecision,
            SemanticType::Text => WarehouseType::Varchar(TEXT_WIDTH),
            SemanticType::LongText => WarehouseType::Varchar(LONG_TEXT_WIDTH),
            SemanticType::Date => WarehouseType::Date,
            SemanticType::Timestamp => WarehouseType::Timestamp,
        }
    }
}

impl fmt::Display for WarehouseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarehouseType::Boolean => write!(f, "BOOLEAN"),
            WarehouseType::SmallInt => write!(f, "SMALLINT"),
            WarehouseType::Integer => write!(f, "INTEGER"),
            WarehouseType::BigInt => write!(f, "BIGINT"),
            WarehouseType::Real => write!(f, "REAL"),
            WarehouseType::DoublePrecision => write!(f, "DOUBLE PRECISION"),
            WarehouseType::Varchar(width) => write!(f, "VARCHAR({})", width),
            WarehouseType::Date => write!(f, "DATE"),
            WarehouseType::Timestamp => write!(f, "TIMESTAMP"),
            WarehouseType::Other(name) => write!(f, "{}", name),
        }
    }
}

impl FromStr for WarehouseType {
    type Err = std::convert::Infallible;

    /// Parses the type names reported by warehouse introspection. Names that
    /// do not map to a known type become `Other`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        let parsed = match normalized.as_str() {
            "boolean" | "bool" => WarehouseType::Boolean,
            "smallint" | "int2" => WarehouseType::SmallInt,
            "integer" | "int" | "int4" => WarehouseType::Integer,
            "bigint" | "int8" => WarehouseType::BigInt,
            "real" | "float4" => WarehouseType::Real,
            "double precision" | "float8" | "float" => WarehouseType::DoublePrecision,
            "date" => WarehouseType::Date,
            "timestamp" | "timestamp without time zone" => WarehouseType::Timestamp,
            other => match parse_varchar_width(other) {
                Some(width) => WarehouseType::Varchar(width),
                None => WarehouseType::Other(s.trim().to_string()),
            },
        };
        Ok(parsed)
    }
}

fn parse_varchar_width(name: &str) -> Option<u32> {
    let args = name
        .strip_prefix("character varying")
        .or_else(|| name.strip_prefix("varchar"))?
        .trim();
    args.strip_prefix('(')?.strip_suffix(')')?.trim().parse().ok()
}

/// A column as declared alongside a source file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DeclaredColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub dtype: SemanticType,
    #[serde(default = "DeclaredColumn::default_nullable")]
    pub nullable: bool,
}

impl DeclaredColumn {
    pub fn default_nullable() -> bool {
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub dtype: WarehouseType,
    pub nullable: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, dtype: WarehouseType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            dtype,
            nullable,
        }
    }
}

/// Desired or observed shape of a destination table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDefinition {
    pub name: String,
    pub columns: Vec<Column>,
    pub dist_key: Option<String>,
    pub sort_key: Option<String>,
    /// Column holding the logical date of the loaded batch.
    pub freshness_column: String,
}

impl TableDefinition {
    /// Case-insensitive column lookup.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }
}

/// What introspection found at the destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObservedTable {
    Absent,
    Present(TableDefinition),
}

/// Most recent logical date already loaded into a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreshnessState {
    TableAbsent,
    /// The table exists but holds no freshness value: no rows, only nulls,
    /// or no freshness column yet.
    NoRows,
    LatestAt(DateTime<Utc>),
}

impl FreshnessState {
    pub fn latest(&self) -> Option<DateTime<Utc>> {
        match self {
            FreshnessState::LatestAt(date) => Some(*date),
            FreshnessState::TableAbsent | FreshnessState::NoRows => None,
        }
    }
}

/// A resolved source file, ready to be loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFileReference {
    pub schema: String,
    pub table: String,
    /// Location handed to the warehouse COPY, e.g. `s3://bucket/prefix/`.
    pub location: String,
    /// Store-relative keys of every data object covered by `location`.
    pub objects: Vec<String>,
    pub logical_date: DateTime<Utc>,
    pub columns: Vec<DeclaredColumn>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_semantic_types_map_to_distinct_warehouse_types() {
        let all = [
            SemanticType::Boolean,
            SemanticType::SmallInt,
            SemanticType::Int,
            SemanticType::BigInt,
            SemanticType::Float,
            SemanticType::Double,
            SemanticType::Text,
            SemanticType::LongText,
            SemanticType::Date,
            SemanticType::Timestamp,
        ];
        let mapped: Vec<WarehouseType> = all.iter().map(|t| WarehouseType::from(*t)).collect();
        for (i, a) in mapped.iter().enumerate() {
            for b in &mapped[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_display_parses_back() {
        for dtype in [
            WarehouseType::Boolean,
            WarehouseType::Integer,
            WarehouseType::DoublePrecision,
            WarehouseType::Varchar(256),
            WarehouseType::Timestamp,
        ] {
            let parsed: WarehouseType = dtype.to_string().parse().unwrap();
            assert_eq!(parsed, dtype);
        }
    }

    #[test]
    fn test_parse_introspected_names() {
        let parse = |s: &str| s.parse::<WarehouseType>().unwrap();
        assert_eq!(parse("character varying(65535)"), WarehouseType::Varchar(65535));
        assert_eq!(parse("timestamp without time zone"), WarehouseType::Timestamp);
        assert_eq!(parse("INT4"), WarehouseType::Integer);
        assert_eq!(
            parse("numeric(18,0)"),
            WarehouseType::Other("numeric(18,0)".to_string())
        );
    }

    #[test]
    fn test_declared_column_deserialize() {
        let col: DeclaredColumn =
            serde_json::from_str(r#"{"name": "id", "type": "bigint"}"#).unwrap();
        assert_eq!(col.dtype, SemanticType::BigInt);
        assert!(col.nullable);
    }

    #[test]
    fn test_column_lookup_ignores_case() {
        let def = TableDefinition {
            name: "users".into(),
            columns: vec![Column::new("UserId", WarehouseType::Integer, false)],
            dist_key: None,
            sort_key: None,
            freshness_column: "UserId".into(),
        };
        assert!(def.column("userid").is_some());
        assert!(def.column("other").is_none());
    }
}
