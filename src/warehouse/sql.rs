use crate::conf::CopyCredentials;
use crate::core::{Column, TableDefinition};

use super::CopyOptions;

pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

pub fn qualified(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(table))
}

pub fn create_table(schema: &str, definition: &TableDefinition) -> String {
    let columns: Vec<String> = definition
        .columns
        .iter()
        .map(|c| {
            let mut col = format!("{} {}", quote_ident(&c.name), c.dtype);
            if !c.nullable {
                col.push_str(" NOT NULL");
            }
            col
        })
        .collect();

    let mut sql = format!(
        "CREATE TABLE {} ({})",
        qualified(schema, &definition.name),
        columns.join(", ")
    );
    if let Some(dist_key) = &definition.dist_key {
        sql.push_str(&format!(" DISTSTYLE KEY DISTKEY({})", quote_ident(dist_key)));
    }
    if let Some(sort_key) = &definition.sort_key {
        sql.push_str(&format!(" SORTKEY({})", quote_ident(sort_key)));
    }
    sql
}

/// One statement per column; Redshift adds a single column per ALTER.
/// Added columns are nullable since existing rows have no value for them.
pub fn add_columns(schema: &str, table: &str, columns: &[Column]) -> Vec<String> {
    columns
        .iter()
        .map(|c| {
            format!(
                "ALTER TABLE {} ADD COLUMN {} {}",
                qualified(schema, table),
                quote_ident(&c.name),
                c.dtype
            )
        })
        .collect()
}

/// `DELETE` rather than `TRUNCATE`: Redshift commits implicitly on TRUNCATE.
pub fn delete_all(schema: &str, table: &str) -> String {
    format!("DELETE FROM {}", qualified(schema, table))
}

pub fn copy(
    schema: &str,
    table: &str,
    location: &str,
    region: Option<&str>,
    credentials: &CopyCredentials,
    options: CopyOptions,
) -> String {
    let mut sql = format!(
        "COPY {} FROM {}",
        qualified(schema, table),
        quote_literal(location)
    );
    if let Some(region) = region {
        sql.push_str(&format!(" REGION {}", quote_literal(region)));
    }
    sql.push_str(&format!(
        " CREDENTIALS {}",
        quote_literal(&format!(
            "aws_access_key_id={};aws_secret_access_key={}",
            credentials.access_key_id, credentials.secret_access_key
        ))
    ));
    if options.gzip {
        sql.push_str(" GZIP");
    }
    if options.json {
        sql.push_str(" JSON 'auto' TIMEFORMAT 'auto'");
    }
    sql
}

/// Redshift stores identifiers lower-cased, quoted or not, so catalog lookups
/// must use the folded name.
pub fn catalog_name(name: &str) -> String {
    name.to_lowercase()
}

pub const INTROSPECT_COLUMNS: &str = "SELECT column_name::text, data_type::text, \
     character_maximum_length::int4, is_nullable::text \
     FROM information_schema.columns \
     WHERE table_schema = $1 AND table_name = $2 \
     ORDER BY ordinal_position";

pub fn max_freshness(schema: &str, table: &str, column: &str) -> String {
    format!(
        "SELECT MAX({})::timestamp FROM {}",
        quote_ident(column),
        qualified(schema, table)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::WarehouseType;

    fn users() -> TableDefinition {
        TableDefinition {
            name: "users".into(),
            columns: vec![
                Column::new("id", WarehouseType::BigInt, false),
                Column::new("email", WarehouseType::Varchar(256), true),
            ],
            dist_key: Some("id".into()),
            sort_key: None,
            freshness_column: "id".into(),
        }
    }

    #[test]
    fn test_create_table() {
        assert_eq!(
            create_table("mongo", &users()),
            "CREATE TABLE \"mongo\".\"users\" (\"id\" BIGINT NOT NULL, \"email\" VARCHAR(256)) \
             DISTSTYLE KEY DISTKEY(\"id\")"
        );
    }

    #[test]
    fn test_add_columns_one_statement_each() {
        let stmts = add_columns(
            "mongo",
            "users",
            &[
                Column::new("region", WarehouseType::Varchar(256), false),
                Column::new("age", WarehouseType::Integer, true),
            ],
        );
        assert_eq!(
            stmts,
            vec![
                "ALTER TABLE \"mongo\".\"users\" ADD COLUMN \"region\" VARCHAR(256)",
                "ALTER TABLE \"mongo\".\"users\" ADD COLUMN \"age\" INTEGER",
            ]
        );
    }

    #[test]
    fn test_copy_statement() {
        let creds = CopyCredentials {
            access_key_id: "AKIA".into(),
            secret_access_key: "s3cr'et".into(),
        };
        let sql = copy(
            "mongo",
            "users",
            "s3://metrics/mongo/users/2024-01-01/",
            Some("us-west-2"),
            &creds,
            CopyOptions::default(),
        );
        assert_eq!(
            sql,
            "COPY \"mongo\".\"users\" FROM 's3://metrics/mongo/users/2024-01-01/' \
             REGION 'us-west-2' \
             CREDENTIALS 'aws_access_key_id=AKIA;aws_secret_access_key=s3cr''et' \
             GZIP JSON 'auto' TIMEFORMAT 'auto'"
        );
    }

    #[test]
    fn test_catalog_name_matches_folded_identifiers() {
        assert_eq!(catalog_name("UserEvents"), "userevents");
        assert_eq!(catalog_name("Mongo"), "mongo");
        assert_eq!(catalog_name("events"), "events");
    }

    #[test]
    fn test_quote_ident_escapes() {
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }
}
