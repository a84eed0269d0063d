use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::DeclaredColumn;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TableConfig {
    pub freshness_column: String,
    /// Dimension tables are reloaded in full, fact tables are appended to.
    #[serde(default)]
    pub truncate: bool,
    #[serde(default)]
    pub dist_key: Option<String>,
    #[serde(default)]
    pub sort_key: Option<String>,
    pub columns: Vec<DeclaredColumn>,
}

pub type TablesConfig = HashMap<String, TableConfig>;
