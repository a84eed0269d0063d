mod args;
mod error;
mod logger;
mod schema;

pub use args::CliArgs;
pub use error::LoadError;
pub use logger::setup_logging;
pub use schema::{
    Column, DeclaredColumn, FreshnessState, LONG_TEXT_WIDTH, ObservedTable, SemanticType,
    SourceFileReference, TEXT_WIDTH, TableDefinition, WarehouseType,
};
