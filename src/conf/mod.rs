mod config;
mod source;
mod table;
mod warehouse;

pub use config::Config;
pub use source::{LocalSourceConfig, S3SourceConfig, SourceConfig};
pub use table::{TableConfig, TablesConfig};
pub use warehouse::{CopyCredentials, WarehouseConfig};
