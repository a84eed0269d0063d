use chrono::{DateTime, Utc};
use clap::Parser;
use log::kv::{ToValue, Value};

#[derive(Parser, Debug, PartialEq)]
#[command(version, about)]
pub struct CliArgs {
    #[arg(short, long)]
    pub config: Option<String>,
    /// Destination schema, overrides the config value.
    #[arg(short, long)]
    pub schema: Option<String>,
    /// Tables to load, in order.
    #[arg(short, long, value_delimiter = ',', required = true)]
    pub tables: Vec<String>,
    /// Truncate every listed table before copying.
    #[arg(long)]
    pub truncate: bool,
    /// Load even when the table already holds data at least as new.
    #[arg(long)]
    pub force: bool,
    /// Pin the source partition instead of taking the latest (RFC3339).
    #[arg(long)]
    pub date: Option<DateTime<Utc>>,
}

impl ToValue for CliArgs {
    fn to_value(&self) -> Value<'_> {
        Value::from_debug(self)
    }
}
