use crate::{
    conf::{SourceConfig, TablesConfig, WarehouseConfig},
    core::LoadError::{self, ConfigParsingError},
};
use config::{Config as CConfig, ConfigBuilder, Environment, builder::DefaultState};
use serde::{Deserialize, Serialize};

pub const ENV_PREFIX: &str = "LOADER";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Destination schema, also the first path segment under the source prefix.
    #[serde(default = "Config::default_schema")]
    pub schema: String,
    pub source: SourceConfig,
    pub warehouse: WarehouseConfig,
    #[serde(default)]
    pub tables: TablesConfig,
}

impl Config {
    fn default_schema() -> String {
        String::from("mongo")
    }

    pub fn from_str(toml_str: &str) -> Result<Config, LoadError> {
        let builder = CConfig::builder()
            .add_source(config::File::from_str(toml_str, config::FileFormat::Toml));
        Self::build(builder)
    }

    /// Reads the optional TOML file, then overlays `LOADER__SECTION__KEY`
    /// environment variables.
    pub fn load(path: Option<&str>) -> Result<Config, LoadError> {
        let mut builder = CConfig::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path));
        }
        let builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__"),
        );
        Self::build(builder)
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> Result<Config, LoadError> {
        let config = builder
            .build()
            .map_err(|e| ConfigParsingError(e.to_string()))?
            .try_deserialize::<Config>()
            .map_err(|e| ConfigParsingError(e.to_string()))?;
        return Ok(config);
    }
}
