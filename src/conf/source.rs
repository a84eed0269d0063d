use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct S3SourceConfig {
    pub bucket: String,
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "S3SourceConfig::default_region")]
    pub region: String,
}

impl S3SourceConfig {
    pub fn default_region() -> String {
        String::from("us-east-1")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LocalSourceConfig {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub enum SourceConfig {
    #[serde(rename = "s3")]
    S3(S3SourceConfig),
    #[serde(rename = "local")]
    Local(LocalSourceConfig),
}
