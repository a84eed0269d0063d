use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Credentials the warehouse uses to read the source bucket during COPY.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CopyCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl std::fmt::Debug for CopyCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CopyCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"****")
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct WarehouseConfig {
    #[serde(default = "WarehouseConfig::default_host")]
    pub host: String,
    #[serde(default = "WarehouseConfig::default_port")]
    pub port: u16,
    pub database: String,
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(
        with = "humantime_serde",
        default = "WarehouseConfig::default_connect_timeout"
    )]
    pub connect_timeout: Duration,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub copy_credentials: Option<CopyCredentials>,
}

impl WarehouseConfig {
    fn default_host() -> String {
        String::from("localhost")
    }

    fn default_port() -> u16 {
        5439
    }

    fn default_connect_timeout() -> Duration {
        Duration::from_secs(10)
    }
}

impl std::fmt::Debug for WarehouseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WarehouseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"****")
            .field("connect_timeout", &self.connect_timeout)
            .field("region", &self.region)
            .field("copy_credentials", &self.copy_credentials)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_masks_secrets() {
        let conf = WarehouseConfig {
            host: WarehouseConfig::default_host(),
            port: WarehouseConfig::default_port(),
            database: "dev".into(),
            user: "loader".into(),
            password: "hunter2".into(),
            connect_timeout: WarehouseConfig::default_connect_timeout(),
            region: None,
            copy_credentials: Some(CopyCredentials {
                access_key_id: "AKIA".into(),
                secret_access_key: "topsecret".into(),
            }),
        };
        let rendered = format!("{:?}", conf);
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("topsecret"));
        assert!(rendered.contains("AKIA"));
    }
}
