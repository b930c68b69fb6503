// Warehouse connection secret
//
// The secret is a JSON document held in a secret store. It must resolve
// before any warehouse connection is attempted.

use crate::error::CheckError;
use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use std::fmt;

/// Connection details parsed from the secret's JSON payload
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct WarehouseSecret {
    pub host: String,
    #[serde(deserialize_with = "deserialize_port")]
    pub port: u16,
    pub username: String,
    pub password: String,
    #[serde(rename = "dbClusterIdentifier")]
    pub cluster_id: String,
    #[serde(default)]
    pub dbname: Option<String>,
}

impl fmt::Debug for WarehouseSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WarehouseSecret")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("cluster_id", &self.cluster_id)
            .field("dbname", &self.dbname)
            .finish()
    }
}

impl WarehouseSecret {
    /// Parse a secret string, naming the secret in any error
    pub fn parse(secret_id: &str, payload: &str) -> Result<Self, CheckError> {
        let secret: WarehouseSecret =
            serde_json::from_str(payload).map_err(|e| CheckError::MalformedSecret {
                secret_id: secret_id.to_string(),
                reason: e.to_string(),
            })?;

        if secret.cluster_id.trim().is_empty() {
            return Err(CheckError::MalformedSecret {
                secret_id: secret_id.to_string(),
                reason: "dbClusterIdentifier is empty".to_string(),
            });
        }

        Ok(secret)
    }

    /// Database from the secret, falling back to `default`
    pub fn database_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.dbname
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(default)
    }
}

fn deserialize_port<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u16),
        Text(String),
    }

    match Port::deserialize(deserializer)? {
        Port::Number(port) => Ok(port),
        Port::Text(text) => text
            .trim()
            .parse::<u16>()
            .map_err(|e| serde::de::Error::custom(format!("invalid port '{}': {}", text, e))),
    }
}

/// A secret after it has been fetched from the store
#[derive(Debug, Clone)]
pub struct ResolvedSecret {
    /// Full ARN of the secret, used to authenticate warehouse calls
    pub arn: String,
    pub secret: WarehouseSecret,
}

/// Source of warehouse connection secrets
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn resolve(&self, secret_id: &str) -> Result<ResolvedSecret, CheckError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &str = r#"{
        "host": "cluster.abc.us-east-1.redshift.amazonaws.com",
        "port": 5439,
        "username": "admin",
        "password": "hunter2",
        "dbClusterIdentifier": "analytics",
        "engine": "redshift"
    }"#;

    #[test]
    fn test_parse_secret() {
        let secret = WarehouseSecret::parse("de/redshift", PAYLOAD).unwrap();
        assert_eq!(secret.port, 5439);
        assert_eq!(secret.cluster_id, "analytics");
        assert_eq!(secret.database_or("dev"), "dev");
    }

    #[test]
    fn test_port_as_string() {
        let payload = PAYLOAD.replace("5439", "\"5440\"");
        let secret = WarehouseSecret::parse("de/redshift", &payload).unwrap();
        assert_eq!(secret.port, 5440);
    }

    #[test]
    fn test_dbname_overrides_default() {
        let payload = PAYLOAD.replace("\"engine\"", "\"dbname\": \"warehouse\", \"engine\"");
        let secret = WarehouseSecret::parse("de/redshift", &payload).unwrap();
        assert_eq!(secret.database_or("dev"), "warehouse");
    }

    #[test]
    fn test_missing_cluster_id_is_malformed() {
        let payload = r#"{"host":"h","port":5439,"username":"u","password":"p"}"#;
        let err = WarehouseSecret::parse("de/redshift", payload).unwrap_err();
        assert!(matches!(err, CheckError::MalformedSecret { .. }));
        assert!(err.to_string().contains("de/redshift"));
    }

    #[test]
    fn test_debug_redacts_password() {
        let secret = WarehouseSecret::parse("de/redshift", PAYLOAD).unwrap();
        let debug = format!("{:?}", secret);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }
}
