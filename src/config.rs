//! Per-challenge provider configuration, carried in the challenge request as an opaque JSON
//! blob.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{SolverError, SolverResult};

#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub zone_id: String,
    #[serde(default, rename = "appKey")]
    pub access_key: String,
    #[serde(default, rename = "appSecret")]
    pub secret_key: String,
    /// Sent as `X-Project-Id` when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// TTL for newly created record sets. The provider default applies when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("region", &self.region)
            .field("zone_id", &self.zone_id)
            .field("access_key", &"<redacted>")
            .field("secret_key", &"<redacted>")
            .field("project_id", &self.project_id)
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl ProviderConfig {
    /// Decode the blob attached to a challenge. A missing blob yields the all-empty config.
    pub fn load(raw: Option<&serde_json::Value>) -> SolverResult<ProviderConfig> {
        match raw {
            None | Some(serde_json::Value::Null) => Ok(ProviderConfig::default()),
            Some(raw) => ProviderConfig::deserialize(raw)
                .map_err(|e| SolverError::Config(format!("failed to parse solver config: {e}"))),
        }
    }
}

/// Read a config given on the command line, either inline JSON or `@path/to/file.json`.
pub async fn read_config_arg(arg: &str) -> SolverResult<serde_json::Value> {
    let json = match arg.strip_prefix('@') {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .map_err(|e| SolverError::Config(format!("failed to read {path}: {e}")))?,
        None => arg.to_string(),
    };

    serde_json::from_str(&json)
        .map_err(|e| SolverError::Config(format!("failed to parse solver config: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(json: &str) -> serde_json::Value {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn decodes_wire_names() {
        let config = ProviderConfig::load(Some(&raw(
            r#"{"region":"cn-north-4","zoneId":"z1","appKey":"ak","appSecret":"sk","ttl":120}"#,
        )))
        .unwrap();

        assert_eq!(config.region, "cn-north-4");
        assert_eq!(config.zone_id, "z1");
        assert_eq!(config.access_key, "ak");
        assert_eq!(config.secret_key, "sk");
        assert_eq!(config.project_id, None);
        assert_eq!(config.ttl, Some(120));
    }

    #[test]
    fn absent_blob_is_empty_config() {
        assert_eq!(ProviderConfig::load(None).unwrap(), ProviderConfig::default());
        assert_eq!(
            ProviderConfig::load(Some(&raw("null"))).unwrap(),
            ProviderConfig::default()
        );
        assert_eq!(
            ProviderConfig::load(Some(&raw("{}"))).unwrap(),
            ProviderConfig::default()
        );
    }

    #[test]
    fn malformed_blob_is_config_error() {
        let err = ProviderConfig::load(Some(&raw(r#"{"region": 5}"#))).unwrap_err();
        assert!(matches!(err, SolverError::Config(_)));
    }

    #[test]
    fn debug_hides_credentials() {
        let config = ProviderConfig {
            access_key: "my-access".to_string(),
            secret_key: "my-secret".to_string(),
            ..Default::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("my-access"));
        assert!(!debug.contains("my-secret"));
    }

    #[tokio::test]
    async fn inline_argument() {
        let raw = read_config_arg(r#"{"zoneId":"abc"}"#).await.unwrap();
        let config = ProviderConfig::load(Some(&raw)).unwrap();
        assert_eq!(config.zone_id, "abc");

        let err = read_config_arg("not json").await.unwrap_err();
        assert!(matches!(err, SolverError::Config(_)));

        let err = read_config_arg("@/nonexistent/dns01-huawei.json")
            .await
            .unwrap_err();
        assert!(matches!(err, SolverError::Config(_)));
    }
}
