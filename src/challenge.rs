use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(Clone, Copy, Debug, Display, EnumString, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChallengeAction {
    Present,
    CleanUp,
}

/// A DNS-01 challenge as handed over by the certificate controller.
#[derive(Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeRequest {
    #[serde(default)]
    pub uid: String,
    #[serde(default = "default_action")]
    pub action: ChallengeAction,
    #[serde(rename = "type", default)]
    pub challenge_type: String,
    #[serde(default)]
    pub dns_name: String,
    /// The value that must be published in the TXT record.
    pub key: String,
    #[serde(default)]
    pub resource_namespace: String,
    #[serde(rename = "resolvedFQDN")]
    pub resolved_fqdn: String,
    pub resolved_zone: String,
    #[serde(default)]
    pub allow_ambient_credentials: bool,
    /// Provider settings, decoded by [crate::config::ProviderConfig::load].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_json::Value>,
}

impl fmt::Debug for ChallengeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // config carries credentials
        f.debug_struct("ChallengeRequest")
            .field("uid", &self.uid)
            .field("action", &self.action)
            .field("dns_name", &self.dns_name)
            .field("resolved_fqdn", &self.resolved_fqdn)
            .field("resolved_zone", &self.resolved_zone)
            .field("config", &self.config.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

fn default_action() -> ChallengeAction {
    ChallengeAction::Present
}

impl ChallengeRequest {
    pub fn new(
        action: ChallengeAction,
        resolved_fqdn: impl Into<String>,
        resolved_zone: impl Into<String>,
        key: impl Into<String>,
        config: Option<serde_json::Value>,
    ) -> Self {
        let resolved_fqdn = resolved_fqdn.into();
        ChallengeRequest {
            uid: String::new(),
            action,
            challenge_type: "dns-01".to_string(),
            dns_name: resolved_fqdn
                .trim_start_matches("_acme-challenge.")
                .trim_end_matches('.')
                .to_string(),
            key: key.into(),
            resource_namespace: String::new(),
            resolved_fqdn,
            resolved_zone: resolved_zone.into(),
            allow_ambient_credentials: false,
            config,
        }
    }
}

/// Input to the `handle` command: either a single request or a list of them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ChallengeBatch {
    Many(Vec<ChallengeRequest>),
    One(Box<ChallengeRequest>),
}

impl ChallengeBatch {
    pub fn into_requests(self) -> Vec<ChallengeRequest> {
        match self {
            ChallengeBatch::Many(requests) => requests,
            ChallengeBatch::One(request) => vec![*request],
        }
    }
}
