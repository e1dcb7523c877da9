pub mod sign;

use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, Response, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use time::OffsetDateTime;
use tracing::{debug, trace};

use self::sign::{Credentials, RequestParts, DATE_HEADER};
use super::{same_record_name, RecordSet, RecordStore};
use crate::{
    config::ProviderConfig,
    error::{SolverError, SolverResult},
};

const USER_AGENT: &str = concat!("dns01-huawei/", env!("CARGO_PKG_VERSION"));

/// Regions where Huawei Cloud DNS has an API endpoint.
#[derive(Clone, Copy, Debug, Display, EnumIter, EnumString, PartialEq, Eq)]
pub enum Region {
    #[strum(serialize = "af-south-1")]
    AfSouth1,
    #[strum(serialize = "cn-north-1")]
    CnNorth1,
    #[strum(serialize = "cn-north-4")]
    CnNorth4,
    #[strum(serialize = "cn-north-9")]
    CnNorth9,
    #[strum(serialize = "cn-east-2")]
    CnEast2,
    #[strum(serialize = "cn-east-3")]
    CnEast3,
    #[strum(serialize = "cn-south-1")]
    CnSouth1,
    #[strum(serialize = "cn-southwest-2")]
    CnSouthwest2,
    #[strum(serialize = "ap-southeast-1")]
    ApSoutheast1,
    #[strum(serialize = "ap-southeast-2")]
    ApSoutheast2,
    #[strum(serialize = "ap-southeast-3")]
    ApSoutheast3,
    #[strum(serialize = "ap-southeast-4")]
    ApSoutheast4,
    #[strum(serialize = "la-north-2")]
    LaNorth2,
    #[strum(serialize = "la-south-2")]
    LaSouth2,
    #[strum(serialize = "na-mexico-1")]
    NaMexico1,
    #[strum(serialize = "sa-brazil-1")]
    SaBrazil1,
    #[strum(serialize = "tr-west-1")]
    TrWest1,
    #[strum(serialize = "me-east-1")]
    MeEast1,
}

impl Region {
    pub fn endpoint(&self) -> String {
        format!("https://dns.{self}.myhuaweicloud.com")
    }
}

/// An authenticated handle on the Huawei Cloud DNS v2 record-set API.
#[derive(Debug)]
pub struct HuaweiDns {
    client: Client,
    endpoint: Url,
    credentials: Credentials,
    project_id: Option<String>,
    ttl: Option<u32>,
}

impl HuaweiDns {
    pub fn new(
        config: &ProviderConfig,
        endpoint: Option<&str>,
        timeout: Duration,
    ) -> SolverResult<HuaweiDns> {
        if config.access_key.is_empty() || config.secret_key.is_empty() {
            return Err(SolverError::Config(
                "appKey and appSecret must both be set".to_string(),
            ));
        }

        let region = Region::from_str(&config.region).map_err(|_| {
            SolverError::Config(format!("Invalid region name '{}'", config.region))
        })?;

        let endpoint = endpoint
            .map(|e| e.to_string())
            .unwrap_or_else(|| region.endpoint());
        let endpoint = Url::parse(&endpoint)
            .map_err(|e| SolverError::Config(format!("Invalid endpoint {endpoint}: {e}")))?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| SolverError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(HuaweiDns {
            client,
            endpoint,
            credentials: Credentials {
                access_key: config.access_key.clone(),
                secret_key: config.secret_key.clone(),
            },
            project_id: config.project_id.clone().filter(|p| !p.is_empty()),
            ttl: config.ttl,
        })
    }

    fn host(&self) -> String {
        let host = self.endpoint.host_str().unwrap_or_default();
        match self.endpoint.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        }
    }

    /// Sign and send a request, turning any non-success status into a provider error.
    async fn execute(
        &self,
        method: Method,
        path: &str,
        query: Vec<(String, String)>,
        body: Option<Vec<u8>>,
    ) -> SolverResult<Response> {
        let body = body.unwrap_or_default();
        let date = sign::format_date(OffsetDateTime::now_utc())?;

        let mut headers = BTreeMap::new();
        headers.insert("Host".to_string(), self.host());
        headers.insert(DATE_HEADER.to_string(), date.clone());
        if !body.is_empty() {
            headers.insert("Content-Type".to_string(), "application/json".to_string());
        }
        if let Some(project_id) = &self.project_id {
            headers.insert("X-Project-Id".to_string(), project_id.clone());
        }

        let authorization = sign::authorization(
            &self.credentials,
            &RequestParts {
                method: method.as_str(),
                path,
                query: &query,
                headers: &headers,
                body: &body,
            },
            &date,
        )?;

        let base = self.endpoint.as_str().trim_end_matches('/');
        let mut url = format!("{base}{path}");
        if !query.is_empty() {
            url.push('?');
            url.push_str(&sign::canonical_query(&query));
        }

        trace!(%method, %url, "Sending DNS API request");

        let mut request = self
            .client
            .request(method, &url)
            .header("Authorization", authorization);
        for (name, value) in headers.iter().filter(|(name, _)| name.as_str() != "Host") {
            request = request.header(name.as_str(), value.as_str());
        }
        if !body.is_empty() {
            request = request.body(body);
        }

        let response = request.send().await?;
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();
        Err(provider_error(status, &text))
    }

    async fn execute_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: Vec<(String, String)>,
        body: Option<Vec<u8>>,
    ) -> SolverResult<T> {
        let response = self.execute(method, path, query, body).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| SolverError::Transport(format!("Failed to parse response: {e}")))
    }
}

fn provider_error(status: u16, body: &str) -> SolverError {
    match serde_json::from_str::<ApiError>(body) {
        Ok(err) => SolverError::Provider {
            status,
            code: err.code.unwrap_or_default(),
            message: err.message.unwrap_or_default(),
        },
        Err(_) => SolverError::Provider {
            status,
            code: String::new(),
            message: body.to_string(),
        },
    }
}

fn encode_body<T: Serialize>(body: &T) -> SolverResult<Vec<u8>> {
    serde_json::to_vec(body)
        .map_err(|e| SolverError::Precondition(format!("Failed to encode request: {e}")))
}

#[async_trait]
impl RecordStore for HuaweiDns {
    async fn find_record(
        &self,
        zone_id: &str,
        name: &str,
        record_type: &str,
        value: Option<&str>,
    ) -> SolverResult<Option<RecordSet>> {
        // Stored names are fully qualified, so the default fuzzy search is used and exact
        // matching happens below.
        let mut query = vec![
            ("name".to_string(), name.to_string()),
            ("type".to_string(), record_type.to_string()),
        ];
        if let Some(value) = value {
            query.push(("records".to_string(), value.to_string()));
        }

        let response: ListRecordSetsResponse = self
            .execute_json(
                Method::GET,
                &format!("/v2/zones/{zone_id}/recordsets"),
                query,
                None,
            )
            .await?;

        debug!(
            zone_id,
            name,
            count = response.recordsets.len(),
            "Listed record sets"
        );

        let found = response
            .recordsets
            .into_iter()
            .filter(|r| r.record_type.eq_ignore_ascii_case(record_type))
            .filter(|r| {
                same_record_name(&r.name, r.zone_name.as_deref().unwrap_or_default(), name)
            })
            .find(|r| value.map(|v| r.records.iter().any(|x| x == v)).unwrap_or(true))
            .map(|r| r.into_record_set(zone_id));

        Ok(found)
    }

    async fn create_record(
        &self,
        zone_id: &str,
        name: &str,
        record_type: &str,
        values: Vec<String>,
    ) -> SolverResult<RecordSet> {
        let body = encode_body(&RecordSetBody {
            name,
            record_type,
            records: &values,
            ttl: self.ttl,
        })?;

        let created: ApiRecordSet = self
            .execute_json(
                Method::POST,
                &format!("/v2/zones/{zone_id}/recordsets"),
                Vec::new(),
                Some(body),
            )
            .await?;

        debug!(zone_id, name, record_id = ?created.id, "Created record set");
        Ok(created.into_record_set(zone_id))
    }

    async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        name: &str,
        record_type: &str,
        values: Vec<String>,
    ) -> SolverResult<()> {
        let body = encode_body(&RecordSetBody {
            name,
            record_type,
            records: &values,
            ttl: None,
        })?;

        self.execute(
            Method::PUT,
            &format!("/v2/zones/{zone_id}/recordsets/{record_id}"),
            Vec::new(),
            Some(body),
        )
        .await?;

        debug!(zone_id, record_id, count = values.len(), "Updated record set");
        Ok(())
    }

    async fn delete_record(&self, zone_id: &str, record_id: &str) -> SolverResult<()> {
        self.execute(
            Method::DELETE,
            &format!("/v2/zones/{zone_id}/recordsets/{record_id}"),
            Vec::new(),
            None,
        )
        .await?;

        debug!(zone_id, record_id, "Deleted record set");
        Ok(())
    }
}

// Huawei Cloud DNS API types

#[derive(Debug, Serialize)]
struct RecordSetBody<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    record_type: &'a str,
    records: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    ttl: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ListRecordSetsResponse {
    #[serde(default)]
    recordsets: Vec<ApiRecordSet>,
}

#[derive(Debug, Deserialize)]
struct ApiRecordSet {
    id: Option<String>,
    zone_id: Option<String>,
    zone_name: Option<String>,
    #[serde(default)]
    name: String,
    #[serde(rename = "type", default)]
    record_type: String,
    #[serde(default)]
    records: Vec<String>,
}

impl ApiRecordSet {
    fn into_record_set(self, zone_id: &str) -> RecordSet {
        RecordSet {
            id: self.id,
            zone_id: self.zone_id.unwrap_or_else(|| zone_id.to_string()),
            name: self.name,
            record_type: self.record_type,
            values: self.records,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(alias = "error_code")]
    code: Option<String>,
    #[serde(alias = "error_msg")]
    message: Option<String>,
}
