pub mod huawei;
#[cfg(test)]
pub mod memory;

use async_trait::async_trait;

use crate::error::SolverResult;

pub const RECORD_TYPE_TXT: &str = "TXT";

/// A snapshot of one remote record set. Only valid for the duration of a single operation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecordSet {
    pub id: Option<String>,
    pub zone_id: String,
    pub name: String,
    pub record_type: String,
    /// Quoted TXT values. Order carries no meaning.
    pub values: Vec<String>,
}

impl RecordSet {
    pub fn contains(&self, value: &str) -> bool {
        self.values.iter().any(|v| v == value)
    }
}

/// The operations the reconciler needs from a provider's record-set API, scoped to one
/// authenticated account.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Look up a record set by name and type, optionally also requiring `value` among its
    /// values. `name` may be relative to the zone or fully qualified, and only a record set for
    /// exactly that name matches (see [same_record_name]). A missing record is `Ok(None)`.
    async fn find_record(
        &self,
        zone_id: &str,
        name: &str,
        record_type: &str,
        value: Option<&str>,
    ) -> SolverResult<Option<RecordSet>>;

    async fn create_record(
        &self,
        zone_id: &str,
        name: &str,
        record_type: &str,
        values: Vec<String>,
    ) -> SolverResult<RecordSet>;

    /// Replace the whole value set of an existing record set.
    async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        name: &str,
        record_type: &str,
        values: Vec<String>,
    ) -> SolverResult<()>;

    async fn delete_record(&self, zone_id: &str, record_id: &str) -> SolverResult<()>;
}

/// Wrap a TXT value in literal double quotes, the form the provider stores and returns.
pub fn quote(value: &str) -> String {
    format!("\"{value}\"")
}

/// Strip one pair of surrounding double quotes, if present.
pub fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

/// Name of the record set relative to its zone, e.g. `_acme-challenge` for
/// `_acme-challenge.example.com.` in `example.com`.
pub fn derive_record_name(fqdn: &str, zone: &str) -> String {
    let name = fqdn.strip_suffix('.').unwrap_or(fqdn);
    let zone = zone.strip_suffix('.').unwrap_or(zone);

    match name.find(&format!(".{zone}")) {
        Some(idx) => name[..idx].to_string(),
        None => name.to_string(),
    }
}

/// Whether the record set the provider calls `stored` (normally fully qualified, like
/// `_acme-challenge.example.com.`) in `zone` is the record set `name`, where `name` is either
/// relative to the zone or fully qualified. Deeper names sharing a prefix never match.
pub fn same_record_name(stored: &str, zone: &str, name: &str) -> bool {
    let stored = stored.trim_end_matches('.').to_ascii_lowercase();
    let zone = zone.trim_end_matches('.').to_ascii_lowercase();
    let name = name.trim_end_matches('.').to_ascii_lowercase();
    if stored == name {
        return true;
    }

    !zone.is_empty()
        && stored
            .strip_suffix(zone.as_str())
            .and_then(|rest| rest.strip_suffix('.'))
            .map(|relative| relative == name)
            .unwrap_or(false)
}
