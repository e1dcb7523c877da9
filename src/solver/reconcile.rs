//! Idempotent present/clean-up of a single challenge value in a TXT record set.
//!
//! Every operation first observes the record set for `(name, TXT)` and classifies it as
//! [Observed::Absent], [Observed::WithoutValue] or [Observed::WithValue]. The action is a pure
//! function of that classification, so re-running an operation after a partial failure or a
//! host-side retry converges on the same remote state.
//!
//! Concurrent merges into the same record set are not serialised here. Two presents that
//! observe the same pre-update values can each write back their own union, and the later write
//! wins. The provider's record-set API offers no conditional update to close that window.

use tracing::{debug, info};

use crate::{
    dns::{quote, unquote, RecordSet, RecordStore, RECORD_TYPE_TXT},
    error::{SolverError, SolverResult},
};

/// Where one challenge value lives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChallengeRecord {
    pub zone_id: String,
    pub name: String,
    /// Raw key, without quotes.
    pub key: String,
}

impl ChallengeRecord {
    fn value(&self) -> String {
        quote(&self.key)
    }
}

#[derive(Debug)]
enum Observed {
    Absent,
    WithoutValue(RecordSet),
    WithValue(RecordSet),
}

/// What a reconcile call ended up doing remotely.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Created,
    Merged,
    Shrunk,
    Deleted,
    Unchanged,
}

async fn observe(store: &dyn RecordStore, record: &ChallengeRecord) -> SolverResult<Observed> {
    let found = store
        .find_record(&record.zone_id, &record.name, RECORD_TYPE_TXT, None)
        .await?;

    let observed = match found {
        None => Observed::Absent,
        Some(set) if set.contains(&record.value()) => Observed::WithValue(set),
        Some(set) => Observed::WithoutValue(set),
    };
    let keys = match &observed {
        Observed::Absent => Vec::new(),
        Observed::WithoutValue(set) | Observed::WithValue(set) => {
            set.values.iter().map(|v| unquote(v)).collect::<Vec<_>>()
        }
    };
    debug!(name = %record.name, state = observed_label(&observed), ?keys, "Observed record set");
    Ok(observed)
}

fn observed_label(observed: &Observed) -> &'static str {
    match observed {
        Observed::Absent => "absent",
        Observed::WithoutValue(_) => "exists-without-value",
        Observed::WithValue(_) => "exists-with-value",
    }
}

fn record_id(set: &RecordSet) -> SolverResult<&str> {
    match set.id.as_deref() {
        Some(id) if !id.is_empty() && !set.zone_id.is_empty() => Ok(id),
        _ => Err(SolverError::Precondition(format!(
            "record set '{}' has no id or zone id",
            set.name
        ))),
    }
}

/// Make sure the challenge value is published.
pub async fn present(store: &dyn RecordStore, record: &ChallengeRecord) -> SolverResult<Outcome> {
    let value = record.value();

    match observe(store, record).await? {
        Observed::Absent => {
            store
                .create_record(&record.zone_id, &record.name, RECORD_TYPE_TXT, vec![value])
                .await?;
            info!(name = %record.name, "TXT record created");
            Ok(Outcome::Created)
        }
        Observed::WithoutValue(set) => {
            let id = record_id(&set)?;
            let mut values = set.values.clone();
            values.push(value);
            store
                .update_record(&set.zone_id, id, &set.name, RECORD_TYPE_TXT, values)
                .await?;
            info!(name = %record.name, "TXT record updated with new value");
            Ok(Outcome::Merged)
        }
        Observed::WithValue(_) => {
            info!(name = %record.name, "TXT record already present, skipping");
            Ok(Outcome::Unchanged)
        }
    }
}

/// Make sure the challenge value is gone, deleting the record set once nothing else is left.
pub async fn cleanup(store: &dyn RecordStore, record: &ChallengeRecord) -> SolverResult<Outcome> {
    let value = record.value();

    let set = match observe(store, record).await? {
        Observed::Absent => {
            info!(name = %record.name, "No TXT record to remove");
            return Ok(Outcome::Unchanged);
        }
        Observed::WithoutValue(_) => {
            info!(name = %record.name, "TXT record does not hold this value, skipping");
            return Ok(Outcome::Unchanged);
        }
        Observed::WithValue(set) => set,
    };

    let id = record_id(&set)?;
    let remaining = set
        .values
        .iter()
        .filter(|v| **v != value)
        .cloned()
        .collect::<Vec<_>>();

    if remaining.is_empty() {
        store.delete_record(&set.zone_id, id).await?;
        info!(name = %record.name, "TXT record deleted");
        Ok(Outcome::Deleted)
    } else {
        store
            .update_record(&set.zone_id, id, &set.name, RECORD_TYPE_TXT, remaining)
            .await?;
        info!(name = %record.name, "TXT record value removed");
        Ok(Outcome::Shrunk)
    }
}
