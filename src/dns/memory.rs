//! In-process record store used by tests to observe exactly which remote calls were made.
//!
//! Names are stored the way the provider stores them: fully qualified in the store's zone, with
//! a trailing dot. Lookups go through [same_record_name], like the Huawei adapter.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{same_record_name, RecordSet, RecordStore};
use crate::error::{SolverError, SolverResult};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    Create { name: String, values: Vec<String> },
    Update { record_id: String, values: Vec<String> },
    Delete { record_id: String },
}

pub const ZONE_NAME: &str = "example.com.";

#[derive(Debug)]
pub struct MemoryStore {
    zone_name: String,
    records: Mutex<Vec<RecordSet>>,
    calls: Mutex<Vec<Call>>,
    next_id: AtomicU64,
    /// Fail every call with a provider error.
    pub fail_all: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            zone_name: ZONE_NAME.to_string(),
            records: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
            fail_all: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::new()
        }
    }

    fn qualify(&self, name: &str) -> String {
        if name.ends_with('.') {
            name.to_string()
        } else {
            format!("{name}.{}", self.zone_name)
        }
    }

    /// Seed a record set, returning its id.
    pub fn insert(&self, zone_id: &str, name: &str, values: &[&str]) -> String {
        let id = self.allocate_id();
        self.records.lock().push(RecordSet {
            id: Some(id.clone()),
            zone_id: zone_id.to_string(),
            name: self.qualify(name),
            record_type: super::RECORD_TYPE_TXT.to_string(),
            values: values.iter().map(|v| v.to_string()).collect(),
        });
        id
    }

    pub fn get(&self, zone_id: &str, name: &str) -> Option<RecordSet> {
        self.records
            .lock()
            .iter()
            .find(|r| r.zone_id == zone_id && same_record_name(&r.name, &self.zone_name, name))
            .cloned()
    }

    pub fn record_count(&self) -> usize {
        self.records.lock().len()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    fn allocate_id(&self) -> String {
        format!("rs-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn check_failure(&self) -> SolverResult<()> {
        if self.fail_all {
            return Err(SolverError::Provider {
                status: 500,
                code: "DNS.0001".to_string(),
                message: "Mock failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn find_record(
        &self,
        zone_id: &str,
        name: &str,
        record_type: &str,
        value: Option<&str>,
    ) -> SolverResult<Option<RecordSet>> {
        self.check_failure()?;
        let found = self
            .records
            .lock()
            .iter()
            .find(|r| {
                r.zone_id == zone_id
                    && same_record_name(&r.name, &self.zone_name, name)
                    && r.record_type == record_type
                    && value.map(|v| r.contains(v)).unwrap_or(true)
            })
            .cloned();
        Ok(found)
    }

    async fn create_record(
        &self,
        zone_id: &str,
        name: &str,
        record_type: &str,
        values: Vec<String>,
    ) -> SolverResult<RecordSet> {
        self.check_failure()?;
        let mut records = self.records.lock();
        let name_taken = records.iter().any(|r| {
            r.zone_id == zone_id
                && r.record_type == record_type
                && same_record_name(&r.name, &self.zone_name, name)
        });
        if name_taken {
            return Err(SolverError::Provider {
                status: 400,
                code: "DNS.0312".to_string(),
                message: format!("record set {name} already exists"),
            });
        }

        let record = RecordSet {
            id: Some(self.allocate_id()),
            zone_id: zone_id.to_string(),
            name: self.qualify(name),
            record_type: record_type.to_string(),
            values: values.clone(),
        };
        records.push(record.clone());
        drop(records);
        self.calls.lock().push(Call::Create {
            name: name.to_string(),
            values,
        });
        Ok(record)
    }

    async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        _name: &str,
        _record_type: &str,
        values: Vec<String>,
    ) -> SolverResult<()> {
        self.check_failure()?;
        {
            let mut records = self.records.lock();
            let record = records
                .iter_mut()
                .find(|r| r.zone_id == zone_id && r.id.as_deref() == Some(record_id))
                .ok_or_else(|| SolverError::Provider {
                    status: 404,
                    code: "DNS.0305".to_string(),
                    message: format!("record set {record_id} not found"),
                })?;
            record.values = values.clone();
        }
        self.calls.lock().push(Call::Update {
            record_id: record_id.to_string(),
            values,
        });
        Ok(())
    }

    async fn delete_record(&self, zone_id: &str, record_id: &str) -> SolverResult<()> {
        self.check_failure()?;
        self.records
            .lock()
            .retain(|r| !(r.zone_id == zone_id && r.id.as_deref() == Some(record_id)));
        self.calls.lock().push(Call::Delete {
            record_id: record_id.to_string(),
        });
        Ok(())
    }
}
