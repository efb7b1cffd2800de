//! Interchange representations of a record.
//!
//! The flat pair list is the form clients send and receive; the database
//! object is the form the persistence layer stores. Both convert to and
//! from [`PidRecord`], which remains the only representation offering
//! manipulation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::errors::RecordError;
use crate::record::PidRecord;

/// One key/value pair of the flat interchange form.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SimplePair {
    pub key: String,
    pub value: String,
}

/// Flat pair-list form of a record. Display names and the pid are not
/// part of this representation.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SimplePidRecord {
    #[serde(default)]
    pub pairs: Vec<SimplePair>,
}

/// Storage form of a record: pid plus identifier-to-values map.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PidDatabaseObject {
    pub pid: String,
    #[serde(default)]
    pub entries: HashMap<String, Vec<String>>,
}

impl TryFrom<SimplePidRecord> for PidRecord {
    type Error = RecordError;

    fn try_from(simple: SimplePidRecord) -> Result<Self, Self::Error> {
        let mut record = PidRecord::new();
        for pair in simple.pairs {
            record.add_entry(&pair.key, "", &pair.value)?;
        }
        Ok(record)
    }
}

impl TryFrom<PidDatabaseObject> for PidRecord {
    type Error = RecordError;

    fn try_from(dbo: PidDatabaseObject) -> Result<Self, Self::Error> {
        let mut record = PidRecord::new().with_pid(dbo.pid);
        for (key, values) in dbo.entries {
            for value in values {
                record.add_entry(&key, "", &value)?;
            }
        }
        Ok(record)
    }
}

impl From<&PidRecord> for SimplePidRecord {
    fn from(record: &PidRecord) -> Self {
        let mut pairs = Vec::new();
        for (key, entries) in record.entries() {
            for entry in entries {
                pairs.push(SimplePair {
                    key: key.clone(),
                    value: entry.value.clone(),
                });
            }
        }
        SimplePidRecord { pairs }
    }
}

impl From<&PidRecord> for PidDatabaseObject {
    fn from(record: &PidRecord) -> Self {
        let entries = record
            .entries()
            .iter()
            .map(|(key, entries)| {
                let values = entries.iter().map(|entry| entry.value.clone()).collect();
                (key.clone(), values)
            })
            .collect();
        PidDatabaseObject {
            pid: record.pid().unwrap_or_default().to_owned(),
            entries,
        }
    }
}
