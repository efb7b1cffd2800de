//! A simple basis for demonstrations or tests of the service. Records
//! live in a process-local map and are not stored anywhere else.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, warn};

use pidkeeper_core::{IdentifierSystem, PidRecord, PidSystemError};

const BACKEND: &str = "in-memory";

/// Generated pids are `tmp/test/{hash}`; the hash is derived from the
/// record's entries, bumped by a counter on collision.
const PID_PREFIX: &str = "tmp/test/";

/// Collision retries before registration gives up. The source system
/// looped without bound here; a map this contended is an operational
/// failure, not something to spin on.
const MAX_COLLISION_RETRIES: u64 = 1000;

pub struct InMemoryIdentifierSystem {
    records: RwLock<HashMap<String, PidRecord>>,
}

impl InMemoryIdentifierSystem {
    pub fn new() -> Self {
        warn!("using in-memory identifier system, registered PIDs are not stored permanently");
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    fn entry_hash(record: &PidRecord) -> u64 {
        let mut hasher = DefaultHasher::new();
        record.hash(&mut hasher);
        hasher.finish()
    }
}

impl Default for InMemoryIdentifierSystem {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentifierSystem for InMemoryIdentifierSystem {
    async fn is_registered(&self, pid: &str) -> Result<bool, PidSystemError> {
        Ok(self.records.read().contains_key(pid))
    }

    async fn query_all_properties(&self, pid: &str) -> Result<PidRecord, PidSystemError> {
        self.records
            .read()
            .get(pid)
            .cloned()
            .ok_or_else(|| PidSystemError::NotFound(pid.to_owned()))
    }

    async fn register(&self, mut record: PidRecord) -> Result<String, PidSystemError> {
        // Pick-a-free-key and insert happen under one write lock, so two
        // concurrent registrations cannot settle on the same pid.
        let mut records = self.records.write();
        let pid = match record.pid() {
            // A collision on a caller-supplied pid cannot be re-resolved
            // by picking another key; refuse instead of overwriting.
            Some(supplied) if records.contains_key(supplied) => {
                return Err(PidSystemError::Io {
                    backend: BACKEND,
                    message: format!("pid {supplied} already registered"),
                });
            }
            Some(supplied) => supplied.to_owned(),
            None => {
                let hash = Self::entry_hash(&record);
                let mut counter = 0u64;
                loop {
                    let candidate = format!("{PID_PREFIX}{}", hash.wrapping_add(counter));
                    if !records.contains_key(&candidate) {
                        break candidate;
                    }
                    counter += 1;
                    if counter > MAX_COLLISION_RETRIES {
                        return Err(PidSystemError::Io {
                            backend: BACKEND,
                            message: format!(
                                "no free pid after {MAX_COLLISION_RETRIES} collision retries"
                            ),
                        });
                    }
                }
            }
        };
        record.set_pid(pid.clone());
        records.insert(pid.clone(), record);
        debug!(pid, "registered record");
        Ok(pid)
    }

    async fn update(&self, record: PidRecord) -> Result<bool, PidSystemError> {
        let Some(pid) = record.pid().map(str::to_owned) else {
            return Ok(false);
        };
        let mut records = self.records.write();
        if !records.contains_key(&pid) {
            return Ok(false);
        }
        records.insert(pid, record);
        Ok(true)
    }

    async fn delete(&self, _pid: &str) -> Result<(), PidSystemError> {
        Err(PidSystemError::Unsupported(
            "deleting PIDs is against the P in PID",
        ))
    }
}
