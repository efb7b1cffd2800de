//! Wire shapes of the handle HTTP JSON API.

use serde::{Deserialize, Serialize};

use pidkeeper_core::{PidRecord, PidSystemError};

/// Handle value types managed by the handle server itself; they carry
/// permissions, not record properties, and are never mapped into records.
const ADMIN_TYPES: &[&str] = &["HS_ADMIN", "HS_VLIST", "HS_SECKEY", "HS_PUBKEY"];

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HandleData {
    pub format: String,
    pub value: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HandleValue {
    pub index: u32,
    #[serde(rename = "type")]
    pub value_type: String,
    pub data: HandleData,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct HandleApiRecord {
    #[serde(rename = "responseCode", default, skip_serializing)]
    pub response_code: i32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub handle: String,
    #[serde(default)]
    pub values: Vec<HandleValue>,
}

impl HandleApiRecord {
    /// Orders entries by property identifier so indices are stable for a
    /// given record; the handle protocol requires distinct indices but
    /// attaches no meaning to their order.
    pub(crate) fn from_record(record: &PidRecord) -> Self {
        let mut identifiers: Vec<&str> = record.property_identifiers().collect();
        identifiers.sort_unstable();
        let mut values = Vec::new();
        for identifier in identifiers {
            // identifiers came from the record, the lookup cannot miss
            let Ok(property_values) = record.property_values(identifier) else {
                continue;
            };
            for value in property_values {
                values.push(HandleValue {
                    index: values.len() as u32 + 1,
                    value_type: identifier.to_owned(),
                    data: HandleData {
                        format: "string".to_owned(),
                        value: value.to_owned(),
                    },
                });
            }
        }
        Self {
            response_code: 0,
            handle: record.pid().unwrap_or_default().to_owned(),
            values,
        }
    }

    pub(crate) fn into_record(self, pid: &str) -> Result<PidRecord, PidSystemError> {
        let mut record = PidRecord::new().with_pid(pid);
        for value in self.values {
            if ADMIN_TYPES.contains(&value.value_type.as_str()) {
                continue;
            }
            record.add_entry(&value.value_type, "", &value.data.value)?;
        }
        Ok(record)
    }
}
