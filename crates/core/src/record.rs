use std::collections::{BTreeSet, HashMap};
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::errors::RecordError;
use crate::typedef::TypeDefinition;

/// One key-name-value triplet inside a record. The `key` duplicates the
/// map key it is stored under; `name` is a human-readable label carried
/// for display only and ignored by equality.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecordEntry {
    pub key: String,
    pub name: String,
    pub value: String,
}

/// The internal representation of a PID record.
///
/// Other representations exist for transport and persistence (see
/// [`crate::interchange`]); this is the one offering manipulation and
/// conformance checking. A property identifier maps to one or more
/// entries, so properties are multi-valued and duplicates are preserved.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PidRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pid: Option<String>,
    #[serde(default)]
    entries: HashMap<String, Vec<RecordEntry>>,
}

impl PidRecord {
    /// Creates an empty record without a PID.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pid(&self) -> Option<&str> {
        self.pid.as_deref()
    }

    pub fn set_pid(&mut self, pid: impl Into<String>) {
        self.pid = Some(pid.into());
    }

    /// Builder-style variant of [`PidRecord::set_pid`].
    #[must_use]
    pub fn with_pid(mut self, pid: impl Into<String>) -> Self {
        self.set_pid(pid);
        self
    }

    /// Adds a new key-name-value triplet. Properties are multi-valued;
    /// repeated calls with the same identifier append.
    pub fn add_entry(
        &mut self,
        property_identifier: &str,
        property_name: &str,
        property_value: &str,
    ) -> Result<(), RecordError> {
        if property_identifier.is_empty() {
            return Err(RecordError::EmptyPropertyIdentifier);
        }
        self.entries
            .entry(property_identifier.to_owned())
            .or_default()
            .push(RecordEntry {
                key: property_identifier.to_owned(),
                name: property_name.to_owned(),
                value: property_value.to_owned(),
            });
        Ok(())
    }

    /// Sets the display name on every entry stored under the given
    /// identifier. Purely cosmetic; equality never looks at names.
    pub fn set_property_name(
        &mut self,
        property_identifier: &str,
        name: &str,
    ) -> Result<(), RecordError> {
        let entries = self
            .entries
            .get_mut(property_identifier)
            .ok_or_else(|| RecordError::UnknownProperty(property_identifier.to_owned()))?;
        for entry in entries {
            entry.name = name.to_owned();
        }
        Ok(())
    }

    pub fn has_property(&self, property_identifier: &str) -> bool {
        self.entries.contains_key(property_identifier)
    }

    /// Removes every property whose identifier is not in `properties_to_keep`.
    pub fn remove_properties_not_listed(&mut self, properties_to_keep: &BTreeSet<String>) {
        self.entries
            .retain(|key, _| properties_to_keep.contains(key));
    }

    pub fn property_identifiers(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// The value of the first entry under the given identifier.
    pub fn property_value(&self, property_identifier: &str) -> Result<&str, RecordError> {
        self.entries
            .get(property_identifier)
            .and_then(|entries| entries.first())
            .map(|entry| entry.value.as_str())
            .ok_or_else(|| RecordError::UnknownProperty(property_identifier.to_owned()))
    }

    /// All values under the given identifier, in insertion order.
    pub fn property_values(&self, property_identifier: &str) -> Result<Vec<&str>, RecordError> {
        self.entries
            .get(property_identifier)
            .map(|entries| entries.iter().map(|entry| entry.value.as_str()).collect())
            .ok_or_else(|| RecordError::UnknownProperty(property_identifier.to_owned()))
    }

    /// Checks whether every mandatory property of the given type is
    /// present in this record. Values are not inspected, only presence.
    // TODO validation should be externalized so validation strategies can
    // be exchanged; today it is coupled to the record type.
    pub fn conforms_to(&self, type_def: &TypeDefinition) -> bool {
        self.first_missing_mandatory(type_def).is_none()
    }

    /// The first mandatory property of `type_def` absent from this
    /// record, if any. Iteration order over missing properties is
    /// unspecified; only presence/absence is contractual.
    pub fn first_missing_mandatory<'t>(&self, type_def: &'t TypeDefinition) -> Option<&'t str> {
        type_def
            .all_properties()
            .find(|property| !type_def.is_optional(property) && !self.has_property(property))
    }

    /// A new record containing only the entries whose property
    /// identifier is covered by `type_def`. Multi-valued properties keep
    /// all their values; display names are not carried over, and neither
    /// is the pid.
    pub fn filtered_by(&self, type_def: &TypeDefinition) -> PidRecord {
        let entries = self
            .entries
            .iter()
            .filter(|(key, _)| type_def.covers(key))
            .map(|(key, entries)| {
                let values = entries
                    .iter()
                    .map(|entry| RecordEntry {
                        key: key.clone(),
                        name: String::new(),
                        value: entry.value.clone(),
                    })
                    .collect();
                (key.clone(), values)
            })
            .collect();
        PidRecord { pid: None, entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn entries(&self) -> &HashMap<String, Vec<RecordEntry>> {
        &self.entries
    }

    fn value_set(entries: &[RecordEntry]) -> BTreeSet<&str> {
        entries.iter().map(|entry| entry.value.as_str()).collect()
    }
}

/// Equality ignores entry display names and all ordering: two records
/// are equal iff they carry the same pid, the same set of property
/// identifiers, and per identifier the same set of values.
impl PartialEq for PidRecord {
    fn eq(&self, other: &Self) -> bool {
        if self.pid != other.pid || self.entries.len() != other.entries.len() {
            return false;
        }
        self.entries.iter().all(|(key, entries)| {
            other
                .entries
                .get(key)
                .is_some_and(|theirs| Self::value_set(entries) == Self::value_set(theirs))
        })
    }
}

impl Eq for PidRecord {}

impl Hash for PidRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.pid.hash(state);
        let mut keys: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        keys.sort_unstable();
        for key in keys {
            key.hash(state);
            for value in Self::value_set(&self.entries[key]) {
                value.hash(state);
            }
        }
    }
}
