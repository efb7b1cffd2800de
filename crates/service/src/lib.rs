//! The typing service: the composition point between an identifier
//! system backend and the type resolver.
//!
//! Validation is invoked by callers, not by `register`; registering an
//! invalid record is the caller's decision to make.

use std::sync::Arc;

use tracing::debug;

use pidkeeper_core::{IdentifierSystem, PidRecord, TypingServiceError};
use pidkeeper_registry::TypeCache;

pub struct TypingService {
    system: Arc<dyn IdentifierSystem>,
    types: TypeCache,
}

impl TypingService {
    pub fn new(system: Arc<dyn IdentifierSystem>, types: TypeCache) -> Self {
        Self { system, types }
    }

    /// Checks the record against every listed type, resolving each
    /// definition through the cache. Fails on the first type the record
    /// does not conform to, naming the type and the missing mandatory
    /// property.
    pub async fn validate<I, S>(
        &self,
        record: &PidRecord,
        type_identifiers: I,
    ) -> Result<(), TypingServiceError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for type_identifier in type_identifiers {
            let type_identifier = type_identifier.as_ref();
            let definition = self.types.resolve(type_identifier).await?;
            if let Some(missing) = record.first_missing_mandatory(&definition) {
                debug!(
                    type_identifier,
                    missing, "record failed conformance check"
                );
                return Err(TypingServiceError::Conformance {
                    type_identifier: type_identifier.to_owned(),
                    missing_property: missing.to_owned(),
                });
            }
        }
        Ok(())
    }

    /// Registers the record with the backend, which assigns a pid if the
    /// record carries none. No validation happens here.
    pub async fn register(&self, record: PidRecord) -> Result<String, TypingServiceError> {
        Ok(self.system.register(record).await?)
    }

    /// Fully replaces the stored record; `false` if its pid is unknown.
    pub async fn update(&self, record: PidRecord) -> Result<bool, TypingServiceError> {
        Ok(self.system.update(record).await?)
    }

    pub async fn is_registered(&self, pid: &str) -> Result<bool, TypingServiceError> {
        Ok(self.system.is_registered(pid).await?)
    }

    /// The record under `pid`, restricted to the properties covered by
    /// the given type.
    pub async fn fetch_typed(
        &self,
        pid: &str,
        type_identifier: &str,
    ) -> Result<PidRecord, TypingServiceError> {
        let definition = self.types.resolve(type_identifier).await?;
        Ok(self.system.query_by_type(pid, &definition).await?)
    }

    /// The first value of the property named by the type's identifier.
    pub async fn query_property(
        &self,
        pid: &str,
        type_identifier: &str,
    ) -> Result<String, TypingServiceError> {
        let definition = self.types.resolve(type_identifier).await?;
        Ok(self.system.query_property(pid, &definition).await?)
    }
}
