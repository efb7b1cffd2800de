use async_trait::async_trait;

use crate::errors::{PidSystemError, ResolveError};
use crate::record::PidRecord;
use crate::typedef::TypeDefinition;

/// A backend able to register, update, and resolve PID records.
///
/// Exactly two implementations exist: the map-backed test system and the
/// remote handle-system adapter. The capability set is deliberately flat;
/// callers hold an `Arc<dyn IdentifierSystem>`.
#[async_trait]
pub trait IdentifierSystem: Send + Sync {
    /// Whether the given pid is known to the backend. Transport failures
    /// surface as [`PidSystemError::Io`], never as `false`.
    async fn is_registered(&self, pid: &str) -> Result<bool, PidSystemError>;

    /// The full record stored under `pid`.
    async fn query_all_properties(&self, pid: &str) -> Result<PidRecord, PidSystemError>;

    /// Stores the record, assigning a pid if it has none, and returns
    /// the pid it is now registered under. Concurrent registrations must
    /// never leave two records under one pid.
    async fn register(&self, record: PidRecord) -> Result<String, PidSystemError>;

    /// Fully replaces the record stored under `record.pid()`. Returns
    /// `false` without storing anything if that pid was never registered.
    async fn update(&self, record: PidRecord) -> Result<bool, PidSystemError>;

    /// Deleting PIDs is against the P in PID. Every backend fails this
    /// with [`PidSystemError::Unsupported`].
    async fn delete(&self, pid: &str) -> Result<(), PidSystemError>;

    /// The first value of the property named by the type's identifier.
    async fn query_property(
        &self,
        pid: &str,
        type_def: &TypeDefinition,
    ) -> Result<String, PidSystemError> {
        let record = self.query_all_properties(pid).await?;
        Ok(record.property_value(type_def.identifier())?.to_owned())
    }

    /// The record under `pid`, restricted to the properties the type
    /// covers. A plain post-filter over [`Self::query_all_properties`],
    /// not a server-side projection.
    async fn query_by_type(
        &self,
        pid: &str,
        type_def: &TypeDefinition,
    ) -> Result<PidRecord, PidSystemError> {
        let record = self.query_all_properties(pid).await?;
        Ok(record.filtered_by(type_def))
    }
}

/// The external registry that serves type definitions.
#[async_trait]
pub trait TypeRegistry: Send + Sync {
    async fn query_type_definition(&self, identifier: &str)
        -> Result<TypeDefinition, ResolveError>;
}
