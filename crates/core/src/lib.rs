//! Core domain model, conformance checking, and backend traits.
//! No IO within this crate; the async traits declared here are
//! implemented by the backend crates.

pub mod errors;
pub mod interchange;
pub mod record;
pub mod traits;
pub mod typedef;

pub use crate::errors::{PidSystemError, RecordError, ResolveError, TypingServiceError};
pub use crate::interchange::{PidDatabaseObject, SimplePair, SimplePidRecord};
pub use crate::record::{PidRecord, RecordEntry};
pub use crate::traits::{IdentifierSystem, TypeRegistry};
pub use crate::typedef::{PropertySpec, TypeDefinition};
