use thiserror::Error;

/// Errors raised by record mutators and lookups.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("property identifier must not be empty")]
    EmptyPropertyIdentifier,
    #[error("property identifier not listed in this record: {0}")]
    UnknownProperty(String),
}

/// Errors raised while resolving a type identifier to its definition.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("type definition not found: {0}")]
    NotFound(String),
    #[error("type registry io error for {identifier}: {message}")]
    Io { identifier: String, message: String },
    #[error("malformed type definition for {identifier}: {message}")]
    Malformed { identifier: String, message: String },
}

/// Errors raised by identifier-system backends.
#[derive(Debug, Error)]
pub enum PidSystemError {
    #[error("pid not found: {0}")]
    NotFound(String),
    #[error("{backend} backend io error: {message}")]
    Io {
        backend: &'static str,
        message: String,
    },
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
    #[error(transparent)]
    Record(#[from] RecordError),
}

/// Errors surfaced by the typing service to its callers.
#[derive(Debug, Error)]
pub enum TypingServiceError {
    #[error("record does not conform to type {type_identifier}: missing mandatory property {missing_property}")]
    Conformance {
        type_identifier: String,
        missing_property: String,
    },
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    System(#[from] PidSystemError),
}
