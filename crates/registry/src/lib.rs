//! Type-definition resolution: a REST client for the type registry and a
//! bounded, expiring, load-coalescing cache in front of it.

pub mod cache;
pub mod rest;

pub use crate::cache::{TypeCache, TypeCacheConfig};
pub use crate::rest::{RegistryConfig, RestTypeRegistry};
