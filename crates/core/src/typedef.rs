use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Per-property rule inside a type definition.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PropertySpec {
    #[serde(default)]
    pub optional: bool,
}

/// A type (or profile) definition: which property identifiers a class of
/// records carries, and which of them are mandatory.
///
/// Composed and inherited properties are assumed to be flattened into
/// `properties` by the registry before the definition reaches this core.
/// Definitions are immutable once loaded; the cache hands out shared
/// references.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TypeDefinition {
    identifier: String,
    #[serde(default)]
    properties: HashMap<String, PropertySpec>,
}

impl TypeDefinition {
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// All property identifiers covered by this type, own and inherited.
    pub fn all_properties(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    pub fn covers(&self, property_identifier: &str) -> bool {
        self.properties.contains_key(property_identifier)
    }

    /// Whether the given property is optional. Properties not covered by
    /// this type are reported as optional: they impose no obligation.
    pub fn is_optional(&self, property_identifier: &str) -> bool {
        self.properties
            .get(property_identifier)
            .map_or(true, |spec| spec.optional)
    }

    pub fn builder(identifier: impl Into<String>) -> TypeDefinitionBuilder {
        TypeDefinitionBuilder {
            identifier: identifier.into(),
            properties: HashMap::new(),
        }
    }
}

/// Convenience builder, mostly for tests and registry adapters.
pub struct TypeDefinitionBuilder {
    identifier: String,
    properties: HashMap<String, PropertySpec>,
}

impl TypeDefinitionBuilder {
    #[must_use]
    pub fn mandatory(mut self, property_identifier: impl Into<String>) -> Self {
        self.properties
            .insert(property_identifier.into(), PropertySpec { optional: false });
        self
    }

    #[must_use]
    pub fn optional(mut self, property_identifier: impl Into<String>) -> Self {
        self.properties
            .insert(property_identifier.into(), PropertySpec { optional: true });
        self
    }

    pub fn build(self) -> TypeDefinition {
        TypeDefinition {
            identifier: self.identifier,
            properties: self.properties,
        }
    }
}
