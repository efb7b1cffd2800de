//! REST client for the external type registry.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use pidkeeper_core::{ResolveError, TypeDefinition, TypeRegistry};

/// Connection settings for the type registry endpoint.
#[derive(Clone, Debug, Deserialize)]
pub struct RegistryConfig {
    /// Base URL; the type identifier is appended as a path segment.
    pub base_url: String,
    /// Per-request timeout in seconds.
    #[serde(default = "RegistryConfig::default_timeout_secs")]
    pub timeout_secs: u64,
}

impl RegistryConfig {
    fn default_timeout_secs() -> u64 {
        10
    }
}

pub struct RestTypeRegistry {
    client: reqwest::Client,
    base_url: String,
}

impl RestTypeRegistry {
    pub fn new(config: &RegistryConfig) -> Result<Self, ResolveError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| ResolveError::Io {
                identifier: String::new(),
                message: format!("failed to build registry client: {error}"),
            })?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
        })
    }

    fn type_url(&self, identifier: &str) -> String {
        format!("{}/{identifier}", self.base_url)
    }
}

#[async_trait]
impl TypeRegistry for RestTypeRegistry {
    async fn query_type_definition(
        &self,
        identifier: &str,
    ) -> Result<TypeDefinition, ResolveError> {
        let url = self.type_url(identifier);
        debug!(identifier, url, "querying type registry");
        let response =
            self.client
                .get(&url)
                .send()
                .await
                .map_err(|error| ResolveError::Io {
                    identifier: identifier.to_owned(),
                    message: error.to_string(),
                })?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(ResolveError::NotFound(identifier.to_owned())),
            status if status.is_success() => {
                response
                    .json::<TypeDefinition>()
                    .await
                    .map_err(|error| ResolveError::Malformed {
                        identifier: identifier.to_owned(),
                        message: error.to_string(),
                    })
            }
            status => Err(ResolveError::Io {
                identifier: identifier.to_owned(),
                message: format!("registry answered with status {status}"),
            }),
        }
    }
}
