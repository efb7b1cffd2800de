//! Identifier system backed by a remote handle system, reached through
//! its HTTP JSON API. The adapter maps the five identifier operations
//! onto `GET`/`PUT /api/handles/{pid}` and translates the remote failure
//! modes: a 404 is `NotFound`, transport trouble and unexpected statuses
//! are `Io`, so callers can tell what is retryable.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, info};
use uuid::Uuid;

use pidkeeper_core::{IdentifierSystem, PidRecord, PidSystemError};

mod wire;

pub use crate::wire::{HandleData, HandleValue};

const BACKEND: &str = "handle";

/// Connection settings for the handle server.
#[derive(Clone, Debug, Deserialize)]
pub struct HandleConfig {
    /// Server base URL, e.g. `https://hdl.example.org`.
    pub base_url: String,
    /// Prefix under which this service registers handles, e.g. `21.T11148`.
    pub prefix: String,
    /// Per-request timeout in seconds.
    #[serde(default = "HandleConfig::default_timeout_secs")]
    pub timeout_secs: u64,
    /// Attempts before giving up when generated handles keep colliding.
    #[serde(default = "HandleConfig::default_max_register_attempts")]
    pub max_register_attempts: u32,
}

impl HandleConfig {
    fn default_timeout_secs() -> u64 {
        15
    }

    fn default_max_register_attempts() -> u32 {
        5
    }
}

pub struct HandleSystemAdapter {
    client: reqwest::Client,
    base_url: String,
    prefix: String,
    max_register_attempts: u32,
}

impl HandleSystemAdapter {
    pub fn new(config: &HandleConfig) -> Result<Self, PidSystemError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| PidSystemError::Io {
                backend: BACKEND,
                message: format!("failed to build handle client: {error}"),
            })?;
        info!(base_url = %config.base_url, prefix = %config.prefix, "starting handle system REST adapter");
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            prefix: config.prefix.clone(),
            max_register_attempts: config.max_register_attempts.max(1),
        })
    }

    fn handle_url(&self, pid: &str) -> String {
        format!("{}/api/handles/{pid}", self.base_url)
    }

    fn generate_pid(&self) -> String {
        format!("{}/{}", self.prefix, Uuid::new_v4())
    }

    fn io_error(message: impl Into<String>) -> PidSystemError {
        PidSystemError::Io {
            backend: BACKEND,
            message: message.into(),
        }
    }

    async fn fetch(&self, pid: &str) -> Result<Option<PidRecord>, PidSystemError> {
        let response = self
            .client
            .get(self.handle_url(pid))
            .send()
            .await
            .map_err(|error| Self::io_error(error.to_string()))?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let body: wire::HandleApiRecord = response
                    .json()
                    .await
                    .map_err(|error| Self::io_error(format!("malformed handle response: {error}")))?;
                Ok(Some(body.into_record(pid)?))
            }
            status => Err(Self::io_error(format!(
                "handle server answered with status {status} for {pid}"
            ))),
        }
    }

    /// PUT the record under `pid`. `overwrite` distinguishes first
    /// registration from update; without it the server answers 409 when
    /// the handle already exists.
    async fn put(
        &self,
        pid: &str,
        record: &PidRecord,
        overwrite: bool,
    ) -> Result<StatusCode, PidSystemError> {
        let body = wire::HandleApiRecord::from_record(record);
        let response = self
            .client
            .put(self.handle_url(pid))
            .query(&[("overwrite", overwrite)])
            .json(&body)
            .send()
            .await
            .map_err(|error| Self::io_error(error.to_string()))?;
        Ok(response.status())
    }
}

#[async_trait]
impl IdentifierSystem for HandleSystemAdapter {
    async fn is_registered(&self, pid: &str) -> Result<bool, PidSystemError> {
        let response = self
            .client
            .get(self.handle_url(pid))
            .send()
            .await
            .map_err(|error| Self::io_error(error.to_string()))?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => Err(Self::io_error(format!(
                "handle server answered with status {status} for {pid}"
            ))),
        }
    }

    async fn query_all_properties(&self, pid: &str) -> Result<PidRecord, PidSystemError> {
        self.fetch(pid)
            .await?
            .ok_or_else(|| PidSystemError::NotFound(pid.to_owned()))
    }

    async fn register(&self, record: PidRecord) -> Result<String, PidSystemError> {
        let supplied = record.pid().map(str::to_owned);
        let mut attempts = 0u32;
        loop {
            let pid = supplied.clone().unwrap_or_else(|| self.generate_pid());
            attempts += 1;
            let status = self.put(&pid, &record, false).await?;
            if status.is_success() {
                debug!(pid, "registered record");
                return Ok(pid);
            }
            if status != StatusCode::CONFLICT {
                return Err(Self::io_error(format!(
                    "handle server answered with status {status} while registering {pid}"
                )));
            }
            // A conflict on a caller-supplied pid cannot be re-resolved
            // by generating another one.
            if supplied.is_some() {
                return Err(Self::io_error(format!("handle {pid} already exists")));
            }
            if attempts >= self.max_register_attempts {
                return Err(Self::io_error(format!(
                    "no free handle under prefix {} after {attempts} attempts",
                    self.prefix
                )));
            }
            debug!(pid, "generated handle collided, retrying");
        }
    }

    async fn update(&self, record: PidRecord) -> Result<bool, PidSystemError> {
        let Some(pid) = record.pid().map(str::to_owned) else {
            return Ok(false);
        };
        if !self.is_registered(&pid).await? {
            return Ok(false);
        }
        let status = self.put(&pid, &record, true).await?;
        if status == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if !status.is_success() {
            return Err(Self::io_error(format!(
                "handle server answered with status {status} while updating {pid}"
            )));
        }
        Ok(true)
    }

    async fn delete(&self, _pid: &str) -> Result<(), PidSystemError> {
        Err(PidSystemError::Unsupported(
            "deleting PIDs is against the P in PID",
        ))
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use pidkeeper_core::TypeDefinition;

    use super::*;

    fn adapter_for(server: &MockServer) -> HandleSystemAdapter {
        HandleSystemAdapter::new(&HandleConfig {
            base_url: server.uri(),
            prefix: "21.T11148".into(),
            timeout_secs: 2,
            max_register_attempts: 3,
        })
        .unwrap()
    }

    fn handle_body() -> serde_json::Value {
        serde_json::json!({
            "responseCode": 1,
            "handle": "21.T11148/abc",
            "values": [
                { "index": 1, "type": "prop/a", "data": { "format": "string", "value": "v1" } },
                { "index": 2, "type": "prop/a", "data": { "format": "string", "value": "v2" } },
                { "index": 3, "type": "prop/b", "data": { "format": "string", "value": "w" } },
                { "index": 100, "type": "HS_ADMIN", "data": { "format": "admin", "value": "ignored" } }
            ]
        })
    }

    #[tokio::test]
    async fn query_parses_values_and_skips_admin_entries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/handles/21.T11148/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(handle_body()))
            .mount(&server)
            .await;

        let adapter = adapter_for(&server);
        let record = adapter.query_all_properties("21.T11148/abc").await.unwrap();
        assert_eq!(record.pid(), Some("21.T11148/abc"));
        assert_eq!(record.property_values("prop/a").unwrap(), vec!["v1", "v2"]);
        assert_eq!(record.property_value("prop/b").unwrap(), "w");
        assert!(!record.has_property("HS_ADMIN"));
    }

    #[tokio::test]
    async fn missing_handle_maps_to_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let adapter = adapter_for(&server);
        assert!(matches!(
            adapter.query_all_properties("21.T11148/absent").await,
            Err(PidSystemError::NotFound(_))
        ));
        assert!(!adapter.is_registered("21.T11148/absent").await.unwrap());
    }

    #[tokio::test]
    async fn server_error_maps_to_io_not_absent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let adapter = adapter_for(&server);
        assert!(matches!(
            adapter.is_registered("21.T11148/abc").await,
            Err(PidSystemError::Io { .. })
        ));
    }

    #[tokio::test]
    async fn register_generates_handle_under_prefix() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(query_param("overwrite", "false"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        let adapter = adapter_for(&server);
        let mut record = PidRecord::new();
        record.add_entry("prop/a", "", "v1").unwrap();
        let pid = adapter.register(record).await.unwrap();
        assert!(pid.starts_with("21.T11148/"));
    }

    #[tokio::test]
    async fn register_conflict_on_supplied_pid_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(409))
            .mount(&server)
            .await;

        let adapter = adapter_for(&server);
        let mut record = PidRecord::new().with_pid("21.T11148/taken");
        record.add_entry("prop/a", "", "v1").unwrap();
        assert!(matches!(
            adapter.register(record).await,
            Err(PidSystemError::Io { .. })
        ));
    }

    #[tokio::test]
    async fn register_gives_up_after_repeated_collisions() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(409))
            .expect(3)
            .mount(&server)
            .await;

        let adapter = adapter_for(&server);
        let mut record = PidRecord::new();
        record.add_entry("prop/a", "", "v1").unwrap();
        assert!(matches!(
            adapter.register(record).await,
            Err(PidSystemError::Io { .. })
        ));
    }

    #[tokio::test]
    async fn update_unknown_pid_returns_false() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let adapter = adapter_for(&server);
        let mut record = PidRecord::new().with_pid("21.T11148/absent");
        record.add_entry("prop/a", "", "v1").unwrap();
        assert!(!adapter.update(record).await.unwrap());
    }

    #[tokio::test]
    async fn update_known_pid_overwrites() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/handles/21.T11148/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(handle_body()))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/api/handles/21.T11148/abc"))
            .and(query_param("overwrite", "true"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let adapter = adapter_for(&server);
        let mut record = PidRecord::new().with_pid("21.T11148/abc");
        record.add_entry("prop/a", "", "v3").unwrap();
        assert!(adapter.update(record).await.unwrap());
    }

    #[tokio::test]
    async fn delete_is_always_unsupported() {
        let server = MockServer::start().await;
        let adapter = adapter_for(&server);
        assert!(matches!(
            adapter.delete("21.T11148/abc").await,
            Err(PidSystemError::Unsupported(_))
        ));
    }

    #[tokio::test]
    async fn query_by_type_post_filters_the_full_record() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/handles/21.T11148/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(handle_body()))
            .mount(&server)
            .await;

        let adapter = adapter_for(&server);
        let type_def = TypeDefinition::builder("type/x").mandatory("prop/a").build();
        let typed = adapter
            .query_by_type("21.T11148/abc", &type_def)
            .await
            .unwrap();
        assert_eq!(typed.property_values("prop/a").unwrap(), vec!["v1", "v2"]);
        assert!(!typed.has_property("prop/b"));
    }
}
