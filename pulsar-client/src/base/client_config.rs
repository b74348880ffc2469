// Copyright 2024 The Pulsar Rust Client Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use config::Config;
use config::Environment;
use pulsar_error::PulsarClientError;
use pulsar_error::PulsarResult;
use serde::Deserialize;

use crate::base::authentication::Authentication;
use crate::base::authentication::AuthenticationDisabled;
use crate::base::client_config_builder::ClientConfigBuilder;
use crate::base::client_config_validation::ClientConfigValidator;

fn default_authentication() -> Arc<dyn Authentication> {
    Arc::new(AuthenticationDisabled)
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub service_url: Option<String>,
    pub io_threads: usize,
    pub listener_threads: usize,
    pub use_tls: bool,
    pub tls_allow_insecure_connection: bool,
    pub tls_trust_certs_file_path: Option<String>,
    pub operation_timeout_ms: u64,
    pub connections_per_broker: usize,
    pub stats_interval_seconds: u64,
    #[serde(skip, default = "default_authentication")]
    pub authentication: Arc<dyn Authentication>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientConfig {
    pub const DEFAULT_OPERATION_TIMEOUT_MS: u64 = 30_000;
    pub const DEFAULT_STATS_INTERVAL_SECONDS: u64 = 60;
    pub const ENV_PREFIX: &'static str = "PULSAR_CLIENT";

    pub fn new() -> Self {
        ClientConfig {
            service_url: None,
            io_threads: num_cpus::get(),
            listener_threads: 1,
            use_tls: false,
            tls_allow_insecure_connection: false,
            tls_trust_certs_file_path: None,
            operation_timeout_ms: Self::DEFAULT_OPERATION_TIMEOUT_MS,
            connections_per_broker: 1,
            stats_interval_seconds: Self::DEFAULT_STATS_INTERVAL_SECONDS,
            authentication: default_authentication(),
        }
    }

    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    /// Loads a configuration file (any format the `config` crate detects from
    /// the extension), overlaid by `PULSAR_CLIENT_*` environment variables.
    pub fn from_file(path: impl AsRef<Path>) -> PulsarResult<Self> {
        let path = path.as_ref();
        let cfg = Config::builder()
            .add_source(config::File::from(path))
            .add_source(Environment::with_prefix(Self::ENV_PREFIX).try_parsing(true))
            .build()
            .map_err(|e| PulsarClientError::invalid_configuration(format!("{}: {e}", path.display())))?;
        let config = cfg
            .try_deserialize::<ClientConfig>()
            .map_err(|e| PulsarClientError::invalid_configuration(format!("{}: {e}", path.display())))?;
        ClientConfigValidator::validate(&config)?;
        Ok(config)
    }

    #[inline]
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    #[inline]
    pub fn stats_interval(&self) -> Option<Duration> {
        (self.stats_interval_seconds > 0).then(|| Duration::from_secs(self.stats_interval_seconds))
    }

    pub fn set_service_url(&mut self, service_url: impl Into<String>) {
        self.service_url = Some(service_url.into());
    }

    pub fn set_authentication(&mut self, authentication: Arc<dyn Authentication>) {
        self.authentication = authentication;
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("service_url", &self.service_url)
            .field("io_threads", &self.io_threads)
            .field("listener_threads", &self.listener_threads)
            .field("use_tls", &self.use_tls)
            .field("tls_allow_insecure_connection", &self.tls_allow_insecure_connection)
            .field("tls_trust_certs_file_path", &self.tls_trust_certs_file_path)
            .field("operation_timeout_ms", &self.operation_timeout_ms)
            .field("connections_per_broker", &self.connections_per_broker)
            .field("stats_interval_seconds", &self.stats_interval_seconds)
            .field("authentication", &self.authentication.auth_method_name())
            .finish()
    }
}
