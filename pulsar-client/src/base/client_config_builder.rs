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

//! Fluent builder for [`ClientConfig`] that validates before handing the
//! configuration out.

use std::sync::Arc;

use pulsar_error::PulsarResult;

use crate::base::authentication::Authentication;
use crate::base::client_config::ClientConfig;
use crate::base::client_config_validation::ClientConfigValidator;

/// Builder for creating [`ClientConfig`] instances with a fluent API
///
/// # Example
///
/// ```rust
/// use pulsar_client::ClientConfig;
///
/// let config = ClientConfig::builder()
///     .service_url("pulsar://localhost:6650")
///     .io_threads(2)
///     .operation_timeout_ms(10_000)
///     .build()
///     .unwrap();
/// assert_eq!(config.io_threads, 2);
/// ```
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl Default for ClientConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ClientConfig::new(),
        }
    }

    // ========================================================================
    // Service endpoint
    // ========================================================================

    pub fn service_url(mut self, service_url: impl Into<String>) -> Self {
        self.config.set_service_url(service_url);
        self
    }

    // ========================================================================
    // Threads and connections
    // ========================================================================

    pub fn io_threads(mut self, threads: usize) -> Self {
        self.config.io_threads = threads;
        self
    }

    pub fn listener_threads(mut self, threads: usize) -> Self {
        self.config.listener_threads = threads;
        self
    }

    pub fn connections_per_broker(mut self, connections: usize) -> Self {
        self.config.connections_per_broker = connections;
        self
    }

    // ========================================================================
    // Timeouts
    // ========================================================================

    pub fn operation_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.config.operation_timeout_ms = timeout_ms;
        self
    }

    /// `0` disables the periodic stats log
    pub fn stats_interval_seconds(mut self, seconds: u64) -> Self {
        self.config.stats_interval_seconds = seconds;
        self
    }

    // ========================================================================
    // Security
    // ========================================================================

    pub fn enable_tls(mut self, use_tls: bool) -> Self {
        self.config.use_tls = use_tls;
        self
    }

    pub fn tls_allow_insecure_connection(mut self, allow: bool) -> Self {
        self.config.tls_allow_insecure_connection = allow;
        self
    }

    pub fn tls_trust_certs_file_path(mut self, path: impl Into<String>) -> Self {
        self.config.tls_trust_certs_file_path = Some(path.into());
        self
    }

    pub fn authentication(mut self, authentication: Arc<dyn Authentication>) -> Self {
        self.config.set_authentication(authentication);
        self
    }

    pub fn build(self) -> PulsarResult<ClientConfig> {
        ClientConfigValidator::validate(&self.config)?;
        Ok(self.config)
    }

    /// Returns the configuration without validation
    pub fn build_unchecked(self) -> ClientConfig {
        self.config
    }
}
