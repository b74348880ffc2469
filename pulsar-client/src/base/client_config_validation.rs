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

//! Validation of [`ClientConfig`] fields, run by the builder, by
//! `ClientConfig::from_file` and again when a client is constructed.

use pulsar_common::ServiceUrl;
use pulsar_error::PulsarClientError;
use pulsar_error::PulsarResult;

use crate::base::client_config::ClientConfig;

pub struct ClientConfigValidator;

impl ClientConfigValidator {
    // =========================================================================
    // Validation Constants
    // =========================================================================

    /// Minimum operation timeout (100ms)
    pub const MIN_OPERATION_TIMEOUT_MS: u64 = 100;

    /// Maximum operation timeout (10 minutes)
    pub const MAX_OPERATION_TIMEOUT_MS: u64 = 600_000;

    /// Maximum connections kept per broker address
    pub const MAX_CONNECTIONS_PER_BROKER: usize = 1024;

    // =========================================================================
    // Validation Methods
    // =========================================================================

    pub fn validate(config: &ClientConfig) -> PulsarResult<()> {
        Self::validate_service_url(config.service_url.as_deref())?;
        Self::validate_threads("io_threads", config.io_threads)?;
        Self::validate_threads("listener_threads", config.listener_threads)?;
        Self::validate_operation_timeout(config.operation_timeout_ms)?;
        Self::validate_connections_per_broker(config.connections_per_broker)?;
        Self::validate_tls_trust_certs_file_path(config.tls_trust_certs_file_path.as_deref())
    }

    /// The service url must be present and use one of the pulsar or http schemes.
    pub fn validate_service_url(service_url: Option<&str>) -> PulsarResult<()> {
        match service_url {
            None => Err(PulsarClientError::invalid_configuration("service url is not set")),
            Some(url) if url.trim().is_empty() => {
                Err(PulsarClientError::invalid_configuration("service url is empty"))
            }
            Some(url) => ServiceUrl::parse(url).map(|_| ()),
        }
    }

    pub fn validate_threads(key: &'static str, threads: usize) -> PulsarResult<()> {
        if threads == 0 {
            return Err(PulsarClientError::invalid_configuration(format!(
                "{key} must be at least 1"
            )));
        }
        Ok(())
    }

    pub fn validate_operation_timeout(timeout_ms: u64) -> PulsarResult<()> {
        if !(Self::MIN_OPERATION_TIMEOUT_MS..=Self::MAX_OPERATION_TIMEOUT_MS).contains(&timeout_ms) {
            return Err(PulsarClientError::invalid_configuration(format!(
                "operation_timeout_ms {} must be between {} and {} milliseconds",
                timeout_ms,
                Self::MIN_OPERATION_TIMEOUT_MS,
                Self::MAX_OPERATION_TIMEOUT_MS
            )));
        }
        Ok(())
    }

    pub fn validate_connections_per_broker(connections: usize) -> PulsarResult<()> {
        if !(1..=Self::MAX_CONNECTIONS_PER_BROKER).contains(&connections) {
            return Err(PulsarClientError::invalid_configuration(format!(
                "connections_per_broker {} must be between 1 and {}",
                connections,
                Self::MAX_CONNECTIONS_PER_BROKER
            )));
        }
        Ok(())
    }

    pub fn validate_tls_trust_certs_file_path(path: Option<&str>) -> PulsarResult<()> {
        if matches!(path, Some(p) if p.trim().is_empty()) {
            return Err(PulsarClientError::invalid_configuration(
                "tls_trust_certs_file_path is empty",
            ));
        }
        Ok(())
    }
}
