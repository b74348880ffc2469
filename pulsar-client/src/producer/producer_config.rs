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

use pulsar_error::PulsarClientError;
use pulsar_error::PulsarResult;
use serde::Deserialize;

/// How messages are spread over the partitions of a partitioned topic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum MessageRoutingMode {
    #[default]
    RoundRobinPartition,
    SinglePartition,
    CustomPartition,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProducerConfig {
    pub producer_name: Option<String>,
    pub send_timeout_ms: u64,
    pub max_pending_messages: u32,
    pub block_if_queue_full: bool,
    pub routing_mode: MessageRoutingMode,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            producer_name: None,
            send_timeout_ms: 30_000,
            max_pending_messages: 1_000,
            block_if_queue_full: false,
            routing_mode: MessageRoutingMode::default(),
        }
    }
}

impl ProducerConfig {
    pub fn builder() -> ProducerConfigBuilder {
        ProducerConfigBuilder::default()
    }

    pub fn validate(&self) -> PulsarResult<()> {
        if matches!(self.producer_name.as_deref(), Some(name) if name.trim().is_empty()) {
            return Err(PulsarClientError::invalid_configuration("producer name is empty"));
        }
        if self.max_pending_messages == 0 {
            return Err(PulsarClientError::invalid_configuration(
                "max_pending_messages must be greater than 0",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProducerConfigBuilder {
    config: ProducerConfig,
}

impl ProducerConfigBuilder {
    pub fn producer_name(mut self, name: impl Into<String>) -> Self {
        self.config.producer_name = Some(name.into());
        self
    }

    /// `0` disables the send timeout
    pub fn send_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.config.send_timeout_ms = timeout_ms;
        self
    }

    pub fn max_pending_messages(mut self, max: u32) -> Self {
        self.config.max_pending_messages = max;
        self
    }

    pub fn block_if_queue_full(mut self, block: bool) -> Self {
        self.config.block_if_queue_full = block;
        self
    }

    pub fn routing_mode(mut self, mode: MessageRoutingMode) -> Self {
        self.config.routing_mode = mode;
        self
    }

    pub fn build(self) -> PulsarResult<ProducerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(ProducerConfig::default().validate().is_ok());
    }

    #[test]
    fn builder_rejects_invalid_values() {
        assert!(ProducerConfig::builder().producer_name(" ").build().is_err());
        assert!(ProducerConfig::builder().max_pending_messages(0).build().is_err());

        let config = ProducerConfig::builder()
            .producer_name("orders-writer")
            .routing_mode(MessageRoutingMode::SinglePartition)
            .build()
            .unwrap();
        assert_eq!(config.producer_name.as_deref(), Some("orders-writer"));
        assert_eq!(config.routing_mode, MessageRoutingMode::SinglePartition);
    }
}
