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

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
pub enum SubscriptionType {
    #[default]
    Exclusive,
    Shared,
    Failover,
    KeyShared,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConsumerConfig {
    pub subscription_type: SubscriptionType,
    pub receiver_queue_size: u32,
    /// `0` disables ack timeouts
    pub ack_timeout_ms: u64,
    pub consumer_name: Option<String>,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            subscription_type: SubscriptionType::default(),
            receiver_queue_size: 1_000,
            ack_timeout_ms: 0,
            consumer_name: None,
        }
    }
}

impl ConsumerConfig {
    /// Smallest ack timeout accepted when ack timeouts are enabled.
    pub const MIN_ACK_TIMEOUT_MS: u64 = 1_000;

    pub fn builder() -> ConsumerConfigBuilder {
        ConsumerConfigBuilder::default()
    }

    pub fn validate(&self) -> PulsarResult<()> {
        if self.ack_timeout_ms != 0 && self.ack_timeout_ms < Self::MIN_ACK_TIMEOUT_MS {
            return Err(PulsarClientError::invalid_configuration(format!(
                "ack_timeout_ms must be 0 or at least {}",
                Self::MIN_ACK_TIMEOUT_MS
            )));
        }
        if matches!(self.consumer_name.as_deref(), Some(name) if name.trim().is_empty()) {
            return Err(PulsarClientError::invalid_configuration("consumer name is empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConsumerConfigBuilder {
    config: ConsumerConfig,
}

impl ConsumerConfigBuilder {
    pub fn subscription_type(mut self, subscription_type: SubscriptionType) -> Self {
        self.config.subscription_type = subscription_type;
        self
    }

    pub fn receiver_queue_size(mut self, size: u32) -> Self {
        self.config.receiver_queue_size = size;
        self
    }

    pub fn ack_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.config.ack_timeout_ms = timeout_ms;
        self
    }

    pub fn consumer_name(mut self, name: impl Into<String>) -> Self {
        self.config.consumer_name = Some(name.into());
        self
    }

    pub fn build(self) -> PulsarResult<ConsumerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
