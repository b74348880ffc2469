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
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use pulsar_common::TopicName;
use pulsar_error::PulsarResult;

use crate::base::client_entity::ClientEntity;
use crate::base::handler_state::HandlerState;
use crate::factory::entity_registry::RegisteredEntity;
use crate::factory::entity_registry::Registration;
use crate::producer::partitioned_producer_impl::PartitionedProducerImpl;
use crate::producer::producer_impl::ProducerImpl;

/// Handle to a producer created by the client. Cloning shares the producer.
#[derive(Clone)]
pub enum Producer {
    /// Non-partitioned topic
    Single(Arc<ProducerImpl>),
    /// One producer per partition behind a single handle
    Partitioned(Arc<PartitionedProducerImpl>),
}

impl Producer {
    pub fn topic(&self) -> &TopicName {
        match self {
            Producer::Single(producer) => producer.topic(),
            Producer::Partitioned(producer) => producer.topic(),
        }
    }

    #[inline]
    pub fn is_partitioned(&self) -> bool {
        matches!(self, Producer::Partitioned(_))
    }

    pub fn num_partitions(&self) -> usize {
        match self {
            Producer::Single(_) => 1,
            Producer::Partitioned(producer) => producer.num_partitions(),
        }
    }

    /// Ids of the broker-side producers behind this handle.
    pub fn producer_ids(&self) -> Vec<u64> {
        match self {
            Producer::Single(producer) => vec![producer.producer_id()],
            Producer::Partitioned(producer) => producer.producers().iter().map(|p| p.producer_id()).collect(),
        }
    }

    pub fn state(&self) -> HandlerState {
        match self {
            Producer::Single(producer) => producer.state(),
            Producer::Partitioned(producer) => producer.state(),
        }
    }

    pub fn is_connected(&self) -> bool {
        match self {
            Producer::Single(producer) => producer.is_connected(),
            Producer::Partitioned(producer) => producer.is_connected(),
        }
    }

    pub fn close_async(&self) -> BoxFuture<'static, PulsarResult<()>> {
        match self {
            Producer::Single(producer) => producer.close_async(),
            Producer::Partitioned(producer) => producer.close_async(),
        }
    }

    /// Blocking close. Must not be called from inside an async context.
    pub fn close(&self) -> PulsarResult<()> {
        futures::executor::block_on(self.close_async())
    }
}

impl fmt::Debug for Producer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer")
            .field("topic", &self.topic().as_str())
            .field("partitions", &self.num_partitions())
            .field("state", &self.state())
            .finish()
    }
}

impl RegisteredEntity for Producer {
    fn bind_registration(&self, registration: Registration<Self>) {
        match self {
            Producer::Single(producer) => producer.bind_registration(registration),
            Producer::Partitioned(producer) => producer.bind_registration(registration),
        }
    }
}

impl ClientEntity for Producer {
    fn topic(&self) -> &TopicName {
        Producer::topic(self)
    }

    fn state(&self) -> HandlerState {
        Producer::state(self)
    }

    fn connect(&self) -> BoxFuture<'static, PulsarResult<()>> {
        match self {
            Producer::Single(producer) => producer.clone().connect().boxed(),
            Producer::Partitioned(producer) => producer.clone().connect().boxed(),
        }
    }

    fn close_async(&self) -> BoxFuture<'static, PulsarResult<()>> {
        Producer::close_async(self)
    }
}
