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
use pulsar_runtime::ListenerExecutor;

use crate::base::client_entity::ClientEntity;
use crate::base::handler_state::HandlerState;
use crate::consumer::consumer_impl::ConsumerImpl;
use crate::consumer::partitioned_consumer_impl::PartitionedConsumerImpl;
use crate::factory::entity_registry::RegisteredEntity;
use crate::factory::entity_registry::Registration;

/// Handle to a consumer created by the client. Cloning shares the consumer.
#[derive(Clone)]
pub enum Consumer {
    Single(Arc<ConsumerImpl>),
    Partitioned(Arc<PartitionedConsumerImpl>),
}

impl Consumer {
    pub fn topic(&self) -> &TopicName {
        match self {
            Consumer::Single(consumer) => consumer.topic(),
            Consumer::Partitioned(consumer) => consumer.topic(),
        }
    }

    pub fn subscription(&self) -> &str {
        match self {
            Consumer::Single(consumer) => consumer.subscription(),
            Consumer::Partitioned(consumer) => consumer.subscription(),
        }
    }

    #[inline]
    pub fn is_partitioned(&self) -> bool {
        matches!(self, Consumer::Partitioned(_))
    }

    pub fn num_partitions(&self) -> usize {
        match self {
            Consumer::Single(_) => 1,
            Consumer::Partitioned(consumer) => consumer.num_partitions(),
        }
    }

    pub fn consumer_ids(&self) -> Vec<u64> {
        match self {
            Consumer::Single(consumer) => vec![consumer.consumer_id()],
            Consumer::Partitioned(consumer) => consumer.consumers().iter().map(|c| c.consumer_id()).collect(),
        }
    }

    pub fn listener_executor(&self) -> &ListenerExecutor {
        match self {
            Consumer::Single(consumer) => consumer.listener_executor(),
            Consumer::Partitioned(consumer) => consumer.listener_executor(),
        }
    }

    /// Run a user callback on the listener thread bound to this consumer.
    pub fn execute_on_listener<F>(&self, task: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        match self {
            Consumer::Single(consumer) => consumer.execute_on_listener(task),
            Consumer::Partitioned(consumer) => consumer.execute_on_listener(task),
        }
    }

    pub fn state(&self) -> HandlerState {
        match self {
            Consumer::Single(consumer) => consumer.state(),
            Consumer::Partitioned(consumer) => consumer.state(),
        }
    }

    pub fn is_connected(&self) -> bool {
        match self {
            Consumer::Single(consumer) => consumer.is_connected(),
            Consumer::Partitioned(consumer) => consumer.is_connected(),
        }
    }

    pub fn close_async(&self) -> BoxFuture<'static, PulsarResult<()>> {
        match self {
            Consumer::Single(consumer) => consumer.close_async(),
            Consumer::Partitioned(consumer) => consumer.close_async(),
        }
    }

    /// Blocking close. Must not be called from inside an async context.
    pub fn close(&self) -> PulsarResult<()> {
        futures::executor::block_on(self.close_async())
    }
}

impl fmt::Debug for Consumer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer")
            .field("topic", &self.topic().as_str())
            .field("subscription", &self.subscription())
            .field("partitions", &self.num_partitions())
            .field("state", &self.state())
            .finish()
    }
}

impl RegisteredEntity for Consumer {
    fn bind_registration(&self, registration: Registration<Self>) {
        match self {
            Consumer::Single(consumer) => consumer.bind_registration(registration),
            Consumer::Partitioned(consumer) => consumer.bind_registration(registration),
        }
    }
}

impl ClientEntity for Consumer {
    fn topic(&self) -> &TopicName {
        Consumer::topic(self)
    }

    fn state(&self) -> HandlerState {
        Consumer::state(self)
    }

    fn connect(&self) -> BoxFuture<'static, PulsarResult<()>> {
        match self {
            Consumer::Single(consumer) => consumer.clone().connect().boxed(),
            Consumer::Partitioned(consumer) => consumer.clone().connect().boxed(),
        }
    }

    fn close_async(&self) -> BoxFuture<'static, PulsarResult<()>> {
        Consumer::close_async(self)
    }
}
