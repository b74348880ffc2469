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

//! Producer over every partition of a partitioned topic.

use std::sync::Arc;

use futures::future::join_all;
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use pulsar_common::TopicName;
use pulsar_error::PulsarClientError;
use pulsar_error::PulsarResult;
use tracing::info;
use tracing::warn;

use crate::base::handler_state::CloseLatch;
use crate::base::handler_state::HandlerState;
use crate::factory::client_context::ClientContext;
use crate::factory::entity_registry::Registration;
use crate::factory::entity_registry::RegistrationSlot;
use crate::producer::producer_base::Producer;
use crate::producer::producer_config::ProducerConfig;
use crate::producer::producer_impl::ProducerImpl;

pub struct PartitionedProducerImpl {
    topic: TopicName,
    producers: Vec<Arc<ProducerImpl>>,
    state: Mutex<HandlerState>,
    close_latch: CloseLatch,
    registration: RegistrationSlot<Producer>,
}

impl PartitionedProducerImpl {
    pub(crate) fn new(
        ctx: Arc<ClientContext>,
        topic: TopicName,
        conf: ProducerConfig,
        num_partitions: u32,
    ) -> Arc<Self> {
        let producers = (0..num_partitions)
            .map(|index| ProducerImpl::new(ctx.clone(), topic.partition(index), conf.clone()))
            .collect();
        Arc::new(Self {
            topic,
            producers,
            state: Mutex::new(HandlerState::Uninitialized),
            close_latch: CloseLatch::new(),
            registration: RegistrationSlot::new(),
        })
    }

    #[inline]
    pub fn topic(&self) -> &TopicName {
        &self.topic
    }

    #[inline]
    pub fn num_partitions(&self) -> usize {
        self.producers.len()
    }

    /// Per-partition producers, ordered by partition index.
    #[inline]
    pub fn producers(&self) -> &[Arc<ProducerImpl>] {
        &self.producers
    }

    pub fn state(&self) -> HandlerState {
        *self.state.lock()
    }

    pub fn is_connected(&self) -> bool {
        self.producers.iter().all(|producer| producer.is_connected())
    }

    pub(crate) fn bind_registration(&self, registration: Registration<Producer>) {
        self.registration.bind(registration);
    }

    /// Creates every partition producer concurrently. If any fails, the ones
    /// that succeeded are closed and the first failure is returned.
    pub(crate) async fn connect(self: Arc<Self>) -> PulsarResult<()> {
        {
            let mut state = self.state.lock();
            if state.is_closing_or_closed() {
                return Err(PulsarClientError::AlreadyClosed("Producer"));
            }
            *state = HandlerState::Connecting;
        }

        let results = join_all(self.producers.iter().map(|producer| producer.clone().connect())).await;
        let failed = results.iter().filter(|result| result.is_err()).count();
        if failed == 0 {
            let mut state = self.state.lock();
            if *state == HandlerState::Connecting {
                *state = HandlerState::Ready;
            }
            info!("[{}] Created partitioned producer with {} partitions", self.topic, self.producers.len());
            return Ok(());
        }

        warn!(
            "[{}] Failed to create {} of {} partition producers",
            self.topic,
            failed,
            self.producers.len()
        );
        join_all(self.producers.iter().map(|producer| producer.close_async())).await;
        {
            let mut state = self.state.lock();
            if *state == HandlerState::Connecting {
                *state = HandlerState::Failed;
            }
        }
        match results.into_iter().find_map(Result::err) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub(crate) fn close_async(self: &Arc<Self>) -> BoxFuture<'static, PulsarResult<()>> {
        let mut guard = match self.close_latch.try_begin() {
            Ok(guard) => guard,
            Err(wait) => return wait,
        };
        *self.state.lock() = HandlerState::Closing;
        let this = self.clone();
        guard.on_close(move || {
            *this.state.lock() = HandlerState::Closed;
            this.registration.release();
        });

        let closes: Vec<_> = self.producers.iter().map(|producer| producer.close_async()).collect();
        let topic = self.topic.clone();
        async move {
            let _guard = guard;
            let results = join_all(closes).await;
            match results.into_iter().find_map(Result::err) {
                Some(e) => {
                    warn!("[{}] Failed to close partitioned producer: {}", topic, e);
                    Err(e)
                }
                None => {
                    info!("[{}] Closed partitioned producer", topic);
                    Ok(())
                }
            }
        }
        .boxed()
    }
}
