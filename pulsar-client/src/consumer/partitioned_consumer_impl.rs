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

//! Consumer over every partition of a partitioned topic.

use std::sync::Arc;

use futures::future::join_all;
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use pulsar_common::TopicName;
use pulsar_error::PulsarClientError;
use pulsar_error::PulsarResult;
use pulsar_runtime::ListenerExecutor;
use tracing::info;
use tracing::warn;

use crate::base::handler_state::CloseLatch;
use crate::base::handler_state::HandlerState;
use crate::consumer::consumer_base::Consumer;
use crate::consumer::consumer_config::ConsumerConfig;
use crate::consumer::consumer_impl::ConsumerImpl;
use crate::factory::client_context::ClientContext;
use crate::factory::entity_registry::Registration;
use crate::factory::entity_registry::RegistrationSlot;

pub struct PartitionedConsumerImpl {
    topic: TopicName,
    subscription: String,
    consumers: Vec<Arc<ConsumerImpl>>,
    listener_executor: ListenerExecutor,
    state: Mutex<HandlerState>,
    close_latch: CloseLatch,
    registration: RegistrationSlot<Consumer>,
}

impl PartitionedConsumerImpl {
    /// All partition consumers share the aggregate's listener executor so
    /// callbacks for one subscription are never run concurrently.
    pub(crate) fn new(
        ctx: Arc<ClientContext>,
        topic: TopicName,
        subscription: String,
        conf: ConsumerConfig,
        num_partitions: u32,
        listener_executor: ListenerExecutor,
    ) -> Arc<Self> {
        let consumers = (0..num_partitions)
            .map(|index| {
                ConsumerImpl::new(
                    ctx.clone(),
                    topic.partition(index),
                    subscription.clone(),
                    conf.clone(),
                    listener_executor.clone(),
                )
            })
            .collect();
        Arc::new(Self {
            topic,
            subscription,
            consumers,
            listener_executor,
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
    pub fn subscription(&self) -> &str {
        &self.subscription
    }

    #[inline]
    pub fn num_partitions(&self) -> usize {
        self.consumers.len()
    }

    #[inline]
    pub fn consumers(&self) -> &[Arc<ConsumerImpl>] {
        &self.consumers
    }

    #[inline]
    pub fn listener_executor(&self) -> &ListenerExecutor {
        &self.listener_executor
    }

    pub fn execute_on_listener<F>(&self, task: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.listener_executor.execute(task)
    }

    pub fn state(&self) -> HandlerState {
        *self.state.lock()
    }

    pub fn is_connected(&self) -> bool {
        self.consumers.iter().all(|consumer| consumer.is_connected())
    }

    pub(crate) fn bind_registration(&self, registration: Registration<Consumer>) {
        self.registration.bind(registration);
    }

    /// Subscribes every partition concurrently. If any fails, the
    /// subscriptions that succeeded are closed and the first failure returned.
    pub(crate) async fn connect(self: Arc<Self>) -> PulsarResult<()> {
        {
            let mut state = self.state.lock();
            if state.is_closing_or_closed() {
                return Err(PulsarClientError::AlreadyClosed("Consumer"));
            }
            *state = HandlerState::Connecting;
        }

        let results = join_all(self.consumers.iter().map(|consumer| consumer.clone().connect())).await;
        let failed = results.iter().filter(|result| result.is_err()).count();
        if failed == 0 {
            let mut state = self.state.lock();
            if *state == HandlerState::Connecting {
                *state = HandlerState::Ready;
            }
            info!(
                "[{}][{}] Subscribed to partitioned topic with {} partitions",
                self.topic,
                self.subscription,
                self.consumers.len()
            );
            return Ok(());
        }

        warn!(
            "[{}][{}] Failed to subscribe {} of {} partitions",
            self.topic,
            self.subscription,
            failed,
            self.consumers.len()
        );
        join_all(self.consumers.iter().map(|consumer| consumer.close_async())).await;
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

        let closes: Vec<_> = self.consumers.iter().map(|consumer| consumer.close_async()).collect();
        let topic = self.topic.clone();
        let subscription = self.subscription.clone();
        async move {
            let _guard = guard;
            let results = join_all(closes).await;
            match results.into_iter().find_map(Result::err) {
                Some(e) => {
                    warn!("[{}][{}] Failed to close partitioned consumer: {}", topic, subscription, e);
                    Err(e)
                }
                None => {
                    info!("[{}][{}] Closed partitioned consumer", topic, subscription);
                    Ok(())
                }
            }
        }
        .boxed()
    }
}
