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

//! Consumer bound to a single, non-partitioned topic or to one partition.

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use pulsar_common::TopicName;
use pulsar_error::PulsarClientError;
use pulsar_error::PulsarResult;
use pulsar_runtime::ListenerExecutor;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::base::handler_state::CloseAction;
use crate::base::handler_state::CloseLatch;
use crate::base::handler_state::ConnectionHandler;
use crate::base::handler_state::HandlerState;
use crate::consumer::consumer_base::Consumer;
use crate::consumer::consumer_config::ConsumerConfig;
use crate::factory::client_context::ClientContext;
use crate::factory::entity_registry::Registration;
use crate::factory::entity_registry::RegistrationSlot;
use crate::implementation::connection::ClientConnection;
use crate::implementation::connection::SubscribeCommand;

pub struct ConsumerImpl {
    ctx: Arc<ClientContext>,
    topic: TopicName,
    subscription: String,
    conf: ConsumerConfig,
    consumer_id: u64,
    listener_executor: ListenerExecutor,
    handler: ConnectionHandler,
    close_latch: CloseLatch,
    registration: RegistrationSlot<Consumer>,
}

impl ConsumerImpl {
    pub(crate) fn new(
        ctx: Arc<ClientContext>,
        topic: TopicName,
        subscription: String,
        conf: ConsumerConfig,
        listener_executor: ListenerExecutor,
    ) -> Arc<Self> {
        let consumer_id = ctx.new_consumer_id();
        Arc::new(Self {
            ctx,
            topic,
            subscription,
            conf,
            consumer_id,
            listener_executor,
            handler: ConnectionHandler::new(),
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
    pub fn consumer_id(&self) -> u64 {
        self.consumer_id
    }

    #[inline]
    pub fn config(&self) -> &ConsumerConfig {
        &self.conf
    }

    #[inline]
    pub fn listener_executor(&self) -> &ListenerExecutor {
        &self.listener_executor
    }

    /// Run a user callback on this consumer's listener thread. Returns
    /// `false` once the listener executor has been shut down.
    pub fn execute_on_listener<F>(&self, task: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.listener_executor.execute(task)
    }

    #[inline]
    pub fn state(&self) -> HandlerState {
        self.handler.state()
    }

    pub fn is_connected(&self) -> bool {
        self.handler.state() == HandlerState::Ready
    }

    pub(crate) fn bind_registration(&self, registration: Registration<Consumer>) {
        self.registration.bind(registration);
    }

    pub(crate) async fn connect(self: Arc<Self>) -> PulsarResult<()> {
        self.handler.begin_connecting("Consumer")?;
        let timeout_ms = self.ctx.config.operation_timeout_ms;
        let subscribed = tokio::time::timeout(self.ctx.config.operation_timeout(), self.subscribe_on_broker())
            .await
            .unwrap_or_else(|_| Err(PulsarClientError::timeout("subscribe", timeout_ms)));

        match subscribed {
            Ok(cnx) => {
                if self.handler.connection_ready(cnx.clone()) {
                    info!(
                        "[{}][{}] Subscribed to topic on {} -- consumer: {}",
                        self.topic,
                        self.subscription,
                        cnx.remote_address(),
                        self.consumer_id
                    );
                    return Ok(());
                }
                warn!("[{}][{}] Consumer closed while subscribing", self.topic, self.subscription);
                if let Err(e) = cnx.close_consumer(self.ctx.new_request_id(), self.consumer_id).await {
                    debug!("[{}] Failed to release consumer {}: {}", self.topic, self.consumer_id, e);
                }
                Err(PulsarClientError::AlreadyClosed("Consumer"))
            }
            Err(e) => {
                warn!("[{}][{}] Failed to subscribe: {}", self.topic, self.subscription, e);
                self.handler.connection_failed();
                Err(e)
            }
        }
    }

    async fn subscribe_on_broker(&self) -> PulsarResult<Arc<dyn ClientConnection>> {
        let cnx = self.ctx.get_connection(&self.topic).await?;
        cnx.subscribe(SubscribeCommand {
            request_id: self.ctx.new_request_id(),
            consumer_id: self.consumer_id,
            topic: self.topic.clone(),
            subscription: self.subscription.clone(),
            subscription_type: self.conf.subscription_type,
            consumer_name: self.conf.consumer_name.clone(),
            receiver_queue_size: self.conf.receiver_queue_size,
        })
        .await?;
        Ok(cnx)
    }

    pub(crate) fn close_async(self: &Arc<Self>) -> BoxFuture<'static, PulsarResult<()>> {
        let mut guard = match self.close_latch.try_begin() {
            Ok(guard) => guard,
            Err(wait) => return wait,
        };
        let this = self.clone();
        guard.on_close(move || {
            this.handler.mark_closed();
            this.registration.release();
        });
        match self.handler.begin_close() {
            CloseAction::Done => {
                drop(guard);
                futures::future::ready(Ok(())).boxed()
            }
            CloseAction::CloseOnBroker(cnx) => {
                let this = self.clone();
                self.ctx.spawn("close consumer", async move {
                    let _guard = guard;
                    let result = cnx.close_consumer(this.ctx.new_request_id(), this.consumer_id).await;
                    match &result {
                        Ok(()) => info!("[{}][{}] Closed consumer {}", this.topic, this.subscription, this.consumer_id),
                        Err(e) => warn!(
                            "[{}][{}] Failed to close consumer {}: {}",
                            this.topic, this.subscription, this.consumer_id, e
                        ),
                    }
                    result
                })
            }
        }
    }
}
