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

//! Producer bound to a single, non-partitioned topic or to one partition.

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use pulsar_common::TopicName;
use pulsar_error::PulsarClientError;
use pulsar_error::PulsarResult;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::base::handler_state::CloseAction;
use crate::base::handler_state::CloseLatch;
use crate::base::handler_state::ConnectionHandler;
use crate::base::handler_state::HandlerState;
use crate::factory::client_context::ClientContext;
use crate::factory::entity_registry::Registration;
use crate::factory::entity_registry::RegistrationSlot;
use crate::implementation::connection::ClientConnection;
use crate::implementation::connection::ProducerCommand;
use crate::producer::producer_base::Producer;
use crate::producer::producer_config::ProducerConfig;

pub struct ProducerImpl {
    ctx: Arc<ClientContext>,
    topic: TopicName,
    conf: ProducerConfig,
    producer_id: u64,
    handler: ConnectionHandler,
    producer_name: Mutex<Option<String>>,
    close_latch: CloseLatch,
    registration: RegistrationSlot<Producer>,
}

impl ProducerImpl {
    pub(crate) fn new(ctx: Arc<ClientContext>, topic: TopicName, conf: ProducerConfig) -> Arc<Self> {
        let producer_id = ctx.new_producer_id();
        Arc::new(Self {
            producer_name: Mutex::new(conf.producer_name.clone()),
            ctx,
            topic,
            conf,
            producer_id,
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
    pub fn producer_id(&self) -> u64 {
        self.producer_id
    }

    /// Name assigned by the broker, or the configured one before connecting.
    pub fn producer_name(&self) -> Option<String> {
        self.producer_name.lock().clone()
    }

    #[inline]
    pub fn config(&self) -> &ProducerConfig {
        &self.conf
    }

    #[inline]
    pub fn state(&self) -> HandlerState {
        self.handler.state()
    }

    pub fn is_connected(&self) -> bool {
        self.handler.state() == HandlerState::Ready
    }

    pub(crate) fn bind_registration(&self, registration: Registration<Producer>) {
        self.registration.bind(registration);
    }

    pub(crate) async fn connect(self: Arc<Self>) -> PulsarResult<()> {
        self.handler.begin_connecting("Producer")?;
        let timeout_ms = self.ctx.config.operation_timeout_ms;
        let registered = tokio::time::timeout(self.ctx.config.operation_timeout(), self.register_with_broker())
            .await
            .unwrap_or_else(|_| Err(PulsarClientError::timeout("create producer", timeout_ms)));

        match registered {
            Ok((cnx, producer_name)) => {
                *self.producer_name.lock() = Some(producer_name.clone());
                if self.handler.connection_ready(cnx.clone()) {
                    info!(
                        "[{}] [{}] Created producer on cnx {}",
                        self.topic,
                        producer_name,
                        cnx.remote_address()
                    );
                    return Ok(());
                }
                // closed while the broker was registering us
                warn!("[{}] [{}] Producer closed while connecting", self.topic, producer_name);
                if let Err(e) = cnx.close_producer(self.ctx.new_request_id(), self.producer_id).await {
                    debug!("[{}] Failed to release producer {}: {}", self.topic, self.producer_id, e);
                }
                Err(PulsarClientError::AlreadyClosed("Producer"))
            }
            Err(e) => {
                warn!("[{}] Failed to create producer: {}", self.topic, e);
                self.handler.connection_failed();
                Err(e)
            }
        }
    }

    async fn register_with_broker(&self) -> PulsarResult<(Arc<dyn ClientConnection>, String)> {
        let cnx = self.ctx.get_connection(&self.topic).await?;
        let producer_name = cnx
            .register_producer(ProducerCommand {
                request_id: self.ctx.new_request_id(),
                producer_id: self.producer_id,
                topic: self.topic.clone(),
                producer_name: self.conf.producer_name.clone(),
            })
            .await?;
        Ok((cnx, producer_name))
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
                self.ctx.spawn("close producer", async move {
                    let _guard = guard;
                    let result = cnx.close_producer(this.ctx.new_request_id(), this.producer_id).await;
                    match &result {
                        Ok(()) => info!("[{}] Closed producer {}", this.topic, this.producer_id),
                        Err(e) => warn!("[{}] Failed to close producer {}: {}", this.topic, this.producer_id, e),
                    }
                    result
                })
            }
        }
    }
}
