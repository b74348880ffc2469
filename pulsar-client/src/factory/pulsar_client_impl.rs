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

//! The client orchestrator.
//!
//! Owns the lifecycle state, the lookup service, the connection pool, the
//! timer, the listener executors and the producer/consumer registries, and
//! drives the creation pipeline and the coordinated shutdown.

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use futures::future::join_all;
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use pulsar_common::PartitionedTopicMetadata;
use pulsar_common::ServiceUrl;
use pulsar_common::TopicName;
use pulsar_error::PulsarClientError;
use pulsar_error::PulsarResult;
use pulsar_runtime::io_engine::select_io_runtime;
use pulsar_runtime::ExecutorProvider;
use pulsar_runtime::IoEngine;
use pulsar_runtime::PulsarRuntime;
use pulsar_runtime::Timer;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::base::client_config::ClientConfig;
use crate::base::client_config_validation::ClientConfigValidator;
use crate::base::client_entity::ClientEntity;
use crate::consumer::consumer_base::Consumer;
use crate::consumer::consumer_config::ConsumerConfig;
use crate::consumer::consumer_impl::ConsumerImpl;
use crate::consumer::partitioned_consumer_impl::PartitionedConsumerImpl;
use crate::factory::client_context::ClientContext;
use crate::factory::client_state::AtomicClientState;
use crate::factory::client_state::ClientState;
use crate::factory::entity_registry::EntityRegistry;
use crate::implementation::binary_proto_lookup_service::BinaryProtoLookupService;
use crate::implementation::connection::ClientConnection;
use crate::implementation::connection::Connector;
use crate::implementation::connection_pool::ConnectionPool;
use crate::implementation::connection_pool::PoolStats;
use crate::implementation::http_client::HttpClient;
use crate::implementation::http_lookup_service::HttpLookupService;
use crate::implementation::lookup_service::LookupService;
use crate::producer::partitioned_producer_impl::PartitionedProducerImpl;
use crate::producer::producer_base::Producer;
use crate::producer::producer_config::ProducerConfig;
use crate::producer::producer_impl::ProducerImpl;

const IO_RUNTIME_NAME: &str = "pulsar-client-io";
const TIMER_NAME: &str = "pulsar-timer";
const LISTENER_EXECUTOR_NAME: &str = "pulsar-external-listener";

fn failed<T: Send + 'static>(err: PulsarClientError) -> BoxFuture<'static, PulsarResult<T>> {
    futures::future::ready(Err(err)).boxed()
}

/// Entry point of the client. Cheap to clone, all clones share one client.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
///
/// use pulsar_client::ClientConfig;
/// use pulsar_client::PulsarClient;
///
/// let config = ClientConfig::builder().service_url("pulsar://localhost:6650").build()?;
/// let client = PulsarClient::new(config, Arc::new(MyConnector::default()))?;
/// let producer = client.create_producer_async("persistent://public/default/orders").await?;
/// client.close_async().await?;
/// ```
#[derive(Clone)]
pub struct PulsarClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    ctx: Arc<ClientContext>,
    state: AtomicClientState,
    producers: Arc<EntityRegistry<Producer>>,
    consumers: Arc<EntityRegistry<Consumer>>,
    io_engine: Option<IoEngine>,
    resources_released: AtomicBool,
    // dropped last, after everything that may still hold its handle
    io_runtime: Mutex<PulsarRuntime>,
}

impl PulsarClient {
    /// Build a client, selecting the best I/O engine available.
    pub fn new(config: ClientConfig, connector: Arc<dyn Connector>) -> PulsarResult<Self> {
        ClientConfigValidator::validate(&config)?;
        let (engine, io_runtime) = select_io_runtime(config.io_threads, IO_RUNTIME_NAME)?;
        Self::build(config, connector, io_runtime, Some(engine))
    }

    /// Build a client on a caller-supplied I/O runtime.
    pub fn with_runtime(
        config: ClientConfig,
        connector: Arc<dyn Connector>,
        io_runtime: PulsarRuntime,
    ) -> PulsarResult<Self> {
        ClientConfigValidator::validate(&config)?;
        Self::build(config, connector, io_runtime, None)
    }

    fn build(
        config: ClientConfig,
        connector: Arc<dyn Connector>,
        io_runtime: PulsarRuntime,
        io_engine: Option<IoEngine>,
    ) -> PulsarResult<Self> {
        let service_url = ServiceUrl::parse(config.service_url.as_deref().unwrap_or_default())?;
        let io_handle = io_runtime
            .get_handle()
            .cloned()
            .ok_or_else(|| PulsarClientError::invalid_configuration("I/O runtime is already shut down"))?;

        let cnx_pool = Arc::new(ConnectionPool::new(connector, &config));
        let lookup: Arc<dyn LookupService> = if service_url.scheme().is_http() {
            info!("Using HTTP lookup service for {}", service_url);
            Arc::new(HttpLookupService::new(
                HttpClient::new(&service_url, &config)?,
                config.use_tls,
            ))
        } else {
            info!("Using binary lookup service for {}", service_url);
            Arc::new(BinaryProtoLookupService::new(
                cnx_pool.clone(),
                service_url.clone(),
                config.use_tls,
            ))
        };
        let timer = Timer::new(TIMER_NAME)?;
        let external_executor_provider = ExecutorProvider::new(config.listener_threads, LISTENER_EXECUTOR_NAME)?;

        config.authentication.start().map_err(|e| match e {
            PulsarClientError::InvalidConfiguration(_) => e,
            other => PulsarClientError::invalid_configuration(format!("failed to start authentication: {other}")),
        })?;

        let ctx = Arc::new(ClientContext::new(
            config,
            lookup,
            cnx_pool,
            timer,
            external_executor_provider,
            io_handle,
        ));
        let inner = Arc::new(ClientInner {
            ctx,
            state: AtomicClientState::new(),
            producers: EntityRegistry::new("Producer"),
            consumers: EntityRegistry::new("Consumer"),
            io_engine,
            resources_released: AtomicBool::new(false),
            io_runtime: Mutex::new(io_runtime),
        });
        inner.schedule_stats();
        info!("Pulsar client created for {}", service_url);
        Ok(Self { inner })
    }

    // ========================================================================
    // Producers
    // ========================================================================

    pub fn create_producer_async(&self, topic: &str) -> BoxFuture<'static, PulsarResult<Producer>> {
        self.create_producer_with_config_async(topic, Some(ProducerConfig::default()))
    }

    pub fn create_producer_with_config_async(
        &self,
        topic: &str,
        conf: Option<ProducerConfig>,
    ) -> BoxFuture<'static, PulsarResult<Producer>> {
        if !self.inner.state.is_open() {
            return failed(PulsarClientError::client_already_closed());
        }
        let topic = match TopicName::new(topic) {
            Ok(topic) => topic,
            Err(e) => return failed(e),
        };
        let conf = match conf {
            Some(conf) => conf,
            None => return failed(PulsarClientError::invalid_configuration("Producer configuration undefined")),
        };
        if let Err(e) = conf.validate() {
            return failed(e);
        }

        let inner = self.inner.clone();
        self.inner
            .ctx
            .spawn("create producer", async move { inner.create_producer(topic, conf).await })
    }

    pub fn create_producer(&self, topic: &str) -> PulsarResult<Producer> {
        futures::executor::block_on(self.create_producer_async(topic))
    }

    pub fn create_producer_with_config(&self, topic: &str, conf: Option<ProducerConfig>) -> PulsarResult<Producer> {
        futures::executor::block_on(self.create_producer_with_config_async(topic, conf))
    }

    // ========================================================================
    // Consumers
    // ========================================================================

    pub fn subscribe_async(&self, topic: &str, subscription: &str) -> BoxFuture<'static, PulsarResult<Consumer>> {
        self.subscribe_with_config_async(topic, subscription, Some(ConsumerConfig::default()))
    }

    pub fn subscribe_with_config_async(
        &self,
        topic: &str,
        subscription: &str,
        conf: Option<ConsumerConfig>,
    ) -> BoxFuture<'static, PulsarResult<Consumer>> {
        if !self.inner.state.is_open() {
            return failed(PulsarClientError::client_already_closed());
        }
        let topic = match TopicName::new(topic) {
            Ok(topic) => topic,
            Err(e) => return failed(e),
        };
        if subscription.trim().is_empty() {
            return failed(PulsarClientError::InvalidSubscriptionName);
        }
        let conf = match conf {
            Some(conf) => conf,
            None => return failed(PulsarClientError::invalid_configuration("Consumer configuration undefined")),
        };
        if let Err(e) = conf.validate() {
            return failed(e);
        }

        let inner = self.inner.clone();
        let subscription = subscription.to_string();
        self.inner.ctx.spawn("subscribe", async move {
            inner.subscribe(topic, subscription, conf).await
        })
    }

    pub fn subscribe(&self, topic: &str, subscription: &str) -> PulsarResult<Consumer> {
        futures::executor::block_on(self.subscribe_async(topic, subscription))
    }

    pub fn subscribe_with_config(
        &self,
        topic: &str,
        subscription: &str,
        conf: Option<ConsumerConfig>,
    ) -> PulsarResult<Consumer> {
        futures::executor::block_on(self.subscribe_with_config_async(topic, subscription, conf))
    }

    // ========================================================================
    // Shutdown
    // ========================================================================

    /// Close every producer and consumer, then release the client's
    /// resources. Only the first call runs the sequence; every other call
    /// fails with `AlreadyClosed`.
    pub fn close_async(&self) -> BoxFuture<'static, PulsarResult<()>> {
        if let Err(e) = self.inner.state.begin_closing() {
            return failed(e);
        }
        info!("Client closing. URL: {}", self.inner.ctx.lookup.service_url());

        let producers = self.inner.producers.seal_and_snapshot();
        let consumers = self.inner.consumers.seal_and_snapshot();
        let closes: Vec<_> = producers
            .iter()
            .map(ClientEntity::close_async)
            .chain(consumers.iter().map(ClientEntity::close_async))
            .collect();

        let inner = self.inner.clone();
        self.inner.ctx.spawn("close client", async move {
            let total = closes.len();
            let failures = join_all(closes).await.into_iter().filter(Result::is_err).count();
            if failures > 0 {
                warn!("{} of {} producers and consumers failed to close cleanly", failures, total);
            }
            let released = inner.release_resources();
            inner.state.mark_closed();
            match &released {
                Ok(()) => info!("Client closed"),
                Err(e) => warn!("Client closed with errors: {}", e),
            }
            released
        })
    }

    pub fn close(&self) -> PulsarResult<()> {
        futures::executor::block_on(self.close_async())
    }

    /// Release the client's resources without closing producers and
    /// consumers. New creations are rejected afterwards.
    pub fn shutdown(&self) -> PulsarResult<()> {
        if self.inner.state.begin_closing().is_ok() {
            self.inner.producers.seal_and_snapshot();
            self.inner.consumers.seal_and_snapshot();
        }
        let released = self.inner.release_resources();
        self.inner.state.mark_closed();
        released
    }

    // ========================================================================
    // Lookup and connections
    // ========================================================================

    pub fn get_partitioned_topic_metadata(
        &self,
        topic: &str,
    ) -> BoxFuture<'static, PulsarResult<PartitionedTopicMetadata>> {
        match TopicName::new(topic) {
            Ok(topic) => {
                let metadata = self.inner.ctx.lookup.get_partitioned_topic_metadata(&topic);
                self.inner.ctx.spawn("get partitioned topic metadata", metadata)
            }
            Err(e) => failed(e),
        }
    }

    /// Connection to the broker serving `topic`, taken from the pool.
    pub fn get_connection(&self, topic: &str) -> BoxFuture<'static, PulsarResult<Arc<dyn ClientConnection>>> {
        match TopicName::new(topic) {
            Ok(topic) => {
                let cnx = self.inner.ctx.get_connection(&topic);
                self.inner.ctx.spawn("get connection", cnx)
            }
            Err(e) => failed(e),
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[inline]
    pub fn state(&self) -> ClientState {
        self.inner.state.get()
    }

    #[inline]
    pub fn configuration(&self) -> &ClientConfig {
        &self.inner.ctx.config
    }

    pub fn lookup(&self) -> Arc<dyn LookupService> {
        self.inner.ctx.lookup.clone()
    }

    /// Engine picked at construction, `None` when the runtime was supplied.
    #[inline]
    pub fn io_engine(&self) -> Option<IoEngine> {
        self.inner.io_engine
    }

    pub fn producers_count(&self) -> usize {
        self.inner.producers.len()
    }

    pub fn consumers_count(&self) -> usize {
        self.inner.consumers.len()
    }

    pub fn cnx_pool_stats(&self) -> PoolStats {
        self.inner.ctx.cnx_pool.stats()
    }

    #[inline]
    pub fn new_producer_id(&self) -> u64 {
        self.inner.ctx.new_producer_id()
    }

    #[inline]
    pub fn new_consumer_id(&self) -> u64 {
        self.inner.ctx.new_consumer_id()
    }

    #[inline]
    pub fn new_request_id(&self) -> u64 {
        self.inner.ctx.new_request_id()
    }
}

impl ClientInner {
    async fn create_producer(self: Arc<Self>, topic: TopicName, conf: ProducerConfig) -> PulsarResult<Producer> {
        let metadata = self.partitioned_metadata(&topic).await?;
        let producer = if metadata.is_partitioned() {
            Producer::Partitioned(PartitionedProducerImpl::new(
                self.ctx.clone(),
                topic,
                conf,
                metadata.partitions,
            ))
        } else {
            Producer::Single(ProducerImpl::new(self.ctx.clone(), topic, conf))
        };
        register_and_connect(&self.producers, producer).await
    }

    async fn subscribe(
        self: Arc<Self>,
        topic: TopicName,
        subscription: String,
        conf: ConsumerConfig,
    ) -> PulsarResult<Consumer> {
        let metadata = self.partitioned_metadata(&topic).await?;
        let listener_executor = self.ctx.external_executor_provider.get_executor();
        let consumer = if metadata.is_partitioned() {
            Consumer::Partitioned(PartitionedConsumerImpl::new(
                self.ctx.clone(),
                topic,
                subscription,
                conf,
                metadata.partitions,
                listener_executor,
            ))
        } else {
            Consumer::Single(ConsumerImpl::new(
                self.ctx.clone(),
                topic,
                subscription,
                conf,
                listener_executor,
            ))
        };
        register_and_connect(&self.consumers, consumer).await
    }

    async fn partitioned_metadata(&self, topic: &TopicName) -> PulsarResult<PartitionedTopicMetadata> {
        match self.ctx.lookup.get_partitioned_topic_metadata(topic).await {
            Ok(metadata) => {
                debug!("[{}] Received topic metadata. partitions: {}", topic, metadata.partitions);
                Ok(metadata)
            }
            Err(e) => {
                warn!("[{}] Failed to get partitioned topic metadata: {}", topic, e);
                Err(e)
            }
        }
    }

    /// Release order: lookup transport, connection pool, timer, listener
    /// executors, authentication. Every step runs even if an earlier one
    /// failed. Runs at most once.
    fn release_resources(&self) -> PulsarResult<()> {
        if self.resources_released.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let mut failures = Vec::new();

        if let Err(e) = self.ctx.lookup.close() {
            warn!("Failed to close lookup service: {}", e);
            failures.push(format!("lookup service: {e}"));
        }
        self.ctx.cnx_pool.close_all();
        if let Err(e) = self.ctx.timer.stop() {
            warn!("Failed to stop timer: {}", e);
            failures.push(format!("timer: {e}"));
        }
        self.ctx.external_executor_provider.shutdown_now();
        if let Err(e) = self.ctx.config.authentication.close() {
            warn!("Failed to close authentication: {}", e);
            failures.push(format!("authentication: {e}"));
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(PulsarClientError::ShutdownFailed { failures })
        }
    }

    fn schedule_stats(&self) {
        let Some(interval) = self.ctx.config.stats_interval() else {
            return;
        };
        let producers = Arc::downgrade(&self.producers);
        let consumers = Arc::downgrade(&self.consumers);
        let cnx_pool = Arc::downgrade(&self.ctx.cnx_pool);
        let scheduled = self.ctx.timer.schedule_at_fixed_rate(
            move || {
                let (Some(producers), Some(consumers), Some(cnx_pool)) =
                    (producers.upgrade(), consumers.upgrade(), cnx_pool.upgrade())
                else {
                    return;
                };
                cnx_pool.evict_inactive();
                let stats = cnx_pool.stats();
                info!(
                    "Client stats: producers={} consumers={} connections={} active={} pending={}",
                    producers.len(),
                    consumers.len(),
                    stats.total,
                    stats.active,
                    stats.pending
                );
            },
            Some(interval),
            interval,
        );
        if let Err(e) = scheduled {
            warn!("Failed to schedule client stats: {}", e);
        }
    }
}

/// Adds `entity` to `registry`, then connects it. A failed connect, or a
/// registry already sealed by shutdown, closes the entity before failing.
async fn register_and_connect<E: ClientEntity>(registry: &Arc<EntityRegistry<E>>, entity: E) -> PulsarResult<E> {
    if let Err(e) = registry.add(&entity) {
        debug!("[{}] Client closed during creation, closing entity", entity.topic());
        if let Err(close_err) = entity.close_async().await {
            debug!("[{}] Failed to close discarded entity: {}", entity.topic(), close_err);
        }
        return Err(e);
    }
    match entity.connect().await {
        Ok(()) => Ok(entity),
        Err(e) => {
            if let Err(close_err) = entity.close_async().await {
                debug!("[{}] Failed to close entity after failed creation: {}", entity.topic(), close_err);
            }
            Err(e)
        }
    }
}

impl std::fmt::Debug for PulsarClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PulsarClient")
            .field("service_url", &self.inner.ctx.lookup.service_url())
            .field("state", &self.state())
            .field("producers", &self.producers_count())
            .field("consumers", &self.consumers_count())
            .field("io_runtime", &self.inner.io_runtime.lock().name())
            .finish()
    }
}
