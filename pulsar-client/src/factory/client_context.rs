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

//! State shared between the client and every entity it creates.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use pulsar_common::TopicName;
use pulsar_error::PulsarClientError;
use pulsar_error::PulsarResult;
use pulsar_runtime::ExecutorProvider;
use pulsar_runtime::Timer;
use tokio::runtime::Handle;

use crate::base::client_config::ClientConfig;
use crate::factory::id_generator::next_request_id;
use crate::factory::id_generator::IdGenerator;
use crate::implementation::connection::ClientConnection;
use crate::implementation::connection_pool::ConnectionPool;
use crate::implementation::lookup_service::LookupService;

pub struct ClientContext {
    pub(crate) config: ClientConfig,
    pub(crate) lookup: Arc<dyn LookupService>,
    pub(crate) cnx_pool: Arc<ConnectionPool>,
    pub(crate) timer: Timer,
    pub(crate) external_executor_provider: ExecutorProvider,
    io_handle: Handle,
    producer_id_generator: IdGenerator,
    consumer_id_generator: IdGenerator,
}

impl ClientContext {
    pub(crate) fn new(
        config: ClientConfig,
        lookup: Arc<dyn LookupService>,
        cnx_pool: Arc<ConnectionPool>,
        timer: Timer,
        external_executor_provider: ExecutorProvider,
        io_handle: Handle,
    ) -> Self {
        Self {
            config,
            lookup,
            cnx_pool,
            timer,
            external_executor_provider,
            io_handle,
            producer_id_generator: IdGenerator::new(),
            consumer_id_generator: IdGenerator::new(),
        }
    }

    #[inline]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    #[inline]
    pub fn new_producer_id(&self) -> u64 {
        self.producer_id_generator.next_id()
    }

    #[inline]
    pub fn new_consumer_id(&self) -> u64 {
        self.consumer_id_generator.next_id()
    }

    #[inline]
    pub fn new_request_id(&self) -> u64 {
        next_request_id()
    }

    /// Resolve the broker serving `topic` and hand out a pooled connection to it.
    pub fn get_connection(&self, topic: &TopicName) -> BoxFuture<'static, PulsarResult<Arc<dyn ClientConnection>>> {
        let broker = self.lookup.get_broker(topic);
        let cnx_pool = self.cnx_pool.clone();
        async move {
            let address = broker.await?;
            cnx_pool.get_connection(&address).await
        }
        .boxed()
    }

    /// Run `future` on the I/O runtime. The returned future may be dropped
    /// without cancelling the work.
    pub fn spawn<T, F>(&self, operation: &'static str, future: F) -> BoxFuture<'static, PulsarResult<T>>
    where
        F: Future<Output = PulsarResult<T>> + Send + 'static,
        T: Send + 'static,
    {
        let handle = self.io_handle.spawn(future);
        async move {
            match handle.await {
                Ok(result) => result,
                Err(e) if e.is_cancelled() => Err(PulsarClientError::Interrupted(operation)),
                Err(e) => Err(PulsarClientError::from_cause(Box::new(e))),
            }
        }
        .boxed()
    }
}
