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

//! In-memory broker used by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use pulsar_client::implementation::connection::LookupDataResult;
use pulsar_client::implementation::connection::ProducerCommand;
use pulsar_client::implementation::connection::SubscribeCommand;
use pulsar_client::ClientConfig;
use pulsar_client::ClientConnection;
use pulsar_client::ConnectRequest;
use pulsar_client::Connector;
use pulsar_client::PulsarClient;
use pulsar_common::BrokerAddress;
use pulsar_common::PartitionedTopicMetadata;
use pulsar_common::TopicName;
use pulsar_error::LookupError;
use pulsar_error::PulsarClientError;
use pulsar_error::PulsarResult;

pub const SERVICE_URL: &str = "pulsar://broker:6650";

#[derive(Default)]
pub struct FakeCluster {
    partitions: Mutex<HashMap<String, u32>>,
    failing_topics: Mutex<HashSet<String>>,
    missing_topics: Mutex<HashSet<String>>,
    metadata_delay: Mutex<Option<Duration>>,
    registration_delay: Mutex<Option<Duration>>,
    connect_error: Mutex<Option<PulsarClientError>>,

    pub connects: AtomicUsize,
    pub lookups: AtomicUsize,
    pub metadata_requests: AtomicUsize,
    pub producers_registered: AtomicUsize,
    pub subscriptions: AtomicUsize,
    pub producer_closes: AtomicUsize,
    pub consumer_closes: AtomicUsize,
    pub connection_closes: AtomicUsize,
    pub registered_topics: Mutex<Vec<String>>,
    pub auth_methods: Mutex<Vec<String>>,
}

impl FakeCluster {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_partitions(&self, topic: &str, partitions: u32) {
        self.partitions.lock().insert(topic.to_string(), partitions);
    }

    /// Registrations and subscriptions on `topic` are rejected by the broker.
    pub fn fail_topic(&self, topic: &str) {
        self.failing_topics.lock().insert(topic.to_string());
    }

    /// Metadata requests for `topic` fail with topic-not-found.
    pub fn remove_topic(&self, topic: &str) {
        self.missing_topics.lock().insert(topic.to_string());
    }

    /// Every connect fails with `err` until cleared.
    pub fn fail_connects(&self, err: Option<PulsarClientError>) {
        *self.connect_error.lock() = err;
    }

    pub fn set_metadata_delay(&self, delay: Duration) {
        *self.metadata_delay.lock() = Some(delay);
    }

    pub fn set_registration_delay(&self, delay: Duration) {
        *self.registration_delay.lock() = Some(delay);
    }

    pub fn connector(self: &Arc<Self>) -> Arc<dyn Connector> {
        Arc::new(FakeConnector { cluster: self.clone() })
    }

    pub fn network_calls(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
            + self.lookups.load(Ordering::SeqCst)
            + self.metadata_requests.load(Ordering::SeqCst)
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

pub fn config() -> ClientConfig {
    ClientConfig::builder()
        .service_url(SERVICE_URL)
        .io_threads(2)
        .listener_threads(2)
        .stats_interval_seconds(0)
        .build()
        .unwrap()
}

pub fn client(cluster: &Arc<FakeCluster>) -> PulsarClient {
    PulsarClient::new(config(), cluster.connector()).unwrap()
}

struct FakeConnector {
    cluster: Arc<FakeCluster>,
}

impl Connector for FakeConnector {
    fn connect(&self, request: ConnectRequest) -> BoxFuture<'static, PulsarResult<Arc<dyn ClientConnection>>> {
        self.cluster.connects.fetch_add(1, Ordering::SeqCst);
        self.cluster.auth_methods.lock().push(request.auth_method_name.clone());
        if let Some(err) = self.cluster.connect_error.lock().clone() {
            return futures::future::ready(Err(err)).boxed();
        }
        let cnx: Arc<dyn ClientConnection> = Arc::new(FakeConnection {
            cluster: self.cluster.clone(),
            address: request.address,
            active: AtomicBool::new(true),
        });
        futures::future::ready(Ok(cnx)).boxed()
    }
}

struct FakeConnection {
    cluster: Arc<FakeCluster>,
    address: BrokerAddress,
    active: AtomicBool,
}

async fn pause(delay: Option<Duration>) {
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
}

impl ClientConnection for FakeConnection {
    fn remote_address(&self) -> &BrokerAddress {
        &self.address
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn lookup(
        &self,
        _request_id: u64,
        _topic: &TopicName,
        _authoritative: bool,
    ) -> BoxFuture<'static, PulsarResult<LookupDataResult>> {
        self.cluster.lookups.fetch_add(1, Ordering::SeqCst);
        futures::future::ready(Ok(LookupDataResult {
            broker_url: Some(SERVICE_URL.to_string()),
            broker_url_tls: None,
            authoritative: true,
            redirect: false,
        }))
        .boxed()
    }

    fn partitioned_metadata(
        &self,
        _request_id: u64,
        topic: &TopicName,
    ) -> BoxFuture<'static, PulsarResult<PartitionedTopicMetadata>> {
        self.cluster.metadata_requests.fetch_add(1, Ordering::SeqCst);
        let delay = *self.cluster.metadata_delay.lock();
        let missing = self.cluster.missing_topics.lock().contains(topic.as_str());
        let partitions = self.cluster.partitions.lock().get(topic.as_str()).copied().unwrap_or(0);
        let topic = topic.to_string();
        async move {
            pause(delay).await;
            if missing {
                return Err(LookupError::topic_not_found(topic).into());
            }
            Ok(PartitionedTopicMetadata::new(partitions))
        }
        .boxed()
    }

    fn register_producer(&self, command: ProducerCommand) -> BoxFuture<'static, PulsarResult<String>> {
        let cluster = self.cluster.clone();
        let delay = *cluster.registration_delay.lock();
        async move {
            pause(delay).await;
            if cluster.failing_topics.lock().contains(command.topic.as_str()) {
                return Err(PulsarClientError::broker("create producer", "ProducerBusy"));
            }
            cluster.producers_registered.fetch_add(1, Ordering::SeqCst);
            cluster.registered_topics.lock().push(command.topic.to_string());
            Ok(format!("standalone-0-{}", command.producer_id))
        }
        .boxed()
    }

    fn subscribe(&self, command: SubscribeCommand) -> BoxFuture<'static, PulsarResult<()>> {
        let cluster = self.cluster.clone();
        let delay = *cluster.registration_delay.lock();
        async move {
            pause(delay).await;
            if cluster.failing_topics.lock().contains(command.topic.as_str()) {
                return Err(PulsarClientError::broker("subscribe", "ConsumerBusy"));
            }
            cluster.subscriptions.fetch_add(1, Ordering::SeqCst);
            cluster.registered_topics.lock().push(command.topic.to_string());
            Ok(())
        }
        .boxed()
    }

    fn close_producer(&self, _request_id: u64, _producer_id: u64) -> BoxFuture<'static, PulsarResult<()>> {
        self.cluster.producer_closes.fetch_add(1, Ordering::SeqCst);
        futures::future::ready(Ok(())).boxed()
    }

    fn close_consumer(&self, _request_id: u64, _consumer_id: u64) -> BoxFuture<'static, PulsarResult<()>> {
        self.cluster.consumer_closes.fetch_add(1, Ordering::SeqCst);
        futures::future::ready(Ok(())).boxed()
    }

    fn close(&self) {
        if self.active.swap(false, Ordering::SeqCst) {
            self.cluster.connection_closes.fetch_add(1, Ordering::SeqCst);
        }
    }
}
