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

mod common;

use std::io;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use common::FakeCluster;
use pulsar_client::Authentication;
use pulsar_client::AuthenticationData;
use pulsar_client::ClientConfig;
use pulsar_client::ClientState;
use pulsar_client::HandlerState;
use pulsar_client::PulsarClient;
use pulsar_error::PulsarClientError;
use pulsar_error::PulsarResult;
use pulsar_runtime::PulsarRuntime;
use tracing_subscriber::fmt::MakeWriter;

const TOPIC: &str = "persistent://tenant/ns/t1";

#[tokio::test]
async fn create_after_close_fails_without_network() {
    let cluster = FakeCluster::new();
    let client = common::client(&cluster);
    client.close_async().await.unwrap();
    assert_eq!(client.state(), ClientState::Closed);

    let calls_before = cluster.network_calls();
    let err = client.create_producer_async(TOPIC).await.unwrap_err();
    assert!(matches!(err, PulsarClientError::AlreadyClosed("Client")));
    let err = client.subscribe_async(TOPIC, "sub").await.unwrap_err();
    assert!(err.is_already_closed());
    // the gate runs before validation
    let err = client.create_producer_async("not a topic").await.unwrap_err();
    assert!(err.is_already_closed());
    assert_eq!(cluster.network_calls(), calls_before);
}

#[tokio::test]
async fn concurrent_close_has_exactly_one_winner() {
    let cluster = FakeCluster::new();
    let client = common::client(&cluster);
    client.create_producer_async(TOPIC).await.unwrap();

    let closes: Vec<_> = (0..8).map(|_| client.close_async()).collect();
    let results = futures::future::join_all(closes).await;
    let winners = results.iter().filter(|result| result.is_ok()).count();
    assert_eq!(winners, 1);
    assert!(results
        .iter()
        .filter_map(|result| result.as_ref().err())
        .all(PulsarClientError::is_already_closed));
    assert_eq!(client.state(), ClientState::Closed);
}

#[tokio::test]
async fn close_empties_registries_and_closes_every_entity() {
    let cluster = FakeCluster::new();
    cluster.set_partitions("persistent://tenant/ns/p", 2);
    let client = common::client(&cluster);

    let plain = client.create_producer_async(TOPIC).await.unwrap();
    let partitioned = client.create_producer_async("persistent://tenant/ns/p").await.unwrap();
    let consumer = client.subscribe_async(TOPIC, "sub").await.unwrap();
    assert_eq!(client.producers_count(), 2);
    assert_eq!(client.consumers_count(), 1);

    client.close_async().await.unwrap();

    assert_eq!(client.producers_count(), 0);
    assert_eq!(client.consumers_count(), 0);
    assert_eq!(plain.state(), HandlerState::Closed);
    assert_eq!(partitioned.state(), HandlerState::Closed);
    assert_eq!(consumer.state(), HandlerState::Closed);
    assert_eq!(FakeCluster::count(&cluster.producer_closes), 3);
    assert_eq!(FakeCluster::count(&cluster.consumer_closes), 1);
    assert!(FakeCluster::count(&cluster.connection_closes) >= 1);
    assert!(consumer.listener_executor().is_shutdown());
}

#[tokio::test]
async fn partitioned_consumer_close_cascades_to_every_partition() {
    let cluster = FakeCluster::new();
    cluster.set_partitions(TOPIC, 3);
    let client = common::client(&cluster);

    let consumer = client.subscribe_async(TOPIC, "my-sub").await.unwrap();
    assert!(consumer.is_partitioned());
    assert_eq!(consumer.num_partitions(), 3);

    consumer.close_async().await.unwrap();
    assert_eq!(FakeCluster::count(&cluster.consumer_closes), 3);
    assert_eq!(consumer.state(), HandlerState::Closed);
    assert_eq!(client.consumers_count(), 0);

    // a second close is a no-op
    consumer.close_async().await.unwrap();
    assert_eq!(FakeCluster::count(&cluster.consumer_closes), 3);
    client.close_async().await.unwrap();
}

#[tokio::test]
async fn entity_connecting_during_close_ends_up_closed() {
    let cluster = FakeCluster::new();
    cluster.set_registration_delay(Duration::from_millis(300));
    let client = common::client(&cluster);

    let creation = client.create_producer_async(TOPIC);
    // let the pipeline register the producer and start connecting
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(client.producers_count(), 1);

    client.close_async().await.unwrap();
    assert_eq!(client.producers_count(), 0);

    match creation.await {
        Ok(producer) => assert_eq!(producer.state(), HandlerState::Closed),
        Err(e) => assert!(e.is_already_closed(), "unexpected error {e}"),
    }
    assert_eq!(client.producers_count(), 0);
}

#[tokio::test]
async fn creation_resolving_metadata_during_close_is_rejected() {
    let cluster = FakeCluster::new();
    cluster.set_metadata_delay(Duration::from_millis(200));
    let client = common::client(&cluster);

    let creation = client.subscribe_async(TOPIC, "sub");
    tokio::time::sleep(Duration::from_millis(50)).await;
    client.close_async().await.unwrap();

    let err = creation.await.unwrap_err();
    assert!(err.is_already_closed());
    assert_eq!(client.consumers_count(), 0);
    assert_eq!(FakeCluster::count(&cluster.subscriptions), 0);
}

struct FailingClose {
    closes: Arc<AtomicUsize>,
}

impl Authentication for FailingClose {
    fn auth_method_name(&self) -> String {
        "failing".to_string()
    }

    fn auth_data(&self) -> PulsarResult<AuthenticationData> {
        Ok(AuthenticationData::default())
    }

    fn start(&self) -> PulsarResult<()> {
        Ok(())
    }

    fn close(&self) -> PulsarResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Err(PulsarClientError::unknown("auth backend unavailable"))
    }
}

#[tokio::test]
async fn release_failure_fails_close_but_state_is_closed() {
    let cluster = FakeCluster::new();
    let closes = Arc::new(AtomicUsize::new(0));
    let mut config = common::config();
    config.set_authentication(Arc::new(FailingClose { closes: closes.clone() }));
    let client = PulsarClient::new(config, cluster.connector()).unwrap();
    client.create_producer_async(TOPIC).await.unwrap();

    let err = client.close_async().await.unwrap_err();
    match err {
        PulsarClientError::ShutdownFailed { failures } => {
            assert_eq!(failures.len(), 1);
            assert!(failures[0].contains("authentication"));
        }
        other => panic!("unexpected error {other}"),
    }
    assert_eq!(client.state(), ClientState::Closed);
    assert_eq!(closes.load(Ordering::SeqCst), 1);
    assert_eq!(FakeCluster::count(&cluster.producer_closes), 1);
    assert_eq!(cluster.auth_methods.lock()[0], "failing");
}

struct FailingStart;

impl Authentication for FailingStart {
    fn auth_method_name(&self) -> String {
        "failing".to_string()
    }

    fn auth_data(&self) -> PulsarResult<AuthenticationData> {
        Ok(AuthenticationData::default())
    }

    fn start(&self) -> PulsarResult<()> {
        Err(PulsarClientError::unknown("no credentials"))
    }

    fn close(&self) -> PulsarResult<()> {
        Ok(())
    }
}

#[test]
fn construction_rejects_invalid_configuration() {
    let cluster = FakeCluster::new();

    let err = PulsarClient::new(ClientConfig::new(), cluster.connector()).unwrap_err();
    assert!(matches!(err, PulsarClientError::InvalidConfiguration(_)));

    let mut config = common::config();
    config.set_authentication(Arc::new(FailingStart));
    let err = PulsarClient::new(config, cluster.connector()).unwrap_err();
    assert!(matches!(err, PulsarClientError::InvalidConfiguration(ref msg) if msg.contains("no credentials")));
}

#[test]
fn caller_supplied_runtime_still_gets_a_validated_configuration() {
    let cluster = FakeCluster::new();
    let runtime = PulsarRuntime::new_current_thread("caller-io").unwrap();
    let err = PulsarClient::with_runtime(ClientConfig::new(), cluster.connector(), runtime).unwrap_err();
    assert!(matches!(err, PulsarClientError::InvalidConfiguration(_)));

    let runtime = PulsarRuntime::new_current_thread("caller-io").unwrap();
    let client = PulsarClient::with_runtime(common::config(), cluster.connector(), runtime).unwrap();
    assert!(client.io_engine().is_none());
    client.create_producer(TOPIC).unwrap();
    client.close().unwrap();
}

#[derive(Clone, Default)]
struct CapturedLog(Arc<parking_lot::Mutex<Vec<u8>>>);

impl CapturedLog {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl io::Write for CapturedLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLog {
    type Writer = CapturedLog;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[test]
fn only_the_winning_close_reports_closing() {
    let cluster = FakeCluster::new();
    let client = common::client(&cluster);
    let log = CapturedLog::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(log.clone())
        .with_ansi(false)
        .finish();
    tracing::subscriber::with_default(subscriber, || {
        client.close().unwrap();
        for _ in 0..3 {
            assert!(client.close().unwrap_err().is_already_closed());
        }
    });
    assert_eq!(log.text().matches("Client closing").count(), 1);
}

#[test]
fn blocking_api_round_trip() {
    let cluster = FakeCluster::new();
    cluster.set_partitions(TOPIC, 2);
    let client = common::client(&cluster);
    assert!(client.io_engine().is_some());

    let producer = client.create_producer(TOPIC).unwrap();
    assert_eq!(producer.num_partitions(), 2);
    let consumer = client.subscribe(TOPIC, "sub").unwrap();
    assert!(consumer.is_connected());

    producer.close().unwrap();
    assert_eq!(client.producers_count(), 0);
    client.close().unwrap();
    assert!(client.close().unwrap_err().is_already_closed());
    assert_eq!(consumer.state(), HandlerState::Closed);
}

#[test]
fn shutdown_releases_resources_without_closing_entities() {
    let cluster = FakeCluster::new();
    let client = common::client(&cluster);
    let producer = client.create_producer(TOPIC).unwrap();

    client.shutdown().unwrap();
    assert_eq!(client.state(), ClientState::Closed);
    assert_eq!(producer.state(), HandlerState::Ready);
    assert!(client.create_producer(TOPIC).unwrap_err().is_already_closed());
    // releasing twice is harmless
    client.shutdown().unwrap();
}
