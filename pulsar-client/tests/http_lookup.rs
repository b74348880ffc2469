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

use std::collections::HashMap;
use std::sync::Arc;

use common::FakeCluster;
use parking_lot::Mutex;
use pulsar_client::AuthenticationToken;
use pulsar_client::ClientConfig;
use pulsar_client::Producer;
use pulsar_client::PulsarClient;
use pulsar_error::LookupError;
use pulsar_error::PulsarClientError;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;

const TOPIC: &str = "persistent://tenant/ns/orders";

/// Answers canned JSON bodies by request path, 404 for anything else.
struct RestBroker {
    routes: HashMap<String, String>,
    requests: Mutex<Vec<(String, Option<String>)>>,
}

impl RestBroker {
    async fn start(routes: &[(&str, &str)]) -> (Arc<Self>, String) {
        let broker = Arc::new(Self {
            routes: routes.iter().map(|(p, b)| (p.to_string(), b.to_string())).collect(),
            requests: Mutex::new(Vec::new()),
        });
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let server = broker.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(server.clone().serve(stream));
            }
        });
        (broker, url)
    }

    async fn serve(self: Arc<Self>, mut stream: tokio::net::TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
            match stream.read(&mut chunk).await {
                Ok(0) | Err(_) => return,
                Ok(n) => buf.extend_from_slice(&chunk[..n]),
            }
        }
        let head = String::from_utf8_lossy(&buf).to_string();
        let path = head
            .lines()
            .next()
            .and_then(|line| line.split_whitespace().nth(1))
            .unwrap_or_default()
            .to_string();
        let auth = head.lines().find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("authorization").then(|| value.trim().to_string())
        });
        self.requests.lock().push((path.clone(), auth));

        let response = match self.routes.get(&path) {
            Some(body) => format!(
                concat!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n",
                    "Content-Length: {}\r\nConnection: close\r\n\r\n{}"
                ),
                body.len(),
                body
            ),
            None => "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_string(),
        };
        let _ = stream.write_all(response.as_bytes()).await;
        let _ = stream.shutdown().await;
    }

    fn paths(&self) -> Vec<String> {
        self.requests.lock().iter().map(|(path, _)| path.clone()).collect()
    }
}

fn http_config(url: &str) -> ClientConfig {
    let mut config = common::config();
    config.set_service_url(url);
    config.set_authentication(Arc::new(AuthenticationToken::new("secret")));
    config
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn http_lookup_resolves_metadata_and_broker() {
    let (broker, url) = RestBroker::start(&[
        ("/admin/v2/persistent/tenant/ns/orders/partitions", r#"{"partitions":2}"#),
        (
            "/lookup/v2/topic/persistent/tenant/ns/orders-partition-0",
            r#"{"brokerUrl":"pulsar://broker:6650","httpUrl":"http://broker:8080"}"#,
        ),
        (
            "/lookup/v2/topic/persistent/tenant/ns/orders-partition-1",
            r#"{"brokerUrl":"pulsar://broker:6650","httpUrl":"http://broker:8080"}"#,
        ),
    ])
    .await;
    let cluster = FakeCluster::new();
    let client = PulsarClient::new(http_config(&url), cluster.connector()).unwrap();
    assert_eq!(client.lookup().service_url(), format!("{url}/"));

    let producer = client.create_producer_async(TOPIC).await.unwrap();
    assert!(matches!(producer, Producer::Partitioned(_)));
    assert_eq!(producer.num_partitions(), 2);

    // binary lookups are never used with an http service url
    assert_eq!(FakeCluster::count(&cluster.lookups), 0);
    assert_eq!(FakeCluster::count(&cluster.metadata_requests), 0);
    assert_eq!(FakeCluster::count(&cluster.producers_registered), 2);

    let mut paths = broker.paths();
    paths.sort();
    assert_eq!(
        paths,
        vec![
            "/admin/v2/persistent/tenant/ns/orders/partitions",
            "/lookup/v2/topic/persistent/tenant/ns/orders-partition-0",
            "/lookup/v2/topic/persistent/tenant/ns/orders-partition-1",
        ]
    );
    assert!(broker
        .requests
        .lock()
        .iter()
        .all(|(_, auth)| auth.as_deref() == Some("Bearer secret")));

    client.close_async().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn http_lookup_maps_missing_topic() {
    let (_broker, url) = RestBroker::start(&[]).await;
    let cluster = FakeCluster::new();
    let client = PulsarClient::new(http_config(&url), cluster.connector()).unwrap();

    let err = client.get_partitioned_topic_metadata(TOPIC).await.unwrap_err();
    assert!(matches!(
        err,
        PulsarClientError::Lookup(LookupError::TopicNotFound { ref topic }) if topic == TOPIC
    ));

    let err = client.subscribe_async(TOPIC, "sub").await.unwrap_err();
    assert!(err.is_lookup_failure());
    assert_eq!(client.consumers_count(), 0);
    assert_eq!(cluster.network_calls(), 0);

    client.close_async().await.unwrap();
    let err = client.lookup().get_partitioned_topic_metadata(&TOPIC.parse().unwrap()).await.unwrap_err();
    assert!(matches!(err, PulsarClientError::AlreadyClosed("HTTP client")));
}

#[test]
fn lookup_entry_points_work_outside_an_async_context() {
    let cluster = FakeCluster::new();
    // nothing listens on the discard port
    let client = PulsarClient::new(http_config("http://127.0.0.1:9"), cluster.connector()).unwrap();

    let err = futures::executor::block_on(client.get_partitioned_topic_metadata(TOPIC)).unwrap_err();
    assert!(err.is_lookup_failure(), "{err}");
    let err = futures::executor::block_on(client.get_connection(TOPIC)).err().unwrap();
    assert!(err.is_lookup_failure(), "{err}");

    client.close().unwrap();
}
