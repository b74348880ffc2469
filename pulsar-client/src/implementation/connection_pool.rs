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

//! Broker connection pool.
//!
//! # Features
//!
//! - **Connection Reuse**: one long-lived connection per `(broker, slot)`
//! - **Connect Coalescing**: concurrent requests for the same key share one
//!   in-flight connect
//! - **Self Healing**: failed connects and inactive connections are evicted,
//!   the next request reconnects
//! - **Concurrency**: lock-free reads via DashMap
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │             ConnectionPool                           │
//! ├──────────────────────────────────────────────────────┤
//! │  DashMap                                             │
//! │  (broker, slot) -> Shared<connect future>            │
//! │           │                                          │
//! │           ↓                                          │
//! │  Connector::connect(ConnectRequest)                  │
//! │           │                                          │
//! │           ↓                                          │
//! │  Arc<dyn ClientConnection>                           │
//! └──────────────────────────────────────────────────────┘
//! ```

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::BoxFuture;
use futures::future::Shared;
use futures::FutureExt;
use pulsar_common::BrokerAddress;
use pulsar_error::PulsarClientError;
use pulsar_error::PulsarResult;
use rand::Rng;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::base::authentication::Authentication;
use crate::base::client_config::ClientConfig;
use crate::implementation::connection::ClientConnection;
use crate::implementation::connection::ConnectRequest;
use crate::implementation::connection::Connector;

type PoolKey = (BrokerAddress, usize);

/// Outcome of a connect shared by every waiter. Each waiter gets its own copy
/// of the connector's error, kind and cause intact.
type ConnectFuture = Shared<BoxFuture<'static, PulsarResult<Arc<dyn ClientConnection>>>>;

/// TLS and authentication settings applied to every connect.
struct ConnectSettings {
    use_tls: bool,
    tls_allow_insecure_connection: bool,
    tls_trust_certs_file_path: Option<String>,
    authentication: Arc<dyn Authentication>,
}

pub struct ConnectionPool {
    connector: Arc<dyn Connector>,
    settings: ConnectSettings,
    connections: Arc<DashMap<PoolKey, ConnectFuture>>,
    max_connections_per_host: usize,
    closed: Arc<AtomicBool>,
}

impl ConnectionPool {
    pub fn new(connector: Arc<dyn Connector>, config: &ClientConfig) -> Self {
        Self {
            connector,
            settings: ConnectSettings {
                use_tls: config.use_tls,
                tls_allow_insecure_connection: config.tls_allow_insecure_connection,
                tls_trust_certs_file_path: config.tls_trust_certs_file_path.clone(),
                authentication: config.authentication.clone(),
            },
            connections: Arc::new(DashMap::with_capacity(16)),
            max_connections_per_host: config.connections_per_broker.max(1),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get a pooled connection to `address`, connecting if needed.
    pub fn get_connection(
        &self,
        address: &BrokerAddress,
    ) -> BoxFuture<'static, PulsarResult<Arc<dyn ClientConnection>>> {
        if self.closed.load(Ordering::Acquire) {
            return futures::future::ready(Err(PulsarClientError::AlreadyClosed("Connection pool"))).boxed();
        }

        let key = (address.clone(), self.random_slot());
        let connect = match self.connections.entry(key.clone()) {
            Entry::Occupied(mut entry) => {
                let stale = matches!(entry.get().peek(), Some(Ok(cnx)) if !cnx.is_active());
                if stale {
                    debug!("Evicting inactive connection to {} slot {}", key.0, key.1);
                    let connect = self.create_connection(address);
                    entry.insert(connect.clone());
                    connect
                } else {
                    entry.get().clone()
                }
            }
            Entry::Vacant(entry) => {
                let connect = self.create_connection(address);
                entry.insert(connect.clone());
                connect
            }
        };

        let connections = self.connections.clone();
        let closed = self.closed.clone();
        async move {
            match connect.clone().await {
                Ok(cnx) => {
                    if closed.load(Ordering::Acquire) {
                        cnx.close();
                        return Err(PulsarClientError::AlreadyClosed("Connection pool"));
                    }
                    Ok(cnx)
                }
                Err(e) => {
                    connections.remove_if(&key, |_, cached| cached.ptr_eq(&connect));
                    Err(e)
                }
            }
        }
        .boxed()
    }

    fn random_slot(&self) -> usize {
        if self.max_connections_per_host == 1 {
            0
        } else {
            rand::rng().random_range(0..self.max_connections_per_host)
        }
    }

    fn create_connection(&self, address: &BrokerAddress) -> ConnectFuture {
        let request = self.connect_request(address);
        let connector = self.connector.clone();
        let address = address.clone();
        async move {
            let request = request?;
            debug!("Opening connection to {}", address);
            match connector.connect(request).await {
                Ok(cnx) => {
                    info!("Connected to broker {}", address);
                    Ok(cnx)
                }
                Err(e) => {
                    warn!("Failed to connect to broker {}: {}", address, e);
                    Err(e)
                }
            }
        }
        .boxed()
        .shared()
    }

    /// Authentication data failures are configuration errors.
    fn connect_request(&self, address: &BrokerAddress) -> PulsarResult<ConnectRequest> {
        let auth_data = self.settings.authentication.auth_data().map_err(|e| match e {
            PulsarClientError::InvalidConfiguration(_) => e,
            other => PulsarClientError::invalid_configuration(format!("failed to get authentication data: {other}")),
        })?;
        Ok(ConnectRequest {
            address: address.clone(),
            use_tls: self.settings.use_tls,
            tls_allow_insecure_connection: self.settings.tls_allow_insecure_connection,
            tls_trust_certs_file_path: self.settings.tls_trust_certs_file_path.clone(),
            auth_method_name: self.settings.authentication.auth_method_name(),
            auth_data,
        })
    }

    /// Drop cached connections that are no longer active.
    ///
    /// # Returns
    ///
    /// Number of connections evicted
    pub fn evict_inactive(&self) -> usize {
        let before = self.connections.len();
        self.connections
            .retain(|_, connect| !matches!(connect.peek(), Some(Ok(cnx)) if !cnx.is_active()));
        let evicted = before.saturating_sub(self.connections.len());
        if evicted > 0 {
            info!("Evicted {} inactive connections", evicted);
        }
        evicted
    }

    /// Close every established connection and empty the pool. New requests
    /// fail with `AlreadyClosed` afterwards.
    pub fn close_all(&self) {
        self.closed.store(true, Ordering::Release);
        for entry in self.connections.iter() {
            if let Some(Ok(cnx)) = entry.value().peek() {
                cnx.close();
            }
        }
        self.connections.clear();
        debug!("Connection pool closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> PoolStats {
        let mut active = 0;
        let mut pending = 0;
        for entry in self.connections.iter() {
            match entry.value().peek() {
                Some(Ok(cnx)) if cnx.is_active() => active += 1,
                None => pending += 1,
                _ => {}
            }
        }
        PoolStats {
            total: self.connections.len(),
            active,
            pending,
            max_connections_per_host: self.max_connections_per_host,
        }
    }
}

/// Pool statistics snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Total number of cached entries
    pub total: usize,

    /// Established connections reporting active
    pub active: usize,

    /// Connects still in flight
    pub pending: usize,

    /// Configured connections per broker
    pub max_connections_per_host: usize,
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use futures::future::BoxFuture;
    use pulsar_common::PartitionedTopicMetadata;
    use pulsar_common::TopicName;

    use super::*;
    use crate::implementation::connection::LookupDataResult;
    use crate::implementation::connection::ProducerCommand;
    use crate::implementation::connection::SubscribeCommand;

    struct TestConnection {
        address: BrokerAddress,
        active: AtomicBool,
        closed: AtomicUsize,
    }

    impl ClientConnection for TestConnection {
        fn remote_address(&self) -> &BrokerAddress {
            &self.address
        }

        fn is_active(&self) -> bool {
            self.active.load(Ordering::SeqCst)
        }

        fn lookup(&self, _: u64, _: &TopicName, _: bool) -> BoxFuture<'static, PulsarResult<LookupDataResult>> {
            futures::future::ready(Ok(LookupDataResult::default())).boxed()
        }

        fn partitioned_metadata(
            &self,
            _: u64,
            _: &TopicName,
        ) -> BoxFuture<'static, PulsarResult<PartitionedTopicMetadata>> {
            futures::future::ready(Ok(PartitionedTopicMetadata::new(0))).boxed()
        }

        fn register_producer(&self, _: ProducerCommand) -> BoxFuture<'static, PulsarResult<String>> {
            futures::future::ready(Ok("p".to_string())).boxed()
        }

        fn subscribe(&self, _: SubscribeCommand) -> BoxFuture<'static, PulsarResult<()>> {
            futures::future::ready(Ok(())).boxed()
        }

        fn close_producer(&self, _: u64, _: u64) -> BoxFuture<'static, PulsarResult<()>> {
            futures::future::ready(Ok(())).boxed()
        }

        fn close_consumer(&self, _: u64, _: u64) -> BoxFuture<'static, PulsarResult<()>> {
            futures::future::ready(Ok(())).boxed()
        }

        fn close(&self) {
            self.active.store(false, Ordering::SeqCst);
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct TestConnector {
        connects: AtomicUsize,
        fail_next: parking_lot::Mutex<Option<PulsarClientError>>,
        opened: parking_lot::Mutex<Vec<Arc<TestConnection>>>,
    }

    impl Connector for TestConnector {
        fn connect(&self, request: ConnectRequest) -> BoxFuture<'static, PulsarResult<Arc<dyn ClientConnection>>> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            if let Some(err) = self.fail_next.lock().take() {
                return async move {
                    tokio::task::yield_now().await;
                    Err(err)
                }
                .boxed();
            }
            let cnx = Arc::new(TestConnection {
                address: request.address,
                active: AtomicBool::new(true),
                closed: AtomicUsize::new(0),
            });
            self.opened.lock().push(cnx.clone());
            let cnx: Arc<dyn ClientConnection> = cnx;
            async move {
                tokio::task::yield_now().await;
                Ok(cnx)
            }
            .boxed()
        }
    }

    fn pool(connector: Arc<TestConnector>, per_host: usize) -> ConnectionPool {
        let mut config = ClientConfig::new();
        config.connections_per_broker = per_host;
        ConnectionPool::new(connector, &config)
    }

    fn broker() -> BrokerAddress {
        BrokerAddress::new("broker-1", 6650)
    }

    #[tokio::test]
    async fn concurrent_requests_share_one_connect() {
        let connector = Arc::new(TestConnector::default());
        let pool = pool(connector.clone(), 1);

        let (a, b) = tokio::join!(pool.get_connection(&broker()), pool.get_connection(&broker()));
        let (a, b) = (a.unwrap(), b.unwrap());
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(connector.connects.load(Ordering::SeqCst), 1);
        assert_eq!(pool.stats().active, 1);
    }

    #[tokio::test]
    async fn failed_connect_is_evicted_and_retried() {
        let connector = Arc::new(TestConnector::default());
        *connector.fail_next.lock() = Some(PulsarClientError::connect_failed("broker-1:6650", "connection refused"));
        let pool = pool(connector.clone(), 1);

        let err = pool.get_connection(&broker()).await.err().unwrap();
        assert!(matches!(err, PulsarClientError::Connect { ref reason, .. } if reason == "connection refused"));
        assert_eq!(pool.stats().total, 0);

        assert!(pool.get_connection(&broker()).await.is_ok());
        assert_eq!(connector.connects.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn connector_errors_reach_every_waiter_unchanged() {
        let connector = Arc::new(TestConnector::default());
        *connector.fail_next.lock() = Some(PulsarClientError::wrap(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "reset by peer",
        )));
        let pool = pool(connector.clone(), 1);

        let (a, b) = tokio::join!(pool.get_connection(&broker()), pool.get_connection(&broker()));
        for err in [a.err().unwrap(), b.err().unwrap()] {
            assert!(matches!(err, PulsarClientError::Unknown { ref message, .. } if message == "reset by peer"));
            assert!(std::error::Error::source(&err).is_some());
        }
        assert_eq!(connector.connects.load(Ordering::SeqCst), 1);

        *connector.fail_next.lock() = Some(PulsarClientError::timeout("connect", 5));
        let err = pool.get_connection(&broker()).await.err().unwrap();
        assert!(matches!(err, PulsarClientError::Timeout { operation: "connect", timeout_ms: 5 }));
    }

    #[tokio::test]
    async fn authentication_data_failure_is_a_configuration_error() {
        let mut auth = crate::base::authentication::MockAuthentication::new();
        auth.expect_auth_data()
            .returning(|| Err(PulsarClientError::unknown("token provider unavailable")));
        let connector = Arc::new(TestConnector::default());
        let mut config = ClientConfig::new();
        config.set_authentication(Arc::new(auth));
        let pool = ConnectionPool::new(connector.clone(), &config);

        let err = pool.get_connection(&broker()).await.err().unwrap();
        assert!(matches!(
            err,
            PulsarClientError::InvalidConfiguration(ref msg) if msg.contains("token provider unavailable")
        ));
        assert_eq!(connector.connects.load(Ordering::SeqCst), 0);
        assert_eq!(pool.stats().total, 0);
    }

    #[tokio::test]
    async fn inactive_connection_is_replaced() {
        let connector = Arc::new(TestConnector::default());
        let pool = pool(connector.clone(), 1);

        let first = pool.get_connection(&broker()).await.unwrap();
        first.close();
        let second = pool.get_connection(&broker()).await.unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(connector.connects.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn slots_stay_within_configured_range() {
        let connector = Arc::new(TestConnector::default());
        let pool = pool(connector.clone(), 3);
        for _ in 0..32 {
            pool.get_connection(&broker()).await.unwrap();
        }
        assert!(pool.stats().total <= 3);
        assert_eq!(pool.stats().max_connections_per_host, 3);
    }

    #[tokio::test]
    async fn close_all_closes_connections_and_rejects_new_requests() {
        let connector = Arc::new(TestConnector::default());
        let pool = pool(connector.clone(), 1);
        pool.get_connection(&broker()).await.unwrap();
        pool.get_connection(&BrokerAddress::new("broker-2", 6650)).await.unwrap();

        pool.close_all();
        assert!(pool.is_closed());
        assert_eq!(pool.stats().total, 0);
        for cnx in connector.opened.lock().iter() {
            assert_eq!(cnx.closed.load(Ordering::SeqCst), 1);
        }
        let err = pool.get_connection(&broker()).await.err().unwrap();
        assert!(err.is_already_closed());
    }

    #[tokio::test]
    async fn evict_inactive_drops_dead_connections() {
        let connector = Arc::new(TestConnector::default());
        let pool = pool(connector.clone(), 1);
        let cnx = pool.get_connection(&broker()).await.unwrap();
        assert_eq!(pool.evict_inactive(), 0);
        cnx.close();
        assert_eq!(pool.evict_inactive(), 1);
        assert_eq!(pool.stats().total, 0);
    }
}
