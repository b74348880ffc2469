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

//! Lookup over the binary protocol, through pooled broker connections.

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use pulsar_common::BrokerAddress;
use pulsar_common::PartitionedTopicMetadata;
use pulsar_common::ServiceUrl;
use pulsar_common::TopicName;
use pulsar_error::LookupError;
use pulsar_error::PulsarClientError;
use pulsar_error::PulsarResult;
use tracing::debug;

use crate::factory::id_generator::next_request_id;
use crate::implementation::connection::LookupDataResult;
use crate::implementation::connection_pool::ConnectionPool;
use crate::implementation::lookup_service::LookupService;

/// Redirects followed before a lookup gives up.
pub const MAX_LOOKUP_REDIRECTS: u32 = 20;

pub struct BinaryProtoLookupService {
    cnx_pool: Arc<ConnectionPool>,
    service_url: ServiceUrl,
    use_tls: bool,
}

impl BinaryProtoLookupService {
    pub fn new(cnx_pool: Arc<ConnectionPool>, service_url: ServiceUrl, use_tls: bool) -> Self {
        Self {
            cnx_pool,
            service_url,
            use_tls,
        }
    }
}

impl LookupService for BinaryProtoLookupService {
    fn get_broker(&self, topic: &TopicName) -> BoxFuture<'static, PulsarResult<BrokerAddress>> {
        find_broker(
            self.cnx_pool.clone(),
            self.service_url.address().clone(),
            self.use_tls,
            topic.clone(),
        )
        .boxed()
    }

    fn get_partitioned_topic_metadata(
        &self,
        topic: &TopicName,
    ) -> BoxFuture<'static, PulsarResult<PartitionedTopicMetadata>> {
        let cnx_pool = self.cnx_pool.clone();
        let address = self.service_url.address().clone();
        let topic = topic.clone();
        async move {
            let cnx = cnx_pool
                .get_connection(&address)
                .await
                .map_err(|e| transport_failure(&address, e))?;
            cnx.partitioned_metadata(next_request_id(), &topic)
                .await
                .map_err(|e| transport_failure(&address, e))
        }
        .boxed()
    }

    fn service_url(&self) -> &str {
        self.service_url.as_str()
    }

    fn close(&self) -> PulsarResult<()> {
        Ok(())
    }
}

async fn find_broker(
    cnx_pool: Arc<ConnectionPool>,
    service_address: BrokerAddress,
    use_tls: bool,
    topic: TopicName,
) -> PulsarResult<BrokerAddress> {
    let mut address = service_address;
    let mut authoritative = false;
    for hop in 0..=MAX_LOOKUP_REDIRECTS {
        let cnx = cnx_pool
            .get_connection(&address)
            .await
            .map_err(|e| transport_failure(&address, e))?;
        let result = cnx
            .lookup(next_request_id(), &topic, authoritative)
            .await
            .map_err(|e| transport_failure(&address, e))?;
        let broker = select_broker(&topic, &result, use_tls)?;
        if !result.redirect {
            debug!("[{}] Lookup resolved to {} after {} redirects", topic, broker, hop);
            return Ok(broker);
        }
        debug!("[{}] Lookup redirected from {} to {}", topic, address, broker);
        address = broker;
        authoritative = result.authoritative;
    }
    Err(LookupError::TooManyRedirects {
        topic: topic.to_string(),
        hops: MAX_LOOKUP_REDIRECTS,
    }
    .into())
}

/// Failures talking to `endpoint` become lookup failures caused by the
/// original error. Lookup, lifecycle and configuration errors pass through.
fn transport_failure(endpoint: &BrokerAddress, err: PulsarClientError) -> PulsarClientError {
    match err {
        PulsarClientError::Lookup(_)
        | PulsarClientError::AlreadyClosed(_)
        | PulsarClientError::InvalidConfiguration(_)
        | PulsarClientError::Interrupted(_) => err,
        other => LookupError::transport(endpoint.to_string(), other).into(),
    }
}

fn select_broker(topic: &TopicName, result: &LookupDataResult, use_tls: bool) -> PulsarResult<BrokerAddress> {
    let url = if use_tls {
        result.broker_url_tls.as_deref()
    } else {
        result.broker_url.as_deref()
    };
    let url = url.ok_or_else(|| {
        LookupError::invalid_response(
            topic.as_str(),
            if use_tls { "missing tls broker url" } else { "missing broker url" },
        )
    })?;
    BrokerAddress::from_url(url)
        .map_err(|e| LookupError::invalid_response(topic.as_str(), e.to_string()).into())
}

#[cfg(test)]
mod tests {
    use std::error::Error as StdError;

    use super::*;
    use crate::base::client_config::ClientConfig;
    use crate::implementation::connection::ClientConnection;
    use crate::implementation::connection::ConnectRequest;
    use crate::implementation::connection::Connector;

    struct TimingOutConnector;

    impl Connector for TimingOutConnector {
        fn connect(&self, _: ConnectRequest) -> BoxFuture<'static, PulsarResult<Arc<dyn ClientConnection>>> {
            futures::future::ready(Err(PulsarClientError::timeout("connect", 5))).boxed()
        }
    }

    fn unreachable_lookup() -> BinaryProtoLookupService {
        let pool = Arc::new(ConnectionPool::new(Arc::new(TimingOutConnector), &ClientConfig::new()));
        let service_url = ServiceUrl::parse("pulsar://broker:6650").unwrap();
        BinaryProtoLookupService::new(pool, service_url, false)
    }

    fn assert_transport_failure(err: PulsarClientError) {
        assert!(matches!(
            err,
            PulsarClientError::Lookup(LookupError::Transport { ref endpoint, .. }) if endpoint == "broker:6650"
        ));
        assert!(err.is_retriable());
        let cause = StdError::source(&err).map(ToString::to_string);
        assert_eq!(cause.as_deref(), Some("Operation 'connect' timed out after 5ms"));
    }

    #[tokio::test]
    async fn connect_failures_surface_as_lookup_transport_errors() {
        let lookup = unreachable_lookup();
        assert_transport_failure(lookup.get_partitioned_topic_metadata(&topic()).await.unwrap_err());
        assert_transport_failure(lookup.get_broker(&topic()).await.unwrap_err());
    }

    #[test]
    fn lifecycle_and_lookup_errors_pass_through() {
        let address = BrokerAddress::new("broker", 6650);
        let closed = transport_failure(&address, PulsarClientError::AlreadyClosed("Connection pool"));
        assert!(closed.is_already_closed());
        let missing = transport_failure(&address, LookupError::topic_not_found("t").into());
        assert!(matches!(missing, PulsarClientError::Lookup(LookupError::TopicNotFound { .. })));
    }

    fn topic() -> TopicName {
        TopicName::new("persistent://public/default/t").unwrap()
    }

    #[test]
    fn select_broker_honours_tls() {
        let result = LookupDataResult {
            broker_url: Some("pulsar://b1:6650".to_string()),
            broker_url_tls: Some("pulsar+ssl://b1:6651".to_string()),
            ..Default::default()
        };
        assert_eq!(select_broker(&topic(), &result, false).unwrap(), BrokerAddress::new("b1", 6650));
        assert_eq!(select_broker(&topic(), &result, true).unwrap(), BrokerAddress::new("b1", 6651));
    }

    #[test]
    fn select_broker_without_url_is_invalid_response() {
        let result = LookupDataResult {
            broker_url: Some("pulsar://b1:6650".to_string()),
            ..Default::default()
        };
        let err = select_broker(&topic(), &result, true).unwrap_err();
        assert!(matches!(
            err,
            PulsarClientError::Lookup(LookupError::InvalidResponse { .. })
        ));
    }
}
