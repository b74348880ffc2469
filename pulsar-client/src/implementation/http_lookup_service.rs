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

//! Lookup over the broker REST API.

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use pulsar_common::BrokerAddress;
use pulsar_common::PartitionedTopicMetadata;
use pulsar_common::TopicName;
use pulsar_error::LookupError;
use pulsar_error::PulsarResult;
use serde::Deserialize;

use crate::implementation::http_client::HttpClient;
use crate::implementation::lookup_service::LookupService;

/// Body of a REST topic lookup.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupData {
    #[serde(default)]
    pub broker_url: Option<String>,
    #[serde(default)]
    pub broker_url_tls: Option<String>,
    #[serde(default)]
    pub http_url: Option<String>,
    #[serde(default)]
    pub http_url_tls: Option<String>,
}

pub struct HttpLookupService {
    http_client: Arc<HttpClient>,
    use_tls: bool,
}

impl HttpLookupService {
    pub fn new(http_client: HttpClient, use_tls: bool) -> Self {
        Self {
            http_client: Arc::new(http_client),
            use_tls,
        }
    }

    pub fn lookup_path(topic: &TopicName) -> String {
        if topic.is_v2() {
            format!("lookup/v2/topic/{}", topic.lookup_path())
        } else {
            format!("lookup/v2/destination/{}", topic.lookup_path())
        }
    }

    pub fn partitions_path(topic: &TopicName) -> String {
        if topic.is_v2() {
            format!("admin/v2/{}/partitions", topic.lookup_path())
        } else {
            format!("admin/{}/partitions", topic.lookup_path())
        }
    }
}

impl LookupService for HttpLookupService {
    fn get_broker(&self, topic: &TopicName) -> BoxFuture<'static, PulsarResult<BrokerAddress>> {
        let use_tls = self.use_tls;
        let topic_name = topic.to_string();
        let request = self.http_client.get::<LookupData>(&Self::lookup_path(topic), &topic_name);
        async move {
            let data = request.await?;
            let url = if use_tls { data.broker_url_tls } else { data.broker_url };
            let url = url.ok_or_else(|| LookupError::invalid_response(topic_name.as_str(), "missing broker url"))?;
            BrokerAddress::from_url(&url).map_err(|e| LookupError::invalid_response(topic_name, e.to_string()).into())
        }
        .boxed()
    }

    fn get_partitioned_topic_metadata(
        &self,
        topic: &TopicName,
    ) -> BoxFuture<'static, PulsarResult<PartitionedTopicMetadata>> {
        self.http_client
            .get::<PartitionedTopicMetadata>(&Self::partitions_path(topic), topic.as_str())
    }

    fn service_url(&self) -> &str {
        self.http_client.service_url()
    }

    fn close(&self) -> PulsarResult<()> {
        self.http_client.close();
        Ok(())
    }
}
