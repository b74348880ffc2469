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

use futures::future::BoxFuture;
use pulsar_common::BrokerAddress;
use pulsar_common::PartitionedTopicMetadata;
use pulsar_common::TopicName;
use pulsar_error::PulsarResult;

/// Resolves topic metadata and owning brokers. The transport (binary or
/// HTTP) is fixed when the client is built, from the service url scheme.
pub trait LookupService: Send + Sync {
    /// Resolve the broker currently serving `topic`.
    fn get_broker(&self, topic: &TopicName) -> BoxFuture<'static, PulsarResult<BrokerAddress>>;

    /// Fetch the partition count of `topic`. Non-partitioned topics report 0.
    fn get_partitioned_topic_metadata(&self, topic: &TopicName)
        -> BoxFuture<'static, PulsarResult<PartitionedTopicMetadata>>;

    fn service_url(&self) -> &str;

    /// Release transport resources owned by the lookup.
    fn close(&self) -> PulsarResult<()>;
}
