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

//! Seam to the binary transport.
//!
//! The wire protocol is not part of this crate: a [`Connector`] opens
//! [`ClientConnection`]s, and everything above the pool talks to brokers
//! only through that trait.

use std::sync::Arc;

use futures::future::BoxFuture;
use pulsar_common::BrokerAddress;
use pulsar_common::PartitionedTopicMetadata;
use pulsar_common::TopicName;
use pulsar_error::PulsarResult;

use crate::base::authentication::AuthenticationData;
use crate::consumer::consumer_config::SubscriptionType;

/// Everything a transport needs to open one broker connection.
#[derive(Debug, Clone)]
pub struct ConnectRequest {
    pub address: BrokerAddress,
    pub use_tls: bool,
    pub tls_allow_insecure_connection: bool,
    pub tls_trust_certs_file_path: Option<String>,
    pub auth_method_name: String,
    pub auth_data: AuthenticationData,
}

/// Answer to a binary topic lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupDataResult {
    pub broker_url: Option<String>,
    pub broker_url_tls: Option<String>,
    pub authoritative: bool,
    /// The answering broker does not own the topic, ask `broker_url` instead
    pub redirect: bool,
}

#[derive(Debug, Clone)]
pub struct ProducerCommand {
    pub request_id: u64,
    pub producer_id: u64,
    pub topic: TopicName,
    pub producer_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SubscribeCommand {
    pub request_id: u64,
    pub consumer_id: u64,
    pub topic: TopicName,
    pub subscription: String,
    pub subscription_type: SubscriptionType,
    pub consumer_name: Option<String>,
    pub receiver_queue_size: u32,
}

pub trait ClientConnection: Send + Sync {
    fn remote_address(&self) -> &BrokerAddress;

    fn is_active(&self) -> bool;

    fn lookup(&self, request_id: u64, topic: &TopicName, authoritative: bool)
        -> BoxFuture<'static, PulsarResult<LookupDataResult>>;

    fn partitioned_metadata(
        &self,
        request_id: u64,
        topic: &TopicName,
    ) -> BoxFuture<'static, PulsarResult<PartitionedTopicMetadata>>;

    /// Registers a producer and resolves with the producer name the broker assigned.
    fn register_producer(&self, command: ProducerCommand) -> BoxFuture<'static, PulsarResult<String>>;

    fn subscribe(&self, command: SubscribeCommand) -> BoxFuture<'static, PulsarResult<()>>;

    fn close_producer(&self, request_id: u64, producer_id: u64) -> BoxFuture<'static, PulsarResult<()>>;

    fn close_consumer(&self, request_id: u64, consumer_id: u64) -> BoxFuture<'static, PulsarResult<()>>;

    fn close(&self);
}

pub trait Connector: Send + Sync {
    fn connect(&self, request: ConnectRequest) -> BoxFuture<'static, PulsarResult<Arc<dyn ClientConnection>>>;
}
