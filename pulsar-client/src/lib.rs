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

//! Client orchestration core.
//!
//! [`PulsarClient`](factory::pulsar_client_impl::PulsarClient) resolves topic
//! metadata, acquires pooled broker connections, builds plain or partitioned
//! producers and consumers, keeps every live entity in a registry and closes
//! them all on shutdown.

pub mod base;
pub mod consumer;
pub mod factory;
pub mod implementation;
pub mod producer;

pub use crate::base::authentication::Authentication;
pub use crate::base::authentication::AuthenticationData;
pub use crate::base::authentication::AuthenticationDisabled;
pub use crate::base::authentication::AuthenticationToken;
pub use crate::base::client_config::ClientConfig;
pub use crate::base::client_entity::ClientEntity;
pub use crate::base::handler_state::HandlerState;
pub use crate::consumer::consumer_base::Consumer;
pub use crate::consumer::consumer_config::ConsumerConfig;
pub use crate::consumer::consumer_config::SubscriptionType;
pub use crate::factory::client_state::ClientState;
pub use crate::factory::pulsar_client_impl::PulsarClient;
pub use crate::implementation::connection::ClientConnection;
pub use crate::implementation::connection::ConnectRequest;
pub use crate::implementation::connection::Connector;
pub use crate::producer::producer_base::Producer;
pub use crate::producer::producer_config::ProducerConfig;
