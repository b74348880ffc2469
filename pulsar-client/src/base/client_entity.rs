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
use pulsar_common::TopicName;
use pulsar_error::PulsarResult;

use crate::base::handler_state::HandlerState;
use crate::factory::entity_registry::RegisteredEntity;

/// Lifecycle contract shared by producers and consumers, plain or partitioned.
pub trait ClientEntity: RegisteredEntity {
    fn topic(&self) -> &TopicName;

    fn state(&self) -> HandlerState;

    /// Register with the owning broker(s). Runs once, right after the entity
    /// is added to its registry.
    fn connect(&self) -> BoxFuture<'static, PulsarResult<()>>;

    /// Idempotent. When the returned future resolves the entity is closed and
    /// no longer registered with the client.
    fn close_async(&self) -> BoxFuture<'static, PulsarResult<()>>;

    fn is_closed(&self) -> bool {
        self.state() == HandlerState::Closed
    }
}
