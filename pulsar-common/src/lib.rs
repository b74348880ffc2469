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

pub mod log;
pub mod naming;
pub mod partition;

pub use naming::service_url::BrokerAddress;
pub use naming::service_url::ServiceScheme;
pub use naming::service_url::ServiceUrl;
pub use naming::topic_name::TopicDomain;
pub use naming::topic_name::TopicName;
pub use partition::partitioned_topic_metadata::PartitionedTopicMetadata;
