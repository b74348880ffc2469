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

use serde::Deserialize;
use serde::Serialize;

/// Partition count of a topic.
///
/// `0` and `1` both denote a non-partitioned topic; fan-out only happens for
/// counts greater than one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionedTopicMetadata {
    #[serde(default)]
    pub partitions: u32,
}

impl PartitionedTopicMetadata {
    #[inline]
    pub fn new(partitions: u32) -> Self {
        Self { partitions }
    }

    /// Whether the topic must be addressed as an aggregate of partitions.
    #[inline]
    pub fn is_partitioned(&self) -> bool {
        self.partitions > 1
    }
}
