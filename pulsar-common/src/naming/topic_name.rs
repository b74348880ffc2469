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

//! Validated topic identifiers.
//!
//! Two textual forms are accepted:
//!
//! ```text
//! <domain>://<tenant>/<namespace>/<local-name>
//! <domain>://<property>/<cluster>/<namespace>/<local-name>
//! ```
//!
//! where `domain` is `persistent` or `non-persistent`. A partition of a
//! partitioned topic is addressed as `<topic>-partition-<index>`.

use std::fmt;
use std::fmt::Display;
use std::str::FromStr;

use pulsar_error::PulsarClientError;
use pulsar_error::PulsarResult;

pub const PARTITIONED_TOPIC_SUFFIX: &str = "-partition-";

const DOMAIN_SEPARATOR: &str = "://";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopicDomain {
    Persistent,
    NonPersistent,
}

impl TopicDomain {
    pub fn as_str(&self) -> &'static str {
        match self {
            TopicDomain::Persistent => "persistent",
            TopicDomain::NonPersistent => "non-persistent",
        }
    }
}

impl Display for TopicDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TopicDomain {
    type Err = PulsarClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "persistent" => Ok(TopicDomain::Persistent),
            "non-persistent" => Ok(TopicDomain::NonPersistent),
            other => Err(PulsarClientError::invalid_topic_name(other)),
        }
    }
}

/// Immutable, validated topic name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TopicName {
    complete_name: String,
    domain: TopicDomain,
    tenant: String,
    /// Only present in the legacy four-segment form
    cluster: Option<String>,
    namespace: String,
    local_name: String,
    partition_index: i32,
}

impl TopicName {
    /// Parse and validate a topic name.
    pub fn new(topic: &str) -> PulsarResult<Self> {
        Self::parse(topic).ok_or_else(|| PulsarClientError::invalid_topic_name(topic))
    }

    #[inline]
    pub fn is_valid(topic: &str) -> bool {
        Self::parse(topic).is_some()
    }

    fn parse(topic: &str) -> Option<Self> {
        let (domain, rest) = topic.split_once(DOMAIN_SEPARATOR)?;
        let domain = TopicDomain::from_str(domain).ok()?;
        let parts: Vec<&str> = rest.split('/').collect();
        let (tenant, cluster, namespace, local_name) = match parts.as_slice() {
            [tenant, namespace, local] => (*tenant, None, *namespace, *local),
            [property, cluster, namespace, local] => (*property, Some(*cluster), *namespace, *local),
            _ => return None,
        };

        if !is_valid_named_entity(tenant)
            || !cluster.is_none_or(is_valid_named_entity)
            || !is_valid_named_entity(namespace)
            || !is_valid_local_name(local_name)
        {
            return None;
        }

        Some(TopicName {
            complete_name: topic.to_string(),
            domain,
            tenant: tenant.to_string(),
            cluster: cluster.map(str::to_string),
            namespace: namespace.to_string(),
            local_name: local_name.to_string(),
            partition_index: parse_partition_index(local_name),
        })
    }

    #[inline]
    pub fn domain(&self) -> TopicDomain {
        self.domain
    }

    #[inline]
    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    #[inline]
    pub fn cluster(&self) -> Option<&str> {
        self.cluster.as_deref()
    }

    #[inline]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    #[inline]
    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.complete_name
    }

    /// `true` for the three-segment `tenant/namespace/topic` form
    #[inline]
    pub fn is_v2(&self) -> bool {
        self.cluster.is_none()
    }

    /// Index of this partition, or `-1` when the name is not a partition.
    #[inline]
    pub fn partition_index(&self) -> i32 {
        self.partition_index
    }

    #[inline]
    pub fn is_partition(&self) -> bool {
        self.partition_index >= 0
    }

    /// Name of partition `index` of this topic.
    ///
    /// Always derived from the base (non-partition) name, so calling it on a
    /// partition never stacks suffixes.
    pub fn partition(&self, index: u32) -> TopicName {
        let base_local = self.base_local_name();
        let local_name = format!("{base_local}{PARTITIONED_TOPIC_SUFFIX}{index}");
        let complete_name = match &self.cluster {
            Some(cluster) => format!(
                "{}{}{}/{}/{}/{}",
                self.domain, DOMAIN_SEPARATOR, self.tenant, cluster, self.namespace, local_name
            ),
            None => format!(
                "{}{}{}/{}/{}",
                self.domain, DOMAIN_SEPARATOR, self.tenant, self.namespace, local_name
            ),
        };
        TopicName {
            complete_name,
            domain: self.domain,
            tenant: self.tenant.clone(),
            cluster: self.cluster.clone(),
            namespace: self.namespace.clone(),
            local_name,
            partition_index: index as i32,
        }
    }

    /// Name of the partitioned topic this partition belongs to.
    pub fn partitioned_topic_name(&self) -> String {
        if !self.is_partition() {
            return self.complete_name.clone();
        }
        let suffix_len = self.local_name.len() - self.base_local_name().len();
        self.complete_name[..self.complete_name.len() - suffix_len].to_string()
    }

    /// Path segment used by the REST lookup and admin endpoints.
    pub fn lookup_path(&self) -> String {
        match &self.cluster {
            Some(cluster) => format!(
                "{}/{}/{}/{}/{}",
                self.domain, self.tenant, cluster, self.namespace, self.local_name
            ),
            None => format!("{}/{}/{}/{}", self.domain, self.tenant, self.namespace, self.local_name),
        }
    }

    fn base_local_name(&self) -> &str {
        if self.is_partition() {
            if let Some(pos) = self.local_name.rfind(PARTITIONED_TOPIC_SUFFIX) {
                return &self.local_name[..pos];
            }
        }
        &self.local_name
    }
}

impl Display for TopicName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.complete_name)
    }
}

impl FromStr for TopicName {
    type Err = PulsarClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TopicName::new(s)
    }
}

impl AsRef<str> for TopicName {
    fn as_ref(&self) -> &str {
        &self.complete_name
    }
}

/// Tenant, cluster and namespace segments: `[-=:.\w]+`
fn is_valid_named_entity(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '=' | ':' | '.' | '_'))
}

fn is_valid_local_name(name: &str) -> bool {
    !name.is_empty() && !name.chars().any(|c| c.is_whitespace() || c.is_control())
}

fn parse_partition_index(local_name: &str) -> i32 {
    local_name
        .rfind(PARTITIONED_TOPIC_SUFFIX)
        .and_then(|pos| {
            let digits = &local_name[pos + PARTITIONED_TOPIC_SUFFIX.len()..];
            if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            digits.parse::<i32>().ok()
        })
        .unwrap_or(-1)
}
