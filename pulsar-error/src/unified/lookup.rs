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

//! Lookup-related errors for broker and metadata resolution

use std::error::Error as StdError;
use std::sync::Arc;

use thiserror::Error;

/// Errors raised while resolving a topic's owner or its partition count
#[derive(Debug, Clone, Error)]
pub enum LookupError {
    /// The topic does not exist on the cluster
    #[error("Topic not found: {topic}")]
    TopicNotFound { topic: String },

    /// Lookup endpoint answered with a non-success HTTP status
    #[error("Lookup request to {url} failed with HTTP status {status}")]
    HttpStatus { url: String, status: u16 },

    /// Transport-level failure reaching the lookup endpoint
    #[error("Lookup transport failure against {endpoint}: {reason}")]
    Transport {
        endpoint: String,
        reason: String,
        #[source]
        source: Option<Arc<dyn StdError + Send + Sync>>,
    },

    /// Response could not be interpreted
    #[error("Invalid lookup response for {topic}: {reason}")]
    InvalidResponse { topic: String, reason: String },

    /// Broker kept redirecting the lookup
    #[error("Too many lookup redirects ({hops}) for {topic}")]
    TooManyRedirects { topic: String, hops: u32 },

    /// Broker reported a failure for the lookup request
    #[error("Broker refused lookup for {topic}: {message}")]
    ServiceNotReady { topic: String, message: String },
}

impl LookupError {
    #[inline]
    pub fn topic_not_found(topic: impl Into<String>) -> Self {
        Self::TopicNotFound { topic: topic.into() }
    }

    #[inline]
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus { url: url.into(), status }
    }

    /// Create a transport failure, keeping the underlying error as cause
    pub fn transport<E>(endpoint: impl Into<String>, err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::Transport {
            endpoint: endpoint.into(),
            reason: err.to_string(),
            source: Some(Arc::new(err)),
        }
    }

    #[inline]
    pub fn invalid_response(topic: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            topic: topic.into(),
            reason: reason.into(),
        }
    }

    #[inline]
    pub fn service_not_ready(topic: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ServiceNotReady {
            topic: topic.into(),
            message: message.into(),
        }
    }

    /// Transport hiccups and not-ready brokers are worth another attempt
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::ServiceNotReady { .. })
            || matches!(self, Self::HttpStatus { status, .. } if *status >= 500)
    }
}
