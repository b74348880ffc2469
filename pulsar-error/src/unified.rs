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

//! Unified error family for the Pulsar client core
//!
//! All errors surfaced to applications are variants of [`PulsarClientError`].
//! Lookup failures carry a nested [`LookupError`] describing the transport or
//! broker-side cause.

mod lookup;

use std::error::Error as StdError;
use std::sync::Arc;

pub use lookup::LookupError;
use thiserror::Error;

/// Main error type for all client operations
///
/// # Examples
///
/// ```rust
/// use pulsar_error::LookupError;
/// use pulsar_error::PulsarClientError;
///
/// let err = PulsarClientError::from(LookupError::topic_not_found("persistent://t/ns/a"));
/// assert!(err.is_lookup_failure());
/// assert!(!err.is_already_closed());
/// ```
#[derive(Debug, Clone, Error)]
pub enum PulsarClientError {
    // ============================================================================
    // Lifecycle Errors
    // ============================================================================
    /// Operation attempted while the client (or entity) is not open
    #[error("{0} already closed")]
    AlreadyClosed(&'static str),

    // ============================================================================
    // Validation Errors
    // ============================================================================
    /// Missing or invalid configuration, or authentication setup failure
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Malformed topic identifier
    #[error("Invalid topic name: '{0}'")]
    InvalidTopicName(String),

    /// Missing or empty subscription on subscribe
    #[error("Invalid subscription name")]
    InvalidSubscriptionName,

    // ============================================================================
    // Lookup / Transport Errors
    // ============================================================================
    /// Metadata or broker resolution failed
    #[error(transparent)]
    Lookup(#[from] LookupError),

    /// Connection to a broker could not be established
    #[error("Connection failed to {addr}: {reason}")]
    Connect { addr: String, reason: String },

    /// Broker rejected a request
    #[error("Broker error on '{operation}': {message}")]
    Broker { operation: &'static str, message: String },

    /// Operation did not complete in time
    #[error("Operation '{operation}' timed out after {timeout_ms}ms")]
    Timeout { operation: &'static str, timeout_ms: u64 },

    // ============================================================================
    // Wrapped Errors
    // ============================================================================
    /// The task driving an operation was cancelled before completion
    #[error("Interrupted while waiting for {0}")]
    Interrupted(&'static str),

    /// One or more resources failed to release during shutdown
    #[error("Failed to shutdown client: {}", failures.join("; "))]
    ShutdownFailed { failures: Vec<String> },

    /// Any other underlying failure, cause preserved
    #[error("{message}")]
    Unknown {
        message: String,
        #[source]
        source: Option<Arc<dyn StdError + Send + Sync>>,
    },
}

// ============================================================================
// Convenience Constructors
// ============================================================================

impl PulsarClientError {
    /// Create the error reported by every operation on a closed client
    #[inline]
    pub fn client_already_closed() -> Self {
        Self::AlreadyClosed("Client")
    }

    /// Create an invalid configuration error
    #[inline]
    pub fn invalid_configuration(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration(reason.into())
    }

    /// Create an invalid topic name error
    #[inline]
    pub fn invalid_topic_name(topic: impl Into<String>) -> Self {
        Self::InvalidTopicName(topic.into())
    }

    /// Create a connect failure
    #[inline]
    pub fn connect_failed(addr: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Connect {
            addr: addr.into(),
            reason: reason.into(),
        }
    }

    /// Create a broker-side failure
    #[inline]
    pub fn broker(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Broker {
            operation,
            message: message.into(),
        }
    }

    /// Create a timeout error
    #[inline]
    pub fn timeout(operation: &'static str, timeout_ms: u64) -> Self {
        Self::Timeout { operation, timeout_ms }
    }

    /// Create an unknown error without cause
    #[inline]
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::Unknown {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap a foreign error, keeping it as the source
    pub fn wrap<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::Unknown {
            message: err.to_string(),
            source: Some(Arc::new(err)),
        }
    }

    /// Unwrap an arbitrary cause into the client-domain family.
    ///
    /// A cause that already is a [`PulsarClientError`] is returned as-is,
    /// anything else is wrapped as [`PulsarClientError::Unknown`].
    pub fn from_cause(cause: Box<dyn StdError + Send + Sync>) -> Self {
        match cause.downcast::<PulsarClientError>() {
            Ok(err) => *err,
            Err(other) => Self::Unknown {
                message: other.to_string(),
                source: Some(Arc::from(other)),
            },
        }
    }

    #[inline]
    pub fn is_already_closed(&self) -> bool {
        matches!(self, Self::AlreadyClosed(_))
    }

    #[inline]
    pub fn is_lookup_failure(&self) -> bool {
        matches!(self, Self::Lookup(_))
    }

    /// Whether a retry of the same operation may succeed
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::Connect { .. } | Self::Timeout { .. } => true,
            Self::Lookup(err) => err.is_retriable(),
            _ => false,
        }
    }
}

/// Result type alias for client operations
pub type PulsarResult<T> = std::result::Result<T, PulsarClientError>;
