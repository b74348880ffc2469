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

//! Authentication plugins used by the lookup transports and the connection handshake.

use std::fmt;

use pulsar_error::PulsarClientError;
use pulsar_error::PulsarResult;

/// Credentials produced by an [`Authentication`] plugin.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthenticationData {
    /// Headers attached to every HTTP lookup request
    pub http_headers: Vec<(String, String)>,
    /// Payload carried by the binary connect command
    pub command_data: Option<String>,
}

impl AuthenticationData {
    #[inline]
    pub fn has_data_for_http(&self) -> bool {
        !self.http_headers.is_empty()
    }

    #[inline]
    pub fn has_data_from_command(&self) -> bool {
        self.command_data.is_some()
    }
}

/// Pluggable client authentication.
///
/// `start` is invoked once while the client is being built and `close` once
/// while it shuts down. A failing `start` aborts client construction.
#[cfg_attr(test, mockall::automock)]
pub trait Authentication: Send + Sync {
    fn auth_method_name(&self) -> String;

    fn auth_data(&self) -> PulsarResult<AuthenticationData>;

    fn start(&self) -> PulsarResult<()>;

    fn close(&self) -> PulsarResult<()>;
}

impl fmt::Debug for dyn Authentication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authentication")
            .field("method", &self.auth_method_name())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AuthenticationDisabled;

impl Authentication for AuthenticationDisabled {
    fn auth_method_name(&self) -> String {
        "none".to_string()
    }

    fn auth_data(&self) -> PulsarResult<AuthenticationData> {
        Ok(AuthenticationData::default())
    }

    fn start(&self) -> PulsarResult<()> {
        Ok(())
    }

    fn close(&self) -> PulsarResult<()> {
        Ok(())
    }
}

/// Static bearer token authentication
#[derive(Clone)]
pub struct AuthenticationToken {
    token: String,
}

impl AuthenticationToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

impl fmt::Debug for AuthenticationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticationToken").field("token", &"****").finish()
    }
}

impl Authentication for AuthenticationToken {
    fn auth_method_name(&self) -> String {
        "token".to_string()
    }

    fn auth_data(&self) -> PulsarResult<AuthenticationData> {
        Ok(AuthenticationData {
            http_headers: vec![("Authorization".to_string(), format!("Bearer {}", self.token))],
            command_data: Some(self.token.clone()),
        })
    }

    fn start(&self) -> PulsarResult<()> {
        if self.token.trim().is_empty() {
            return Err(PulsarClientError::invalid_configuration("authentication token is empty"));
        }
        Ok(())
    }

    fn close(&self) -> PulsarResult<()> {
        Ok(())
    }
}
