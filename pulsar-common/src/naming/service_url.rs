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

//! Service endpoints and broker addresses.

use std::fmt;
use std::fmt::Display;

use pulsar_error::PulsarClientError;
use pulsar_error::PulsarResult;
use url::Url;

pub const DEFAULT_BINARY_PORT: u16 = 6650;
pub const DEFAULT_BINARY_TLS_PORT: u16 = 6651;
pub const DEFAULT_HTTP_PORT: u16 = 8080;
pub const DEFAULT_HTTPS_PORT: u16 = 8443;

/// Transport selected by the scheme of a service url
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceScheme {
    /// `pulsar://`
    Binary,
    /// `pulsar+ssl://`
    BinaryTls,
    /// `http://`
    Http,
    /// `https://`
    Https,
}

impl ServiceScheme {
    fn parse(scheme: &str) -> Option<Self> {
        match scheme {
            "pulsar" => Some(ServiceScheme::Binary),
            "pulsar+ssl" => Some(ServiceScheme::BinaryTls),
            "http" => Some(ServiceScheme::Http),
            "https" => Some(ServiceScheme::Https),
            _ => None,
        }
    }

    #[inline]
    pub fn is_http(&self) -> bool {
        matches!(self, ServiceScheme::Http | ServiceScheme::Https)
    }

    #[inline]
    pub fn is_tls(&self) -> bool {
        matches!(self, ServiceScheme::BinaryTls | ServiceScheme::Https)
    }

    fn default_port(&self) -> u16 {
        match self {
            ServiceScheme::Binary => DEFAULT_BINARY_PORT,
            ServiceScheme::BinaryTls => DEFAULT_BINARY_TLS_PORT,
            ServiceScheme::Http => DEFAULT_HTTP_PORT,
            ServiceScheme::Https => DEFAULT_HTTPS_PORT,
        }
    }
}

/// `host:port` of a broker or service endpoint
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BrokerAddress {
    host: String,
    port: u16,
}

impl BrokerAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Extract the address from a broker url such as `pulsar://broker-1:6650`.
    pub fn from_url(url: &str) -> PulsarResult<Self> {
        Ok(ServiceUrl::parse(url)?.address().clone())
    }

    #[inline]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[inline]
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl Display for BrokerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// A parsed service url
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceUrl {
    raw: String,
    scheme: ServiceScheme,
    address: BrokerAddress,
}

impl ServiceUrl {
    pub fn parse(service_url: &str) -> PulsarResult<Self> {
        let url = Url::parse(service_url).map_err(|e| {
            PulsarClientError::invalid_configuration(format!("invalid service url '{service_url}': {e}"))
        })?;
        let scheme = ServiceScheme::parse(url.scheme()).ok_or_else(|| {
            PulsarClientError::invalid_configuration(format!(
                "unsupported scheme '{}' in service url '{service_url}'",
                url.scheme()
            ))
        })?;
        let host = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| PulsarClientError::invalid_configuration(format!("missing host in '{service_url}'")))?;
        let port = url.port().unwrap_or_else(|| scheme.default_port());
        Ok(Self {
            raw: service_url.to_string(),
            scheme,
            address: BrokerAddress::new(host, port),
        })
    }

    #[inline]
    pub fn scheme(&self) -> ServiceScheme {
        self.scheme
    }

    #[inline]
    pub fn address(&self) -> &BrokerAddress {
        &self.address
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl Display for ServiceUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
