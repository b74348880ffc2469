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

//! HTTP transport used by the HTTP lookup service.

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use pulsar_common::ServiceUrl;
use pulsar_error::LookupError;
use pulsar_error::PulsarClientError;
use pulsar_error::PulsarResult;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderName;
use reqwest::header::HeaderValue;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::base::authentication::Authentication;
use crate::base::client_config::ClientConfig;

const USER_AGENT: &str = concat!("pulsar-rust-client/", env!("CARGO_PKG_VERSION"));

pub struct HttpClient {
    base_url: Url,
    client: reqwest::Client,
    authentication: Arc<dyn Authentication>,
    closed: AtomicBool,
}

impl HttpClient {
    pub fn new(service_url: &ServiceUrl, config: &ClientConfig) -> PulsarResult<Self> {
        let mut raw = service_url.as_str().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let base_url = Url::parse(&raw)
            .map_err(|e| PulsarClientError::invalid_configuration(format!("invalid service url '{raw}': {e}")))?;

        let mut builder = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.operation_timeout())
            .connect_timeout(Duration::from_millis(config.operation_timeout_ms.min(10_000)));
        if service_url.scheme().is_tls() {
            builder = builder.danger_accept_invalid_certs(config.tls_allow_insecure_connection);
            if let Some(path) = config.tls_trust_certs_file_path.as_deref() {
                let pem = std::fs::read(path).map_err(|e| {
                    PulsarClientError::invalid_configuration(format!("cannot read trust certs '{path}': {e}"))
                })?;
                let certificate = reqwest::Certificate::from_pem(&pem).map_err(|e| {
                    PulsarClientError::invalid_configuration(format!("invalid trust certs '{path}': {e}"))
                })?;
                builder = builder.add_root_certificate(certificate);
            }
        }
        let client = builder.build().map_err(PulsarClientError::wrap)?;

        Ok(Self {
            base_url,
            client,
            authentication: config.authentication.clone(),
            closed: AtomicBool::new(false),
        })
    }

    pub fn service_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// GET `path` relative to the service url and decode the JSON body.
    /// `topic` is only used to describe failures.
    pub fn get<T>(&self, path: &str, topic: &str) -> BoxFuture<'static, PulsarResult<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let prepared = self.prepare(path);
        let client = self.client.clone();
        let topic = topic.to_string();
        async move {
            let (url, headers) = prepared?;
            debug!("[{}] HTTP GET {}", topic, url);
            let response = client
                .get(url.clone())
                .headers(headers)
                .send()
                .await
                .map_err(|e| LookupError::transport(url.as_str(), e))?;

            let status = response.status();
            if status == StatusCode::NOT_FOUND {
                return Err(LookupError::topic_not_found(topic).into());
            }
            if !status.is_success() {
                return Err(LookupError::http_status(url.as_str(), status.as_u16()).into());
            }
            let body = response
                .bytes()
                .await
                .map_err(|e| LookupError::transport(url.as_str(), e))?;
            serde_json::from_slice::<T>(&body)
                .map_err(|e| LookupError::invalid_response(topic, e.to_string()).into())
        }
        .boxed()
    }

    fn prepare(&self, path: &str) -> PulsarResult<(Url, HeaderMap)> {
        if self.closed.load(Ordering::Acquire) {
            return Err(PulsarClientError::AlreadyClosed("HTTP client"));
        }
        let url = self
            .base_url
            .join(path)
            .map_err(|e| PulsarClientError::unknown(format!("invalid request path '{path}': {e}")))?;
        let mut headers = HeaderMap::new();
        for (name, value) in self.authentication.auth_data()?.http_headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| PulsarClientError::invalid_configuration(format!("invalid auth header name: {e}")))?;
            let value = HeaderValue::from_str(&value)
                .map_err(|e| PulsarClientError::invalid_configuration(format!("invalid auth header value: {e}")))?;
            headers.insert(name, value);
        }
        Ok((url, headers))
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
