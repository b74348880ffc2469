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

//! Selection of the asynchronous I/O engine driving network traffic.
//!
//! Candidates are tried best first. A candidate the host does not support, or
//! that cannot be built, is skipped; construction only fails when no candidate
//! at all can be started.

use std::fmt;
use std::io;
use std::sync::Arc;

use pulsar_error::PulsarClientError;
use pulsar_error::PulsarResult;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::PulsarRuntime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoEngine {
    /// Work-stealing runtime on the OS readiness driver (epoll), one worker per io thread
    Native,
    /// Single-threaded runtime driven by one dedicated thread
    Portable,
}

impl IoEngine {
    /// Engines available on this platform, best first.
    pub fn candidates() -> &'static [IoEngine] {
        cfg_if::cfg_if! {
            if #[cfg(target_os = "linux")] {
                &[IoEngine::Native, IoEngine::Portable]
            } else {
                &[IoEngine::Portable]
            }
        }
    }

    /// Whether the running host can drive this engine.
    pub fn is_supported(self) -> bool {
        match self {
            IoEngine::Native => native_io_supported(),
            IoEngine::Portable => true,
        }
    }

    fn build(self, io_threads: usize, name: &str) -> io::Result<PulsarRuntime> {
        match self {
            IoEngine::Native => PulsarRuntime::new_multi(io_threads.max(1), name),
            IoEngine::Portable => PulsarRuntime::new_current_thread(name),
        }
    }
}

impl fmt::Display for IoEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IoEngine::Native => write!(f, "Native"),
            IoEngine::Portable => write!(f, "Portable"),
        }
    }
}

/// Register a socket with a throwaway readiness driver.
///
/// Runs on its own thread so it can be called from inside a runtime.
fn native_io_supported() -> bool {
    cfg_if::cfg_if! {
        if #[cfg(target_os = "linux")] {
            let check = std::thread::Builder::new()
                .name("pulsar-io-check".to_string())
                .spawn(|| -> io::Result<()> {
                    let runtime = tokio::runtime::Builder::new_current_thread().enable_io().build()?;
                    runtime.block_on(async {
                        let socket = tokio::net::UdpSocket::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await?;
                        socket.local_addr().map(drop)
                    })
                });
            matches!(check.map(|handle| handle.join()), Ok(Ok(Ok(()))))
        } else {
            false
        }
    }
}

/// Build the best I/O runtime available for this platform.
pub fn select_io_runtime(io_threads: usize, name: &str) -> PulsarResult<(IoEngine, PulsarRuntime)> {
    select_from(IoEngine::candidates(), name, |engine| {
        if !engine.is_supported() {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("{engine} I/O engine is not supported on this host"),
            ));
        }
        engine.build(io_threads, name)
    })
}

/// Try `candidates` in order with `build`, keeping the first that succeeds.
pub fn select_from<F>(candidates: &[IoEngine], name: &str, mut build: F) -> PulsarResult<(IoEngine, PulsarRuntime)>
where
    F: FnMut(IoEngine) -> io::Result<PulsarRuntime>,
{
    let mut last_error = None;
    for (attempt, engine) in candidates.iter().copied().enumerate() {
        match build(engine) {
            Ok(runtime) => {
                if attempt > 0 {
                    warn!("I/O engine fell back to {} after {} failed attempt(s)", engine, attempt);
                } else {
                    info!("Using {} I/O engine for {}", engine, name);
                }
                return Ok((engine, runtime));
            }
            Err(e) => {
                debug!("Unable to start {} I/O engine: {}", engine, e);
                last_error = Some(e);
            }
        }
    }
    Err(match last_error {
        Some(e) => PulsarClientError::Unknown {
            message: format!("no I/O engine could be started for {name}"),
            source: Some(Arc::new(e)),
        },
        None => PulsarClientError::unknown(format!("no I/O engine candidates for {name}")),
    })
}
