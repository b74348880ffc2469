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

pub mod executor_provider;
pub mod io_engine;
pub mod timer;

use std::future::Future;
use std::io;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub use executor_provider::ExecutorProvider;
pub use executor_provider::ListenerExecutor;
pub use io_engine::IoEngine;
pub use timer::Timer;
pub use timer::TimerTask;

/// Owned tokio runtime.
///
/// Dropping it never blocks, so a runtime may be released from inside an
/// asynchronous context (including from one of its own tasks).
pub struct PulsarRuntime {
    engine: Option<Engine>,
    name: String,
}

enum Engine {
    /// Runtime driving itself on its own worker threads
    Owned(tokio::runtime::Runtime),
    /// Current-thread runtime driven by one dedicated thread until `stop` fires
    Driven { handle: Handle, stop: CancellationToken },
}

impl PulsarRuntime {
    /// Multi-thread runtime with `threads` workers.
    #[inline]
    pub fn new_multi(threads: usize, name: &str) -> io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(threads.max(1))
            .thread_name(name)
            .enable_all()
            .build()?;
        Ok(Self::from_runtime(runtime, name))
    }

    /// Single-threaded runtime driven by a dedicated thread named `name`.
    pub fn new_current_thread(name: &str) -> io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        let handle = runtime.handle().clone();
        let stop = CancellationToken::new();
        let stopped = stop.clone();
        std::thread::Builder::new().name(name.to_string()).spawn(move || {
            runtime.block_on(stopped.cancelled());
        })?;
        Ok(Self {
            engine: Some(Engine::Driven { handle, stop }),
            name: name.to_string(),
        })
    }

    #[inline]
    pub fn from_runtime(runtime: tokio::runtime::Runtime, name: &str) -> Self {
        Self {
            engine: Some(Engine::Owned(runtime)),
            name: name.to_string(),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Handle of the runtime, `None` once it has been shut down.
    #[inline]
    pub fn get_handle(&self) -> Option<&Handle> {
        self.engine.as_ref().map(|engine| match engine {
            Engine::Owned(runtime) => runtime.handle(),
            Engine::Driven { handle, .. } => handle,
        })
    }

    /// Spawn a task, returning `None` if the runtime is shut down.
    pub fn spawn<F>(&self, future: F) -> Option<JoinHandle<F::Output>>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.get_handle().map(|handle| handle.spawn(future))
    }

    #[inline]
    pub fn is_shutdown(&self) -> bool {
        self.engine.is_none()
    }

    /// Stop the runtime without waiting for its tasks.
    #[inline]
    pub fn shutdown(&mut self) {
        match self.engine.take() {
            Some(Engine::Owned(runtime)) => runtime.shutdown_background(),
            // the driver thread drops the runtime once `block_on` returns
            Some(Engine::Driven { stop, .. }) => stop.cancel(),
            None => {}
        }
    }
}

impl Drop for PulsarRuntime {
    fn drop(&mut self) {
        self.shutdown();
    }
}
