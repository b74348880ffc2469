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

//! Fixed pool of single-threaded executors used to run user callbacks.
//!
//! Each executor owns one worker thread, so callbacks dispatched to the same
//! executor run sequentially and never on the shared I/O threads.

use std::future::Future;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use parking_lot::Mutex;
use pulsar_error::PulsarClientError;
use pulsar_error::PulsarResult;
use tokio::task::JoinHandle;
use tracing::info;

use crate::PulsarRuntime;

#[derive(Clone)]
pub struct ListenerExecutor {
    inner: Arc<ListenerExecutorInner>,
}

struct ListenerExecutorInner {
    name: String,
    runtime: Mutex<PulsarRuntime>,
}

impl ListenerExecutor {
    fn new(name: String) -> PulsarResult<Self> {
        let runtime = PulsarRuntime::new_multi(1, &name).map_err(PulsarClientError::wrap)?;
        Ok(Self {
            inner: Arc::new(ListenerExecutorInner {
                name,
                runtime: Mutex::new(runtime),
            }),
        })
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Run `task` on this executor's thread. Returns `false` once shut down.
    pub fn execute<F>(&self, task: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.spawn(async move { task() }).is_some()
    }

    pub fn spawn<F>(&self, future: F) -> Option<JoinHandle<F::Output>>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let handle = self.inner.runtime.lock().get_handle().cloned()?;
        Some(handle.spawn(future))
    }

    #[inline]
    pub fn is_shutdown(&self) -> bool {
        self.inner.runtime.lock().is_shutdown()
    }

    fn shutdown(&self) {
        self.inner.runtime.lock().shutdown();
    }
}

pub struct ExecutorProvider {
    name: String,
    executors: Vec<ListenerExecutor>,
    next: AtomicUsize,
}

impl ExecutorProvider {
    pub fn new(num_threads: usize, name: &str) -> PulsarResult<Self> {
        let executors = (0..num_threads.max(1))
            .map(|index| ListenerExecutor::new(format!("{name}-{index}")))
            .collect::<PulsarResult<Vec<_>>>()?;
        Ok(Self {
            name: name.to_string(),
            executors,
            next: AtomicUsize::new(0),
        })
    }

    /// Next executor, round-robin.
    pub fn get_executor(&self) -> ListenerExecutor {
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.executors.len();
        self.executors[index].clone()
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.executors.len()
    }

    /// Stop every executor without waiting for queued callbacks.
    pub fn shutdown_now(&self) {
        for executor in &self.executors {
            executor.shutdown();
        }
        info!("Executor provider [{}] shut down {} executor(s)", self.name, self.executors.len());
    }

    pub fn is_shutdown(&self) -> bool {
        self.executors.iter().all(ListenerExecutor::is_shutdown)
    }
}
