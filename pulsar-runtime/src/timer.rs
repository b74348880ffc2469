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

//! Client timer: fixed-rate tasks on a dedicated thread.

use std::time::Duration;

use parking_lot::Mutex;
use pulsar_error::PulsarClientError;
use pulsar_error::PulsarResult;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::PulsarRuntime;

/// Handle of a scheduled timer task.
#[derive(Clone)]
pub struct TimerTask {
    token: CancellationToken,
}

impl TimerTask {
    #[inline]
    pub fn cancel(&self) {
        self.token.cancel();
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

pub struct Timer {
    name: String,
    runtime: Mutex<PulsarRuntime>,
    cancel: CancellationToken,
}

impl Timer {
    pub fn new(name: &str) -> PulsarResult<Self> {
        let runtime = PulsarRuntime::new_multi(1, name).map_err(PulsarClientError::wrap)?;
        Ok(Self {
            name: name.to_string(),
            runtime: Mutex::new(runtime),
            cancel: CancellationToken::new(),
        })
    }

    /// Run `task` every `period`, first after `initial_delay`.
    pub fn schedule_at_fixed_rate<F>(
        &self,
        mut task: F,
        initial_delay: Option<Duration>,
        period: Duration,
    ) -> PulsarResult<TimerTask>
    where
        F: FnMut() + Send + 'static,
    {
        let token = self.cancel.child_token();
        let task_token = token.clone();
        self.spawn(async move {
            if let Some(initial_delay) = initial_delay {
                tokio::select! {
                    _ = task_token.cancelled() => return,
                    _ = tokio::time::sleep(initial_delay) => {}
                }
            }
            loop {
                // record current execution time
                let current_execution_time = tokio::time::Instant::now();
                task();
                let next_execution_time = current_execution_time + period;
                let delay = next_execution_time.saturating_duration_since(tokio::time::Instant::now());
                tokio::select! {
                    _ = task_token.cancelled() => return,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        })?;
        Ok(TimerTask { token })
    }

    fn spawn<F>(&self, future: F) -> PulsarResult<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        if self.cancel.is_cancelled() {
            return Err(PulsarClientError::AlreadyClosed("Timer"));
        }
        self.runtime
            .lock()
            .spawn(future)
            .map(|_| ())
            .ok_or(PulsarClientError::AlreadyClosed("Timer"))
    }

    /// Cancel all pending tasks and stop the timer thread.
    pub fn stop(&self) -> PulsarResult<()> {
        if self.cancel.is_cancelled() {
            return Err(PulsarClientError::AlreadyClosed("Timer"));
        }
        self.cancel.cancel();
        self.runtime.lock().shutdown();
        debug!("Timer [{}] stopped", self.name);
        Ok(())
    }

    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
