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

//! Connection state shared by producer and consumer entities.

use std::fmt;
use std::sync::Arc;

use futures::channel::oneshot;
use futures::future::BoxFuture;
use futures::future::Shared;
use futures::FutureExt;
use parking_lot::Mutex;
use pulsar_error::PulsarClientError;
use pulsar_error::PulsarResult;

use crate::implementation::connection::ClientConnection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerState {
    Uninitialized,
    Connecting,
    Ready,
    Closing,
    Closed,
    Failed,
}

impl HandlerState {
    #[inline]
    pub fn is_closing_or_closed(&self) -> bool {
        matches!(self, HandlerState::Closing | HandlerState::Closed)
    }
}

impl fmt::Display for HandlerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HandlerState::Uninitialized => "Uninitialized",
            HandlerState::Connecting => "Connecting",
            HandlerState::Ready => "Ready",
            HandlerState::Closing => "Closing",
            HandlerState::Closed => "Closed",
            HandlerState::Failed => "Failed",
        };
        f.write_str(name)
    }
}

/// What a close request has to do, decided atomically with the state change.
pub(crate) enum CloseAction {
    /// Nothing registered on a broker, the entity is closed already
    Done,
    /// The broker-side registration must be released over this connection
    CloseOnBroker(Arc<dyn ClientConnection>),
}

struct HandlerInner {
    state: HandlerState,
    cnx: Option<Arc<dyn ClientConnection>>,
}

pub(crate) struct ConnectionHandler {
    inner: Mutex<HandlerInner>,
}

impl ConnectionHandler {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HandlerInner {
                state: HandlerState::Uninitialized,
                cnx: None,
            }),
        }
    }

    pub fn state(&self) -> HandlerState {
        self.inner.lock().state
    }

    pub fn connection(&self) -> Option<Arc<dyn ClientConnection>> {
        self.inner.lock().cnx.clone()
    }

    pub fn begin_connecting(&self, entity: &'static str) -> PulsarResult<()> {
        let mut inner = self.inner.lock();
        match inner.state {
            HandlerState::Uninitialized | HandlerState::Failed => {
                inner.state = HandlerState::Connecting;
                Ok(())
            }
            HandlerState::Closing | HandlerState::Closed => Err(PulsarClientError::AlreadyClosed(entity)),
            state => Err(PulsarClientError::unknown(format!(
                "{entity} cannot connect in state {state}"
            ))),
        }
    }

    /// Stores the connection and moves to `Ready`. Returns `false` when the
    /// entity got closed while connecting; the caller owns the cleanup then.
    pub fn connection_ready(&self, cnx: Arc<dyn ClientConnection>) -> bool {
        let mut inner = self.inner.lock();
        if inner.state != HandlerState::Connecting {
            return false;
        }
        inner.state = HandlerState::Ready;
        inner.cnx = Some(cnx);
        true
    }

    pub fn connection_failed(&self) {
        let mut inner = self.inner.lock();
        if inner.state == HandlerState::Connecting {
            inner.state = HandlerState::Failed;
        }
    }

    pub fn begin_close(&self) -> CloseAction {
        let mut inner = self.inner.lock();
        match (inner.state, inner.cnx.take()) {
            (HandlerState::Ready, Some(cnx)) => {
                inner.state = HandlerState::Closing;
                CloseAction::CloseOnBroker(cnx)
            }
            _ => {
                inner.state = HandlerState::Closed;
                CloseAction::Done
            }
        }
    }

    pub fn mark_closed(&self) {
        self.inner.lock().state = HandlerState::Closed;
    }
}

/// Makes close idempotent. The first caller receives a [`CloseGuard`] and
/// performs the close; later callers receive a future that resolves once the
/// guard is dropped.
pub(crate) struct CloseLatch {
    done: Mutex<Option<Shared<oneshot::Receiver<()>>>>,
}

/// Held by whoever performs the close. The finalizer runs on drop, also when
/// the closing task is cancelled, before waiters are released.
pub(crate) struct CloseGuard {
    finalizer: Option<Box<dyn FnOnce() + Send>>,
    _done: oneshot::Sender<()>,
}

impl CloseGuard {
    pub fn on_close(&mut self, finalizer: impl FnOnce() + Send + 'static) {
        self.finalizer = Some(Box::new(finalizer));
    }
}

impl Drop for CloseGuard {
    fn drop(&mut self) {
        if let Some(finalizer) = self.finalizer.take() {
            finalizer();
        }
    }
}

impl CloseLatch {
    pub fn new() -> Self {
        Self { done: Mutex::new(None) }
    }

    pub fn try_begin(&self) -> Result<CloseGuard, BoxFuture<'static, PulsarResult<()>>> {
        let mut done = self.done.lock();
        if let Some(waiter) = done.as_ref() {
            let waiter = waiter.clone();
            return Err(async move {
                let _ = waiter.await;
                Ok(())
            }
            .boxed());
        }
        let (tx, rx) = oneshot::channel();
        *done = Some(rx.shared());
        Ok(CloseGuard {
            finalizer: None,
            _done: tx,
        })
    }

    pub fn is_started(&self) -> bool {
        self.done.lock().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_before_connect_needs_no_broker() {
        let handler = ConnectionHandler::new();
        assert_eq!(handler.state(), HandlerState::Uninitialized);
        assert!(matches!(handler.begin_close(), CloseAction::Done));
        assert_eq!(handler.state(), HandlerState::Closed);
        assert!(handler.begin_connecting("Producer").unwrap_err().is_already_closed());
    }

    #[test]
    fn failed_connect_can_be_retried() {
        let handler = ConnectionHandler::new();
        handler.begin_connecting("Producer").unwrap();
        handler.connection_failed();
        assert_eq!(handler.state(), HandlerState::Failed);
        handler.begin_connecting("Producer").unwrap();
        assert_eq!(handler.state(), HandlerState::Connecting);
    }

    #[test]
    fn double_connect_is_rejected() {
        let handler = ConnectionHandler::new();
        handler.begin_connecting("Consumer").unwrap();
        assert!(handler.begin_connecting("Consumer").is_err());
    }

    #[test]
    fn guard_runs_finalizer_once_on_drop() {
        let latch = CloseLatch::new();
        let finalized = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let mut guard = match latch.try_begin() {
            Ok(guard) => guard,
            Err(_) => panic!("first close must win the latch"),
        };
        let counter = finalized.clone();
        guard.on_close(move || {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        });
        drop(guard);
        assert_eq!(finalized.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn latch_followers_wait_for_the_first_close() {
        let latch = CloseLatch::new();
        let guard = match latch.try_begin() {
            Ok(guard) => guard,
            Err(_) => panic!("first close must win the latch"),
        };
        assert!(latch.is_started());
        let follower = match latch.try_begin() {
            Ok(_) => panic!("second close must wait"),
            Err(wait) => wait,
        };
        let waiting = tokio::spawn(follower);
        tokio::task::yield_now().await;
        assert!(!waiting.is_finished());
        drop(guard);
        assert!(waiting.await.unwrap().is_ok());
    }
}
