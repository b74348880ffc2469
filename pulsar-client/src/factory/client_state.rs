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

use std::fmt;
use std::sync::atomic::AtomicU8;
use std::sync::atomic::Ordering;

use pulsar_error::PulsarClientError;
use pulsar_error::PulsarResult;
use tracing::debug;

/// Client lifecycle. Only ever moves forward: `Open -> Closing -> Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ClientState {
    Open = 0,
    Closing = 1,
    Closed = 2,
}

impl ClientState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ClientState::Open,
            1 => ClientState::Closing,
            _ => ClientState::Closed,
        }
    }
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientState::Open => f.write_str("Open"),
            ClientState::Closing => f.write_str("Closing"),
            ClientState::Closed => f.write_str("Closed"),
        }
    }
}

/// Atomically updated [`ClientState`]. Every write is a compare-and-set.
pub struct AtomicClientState(AtomicU8);

impl Default for AtomicClientState {
    fn default() -> Self {
        Self::new()
    }
}

impl AtomicClientState {
    pub fn new() -> Self {
        Self(AtomicU8::new(ClientState::Open as u8))
    }

    #[inline]
    pub fn get(&self) -> ClientState {
        ClientState::from_u8(self.0.load(Ordering::Acquire))
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.get() == ClientState::Open
    }

    /// Compare-and-set; on failure returns the state actually observed.
    fn transition(&self, from: ClientState, to: ClientState) -> Result<(), ClientState> {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(ClientState::from_u8)
    }

    /// Wins the right to run the shutdown sequence. Exactly one caller
    /// succeeds; all others get `AlreadyClosed`.
    pub fn begin_closing(&self) -> PulsarResult<()> {
        self.transition(ClientState::Open, ClientState::Closing).map_err(|observed| {
            debug!("Client close rejected, state is {}", observed);
            PulsarClientError::client_already_closed()
        })
    }

    pub fn mark_closed(&self) -> bool {
        self.transition(ClientState::Closing, ClientState::Closed).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    use super::*;

    #[test]
    fn lifecycle_moves_forward_only() {
        let state = AtomicClientState::new();
        assert!(state.is_open());
        assert!(!state.mark_closed());
        state.begin_closing().unwrap();
        assert_eq!(state.get(), ClientState::Closing);
        assert!(state.begin_closing().unwrap_err().is_already_closed());
        assert!(state.mark_closed());
        assert_eq!(state.get(), ClientState::Closed);
        assert_eq!(
            state.transition(ClientState::Open, ClientState::Closing),
            Err(ClientState::Closed)
        );
    }

    #[test]
    fn concurrent_close_has_single_winner() {
        let state = Arc::new(AtomicClientState::new());
        let winners = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let state = state.clone();
                let winners = winners.clone();
                std::thread::spawn(move || {
                    if state.begin_closing().is_ok() {
                        winners.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(winners.load(Ordering::SeqCst), 1);
    }
}
