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

//! # Pulsar Client Error Handling
//!
//! Every public operation of the client either succeeds or fails with exactly
//! one [`PulsarClientError`]. Errors raised by foreign layers (HTTP transport,
//! binary transport, runtime) are wrapped with their cause preserved.
//!
//! ```rust
//! use pulsar_error::PulsarClientError;
//! use pulsar_error::PulsarResult;
//!
//! fn check_subscription(name: &str) -> PulsarResult<()> {
//!     if name.is_empty() {
//!         return Err(PulsarClientError::InvalidSubscriptionName);
//!     }
//!     Ok(())
//! }
//! # check_subscription("sub").unwrap();
//! ```

pub mod unified;

pub use unified::LookupError;
pub use unified::PulsarClientError;
pub use unified::PulsarResult;
