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
use std::str::FromStr;

/// Initializes the logger.
///
/// Reads the log level from the `RUST_LOG` environment variable, defaulting to
/// `INFO`. Thread names, thread ids, levels and line numbers are included in
/// every line. Calling it more than once is harmless.
pub fn init_logger() {
    let level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|level| Level::parse(&level))
        .unwrap_or(Level::INFO);
    init_logger_with_level(level);
}

pub fn init_logger_with_level(level: Level) {
    let max_level = tracing::Level::from_str(level.as_str()).unwrap_or(tracing::Level::INFO);
    let _ = tracing_subscriber::fmt()
        .with_thread_names(true)
        .with_level(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_max_level(max_level)
        .try_init();
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Level(&'static str);

impl Level {
    pub const ERROR: Level = Level("ERROR");
    pub const WARN: Level = Level("WARN");
    pub const INFO: Level = Level("INFO");
    pub const DEBUG: Level = Level("DEBUG");
    pub const TRACE: Level = Level("TRACE");

    pub fn as_str(&self) -> &'static str {
        self.0
    }

    /// Case-insensitive lookup; `None` for unknown names.
    pub fn parse(level: &str) -> Option<Level> {
        match level.trim().to_ascii_uppercase().as_str() {
            "ERROR" => Some(Level::ERROR),
            "WARN" => Some(Level::WARN),
            "INFO" => Some(Level::INFO),
            "DEBUG" => Some(Level::DEBUG),
            "TRACE" => Some(Level::TRACE),
            _ => None,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.0)
    }
}
