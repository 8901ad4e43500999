// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Engine configuration.

use serde::Deserialize;

use crate::error::Result;

/// Default operand stack capacity.
pub const DEFAULT_STACK_SIZE: usize = 2048;

/// Default frame stack capacity.
pub const DEFAULT_MAX_FRAMES: usize = 1024;

/// Default global store size (the full 16-bit index space).
pub const DEFAULT_GLOBALS_SIZE: usize = 65536;

/// Fixed allocations made by the VM at construction.
///
/// ```toml
/// stack_size = 4096
/// max_frames = 256
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Operand stack slots
    pub stack_size: usize,

    /// Maximum call depth, including the top-level frame
    pub max_frames: usize,

    /// Global store slots
    pub globals_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stack_size: DEFAULT_STACK_SIZE,
            max_frames: DEFAULT_MAX_FRAMES,
            globals_size: DEFAULT_GLOBALS_SIZE,
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from TOML, filling missing keys with defaults.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }
}
