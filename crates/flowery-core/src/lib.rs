// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Flowery — Core types, colors, configuration and error definitions shared
// across all crates.

pub mod color;
pub mod config;
pub mod error;
pub mod types;

pub use color::Color;
pub use config::{EncodeDefaults, FloweryConfig, PngCompression, PoolConfig};
pub use error::{FloweryError, Result};
pub use types::*;
