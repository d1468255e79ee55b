// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Library configuration.

use serde::{Deserialize, Serialize};

use crate::error::{FloweryError, Result};
use crate::types::{Format, Resample};

/// PNG compression effort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PngCompression {
    Fast,
    #[default]
    Default,
    Best,
}

/// Top-level settings, typically loaded from a JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FloweryConfig {
    /// Worker pool used for offloading blocking image work.
    pub pool: PoolConfig,
    /// Encoder defaults for base64/data-URL export and saving.
    pub encode: EncodeDefaults,
    /// Filter used by rotation when the caller does not pick one.
    pub rotate_resample: Resample,
}

/// Settings for the blocking worker pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Maximum number of image operations running at the same time.
    pub max_workers: usize,
}

/// Default encoder parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeDefaults {
    /// Format used when exporting without an explicit one.
    pub format: Format,
    /// JPEG quality (1-100).
    pub jpeg_quality: u8,
    /// PNG compression effort.
    pub png_compression: PngCompression,
}

impl Default for FloweryConfig {
    fn default() -> Self {
        Self {
            pool: PoolConfig::default(),
            encode: EncodeDefaults::default(),
            rotate_resample: Resample::Bicubic,
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        let max_workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self { max_workers }
    }
}

impl Default for EncodeDefaults {
    fn default() -> Self {
        Self {
            format: Format::Jpeg,
            jpeg_quality: 75,
            png_compression: PngCompression::Default,
        }
    }
}

impl FloweryConfig {
    /// Parse and validate a configuration from JSON text. Missing fields fall
    /// back to their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        self.pool.validate()?;
        if !(1..=100).contains(&self.encode.jpeg_quality) {
            return Err(FloweryError::Config(format!(
                "jpeg_quality must be between 1 and 100, got {}",
                self.encode.jpeg_quality
            )));
        }
        Ok(())
    }
}

impl PoolConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_workers == 0 {
            return Err(FloweryError::Config("max_workers must be at least 1".into()));
        }
        Ok(())
    }
}
