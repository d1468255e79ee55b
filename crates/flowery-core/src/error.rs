// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Flowery.

use thiserror::Error;

/// Top-level error type for all Flowery operations.
#[derive(Debug, Error)]
pub enum FloweryError {
    // -- Codec errors --
    #[error("failed to decode image: {0}")]
    Decode(String),

    #[error("failed to encode image: {0}")]
    Encode(String),

    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    // -- Caller input --
    #[error("invalid opacity: {0}")]
    InvalidOpacity(String),

    #[error("invalid color: {0}")]
    InvalidColor(String),

    #[error("invalid image mode: {0}")]
    InvalidMode(String),

    #[error("invalid anchor: {0}")]
    InvalidAnchor(String),

    #[error("invalid flip axis: {0}")]
    InvalidAxis(String),

    #[error("invalid image size: {0}")]
    InvalidSize(String),

    #[error("size mismatch: expected {}x{}, got {}x{}", expected.0, expected.1, actual.0, actual.1)]
    SizeMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    // -- Runtime --
    #[error("worker pool error: {0}")]
    Worker(String),

    #[error("configuration error: {0}")]
    Config(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, FloweryError>;
