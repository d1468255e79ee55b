// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// flowery-imager — Chainable image manipulation for Flowery.
//
// Wraps a decoded image in an `Imager` with in-place operations (anchored
// paste, masks, opacity, inversion, grayscale, rotation, flips), encodes the
// result to bytes, base64 or data URLs, and offloads blocking work onto a
// bounded tokio worker pool.

pub mod codec;
pub mod imager;
pub mod position;
pub mod raster;
pub mod transform;
pub mod transparency;
pub mod worker;

// Re-export the primary types so callers can use `flowery_imager::Imager` etc.
pub use codec::{EncodeOptions, PngFilter};
pub use imager::Imager;
pub use position::resolve_position;
pub use raster::{IndexedImage, Raster};
pub use transform::RotateOptions;
pub use transparency::has_transparency;
pub use worker::{Task, WorkerPool};

pub use flowery_core::{
    Alpha, Anchor, Color, FlipAxis, FloweryConfig, FloweryError, Format, Mode, Resample, Result,
    Size,
};
