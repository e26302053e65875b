// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type shared across the renderer and the request boundary.
//!
//! The core itself has a narrow failure surface: given a canvas it can
//! allocate, it always produces a complete raster and a complete
//! encoding.  Everything else here belongs to the boundary layer,
//! which rejects nonsense before the evaluator ever sees it rather
//! than silently substituting defaults.

/// Everything that can go wrong between a request and an encoded
/// image.
#[derive(Debug, Fail)]
pub enum FractalError {
    /// The raster for this canvas cannot be materialized.
    #[fail(display = "cannot allocate a {}x{} raster", width, height)]
    Allocation {
        /// Requested canvas width in pixels.
        width: u32,
        /// Requested canvas height in pixels.
        height: u32,
    },

    /// A fractal family name that is none of `mandelbrot`, `julia`,
    /// `burningship`.
    #[fail(display = "unknown fractal family: {}", name)]
    UnknownFamily {
        /// The name as received.
        name: String,
    },

    /// An output format name that is neither `bmp` nor `png`.
    #[fail(display = "unknown image format: {}", name)]
    UnknownFormat {
        /// The name as received.
        name: String,
    },

    /// A zero-width or zero-height canvas.
    #[fail(display = "canvas dimensions must be positive, got {}x{}", width, height)]
    EmptyCanvas {
        /// Requested canvas width in pixels.
        width: u32,
        /// Requested canvas height in pixels.
        height: u32,
    },

    /// A zero iteration budget.
    #[fail(display = "iteration budget must be positive")]
    EmptyBudget,
}
