#![deny(missing_docs)]
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Seeded fractal image generator
//!
//! This crate renders escape-time fractals (the Mandelbrot set, Julia
//! sets, and the Burning Ship variant) into single-channel grayscale
//! rasters, and serializes those rasters into self-contained image
//! files: an 8-bit palette BMP, or an 8-bit grayscale PNG carrying a
//! single uncompressed DEFLATE block.  Everything downstream of the
//! seed is deterministic: the same seed, canvas, iteration budget and
//! fractal family always produce the same bytes, which makes an image
//! reproducible by anyone who remembers the seed.
//!
//! The interesting pieces live in three layers.  `lcg` and `fractal`
//! turn a 32-bit seed into view parameters and a raster.  `png` and
//! `bmp` turn the raster into a valid file, checksums and all, without
//! leaning on an image library.  `request` and `ratelimit` are the
//! thin boundary an HTTP-style handler talks to: parameter defaulting
//! and clamping, response metadata, and a per-client admission gate.

extern crate crossbeam;
#[macro_use]
extern crate failure;
extern crate fnv;
extern crate itertools;
#[macro_use]
extern crate log;
extern crate num;
extern crate rand;

pub mod bmp;
pub mod error;
pub mod fractal;
pub mod lcg;
pub mod png;
pub mod ratelimit;
pub mod request;

pub use bmp::encode_bmp;
pub use error::FractalError;
pub use fractal::{evaluate, evaluate_threaded, FractalKind, FractalParams};
pub use lcg::Lcg;
pub use png::{adler32, encode_png, Crc32};
pub use ratelimit::{MemoryStore, RateLimiter, SystemClock};
pub use request::{render, render_threaded, ImageFormat, RenderRequest, RenderedImage};
