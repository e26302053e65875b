// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The escape-time evaluator and its seeded parameter derivation.
//!
//! A fractal image here is a function from a 32-bit seed to a byte
//! raster.  The seed feeds an [`Lcg`](../lcg/struct.Lcg.html) stream
//! that decides the zoom, the view center, and (for Julia sets) the
//! Julia constant; the evaluator then iterates the family's recurrence
//! at every pixel and shades by how quickly the iterate escapes the
//! circle of radius two.  Pixels that never escape within the budget
//! render black; the rest climb a square-root gradient, which spends
//! more of the dynamic range near the set boundary than a linear ramp
//! would.
//!
//! The order in which parameters are drawn from the stream is a
//! compatibility contract, not an implementation detail.  Every family
//! consumes all five parameter draws, in the same order, even the ones
//! it goes on to ignore; a family chosen from the seed (rather than
//! explicitly) consumes one extra draw up front.  Changing any of this
//! silently changes every image ever rendered from an existing seed.

extern crate crossbeam;

use itertools::iproduct;
use num::Complex;
use std::str::FromStr;

use error::FractalError;
use lcg::Lcg;

/// The three escape recurrences the evaluator understands.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FractalKind {
    /// `z' = z^2 + c`, iterated from the origin.
    Mandelbrot,
    /// `z' = z^2 + k` for a seed-derived constant `k`, iterated from
    /// the pixel's own coordinate.
    Julia,
    /// The Mandelbrot recurrence with the imaginary term folded to its
    /// absolute value before the constant is added.
    BurningShip,
}

impl FractalKind {
    /// Maps one unit-interval draw onto a family, in declaration
    /// order.
    fn from_draw(r: f64) -> FractalKind {
        if r < 1.0 / 3.0 {
            FractalKind::Mandelbrot
        } else if r < 2.0 / 3.0 {
            FractalKind::Julia
        } else {
            FractalKind::BurningShip
        }
    }

    /// The lowercase name used in requests and filenames.
    pub fn name(self) -> &'static str {
        match self {
            FractalKind::Mandelbrot => "mandelbrot",
            FractalKind::Julia => "julia",
            FractalKind::BurningShip => "burningship",
        }
    }
}

impl FromStr for FractalKind {
    type Err = FractalError;

    fn from_str(s: &str) -> Result<FractalKind, FractalError> {
        match s {
            "mandelbrot" => Ok(FractalKind::Mandelbrot),
            "julia" => Ok(FractalKind::Julia),
            "burningship" => Ok(FractalKind::BurningShip),
            _ => Err(FractalError::UnknownFamily {
                name: s.to_string(),
            }),
        }
    }
}

/// The free parameters of one rendering, derived from the seed rather
/// than supplied by the caller.
#[derive(Copy, Clone, Debug)]
pub struct FractalParams {
    /// The family whose recurrence the evaluator iterates.
    pub kind: FractalKind,
    /// Width of the viewed slice of the complex plane.
    pub zoom: f64,
    /// Center of the view.
    pub center: Complex<f64>,
    /// The Julia constant.  Drawn for every family; only Julia reads
    /// it.
    pub julia: Complex<f64>,
}

impl FractalParams {
    /// Derives the rendering parameters for `seed`.  When `explicit`
    /// is `None`, the family itself is chosen by the first draw of the
    /// stream; when the caller already knows the family, no family
    /// draw is consumed and the parameter draws start at the top of
    /// the stream.
    pub fn derive(seed: u32, explicit: Option<FractalKind>) -> FractalParams {
        let mut rng = Lcg::new(seed);
        let kind = match explicit {
            Some(kind) => kind,
            None => FractalKind::from_draw(rng.next()),
        };
        let zoom = 2.8 + rng.next() * 0.8;
        let mut center = Complex::new(
            -0.5 + (rng.next() - 0.5) * 0.4,
            (rng.next() - 0.5) * 0.4,
        );
        let julia = Complex::new(-0.8 + rng.next() * 0.6, -0.5 + rng.next() * 1.0);
        // Julia views are pinned to the origin, but only after every
        // draw above has been consumed: the stream position at this
        // point is the same for all three families.
        if kind == FractalKind::Julia {
            center = Complex::new(0.0, 0.0);
        }
        FractalParams {
            kind,
            zoom,
            center,
            julia,
        }
    }
}

/// The escape radius, squared.  The iterate has escaped once its
/// squared magnitude exceeds this.
const ESCAPE_RADIUS_SQ: f64 = 4.0;

/// Renders one raster sequentially.  This is the reference behavior:
/// `evaluate_threaded` must produce these bytes exactly, at any thread
/// count.
///
/// The returned buffer is row-major, `width * height` luminance bytes,
/// 0 meaning the pixel never escaped within `budget` iterations.
pub fn evaluate(
    width: u32,
    height: u32,
    budget: u32,
    seed: u32,
    kind: FractalKind,
) -> Result<Vec<u8>, FractalError> {
    let mut raster = allocate(width, height)?;
    let params = FractalParams::derive(seed, Some(kind));
    for (y, x) in iproduct!(0..height, 0..width) {
        raster[y as usize * width as usize + x as usize] =
            shade_at(x, y, width, height, budget, &params);
    }
    Ok(raster)
}

/// Renders one raster across `threads` scoped threads, each owning a
/// disjoint band of rows.  Because every pixel depends only on its own
/// coordinates and the shared immutable parameters, the band split
/// changes nothing about the output bytes.
pub fn evaluate_threaded(
    width: u32,
    height: u32,
    budget: u32,
    seed: u32,
    kind: FractalKind,
    threads: usize,
) -> Result<Vec<u8>, FractalError> {
    let mut raster = allocate(width, height)?;
    let params = FractalParams::derive(seed, Some(kind));
    if threads <= 1 || width == 0 || height == 0 {
        render_band(&mut raster, 0, width, height, budget, &params);
        return Ok(raster);
    }

    let rows_per_band = (height as usize + threads - 1) / threads;
    let band_len = rows_per_band * width as usize;
    {
        let params = &params;
        crossbeam::scope(|spawner| {
            for (i, band) in raster.chunks_mut(band_len).enumerate() {
                let y_start = (i * rows_per_band) as u32;
                spawner.spawn(move |_| {
                    render_band(band, y_start, width, height, budget, params);
                });
            }
        })
        .unwrap();
    }
    Ok(raster)
}

fn allocate(width: u32, height: u32) -> Result<Vec<u8>, FractalError> {
    let len = (width as usize)
        .checked_mul(height as usize)
        .ok_or(FractalError::Allocation { width, height })?;
    Ok(vec![0u8; len])
}

/// Fills a band of whole rows starting at `y_start`.  The band may be
/// shorter than a full stripe when the row count does not divide
/// evenly.
fn render_band(
    band: &mut [u8],
    y_start: u32,
    width: u32,
    height: u32,
    budget: u32,
    params: &FractalParams,
) {
    if width == 0 {
        return;
    }
    for (dy, row) in band.chunks_mut(width as usize).enumerate() {
        let y = y_start + dy as u32;
        for (x, pixel) in row.iter_mut().enumerate() {
            *pixel = shade_at(x as u32, y, width, height, budget, params);
        }
    }
}

/// Computes one pixel: map it onto the complex plane, run the family
/// recurrence until escape or budget exhaustion, shade the count.
fn shade_at(x: u32, y: u32, width: u32, height: u32, budget: u32, params: &FractalParams) -> u8 {
    let c = Complex::new(
        (f64::from(x) - f64::from(width) / 2.0) * params.zoom / f64::from(width)
            + params.center.re,
        (f64::from(y) - f64::from(height) / 2.0) * params.zoom / f64::from(height)
            + params.center.im,
    );
    let mut z = match params.kind {
        FractalKind::Julia => c,
        _ => Complex::new(0.0, 0.0),
    };
    let mut i = 0;
    while z.norm_sqr() <= ESCAPE_RADIUS_SQ && i < budget {
        z = match params.kind {
            FractalKind::Mandelbrot => z * z + c,
            FractalKind::Julia => z * z + params.julia,
            // The absolute value folds before the constant is added;
            // folding afterwards is a different fractal.
            FractalKind::BurningShip => Complex::new(
                z.re * z.re - z.im * z.im + c.re,
                (2.0 * z.re * z.im).abs() + c.im,
            ),
        };
        i += 1;
    }
    shade(i, budget)
}

/// Maps an escape count to a luminance byte.  A pixel that consumed
/// the whole budget is inside the set and renders black; everything
/// else climbs a square-root gradient, which is gentler near the
/// boundary than a linear ramp.
fn shade(i: u32, budget: u32) -> u8 {
    if i == budget {
        0
    } else {
        (255.0 * (f64::from(i) / f64::from(budget)).sqrt()).floor() as u8
    }
}
