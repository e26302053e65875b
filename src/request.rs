// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The request boundary: everything a thin HTTP-style handler needs
//! between its parsed query parameters and a servable byte buffer.
//!
//! The core renderer deliberately never clamps or defaults anything;
//! that is this module's job.  Sizes are clamped to per-format maxima
//! (large BMPs are cheap to emit, but a PNG canvas must keep its
//! scanline buffer inside a single stored DEFLATE block), the
//! iteration budget is capped, and a missing seed is drawn once from
//! process randomness and then reported back verbatim, so a response
//! header built from [`RenderedImage::seed`](struct.RenderedImage.html)
//! always names the exact stream the image came from.

use rand::{thread_rng, Rng};
use std::str::FromStr;

use bmp::encode_bmp;
use error::FractalError;
use fractal::{evaluate_threaded, FractalKind, FractalParams};
use png::encode_png;

/// Canvas width when the request does not name one.
pub const DEFAULT_WIDTH: u32 = 720;
/// Canvas height when the request does not name one.
pub const DEFAULT_HEIGHT: u32 = 432;
/// Iteration budget when the request does not name one.
pub const DEFAULT_ITERATIONS: u32 = 50;
/// Hard ceiling on the iteration budget.
pub const MAX_ITERATIONS: u32 = 800;

/// The two container formats an image can be served in.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ImageFormat {
    /// 8-bit palette Windows BMP.
    Bmp,
    /// 8-bit grayscale PNG with a stored DEFLATE block.
    Png,
}

impl ImageFormat {
    /// The MIME type a handler should serve this format under.
    pub fn content_type(self) -> &'static str {
        match self {
            ImageFormat::Bmp => "image/bmp",
            ImageFormat::Png => "image/png",
        }
    }

    /// The filename extension for this format.
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Bmp => "bmp",
            ImageFormat::Png => "png",
        }
    }

    /// The widest canvas served in this format.
    pub fn max_width(self) -> u32 {
        match self {
            ImageFormat::Bmp => 800,
            ImageFormat::Png => 320,
        }
    }

    /// The tallest canvas served in this format.
    pub fn max_height(self) -> u32 {
        match self {
            ImageFormat::Bmp => 600,
            ImageFormat::Png => 200,
        }
    }
}

impl Default for ImageFormat {
    fn default() -> ImageFormat {
        ImageFormat::Bmp
    }
}

impl FromStr for ImageFormat {
    type Err = FractalError;

    fn from_str(s: &str) -> Result<ImageFormat, FractalError> {
        match s {
            "bmp" => Ok(ImageFormat::Bmp),
            "png" => Ok(ImageFormat::Png),
            _ => Err(FractalError::UnknownFormat {
                name: s.to_string(),
            }),
        }
    }
}

/// One image request.  Unset fields fall back to the service defaults
/// above; set fields are honored up to the format maxima.
#[derive(Clone, Debug, Default)]
pub struct RenderRequest {
    /// The seed; drawn from process randomness when unset.
    pub seed: Option<u32>,
    /// The fractal family; chosen by the seed's first draw when unset.
    pub kind: Option<FractalKind>,
    /// Requested canvas width, clamped to the format maximum.
    pub width: Option<u32>,
    /// Requested canvas height, clamped to the format maximum.
    pub height: Option<u32>,
    /// Requested iteration budget, capped at `MAX_ITERATIONS`.
    pub iterations: Option<u32>,
    /// The container format to serve.
    pub format: ImageFormat,
}

/// A fully-encoded image plus the metadata a handler needs to build a
/// truthful response around it.
#[derive(Clone, Debug)]
pub struct RenderedImage {
    /// The complete file, ready for transport.
    pub bytes: Vec<u8>,
    /// The seed the renderer actually consumed.
    pub seed: u32,
    /// The family that was rendered.
    pub kind: FractalKind,
    /// Canvas width after clamping.
    pub width: u32,
    /// Canvas height after clamping.
    pub height: u32,
    /// MIME type matching the bytes.
    pub content_type: &'static str,
    /// Suggested download name, `fractal-<seed>.<ext>`.
    pub filename: String,
}

/// Resolves and renders a request on the current thread.
pub fn render(request: &RenderRequest) -> Result<RenderedImage, FractalError> {
    render_threaded(request, 1)
}

/// Resolves and renders a request across `threads` worker threads.
/// The thread count affects wall-clock time only; the bytes are
/// identical to the single-threaded rendering.
pub fn render_threaded(
    request: &RenderRequest,
    threads: usize,
) -> Result<RenderedImage, FractalError> {
    let seed = match request.seed {
        Some(seed) => seed,
        None => thread_rng().gen_range(0, 1_000_000),
    };
    let width = request
        .width
        .unwrap_or(DEFAULT_WIDTH)
        .min(request.format.max_width());
    let height = request
        .height
        .unwrap_or(DEFAULT_HEIGHT)
        .min(request.format.max_height());
    let iterations = request
        .iterations
        .unwrap_or(DEFAULT_ITERATIONS)
        .min(MAX_ITERATIONS);

    if width == 0 || height == 0 {
        return Err(FractalError::EmptyCanvas { width, height });
    }
    if iterations == 0 {
        return Err(FractalError::EmptyBudget);
    }

    let kind = match request.kind {
        Some(kind) => kind,
        None => FractalParams::derive(seed, None).kind,
    };
    debug!(
        "rendering {} {}x{} seed={} iterations={} threads={}",
        kind.name(),
        width,
        height,
        seed,
        iterations,
        threads
    );

    let raster = evaluate_threaded(width, height, iterations, seed, kind, threads)?;
    let bytes = match request.format {
        ImageFormat::Bmp => encode_bmp(width, height, &raster),
        ImageFormat::Png => encode_png(width, height, &raster),
    };
    Ok(RenderedImage {
        bytes,
        seed,
        kind,
        width,
        height,
        content_type: request.format.content_type(),
        filename: format!("fractal-{}.{}", seed, request.format.extension()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(format: ImageFormat) -> RenderRequest {
        RenderRequest {
            seed: Some(42),
            width: Some(16),
            height: Some(12),
            iterations: Some(30),
            format,
            ..Default::default()
        }
    }

    #[test]
    fn defaults_fill_unset_fields() {
        let img = render(&RenderRequest {
            seed: Some(7),
            ..Default::default()
        })
        .unwrap();
        assert_eq!((img.width, img.height), (DEFAULT_WIDTH, DEFAULT_HEIGHT));
        assert_eq!(img.content_type, "image/bmp");
    }

    #[test]
    fn oversize_requests_clamp_to_format_maxima() {
        let mut req = request(ImageFormat::Png);
        req.width = Some(10_000);
        req.height = Some(10_000);
        let img = render(&req).unwrap();
        assert_eq!((img.width, img.height), (320, 200));

        req.format = ImageFormat::Bmp;
        let img = render(&req).unwrap();
        assert_eq!((img.width, img.height), (800, 600));
    }

    #[test]
    fn iteration_budget_is_capped() {
        let mut req = request(ImageFormat::Bmp);
        req.iterations = Some(1_000_000);
        // Capped to 800: the render completes quickly instead of
        // spinning a million iterations per interior pixel.
        let img = render(&req).unwrap();
        assert_eq!(img.seed, 42);
    }

    #[test]
    fn metadata_reports_the_seed_consumed() {
        let img = render(&request(ImageFormat::Png)).unwrap();
        assert_eq!(img.seed, 42);
        assert_eq!(img.filename, "fractal-42.png");
        assert_eq!(img.content_type, "image/png");
    }

    #[test]
    fn fixed_seed_renders_identical_bytes() {
        let a = render(&request(ImageFormat::Bmp)).unwrap();
        let b = render(&request(ImageFormat::Bmp)).unwrap();
        assert_eq!(a.bytes, b.bytes);
    }

    #[test]
    fn threaded_render_matches_single_threaded() {
        let single = render(&request(ImageFormat::Png)).unwrap();
        let threaded = render_threaded(&request(ImageFormat::Png), 4).unwrap();
        assert_eq!(single.bytes, threaded.bytes);
    }

    #[test]
    fn format_picks_the_container() {
        let bmp = render(&request(ImageFormat::Bmp)).unwrap();
        assert_eq!(&bmp.bytes[..2], b"BM");
        let png = render(&request(ImageFormat::Png)).unwrap();
        assert_eq!(&png.bytes[..8], &::png::SIGNATURE[..]);
    }

    #[test]
    fn unspecified_family_comes_from_the_seed() {
        let mut req = request(ImageFormat::Bmp);
        req.seed = Some(300);
        assert_eq!(render(&req).unwrap().kind, FractalKind::Julia);
        req.seed = Some(1455);
        assert_eq!(render(&req).unwrap().kind, FractalKind::BurningShip);
    }

    #[test]
    fn zero_dimensions_are_rejected_not_defaulted() {
        let mut req = request(ImageFormat::Bmp);
        req.width = Some(0);
        assert!(render(&req).is_err());

        let mut req = request(ImageFormat::Bmp);
        req.iterations = Some(0);
        assert!(render(&req).is_err());
    }

    #[test]
    fn format_names_parse() {
        assert_eq!("bmp".parse::<ImageFormat>().unwrap(), ImageFormat::Bmp);
        assert_eq!("png".parse::<ImageFormat>().unwrap(), ImageFormat::Png);
        assert!("gif".parse::<ImageFormat>().is_err());
    }
}
