// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! An 8-bit paletted Windows BMP writer.
//!
//! BMP stores rows bottom-up unless the header declares a negative
//! height, in which case rows run top-down and the raster can be
//! copied straight through without a vertical flip.  This writer
//! always declares the negative height.  Pixels are single bytes
//! indexing a 256-entry grayscale palette in which entry `i` is the
//! gray level `i`, so the palette lookup is the identity and decoders
//! recover the raster bytes exactly.  Every multi-byte header field is
//! little-endian.

/// BITMAPFILEHEADER plus BITMAPINFOHEADER.
const HEADERS_SIZE: usize = 14 + 40;

/// 256 palette entries of four bytes each.
const PALETTE_SIZE: usize = 256 * 4;

/// 2835 pixels per meter, roughly 72 DPI.
const PPM: i32 = 2835;

/// Serializes a row-major grayscale raster into a complete BMP byte
/// stream.  The raster must hold exactly `width * height` bytes; each
/// output row is padded with zeros to the next multiple of four bytes.
pub fn encode_bmp(width: u32, height: u32, raster: &[u8]) -> Vec<u8> {
    assert!(raster.len() == width as usize * height as usize);
    let row_size = (width as usize * 8 + 31) / 32 * 4;
    let image_size = row_size * height as usize;
    let file_size = HEADERS_SIZE + PALETTE_SIZE + image_size;

    let mut out = Vec::with_capacity(file_size);

    // BITMAPFILEHEADER: magic, file size, two reserved words, offset
    // of the pixel data past both headers and the palette.
    out.extend_from_slice(b"BM");
    out.extend_from_slice(&(file_size as u32).to_le_bytes());
    out.extend_from_slice(&[0u8; 4]);
    out.extend_from_slice(&((HEADERS_SIZE + PALETTE_SIZE) as u32).to_le_bytes());

    // BITMAPINFOHEADER.  The negative height marks top-down row
    // order.
    out.extend_from_slice(&40u32.to_le_bytes());
    out.extend_from_slice(&(width as i32).to_le_bytes());
    out.extend_from_slice(&(-(height as i64) as i32).to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // color planes
    out.extend_from_slice(&8u16.to_le_bytes()); // bits per pixel
    out.extend_from_slice(&0u32.to_le_bytes()); // BI_RGB, no compression
    out.extend_from_slice(&(image_size as u32).to_le_bytes());
    out.extend_from_slice(&PPM.to_le_bytes());
    out.extend_from_slice(&PPM.to_le_bytes());
    out.extend_from_slice(&256u32.to_le_bytes()); // palette entries
    out.extend_from_slice(&256u32.to_le_bytes()); // all of them matter

    // Grayscale palette: B, G, R, reserved per entry.
    for i in 0..256 {
        let v = i as u8;
        out.extend_from_slice(&[v, v, v, 0]);
    }

    // Pixel rows, top row first, zero-padded out to row_size.
    let padding = [0u8; 3];
    let pad = row_size - width as usize;
    for row in raster.chunks(width as usize) {
        out.extend_from_slice(row);
        out.extend_from_slice(&padding[..pad]);
    }
    out
}
