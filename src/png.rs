// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A minimal grayscale PNG writer.
//!
//! PNG tolerates an encoder that refuses to compress: the DEFLATE
//! format has a "stored" block type that carries raw bytes verbatim,
//! and a conformant decoder cannot tell the difference.  So this
//! writer emits the signature, an IHDR describing an 8-bit grayscale
//! image, one IDAT whose zlib stream is a single stored block of the
//! filter-prefixed scanlines, and an IEND.  The output is larger than
//! a compressing encoder's, and decodes identically everywhere.
//!
//! A stored block's length field is sixteen bits, which caps the
//! scanline buffer at 65535 bytes.  The service layer clamps PNG
//! canvases to 320x200, comfortably inside that.

/// The eight fixed bytes every PNG starts with.
pub const SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// CRC-32 as PNG requires it: the reflected `0xEDB88320` polynomial,
/// initial and final complement of all ones.  The lookup table is
/// built once per value and shared across every chunk of an encode.
pub struct Crc32 {
    table: [u32; 256],
}

impl Crc32 {
    /// Builds the 256-entry lookup table.
    pub fn new() -> Crc32 {
        let mut table = [0u32; 256];
        for (n, entry) in table.iter_mut().enumerate() {
            let mut c = n as u32;
            for _ in 0..8 {
                c = if c & 1 != 0 {
                    0xEDB8_8320 ^ (c >> 1)
                } else {
                    c >> 1
                };
            }
            *entry = c;
        }
        Crc32 { table }
    }

    /// Checksum of one buffer.
    pub fn sum(&self, data: &[u8]) -> u32 {
        self.sum_parts(&[data])
    }

    /// Checksum of several buffers as if they were one, which is how a
    /// chunk CRC covers the type tag and the data without
    /// concatenating them.
    pub fn sum_parts(&self, parts: &[&[u8]]) -> u32 {
        let mut c: u32 = 0xFFFF_FFFF;
        for part in parts {
            for &byte in part.iter() {
                c = self.table[((c ^ u32::from(byte)) & 0xFF) as usize] ^ (c >> 8);
            }
        }
        c ^ 0xFFFF_FFFF
    }
}

impl Default for Crc32 {
    fn default() -> Crc32 {
        Crc32::new()
    }
}

/// Adler-32 as the zlib container requires it: `a` starts at one, `b`
/// at zero, both reduced modulo 65521 per byte.
pub fn adler32(data: &[u8]) -> u32 {
    let mut a: u32 = 1;
    let mut b: u32 = 0;
    for &byte in data {
        a = (a + u32::from(byte)) % 65_521;
        b = (b + a) % 65_521;
    }
    (b << 16) | a
}

/// Serializes a row-major grayscale raster into a complete PNG byte
/// stream.  The raster must hold exactly `width * height` bytes, and
/// the scanline buffer (`height * (width + 1)` bytes) must fit a
/// single stored DEFLATE block.
pub fn encode_png(width: u32, height: u32, raster: &[u8]) -> Vec<u8> {
    assert!(raster.len() == width as usize * height as usize);
    let scan_len = height as usize * (width as usize + 1);
    assert!(scan_len <= 0xFFFF, "scanline buffer exceeds one stored block");

    let crc = Crc32::new();
    let mut out = Vec::with_capacity(scan_len + 128);
    out.extend_from_slice(&SIGNATURE);

    // IHDR: dimensions, then bit depth 8, color type 0 (grayscale),
    // compression 0, filter 0, interlace 0.
    let mut ihdr = [0u8; 13];
    ihdr[0..4].copy_from_slice(&width.to_be_bytes());
    ihdr[4..8].copy_from_slice(&height.to_be_bytes());
    ihdr[8..13].copy_from_slice(&[8, 0, 0, 0, 0]);
    write_chunk(&mut out, b"IHDR", &ihdr, &crc);

    // Each scanline gets filter type 0 ("None") prefixed.
    let mut scan = Vec::with_capacity(scan_len);
    for row in raster.chunks(width as usize) {
        scan.push(0);
        scan.extend_from_slice(row);
    }

    // Zlib wrapper around one stored block: header 78 01, block header
    // 01 (final, uncompressed), LE length, LE one's-complement length,
    // the raw scanlines, then the BE Adler-32 of the scanlines alone.
    let mut idat = Vec::with_capacity(scan.len() + 11);
    idat.extend_from_slice(&[0x78, 0x01, 0x01]);
    let len = scan.len() as u16;
    idat.extend_from_slice(&len.to_le_bytes());
    idat.extend_from_slice(&(!len).to_le_bytes());
    idat.extend_from_slice(&scan);
    idat.extend_from_slice(&adler32(&scan).to_be_bytes());
    write_chunk(&mut out, b"IDAT", &idat, &crc);

    write_chunk(&mut out, b"IEND", &[], &crc);
    out
}

/// One chunk: BE data length, four-byte type tag, data, then the BE
/// CRC over tag and data (the length is not covered).
fn write_chunk(out: &mut Vec<u8>, tag: &[u8; 4], data: &[u8], crc: &Crc32) {
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(tag);
    out.extend_from_slice(data);
    out.extend_from_slice(&crc.sum_parts(&[tag, data]).to_be_bytes());
}

#[cfg(test)]
mod tests {
    extern crate image;

    use super::*;

    #[test]
    fn crc32_matches_the_published_check_value() {
        let crc = Crc32::new();
        assert_eq!(crc.sum(b"123456789"), 0xCBF4_3926);
        assert_eq!(crc.sum(b"IEND"), 0xAE42_6082);
        assert_eq!(crc.sum(b""), 0);
    }

    #[test]
    fn crc32_over_parts_equals_crc32_over_whole() {
        let crc = Crc32::new();
        assert_eq!(
            crc.sum_parts(&[b"IDAT", b"payload"]),
            crc.sum(b"IDATpayload")
        );
    }

    #[test]
    fn adler32_matches_the_published_check_value() {
        assert_eq!(adler32(b"Wikipedia"), 0x11E6_0398);
        assert_eq!(adler32(b""), 1);
    }

    #[test]
    fn golden_two_by_two() {
        // Full byte dump for a 2x2 raster, pinned against an
        // independent construction validated with a reference zlib.
        let png = encode_png(2, 2, &[0, 255, 128, 64]);
        let expected: [u8; 74] = [
            137, 80, 78, 71, 13, 10, 26, 10, // signature
            0, 0, 0, 13, 73, 72, 68, 82, // IHDR length + tag
            0, 0, 0, 2, 0, 0, 0, 2, 8, 0, 0, 0, 0, // IHDR data
            87, 221, 82, 248, // IHDR crc
            0, 0, 0, 17, 73, 68, 65, 84, // IDAT length + tag
            120, 1, 1, 6, 0, 249, 255, // zlib + stored block header
            0, 0, 255, 0, 128, 64, // filtered scanlines
            5, 66, 1, 192, // adler32
            121, 233, 9, 196, // IDAT crc
            0, 0, 0, 0, 73, 69, 78, 68, // IEND length + tag
            174, 66, 96, 130, // IEND crc
        ];
        assert_eq!(png, expected.to_vec());
    }

    #[test]
    fn stored_block_length_fields_complement() {
        let png = encode_png(3, 1, &[1, 2, 3]);
        // IDAT data starts after signature (8) + IHDR (25) + length and
        // tag (8); the stored block header sits 2 bytes into the zlib
        // stream.
        let block = &png[8 + 25 + 8 + 2..];
        assert_eq!(block[0], 0x01);
        let len = u16::from(block[1]) | u16::from(block[2]) << 8;
        let nlen = u16::from(block[3]) | u16::from(block[4]) << 8;
        assert_eq!(len, 4); // filter byte + three pixels
        assert_eq!(nlen, !len);
    }

    #[test]
    fn decoder_round_trip_is_lossless() {
        let raster: Vec<u8> = (0u32..64 * 48).map(|i| (i * 7 % 256) as u8).collect();
        let png = encode_png(64, 48, &raster);
        let decoded = image::load_from_memory_with_format(&png, image::ImageFormat::PNG)
            .expect("reference decoder rejected our PNG")
            .to_luma();
        assert_eq!(decoded.dimensions(), (64, 48));
        assert_eq!(decoded.into_raw(), raster);
    }

    #[test]
    fn largest_served_canvas_still_fits_one_block() {
        // 320x200 is the service-layer ceiling for PNG; its scanline
        // buffer is 200 * 321 = 64200 bytes, inside the 65535 cap.
        let raster = vec![17u8; 320 * 200];
        let png = encode_png(320, 200, &raster);
        let decoded = image::load_from_memory_with_format(&png, image::ImageFormat::PNG)
            .unwrap()
            .to_luma();
        assert_eq!(decoded.into_raw(), raster);
    }
}
