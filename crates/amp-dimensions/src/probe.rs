//! Image header sniffing.
//!
//! Only the first few hundred bytes of an image are needed to learn its size,
//! so the fetcher reads a bounded prefix and hands it to [`probe_dimensions`].

use std::sync::LazyLock;

use regex::Regex;

use crate::Dimensions;

static SVG_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<svg\b([^>]*)>").unwrap());
static SVG_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:^|\s)(width|height|viewbox)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap()
});

/// Detect the pixel size of an image from its leading bytes.
///
/// Recognizes PNG, GIF, JPEG, WebP, BMP and SVG. Returns `None` when the
/// format is unknown, the header is truncated, or either side is zero.
#[must_use]
pub fn probe_dimensions(bytes: &[u8]) -> Option<Dimensions> {
    probe_png(bytes)
        .or_else(|| probe_gif(bytes))
        .or_else(|| probe_jpeg(bytes))
        .or_else(|| probe_webp(bytes))
        .or_else(|| probe_bmp(bytes))
        .or_else(|| probe_svg(bytes))
}

fn nonzero(width: u32, height: u32) -> Option<Dimensions> {
    (width > 0 && height > 0).then_some(Dimensions::new(width, height))
}

fn probe_png(bytes: &[u8]) -> Option<Dimensions> {
    // 8-byte signature, then IHDR with width/height at bytes 16..24 (big-endian)
    if bytes.len() < 24 || &bytes[..8] != b"\x89PNG\r\n\x1a\n" || &bytes[12..16] != b"IHDR" {
        return None;
    }
    let width = u32::from_be_bytes([bytes[16], bytes[17], bytes[18], bytes[19]]);
    let height = u32::from_be_bytes([bytes[20], bytes[21], bytes[22], bytes[23]]);
    nonzero(width, height)
}

fn probe_gif(bytes: &[u8]) -> Option<Dimensions> {
    if bytes.len() < 10 || (&bytes[..6] != b"GIF87a" && &bytes[..6] != b"GIF89a") {
        return None;
    }
    let width = u16::from_le_bytes([bytes[6], bytes[7]]);
    let height = u16::from_le_bytes([bytes[8], bytes[9]]);
    nonzero(u32::from(width), u32::from(height))
}

fn probe_jpeg(bytes: &[u8]) -> Option<Dimensions> {
    if bytes.len() < 4 || bytes[0] != 0xFF || bytes[1] != 0xD8 {
        return None;
    }
    let mut i = 2;
    while i + 1 < bytes.len() {
        while i < bytes.len() && bytes[i] != 0xFF {
            i += 1;
        }
        while i < bytes.len() && bytes[i] == 0xFF {
            i += 1;
        }
        if i >= bytes.len() {
            return None;
        }
        let marker = bytes[i];
        i += 1;

        // End of image or start of scan: no frame header before the data
        if marker == 0xD9 || marker == 0xDA {
            return None;
        }
        if i + 1 >= bytes.len() {
            return None;
        }
        let segment_len = usize::from(u16::from_be_bytes([bytes[i], bytes[i + 1]]));
        if segment_len < 2 {
            return None;
        }
        let payload = i + 2;
        if is_sof_marker(marker) {
            if payload + 4 >= bytes.len() {
                return None;
            }
            let height = u16::from_be_bytes([bytes[payload + 1], bytes[payload + 2]]);
            let width = u16::from_be_bytes([bytes[payload + 3], bytes[payload + 4]]);
            return nonzero(u32::from(width), u32::from(height));
        }
        i += segment_len;
    }
    None
}

fn is_sof_marker(marker: u8) -> bool {
    matches!(
        marker,
        0xC0 | 0xC1 | 0xC2 | 0xC3 | 0xC5 | 0xC6 | 0xC7 | 0xC9 | 0xCA | 0xCB | 0xCD | 0xCE | 0xCF
    )
}

fn probe_webp(bytes: &[u8]) -> Option<Dimensions> {
    if bytes.len() < 30 || &bytes[..4] != b"RIFF" || &bytes[8..12] != b"WEBP" {
        return None;
    }
    let chunk = &bytes[12..16];
    let payload = &bytes[20..];
    match chunk {
        b"VP8X" => {
            let width = u32::from_le_bytes([payload[4], payload[5], payload[6], 0]) + 1;
            let height = u32::from_le_bytes([payload[7], payload[8], payload[9], 0]) + 1;
            nonzero(width, height)
        }
        b"VP8L" if payload[0] == 0x2F => {
            let bits = u32::from_le_bytes([payload[1], payload[2], payload[3], payload[4]]);
            nonzero((bits & 0x3FFF) + 1, ((bits >> 14) & 0x3FFF) + 1)
        }
        b"VP8 " if payload[3..6] == [0x9D, 0x01, 0x2A] => {
            let width = u16::from_le_bytes([payload[6], payload[7]]) & 0x3FFF;
            let height = u16::from_le_bytes([payload[8], payload[9]]) & 0x3FFF;
            nonzero(u32::from(width), u32::from(height))
        }
        _ => None,
    }
}

fn probe_bmp(bytes: &[u8]) -> Option<Dimensions> {
    if bytes.len() < 26 || &bytes[..2] != b"BM" {
        return None;
    }
    let width = i32::from_le_bytes([bytes[18], bytes[19], bytes[20], bytes[21]]);
    // Negative height marks a top-down bitmap
    let height = i32::from_le_bytes([bytes[22], bytes[23], bytes[24], bytes[25]]);
    nonzero(width.unsigned_abs(), height.unsigned_abs())
}

fn probe_svg(bytes: &[u8]) -> Option<Dimensions> {
    let text = String::from_utf8_lossy(bytes);
    let attrs = SVG_TAG_RE.captures(&text)?.get(1)?.as_str();

    let mut width = None;
    let mut height = None;
    let mut view_box = None;
    for caps in SVG_ATTR_RE.captures_iter(attrs) {
        let value = caps.get(2).or_else(|| caps.get(3)).map_or("", |m| m.as_str());
        match caps[1].to_ascii_lowercase().as_str() {
            "width" => width = svg_length(value),
            "height" => height = svg_length(value),
            _ => view_box = svg_view_box(value),
        }
    }

    let (w, h) = match (width, height) {
        (Some(w), Some(h)) => (w, h),
        _ => view_box?,
    };
    nonzero(round_px(w)?, round_px(h)?)
}

/// Convert an SVG length to CSS pixels. Percentages are not absolute.
fn svg_length(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let split = raw
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-' || c == '+'))
        .unwrap_or(raw.len());
    let value: f64 = raw[..split].parse().ok()?;
    let factor = match raw[split..].trim().to_ascii_lowercase().as_str() {
        "" | "px" => 1.0,
        "pt" => 96.0 / 72.0,
        "pc" => 16.0,
        "in" => 96.0,
        "cm" => 96.0 / 2.54,
        "mm" => 96.0 / 25.4,
        _ => return None,
    };
    Some(value * factor)
}

fn svg_view_box(raw: &str) -> Option<(f64, f64)> {
    let nums: Vec<f64> = raw
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|part| !part.is_empty())
        .map(str::parse)
        .collect::<Result<_, _>>()
        .ok()?;
    match nums.as_slice() {
        [_, _, w, h] if *w > 0.0 && *h > 0.0 => Some((*w, *h)),
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn round_px(value: f64) -> Option<u32> {
    let rounded = value.round();
    (rounded >= 1.0 && rounded <= f64::from(u32::MAX)).then_some(rounded as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_png() {
        let mut png = b"\x89PNG\r\n\x1a\n".to_vec();
        png.extend_from_slice(&[0, 0, 0, 13]);
        png.extend_from_slice(b"IHDR");
        png.extend_from_slice(&800u32.to_be_bytes());
        png.extend_from_slice(&450u32.to_be_bytes());
        png.extend_from_slice(&[8, 2, 0, 0, 0]);
        assert_eq!(probe_dimensions(&png), Some(Dimensions::new(800, 450)));
    }

    #[test]
    fn test_probe_truncated_png() {
        assert_eq!(probe_dimensions(b"\x89PNG\r\n\x1a\n\0\0\0\x0dIHDR"), None);
    }

    #[test]
    fn test_probe_gif() {
        let gif = *b"GIF89a\x20\x03\x58\x02\0\0";
        assert_eq!(probe_dimensions(&gif), Some(Dimensions::new(800, 600)));
    }

    #[test]
    fn test_probe_jpeg_skips_app_segments() {
        let jpeg = [
            0xFF, 0xD8, // SOI
            0xFF, 0xE0, 0x00, 0x10, // APP0, length 16
            b'J', b'F', b'I', b'F', 0, 1, 1, 0, 0, 1, 0, 1, 0, 0, // APP0 payload
            0xFF, 0xC0, 0x00, 0x11, // SOF0, length 17
            0x08, // precision
            0x01, 0xC2, // height 450
            0x03, 0x20, // width 800
            0x03, 0x01, 0x11, 0x00, 0x02, 0x11, 0x00, 0x03, 0x11, 0x00, 0xFF, 0xD9,
        ];
        assert_eq!(probe_dimensions(&jpeg), Some(Dimensions::new(800, 450)));
    }

    #[test]
    fn test_probe_jpeg_without_frame_header() {
        let jpeg = [0xFF, 0xD8, 0xFF, 0xDA, 0x00, 0x08, 0, 0, 0, 0, 0, 0];
        assert_eq!(probe_dimensions(&jpeg), None);
    }

    #[test]
    fn test_probe_webp_extended() {
        let mut webp = b"RIFF".to_vec();
        webp.extend_from_slice(&0u32.to_le_bytes());
        webp.extend_from_slice(b"WEBPVP8X");
        webp.extend_from_slice(&10u32.to_le_bytes());
        webp.extend_from_slice(&[0, 0, 0, 0]);
        webp.extend_from_slice(&[0x1F, 0x03, 0x00]); // width - 1 = 799
        webp.extend_from_slice(&[0x57, 0x02, 0x00]); // height - 1 = 599
        assert_eq!(probe_dimensions(&webp), Some(Dimensions::new(800, 600)));
    }

    #[test]
    fn test_probe_bmp_top_down() {
        let mut bmp = b"BM".to_vec();
        bmp.extend_from_slice(&[0; 16]);
        bmp.extend_from_slice(&640i32.to_le_bytes());
        bmp.extend_from_slice(&(-480i32).to_le_bytes());
        assert_eq!(probe_dimensions(&bmp), Some(Dimensions::new(640, 480)));
    }

    #[test]
    fn test_probe_svg_width_height() {
        let svg = br#"<?xml version="1.0"?><svg xmlns="http://www.w3.org/2000/svg" width="120px" height="40"></svg>"#;
        assert_eq!(probe_dimensions(svg), Some(Dimensions::new(120, 40)));
    }

    #[test]
    fn test_probe_svg_view_box() {
        let svg = br#"<svg viewBox="0 0 300 150" width="100%"><rect/></svg>"#;
        assert_eq!(probe_dimensions(svg), Some(Dimensions::new(300, 150)));
    }

    #[test]
    fn test_probe_unknown_format() {
        assert_eq!(probe_dimensions(b"<html><body>404</body></html>"), None);
        assert_eq!(probe_dimensions(b""), None);
    }
}
