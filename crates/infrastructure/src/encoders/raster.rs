//! Monochrome rasterisation of base64 images.

use base64::Engine;
use domain::DomainError;
use domain::error::Result;
use image::imageops::FilterType;
use tracing::debug;

/// 1-bit bitmap, rows packed MSB first, `1` = black
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonoBitmap {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl MonoBitmap {
    pub fn width_bytes(&self) -> u32 {
        self.width.div_ceil(8)
    }

    /// Same bitmap with `0` = black, as TSPL `BITMAP` expects
    pub fn inverted(&self) -> Vec<u8> {
        self.data.iter().map(|b| !b).collect()
    }

    /// Uppercase hex dump for CPCL `EG`
    pub fn to_hex(&self) -> String {
        self.data.iter().map(|b| format!("{:02X}", b)).collect()
    }
}

/// Decode base64 content, accepting an optional `data:...;base64,` prefix
pub fn decode_base64(field: &str, content: &str) -> Result<Vec<u8>> {
    let payload = match content.find("base64,") {
        Some(start) if content.starts_with("data:") => &content[start + 7..],
        _ => content,
    };
    let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(cleaned.as_bytes())
        .map_err(|e| DomainError::ContentError(format!("{} is not valid base64: {}", field, e)))
}

/// Decode a base64 PNG/JPEG/BMP and threshold it to at most `max_width`
/// dots wide. Images are scaled down, never up.
pub fn rasterize(content: &str, max_width: u32) -> Result<MonoBitmap> {
    let bytes = decode_base64("image", content)?;
    let img = image::load_from_memory(&bytes)
        .map_err(|e| DomainError::ContentError(format!("unsupported image: {}", e)))?;

    let (w, h) = (img.width(), img.height());
    if w == 0 || h == 0 {
        return Err(DomainError::ContentError("image is empty".to_string()));
    }

    let (new_w, new_h) = if w > max_width.max(1) {
        let target = max_width.max(1);
        let scaled_h = (u64::from(h) * u64::from(target) / u64::from(w)).max(1);
        (target, scaled_h as u32)
    } else {
        (w, h)
    };
    if new_h > u32::from(u16::MAX) {
        return Err(DomainError::ContentError(format!(
            "image height {} too large",
            new_h
        )));
    }

    let rgba = if (new_w, new_h) == (w, h) {
        img.to_rgba8()
    } else {
        img.resize_exact(new_w, new_h, FilterType::Nearest).to_rgba8()
    };

    let width_bytes = new_w.div_ceil(8) as usize;
    let mut data = vec![0u8; width_bytes * new_h as usize];
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        // Transparent counts as paper
        if a < 128 {
            continue;
        }
        let luma = (299 * u32::from(r) + 587 * u32::from(g) + 114 * u32::from(b)) / 1000;
        if luma < 128 {
            data[y as usize * width_bytes + (x / 8) as usize] |= 0x80 >> (x % 8);
        }
    }

    debug!(width = new_w, height = new_h, "Rasterised image");
    Ok(MonoBitmap {
        width: new_w,
        height: new_h,
        data,
    })
}
