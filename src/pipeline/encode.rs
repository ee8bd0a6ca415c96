//! Image encoding: `DynamicImage` → PNG bytes, and PNG → base64 for reports
//! that carry the thumbnail inline.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode a rendered page as PNG.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    debug!("Encoded {}x{} image → {} bytes PNG", img.width(), img.height(), buf.len());
    Ok(buf)
}

/// Standard base64 of a PNG, without a data-URI prefix.
pub fn to_base64(png: &[u8]) -> String {
    STANDARD.encode(png)
}
