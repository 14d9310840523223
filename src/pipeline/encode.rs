//! Image encoding: pages and image files → base64 [`ImagePart`]s.
//!
//! Rasterised PDF pages are JPEG-encoded: a statement page is mostly flat
//! white with dark text, which JPEG at quality 80 keeps legible at a fraction
//! of the PNG size, so multi-page statements stay under request size limits.
//! Image files are never re-encoded; their bytes are sent as uploaded.

use crate::pipeline::intake::StatementFile;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One inline image for the model request: raw base64, no `data:` prefix.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ImagePart {
    pub mime_type: String,
    pub data: String,
}

impl std::fmt::Debug for ImagePart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImagePart")
            .field("mime_type", &self.mime_type)
            .field("data_len", &self.data.len())
            .finish()
    }
}

/// Encode a rasterised page as base64 JPEG.
pub fn encode_page(img: &DynamicImage, quality: u8) -> Result<ImagePart, image::ImageError> {
    // JPEG has no alpha channel; pdfium renders RGBA.
    let rgb = img.to_rgb8();
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality).encode_image(&rgb)?;

    let data = STANDARD.encode(&buf);
    debug!("Encoded page → {} bytes base64", data.len());

    Ok(ImagePart {
        mime_type: "image/jpeg".to_string(),
        data,
    })
}

/// Wrap an image file's original bytes without re-encoding.
pub fn encode_passthrough(file: &StatementFile) -> ImagePart {
    ImagePart {
        mime_type: file.mime_type.clone(),
        data: STANDARD.encode(&file.bytes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn encode_page_produces_jpeg() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(16, 16, Rgba([255, 255, 255, 255])));
        let part = encode_page(&img, 80).expect("encode should succeed");
        assert_eq!(part.mime_type, "image/jpeg");
        assert!(!part.data.starts_with("data:"));
        let decoded = STANDARD.decode(&part.data).expect("valid base64");
        // JPEG SOI marker
        assert_eq!(&decoded[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn passthrough_keeps_bytes_and_mime() {
        let file = StatementFile {
            name: "scan.webp".into(),
            kind: crate::pipeline::intake::FileKind::Image,
            mime_type: "image/webp".into(),
            bytes: vec![1, 2, 3, 4, 5],
        };
        let part = encode_passthrough(&file);
        assert_eq!(part.mime_type, "image/webp");
        assert_eq!(STANDARD.decode(&part.data).unwrap(), vec![1, 2, 3, 4, 5]);
    }
}
