//! PDF rasterisation: render every page of a statement to `DynamicImage` via pdfium.
//!
//! pdfium keeps thread-local state and blocks for the whole render, so the
//! work runs on `tokio::task::spawn_blocking`. Pages are rendered at a fixed
//! zoom factor and capped at `max_rendered_pixels` on either edge.

use crate::config::AnalysisConfig;
use crate::error::StatementError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use tracing::{debug, info};

/// Environment variable naming a pdfium library file or the directory holding it.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Bind to a pdfium library.
///
/// Resolution order: `PDFIUM_LIB_PATH` (file or directory), the current
/// working directory, then the system library search path.
pub fn bind_pdfium() -> Result<Pdfium, StatementError> {
    let mut attempts: Vec<String> = Vec::new();

    if let Ok(raw) = std::env::var(PDFIUM_LIB_PATH_ENV) {
        if !raw.is_empty() {
            let path = PathBuf::from(&raw);
            let lib = if path.is_dir() {
                Pdfium::pdfium_platform_library_name_at_path(&path)
            } else {
                path
            };
            match Pdfium::bind_to_library(&lib) {
                Ok(bindings) => {
                    debug!("Bound pdfium from {}", lib.display());
                    return Ok(Pdfium::new(bindings));
                }
                Err(e) => attempts.push(format!("{}: {:?}", lib.display(), e)),
            }
        }
    }

    let local = Pdfium::pdfium_platform_library_name_at_path("./");
    match Pdfium::bind_to_library(&local) {
        Ok(bindings) => {
            debug!("Bound pdfium from {}", local.display());
            return Ok(Pdfium::new(bindings));
        }
        Err(e) => attempts.push(format!("{}: {:?}", local.display(), e)),
    }

    match Pdfium::bind_to_system_library() {
        Ok(bindings) => Ok(Pdfium::new(bindings)),
        Err(e) => {
            attempts.push(format!("system library: {:?}", e));
            Err(StatementError::PdfiumBindingFailed(attempts.join("; ")))
        }
    }
}

/// Rasterise every page of an in-memory PDF.
///
/// # Returns
/// One image per page, in page order.
pub async fn render_pdf(
    name: &str,
    bytes: Vec<u8>,
    config: &AnalysisConfig,
) -> Result<Vec<DynamicImage>, StatementError> {
    let name = name.to_string();
    let scale = config.render_scale;
    let max_pixels = config.max_rendered_pixels;
    let password = config.password.clone();

    tokio::task::spawn_blocking(move || {
        render_pdf_blocking(&name, &bytes, scale, max_pixels, password.as_deref())
    })
    .await
    .map_err(|e| StatementError::Internal(format!("Render task panicked: {}", e)))?
}

/// Blocking implementation of page rendering.
fn render_pdf_blocking(
    name: &str,
    bytes: &[u8],
    scale: f32,
    max_pixels: u32,
    password: Option<&str>,
) -> Result<Vec<DynamicImage>, StatementError> {
    let pdfium = bind_pdfium()?;

    let document = pdfium
        .load_pdf_from_byte_slice(bytes, password)
        .map_err(|e| classify_load_error(name, password.is_some(), format!("{:?}", e)))?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("{}: {} pages", name, total_pages);

    let render_config = PdfRenderConfig::new()
        .scale_page_by_factor(scale)
        .set_maximum_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let mut images = Vec::with_capacity(total_pages);

    for (idx, page) in pages.iter().enumerate() {
        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            StatementError::RasterisationFailed {
                name: name.to_string(),
                page: idx + 1,
                detail: format!("{:?}", e),
            }
        })?;

        let image = bitmap.as_image();
        debug!(
            "{}: rendered page {} → {}x{} px",
            name,
            idx + 1,
            image.width(),
            image.height()
        );
        images.push(image);
    }

    Ok(images)
}

/// Map a pdfium load failure onto the password or corruption variants.
fn classify_load_error(name: &str, had_password: bool, detail: String) -> StatementError {
    if detail.contains("Password") || detail.contains("password") {
        if had_password {
            StatementError::WrongPassword {
                name: name.to_string(),
            }
        } else {
            StatementError::PasswordRequired {
                name: name.to_string(),
            }
        }
    } else {
        StatementError::CorruptPdf {
            name: name.to_string(),
            detail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_errors_are_classified() {
        let e = classify_load_error("a.pdf", false, "PdfiumLibraryInternalError(PasswordError)".into());
        assert!(matches!(e, StatementError::PasswordRequired { .. }));

        let e = classify_load_error("a.pdf", true, "PdfiumLibraryInternalError(PasswordError)".into());
        assert!(matches!(e, StatementError::WrongPassword { .. }));

        let e = classify_load_error("a.pdf", false, "PdfiumLibraryInternalError(FormatError)".into());
        match e {
            StatementError::CorruptPdf { name, detail } => {
                assert_eq!(name, "a.pdf");
                assert!(detail.contains("FormatError"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
