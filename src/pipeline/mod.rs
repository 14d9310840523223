//! Pipeline stages for statement analysis.
//!
//! Each submodule implements exactly one transformation step.
//!
//! ## Data Flow
//!
//! ```text
//! intake ──▶ render ──▶ encode ──▶ request ──▶ extractor ──▶ normalize
//! (files)    (pdfium)   (base64)   (+prompt,   (gemini /     (typed
//!                                   schema)     provider)     transactions)
//! ```
//!
//! 1. [`intake`]    — read files and classify them as PDF or image
//! 2. [`render`]    — rasterise PDF pages; runs in `spawn_blocking` because
//!    pdfium is not async-safe
//! 3. [`encode`]    — JPEG-encode pages, pass image files through, base64-wrap
//! 4. [`request`]   — bundle all parts with the prompt and response schema
//! 5. [`extractor`] — the model seam, implemented by [`gemini`] and
//!    [`provider`]; the only stage with network I/O
//! 6. [`normalize`] — coerce the JSON reply into [`crate::Transaction`]s

pub mod encode;
pub mod extractor;
pub mod gemini;
pub mod intake;
pub mod normalize;
pub mod provider;
pub mod render;
pub mod request;
