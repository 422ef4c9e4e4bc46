//! Pipeline stages for per-page PDF loading.
//!
//! Each submodule implements one step. The stages are independent so each can
//! be tested on its own and the PDF library or conversion engine can be
//! swapped without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ split ──▶ engine ──▶ assemble
//! (validate) (1-page PDF) (structured doc) (OutputDocument)
//!                         │
//!                         └─ vision: render ─▶ llm ─▶ postprocess ─▶ document
//! ```
//!
//! 1. [`input`]    : check the source exists, is readable and starts with `%PDF`
//! 2. [`pdf`]      : page counting and page-range extraction (pdfium)
//! 3. [`split`]    : cut page *i* into a temporary single-page PDF artifact
//! 4. [`engine`]   : the conversion capability and its config-pinning adapter
//! 5. [`assemble`] : render the structured document and attach page metadata
//!
//! The built-in engine lives in [`vision`]. It uses [`render`] for the text
//! layer and rasterisation, [`llm`] for the model call, [`postprocess`] to
//! sanitise model output and [`document`] for the block model.

pub mod assemble;
pub mod document;
pub mod engine;
pub mod input;
pub mod llm;
pub mod pdf;
pub mod postprocess;
pub mod render;
pub mod split;
pub mod vision;
