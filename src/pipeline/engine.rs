//! The conversion-engine capability and the adapter that pins its config.
//!
//! [`ConversionEngine`] is anything that turns a single-page PDF into a
//! [`StructuredDocument`]. The built-in implementation is
//! [`crate::pipeline::vision::VisionEngine`]; tests plug in fakes.
//!
//! [`EngineAdapter`] owns one engine plus the [`EngineConfig`] it runs with.
//! The config is fixed at construction. The adapter serialises calls with an
//! async mutex because an engine is not assumed to tolerate concurrent use:
//! several loaders may share one adapter through an `Arc`, but only one page
//! is ever inside the engine at a time.

use crate::config::{EngineConfig, VisionOptions};
use crate::error::LoaderError;
use crate::pipeline::document::StructuredDocument;
use crate::pipeline::split::PageArtifact;
use crate::pipeline::vision::VisionEngine;
use std::future::Future;
use std::path::Path;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

/// Failure reported by an engine for one page.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// The engine's backing service or library could not be reached.
    #[error("engine unavailable: {0}")]
    Unavailable(String),
    /// The engine ran but could not process the page.
    #[error("{0}")]
    Failed(String),
    /// The engine did not answer in time.
    #[error("timed out after {secs}s")]
    Timeout { secs: u64 },
}

/// Converts one single-page PDF into a structured document.
pub trait ConversionEngine: Send + Sync {
    /// Convert the PDF at `artifact` using `config`.
    ///
    /// Must not delete or move `artifact`; its lifecycle belongs to the loader.
    fn convert(
        &self,
        artifact: &Path,
        config: &EngineConfig,
    ) -> impl Future<Output = Result<StructuredDocument, EngineError>> + Send;
}

/// An engine bound to its fixed configuration.
pub struct EngineAdapter<E> {
    engine: E,
    config: EngineConfig,
    gate: Mutex<()>,
}

impl<E: ConversionEngine> EngineAdapter<E> {
    pub fn new(engine: E, config: EngineConfig) -> Self {
        debug!(
            "Engine configured: ocr={} force_full_page={} backend={} acceleration={} \
             tables={} cell_matching={} formulas={} code={} batch_size={}",
            config.ocr_enabled,
            config.force_full_page_ocr,
            config.ocr_backend,
            config.use_acceleration,
            config.table_structure,
            config.cell_matching,
            config.formula_enrichment,
            config.code_enrichment,
            config.batch_size,
        );
        Self {
            engine,
            config,
            gate: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Convert one page artifact.
    ///
    /// Engine failures become [`LoaderError::Conversion`] carrying the page
    /// number. The artifact is left in place.
    pub async fn convert(&self, artifact: &PageArtifact) -> Result<StructuredDocument, LoaderError> {
        let page = artifact.page_number();
        let _turn = self.gate.lock().await;
        debug!("Page {}: converting {}", page, artifact.path().display());

        self.engine
            .convert(artifact.path(), &self.config)
            .await
            .map_err(|e| LoaderError::Conversion {
                page,
                detail: e.to_string(),
            })
    }
}

impl EngineAdapter<VisionEngine> {
    /// Build the built-in vision engine and bind it to `config`.
    pub fn vision(config: EngineConfig, options: VisionOptions) -> Result<Self, LoaderError> {
        let engine = VisionEngine::new(&config, options)?;
        Ok(Self::new(engine, config))
    }
}
