//! The built-in conversion engine: text layer first, vision-model OCR when
//! the page needs it.
//!
//! For each single-page artifact the engine
//! 1. reads the page's embedded text layer with pdfium,
//! 2. keeps it when OCR is disabled, or when OCR is not forced and the layer
//!    holds real text ([`crate::pipeline::render::OcrPolicy`]),
//! 3. otherwise rasterises the page and asks the configured vision model for
//!    Markdown, which is sanitised and parsed into a [`StructuredDocument`].
//!
//! ## Provider resolution
//!
//! The model provider is resolved once, at construction, from most to least
//! specific:
//!
//! 1. `VisionOptions::provider`: a caller-built provider, used as-is.
//! 2. `EngineConfig::ocr_backend`: a named backend, with
//!    `VisionOptions::model` or the backend's default vision model.
//! 3. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`, when both are set.
//! 4. `OPENAI_API_KEY`: OpenAI, so users holding several keys get a
//!    predictable default.
//! 5. `ProviderFactory::from_env()` auto-detection.
//!
//! No provider is resolved when OCR is disabled; the engine then never
//! leaves the text layer.

use crate::config::{EngineConfig, OcrBackend, VisionOptions};
use crate::error::LoaderError;
use crate::pipeline::document::{ParseOptions, StructuredDocument};
use crate::pipeline::engine::{ConversionEngine, EngineError};
use crate::pipeline::render::{self, OcrPolicy, PageScan};
use crate::pipeline::{llm, postprocess};
use crate::prompts;
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Text-layer + vision-model engine.
pub struct VisionEngine {
    provider: Option<Arc<dyn LLMProvider>>,
    options: VisionOptions,
}

impl fmt::Debug for VisionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VisionEngine")
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("options", &self.options)
            .finish()
    }
}

impl VisionEngine {
    /// Build an engine for `config`, resolving a provider if OCR is enabled.
    pub fn new(config: &EngineConfig, options: VisionOptions) -> Result<Self, LoaderError> {
        let provider = if config.ocr_enabled {
            let provider = resolve_provider(&config.ocr_backend, &options)?;
            info!(
                "Vision provider resolved (backend={}, model={})",
                config.ocr_backend,
                options
                    .model
                    .as_deref()
                    .unwrap_or_else(|| config.ocr_backend.default_model())
            );
            Some(provider)
        } else {
            debug!("OCR disabled; vision provider not resolved");
            None
        };
        Ok(Self { provider, options })
    }

    /// Build an engine around an existing provider.
    pub fn with_provider(provider: Arc<dyn LLMProvider>, options: VisionOptions) -> Self {
        Self {
            provider: Some(provider),
            options,
        }
    }

    /// Build an engine that only ever reads text layers.
    pub fn text_only(options: VisionOptions) -> Self {
        Self {
            provider: None,
            options,
        }
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    pub fn options(&self) -> &VisionOptions {
        &self.options
    }

    fn system_prompt(&self, config: &EngineConfig) -> String {
        self.options
            .system_prompt
            .clone()
            .unwrap_or_else(|| prompts::system_prompt(config))
    }
}

impl ConversionEngine for VisionEngine {
    async fn convert(
        &self,
        artifact: &Path,
        config: &EngineConfig,
    ) -> Result<StructuredDocument, EngineError> {
        let scan = render::scan_page(
            artifact,
            OcrPolicy::from(config),
            self.options.max_rendered_pixels,
        )
        .await?;

        match scan {
            PageScan::TextLayer(text) => Ok(StructuredDocument::from_text_layer(&text)),
            PageScan::Image(image) => {
                let provider = self.provider.as_ref().ok_or_else(|| {
                    EngineError::Unavailable("OCR requested but no vision provider is configured".into())
                })?;
                let raw =
                    llm::recognise_page(provider, &image, &self.system_prompt(config), &self.options)
                        .await?;
                let markdown = postprocess::sanitize(&raw);
                Ok(StructuredDocument::from_markdown(&markdown, &parse_options(config)))
            }
        }
    }
}

/// How model output is parsed under `config`.
pub fn parse_options(config: &EngineConfig) -> ParseOptions {
    ParseOptions {
        tables: config.table_structure,
        cell_matching: config.cell_matching,
        formulas: config.formula_enrichment,
        code: config.code_enrichment,
    }
}

fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, LoaderError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        LoaderError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

fn resolve_provider(
    backend: &OcrBackend,
    options: &VisionOptions,
) -> Result<Arc<dyn LLMProvider>, LoaderError> {
    if let Some(ref provider) = options.provider {
        return Ok(Arc::clone(provider));
    }

    let model = options
        .model
        .as_deref()
        .unwrap_or_else(|| backend.default_model());

    if let Some(name) = backend.provider_name() {
        return create_vision_provider(name, model);
    }

    if let (Ok(prov), Ok(env_model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !env_model.is_empty() {
            return create_vision_provider(&prov, &env_model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            return create_vision_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| LoaderError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No vision provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or pick a backend explicitly.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}
