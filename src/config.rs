//! Configuration types for per-page PDF loading.
//!
//! Three structs, one per layer:
//!
//! * [`EngineConfig`]: the conversion-engine settings (OCR, enrichment,
//!   backend). Fixed once when the [`crate::pipeline::engine::EngineAdapter`]
//!   is constructed and never mutated afterwards.
//! * [`VisionOptions`]: knobs of the built-in vision OCR engine
//!   (model, sampling, retries, timeouts).
//! * [`LoaderOptions`]: facade settings: the temporary namespace and the
//!   progress callback.
//!
//! Each has a builder so callers set only what they care about and rely on
//! documented defaults for the rest.

use crate::error::LoaderError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

// ── Engine configuration ─────────────────────────────────────────────────

/// Settings applied by the conversion engine to every page.
///
/// `EngineConfig::default()` is the pipeline's standard configuration:
/// OCR on and forced across the full page, table structure with cell
/// matching, formula and code enrichment, auto-detected OCR backend.
///
/// # Example
/// ```rust
/// use edgequake_pageloader::{EngineConfig, OcrBackend};
///
/// let config = EngineConfig::builder()
///     .ocr_backend(OcrBackend::Anthropic)
///     .code_enrichment(false)
///     .build()
///     .unwrap();
/// assert!(config.force_full_page_ocr);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Run OCR at all. When off, only the PDF text layer is used.
    pub ocr_enabled: bool,

    /// OCR the whole page even when the PDF already carries a text layer.
    ///
    /// Scanned pages and born-digital pages then go through the same
    /// recognition path, so their output is consistent.
    pub force_full_page_ocr: bool,

    /// Which OCR backend performs recognition.
    pub ocr_backend: OcrBackend,

    /// Allow hardware acceleration for engines that run inference locally.
    pub use_acceleration: bool,

    /// Recognise table structure and emit tables as tables.
    pub table_structure: bool,

    /// Align every table body row to the header's cells.
    pub cell_matching: bool,

    /// Recognise mathematical formulas and emit them as LaTeX.
    pub formula_enrichment: bool,

    /// Recognise code blocks and emit them as fenced code.
    pub code_enrichment: bool,

    /// Elements per enrichment batch, for engines that batch enrichment.
    pub batch_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ocr_enabled: true,
            force_full_page_ocr: true,
            ocr_backend: OcrBackend::default(),
            use_acceleration: true,
            table_structure: true,
            cell_matching: true,
            formula_enrichment: true,
            code_enrichment: true,
            batch_size: 3,
        }
    }
}

impl EngineConfig {
    /// Create a new builder seeded with [`EngineConfig::default()`].
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`EngineConfig`].
#[derive(Debug)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    pub fn ocr_enabled(mut self, v: bool) -> Self {
        self.config.ocr_enabled = v;
        self
    }

    pub fn force_full_page_ocr(mut self, v: bool) -> Self {
        self.config.force_full_page_ocr = v;
        self
    }

    pub fn ocr_backend(mut self, backend: OcrBackend) -> Self {
        self.config.ocr_backend = backend;
        self
    }

    pub fn use_acceleration(mut self, v: bool) -> Self {
        self.config.use_acceleration = v;
        self
    }

    pub fn table_structure(mut self, v: bool) -> Self {
        self.config.table_structure = v;
        self
    }

    pub fn cell_matching(mut self, v: bool) -> Self {
        self.config.cell_matching = v;
        self
    }

    pub fn formula_enrichment(mut self, v: bool) -> Self {
        self.config.formula_enrichment = v;
        self
    }

    pub fn code_enrichment(mut self, v: bool) -> Self {
        self.config.code_enrichment = v;
        self
    }

    pub fn batch_size(mut self, n: usize) -> Self {
        self.config.batch_size = n;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<EngineConfig, LoaderError> {
        let c = &self.config;
        if c.batch_size == 0 {
            return Err(LoaderError::InvalidConfig(
                "batch_size must be ≥ 1".into(),
            ));
        }
        if c.force_full_page_ocr && !c.ocr_enabled {
            return Err(LoaderError::InvalidConfig(
                "force_full_page_ocr requires ocr_enabled".into(),
            ));
        }
        if let OcrBackend::Custom { provider, .. } = &c.ocr_backend {
            if provider.trim().is_empty() {
                return Err(LoaderError::InvalidConfig(
                    "custom OCR backend needs a provider name".into(),
                ));
            }
        }
        Ok(self.config)
    }
}

/// The OCR backend used for recognition.
///
/// Each named backend maps to an `edgequake-llm` vision provider and carries
/// a default vision model, so `OcrBackend::Ollama` works without also naming
/// a model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OcrBackend {
    /// Detect a provider from the environment (API key variables). (default)
    #[default]
    Auto,
    OpenAi,
    Anthropic,
    Gemini,
    Mistral,
    Ollama,
    LmStudio,
    /// Any other `edgequake-llm` provider, with an explicit model.
    Custom { provider: String, model: String },
}

impl OcrBackend {
    /// Provider name understood by `edgequake_llm::ProviderFactory`.
    ///
    /// `None` for [`OcrBackend::Auto`].
    pub fn provider_name(&self) -> Option<&str> {
        match self {
            OcrBackend::Auto => None,
            OcrBackend::OpenAi => Some("openai"),
            OcrBackend::Anthropic => Some("anthropic"),
            OcrBackend::Gemini => Some("gemini"),
            OcrBackend::Mistral => Some("mistral"),
            OcrBackend::Ollama => Some("ollama"),
            OcrBackend::LmStudio => Some("lmstudio"),
            OcrBackend::Custom { provider, .. } => Some(provider),
        }
    }

    /// Vision model used when [`VisionOptions::model`] is unset.
    pub fn default_model(&self) -> &str {
        match self {
            OcrBackend::Auto | OcrBackend::OpenAi => "gpt-4.1-nano",
            OcrBackend::Anthropic => "claude-sonnet-4-20250514",
            OcrBackend::Gemini => "gemini-2.0-flash",
            OcrBackend::Mistral => "pixtral-12b-2409",
            OcrBackend::Ollama | OcrBackend::LmStudio => "llava",
            OcrBackend::Custom { model, .. } => model,
        }
    }
}

impl fmt::Display for OcrBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.provider_name().unwrap_or("auto"))
    }
}

// ── Vision engine options ────────────────────────────────────────────────

/// Options for the built-in [`crate::pipeline::vision::VisionEngine`].
#[derive(Clone)]
pub struct VisionOptions {
    /// Model identifier. If None, uses [`OcrBackend::default_model`].
    pub model: Option<String>,

    /// Pre-constructed provider. Takes precedence over the configured backend.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.1.
    ///
    /// Transcription wants the model faithful to the page, not creative.
    pub temperature: f32,

    /// Maximum tokens generated per page. Default: 4096.
    pub max_tokens: usize,

    /// Transport retries per page before the engine reports a failure. Default: 3.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled after each attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Longest edge of the rasterised page in pixels. Default: 2000.
    pub max_rendered_pixels: u32,

    /// Custom system prompt. If None, one is composed from the engine config.
    pub system_prompt: Option<String>,
}

impl Default for VisionOptions {
    fn default() -> Self {
        Self {
            model: None,
            provider: None,
            temperature: 0.1,
            max_tokens: 4096,
            max_retries: 3,
            retry_backoff_ms: 500,
            api_timeout_secs: 60,
            max_rendered_pixels: 2000,
            system_prompt: None,
        }
    }
}

impl fmt::Debug for VisionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VisionOptions")
            .field("model", &self.model)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .finish()
    }
}

impl VisionOptions {
    pub fn builder() -> VisionOptionsBuilder {
        VisionOptionsBuilder {
            options: Self::default(),
        }
    }
}

/// Builder for [`VisionOptions`].
#[derive(Debug)]
pub struct VisionOptionsBuilder {
    options: VisionOptions,
}

impl VisionOptionsBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.options.model = Some(model.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.options.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.options.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.options.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.options.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.options.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.options.api_timeout_secs = secs.max(1);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.options.max_rendered_pixels = px.max(100);
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.options.system_prompt = Some(prompt.into());
        self
    }

    pub fn build(self) -> Result<VisionOptions, LoaderError> {
        if self.options.max_tokens == 0 {
            return Err(LoaderError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        Ok(self.options)
    }
}

// ── Loader options ───────────────────────────────────────────────────────

/// Settings of the [`crate::loader::PageLoader`] facade.
#[derive(Clone, Default)]
pub struct LoaderOptions {
    /// Directory that holds page artifacts. Default: the system temp dir.
    pub temp_dir: Option<PathBuf>,

    /// User password for encrypted source PDFs.
    pub password: Option<String>,

    /// Per-page progress events. Default: none.
    pub progress_callback: Option<ProgressCallback>,
}

impl fmt::Debug for LoaderOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoaderOptions")
            .field("temp_dir", &self.temp_dir)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn LoadProgressCallback>"),
            )
            .finish()
    }
}

impl LoaderOptions {
    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.password = Some(pwd.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.progress_callback = Some(cb);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_engine_config_is_full_pipeline() {
        let c = EngineConfig::default();
        assert!(c.ocr_enabled);
        assert!(c.force_full_page_ocr);
        assert!(c.table_structure && c.cell_matching);
        assert!(c.formula_enrichment && c.code_enrichment);
        assert!(c.use_acceleration);
        assert_eq!(c.batch_size, 3);
        assert_eq!(c.ocr_backend, OcrBackend::Auto);
    }

    #[test]
    fn builder_rejects_zero_batch() {
        let err = EngineConfig::builder().batch_size(0).build().unwrap_err();
        assert!(err.to_string().contains("batch_size"));
    }

    #[test]
    fn builder_rejects_forced_ocr_without_ocr() {
        let err = EngineConfig::builder()
            .ocr_enabled(false)
            .build()
            .unwrap_err();
        assert!(matches!(err, LoaderError::InvalidConfig(_)));

        let ok = EngineConfig::builder()
            .ocr_enabled(false)
            .force_full_page_ocr(false)
            .build();
        assert!(ok.is_ok());
    }

    #[test]
    fn backend_default_models() {
        assert_eq!(OcrBackend::Auto.provider_name(), None);
        assert_eq!(OcrBackend::Mistral.default_model(), "pixtral-12b-2409");
        assert_eq!(OcrBackend::Ollama.default_model(), "llava");
        let custom = OcrBackend::Custom {
            provider: "openrouter".into(),
            model: "qwen-vl".into(),
        };
        assert_eq!(custom.provider_name(), Some("openrouter"));
        assert_eq!(custom.default_model(), "qwen-vl");
        assert_eq!(custom.to_string(), "openrouter");
    }

    #[test]
    fn engine_config_serde_round_trip() {
        let c = EngineConfig::builder()
            .ocr_backend(OcrBackend::Gemini)
            .batch_size(8)
            .build()
            .unwrap();
        let json = serde_json::to_string(&c).unwrap();
        let back: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn vision_builder_clamps() {
        let o = VisionOptions::builder()
            .temperature(5.0)
            .max_rendered_pixels(10)
            .api_timeout_secs(0)
            .build()
            .unwrap();
        assert_eq!(o.temperature, 2.0);
        assert_eq!(o.max_rendered_pixels, 100);
        assert_eq!(o.api_timeout_secs, 1);
    }

    #[test]
    fn loader_options_debug_redacts_password() {
        let o = LoaderOptions::default().password("hunter2");
        let dbg = format!("{o:?}");
        assert!(!dbg.contains("hunter2"));
    }
}
