//! Vision-model interaction: encode a page image and ask the model for
//! Markdown.
//!
//! Prompt text lives in [`crate::prompts`]; this module only builds the
//! request, bounds each attempt with a timeout and retries transient
//! failures.
//!
//! ## Retry Strategy
//!
//! HTTP 429 / 503 responses are frequent under load. Exponential backoff
//! (`retry_backoff_ms * 2^(attempt-1)`) gives 500 ms → 1 s → 2 s with the
//! default options, capped at [`MAX_BACKOFF`]. A timed-out attempt counts as
//! a failed attempt.

use crate::config::VisionOptions;
use crate::pipeline::engine::EngineError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider};
use image::DynamicImage;
use std::io::Cursor;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

/// Upper bound on a single retry delay.
pub const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Encode a rasterised page as a base64 PNG.
///
/// PNG is lossless, which keeps rendered glyph edges crisp for recognition.
/// `detail: "high"` lets GPT-4-class models tile the image instead of
/// downscaling it to a single overview tile.
pub fn encode_page(img: &DynamicImage) -> Result<ImageData, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;

    let b64 = STANDARD.encode(&buf);
    debug!("Encoded image → {} bytes base64", b64.len());

    Ok(ImageData::new(b64, "image/png").with_detail("high"))
}

/// Send one page image to the model and return its raw reply.
///
/// The request is a system message carrying `system_prompt` followed by a
/// user message whose only content is the image.
pub async fn recognise_page(
    provider: &Arc<dyn LLMProvider>,
    image: &DynamicImage,
    system_prompt: &str,
    options: &VisionOptions,
) -> Result<String, EngineError> {
    let image_data = encode_page(image)
        .map_err(|e| EngineError::Failed(format!("Image encoding failed: {}", e)))?;

    let messages = vec![
        ChatMessage::system(system_prompt),
        ChatMessage::user_with_images("", vec![image_data]),
    ];
    let completion = build_options(options);
    let limit = Duration::from_secs(options.api_timeout_secs);
    let start = Instant::now();

    let mut last_err: Option<EngineError> = None;

    for attempt in 0..=options.max_retries {
        if attempt > 0 {
            let backoff = backoff_delay(options.retry_backoff_ms, attempt);
            warn!(
                "Retry {}/{} after {:?}",
                attempt, options.max_retries, backoff
            );
            sleep(backoff).await;
        }

        match timeout(limit, provider.chat(&messages, Some(&completion))).await {
            Ok(Ok(response)) => {
                debug!(
                    "{} input tokens, {} output tokens, {:?}",
                    response.prompt_tokens,
                    response.completion_tokens,
                    start.elapsed()
                );
                return Ok(response.content);
            }
            Ok(Err(e)) => {
                warn!("Attempt {} failed: {}", attempt + 1, e);
                last_err = Some(EngineError::Failed(e.to_string()));
            }
            Err(_) => {
                warn!(
                    "Attempt {} timed out after {}s",
                    attempt + 1,
                    options.api_timeout_secs
                );
                last_err = Some(EngineError::Timeout {
                    secs: options.api_timeout_secs,
                });
            }
        }
    }

    Err(last_err.unwrap_or_else(|| EngineError::Failed("no attempt made".to_string())))
}

fn backoff_delay(base_ms: u64, attempt: u32) -> Duration {
    let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
    Duration::from_millis(base_ms.saturating_mul(factor)).min(MAX_BACKOFF)
}

fn build_options(options: &VisionOptions) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(options.temperature),
        max_tokens: Some(options.max_tokens),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn build_options_defaults() {
        let opts = build_options(&VisionOptions::default());
        assert_eq!(opts.temperature, Some(0.1));
        assert_eq!(opts.max_tokens, Some(4096));
    }

    #[test]
    fn build_options_follow_builder() {
        let options = VisionOptions::builder()
            .temperature(0.0)
            .max_tokens(1024)
            .build()
            .unwrap();
        let opts = build_options(&options);
        assert_eq!(opts.temperature, Some(0.0));
        assert_eq!(opts.max_tokens, Some(1024));
    }

    #[test]
    fn backoff_doubles_then_caps() {
        assert_eq!(backoff_delay(500, 1), Duration::from_millis(500));
        assert_eq!(backoff_delay(500, 3), Duration::from_secs(2));
        assert_eq!(backoff_delay(500, 65), MAX_BACKOFF);
        assert_eq!(backoff_delay(u64::MAX, u32::MAX), MAX_BACKOFF);
    }

    #[test]
    fn encode_small_image() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([0, 0, 255, 255])));
        let data = encode_page(&img).expect("encode should succeed");
        assert_eq!(data.mime_type, "image/png");
        let decoded = STANDARD.decode(&data.data).expect("valid base64");
        assert_eq!(&decoded[1..4], b"PNG");
    }
}
