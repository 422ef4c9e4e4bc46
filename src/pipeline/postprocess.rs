//! Sanitising raw vision-model output before it is parsed into blocks.
//!
//! Even well-prompted models add artefacts that would confuse the block
//! parser in [`crate::pipeline::document`]: an outer ` ```markdown ` fence
//! around the whole page, CRLF line endings, zero-width characters, and image
//! links to files that never existed. These passes remove them without
//! touching content.
//!
//! Layout fixes (heading spacing, table separator rows, blank-line runs) are
//! not needed here: the parser ignores them and the renderer normalises them.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply every sanitising pass to raw model output.
///
/// Passes, in order:
/// 1. Normalise line endings (CRLF / CR → LF)
/// 2. Strip an outer markdown fence wrapping the whole reply
/// 3. Trim trailing whitespace per line
/// 4. Replace hallucinated image links with their alt text
/// 5. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
pub fn sanitize(raw: &str) -> String {
    let s = normalise_line_endings(raw);
    let s = strip_outer_fence(&s);
    let s = trim_trailing_whitespace(&s);
    let s = remove_hallucinated_images(&s);
    remove_invisible_chars(&s)
}

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

/// The reply is fenced when its first non-blank line opens a `markdown`/`md`
/// (or bare) fence and its last non-blank line closes it.
fn strip_outer_fence(input: &str) -> String {
    let trimmed = input.trim();
    let Some(first_newline) = trimmed.find('\n') else {
        return input.to_string();
    };
    let opener = trimmed[..first_newline].trim();
    let is_doc_fence = matches!(opener, "```" | "```markdown" | "```md");
    if !is_doc_fence || !trimmed.ends_with("```") {
        return input.to_string();
    }
    let body = &trimmed[first_newline + 1..trimmed.len() - 3];
    body.trim_end().to_string()
}

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

static RE_IMAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"!\[([^\]]*)\]\(([^)]*)\)").unwrap());

/// A page artifact carries no image files of its own, so any link that is not
/// an absolute URL on a real host was invented by the model.
fn is_placeholder_url(url: &str) -> bool {
    let u = url.trim();
    if !u.starts_with("http://") && !u.starts_with("https://") {
        return true;
    }
    const FAKE_DOMAINS: [&str; 5] = [
        "example.com",
        "placeholder.com",
        "dummyimage.com",
        "picsum.photos",
        "placehold.it",
    ];
    FAKE_DOMAINS.iter().any(|d| u.contains(d))
}

fn remove_hallucinated_images(input: &str) -> String {
    RE_IMAGE
        .replace_all(input, |caps: &regex::Captures<'_>| {
            let alt = caps[1].trim();
            if !is_placeholder_url(&caps[2]) {
                caps[0].to_string()
            } else if alt.is_empty() {
                String::new()
            } else {
                format!("*{}*", alt)
            }
        })
        .into_owned()
}

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        ['\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}'],
        "",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_outer_markdown_fence() {
        let raw = "```markdown\n# Title\n\nBody\n```\n";
        assert_eq!(sanitize(raw), "# Title\n\nBody");
    }

    #[test]
    fn keeps_inner_code_fences() {
        let raw = "Intro\n\n```python\nprint(1)\n```";
        assert_eq!(sanitize(raw), raw);
    }

    #[test]
    fn normalises_crlf_and_trailing_spaces() {
        assert_eq!(sanitize("a  \r\nb\t\r\n"), "a\nb");
    }

    #[test]
    fn placeholder_images_become_captions() {
        let raw = "![Figure 1: growth](figure1.png) and ![](https://example.com/x.png)";
        assert_eq!(sanitize(raw), "*Figure 1: growth* and ");
    }

    #[test]
    fn real_image_links_survive() {
        let raw = "![logo](https://cdn.acme.org/logo.png)";
        assert_eq!(sanitize(raw), raw);
    }

    #[test]
    fn invisible_chars_removed() {
        assert_eq!(sanitize("a\u{200B}b\u{FEFF}c"), "abc");
    }
}
