//! System prompts for vision-model OCR of a single page.
//!
//! The prompt is assembled from sections so it mirrors the engine
//! configuration: a page converted with table structure off is never asked to
//! produce pipe tables, and so on. Keeping every section here means prompt
//! changes touch one file and can be unit-tested without a model.

use crate::config::EngineConfig;

const PREAMBLE: &str = "You are an expert document converter performing OCR on a single PDF page. \
Convert the page image to clean, well-structured Markdown.\n\nFollow these rules precisely:";

const TEXT_RULES: &str = r#"TEXT PRESERVATION
   - Recognise ALL text on the page, including text inside figures and scans
   - Maintain the reading order as a human would read the page
   - Correct obvious recognition errors only if you are completely certain"#;

const STRUCTURE_RULES: &str = r#"STRUCTURE
   - Use # for the page title (at most one per page)
   - Use ## for major sections, ### for subsections, #### for minor headings
   - Use - for unordered lists and 1. 2. 3. for ordered lists
   - Preserve list nesting with two-space indentation"#;

const TABLE_RULES: &str = r#"TABLES
   - Convert tables to GFM pipe format with a header row and a --- separator row
   - Emit exactly one cell per column in every row; leave a cell empty rather than merging"#;

const TABLE_OFF_RULES: &str = r#"TABLES
   - Transcribe table contents as plain paragraphs, row by row"#;

const FORMULA_RULES: &str = r#"FORMULAS
   - Render display equations as LaTeX between $$ lines
   - Render inline math as $...$"#;

const CODE_RULES: &str = r#"CODE
   - Wrap code listings in triple backticks with a language identifier"#;

const IGNORE_RULES: &str = r#"WHAT TO IGNORE
   - Page numbers and running headers/footers
   - Decorative borders and lines that carry no content meaning"#;

const OUTPUT_RULES: &str = r#"OUTPUT FORMAT
   - Output ONLY the Markdown content
   - Do NOT wrap the output in ```markdown fences
   - Do NOT add commentary, explanations, or image links"#;

/// Compose the system prompt for `config`.
pub fn system_prompt(config: &EngineConfig) -> String {
    let mut sections = vec![TEXT_RULES, STRUCTURE_RULES];
    sections.push(if config.table_structure {
        TABLE_RULES
    } else {
        TABLE_OFF_RULES
    });
    if config.formula_enrichment {
        sections.push(FORMULA_RULES);
    }
    if config.code_enrichment {
        sections.push(CODE_RULES);
    }
    sections.push(IGNORE_RULES);
    sections.push(OUTPUT_RULES);

    let mut prompt = String::from(PREAMBLE);
    for (i, section) in sections.iter().enumerate() {
        prompt.push_str(&format!("\n\n{}. {}", i + 1, section));
    }
    prompt
}
