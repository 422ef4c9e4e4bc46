//! The structured representation of one converted page.
//!
//! Engines produce a [`StructuredDocument`]: an ordered list of block-level
//! [`DocItem`]s (headings, paragraphs, lists, tables, formulas, code). The
//! assembler renders it back to Markdown with [`StructuredDocument::to_markdown`].
//!
//! Rendering is a pure function of the items, so the same page always yields
//! byte-identical Markdown.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A block-level element of a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocItem {
    /// `#`..`######` heading.
    Heading { level: u8, text: String },
    /// Running text. Internal line breaks are preserved.
    Paragraph(String),
    /// A bulleted or numbered list.
    List { ordered: bool, items: Vec<ListItem> },
    /// A table with a header row.
    Table {
        header: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    /// Display math, LaTeX source without the `$$` delimiters.
    Formula(String),
    /// A code block.
    Code {
        language: Option<String>,
        text: String,
    },
}

/// One entry of a [`DocItem::List`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListItem {
    /// Nesting depth, 0 for top level.
    pub depth: usize,
    pub text: String,
    /// Number written before an ordered entry, `None` for a bullet.
    ///
    /// Entries without a number at the list's first depth are numbered
    /// sequentially when the list is ordered. Deeper ones render as bullets.
    #[serde(default)]
    pub number: Option<u64>,
}

/// How Markdown from an engine is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Recognise `|`-delimited tables. When off, such lines stay paragraphs.
    pub tables: bool,
    /// Pad or truncate every table body row to the header's cell count.
    pub cell_matching: bool,
    /// Recognise `$$` display formulas.
    pub formulas: bool,
    /// Recognise fenced code blocks.
    pub code: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            tables: true,
            cell_matching: true,
            formulas: true,
            code: true,
        }
    }
}

/// A structured document could not be rendered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("heading level {0} is outside 1–6")]
    HeadingLevel(u8),
    #[error("table has no header cells")]
    EmptyTableHeader,
    #[error("list has no items")]
    EmptyList,
}

/// The engine's result for one page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredDocument {
    pub items: Vec<DocItem>,
}

static RE_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(#{1,6})\s+(.*?)\s*#*\s*$").unwrap());
static RE_LIST: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\s*)([-*+]|\d+[.)])\s+(.*)$").unwrap());
static RE_SEPARATOR_CELL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^:?-{1,}:?$").unwrap());

impl StructuredDocument {
    pub fn new(items: Vec<DocItem>) -> Self {
        Self { items }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Build a document from a PDF text layer.
    ///
    /// Blank lines separate paragraphs; runs of whitespace inside a line
    /// are collapsed.
    pub fn from_text_layer(text: &str) -> Self {
        let text = text.replace("\r\n", "\n").replace('\r', "\n");
        let items = text
            .split("\n\n")
            .map(|block| {
                block
                    .lines()
                    .map(|l| l.split_whitespace().collect::<Vec<_>>().join(" "))
                    .filter(|l| !l.is_empty())
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .filter(|p| !p.is_empty())
            .map(DocItem::Paragraph)
            .collect();
        Self { items }
    }

    /// Parse block-level Markdown into items.
    pub fn from_markdown(markdown: &str, options: &ParseOptions) -> Self {
        let lines: Vec<&str> = markdown.lines().collect();
        let mut items = Vec::new();
        let mut paragraph: Vec<&str> = Vec::new();
        let mut i = 0;

        while i < lines.len() {
            let line = lines[i];
            let trimmed = line.trim();

            if trimmed.is_empty() {
                flush_paragraph(&mut paragraph, &mut items);
                i += 1;
                continue;
            }

            if options.code && trimmed.starts_with("```") {
                flush_paragraph(&mut paragraph, &mut items);
                let language = Some(trimmed.trim_start_matches('`').trim())
                    .filter(|l| !l.is_empty())
                    .map(str::to_string);
                let mut body = Vec::new();
                i += 1;
                while i < lines.len() && !lines[i].trim().starts_with("```") {
                    body.push(lines[i]);
                    i += 1;
                }
                // Skip the closing fence (absent when the page was cut off).
                i += 1;
                items.push(DocItem::Code {
                    language,
                    text: body.join("\n"),
                });
                continue;
            }

            if options.formulas && trimmed.starts_with("$$") {
                flush_paragraph(&mut paragraph, &mut items);
                let inner = &trimmed[2..];
                if let Some(single) = inner.strip_suffix("$$") {
                    items.push(DocItem::Formula(single.trim().to_string()));
                    i += 1;
                    continue;
                }
                let mut body = Vec::new();
                if !inner.trim().is_empty() {
                    body.push(inner.trim());
                }
                i += 1;
                while i < lines.len() {
                    let t = lines[i].trim();
                    if let Some(last) = t.strip_suffix("$$") {
                        if !last.trim().is_empty() {
                            body.push(last.trim());
                        }
                        i += 1;
                        break;
                    }
                    body.push(t);
                    i += 1;
                }
                items.push(DocItem::Formula(body.join("\n")));
                continue;
            }

            if let Some(caps) = RE_HEADING.captures(trimmed) {
                flush_paragraph(&mut paragraph, &mut items);
                items.push(DocItem::Heading {
                    level: caps[1].len() as u8,
                    text: caps[2].to_string(),
                });
                i += 1;
                continue;
            }

            if options.tables && is_table_row(trimmed) {
                flush_paragraph(&mut paragraph, &mut items);
                let start = i;
                let mut rows: Vec<Vec<String>> = Vec::new();
                while i < lines.len() && is_table_row(lines[i].trim()) {
                    let row = lines[i].trim();
                    if !is_separator_row(row) {
                        rows.push(split_cells(row));
                    }
                    i += 1;
                }
                if rows.is_empty() {
                    // Separator rows alone have no header to render.
                    let stray: Vec<&str> = lines[start..i].iter().map(|l| l.trim()).collect();
                    items.push(DocItem::Paragraph(stray.join("\n")));
                    continue;
                }
                let mut rows = rows.into_iter();
                let header = rows.next().unwrap_or_default();
                let mut body: Vec<Vec<String>> = rows.collect();
                if options.cell_matching {
                    for row in &mut body {
                        row.resize(header.len(), String::new());
                    }
                }
                items.push(DocItem::Table { header, rows: body });
                continue;
            }

            if let Some(first) = RE_LIST.captures(line) {
                flush_paragraph(&mut paragraph, &mut items);
                let ordered = is_ordered_marker(&first[2]);
                let base = list_depth(&first[1]);
                let mut list = Vec::new();
                while i < lines.len() {
                    let Some(caps) = RE_LIST.captures(lines[i]) else {
                        break;
                    };
                    let depth = list_depth(&caps[1]);
                    let item_ordered = is_ordered_marker(&caps[2]);
                    // A marker of the other kind at the outer depth starts a new list.
                    if depth <= base && item_ordered != ordered {
                        break;
                    }
                    let number = if item_ordered {
                        caps[2].trim_end_matches(['.', ')']).parse().ok()
                    } else {
                        None
                    };
                    list.push(ListItem {
                        depth,
                        text: caps[3].trim().to_string(),
                        number,
                    });
                    i += 1;
                }
                items.push(DocItem::List {
                    ordered,
                    items: list,
                });
                continue;
            }

            paragraph.push(trimmed);
            i += 1;
        }
        flush_paragraph(&mut paragraph, &mut items);

        Self { items }
    }

    /// Render the document as Markdown.
    ///
    /// Blocks are separated by one blank line; non-empty output ends with
    /// exactly one newline. An empty document renders as `""`.
    pub fn to_markdown(&self) -> Result<String, RenderError> {
        let blocks = self
            .items
            .iter()
            .map(render_item)
            .collect::<Result<Vec<_>, _>>()?;

        if blocks.is_empty() {
            return Ok(String::new());
        }
        let mut out = blocks.join("\n\n");
        out.push('\n');
        Ok(out)
    }
}

fn flush_paragraph(paragraph: &mut Vec<&str>, items: &mut Vec<DocItem>) {
    if !paragraph.is_empty() {
        items.push(DocItem::Paragraph(paragraph.join("\n")));
        paragraph.clear();
    }
}

fn render_item(item: &DocItem) -> Result<String, RenderError> {
    Ok(match item {
        DocItem::Heading { level, text } => {
            if !(1..=6).contains(level) {
                return Err(RenderError::HeadingLevel(*level));
            }
            format!("{} {}", "#".repeat(*level as usize), text.trim())
        }
        DocItem::Paragraph(text) => text.trim().to_string(),
        DocItem::List { ordered, items } => {
            if items.is_empty() {
                return Err(RenderError::EmptyList);
            }
            let base = items[0].depth;
            let mut next: u64 = 1;
            items
                .iter()
                .map(|item| {
                    let marker = match item.number {
                        Some(n) => format!("{}.", n),
                        None if *ordered && item.depth == base => format!("{}.", next),
                        None => "-".to_string(),
                    };
                    if item.depth == base {
                        next = item.number.unwrap_or(next).saturating_add(1);
                    }
                    format!("{}{} {}", "  ".repeat(item.depth), marker, item.text)
                })
                .collect::<Vec<_>>()
                .join("\n")
        }
        DocItem::Table { header, rows } => {
            if header.is_empty() {
                return Err(RenderError::EmptyTableHeader);
            }
            let mut lines = Vec::with_capacity(rows.len() + 2);
            lines.push(render_row(header));
            lines.push(format!("|{}", " --- |".repeat(header.len())));
            lines.extend(rows.iter().map(|r| render_row(r)));
            lines.join("\n")
        }
        DocItem::Formula(latex) => format!("$$\n{}\n$$", latex.trim()),
        DocItem::Code { language, text } => format!(
            "```{}\n{}\n```",
            language.as_deref().unwrap_or(""),
            text.trim_end_matches('\n')
        ),
    })
}

fn render_row(cells: &[String]) -> String {
    let inner = cells
        .iter()
        .map(|c| c.replace('|', "\\|"))
        .collect::<Vec<_>>()
        .join(" | ");
    format!("| {} |", inner)
}

fn is_ordered_marker(marker: &str) -> bool {
    marker.ends_with(['.', ')'])
}

fn list_depth(indent: &str) -> usize {
    indent.replace('\t', "  ").len() / 2
}

fn is_table_row(line: &str) -> bool {
    line.starts_with('|') && line.ends_with('|') && line.len() > 2
}

fn is_separator_row(line: &str) -> bool {
    split_cells(line)
        .iter()
        .all(|c| RE_SEPARATOR_CELL.is_match(c.trim()))
}

/// Split `| a | b \| c |` into `["a", "b | c"]`.
fn split_cells(row: &str) -> Vec<String> {
    let inner = row
        .strip_prefix('|')
        .and_then(|r| r.strip_suffix('|'))
        .unwrap_or(row);
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'|') => {
                current.push('|');
                chars.next();
            }
            '|' => cells.push(std::mem::take(&mut current).trim().to_string()),
            _ => current.push(c),
        }
    }
    cells.push(current.trim().to_string());
    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = concat!(
        "# Quarterly Report\n",
        "\n",
        "Revenue grew in every region.\n",
        "Costs were flat.\n",
        "\n",
        "| Region | Q1 | Q2 |\n",
        "|---|:---:|---:|\n",
        "| North | 10 | 12 |\n",
        "| South | 8 |\n",
        "\n",
        "$$\n",
        "E = mc^2\n",
        "$$\n",
        "\n",
        "```rust\n",
        "fn main() {}\n",
        "```\n",
        "\n",
        "1. First\n",
        "2. Second\n",
        "  - nested\n",
    );

    #[test]
    fn parses_every_block_kind() {
        let doc = StructuredDocument::from_markdown(PAGE, &ParseOptions::default());
        assert_eq!(
            doc.items[0],
            DocItem::Heading {
                level: 1,
                text: "Quarterly Report".into()
            }
        );
        assert_eq!(
            doc.items[1],
            DocItem::Paragraph("Revenue grew in every region.\nCosts were flat.".into())
        );
        match &doc.items[2] {
            DocItem::Table { header, rows } => {
                assert_eq!(header, &vec!["Region", "Q1", "Q2"]);
                assert_eq!(rows.len(), 2);
                // cell matching pads the short row
                assert_eq!(rows[1], vec!["South", "8", ""]);
            }
            other => panic!("expected table, got {other:?}"),
        }
        assert_eq!(doc.items[3], DocItem::Formula("E = mc^2".into()));
        assert_eq!(
            doc.items[4],
            DocItem::Code {
                language: Some("rust".into()),
                text: "fn main() {}".into()
            }
        );
        match &doc.items[5] {
            DocItem::List { ordered, items } => {
                assert!(*ordered);
                assert_eq!(items.len(), 3);
                assert_eq!(items[1].number, Some(2));
                assert_eq!(
                    items[2],
                    ListItem {
                        depth: 1,
                        text: "nested".into(),
                        number: None,
                    }
                );
            }
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn list_keeps_written_numbers() {
        let doc = StructuredDocument::from_markdown("5. Fifth\n6. Sixth\n", &ParseOptions::default());
        assert_eq!(doc.to_markdown().unwrap(), "5. Fifth\n6. Sixth\n");
    }

    #[test]
    fn nested_bullet_stays_a_bullet() {
        let md = "1. Step\n  - detail\n2. Next\n";
        let doc = StructuredDocument::from_markdown(md, &ParseOptions::default());
        assert_eq!(doc.items.len(), 1);
        assert_eq!(doc.to_markdown().unwrap(), md);
    }

    #[test]
    fn marker_change_at_same_depth_starts_new_list() {
        let doc = StructuredDocument::from_markdown("1. Step\n- note\n", &ParseOptions::default());
        assert_eq!(doc.items.len(), 2);
        assert!(matches!(doc.items[0], DocItem::List { ordered: true, .. }));
        assert!(matches!(doc.items[1], DocItem::List { ordered: false, .. }));
        assert_eq!(doc.to_markdown().unwrap(), "1. Step\n\n- note\n");
    }

    #[test]
    fn unnumbered_ordered_list_is_numbered_in_sequence() {
        let item = |text: &str| ListItem {
            depth: 0,
            text: text.into(),
            number: None,
        };
        let doc = StructuredDocument::new(vec![DocItem::List {
            ordered: true,
            items: vec![item("a"), item("b")],
        }]);
        assert_eq!(doc.to_markdown().unwrap(), "1. a\n2. b\n");
    }

    #[test]
    fn separator_only_rows_stay_text() {
        let doc = StructuredDocument::from_markdown("Text\n\n|---|---|\n", &ParseOptions::default());
        assert_eq!(
            doc.items,
            vec![
                DocItem::Paragraph("Text".into()),
                DocItem::Paragraph("|---|---|".into()),
            ]
        );
        assert_eq!(doc.to_markdown().unwrap(), "Text\n\n|---|---|\n");
    }

    #[test]
    fn cell_matching_off_keeps_ragged_rows() {
        let options = ParseOptions {
            cell_matching: false,
            ..ParseOptions::default()
        };
        let doc = StructuredDocument::from_markdown("| a | b |\n|---|---|\n| 1 |\n", &options);
        match &doc.items[0] {
            DocItem::Table { rows, .. } => assert_eq!(rows[0], vec!["1"]),
            other => panic!("expected table, got {other:?}"),
        }
    }

    #[test]
    fn tables_off_leaves_paragraph() {
        let options = ParseOptions {
            tables: false,
            ..ParseOptions::default()
        };
        let doc = StructuredDocument::from_markdown("| a | b |\n| 1 | 2 |\n", &options);
        assert!(matches!(doc.items[0], DocItem::Paragraph(_)));
    }

    #[test]
    fn single_line_formula() {
        let doc = StructuredDocument::from_markdown("$$ a^2 + b^2 = c^2 $$", &ParseOptions::default());
        assert_eq!(doc.items, vec![DocItem::Formula("a^2 + b^2 = c^2".into())]);
    }

    #[test]
    fn escaped_pipe_survives_render() {
        let doc = StructuredDocument::new(vec![DocItem::Table {
            header: vec!["op".into()],
            rows: vec![vec!["a | b".into()]],
        }]);
        let md = doc.to_markdown().unwrap();
        assert!(md.contains("a \\| b"), "got: {md}");
        let back = StructuredDocument::from_markdown(&md, &ParseOptions::default());
        assert_eq!(back, doc);
    }

    #[test]
    fn rendering_is_deterministic_and_reparses() {
        let doc = StructuredDocument::from_markdown(PAGE, &ParseOptions::default());
        let first = doc.to_markdown().unwrap();
        let second = doc.to_markdown().unwrap();
        assert_eq!(first, second);
        assert!(first.ends_with('\n') && !first.ends_with("\n\n"));

        let again = StructuredDocument::from_markdown(&first, &ParseOptions::default());
        assert_eq!(again, doc);
    }

    #[test]
    fn empty_document_renders_empty() {
        assert_eq!(StructuredDocument::default().to_markdown().unwrap(), "");
    }

    #[test]
    fn invalid_items_fail_to_render() {
        let bad_heading = StructuredDocument::new(vec![DocItem::Heading {
            level: 9,
            text: "x".into(),
        }]);
        assert_eq!(bad_heading.to_markdown(), Err(RenderError::HeadingLevel(9)));

        let bad_table = StructuredDocument::new(vec![DocItem::Table {
            header: vec![],
            rows: vec![],
        }]);
        assert_eq!(bad_table.to_markdown(), Err(RenderError::EmptyTableHeader));

        let bad_list = StructuredDocument::new(vec![DocItem::List {
            ordered: false,
            items: vec![],
        }]);
        assert_eq!(bad_list.to_markdown(), Err(RenderError::EmptyList));
    }

    #[test]
    fn text_layer_splits_paragraphs() {
        let doc = StructuredDocument::from_text_layer("Title  line\r\nsecond\r\n\r\n  Body   text \r\n");
        assert_eq!(
            doc.items,
            vec![
                DocItem::Paragraph("Title line\nsecond".into()),
                DocItem::Paragraph("Body text".into()),
            ]
        );
    }
}
