//! HTML extraction: document metadata and a normalized plain-text stream.
//!
//! Metadata comes from a selector cascade (most specific first); content
//! extraction walks the body skipping non-content elements, renders tables as
//! markdown, and pulls best-effort text out of images via the OCR
//! collaborator. Parsing is kept strictly separate from the async OCR calls
//! because the parsed DOM is not `Send`.

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use bookwise_store::BookDocument;

pub const UNKNOWN_TITLE: &str = "Unknown Title";
pub const UNKNOWN_AUTHOR: &str = "Unknown Author";

const TITLE_SELECTORS: &[&str] = &[
    "h1",
    ".title",
    ".book-title",
    ".main-title",
    "[class*=title]",
    "title",
    ".post-title",
];

const AUTHOR_SELECTORS: &[&str] = &[
    ".author",
    ".book-author",
    "[class*=author]",
    ".by-author",
    ".writer",
    "[rel=author]",
];

const OUTLINE_SELECTORS: &[&str] = &[
    ".toc",
    ".outline",
    ".table-of-contents",
    ".contents",
    "[class*=toc]",
    ".index",
];

/// Elements that never contribute body text.
const NOISE_TAGS: &[&str] = &[
    "script", "style", "nav", "header", "footer", "aside", "form", "noscript", "iframe", "svg",
    "canvas", "video", "audio", "button", "input",
];

static AUTHOR_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(By|Author|Writer):\s*").unwrap());
static WHITESPACE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Image-text extraction collaborator. Best effort: failures surface as an
/// empty string and never abort extraction.
#[async_trait]
pub trait ImageTextExtractor: Send + Sync {
    async fn extract_text(&self, image_url: &str) -> String;
}

/// OCR stand-in that reads nothing. Used when no vision backend is
/// configured.
pub struct NoopImageTextExtractor;

#[async_trait]
impl ImageTextExtractor for NoopImageTextExtractor {
    async fn extract_text(&self, _image_url: &str) -> String {
        String::new()
    }
}

/// Intermediate parse output, fully owned so the DOM can be dropped before
/// any await point.
pub struct ExtractedContent {
    pub body_text: String,
    pub table_markdown: String,
    pub image_urls: Vec<String>,
}

/// Converts raw HTML into a single normalized plain-text stream.
pub struct HtmlExtractor {
    ocr: Arc<dyn ImageTextExtractor>,
}

impl HtmlExtractor {
    pub fn new(ocr: Arc<dyn ImageTextExtractor>) -> Self {
        Self { ocr }
    }

    /// Parse title/author/outline into an unsaved document. Missing fields
    /// degrade to sentinels; malformed HTML never raises.
    pub fn parse_metadata(html: &str, source_key: &str) -> BookDocument {
        let doc = Html::parse_document(html);

        let title = select_first_text(&doc, TITLE_SELECTORS)
            .unwrap_or_else(|| UNKNOWN_TITLE.to_string());
        let author = select_first_text(&doc, AUTHOR_SELECTORS)
            .map(|a| clean_author_name(&a))
            .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());
        let outline = select_first_text(&doc, OUTLINE_SELECTORS).unwrap_or_default();

        BookDocument::new(source_key, title, author, outline, html)
    }

    /// Extract body + table + image text, whitespace-collapsed.
    pub async fn extract_clean_text(&self, html: &str) -> String {
        let content = parse_content(html);

        let mut image_texts = String::new();
        for url in &content.image_urls {
            let text = self.ocr.extract_text(url).await;
            if text.is_empty() {
                debug!("No image text for {}", url);
                continue;
            }
            image_texts.push_str(&format!("[Image: {}]\n{}\n", url, text));
        }

        let mut combined = content.body_text;
        if !content.table_markdown.is_empty() {
            combined.push_str("\nTable data:\n");
            combined.push_str(&content.table_markdown);
        }
        if !image_texts.is_empty() {
            combined.push_str("\nImage content:\n");
            combined.push_str(&image_texts);
        }

        normalize_ws(&combined)
    }
}

/// Parse body text, table markdown, and image URLs out of an HTML document.
pub fn parse_content(html: &str) -> ExtractedContent {
    let doc = Html::parse_document(html);

    let body = Selector::parse("body")
        .ok()
        .and_then(|sel| doc.select(&sel).next())
        .unwrap_or_else(|| doc.root_element());

    let mut body_text = String::new();
    collect_text(body, &mut body_text);

    ExtractedContent {
        body_text,
        table_markdown: tables_to_markdown(&doc),
        image_urls: collect_image_urls(&doc),
    }
}

/// Depth-first text collection skipping noise elements.
fn collect_text(element: ElementRef, out: &mut String) {
    for child in element.children() {
        if let Some(child_el) = ElementRef::wrap(child) {
            if is_noise_element(child_el) {
                continue;
            }
            collect_text(child_el, out);
            out.push(' ');
        } else if let scraper::Node::Text(text) = child.value() {
            out.push_str(&text.text);
        }
    }
}

fn is_noise_element(element: ElementRef) -> bool {
    let value = element.value();
    if NOISE_TAGS.contains(&value.name()) {
        return true;
    }
    value
        .classes()
        .any(|class| class.eq_ignore_ascii_case("navigation"))
}

/// Render every table as a markdown pipe-table. A row of `th` cells gets a
/// `---` separator after it, once per table.
fn tables_to_markdown(doc: &Html) -> String {
    let (Ok(table_sel), Ok(row_sel), Ok(cell_sel), Ok(header_sel)) = (
        Selector::parse("table"),
        Selector::parse("tr"),
        Selector::parse("th, td"),
        Selector::parse("th"),
    ) else {
        return String::new();
    };

    let mut markdown = String::new();
    for table in doc.select(&table_sel) {
        let mut header_done = false;
        for row in table.select(&row_sel) {
            let cells: Vec<String> = row
                .select(&cell_sel)
                .map(|cell| normalize_ws(&cell.text().collect::<Vec<_>>().join(" ")))
                .collect();

            markdown.push_str("| ");
            for cell in &cells {
                markdown.push_str(cell);
                markdown.push_str(" | ");
            }
            markdown.push('\n');

            if !header_done && row.select(&header_sel).next().is_some() {
                markdown.push('|');
                for _ in 0..cells.len() {
                    markdown.push_str(" --- |");
                }
                markdown.push('\n');
                header_done = true;
            }
        }
        markdown.push('\n');
    }
    markdown
}

/// Collect absolute image URLs. Relative references are skipped since there
/// is no base URL to resolve them against.
fn collect_image_urls(doc: &Html) -> Vec<String> {
    let Ok(img_sel) = Selector::parse("img") else {
        return Vec::new();
    };
    doc.select(&img_sel)
        .filter_map(|img| img.value().attr("src"))
        .filter(|src| src.starts_with("http://") || src.starts_with("https://"))
        .map(|src| src.to_string())
        .collect()
}

fn select_first_text(doc: &Html, selectors: &[&str]) -> Option<String> {
    for css in selectors {
        let Ok(sel) = Selector::parse(css) else {
            continue;
        };
        if let Some(element) = doc.select(&sel).next() {
            let text = normalize_ws(&element.text().collect::<Vec<_>>().join(" "));
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

/// Strip a leading "By:" / "Author:" / "Writer:" label.
fn clean_author_name(author: &str) -> String {
    AUTHOR_PREFIX.replace(author, "").trim().to_string()
}

fn normalize_ws(text: &str) -> String {
    WHITESPACE_RUNS.replace_all(text, " ").trim().to_string()
}
