//! Web page loading: fetch a URL and turn its HTML into [`Document`]s.

use crate::error::Result;
use crate::http::HttpClient;
use scraper::{ElementRef, Html, Node, Selector};
use serde::Serialize;
use tracing::info;

/// A unit of extracted page text passed to the summarizer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub page_content: String,
    pub metadata: DocumentMetadata,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DocumentMetadata {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// Elements whose text never reaches the reader.
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

pub struct WebLoader {
    http: HttpClient,
}

impl WebLoader {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    pub async fn load(&self, url: &str) -> Result<Vec<Document>> {
        let html = self.http.get_text(url).await?;
        let doc = parse_document(url, &html);
        info!(
            url,
            chars = doc.page_content.len(),
            title = doc.metadata.title.as_deref().unwrap_or(""),
            "loaded page"
        );
        Ok(vec![doc])
    }
}

/// Build a [`Document`] from raw HTML fetched from `source`.
pub fn parse_document(source: &str, html: &str) -> Document {
    let page = Html::parse_document(html);

    let mut raw = String::new();
    collect_text(page.root_element(), &mut raw);

    Document {
        page_content: collapse_blank_lines(&raw),
        metadata: DocumentMetadata {
            source: source.to_string(),
            title: select_text(&page, "title"),
            description: select_attr(&page, "meta[name='description']", "content"),
            language: select_attr(&page, "html", "lang"),
        },
    }
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                if SKIPPED_ELEMENTS.contains(&el.name()) {
                    continue;
                }
                if let Some(child_el) = ElementRef::wrap(child) {
                    collect_text(child_el, out);
                }
            }
            _ => {}
        }
    }
}

/// Trim every line and keep at most one blank line between paragraphs.
fn collapse_blank_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_blank = false;
    for line in text.lines().map(str::trim) {
        if line.is_empty() {
            pending_blank = !out.is_empty();
            continue;
        }
        if pending_blank {
            out.push_str("\n\n");
            pending_blank = false;
        } else if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(line);
    }
    out
}

fn select_text(page: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    page.select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn select_attr(page: &Html, selector: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    page.select(&selector)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(|v| v.trim().to_string())
        .filter(|s| !s.is_empty())
}
