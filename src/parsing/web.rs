//! Web parser: fetches a URL and extracts readable text via a first-success
//! chain of extraction strategies. Neither a headless browser nor a
//! readability engine is part of this crate's dependency stack, so the
//! chain is grounded on what it does carry: an HTTP GET plus `scraper`-based
//! DOM extraction, falling back to the raw response body when the page
//! can't be parsed as HTML at all.

use std::time::Duration;

use crate::document::Document;
use crate::error::{Error, Result};

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

pub async fn fetch(url: &str, title: &str) -> Result<Document> {
    let client = reqwest::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .user_agent("docreader/1.0")
        .build()
        .map_err(|e| Error::external_call(e.to_string()))?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| Error::external_call(format!("fetch {url} failed: {e}")))?;

    if !response.status().is_success() {
        return Err(Error::external_call(format!(
            "fetch {url} returned {}",
            response.status()
        )));
    }

    let body = response
        .text()
        .await
        .map_err(|e| Error::external_call(e.to_string()))?;

    let extracted = extract_readable_text(&body).unwrap_or(body);
    let heading = if title.is_empty() {
        String::new()
    } else {
        format!("# {title}\n\n")
    };

    Ok(Document::new(format!("{heading}{extracted}")))
}

/// Pulls block-level text out of `<body>`, joining elements with blank
/// lines so paragraph structure survives into the chunking engine's
/// separator cascade. Returns `None` if the document has no body (e.g. the
/// "page" isn't HTML), letting the caller fall back to the raw text.
fn extract_readable_text(html: &str) -> Option<String> {
    use scraper::{Html, Selector};

    let document = Html::parse_document(html);
    let body_selector = Selector::parse("body").ok()?;
    let body = document.select(&body_selector).next()?;

    let skip_selector = Selector::parse("script, style, nav, footer, header").ok()?;
    let skip: std::collections::HashSet<_> = document
        .select(&skip_selector)
        .flat_map(|el| el.descendants().map(|n| n.id()))
        .collect();

    let block_selector = Selector::parse("p, h1, h2, h3, h4, h5, h6, li, td, th").ok()?;
    let mut paragraphs = Vec::new();
    for el in body.select(&block_selector) {
        if skip.contains(&el.id()) {
            continue;
        }
        let text: String = el.text().collect::<Vec<_>>().join(" ");
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            paragraphs.push(trimmed.to_string());
        }
    }

    if paragraphs.is_empty() {
        None
    } else {
        Some(paragraphs.join("\n\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_paragraphs_and_skips_scripts() {
        let html = r#"
            <html><body>
                <script>var x = 1;</script>
                <h1>Title</h1>
                <p>First paragraph.</p>
                <p>Second paragraph.</p>
            </body></html>
        "#;
        let text = extract_readable_text(html).unwrap();
        assert!(text.contains("Title"));
        assert!(text.contains("First paragraph."));
        assert!(!text.contains("var x"));
    }

    #[test]
    fn returns_none_for_non_html_body() {
        assert!(extract_readable_text("not html at all").is_none());
    }
}
