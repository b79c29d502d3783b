use catalog_core::{Document, Parse};
use scraper::{Html, Selector};

/// Parse capability backed by `scraper`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlParser;

pub struct ScrapedDocument(Html);

impl Parse for HtmlParser {
    type Doc = ScrapedDocument;

    fn parse(&self, markup: &str) -> ScrapedDocument {
        ScrapedDocument(Html::parse_document(markup))
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl Document for ScrapedDocument {
    fn find_text(&self, tag: &str, class: Option<&str>) -> Vec<String> {
        let Ok(sel) = Selector::parse(tag) else {
            ::tracing::debug!(tag, "unusable tag selector");
            return Vec::new();
        };
        self.0
            .select(&sel)
            .filter(|el| class.map_or(true, |c| el.value().classes().any(|have| have == c)))
            .map(|el| collapse_whitespace(&el.text().collect::<String>()))
            .collect()
    }

    fn find_attr(&self, tag: &str, attr: &str) -> Vec<String> {
        let Ok(sel) = Selector::parse(tag) else { return Vec::new() };
        self.0
            .select(&sel)
            .filter_map(|el| el.value().attr(attr))
            .map(str::to_string)
            .collect()
    }
}
