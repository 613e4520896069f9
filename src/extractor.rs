use crate::{PreviewError, RawMetadata};
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

const IMAGE_META: &str = "meta[property='og:image'], meta[property='og:image:url'], \
     meta[name='twitter:image'], meta[itemprop='image']";
// `rel` is a case-insensitive token list; "shortcut icon" matches through its "icon" token.
const ICON_LINKS: &str = "link[rel~='icon' i], link[rel~='apple-touch-icon' i], \
     link[rel~='apple-touch-icon-precomposed' i]";

/// Metadata extractor, responsible for turning an HTML page into [`RawMetadata`]
#[derive(Debug, Clone, Default)]
pub struct MetadataExtractor;

impl MetadataExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, html: &str, page_url: &str) -> Result<RawMetadata, PreviewError> {
        let base = Url::parse(page_url)?;
        let document = Html::parse_document(html);

        let title = self.extract_title(&document);
        let description = self.extract_description(&document);
        let site_name = meta_content(&document, "meta[property='og:site_name']");
        let media_type = meta_content(&document, "meta[property='og:type']")
            .or_else(|| Some("website".to_string()));
        let images = self.extract_images(&document, &base);
        let favicons = self.extract_favicons(&document, &base);

        debug!(
            url = %page_url,
            images = images.len(),
            favicons = favicons.len(),
            "Extracted page metadata"
        );

        Ok(RawMetadata {
            url: Some(page_url.to_string()),
            title,
            description,
            site_name,
            media_type,
            images,
            favicons,
        })
    }

    fn extract_title(&self, document: &Html) -> Option<String> {
        meta_content(document, "meta[property='og:title']").or_else(|| {
            let selector = Selector::parse("title").ok()?;
            document
                .select(&selector)
                .next()
                .map(|el| el.text().collect::<String>().trim().to_string())
                .filter(|s| !s.is_empty())
        })
    }

    fn extract_description(&self, document: &Html) -> Option<String> {
        meta_content(document, "meta[property='og:description']")
            .or_else(|| meta_content(document, "meta[name='description']"))
    }

    // Declared preview images first; plain <img> tags only when there are none.
    fn extract_images(&self, document: &Html, base: &Url) -> Vec<String> {
        let declared = all_attrs(document, IMAGE_META, "content", base);
        if !declared.is_empty() {
            return declared;
        }
        all_attrs(document, "img", "src", base)
    }

    fn extract_favicons(&self, document: &Html, base: &Url) -> Vec<String> {
        let mut icons = all_attrs(document, ICON_LINKS, "href", base);
        if icons.is_empty() {
            if let Ok(default_icon) = base.join("/favicon.ico") {
                icons.push(default_icon.to_string());
            }
        }
        icons
    }
}

fn meta_content(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Every `attr` value matched by `selector`, resolved against `base`, deduplicated
/// in document order.
fn all_attrs(document: &Html, selector: &str, attr: &str, base: &Url) -> Vec<String> {
    let Ok(selector) = Selector::parse(selector) else {
        return Vec::new();
    };

    let mut found: Vec<String> = Vec::new();
    for value in document
        .select(&selector)
        .filter_map(|el| el.value().attr(attr))
        .map(str::trim)
        .filter(|s| !s.is_empty() && !s.starts_with("data:"))
    {
        match base.join(value) {
            Ok(resolved) => {
                let resolved = resolved.to_string();
                if !found.contains(&resolved) {
                    found.push(resolved);
                }
            }
            Err(e) => debug!(value = %value, error = %e, "Skipping unresolvable link"),
        }
    }
    found
}
