use std::collections::{HashSet, VecDeque};

use scraper::{Html, Selector};
use shelfcrop_logging::{pipeline_debug, pipeline_info, pipeline_warn};
use url::Url;

use crate::decode::decode_page;
use crate::fetch::{FetchSettings, Fetcher, ReqwestFetcher};
use crate::source::UrlSource;

const IMAGE_ATTRIBUTES: &[&str] = &["src", "data-src"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSettings {
    /// Result page address with `{query}` and `{page}` placeholders.
    pub url_template: String,
    pub first_page: usize,
    pub max_pages: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            url_template: "https://www.bing.com/images/search?q={query}&first={page}".to_string(),
            first_page: 0,
            max_pages: 10,
        }
    }
}

impl SearchSettings {
    pub fn page_url(&self, query: &str, page: usize) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(query.as_bytes()).collect();
        self.url_template
            .replace("{query}", &encoded)
            .replace("{page}", &page.to_string())
    }
}

/// Image references found on successive search result pages, in document order.
///
/// Nothing is loaded up front: the first `advance` fetches the first page. References
/// already yielded in this session are not yielded again.
pub struct SearchPageSource {
    query: String,
    settings: SearchSettings,
    fetcher: ReqwestFetcher,
    next_page: usize,
    pool: VecDeque<String>,
    yielded: HashSet<String>,
    closed: bool,
}

impl SearchPageSource {
    pub fn new(query: impl Into<String>, settings: SearchSettings, fetch: FetchSettings) -> Self {
        let fetch = FetchSettings {
            allowed_content_types: vec![
                "text/html".to_string(),
                "application/xhtml+xml".to_string(),
            ],
            ..fetch
        };
        Self {
            query: query.into(),
            next_page: settings.first_page,
            settings,
            fetcher: ReqwestFetcher::new(fetch),
            pool: VecDeque::new(),
            yielded: HashSet::new(),
            closed: false,
        }
    }

    pub fn pages_loaded(&self) -> usize {
        self.next_page - self.settings.first_page
    }

    async fn load_page(&mut self, page: usize) -> usize {
        let page_url = self.settings.page_url(&self.query, page);
        let output = match self.fetcher.fetch(&page_url).await {
            Ok(output) => output,
            Err(err) => {
                pipeline_warn!("Search page {} unavailable: {}", page_url, err);
                return 0;
            }
        };
        let decoded = match decode_page(&output.bytes, output.metadata.content_type.as_deref()) {
            Ok(decoded) => decoded,
            Err(err) => {
                pipeline_warn!("Search page {} undecodable: {}", page_url, err);
                return 0;
            }
        };

        let mut added = 0;
        for reference in extract_image_refs(&decoded.html, Some(&output.metadata.final_url)) {
            if self.yielded.insert(reference.clone()) {
                self.pool.push_back(reference);
                added += 1;
            }
        }
        added
    }
}

#[async_trait::async_trait]
impl UrlSource for SearchPageSource {
    async fn next_candidate(&mut self) -> Option<String> {
        if self.closed {
            return None;
        }
        self.pool.pop_front()
    }

    async fn advance(&mut self) {
        if self.closed {
            return;
        }
        if self.pages_loaded() >= self.settings.max_pages {
            pipeline_debug!("Search page limit {} reached", self.settings.max_pages);
            return;
        }
        let page = self.next_page;
        self.next_page += 1;
        let added = self.load_page(page).await;
        pipeline_info!("Search page {} for {:?}: {} new references", page, self.query, added);
    }

    fn close(&mut self) {
        if !self.closed {
            pipeline_debug!(
                "Closing search source after {} pages",
                self.pages_loaded()
            );
        }
        self.closed = true;
        self.pool.clear();
    }
}

/// `src` / `data-src` of every `<img>`, resolved against `base_url`. Inline `data:` payloads
/// are returned as found; fragments and script links are dropped.
pub fn extract_image_refs(html: &str, base_url: Option<&str>) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("img") else {
        return Vec::new();
    };
    let base = base_url.and_then(|b| Url::parse(b).ok());

    let mut refs = Vec::new();
    for element in document.select(&selector) {
        for attr in IMAGE_ATTRIBUTES {
            if let Some(raw) = element.value().attr(attr) {
                if let Some(url) = resolve_reference(raw, base.as_ref()) {
                    let url = String::from(url);
                    if !refs.contains(&url) {
                        refs.push(url);
                    }
                }
            }
        }
    }
    refs
}

fn resolve_reference(reference: &str, base: Option<&Url>) -> Option<Url> {
    let trimmed = reference.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with('#') || lower.starts_with("javascript:") {
        return None;
    }
    if let Ok(url) = Url::parse(trimmed) {
        return Some(url);
    }
    base.and_then(|base| base.join(trimmed).ok())
}
