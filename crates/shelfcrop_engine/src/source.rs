use std::collections::VecDeque;

use shelfcrop_logging::pipeline_debug;

/// A live, growing pool of candidate URLs (a rendered result page, a scrolling feed...).
#[async_trait::async_trait]
pub trait UrlSource: Send {
    /// Next candidate from what is already loaded; `None` when the loaded pool is drained.
    async fn next_candidate(&mut self) -> Option<String>;

    /// Ask the source to load further candidates. May load nothing.
    async fn advance(&mut self);

    /// Release whatever session backs the source. Called once per harvest.
    fn close(&mut self);
}

/// In-memory source whose candidates arrive page by page on each `advance`.
#[derive(Debug, Default)]
pub struct ListUrlSource {
    pool: VecDeque<String>,
    pages: VecDeque<Vec<String>>,
    closed: bool,
}

impl ListUrlSource {
    /// The first page is loaded immediately; the rest wait for `advance`.
    pub fn new(pages: Vec<Vec<String>>) -> Self {
        let mut pages: VecDeque<Vec<String>> = pages.into();
        let pool = pages.pop_front().map(VecDeque::from).unwrap_or_default();
        Self {
            pool,
            pages,
            closed: false,
        }
    }

    /// Newline separated URLs (blank lines and `#` comments ignored), split into pages.
    pub fn from_lines(text: &str, page_size: usize) -> Self {
        let urls: Vec<String> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(ToOwned::to_owned)
            .collect();
        let pages = urls
            .chunks(page_size.max(1))
            .map(<[String]>::to_vec)
            .collect();
        Self::new(pages)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

#[async_trait::async_trait]
impl UrlSource for ListUrlSource {
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
        if let Some(page) = self.pages.pop_front() {
            pipeline_debug!("List source loaded page of {} candidates", page.len());
            self.pool.extend(page);
        }
    }

    fn close(&mut self) {
        self.closed = true;
        self.pool.clear();
        self.pages.clear();
    }
}
