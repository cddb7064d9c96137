//! Walking the catalog's listing pages.
//!
//! Both walkers are strictly bounded: they stop on the first page that adds
//! nothing new, or once the optional page ceiling is reached, whichever
//! comes first.

use std::collections::HashSet;

use log::info;

use crate::{
    card::SourceRecord,
    identity::{IdentityKey, key_for},
    page_parser::{ListingPage, PageParser},
};

/// Which listing page to ask for next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageCursor {
    /// 1-indexed page number.
    Index(u32),
    /// Absolute URL taken from a "next" anchor.
    Link(String),
}

/// Anything that can hand over catalog markup.
#[allow(async_fn_in_trait)]
pub trait PageSource {
    async fn listing_page(&self, cursor: &PageCursor) -> anyhow::Result<String>;
    async fn detail_page(&self, url: &str) -> anyhow::Result<String>;
}

/// Shared pagination bookkeeping for both walkers.
struct Pager {
    next: Option<PageCursor>,
    visited: u32,
    max_pages: Option<u32>,
}

impl Pager {
    fn new(max_pages: Option<u32>) -> Self {
        Self {
            next: Some(PageCursor::Index(1)),
            visited: 0,
            max_pages,
        }
    }

    /// The page to fetch, or `None` once the walk is over.
    fn take(&mut self) -> Option<PageCursor> {
        if self.max_pages.is_some_and(|max| self.visited >= max) {
            self.next = None;
        }
        let cursor = self.next.take()?;
        self.visited += 1;
        Some(cursor)
    }

    /// Queue the page after `current`, unless this page added nothing.
    fn advance(&mut self, current: &PageCursor, page: &ListingPage, added: usize, anchored: bool) {
        if added == 0 {
            return;
        }
        self.next = if anchored {
            page.next_link.clone().map(PageCursor::Link)
        } else {
            match current {
                PageCursor::Index(n) => Some(PageCursor::Index(n + 1)),
                PageCursor::Link(_) => None,
            }
        };
    }
}

async fn fetch_listing<S: PageSource>(
    source: &S,
    parser: &PageParser,
    cursor: &PageCursor,
) -> anyhow::Result<ListingPage> {
    let markup = source.listing_page(cursor).await?;
    Ok(parser.parse_listing(&markup))
}

/// Listing-only discovery: yields the tiles of each page whose identity key
/// hasn't been seen yet.
pub struct TileWalker<'a, S> {
    source: &'a S,
    parser: &'a PageParser,
    pager: Pager,
    seen: HashSet<IdentityKey>,
}

impl<'a, S: PageSource> TileWalker<'a, S> {
    pub fn new(source: &'a S, parser: &'a PageParser, max_pages: Option<u32>) -> Self {
        Self {
            source,
            parser,
            pager: Pager::new(max_pages),
            seen: HashSet::new(),
        }
    }

    pub fn pages_visited(&self) -> u32 {
        self.pager.visited
    }

    /// New tiles of the next page, or `None` when the walk is over.
    pub async fn next_page(&mut self) -> anyhow::Result<Option<Vec<SourceRecord>>> {
        let Some(cursor) = self.pager.take() else {
            return Ok(None);
        };
        let page = fetch_listing(self.source, self.parser, &cursor).await?;
        let fresh: Vec<SourceRecord> = page
            .tiles
            .iter()
            .filter(|tile| self.seen.insert(key_for(&tile.name, tile.number.as_deref())))
            .cloned()
            .collect();

        let anchored = self.parser.site().pagination.next_selector.is_some();
        self.pager.advance(&cursor, &page, fresh.len(), anchored);
        if fresh.is_empty() {
            info!("listing page {:?} has no new tiles, stopping", cursor);
            return Ok(None);
        }
        Ok(Some(fresh))
    }
}

/// Listing-plus-detail discovery: yields the detail URLs each page adds.
pub struct UrlWalker<'a, S> {
    source: &'a S,
    parser: &'a PageParser,
    pager: Pager,
    seen: HashSet<String>,
}

impl<'a, S: PageSource> UrlWalker<'a, S> {
    pub fn new(source: &'a S, parser: &'a PageParser, max_pages: Option<u32>) -> Self {
        Self {
            source,
            parser,
            pager: Pager::new(max_pages),
            seen: HashSet::new(),
        }
    }

    pub fn pages_visited(&self) -> u32 {
        self.pager.visited
    }

    pub async fn next_batch(&mut self) -> anyhow::Result<Option<Vec<String>>> {
        let Some(cursor) = self.pager.take() else {
            return Ok(None);
        };
        let page = fetch_listing(self.source, self.parser, &cursor).await?;
        let fresh: Vec<String> = page
            .detail_urls
            .iter()
            .filter(|url| self.seen.insert((*url).clone()))
            .cloned()
            .collect();

        let anchored = self.parser.site().pagination.next_selector.is_some();
        self.pager.advance(&cursor, &page, fresh.len(), anchored);
        if fresh.is_empty() {
            info!("listing page {:?} has no new cards, stopping", cursor);
            return Ok(None);
        }
        Ok(Some(fresh))
    }

    /// Drain the whole walk into one ordered list of unique URLs.
    pub async fn collect_all(mut self) -> anyhow::Result<Vec<String>> {
        let mut urls = Vec::new();
        while let Some(batch) = self.next_batch().await? {
            urls.extend(batch);
        }
        Ok(urls)
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use std::cell::RefCell;

    use anyhow::anyhow;

    use super::*;

    /// In-memory catalog. Listing pages past the end come back empty.
    #[derive(Default)]
    pub struct FakeSite {
        pub pages: Vec<String>,
        pub details: Vec<(String, String)>,
        pub listing_requests: RefCell<Vec<PageCursor>>,
        pub detail_requests: RefCell<Vec<String>>,
    }

    impl PageSource for FakeSite {
        async fn listing_page(&self, cursor: &PageCursor) -> anyhow::Result<String> {
            self.listing_requests.borrow_mut().push(cursor.clone());
            match cursor {
                PageCursor::Index(n) => Ok(self
                    .pages
                    .get(*n as usize - 1)
                    .cloned()
                    .unwrap_or_else(|| "<html><body></body></html>".to_string())),
                PageCursor::Link(url) => Err(anyhow!("unexpected link {}", url)),
            }
        }

        async fn detail_page(&self, url: &str) -> anyhow::Result<String> {
            self.detail_requests.borrow_mut().push(url.to_string());
            self.details
                .iter()
                .find(|(u, _)| u == url)
                .map(|(_, markup)| markup.clone())
                .ok_or_else(|| anyhow!("no detail page at {}", url))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::FakeSite;
    use super::*;
    use crate::{config::SiteConfig, page_parser::fixtures::listing_page};

    fn parser() -> PageParser {
        PageParser::new(&SiteConfig::builtin().unwrap()).unwrap()
    }

    fn three_pages() -> FakeSite {
        FakeSite {
            pages: vec![
                listing_page(&[("A", "1", "S", "s", 1), ("B", "2", "S", "s", 2)]),
                listing_page(&[("C", "3", "S", "s", 3)]),
                listing_page(&[("D", "4", "S", "s", 4), ("B", "2", "S", "s", 2)]),
            ],
            ..FakeSite::default()
        }
    }

    #[tokio::test]
    async fn tiles_walk_stops_after_first_empty_page() {
        let site = three_pages();
        let parser = parser();
        let mut walker = TileWalker::new(&site, &parser, None);
        let mut names = Vec::new();
        while let Some(tiles) = walker.next_page().await.unwrap() {
            names.extend(tiles.into_iter().map(|t| t.name));
        }
        assert_eq!(names, vec!["A", "B", "C", "D"]);
        assert_eq!(walker.pages_visited(), 4);
        assert_eq!(
            *site.listing_requests.borrow(),
            (1..=4).map(PageCursor::Index).collect::<Vec<_>>()
        );
        // Finished walks stay finished.
        assert!(walker.next_page().await.unwrap().is_none());
        assert_eq!(site.listing_requests.borrow().len(), 4);
    }

    #[tokio::test]
    async fn url_walk_visits_n_plus_one_pages_without_duplicates() {
        let site = three_pages();
        let parser = parser();
        let urls = UrlWalker::new(&site, &parser, None).collect_all().await.unwrap();
        let expected: Vec<String> = [1, 2, 3, 4]
            .iter()
            .map(|id| format!("https://www.uvsultra.online/card.php?id={id}"))
            .collect();
        assert_eq!(urls, expected);
        assert_eq!(site.listing_requests.borrow().len(), 4);
    }

    #[tokio::test]
    async fn repeated_page_counts_as_empty() {
        let page = listing_page(&[("A", "1", "S", "s", 1)]);
        let site = FakeSite {
            pages: vec![page.clone(), page.clone(), page],
            ..FakeSite::default()
        };
        let parser = parser();
        let urls = UrlWalker::new(&site, &parser, None).collect_all().await.unwrap();
        assert_eq!(urls.len(), 1);
        assert_eq!(site.listing_requests.borrow().len(), 2);
    }

    #[tokio::test]
    async fn discovery_is_repeatable() {
        let site = three_pages();
        let parser = parser();
        let first = UrlWalker::new(&site, &parser, None).collect_all().await.unwrap();
        let second = UrlWalker::new(&site, &parser, None).collect_all().await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn page_ceiling_bounds_the_walk() {
        let site = three_pages();
        let parser = parser();
        let mut walker = TileWalker::new(&site, &parser, Some(2));
        let mut pages = 0;
        while walker.next_page().await.unwrap().is_some() {
            pages += 1;
        }
        assert_eq!(pages, 2);
        assert_eq!(site.listing_requests.borrow().len(), 2);
    }

    #[tokio::test]
    async fn empty_catalog_visits_one_page() {
        let site = FakeSite::default();
        let parser = parser();
        let urls = UrlWalker::new(&site, &parser, None).collect_all().await.unwrap();
        assert!(urls.is_empty());
        assert_eq!(*site.listing_requests.borrow(), vec![PageCursor::Index(1)]);
    }

    #[test]
    fn pager_follows_next_links() {
        let mut pager = Pager::new(None);
        let first = pager.take().unwrap();
        let page = ListingPage {
            next_link: Some("https://x/list?p=2".to_string()),
            ..ListingPage::default()
        };
        pager.advance(&first, &page, 3, true);
        assert_eq!(pager.take(), Some(PageCursor::Link("https://x/list?p=2".to_string())));
        let last = ListingPage::default();
        pager.advance(&PageCursor::Link("https://x/list?p=2".to_string()), &last, 1, true);
        assert_eq!(pager.take(), None);
    }
}
