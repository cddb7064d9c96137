use std::collections::HashMap;

use log::{debug, info, warn};

use crate::{
    card::{SourceRecord, StoredRecord},
    discovery::{PageSource, TileWalker, UrlWalker},
    identity::IdentityIndex,
    merge::{fill_set_name, merge, usable},
    page_parser::PageParser,
    run_state::RunState,
    store::Dataset,
};

pub const DEFAULT_SAVE_INTERVAL: usize = 200;

#[derive(Debug, Clone)]
pub struct JobOptions {
    pub max_pages: Option<u32>,
    pub save_interval: usize,
    /// Run everything but never touch the dataset files.
    pub dry_run: bool,
    /// Log and skip detail pages whose fetch fails instead of aborting.
    pub skip_failed_details: bool,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            max_pages: None,
            save_interval: DEFAULT_SAVE_INTERVAL,
            dry_run: false,
            skip_failed_details: false,
        }
    }
}

/// Applies scraped records to the dataset and checkpoints as it goes.
struct Enricher<'a> {
    dataset: &'a mut Dataset,
    index: IdentityIndex,
    state: RunState,
    options: &'a JobOptions,
}

impl<'a> Enricher<'a> {
    fn new(dataset: &'a mut Dataset, options: &'a JobOptions) -> Self {
        let index = IdentityIndex::build(&dataset.records);
        if index.collisions() > 0 {
            warn!(
                "{} cards share a name and number with an earlier card and won't be enriched",
                index.collisions()
            );
        }
        Self {
            dataset,
            index,
            state: RunState::new(options.save_interval),
            options,
        }
    }

    fn apply(&mut self, source: &SourceRecord) -> anyhow::Result<()> {
        self.state.seen += 1;
        let Some(position) = self.index.resolve(source) else {
            debug!("no stored card for {:?} #{:?}", source.name, source.number);
            return Ok(());
        };
        self.state.matched += 1;
        if merge(&mut self.dataset.records[position], source) {
            self.updated(position)?;
        }
        Ok(())
    }

    fn updated(&mut self, position: usize) -> anyhow::Result<()> {
        if self.state.record_update(position) {
            self.checkpoint()?;
        }
        Ok(())
    }

    fn checkpoint(&mut self) -> anyhow::Result<()> {
        if self.options.dry_run {
            return Ok(());
        }
        self.dataset.save()?;
        self.state.mark_saved();
        info!(
            "incremental_save updated={} seen={} page={}",
            self.state.updated, self.state.seen, self.state.pages_scanned
        );
        Ok(())
    }

    fn finish(mut self) -> anyhow::Result<RunState> {
        if !self.options.dry_run {
            self.dataset.save()?;
            self.state.mark_saved();
        }
        info!("done {}", self.state.summary());
        Ok(self.state)
    }
}

/// Listing-only enrichment: set names and codes straight from the tiles.
pub async fn run_listing_job<S: PageSource>(
    source: &S,
    parser: &PageParser,
    dataset: &mut Dataset,
    options: &JobOptions,
) -> anyhow::Result<RunState> {
    let mut enricher = Enricher::new(dataset, options);
    let mut walker = TileWalker::new(source, parser, options.max_pages);

    while let Some(tiles) = walker.next_page().await? {
        enricher.state.pages_scanned = walker.pages_visited();
        for tile in &tiles {
            enricher.apply(tile)?;
        }
        info!(
            "page_done page={} seen_total={} updated_total={}",
            enricher.state.pages_scanned, enricher.state.seen, enricher.state.updated
        );
    }
    enricher.state.pages_scanned = walker.pages_visited();
    enricher.finish()
}

/// Listing-plus-detail enrichment: every card's own page is fetched.
pub async fn run_detail_job<S: PageSource>(
    source: &S,
    parser: &PageParser,
    dataset: &mut Dataset,
    options: &JobOptions,
) -> anyhow::Result<RunState> {
    let mut enricher = Enricher::new(dataset, options);
    let mut walker = UrlWalker::new(source, parser, options.max_pages);

    while let Some(urls) = walker.next_batch().await? {
        enricher.state.pages_scanned = walker.pages_visited();
        for url in &urls {
            let markup = match source.detail_page(url).await {
                Ok(markup) => markup,
                Err(e) if options.skip_failed_details => {
                    warn!("skipping {}: {:#}", url, e);
                    continue;
                }
                Err(e) => return Err(e),
            };
            let Some(record) = parser.parse_detail(&markup) else {
                debug!("{} is not a card page", url);
                continue;
            };
            enricher.apply(&record)?;
        }
        info!(
            "page_done page={} seen_total={} updated_total={}",
            enricher.state.pages_scanned, enricher.state.seen, enricher.state.updated
        );
    }
    enricher.state.pages_scanned = walker.pages_visited();
    enricher.finish()
}

/// Learn set code -> set name from the listing, then name every stored card
/// whose set name is missing but whose code is known.
pub async fn run_fix_sets_job<S: PageSource>(
    source: &S,
    parser: &PageParser,
    dataset: &mut Dataset,
    options: &JobOptions,
) -> anyhow::Result<RunState> {
    let (set_names, pages) = discover_set_names(source, parser, options.max_pages).await?;
    info!("found {} sets over {} listing pages", set_names.len(), pages);

    let mut enricher = Enricher::new(dataset, options);
    enricher.state.pages_scanned = pages;
    for position in 0..enricher.dataset.records.len() {
        let record = &enricher.dataset.records[position];
        let Some(name) = set_code(record).and_then(|code| set_names.get(code)) else {
            continue;
        };
        enricher.state.seen += 1;
        enricher.state.matched += 1;
        if fill_set_name(&mut enricher.dataset.records[position], name) {
            enricher.updated(position)?;
        }
    }
    enricher.finish()
}

fn set_code(record: &StoredRecord) -> Option<&str> {
    record
        .set_field("code")
        .and_then(|v| v.as_str())
        .filter(|code| !code.is_empty())
}

/// First usable name seen for each set code wins. Also returns how many
/// listing pages were fetched.
pub async fn discover_set_names<S: PageSource>(
    source: &S,
    parser: &PageParser,
    max_pages: Option<u32>,
) -> anyhow::Result<(HashMap<String, String>, u32)> {
    let mut names = HashMap::new();
    let mut walker = TileWalker::new(source, parser, max_pages);
    while let Some(tiles) = walker.next_page().await? {
        for tile in tiles {
            let (Some(code), Some(name)) = (tile.set_code, usable(tile.set_name.as_deref())) else {
                continue;
            };
            names.entry(code).or_insert_with(|| name.to_string());
        }
    }
    Ok((names, walker.pages_visited()))
}

/// The first `limit` records this run changed, for dry-run output.
pub fn updated_sample<'d>(dataset: &'d Dataset, state: &RunState, limit: usize) -> Vec<&'d StoredRecord> {
    state
        .updated_positions
        .iter()
        .take(limit)
        .filter_map(|&i| dataset.records.get(i))
        .collect()
}
