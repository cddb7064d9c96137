mod card;
mod config;
mod discovery;
mod extract;
mod fetch_error;
mod identity;
mod jobs;
mod merge;
mod page_parser;
mod requests;
mod retry;
mod run_state;
mod scraping_context;
mod store;
mod text_manipulators;

pub use card::{SourceRecord, StoredRecord};
pub use config::{ExtractorSpec, FetchEnv, LoadFromEnv, SiteConfig};
pub use discovery::{PageCursor, PageSource, TileWalker, UrlWalker};
pub use extract::{Extractor, FieldRule};
pub use fetch_error::FetchError;
pub use identity::{IdentityIndex, IdentityKey};
pub use jobs::{
    DEFAULT_SAVE_INTERVAL, JobOptions, discover_set_names, run_detail_job, run_fix_sets_job,
    run_listing_job, updated_sample,
};
pub use merge::{PLACEHOLDERS, is_placeholder, merge};
pub use page_parser::{ListingPage, PageParser};
pub use requests::{FetchRequest, RequestClient};
pub use retry::{DEFAULT_MAX_ATTEMPTS, Outcome, RetryPolicy, RetryState, classify_status};
pub use run_state::RunState;
pub use scraping_context::ScrapingContext;
pub use store::Dataset;
