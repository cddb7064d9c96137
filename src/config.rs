use std::{collections::BTreeMap, path::Path, time::Duration};

use anyhow::Context;
use serde::{Deserialize, de::DeserializeOwned};

const BUILTIN_SITE: &str = include_str!("../sites/uvsultra.yaml");

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (card-enricher)";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// The env vars needed for fetching, all prefixed with `CARD_ENRICH_`.
#[derive(Debug, Default, Deserialize)]
pub struct FetchEnv {
    user_agent: Option<String>,
    timeout_secs: Option<u64>,
}

impl FetchEnv {
    pub fn user_agent(&self) -> &str {
        self.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }
}

// Extension trait.
pub trait LoadFromEnv: DeserializeOwned {
    const PREFIX: &'static str = "CARD_ENRICH_";

    fn load_from_env() -> anyhow::Result<Self> {
        // Don't throw an error if .env file doesn't exist.
        let _ = dotenv::dotenv();
        let config = envy::prefixed(Self::PREFIX)
            .from_env::<Self>()
            .context("failed to load env variables into config struct")?;
        Ok(config)
    }
}

impl<T: DeserializeOwned> LoadFromEnv for T {}

/// Where to find things on the catalog site.
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    pub base_url: String,
    pub listing_path: String,
    #[serde(default)]
    pub pagination: PaginationConfig,
    pub listing: ListingConfig,
    pub detail: DetailConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaginationConfig {
    #[serde(default = "default_page_param")]
    pub page_param: String,
    /// Sent alongside the page index on every POST.
    #[serde(default)]
    pub extra_form: BTreeMap<String, String>,
    /// Follow this anchor instead of probing page indices.
    #[serde(default)]
    pub next_selector: Option<String>,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_param: default_page_param(),
            extra_form: BTreeMap::new(),
            next_selector: None,
        }
    }
}

fn default_page_param() -> String {
    "page".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListingConfig {
    pub tile: String,
    #[serde(default)]
    pub detail_link: Vec<LinkSpec>,
    pub fields: FieldSpecs,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetailConfig {
    pub fields: FieldSpecs,
}

/// Ordered fallbacks per field. An empty list means the field is never
/// extracted by this layout.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FieldSpecs {
    #[serde(default)]
    pub name: Vec<ExtractorSpec>,
    #[serde(default)]
    pub number: Vec<ExtractorSpec>,
    #[serde(default)]
    pub set_name: Vec<ExtractorSpec>,
    #[serde(default)]
    pub set_code: Vec<ExtractorSpec>,
    #[serde(default)]
    pub image_url: Vec<ExtractorSpec>,
    #[serde(default)]
    pub text: Vec<ExtractorSpec>,
    #[serde(default)]
    pub cost: Vec<ExtractorSpec>,
    #[serde(default)]
    pub attack: Vec<ExtractorSpec>,
    #[serde(default)]
    pub health: Vec<ExtractorSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractorSpec {
    pub selector: String,
    /// Read this attribute instead of the element text.
    #[serde(default)]
    pub attr: Option<String>,
    /// Regex applied to the raw value; capture group 1 is the result.
    #[serde(default)]
    pub pattern: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinkSpec {
    #[serde(flatten)]
    pub extractor: ExtractorSpec,
    /// `{1}` is replaced by the captured value, then joined onto `base_url`.
    #[serde(default)]
    pub template: Option<String>,
}

impl SiteConfig {
    pub fn builtin() -> anyhow::Result<Self> {
        Self::from_yaml(BUILTIN_SITE).context("built-in site layout is invalid")
    }

    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read site config {}", path.display()))?;
        Self::from_yaml(&yaml).with_context(|| format!("failed to parse {}", path.display()))
    }

    pub fn listing_url(&self) -> anyhow::Result<String> {
        self.resolve(&self.listing_path)
    }

    /// Resolve a possibly relative link against the site's base URL.
    pub fn resolve(&self, href: &str) -> anyhow::Result<String> {
        let base = url::Url::parse(&self.base_url)
            .with_context(|| format!("invalid base_url: {}", self.base_url))?;
        let joined = base
            .join(href.trim())
            .with_context(|| format!("couldn't resolve link: {}", href))?;
        Ok(joined.to_string())
    }
}
