use log::debug;
use scraper::{ElementRef, Html, Selector};

use crate::{
    card::SourceRecord,
    config::{FieldSpecs, LinkSpec, SiteConfig},
    extract::{Extractor, FieldRule, Vocabulary, build_extractor, parse_selector},
    text_manipulators::{extract_keywords, parse_int, set_code_from_path},
};

pub const CARD_TYPES: &[&str] = &[
    "Action",
    "Asset",
    "Attack",
    "Backup",
    "Character",
    "Foundation",
];

pub const RARITIES: &[&str] = &[
    "Common",
    "Uncommon",
    "Rare",
    "Ultra Rare",
    "Secret Rare",
    "Champion Rare",
    "Starter",
    "Promo",
];

struct FieldRules {
    name: FieldRule,
    number: FieldRule,
    set_name: FieldRule,
    set_code: FieldRule,
    image_url: FieldRule,
    text: FieldRule,
    cost: FieldRule,
    attack: FieldRule,
    health: FieldRule,
}

impl FieldRules {
    fn compile(specs: &FieldSpecs) -> anyhow::Result<Self> {
        Ok(Self {
            name: FieldRule::from_specs(&specs.name)?,
            number: FieldRule::from_specs(&specs.number)?,
            set_name: FieldRule::from_specs(&specs.set_name)?,
            set_code: FieldRule::from_specs(&specs.set_code)?,
            image_url: FieldRule::from_specs(&specs.image_url)?,
            text: FieldRule::from_specs(&specs.text)?,
            cost: FieldRule::from_specs(&specs.cost)?,
            attack: FieldRule::from_specs(&specs.attack)?,
            health: FieldRule::from_specs(&specs.health)?,
        })
    }
}

struct LinkRule {
    extractor: Box<dyn Extractor>,
    template: Option<String>,
}

impl LinkRule {
    fn compile(spec: &LinkSpec) -> anyhow::Result<Self> {
        Ok(Self {
            extractor: build_extractor(&spec.extractor)?,
            template: spec.template.clone(),
        })
    }

    fn href(&self, raw: &str) -> String {
        match &self.template {
            Some(template) => template.replace("{1}", raw),
            None => raw.to_string(),
        }
    }
}

/// What one listing page holds.
#[derive(Debug, Default)]
pub struct ListingPage {
    /// Partial records, one per tile that has a name.
    pub tiles: Vec<SourceRecord>,
    /// Absolute detail URLs in page order, without repeats.
    pub detail_urls: Vec<String>,
    /// Absolute URL of the next listing page, for sites paginated by anchor.
    pub next_link: Option<String>,
}

/// Turns catalog markup into [`SourceRecord`]s for one site layout.
pub struct PageParser {
    site: SiteConfig,
    tile: Selector,
    listing: FieldRules,
    detail: FieldRules,
    links: Vec<LinkRule>,
    next_link: Option<Selector>,
    card_type: FieldRule,
    rarity: FieldRule,
}

impl PageParser {
    pub fn new(site: &SiteConfig) -> anyhow::Result<Self> {
        let links = site
            .listing
            .detail_link
            .iter()
            .map(LinkRule::compile)
            .collect::<anyhow::Result<Vec<_>>>()?;
        let next_link = site
            .pagination
            .next_selector
            .as_deref()
            .map(parse_selector)
            .transpose()?;
        Ok(Self {
            site: site.clone(),
            tile: parse_selector(&site.listing.tile)?,
            listing: FieldRules::compile(&site.listing.fields)?,
            detail: FieldRules::compile(&site.detail.fields)?,
            links,
            next_link,
            card_type: FieldRule::new(vec![Box::new(Vocabulary::new(CARD_TYPES))]),
            rarity: FieldRule::new(vec![Box::new(Vocabulary::new(RARITIES))]),
        })
    }

    pub fn site(&self) -> &SiteConfig {
        &self.site
    }

    pub fn parse_listing(&self, markup: &str) -> ListingPage {
        let document = Html::parse_document(markup);
        let root = document.root_element();

        let mut tiles = Vec::new();
        for tile in root.select(&self.tile) {
            let Some(name) = self.listing.name.extract(tile) else {
                debug!("skipping tile without a name");
                continue;
            };
            let mut record = SourceRecord::new(name);
            record.number = self.listing.number.extract(tile);
            record.set_name = self.listing.set_name.extract(tile);
            record.set_code = self.listing.set_code.extract(tile);
            record.url = self.detail_links(tile).into_iter().next();
            tiles.push(record);
        }

        let next_link = self.next_link.as_ref().and_then(|selector| {
            root.select(selector)
                .filter_map(|a| a.value().attr("href"))
                .find_map(|href| self.site.resolve(href).ok())
        });

        ListingPage {
            tiles,
            detail_urls: self.detail_links(root),
            next_link,
        }
    }

    /// `None` when the page has no card name: it isn't a card page.
    pub fn parse_detail(&self, markup: &str) -> Option<SourceRecord> {
        let document = Html::parse_document(markup);
        let root = document.root_element();

        let name = self.detail.name.extract(root)?;
        let mut record = SourceRecord::new(name);
        record.number = self.detail.number.extract(root);
        record.set_name = self.detail.set_name.extract(root);
        record.image_url = self
            .detail
            .image_url
            .extract(root)
            .and_then(|src| self.site.resolve(&src).ok());
        // The image path is the more reliable source of the set code.
        record.set_code = self
            .detail
            .set_code
            .extract(root)
            .or_else(|| record.image_url.as_deref().and_then(set_code_from_path));
        record.card_type = self.card_type.extract(root);
        record.rarity = self.rarity.extract(root);
        record.text = self.detail.text.extract(root);
        record.keywords = record
            .text
            .as_deref()
            .map(extract_keywords)
            .unwrap_or_default();
        record.cost = stat(&self.detail.cost, root);
        record.attack = stat(&self.detail.attack, root);
        record.health = stat(&self.detail.health, root);
        Some(record)
    }

    /// Detail URLs under `scope`; the first link rule that finds anything
    /// wins.
    fn detail_links(&self, scope: ElementRef) -> Vec<String> {
        for rule in &self.links {
            let mut urls: Vec<String> = Vec::new();
            for raw in rule.extractor.extract_all(scope) {
                let Ok(url) = self.site.resolve(&rule.href(&raw)) else {
                    continue;
                };
                if !urls.contains(&url) {
                    urls.push(url);
                }
            }
            if !urls.is_empty() {
                return urls;
            }
        }
        Vec::new()
    }
}

/// Stat boxes hold a number, sometimes with a label; anything else is absent.
fn stat(rule: &FieldRule, scope: ElementRef) -> Option<i64> {
    rule.extract(scope).as_deref().and_then(parse_int)
}
