//! Field extraction strategies.
//!
//! Every field the parser reads is a [`FieldRule`]: an ordered list of
//! independent [`Extractor`]s, each of which may or may not find a value in
//! a piece of markup. The first non-empty value wins, so a site's layout
//! quirks live in the order of the fallbacks rather than in parsing code.

use anyhow::{Context, anyhow};
use regex::Regex;
use scraper::{ElementRef, Selector};

use crate::{config::ExtractorSpec, text_manipulators::extract_text};

pub trait Extractor {
    /// Try to produce a value from `scope`. `None` means "try the next one".
    fn extract(&self, scope: ElementRef) -> Option<String>;

    /// Every value this extractor finds under `scope`, in document order.
    fn extract_all(&self, scope: ElementRef) -> Vec<String> {
        self.extract(scope).into_iter().collect()
    }
}

pub fn parse_selector(css: &str) -> anyhow::Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("invalid selector {:?}: {}", css, e))
}

/// Text content of the first element matching the selector.
pub struct SelectorText {
    selector: Selector,
}

impl SelectorText {
    pub fn new(css: &str) -> anyhow::Result<Self> {
        Ok(Self {
            selector: parse_selector(css)?,
        })
    }
}

impl Extractor for SelectorText {
    fn extract(&self, scope: ElementRef) -> Option<String> {
        scope
            .select(&self.selector)
            .map(extract_text)
            .find(|text| !text.is_empty())
    }

    fn extract_all(&self, scope: ElementRef) -> Vec<String> {
        scope
            .select(&self.selector)
            .map(extract_text)
            .filter(|text| !text.is_empty())
            .collect()
    }
}

/// An attribute of the first matching element that carries it.
pub struct SelectorAttr {
    selector: Selector,
    attr: String,
}

impl SelectorAttr {
    pub fn new(css: &str, attr: &str) -> anyhow::Result<Self> {
        Ok(Self {
            selector: parse_selector(css)?,
            attr: attr.to_string(),
        })
    }

    fn values<'a>(&'a self, scope: ElementRef<'a>) -> impl Iterator<Item = String> + 'a {
        scope
            .select(&self.selector)
            .filter_map(|el| el.value().attr(&self.attr))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}

impl Extractor for SelectorAttr {
    fn extract(&self, scope: ElementRef) -> Option<String> {
        self.values(scope).next()
    }

    fn extract_all(&self, scope: ElementRef) -> Vec<String> {
        self.values(scope).collect()
    }
}

/// Narrows another extractor's output to capture group 1 of a regex.
pub struct Captured {
    inner: Box<dyn Extractor>,
    pattern: Regex,
}

impl Captured {
    pub fn new(inner: Box<dyn Extractor>, pattern: &str) -> anyhow::Result<Self> {
        let pattern =
            Regex::new(pattern).with_context(|| format!("invalid pattern {:?}", pattern))?;
        Ok(Self { inner, pattern })
    }

    fn capture(&self, raw: &str) -> Option<String> {
        let caps = self.pattern.captures(raw)?;
        let value = caps.get(1).or_else(|| caps.get(0))?.as_str().trim();
        (!value.is_empty()).then(|| value.to_string())
    }
}

impl Extractor for Captured {
    fn extract(&self, scope: ElementRef) -> Option<String> {
        // A value that doesn't match may be followed by one that does.
        self.inner
            .extract_all(scope)
            .iter()
            .find_map(|raw| self.capture(raw))
    }

    fn extract_all(&self, scope: ElementRef) -> Vec<String> {
        self.inner
            .extract_all(scope)
            .iter()
            .filter_map(|raw| self.capture(raw))
            .collect()
    }
}

/// First text run under the scope that belongs to a closed vocabulary,
/// compared case-insensitively. Returns the vocabulary's spelling.
pub struct Vocabulary {
    terms: &'static [&'static str],
}

impl Vocabulary {
    pub const fn new(terms: &'static [&'static str]) -> Self {
        Self { terms }
    }

    pub fn lookup(&self, token: &str) -> Option<&'static str> {
        let token = token.trim();
        self.terms
            .iter()
            .copied()
            .find(|term| term.eq_ignore_ascii_case(token))
    }
}

impl Extractor for Vocabulary {
    fn extract(&self, scope: ElementRef) -> Option<String> {
        crate::text_manipulators::text_tokens(scope)
            .find_map(|token| self.lookup(token))
            .map(str::to_string)
    }
}

pub fn build_extractor(spec: &ExtractorSpec) -> anyhow::Result<Box<dyn Extractor>> {
    let base: Box<dyn Extractor> = match &spec.attr {
        Some(attr) => Box::new(SelectorAttr::new(&spec.selector, attr)?),
        None => Box::new(SelectorText::new(&spec.selector)?),
    };
    match &spec.pattern {
        Some(pattern) => Ok(Box::new(Captured::new(base, pattern)?)),
        None => Ok(base),
    }
}

/// Ordered fallbacks for one field.
#[derive(Default)]
pub struct FieldRule {
    extractors: Vec<Box<dyn Extractor>>,
}

impl FieldRule {
    pub fn new(extractors: Vec<Box<dyn Extractor>>) -> Self {
        Self { extractors }
    }

    pub fn from_specs(specs: &[ExtractorSpec]) -> anyhow::Result<Self> {
        let extractors = specs
            .iter()
            .map(build_extractor)
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(Self { extractors })
    }

    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }

    pub fn extract(&self, scope: ElementRef) -> Option<String> {
        self.extractors.iter().find_map(|e| e.extract(scope))
    }
}
