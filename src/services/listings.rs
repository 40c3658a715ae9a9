// src/services/listings.rs

//! Listing extraction service.
//!
//! Turns a search result page into `Listing` records using the site rule
//! matched for the page URL.

use std::collections::{HashMap, HashSet};
use std::ops::Deref;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{Listing, SiteRule};
use crate::services::SiteDetector;
use crate::utils::{parse_selector, resolve_url, text, url::extract_property_id};

/// Name used when a card exposes no usable title.
const NAME_PLACEHOLDER: &str = "名称未取得";
/// Anchor text longer than this is cut when used as a name.
const MAX_ANCHOR_NAME_CHARS: usize = 80;
/// Cards considered when no rule selector matched anything.
const FALLBACK_CARD_SELECTOR: &str = "li, div, article";

/// Selectors of one rule, parsed once.
struct CompiledRule {
    cards: Vec<Selector>,
    names: Vec<Selector>,
}

/// Service for extracting listings from search result pages.
pub struct ListingExtractor {
    detector: SiteDetector,
    compiled: HashMap<String, CompiledRule>,
    anchor: Selector,
    fallback_cards: Selector,
}

impl ListingExtractor {
    /// Create an extractor, parsing every selector of every rule up front.
    pub fn new(rules: Vec<SiteRule>) -> Result<Self> {
        let mut compiled = HashMap::new();
        for rule in &rules {
            let cards = rule
                .card_selectors
                .iter()
                .map(|s| parse_selector(s))
                .collect::<Result<Vec<_>>>()?;
            let names = rule
                .name_selectors
                .iter()
                .map(|s| parse_selector(s))
                .collect::<Result<Vec<_>>>()?;
            compiled.insert(rule.key.clone(), CompiledRule { cards, names });
        }

        Ok(Self {
            detector: SiteDetector::new(rules),
            compiled,
            anchor: parse_selector("a[href]")?,
            fallback_cards: parse_selector(FALLBACK_CARD_SELECTOR)?,
        })
    }

    /// Extract all listings from `html`, fetched from `page_url`.
    ///
    /// The result may contain the same listing more than once when nested
    /// cards match; callers deduplicate by `Listing::unique_id`.
    pub fn extract(&self, html: &str, page_url: &str) -> Result<Vec<Listing>> {
        let rule = self.detector.detect(page_url).ok_or_else(|| {
            AppError::config(format!("No site rule matches {page_url} and no fallback is defined"))
        })?;
        let compiled = self.compiled.get(&rule.key).ok_or_else(|| {
            AppError::config(format!("Site rule '{}' was not compiled", rule.key))
        })?;

        let base_url = origin_of(page_url)?;
        let document = Html::parse_document(html);
        let cards = self.collect_cards(&document, &compiled.cards);

        let listings: Vec<Listing> = cards
            .into_iter()
            .filter_map(|card| self.parse_card(card, rule, compiled, &base_url))
            .collect();

        log::debug!(
            "Extracted {} listing cards from {} using {} rule '{}'",
            listings.len(),
            page_url,
            rule.name,
            rule.key
        );
        Ok(listings)
    }

    /// Cards from every selector in order, each DOM node at most once.
    fn collect_cards<'a>(&self, document: &'a Html, selectors: &[Selector]) -> Vec<ElementRef<'a>> {
        let mut seen = HashSet::new();
        let mut cards = Vec::new();
        for selector in selectors {
            for element in document.select(selector) {
                if seen.insert(element.deref().id()) {
                    cards.push(element);
                }
            }
        }

        if cards.is_empty() {
            cards = document
                .select(&self.fallback_cards)
                .filter(|element| !element_text(*element).is_empty())
                .collect();
        }
        cards
    }

    fn parse_card(
        &self,
        card: ElementRef<'_>,
        rule: &SiteRule,
        compiled: &CompiledRule,
        base_url: &Url,
    ) -> Option<Listing> {
        let raw_text = element_text(card);
        if raw_text.is_empty() {
            return None;
        }
        if !raw_text.contains('賃') && !raw_text.contains('円') {
            return None;
        }

        let anchor = self.find_detail_anchor(card, &rule.link_tokens)?;
        let href = anchor.value().attr("href").unwrap_or("").trim();
        if href.is_empty() {
            return None;
        }

        let detail_url = resolve_url(base_url, href);
        let property_id = extract_property_id(&detail_url);
        let name = pick_name(card, &compiled.names, anchor);

        let rent_yen = text::rent(&raw_text);
        let management_fee_yen = text::money_by_label(&raw_text, text::MANAGEMENT_LABELS);
        let parking_fee_yen = text::money_by_label(&raw_text, text::PARKING_LABELS);

        Some(Listing {
            property_id,
            site: rule.key.clone(),
            name,
            detail_url,
            rent_yen,
            management_fee_yen,
            parking_fee_yen,
            total_yen: rent_yen
                .saturating_add(management_fee_yen)
                .saturating_add(parking_fee_yen),
            layout: text::layout(&raw_text),
            area_m2: text::area_m2(&raw_text),
            age_years: text::age_years(&raw_text),
            nearest_station: text::station(&raw_text),
            station_walk_min: text::walk_minutes(&raw_text),
        })
    }

    /// First anchor whose href carries a link token, else the first anchor.
    fn find_detail_anchor<'a>(
        &self,
        card: ElementRef<'a>,
        link_tokens: &[String],
    ) -> Option<ElementRef<'a>> {
        let anchors: Vec<ElementRef<'a>> = card.select(&self.anchor).collect();

        anchors
            .iter()
            .find(|a| {
                let href = a.value().attr("href").unwrap_or("");
                link_tokens.iter().any(|token| href.contains(token.as_str()))
            })
            .or_else(|| anchors.first())
            .copied()
    }
}

/// Merge listings from several pages, keeping the first of each identifier.
pub fn dedupe_listings(listings: Vec<Listing>) -> Vec<Listing> {
    let mut seen = HashSet::new();
    listings
        .into_iter()
        .filter(|listing| seen.insert(listing.unique_id()))
        .collect()
}

fn pick_name(card: ElementRef<'_>, selectors: &[Selector], anchor: ElementRef<'_>) -> String {
    for selector in selectors {
        if let Some(element) = card.select(selector).next() {
            let name = element_text(element);
            if !name.is_empty() {
                return name;
            }
        }
    }

    let anchor_text = element_text(anchor);
    if !anchor_text.is_empty() {
        return anchor_text.chars().take(MAX_ANCHOR_NAME_CHARS).collect();
    }

    NAME_PLACEHOLDER.to_string()
}

fn element_text(element: ElementRef<'_>) -> String {
    text::normalize_space(&element.text().collect::<Vec<_>>().join(" "))
}

/// `scheme://host[:port]/` of a page URL.
fn origin_of(page_url: &str) -> Result<Url> {
    let mut origin = Url::parse(page_url).map_err(|e| AppError::fetch(page_url, e))?;
    origin.set_path("/");
    origin.set_query(None);
    origin.set_fragment(None);
    Ok(origin)
}
