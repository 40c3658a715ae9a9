// src/models/site.rs

//! Per-site scraping rules.

use serde::{Deserialize, Serialize};

/// Scraping rule for one listing site.
///
/// A rule matches a page when any `host_contains` entry is a substring of the
/// page host. A rule with an empty `host_contains` is the fallback used for
/// hosts no other rule claims.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SiteRule {
    /// Short key used as the identifier prefix (e.g., "suumo")
    pub key: String,

    /// Human-readable site name
    pub name: String,

    /// Host substrings that select this rule
    #[serde(default)]
    pub host_contains: Vec<String>,

    /// CSS selectors for listing cards, tried in order
    pub card_selectors: Vec<String>,

    /// CSS selectors for the listing name inside a card
    #[serde(default)]
    pub name_selectors: Vec<String>,

    /// Substrings that mark an anchor as the detail link
    #[serde(default)]
    pub link_tokens: Vec<String>,
}

impl SiteRule {
    /// Whether this rule is the catch-all fallback.
    pub fn is_fallback(&self) -> bool {
        self.host_contains.is_empty()
    }

    /// Whether this rule claims the given (lowercased) host.
    pub fn matches_host(&self, host: &str) -> bool {
        self.host_contains
            .iter()
            .any(|needle| host.contains(&needle.to_lowercase()))
    }

    /// All CSS selectors this rule declares.
    pub fn selectors(&self) -> impl Iterator<Item = &str> {
        self.card_selectors
            .iter()
            .chain(self.name_selectors.iter())
            .map(String::as_str)
    }

    /// Built-in rules for SUUMO, HOME'S, and a generic fallback.
    pub fn defaults() -> Vec<SiteRule> {
        vec![
            SiteRule {
                key: "suumo".into(),
                name: "SUUMO".into(),
                host_contains: strings(&["suumo.jp"]),
                card_selectors: strings(&[
                    "li.cassetteitem",
                    "div.cassetteitem",
                    "li[class*='cassetteitem']",
                    "div[class*='cassetteitem']",
                ]),
                name_selectors: strings(&[".cassetteitem_content-title", ".js-cassette_link_href"]),
                link_tokens: strings(&["/chintai/"]),
            },
            SiteRule {
                key: "homes".into(),
                name: "HOME'S".into(),
                host_contains: strings(&["homes.co.jp", "lifull"]),
                card_selectors: strings(&[
                    "div.mod-mergeBuilding",
                    "section.mod-mergeBuilding",
                    "li.mod-mergeBuilding",
                    "article",
                    "li",
                ]),
                name_selectors: strings(&[
                    ".mod-mergeBuilding__buildingName",
                    ".prg-buildingName",
                    ".moduleInner__title",
                ]),
                link_tokens: strings(&["/chintai/", "/room/", "/b-"]),
            },
            SiteRule {
                key: "generic".into(),
                name: "GENERIC".into(),
                host_contains: Vec::new(),
                card_selectors: strings(&["article", "li", "div"]),
                name_selectors: strings(&["h2", "h3", ".title", ".name"]),
                link_tokens: strings(&["/chintai/", "/rent/", "/room/", "/b-"]),
            },
        ]
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
