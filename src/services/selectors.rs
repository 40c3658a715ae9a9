//! Site rule detection service.
//!
//! Picks the scraping rule for a page from its host name.

use crate::models::SiteRule;
use crate::utils::get_domain;

/// Service for choosing the site rule that applies to a URL.
#[derive(Debug, Clone)]
pub struct SiteDetector {
    rules: Vec<SiteRule>,
}

impl SiteDetector {
    /// Create a new detector over the given rules.
    pub fn new(rules: Vec<SiteRule>) -> Self {
        Self { rules }
    }

    /// Rules known to this detector.
    pub fn rules(&self) -> &[SiteRule] {
        &self.rules
    }

    /// Return the first rule claiming the URL's host, else the fallback rule.
    pub fn detect(&self, url: &str) -> Option<&SiteRule> {
        let host = get_domain(url).unwrap_or_default();

        let matched = self
            .rules
            .iter()
            .find(|rule| !rule.is_fallback() && rule.matches_host(&host));

        if let Some(rule) = matched {
            log::debug!("Detected {} rule '{}' for URL: {}", rule.name, rule.key, url);
            return Some(rule);
        }
        self.rules.iter().find(|rule| rule.is_fallback())
    }
}

impl Default for SiteDetector {
    fn default() -> Self {
        Self::new(SiteRule::defaults())
    }
}
