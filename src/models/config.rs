//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::SiteRule;
use crate::utils::parse_selector;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Sources and run policy
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// HTTP fetch behavior
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Webhook delivery and message layout
    #[serde(default)]
    pub notify: NotifyConfig,

    /// Seen-set persistence
    #[serde(default)]
    pub state: StateConfig,

    /// Per-site scraping rules
    #[serde(default = "SiteRule::defaults")]
    pub sites: Vec<SiteRule>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Apply values supplied through the environment or command line.
    ///
    /// Source URLs from overrides replace the file's list entirely.
    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        let urls = parse_search_urls(
            overrides.search_url.as_deref().unwrap_or(""),
            overrides.search_urls.as_deref().unwrap_or(""),
        );
        if !urls.is_empty() {
            self.monitor.search_urls = urls;
        }

        if let Some(webhook) = overrides.webhook_url.filter(|w| !w.trim().is_empty()) {
            self.notify.webhook_url = Some(webhook.trim().to_string());
        }

        if let Some(flag) = overrides.notify_on_no_new {
            self.monitor.notify_on_no_new = parse_bool(&flag);
        }

        if let Some(path) = overrides.state_path {
            self.state.path = path;
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.notify.timeout_secs == 0 {
            return Err(AppError::validation("notify.timeout_secs must be > 0"));
        }
        if self.notify.max_items == 0 {
            return Err(AppError::validation("notify.max_items must be > 0"));
        }
        if self.notify.max_message_chars < 100 {
            return Err(AppError::validation(
                "notify.max_message_chars must be >= 100",
            ));
        }
        if self.state.path.as_os_str().is_empty() {
            return Err(AppError::validation("state.path is empty"));
        }
        if self.sites.is_empty() {
            return Err(AppError::validation("No site rules defined"));
        }

        let fallbacks = self.sites.iter().filter(|s| s.is_fallback()).count();
        if fallbacks != 1 {
            return Err(AppError::validation(format!(
                "Exactly one site rule must have an empty host_contains (found {fallbacks})"
            )));
        }

        for site in &self.sites {
            if site.key.trim().is_empty() {
                return Err(AppError::validation("site rule with empty key"));
            }
            if site.card_selectors.is_empty() {
                return Err(AppError::validation(format!(
                    "site '{}' has no card_selectors",
                    site.key
                )));
            }
            for selector in site.selectors() {
                parse_selector(selector)?;
            }
        }

        for source in &self.monitor.search_urls {
            let parsed = Url::parse(source)
                .map_err(|e| AppError::validation(format!("invalid source URL '{source}': {e}")))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(AppError::validation(format!(
                    "source URL must be http(s): {source}"
                )));
            }
        }

        if let Some(webhook) = &self.notify.webhook_url {
            Url::parse(webhook)
                .map_err(|e| AppError::validation(format!("invalid webhook URL: {e}")))?;
        }

        Ok(())
    }

    /// Check that everything a run needs was supplied.
    ///
    /// Reports every missing input in a single error.
    pub fn require_run_inputs(&self, dry_run: bool) -> Result<()> {
        let mut missing = Vec::new();
        if self.monitor.search_urls.is_empty() {
            missing.push("SEARCH_URL or SEARCH_URLS");
        }
        if !dry_run && self.notify.webhook_url.is_none() {
            missing.push("SLACK_WEBHOOK_URL");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(AppError::config(format!(
                "missing required settings: {}",
                missing.join(", ")
            )))
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            monitor: MonitorConfig::default(),
            crawler: CrawlerConfig::default(),
            notify: NotifyConfig::default(),
            state: StateConfig::default(),
            sites: SiteRule::defaults(),
        }
    }
}

/// Values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub search_url: Option<String>,
    pub search_urls: Option<String>,
    pub webhook_url: Option<String>,
    pub notify_on_no_new: Option<String>,
    pub state_path: Option<PathBuf>,
}

/// What the first run (no state file) does with the listings it sees.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FirstRunPolicy {
    /// Record everything as seen without notifying
    #[default]
    Baseline,
    /// Notify every listing as new
    NotifyAll,
}

/// Sources and run policy.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MonitorConfig {
    /// Search result pages to poll
    #[serde(default)]
    pub search_urls: Vec<String>,

    /// Send a message even when nothing new was found
    #[serde(default)]
    pub notify_on_no_new: bool,

    /// Behavior when no state file exists yet
    #[serde(default)]
    pub first_run: FirstRunPolicy,

    /// Skip failing sources instead of aborting the run
    #[serde(default)]
    pub continue_on_source_error: bool,
}

/// HTTP client and fetch behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Delay between source requests in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            request_delay_ms: defaults::request_delay(),
        }
    }
}

/// Webhook delivery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Incoming webhook URL (normally supplied via SLACK_WEBHOOK_URL)
    #[serde(default)]
    pub webhook_url: Option<String>,

    /// Webhook request timeout in seconds
    #[serde(default = "defaults::notify_timeout")]
    pub timeout_secs: u64,

    /// Extra attempts after a retryable failure
    #[serde(default = "defaults::notify_retries")]
    pub retries: u32,

    /// Listings described in one message
    #[serde(default = "defaults::max_items")]
    pub max_items: usize,

    /// Message length cap in characters
    #[serde(default = "defaults::max_message_chars")]
    pub max_message_chars: usize,

    /// Per-listing block, see `Listing::format`
    #[serde(default = "defaults::item_template")]
    pub item_template: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_secs: defaults::notify_timeout(),
            retries: defaults::notify_retries(),
            max_items: defaults::max_items(),
            max_message_chars: defaults::max_message_chars(),
            item_template: defaults::item_template(),
        }
    }
}

/// Seen-set persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    /// Path of the seen-set JSON file
    #[serde(default = "defaults::state_path")]
    pub path: PathBuf,

    /// Age after which a leftover lock file is ignored
    #[serde(default = "defaults::stale_lock")]
    pub stale_lock_secs: u64,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            path: defaults::state_path(),
            stale_lock_secs: defaults::stale_lock(),
        }
    }
}

/// Split a comma/newline separated list and append the single URL.
///
/// Blank entries and duplicates are dropped; order is kept.
pub fn parse_search_urls(single: &str, multiple: &str) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();
    let candidates = multiple
        .split(['\r', '\n', ','])
        .chain(std::iter::once(single));

    for token in candidates {
        let token = token.trim();
        if !token.is_empty() && !urls.iter().any(|u| u == token) {
            urls.push(token.to_string());
        }
    }
    urls
}

/// Interpret a loosely-typed boolean: `1`, `true`, `yes`, `on` are true.
pub fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

mod defaults {
    use std::path::PathBuf;

    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; rent-monitor/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn request_delay() -> u64 {
        1000
    }

    // Notify defaults
    pub fn notify_timeout() -> u64 {
        20
    }
    pub fn notify_retries() -> u32 {
        2
    }
    pub fn max_items() -> usize {
        10
    }
    pub fn max_message_chars() -> usize {
        3500
    }
    pub fn item_template() -> String {
        [
            "・[{site}] {name}",
            "  合計: {total}円 (家賃{rent}/管理費{management_fee}/駐車場{parking_fee})",
            "  間取り: {layout} / {area}㎡ / 築{age}年",
            "  最寄: {station} 徒歩{walk}分",
            "  URL: {url}",
        ]
        .join("\n")
    }

    // State defaults
    pub fn state_path() -> PathBuf {
        PathBuf::from("seen_ids.json")
    }
    pub fn stale_lock() -> u64 {
        3600
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runnable_config() -> Config {
        let mut config = Config::default();
        config.monitor.search_urls = vec!["https://suumo.jp/jj/chintai/ichiran/".to_string()];
        config.notify.webhook_url = Some("https://hooks.slack.com/services/T/B/X".to_string());
        config
    }

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
        assert!(runnable_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_user_agent() {
        let mut config = Config::default();
        config.crawler.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_selector() {
        let mut config = Config::default();
        config.sites[0].card_selectors.push("[[invalid".to_string());
        assert!(matches!(
            config.validate(),
            Err(AppError::Selector { .. })
        ));
    }

    #[test]
    fn validate_requires_single_fallback() {
        let mut config = Config::default();
        config.sites.retain(|s| !s.is_fallback());
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_non_http_source() {
        let mut config = runnable_config();
        config.monitor.search_urls = vec!["ftp://example.com/list".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn require_run_inputs_lists_everything_missing() {
        let err = Config::default().require_run_inputs(false).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("SEARCH_URL or SEARCH_URLS"));
        assert!(message.contains("SLACK_WEBHOOK_URL"));

        let mut config = Config::default();
        config.monitor.search_urls = vec!["https://example.com/".to_string()];
        assert!(config.require_run_inputs(true).is_ok());
        assert!(config.require_run_inputs(false).is_err());
    }

    #[test]
    fn parse_search_urls_splits_and_dedupes() {
        let urls = parse_search_urls(
            "https://a.example/1",
            "https://a.example/1, https://b.example/2\r\nhttps://c.example/3\n\n",
        );
        assert_eq!(
            urls,
            vec![
                "https://a.example/1",
                "https://b.example/2",
                "https://c.example/3"
            ]
        );
        assert!(parse_search_urls("", " , \n").is_empty());
    }

    #[test]
    fn parse_bool_accepts_truthy_words() {
        for v in ["1", "true", "TRUE", " yes ", "On"] {
            assert!(parse_bool(v), "{v} should be true");
        }
        for v in ["", "0", "false", "no", "off", "maybe"] {
            assert!(!parse_bool(v), "{v} should be false");
        }
    }

    #[test]
    fn overrides_replace_file_values() {
        let mut config = runnable_config();
        config.apply_overrides(ConfigOverrides {
            search_url: None,
            search_urls: Some("https://x.example/a,https://x.example/b".to_string()),
            webhook_url: Some(" https://hooks.example/new ".to_string()),
            notify_on_no_new: Some("yes".to_string()),
            state_path: Some(PathBuf::from("state/seen.json")),
        });
        assert_eq!(config.monitor.search_urls.len(), 2);
        assert_eq!(
            config.notify.webhook_url.as_deref(),
            Some("https://hooks.example/new")
        );
        assert!(config.monitor.notify_on_no_new);
        assert_eq!(config.state.path, PathBuf::from("state/seen.json"));
    }

    #[test]
    fn empty_overrides_keep_file_values() {
        let mut config = runnable_config();
        config.apply_overrides(ConfigOverrides::default());
        assert_eq!(config.monitor.search_urls.len(), 1);
        assert!(config.notify.webhook_url.is_some());
    }

    #[test]
    fn parses_toml_with_partial_sections() {
        let config: Config = toml::from_str(
            r#"
            [monitor]
            search_urls = ["https://www.homes.co.jp/chintai/tokyo/list/"]
            first_run = "notify_all"

            [notify]
            max_items = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.monitor.first_run, FirstRunPolicy::NotifyAll);
        assert_eq!(config.notify.max_items, 3);
        assert_eq!(config.notify.timeout_secs, 20);
        assert_eq!(config.sites.len(), 3);
        assert_eq!(config.state.path, PathBuf::from("seen_ids.json"));
    }

    #[test]
    fn bundled_monitor_toml_is_valid() {
        let config: Config = toml::from_str(include_str!("../../monitor.toml")).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.monitor.first_run, FirstRunPolicy::Baseline);
        assert_eq!(config.sites.len(), 3);
    }
}
