// src/models/mod.rs

//! Domain models for the monitor.
//!
//! This module contains the data structures shared across the pipeline,
//! organized by their primary purpose.

mod config;
mod listing;
mod site;

use std::collections::BTreeSet;

// Re-export all public types
pub use config::{
    Config, ConfigOverrides, CrawlerConfig, FirstRunPolicy, MonitorConfig, NotifyConfig,
    StateConfig, parse_bool, parse_search_urls,
};
pub use listing::{Listing, UNKNOWN, format_yen};
pub use site::SiteRule;

/// Identifiers already notified, kept sorted for stable serialization.
pub type SeenSet = BTreeSet<String>;
