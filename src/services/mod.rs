//! Service layer for the monitor.
//!
//! This module contains the moving parts of a run:
//! - Page fetching (`PageFetcher`, `HttpFetcher`)
//! - Site rule detection (`SiteDetector`)
//! - Listing extraction (`ListingExtractor`)
//! - Message rendering (`Notification`)
//! - Webhook delivery (`Notifier`, `SlackWebhook`, `ConsoleNotifier`)

mod fetcher;
mod listings;
mod message;
mod notifier;
mod selectors;

pub use fetcher::{HttpFetcher, PageFetcher};
pub use listings::{ListingExtractor, dedupe_listings};
pub use message::{Notification, truncate_message};
pub use notifier::{ConsoleNotifier, Notifier, SlackWebhook};
pub use selectors::SiteDetector;
