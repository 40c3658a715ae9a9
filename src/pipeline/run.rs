// src/pipeline/run.rs

//! One monitor run: fetch, extract, diff, notify, persist.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{Config, FirstRunPolicy, Listing};
use crate::pipeline::diff::{calculate_diff, merge_seen};
use crate::services::{ListingExtractor, Notification, Notifier, PageFetcher, dedupe_listings};
use crate::storage::{SeenStore, StateOrigin};

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Sources configured for the run
    pub sources: usize,
    /// Sources skipped after a fetch or parse error
    pub source_failures: usize,
    /// Distinct listings extracted across all sources
    pub fetched: usize,
    /// Identifiers reported as new, in extraction order
    pub new_ids: Vec<String>,
    /// The run only recorded a baseline
    pub baseline: bool,
    /// A message was delivered
    pub notified: bool,
    /// The seen set was written
    pub persisted: bool,
}

/// Run the monitor once.
///
/// State is written only after the notification (if any) was accepted, so
/// a failed delivery is retried by the next run.
pub async fn run_monitor(
    config: &Config,
    fetcher: &dyn PageFetcher,
    notifier: &dyn Notifier,
    store: &dyn SeenStore,
) -> Result<RunReport> {
    let started_at = Utc::now();
    let sources = &config.monitor.search_urls;
    log::info!("Starting run over {} source(s)", sources.len());

    let extractor = ListingExtractor::new(config.sites.clone())?;
    let (listings, source_failures) = collect_listings(config, fetcher, &extractor).await?;
    let listings = dedupe_listings(listings);
    let ids: Vec<String> = listings.iter().map(Listing::unique_id).collect();
    log::info!("Extracted {} distinct listing(s)", ids.len());

    let state = store.load().await;
    let baseline = state.origin == StateOrigin::Missing
        && config.monitor.first_run == FirstRunPolicy::Baseline
        && !ids.is_empty();

    let new_ids = if baseline {
        log::info!("No state yet; recording {} listing(s) as baseline", ids.len());
        Vec::new()
    } else {
        calculate_diff(&state.ids, &ids).added
    };
    log::info!("{} new listing(s)", new_ids.len());

    let new_set: HashSet<&str> = new_ids.iter().map(String::as_str).collect();
    let new_listings: Vec<Listing> = listings
        .iter()
        .filter(|l| new_set.contains(l.unique_id().as_str()))
        .cloned()
        .collect();

    let notify_on_no_new = config.monitor.notify_on_no_new;
    let notification = if !new_listings.is_empty() {
        Some(Notification::NewListings(&new_listings))
    } else if !notify_on_no_new {
        None
    } else if baseline {
        Some(Notification::Baseline { total: ids.len() })
    } else if ids.is_empty() {
        Some(Notification::NothingFetched)
    } else {
        Some(Notification::NoNewListings { total: ids.len() })
    };

    let notified = match notification {
        Some(notification) => {
            let text = notification.render(&config.notify);
            if let Err(e) = notifier.send(&text).await {
                log::error!("Notification failed, state left unchanged: {}", e);
                return Err(e);
            }
            log::info!("Notification sent");
            true
        }
        None => {
            log::info!("Nothing to notify");
            false
        }
    };

    let merged = merge_seen(&state.ids, &ids);
    let first_write = state.origin != StateOrigin::Loaded && !ids.is_empty();
    let persisted = merged != state.ids || first_write;
    if persisted {
        store.save(&merged).await?;
    } else {
        log::info!("Seen set unchanged ({} ids)", merged.len());
    }

    Ok(RunReport {
        started_at,
        finished_at: Utc::now(),
        sources: sources.len(),
        source_failures,
        fetched: ids.len(),
        new_ids,
        baseline,
        notified,
        persisted,
    })
}

/// Fetch and extract every source in order.
///
/// Returns the raw listings and the number of skipped sources. A failing
/// source aborts unless `continue_on_source_error` is set; if every source
/// fails the last error is returned.
async fn collect_listings(
    config: &Config,
    fetcher: &dyn PageFetcher,
    extractor: &ListingExtractor,
) -> Result<(Vec<Listing>, usize)> {
    let sources = &config.monitor.search_urls;
    let delay = Duration::from_millis(config.crawler.request_delay_ms);
    let mut listings = Vec::new();
    let mut failures = 0;
    let mut last_error = None;

    for (i, url) in sources.iter().enumerate() {
        if i > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let result = match fetcher.fetch(url).await {
            Ok(html) => extractor.extract(&html, url),
            Err(e) => Err(e),
        };

        match result {
            Ok(found) => {
                log::info!("[{}/{}] {} card(s) from {}", i + 1, sources.len(), found.len(), url);
                listings.extend(found);
            }
            Err(e) if config.monitor.continue_on_source_error => {
                log::warn!("[{}/{}] Skipping {}: {}", i + 1, sources.len(), url, e);
                failures += 1;
                last_error = Some(e);
            }
            Err(e) => {
                log::error!("[{}/{}] Failed {}: {}", i + 1, sources.len(), url, e);
                return Err(e);
            }
        }
    }

    if let Some(e) = last_error.filter(|_| failures == sources.len()) {
        log::error!("All {} source(s) failed", failures);
        return Err(e);
    }

    Ok((listings, failures))
}
