// src/pipeline/sync.rs

//! Sync orchestrator: probe version, fetch watermark-bounded list pages,
//! fetch detail batches, advance the watermark, repeat until no more
//! changed issues remain, then finalize the cache.

use std::time::{Duration, Instant};

use chrono::NaiveDateTime;

use crate::config::{DetailLevel, SyncConfig};
use crate::error::Result;
use crate::models::IssueRecord;
use crate::pipeline::cursor::IncrementalCursor;
use crate::services::{BatchFetcher, Dialect, IssueRecordBuilder, ListFetcher, probe_version};
use crate::storage::{LocalCache, StateStore};
use crate::utils::http::create_client;
use crate::utils::time::parse_timestamp;
use crate::utils::url::tracker_domain;

/// Drives one end-to-end synchronization run.
///
/// Fully synchronous and single-threaded: list pages and detail batches
/// are processed strictly in ascending watermark order, which the
/// watermark-advance protocol relies on. The run returns the finite
/// sequence of records it gathered.
pub struct SyncOrchestrator<'a, S: StateStore> {
    config: &'a SyncConfig,
    store: &'a mut S,
}

impl<'a, S: StateStore> SyncOrchestrator<'a, S> {
    pub fn new(config: &'a SyncConfig, store: &'a mut S) -> Self {
        Self { config, store }
    }

    /// Run the sync to completion.
    ///
    /// Transport errors on the version probe, a list fetch or a detail
    /// fetch abort the run; the watermark stays at its last successfully
    /// advanced value and cached batches stay intact, so the next run
    /// resumes instead of restarting.
    pub fn run(&mut self) -> Result<Vec<IssueRecord>> {
        self.config.validate()?;

        let builder = IssueRecordBuilder::default();
        let mut cache = LocalCache::new(&self.config.cache_dir);

        if self.config.replay {
            cache.init()?;
            return cache.replay(&builder);
        }

        log::info!("Getting issues from tracker at {}", self.config.url);

        let client = create_client(&self.config.http)?;
        let domain = tracker_domain(&self.config.url)?;
        let version = probe_version(&client, &domain)?;
        let dialect = Dialect::from_version(&version);

        if self.config.cache {
            if self.config.incremental {
                cache.init()?;
            } else {
                cache.clean()?;
            }
        }

        let mut cursor =
            IncrementalCursor::initial(&*self.store, self.config.detail, self.config.incremental)?;
        if let Some(watermark) = cursor.value() {
            log::info!("Incremental analysis: {watermark}");
        }

        let list_fetcher = ListFetcher::new(&client, &self.config.url, dialect);
        let delay = Duration::from_millis(self.config.http.request_delay_ms);
        let mut gathered = Vec::new();
        let mut total = 0usize;

        // Whole-run progress is measured in data time: from the first change
        // timestamp seen (or the seed watermark) toward "now" at run start.
        let run_started = Instant::now();
        let horizon = chrono::Local::now().naive_local();
        let mut run_first_ts: Option<NaiveDateTime> =
            cursor.value().and_then(parse_timestamp);

        loop {
            let cache_ref = self.config.cache.then_some(&cache);
            let page = list_fetcher.fetch(&builder, cursor.value(), cache_ref)?;
            if page.ids.is_empty() {
                break;
            }

            let last_change_ts = page.last_change_ts().map(str::to_string);
            if run_first_ts.is_none() {
                run_first_ts = page.ids.first().and_then(|(_, ts)| parse_timestamp(ts));
            }
            log::info!(
                "Issues to get in this iteration {} in packs of {}",
                page.ids.len(),
                self.config.batch_size
            );

            if self.config.detail == DetailLevel::List {
                total += page.records.len();
                gathered.extend(page.records);
            } else {
                let batch_fetcher = BatchFetcher::new(
                    &client,
                    &domain,
                    self.config.detail,
                    delay,
                    &builder,
                    cache_ref,
                );

                let page_total = page.ids.len();
                let mut done = 0usize;

                let ids: Vec<String> = page.ids.into_iter().map(|(id, _)| id).collect();
                for batch in partition_batches(ids, self.config.batch_size) {
                    let started = Instant::now();
                    let records = batch_fetcher.fetch_batch(&batch)?;

                    // Crash-safety checkpoint: losses are bounded to one batch.
                    self.store.checkpoint(&records)?;

                    done += records.len();
                    total += records.len();
                    let eta_min = eta_minutes(started.elapsed(), records.len(), page_total - done);
                    log::info!("Completed {done}/{page_total} (ETA iteration: {eta_min:.2} min)");

                    gathered.extend(records);
                }
            }

            match last_change_ts {
                Some(ts) => {
                    if let (Some(first), Some(reached)) = (run_first_ts, parse_timestamp(&ts)) {
                        if let Some(eta) =
                            run_eta_minutes(first, reached, horizon, run_started.elapsed())
                        {
                            log::info!("ETA: {eta:.2} min");
                        }
                    }
                    cursor.advance(&ts)?;
                }
                None => break,
            }
        }

        if self.config.cache {
            cache.finalize()?;
        }
        log::info!("Total issues gathered {total}");

        Ok(gathered)
    }
}

/// Split a page's ids into detail-fetch batches of at most `batch_size`,
/// preserving the page's oldest-first order across and within batches.
/// The watermark-advance protocol depends on this ordering.
fn partition_batches(ids: Vec<String>, batch_size: usize) -> Vec<Vec<String>> {
    ids.chunks(batch_size.max(1)).map(<[String]>::to_vec).collect()
}

/// Estimated minutes left in this iteration, from the elapsed wall time of
/// the last batch. Observational only.
fn eta_minutes(elapsed: Duration, batch_len: usize, remaining: usize) -> f64 {
    if batch_len == 0 {
        return 0.0;
    }
    elapsed.as_secs_f64() / batch_len as f64 * remaining as f64 / 60.0
}

/// Estimated minutes left in the whole run.
///
/// Progress is the fraction of data time covered so far, from the first
/// change timestamp toward the run-start horizon; the remainder is
/// projected over the elapsed wall time. `None` when no progress is
/// measurable yet or the horizon has been reached. Observational only.
fn run_eta_minutes(
    first: NaiveDateTime,
    reached: NaiveDateTime,
    horizon: NaiveDateTime,
    elapsed: Duration,
) -> Option<f64> {
    let done = (reached - first).num_seconds();
    let total = (horizon - first).num_seconds();
    if done <= 0 || total <= done {
        return None;
    }
    Some(elapsed.as_secs_f64() * (total - done) as f64 / done as f64 / 60.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStateStore;
    use tempfile::TempDir;

    fn ids(range: std::ops::RangeInclusive<u32>) -> Vec<String> {
        range.map(|i| i.to_string()).collect()
    }

    #[test]
    fn batches_preserve_oldest_first_order() {
        let batches = partition_batches(ids(1..=5), 2);
        assert_eq!(
            batches,
            vec![ids(1..=2), ids(3..=4), ids(5..=5)],
        );
    }

    #[test]
    fn exactly_full_page_has_no_remainder_batch() {
        let batches = partition_batches(ids(1..=4), 2);
        assert_eq!(batches, vec![ids(1..=2), ids(3..=4)]);
    }

    #[test]
    fn page_smaller_than_batch_size_is_one_batch() {
        let batches = partition_batches(ids(1..=3), 200);
        assert_eq!(batches, vec![ids(1..=3)]);
        assert!(partition_batches(Vec::new(), 200).is_empty());
    }

    #[test]
    fn eta_scales_with_remaining_count() {
        let eta = eta_minutes(Duration::from_secs(60), 10, 20);
        assert!((eta - 2.0).abs() < 1e-9);
        assert_eq!(eta_minutes(Duration::from_secs(60), 0, 20), 0.0);
    }

    #[test]
    fn run_eta_projects_remaining_data_time() {
        let parse = |s| crate::utils::time::parse_timestamp(s).unwrap();
        let first = parse("2020-01-01 00:00:00");
        let reached = parse("2020-01-11 00:00:00");
        let horizon = parse("2020-01-31 00:00:00");

        // A third of the data time took 10 minutes; two thirds remain.
        let eta = run_eta_minutes(first, reached, horizon, Duration::from_secs(600)).unwrap();
        assert!((eta - 20.0).abs() < 1e-9);

        // No progress yet, or already at the horizon: no estimate.
        assert!(run_eta_minutes(first, first, horizon, Duration::from_secs(600)).is_none());
        assert!(run_eta_minutes(first, horizon, horizon, Duration::from_secs(600)).is_none());
    }

    #[test]
    fn replay_run_reads_only_the_cache() {
        let tmp = TempDir::new().unwrap();
        let cache = LocalCache::new(tmp.path());
        cache.init().unwrap();
        cache
            .write_issue("42", "<bug><bug_id>42</bug_id><product>Core</product></bug>", None)
            .unwrap();

        // An unreachable URL proves no network is involved in replay.
        let mut config = SyncConfig::new("https://tracker.invalid/");
        config.replay = true;
        config.cache_dir = tmp.path().to_string_lossy().into_owned();

        let mut store = MemoryStateStore::default();
        let records = SyncOrchestrator::new(&config, &mut store).run().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id(), Some("42"));
        // Replay does not checkpoint; the store is untouched.
        assert!(store.records.is_empty());
    }
}
