//! Detail batch fetching.
//!
//! One round trip retrieves the XML detail for a whole batch of issue ids;
//! at `change` detail each issue costs one extra request for its
//! change-history page (served from the local cache when already present).

use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;

use crate::config::DetailLevel;
use crate::error::Result;
use crate::models::IssueRecord;
use crate::services::builder::IssueRecordBuilder;
use crate::storage::LocalCache;
use crate::utils::http::fetch_text;

/// Fetches full detail for batches of issue ids.
pub struct BatchFetcher<'a> {
    client: &'a Client,
    domain: &'a str,
    detail: DetailLevel,
    delay: Duration,
    builder: &'a IssueRecordBuilder,
    cache: Option<&'a LocalCache>,
}

impl<'a> BatchFetcher<'a> {
    pub fn new(
        client: &'a Client,
        domain: &'a str,
        detail: DetailLevel,
        delay: Duration,
        builder: &'a IssueRecordBuilder,
        cache: Option<&'a LocalCache>,
    ) -> Self {
        Self {
            client,
            domain,
            detail,
            delay,
            builder,
            cache,
        }
    }

    /// Retrieve and build canonical records for one batch of ids.
    ///
    /// The raw XML slice and change HTML for each issue are written to the
    /// local cache as they are processed.
    pub fn fetch_batch(&self, ids: &[String]) -> Result<Vec<IssueRecord>> {
        let url = detail_url(self.domain, ids);
        log::debug!("Batch url {url}");

        let body = fetch_text(self.client, &url)?;
        let doc = roxmltree::Document::parse(&body)?;

        let mut records = Vec::with_capacity(ids.len());
        for bug in doc.root_element().children().filter(roxmltree::Node::is_element) {
            let issue_id = bug
                .children()
                .find(|n| n.tag_name().name() == "bug_id")
                .and_then(|n| n.text())
                .unwrap_or_default()
                .to_string();

            let changes_html = if self.detail == DetailLevel::Change {
                Some(self.fetch_changes_html(&issue_id)?)
            } else {
                None
            };

            let record = self.builder.build(None, Some(bug), changes_html.as_deref())?;

            if let Some(cache) = self.cache {
                let raw_xml = &body[bug.range()];
                cache.write_issue(&issue_id, raw_xml, changes_html.as_deref())?;
            }

            records.push(record);
        }

        Ok(records)
    }

    /// One issue's change-history HTML, from the local cache if present,
    /// otherwise from the tracker.
    fn fetch_changes_html(&self, issue_id: &str) -> Result<String> {
        if let Some(cache) = self.cache {
            if let Some(html) = cache.cached_changes(issue_id) {
                log::debug!("Cache changes for {issue_id} found");
                return Ok(html);
            }
        }

        let activity_url = format!("{}show_activity.cgi?id={issue_id}", self.domain);
        log::debug!("Getting changes for issue {issue_id} from {activity_url}");
        let html = fetch_text(self.client, &activity_url)?;

        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        Ok(html)
    }
}

/// Build the detail URL embedding every id in the batch, XML output,
/// attachment payloads excluded.
fn detail_url(domain: &str, ids: &[String]) -> String {
    let mut url = format!("{domain}show_bug.cgi?");
    for id in ids {
        url.push_str("id=");
        url.push_str(id);
        url.push('&');
    }
    url.push_str("ctype=xml&excludefield=attachmentdata");
    url
}
