//! List discovery: the CSV phase.
//!
//! One list page bounded by the current watermark yields the ids of the
//! issues changed since it, in the order the server returned them
//! (oldest-first, which the watermark-advance protocol relies on).

use reqwest::blocking::Client;

use crate::error::Result;
use crate::models::IssueRecord;
use crate::services::builder::IssueRecordBuilder;
use crate::services::dialect::Dialect;
use crate::storage::LocalCache;
use crate::utils::http::fetch_text;

/// One decoded CSV list page.
#[derive(Debug, Default)]
pub struct ListPage {
    /// `(issue_id, raw change timestamp)` pairs in server order
    pub ids: Vec<(String, String)>,

    /// CSV-derived minimal records, one per valid row
    pub records: Vec<IssueRecord>,

    /// Raw data rows as received, for the list-page cache
    pub raw_lines: Vec<String>,
}

impl ListPage {
    /// Change timestamp of the last row; the next watermark value.
    pub fn last_change_ts(&self) -> Option<&str> {
        self.ids.last().map(|(_, ts)| ts.as_str())
    }
}

/// Fetches and decodes watermark-bounded CSV list pages.
pub struct ListFetcher<'a> {
    client: &'a Client,
    base_url: &'a str,
    dialect: Dialect,
}

impl<'a> ListFetcher<'a> {
    pub fn new(client: &'a Client, base_url: &'a str, dialect: Dialect) -> Self {
        Self {
            client,
            base_url,
            dialect,
        }
    }

    /// Fetch one list page bounded by the watermark.
    ///
    /// When a cache is given, the raw page plus its final-row timestamp is
    /// appended to the list-page cache before returning.
    pub fn fetch(
        &self,
        builder: &IssueRecordBuilder,
        watermark: Option<&str>,
        cache: Option<&LocalCache>,
    ) -> Result<ListPage> {
        log::info!("Getting issues list ...");
        let url = self.dialect.list_url(self.base_url, watermark)?;
        log::info!("List url {url}");

        let body = fetch_text(self.client, &url)?;
        let page = parse_list_body(&body, builder);

        if let Some(cache) = cache {
            if let Some(last) = page.last_change_ts() {
                cache.append_list_page(last, &page.raw_lines)?;
            }
        }

        Ok(page)
    }
}

/// Decode a CSV list body: header discarded, one issue per data row.
///
/// A malformed row is logged and dropped; the rest of the page is still
/// processed.
pub fn parse_list_body(body: &str, builder: &IssueRecordBuilder) -> ListPage {
    let mut page = ListPage::default();

    for line in body.lines().skip(1) {
        if line.trim().is_empty() {
            continue;
        }
        page.raw_lines.push(line.to_string());

        match builder.from_csv_line(line) {
            Ok(record) => {
                let id = record.id().unwrap_or_default().to_string();
                let ts = record.field("changeddate").unwrap_or_default().to_string();
                page.ids.push((id, ts));
                page.records.push(record);
            }
            Err(e) => {
                log::error!("Error parsing CSV line: {e}");
                log::error!("{line}");
            }
        }
    }

    page
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = concat!(
        "bug_id,product,component,assigned_to,bug_status,resolution,short_desc,changeddate\n",
        "\"1\",\"Core\",\"UI\",\"alice\",\"NEW\",\"\",\"first\",\"2020-01-01 10:00:00\"\n",
        "\"2\",\"Core\",\"UI\",\"bob\",\"NEW\",\"\",\"second\",\"2020-01-02 11:00:00\"\n",
    );

    #[test]
    fn rows_decode_in_server_order() {
        let page = parse_list_body(PAGE, &IssueRecordBuilder::default());
        assert_eq!(
            page.ids,
            vec![
                ("1".to_string(), "2020-01-01 10:00:00".to_string()),
                ("2".to_string(), "2020-01-02 11:00:00".to_string()),
            ]
        );
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.last_change_ts(), Some("2020-01-02 11:00:00"));
    }

    #[test]
    fn malformed_row_is_dropped_not_fatal() {
        let body = concat!(
            "bug_id,product,component,assigned_to,bug_status,resolution,short_desc,changeddate\n",
            "mangled row without separators\n",
            "\"2\",\"Core\",\"UI\",\"bob\",\"NEW\",\"\",\"second\",\"2020-01-02 11:00:00\"\n",
        );
        let page = parse_list_body(body, &IssueRecordBuilder::default());
        assert_eq!(page.ids.len(), 1);
        assert_eq!(page.ids[0].0, "2");
        // The raw page keeps every data row, valid or not.
        assert_eq!(page.raw_lines.len(), 2);
    }

    #[test]
    fn empty_page_has_no_rows() {
        let body = "bug_id,product,component,assigned_to,bug_status,resolution,short_desc,changeddate\n";
        let page = parse_list_body(body, &IssueRecordBuilder::default());
        assert!(page.ids.is_empty());
        assert!(page.last_change_ts().is_none());
    }
}
