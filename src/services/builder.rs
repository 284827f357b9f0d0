//! Canonical issue record construction.
//!
//! Reconciles the three wire formats into one [`IssueRecord`]: the CSV
//! summary line, the XML detail element, and the parsed change-history
//! sequence. XML fields always replace CSV fields for the same issue;
//! change history is additive only.

use std::collections::BTreeMap;

use crate::error::{AppError, Result};
use crate::models::IssueRecord;
use crate::services::changes::{ChangeAliases, ChangeHistoryParser};
use crate::utils::time::to_iso;

/// Fixed column order of the tracker's CSV list output.
const CSV_COLUMNS: [&str; 8] = [
    "bug_id",
    "product",
    "component",
    "assigned_to",
    "bug_status",
    "resolution",
    "short_desc",
    "changeddate",
];

/// Builds canonical issue records from raw CSV, XML and HTML sources.
pub struct IssueRecordBuilder {
    change_parser: ChangeHistoryParser,
}

impl IssueRecordBuilder {
    /// Create a builder with the given change alias tables.
    pub fn new(aliases: ChangeAliases) -> Self {
        Self {
            change_parser: ChangeHistoryParser::new(aliases),
        }
    }

    /// Merge whichever sources exist into one record.
    ///
    /// Construction is idempotent: identical input bytes always produce a
    /// field-identical record.
    pub fn build(
        &self,
        csv_line: Option<&str>,
        issue_xml: Option<roxmltree::Node<'_, '_>>,
        changes_html: Option<&str>,
    ) -> Result<IssueRecord> {
        let mut record = match csv_line {
            Some(line) => self.from_csv_line(line)?,
            None => IssueRecord::default(),
        };

        if let Some(bug) = issue_xml {
            // XML detail replaces the CSV-derived record wholesale.
            record = self.from_xml(bug);

            if let Some(html) = changes_html {
                let id = record.id().unwrap_or_default().to_string();
                record.changes = self.change_parser.parse(&id, html);
            }
        }

        Ok(record)
    }

    /// Decode one CSV list row into a minimal record.
    ///
    /// The upstream CSV uses `"`-quoted fields without consistent escaping,
    /// so `,"` is the field separator and a field ending in `,"` first has
    /// the comma removed. This quirk must stay exactly as is or column
    /// boundaries shift.
    pub fn from_csv_line(&self, line: &str) -> Result<IssueRecord> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return Err(AppError::parse("empty CSV row"));
        }

        let fixed = line.replace(",\",\"", "\",\"");
        let parts: Vec<&str> = fixed.split(",\"").collect();
        if parts.len() != CSV_COLUMNS.len() {
            return Err(AppError::parse(format!(
                "expected {} CSV fields, got {}: {line}",
                CSV_COLUMNS.len(),
                parts.len()
            )));
        }

        let mut record = IssueRecord::default();
        for (i, (column, raw)) in CSV_COLUMNS.iter().zip(parts).enumerate() {
            let mut value = raw.strip_suffix('"').unwrap_or(raw);
            if i == 0 {
                value = value.strip_prefix('"').unwrap_or(value);
            }

            if *column == "changeddate" {
                let iso = to_iso(value).ok_or_else(|| {
                    AppError::parse(format!("unparseable change date '{value}': {line}"))
                })?;
                record.fields.insert("changeddate_date".to_string(), iso);
            }
            record.fields.insert(column.to_string(), value.to_string());
        }

        Ok(record)
    }

    /// Walk one issue's XML detail element into a full record.
    ///
    /// Every immediate child becomes a scalar field keyed by its tag name,
    /// except the repeating `long_desc` child which accumulates into a list
    /// of sub-records. Reporter and assignee elements additionally yield a
    /// `<tag>_name` field from their `name` attribute.
    pub fn from_xml(&self, bug: roxmltree::Node<'_, '_>) -> IssueRecord {
        let mut record = IssueRecord::default();

        for field in bug.children().filter(roxmltree::Node::is_element) {
            let tag = field.tag_name().name();

            if tag == "long_desc" {
                let mut desc = BTreeMap::new();
                for dfield in field.children().filter(roxmltree::Node::is_element) {
                    desc.insert(
                        dfield.tag_name().name().to_string(),
                        dfield.text().unwrap_or_default().to_string(),
                    );
                }
                record.long_desc.push(desc);
                continue;
            }

            let text = field.text().unwrap_or_default().to_string();
            if tag == "delta_ts" {
                if let Some(iso) = to_iso(&text) {
                    record.fields.insert("delta_ts_date".to_string(), iso);
                }
            }
            if matches!(tag, "reporter" | "assigned_to") {
                if let Some(name) = field.attribute("name") {
                    record
                        .fields
                        .insert(format!("{tag}_name"), name.to_string());
                }
            }
            record.fields.insert(tag.to_string(), text);
        }

        record
    }
}

impl Default for IssueRecordBuilder {
    fn default() -> Self {
        Self::new(ChangeAliases::default())
    }
}
