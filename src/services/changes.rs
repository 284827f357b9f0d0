//! Change-history HTML parser.
//!
//! A tracker's activity page carries the change table among assorted
//! boilerplate tables. The activity table is identified by its header row
//! having exactly five header cells: changed-by, date, field, removed,
//! added. Consecutive changes by the same actor are rendered without
//! repeating the first two columns, so short rows inherit the actor and
//! date of the last full row.

use std::collections::BTreeMap;

use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};

use crate::models::Change;
use crate::utils::time::to_iso;

/// Alias tables used to canonicalize change fields and values.
///
/// Passed in at construction; an empty value map passes everything through
/// verbatim.
#[derive(Debug, Clone)]
pub struct ChangeAliases {
    /// Display label to canonical field name (`Status` -> `status`)
    pub field_map: BTreeMap<String, String>,

    /// Value aliases applied when the canonical field is `status`
    pub status_map: BTreeMap<String, String>,

    /// Value aliases applied when the canonical field is `resolution`
    pub resolution_map: BTreeMap<String, String>,
}

impl Default for ChangeAliases {
    fn default() -> Self {
        let mut field_map = BTreeMap::new();
        field_map.insert("Status".to_string(), "status".to_string());
        field_map.insert("Resolution".to_string(), "resolution".to_string());
        Self {
            field_map,
            status_map: BTreeMap::new(),
            resolution_map: BTreeMap::new(),
        }
    }
}

/// Parses one issue's change-history page into an ordered change list.
pub struct ChangeHistoryParser {
    aliases: ChangeAliases,
    table_sel: Selector,
    tr_sel: Selector,
}

impl ChangeHistoryParser {
    /// Create a parser with the given alias tables.
    pub fn new(aliases: ChangeAliases) -> Self {
        Self {
            aliases,
            table_sel: Selector::parse("table").expect("static selector"),
            tr_sel: Selector::parse("tr").expect("static selector"),
        }
    }

    /// Parse the change table out of an activity page.
    ///
    /// A page without a recognizable five-column table yields an empty
    /// list: the issue simply has no recorded changes.
    pub fn parse(&self, issue_id: &str, html: &str) -> Vec<Change> {
        let document = Html::parse_document(html);
        let mut changes = Vec::new();

        let Some(table) = self.find_activity_table(&document) else {
            log::debug!("Issue {issue_id}: no activity table found");
            return changes;
        };

        // Actor and date of the last full row, for continuation rows.
        let mut current: Option<(String, String)> = None;

        for row in table.select(&self.tr_sel).skip(1) {
            let cells = direct_children(&row, "td");

            let (changed_by, date, field_cell, removed_cell, added_cell) = if cells.len() == 5 {
                let changed_by = cell_value(&cells[0]).replace("&#64;", "@");
                let raw_date = cell_value(&cells[1]);
                let Some(date) = to_iso(&raw_date) else {
                    log::warn!("Issue {issue_id}: unparseable change date '{raw_date}', row skipped");
                    // The skipped row's continuation rows must not inherit
                    // the previous actor; quarantine the whole block.
                    current = None;
                    continue;
                };
                current = Some((changed_by.clone(), date.clone()));
                (changed_by, date, &cells[2], &cells[3], &cells[4])
            } else if cells.len() >= 3 {
                let Some((changed_by, date)) = current.clone() else {
                    log::warn!("Issue {issue_id}: continuation row before any full row, skipped");
                    continue;
                };
                (changed_by, date, &cells[0], &cells[1], &cells[2])
            } else {
                continue;
            };

            let (field, removed, added) = self.canonicalize(
                cell_label(field_cell),
                cell_value(removed_cell),
                cell_value(added_cell),
            );

            changes.push(Change {
                changed_by,
                field,
                removed,
                added,
                date,
            });
        }

        changes
    }

    /// First table whose header row has exactly five header cells.
    fn find_activity_table<'a>(&self, document: &'a Html) -> Option<ElementRef<'a>> {
        document.select(&self.table_sel).find(|table| {
            table
                .select(&self.tr_sel)
                .next()
                .is_some_and(|header| direct_children(&header, "th").len() == 5)
        })
    }

    /// Normalize a field label and, for status/resolution, its values.
    fn canonicalize(
        &self,
        field: String,
        removed: String,
        added: String,
    ) -> (String, String, String) {
        let field = self
            .aliases
            .field_map
            .get(&field)
            .cloned()
            .unwrap_or(field);

        let alias = |map: &BTreeMap<String, String>, value: String| {
            map.get(&value).cloned().unwrap_or(value)
        };
        let (removed, added) = match field.as_str() {
            "status" => (
                alias(&self.aliases.status_map, removed),
                alias(&self.aliases.status_map, added),
            ),
            "resolution" => (
                alias(&self.aliases.resolution_map, removed),
                alias(&self.aliases.resolution_map, added),
            ),
            _ => (removed, added),
        };

        (field, removed, added)
    }
}

/// Direct element children of a row with the given tag name.
fn direct_children<'a>(row: &ElementRef<'a>, name: &str) -> Vec<ElementRef<'a>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == name)
        .collect()
}

/// Top-level text fragments of a cell.
///
/// Inline markup (anchor, span, italic) is flattened to its text content so
/// link and formatting wrappers never leak into field values; comment nodes
/// are dropped. Whitespace-only fragments are discarded.
fn cell_fragments(cell: &ElementRef) -> Vec<String> {
    let mut fragments = Vec::new();
    for child in cell.children() {
        let text = match child.value() {
            Node::Text(text) => text.to_string(),
            Node::Element(_) => match ElementRef::wrap(child) {
                Some(el) => el.text().collect::<String>(),
                None => continue,
            },
            _ => continue,
        };
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            fragments.push(trimmed.to_string());
        }
    }
    fragments
}

/// Single-value cell: the first non-empty fragment.
fn cell_value(cell: &ElementRef) -> String {
    cell_fragments(cell).into_iter().next().unwrap_or_default()
}

/// Field-label cell: multiple fragments (seen for attachment flags, e.g.
/// `"Attachment #123" "Flag"`) are joined with a single space so the
/// compound label survives; newlines never survive the join.
fn cell_label(cell: &ElementRef) -> String {
    cell_fragments(cell)
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> ChangeHistoryParser {
        ChangeHistoryParser::new(ChangeAliases::default())
    }

    fn activity_page(rows: &str) -> String {
        format!(
            r#"<html><body>
            <!-- page chrome -->
            <table><tr><th>Nav</th><th>Links</th></tr></table>
            <table>
              <tr><th>Who</th><th>When</th><th>What</th><th>Removed</th><th>Added</th></tr>
              {rows}
            </table>
            </body></html>"#
        )
    }

    #[test]
    fn parses_five_column_row() {
        let html = activity_page(
            "<tr><td>alice</td><td>2021-03-01 12:00:00</td>\
             <td>Status</td><td>NEW</td><td>ASSIGNED</td></tr>",
        );
        let changes = parser().parse("1", &html);
        assert_eq!(
            changes,
            vec![Change {
                changed_by: "alice".into(),
                field: "status".into(),
                removed: "NEW".into(),
                added: "ASSIGNED".into(),
                date: "2021-03-01T12:00:00".into(),
            }]
        );
    }

    #[test]
    fn continuation_row_inherits_actor_and_date() {
        let html = activity_page(
            "<tr><td>alice</td><td>2021-03-01 12:00:00</td>\
             <td>Status</td><td>NEW</td><td>ASSIGNED</td></tr>\
             <tr><td>Resolution</td><td></td><td>FIXED</td></tr>",
        );
        let changes = parser().parse("1", &html);
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[1].changed_by, "alice");
        assert_eq!(changes[1].date, "2021-03-01T12:00:00");
        assert_eq!(changes[1].field, "resolution");
        assert_eq!(changes[1].removed, "");
        assert_eq!(changes[1].added, "FIXED");
    }

    #[test]
    fn no_five_column_table_yields_empty_list() {
        let html = "<html><body><table><tr><th>a</th><th>b</th></tr>\
                    <tr><td>1</td><td>2</td></tr></table></body></html>";
        assert!(parser().parse("1", html).is_empty());
    }

    #[test]
    fn inline_markup_is_flattened_to_text() {
        let html = activity_page(
            "<tr><td><a href=\"mailto:x\">bob</a></td><td>2021-03-02 08:15:00</td>\
             <td><i>Priority</i></td><td><span>P3</span></td><td>P1</td></tr>",
        );
        let changes = parser().parse("1", &html);
        assert_eq!(changes[0].changed_by, "bob");
        assert_eq!(changes[0].field, "Priority");
        assert_eq!(changes[0].removed, "P3");
        assert_eq!(changes[0].added, "P1");
    }

    #[test]
    fn compound_field_label_is_joined() {
        let html = activity_page(
            "<tr><td>carol</td><td>2021-03-03 09:00:00</td>\
             <td>\n Attachment #12723\n <span>Flag</span>\n</td>\
             <td></td><td>review?</td></tr>",
        );
        let changes = parser().parse("1", &html);
        assert_eq!(changes[0].field, "Attachment #12723 Flag");
    }

    #[test]
    fn escaped_at_sign_is_restored() {
        let html = activity_page(
            "<tr><td>dave&amp;#64;example.org</td><td>2021-03-04 10:00:00</td>\
             <td>CC</td><td></td><td>erin</td></tr>",
        );
        let changes = parser().parse("1", &html);
        assert_eq!(changes[0].changed_by, "dave@example.org");
    }

    #[test]
    fn comment_nodes_are_ignored() {
        let html = activity_page(
            "<tr><td><!-- hidden -->alice</td><td>2021-03-01 12:00:00</td>\
             <td>Status</td><td>NEW</td><td>ASSIGNED</td></tr>",
        );
        let changes = parser().parse("1", &html);
        assert_eq!(changes[0].changed_by, "alice");
    }

    #[test]
    fn custom_value_aliases_apply_to_status() {
        let mut aliases = ChangeAliases::default();
        aliases
            .status_map
            .insert("ASSIGNED".to_string(), "IN_PROGRESS".to_string());
        let html = activity_page(
            "<tr><td>alice</td><td>2021-03-01 12:00:00</td>\
             <td>Status</td><td>NEW</td><td>ASSIGNED</td></tr>",
        );
        let changes = ChangeHistoryParser::new(aliases).parse("1", &html);
        assert_eq!(changes[0].added, "IN_PROGRESS");
    }

    #[test]
    fn continuation_after_skipped_row_is_not_misattributed() {
        // The continuation row belongs to mallory's skipped block; it must
        // not be attributed to alice.
        let html = activity_page(
            "<tr><td>alice</td><td>2021-03-01 12:00:00</td>\
             <td>Status</td><td>NEW</td><td>ASSIGNED</td></tr>\
             <tr><td>mallory</td><td>not a date</td>\
             <td>Status</td><td>ASSIGNED</td><td>RESOLVED</td></tr>\
             <tr><td>Resolution</td><td></td><td>FIXED</td></tr>",
        );
        let changes = parser().parse("1", &html);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].changed_by, "alice");
        assert_eq!(changes[0].field, "status");
    }

    #[test]
    fn unparseable_date_skips_row_only() {
        let html = activity_page(
            "<tr><td>alice</td><td>yesterday</td>\
             <td>Status</td><td>NEW</td><td>ASSIGNED</td></tr>\
             <tr><td>bob</td><td>2021-03-05 11:00:00</td>\
             <td>CC</td><td></td><td>erin</td></tr>",
        );
        let changes = parser().parse("1", &html);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].changed_by, "bob");
    }
}
