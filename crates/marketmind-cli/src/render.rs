//! Terminal tables for section lists and search results

use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use marketmind::{DisplayRow, SearchResults, SectionList};
use std::fmt::Write;

const TRACKED_MARK: &str = "✓";

fn new_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.to_vec());
    table
}

fn tracked(row: &DisplayRow) -> &'static str {
    if row.already_tracked { TRACKED_MARK } else { "" }
}

/// Render every section with 1-based numbering usable by `/link`
pub fn section_list(list: &SectionList) -> String {
    let status = if list.loading { " (loading…)" } else { "" };
    let mut out = format!("{}{status}\n", list.symbol);

    for (s, section) in list.sections.iter().enumerate() {
        let mut table = new_table(&["#", "Title", "Detail", "Link", "Tracked"]);
        for (r, row) in section.rows.iter().enumerate() {
            table.add_row(vec![
                (r + 1).to_string(),
                row.title.clone().unwrap_or_else(|| "-".to_string()),
                row.detail_text().unwrap_or_default().to_string(),
                row.url.as_ref().map(ToString::to_string).unwrap_or_default(),
                tracked(row).to_string(),
            ]);
        }
        let _ = write!(out, "\n{}. {}\n{table}\n", s + 1, section.header);
    }
    out
}

/// Render search results with 1-based numbering usable by `/add`
pub fn search_results(results: &SearchResults) -> String {
    if results.rows.is_empty() {
        return format!("{}\n  (no matches)\n", results.header);
    }

    let mut table = new_table(&["#", "Symbol", "Name", "Tracked"]);
    for (i, row) in results.rows.iter().enumerate() {
        table.add_row(vec![
            (i + 1).to_string(),
            row.title.clone().unwrap_or_default(),
            row.subtitle.clone().unwrap_or_default(),
            tracked(row).to_string(),
        ]);
    }
    format!("{}\n{table}\n", results.header)
}
