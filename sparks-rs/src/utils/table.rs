//! Emitter table helpers

use prettytable::{Cell, Row, Table};

/// Table with bold column titles and no separators between rows
pub fn create_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table.set_format(*prettytable::format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
    table.set_titles(Row::new(
        headers
            .iter()
            .map(|title| Cell::new(title).style_spec("b"))
            .collect(),
    ));
    table
}

/// Append a row; counts and durations are right-aligned
pub fn add_table_row(table: &mut Table, cells: Vec<String>) {
    let row = cells
        .iter()
        .map(|text| {
            let cell = Cell::new(text);
            if is_numeric(text) {
                cell.style_spec("r")
            } else {
                cell
            }
        })
        .collect();
    table.add_row(Row::new(row));
}

fn is_numeric(text: &str) -> bool {
    let trimmed = text.trim_end_matches('s');
    !trimmed.is_empty()
        && trimmed
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-'))
}
