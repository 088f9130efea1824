//! Table output for search results using comfy-table.

use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};

use crate::domain::models::Delta;

/// Render found subsets, one row per subset, with atom labels when known.
pub fn format_subsets(subsets: &[Delta], labels: Option<&[String]>) -> String {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let mut header = vec![
        Cell::new("#").add_attribute(Attribute::Bold),
        Cell::new("Size").add_attribute(Attribute::Bold),
        Cell::new("Atoms").add_attribute(Attribute::Bold),
    ];
    if labels.is_some() {
        header.push(Cell::new("Labels").add_attribute(Attribute::Bold));
    }
    table.set_header(header);

    let colors = console::colors_enabled();
    for (index, subset) in subsets.iter().enumerate() {
        let size = Cell::new(subset.len());
        let size = if colors && subset.len() == 1 {
            size.fg(Color::Green)
        } else {
            size
        };

        let mut row = vec![Cell::new(index + 1), size, Cell::new(subset)];
        if let Some(labels) = labels {
            let names: Vec<&str> = subset
                .atoms()
                .iter()
                .filter_map(|atom| labels.get(atom.index()).map(String::as_str))
                .collect();
            row.push(Cell::new(names.join("\n")));
        }
        table.add_row(row);
    }

    table.to_string()
}
