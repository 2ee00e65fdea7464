use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color as TableColor, ContentArrangement, Table};

/// Rounded UTF-8 table with a cyan header row.
pub fn create_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            header
                .iter()
                .map(|label| Cell::new(*label).fg(TableColor::Cyan)),
        );
    table
}

pub fn unavailable_cell() -> Cell {
    Cell::new("N/A").fg(TableColor::DarkGrey)
}

/// Green above 95%, yellow from 80%, red below.
pub fn color_coded_success_cell(rate: f64) -> Cell {
    let text = format!("{rate:.1}%");
    let color = if rate > 95.0 {
        TableColor::Green
    } else if rate >= 80.0 {
        TableColor::Yellow
    } else {
        TableColor::Red
    };
    Cell::new(text).fg(color)
}
