//! Output formatting helpers for the CLI

use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table, presets};
use owo_colors::OwoColorize;

use crate::OutputFormat;

/// Style configuration for text output
#[derive(Debug, Clone, Copy)]
pub struct OutputStyle {
    /// Whether to use colors in output
    pub use_color: bool,
}

impl Default for OutputStyle {
    fn default() -> Self {
        Self {
            use_color: std::env::var("NO_COLOR").is_err(),
        }
    }
}

impl OutputStyle {
    /// Style honoring `NO_COLOR` and the `--no-color` flag
    pub fn new(no_color: bool) -> Self {
        let style = Self::default();
        Self {
            use_color: style.use_color && !no_color,
        }
    }
}

/// Format a key-value pair
pub fn format_key_value(key: &str, value: &str, style: OutputStyle) -> String {
    if style.use_color {
        format!("{}: {}", key.cyan(), value)
    } else {
        format!("{key}: {value}")
    }
}

/// Format a success message
pub fn format_success(text: &str, style: OutputStyle) -> String {
    if style.use_color {
        text.green().to_string()
    } else {
        text.to_string()
    }
}

/// Format a warning message
pub fn format_warning(text: &str, style: OutputStyle) -> String {
    if style.use_color {
        text.yellow().to_string()
    } else {
        text.to_string()
    }
}

/// Format a file path
pub fn format_path(path: &str, style: OutputStyle) -> String {
    if style.use_color {
        path.bright_magenta().to_string()
    } else {
        path.to_string()
    }
}

/// Format a byte count as exact bytes plus a human-readable size
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{bytes} B ({value:.2} {})", UNITS[unit])
}

/// Create a bordered table
pub fn create_table(style: OutputStyle) -> Table {
    let mut table = Table::new();
    if style.use_color {
        table
            .load_preset(presets::UTF8_FULL)
            .apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
    } else {
        table.load_preset(presets::ASCII_FULL);
    }
    table
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(140);
    table
}

/// Style a table header cell
pub fn header_cell(text: &str, style: OutputStyle) -> Cell {
    let cell = Cell::new(text)
        .add_attribute(Attribute::Bold)
        .set_alignment(CellAlignment::Left);
    if style.use_color {
        cell.fg(Color::Cyan)
    } else {
        cell
    }
}

/// Style a regular cell
pub fn regular_cell(text: &str) -> Cell {
    Cell::new(text).set_alignment(CellAlignment::Left)
}

/// Style a numeric cell (right-aligned)
pub fn numeric_cell(text: &str) -> Cell {
    Cell::new(text).set_alignment(CellAlignment::Right)
}

/// Print a section header
pub fn print_section_header(title: &str, style: OutputStyle) {
    if style.use_color {
        println!("\n{}", title.bold().bright_blue());
        println!("{}", "═".repeat(title.len()).bright_blue());
    } else {
        println!("\n{title}");
        println!("{}", "=".repeat(title.len()));
    }
}

/// Print a subsection header
pub fn print_subsection_header(title: &str, style: OutputStyle) {
    if style.use_color {
        println!("\n{}", title.cyan());
        println!("{}", "─".repeat(title.len()).cyan());
    } else {
        println!("\n{title}");
        println!("{}", "-".repeat(title.len()));
    }
}

/// Format a count badge, e.g. "(3 entries)"
pub fn format_count_badge(count: usize, singular: &str, plural: &str, style: OutputStyle) -> String {
    let text = if count == 1 {
        format!("({count} {singular})")
    } else {
        format!("({count} {plural})")
    };
    if style.use_color {
        text.dimmed().to_string()
    } else {
        text
    }
}

/// Print a JSON document in the requested JSON flavor
pub fn print_json(value: &serde_json::Value, format: OutputFormat) -> serde_json::Result<()> {
    let output = if format == OutputFormat::JsonPretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{output}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1536), "1536 B (1.50 KiB)");
        assert_eq!(format_size(3 * 1024 * 1024), "3145728 B (3.00 MiB)");
    }

    #[test]
    fn test_plain_style() {
        let style = OutputStyle::new(true);
        assert!(!style.use_color);
        assert_eq!(format_key_value("Version", "7", style), "Version: 7");
        assert_eq!(format_count_badge(1, "entry", "entries", style), "(1 entry)");
        assert_eq!(format_count_badge(3, "entry", "entries", style), "(3 entries)");
    }
}
