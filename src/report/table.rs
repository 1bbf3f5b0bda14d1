//! Minimal console table renderer.
//!
//! Cells are padded on their plain text and colored afterwards, keeping
//! ANSI escapes out of the width calculation. CJK characters count as two
//! columns so the Chinese headers line up with ASCII cell values.

use colored::Colorize;

/// Cell color.
#[derive(Debug, Clone, Copy)]
pub enum Tint {
    /// Green — requirement satisfied.
    Green,
    /// Red — requirement failed or data invalid.
    Red,
    /// Yellow — borderline values and stars.
    Yellow,
}

/// One table cell: plain text plus an optional tint.
pub struct Cell {
    text: String,
    tint: Option<Tint>,
}

impl Cell {
    /// An uncolored cell.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tint: None,
        }
    }

    /// A colored cell.
    pub fn tinted(text: impl Into<String>, tint: Tint) -> Self {
        Self {
            text: text.into(),
            tint: Some(tint),
        }
    }
}

/// A bordered table with a header row.
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Creates a table with the given header labels.
    pub fn new(headers: Vec<&str>) -> Self {
        Self {
            headers: headers.into_iter().map(str::to_string).collect(),
            rows: Vec::new(),
        }
    }

    /// Appends one row; short rows are padded with empty cells.
    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        while row.len() < self.headers.len() {
            row.push(Cell::plain(""));
        }
        self.rows.push(row);
    }

    /// Renders the table with `+-` borders.
    pub fn render(&self) -> String {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| display_width(h)).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate().take(widths.len()) {
                widths[i] = widths[i].max(display_width(&cell.text));
            }
        }

        let border: String = {
            let mut s = String::from("+");
            for width in &widths {
                s.push_str(&"-".repeat(width + 2));
                s.push('+');
            }
            s.push('\n');
            s
        };

        let mut output = border.clone();
        output.push('|');
        for (header, width) in self.headers.iter().zip(&widths) {
            output.push_str(&format!(" {} |", pad_center(header, *width)));
        }
        output.push('\n');
        output.push_str(&border);

        for row in &self.rows {
            output.push('|');
            for (cell, width) in row.iter().zip(&widths) {
                let padded = pad_center(&cell.text, *width);
                let rendered = match cell.tint {
                    Some(Tint::Green) => padded.green().to_string(),
                    Some(Tint::Red) => padded.red().to_string(),
                    Some(Tint::Yellow) => padded.yellow().to_string(),
                    None => padded,
                };
                output.push_str(&format!(" {rendered} |"));
            }
            output.push('\n');
            output.push_str(&border);
        }

        output
    }
}

/// Approximate terminal width: ASCII counts one column, everything else two.
fn display_width(text: &str) -> usize {
    text.chars().map(|c| if c.is_ascii() { 1 } else { 2 }).sum()
}

fn pad_center(text: &str, width: usize) -> String {
    let text_width = display_width(text);
    if text_width >= width {
        return text.to_string();
    }
    let left = (width - text_width) / 2;
    let right = width - text_width - left;
    format!("{}{}{}", " ".repeat(left), text, " ".repeat(right))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_width_counts_cjk_double() {
        assert_eq!(display_width("abc"), 3);
        assert_eq!(display_width("域名"), 4);
        assert_eq!(display_width("a域"), 3);
    }

    #[test]
    fn test_render_aligns_columns() {
        colored::control::set_override(false);
        let mut table = Table::new(vec!["域名", "状态"]);
        table.push_row(vec![Cell::plain("a.example"), Cell::tinted("✓", Tint::Green)]);
        let rendered = table.render();

        let lines: Vec<&str> = rendered.lines().collect();
        // border, header, border, row, border
        assert_eq!(lines.len(), 5);
        let border_len = lines[0].len();
        assert!(lines.iter().step_by(2).all(|l| l.len() == border_len));
    }

    #[test]
    fn test_short_rows_are_padded() {
        let mut table = Table::new(vec!["a", "b", "c"]);
        table.push_row(vec![Cell::plain("only")]);
        let rendered = table.render();
        assert!(rendered.contains("only"));
    }
}
