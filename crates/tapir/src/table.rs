//! Column aligned console tables
//!
//! Every cell is padded to the widest cell of its column, columns are
//! separated by two spaces and the last cell of a row is left unpadded.
//! Trailing whitespace is trimmed from each line.

use std::fmt;

/// Gap between columns
const GAP: &str = "  ";

/// A table of text cells with an optional header row
#[derive(Debug, Clone, Default)]
pub struct Table {
    header: Vec<String>,
    show_header: bool,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Table with a header row
    pub fn new<I, S>(header: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            header: header.into_iter().map(Into::into).collect(),
            show_header: true,
            rows: Vec::new(),
        }
    }

    /// Table without a header row
    pub fn headerless() -> Self {
        Self::default()
    }

    /// Show or hide the header row
    pub fn with_header(mut self, show: bool) -> Self {
        self.show_header = show;
        self
    }

    /// Append a row
    ///
    /// Rows may have fewer cells than the header.
    pub fn row<I, S>(&mut self, cells: I)
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        self.rows.push(cells.into_iter().map(|c| c.to_string()).collect());
    }

    fn visible_rows(&self) -> impl Iterator<Item = &Vec<String>> {
        let header = (self.show_header && !self.header.is_empty()).then_some(&self.header);
        header.into_iter().chain(self.rows.iter())
    }

    fn widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = Vec::new();
        for row in self.visible_rows() {
            for (i, cell) in row.iter().enumerate() {
                let len = cell.chars().count();
                match widths.get_mut(i) {
                    Some(w) if *w < len => *w = len,
                    Some(_) => {}
                    None => widths.push(len),
                }
            }
        }
        widths
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let widths = self.widths();
        let mut first = true;

        for row in self.visible_rows() {
            let mut line = String::new();
            for (i, cell) in row.iter().enumerate() {
                if i > 0 {
                    line.push_str(GAP);
                }
                if i + 1 == row.len() {
                    line.push_str(cell);
                } else {
                    line.push_str(&format!("{:width$}", cell, width = widths[i]));
                }
            }

            if !first {
                writeln!(f)?;
            }
            first = false;
            write!(f, "{}", line.trim_end())?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns_padded_to_widest_cell() {
        let mut table = Table::new(["Name", "Bit"]);
        table.row(["newdomain", "1"]);
        table.row(["badip", "16"]);

        assert_eq!(
            table.to_string(),
            "Name       Bit\nnewdomain  1\nbadip      16"
        );
    }

    #[test]
    fn test_hidden_header_does_not_count_for_widths() {
        let mut table = Table::new(["Component name", "Status"]).with_header(false);
        table.row(["config", "ok"]);

        assert_eq!(table.to_string(), "config  ok");
    }

    #[test]
    fn test_short_rows_and_trailing_whitespace() {
        let mut table = Table::new(["Domain", "Tags"]);
        table.row(["ADD: a.example.", "0101"]);
        table.row(["DEL: b.example."]);
        table.row(["c.", ""]);

        let out = table.to_string();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "Domain           Tags");
        assert_eq!(lines[2], "DEL: b.example.");
        assert_eq!(lines[3], "c.");
        assert!(lines.iter().all(|l| !l.ends_with(' ')));
    }

    #[test]
    fn test_headerless_and_empty() {
        assert_eq!(Table::headerless().to_string(), "");

        let mut table = Table::headerless();
        table.row(["x", "y"]);
        assert_eq!(table.to_string(), "x  y");
    }

    #[test]
    fn test_width_counts_chars_not_bytes() {
        let mut table = Table::new(["Name", "Value"]);
        table.row(["åäö", "1"]);
        assert_eq!(table.to_string(), "Name  Value\nåäö   1");
    }
}
