//! Table-to-markdown conversion (§4.1 step 2).

use crate::raw::{ColumnAlignment, TableData};

fn escape_cell(cell: &str) -> String {
    cell.replace('\\', "\\\\").replace('|', "\\|").replace('\n', "<br>")
}

fn alignment_marker(alignment: ColumnAlignment) -> &'static str {
    match alignment {
        ColumnAlignment::Left => ":---",
        ColumnAlignment::Right => "---:",
        ColumnAlignment::Center => ":---:",
        ColumnAlignment::Justify | ColumnAlignment::None => "---",
    }
}

/// Render a `TableData` as a markdown table. A confidence below 0.7
/// attaches an HTML comment flagging the table for verification.
pub fn table_to_markdown(table: &TableData) -> String {
    if table.cells.is_empty() {
        return String::new();
    }

    let col_count = table.cells.iter().map(|r| r.len()).max().unwrap_or(0);
    if col_count == 0 {
        return String::new();
    }

    let mut out = String::new();

    let header: Vec<String> = if table.has_header {
        table.cells[0].clone()
    } else {
        (1..=col_count).map(|i| format!("Col{}", i)).collect()
    };

    out.push_str("| ");
    out.push_str(
        &(0..col_count)
            .map(|i| escape_cell(header.get(i).map(|s| s.as_str()).unwrap_or("")))
            .collect::<Vec<_>>()
            .join(" | "),
    );
    out.push_str(" |\n|");
    for i in 0..col_count {
        let alignment = table
            .column_alignments
            .get(i)
            .copied()
            .unwrap_or(ColumnAlignment::None);
        out.push_str(alignment_marker(alignment));
        out.push('|');
    }
    out.push('\n');

    let data_rows = if table.has_header {
        &table.cells[1..]
    } else {
        &table.cells[..]
    };
    for row in data_rows {
        out.push_str("| ");
        out.push_str(
            &(0..col_count)
                .map(|i| escape_cell(row.get(i).map(|s| s.as_str()).unwrap_or("")))
                .collect::<Vec<_>>()
                .join(" | "),
        );
        out.push_str(" |\n");
    }

    if table.confidence < 0.7 {
        out.push_str(&format!(
            "<!-- Table confidence: {:.2} — may need verification -->\n",
            table.confidence
        ));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_header_and_alignment_row() {
        let table = TableData::new(
            vec![
                vec!["Name".into(), "Age".into()],
                vec!["Alice".into(), "30".into()],
            ],
            true,
            0.95,
        );
        let md = table_to_markdown(&table);
        assert!(md.starts_with("| Name | Age |\n"));
        assert!(md.contains("|---|---|\n") || md.contains("|---|---|"));
        assert!(md.contains("| Alice | 30 |"));
        assert!(!md.contains("confidence"));
    }

    #[test]
    fn low_confidence_adds_comment() {
        let table = TableData::new(vec![vec!["a".into()]], false, 0.4);
        let md = table_to_markdown(&table);
        assert!(md.contains("Table confidence: 0.40"));
    }

    #[test]
    fn escapes_pipes_and_newlines() {
        let table = TableData::new(vec![vec!["a|b".into(), "c\nd".into()]], false, 0.9);
        let md = table_to_markdown(&table);
        assert!(md.contains("a\\|b"));
        assert!(md.contains("c<br>d"));
    }

    #[test]
    fn missing_header_gets_generated_columns() {
        let table = TableData::new(vec![vec!["x".into(), "y".into()]], false, 0.9);
        let md = table_to_markdown(&table);
        assert!(md.starts_with("| Col1 | Col2 |"));
    }
}
