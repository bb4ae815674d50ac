//! Spreadsheet text via calamine (xlsx and legacy xls)

use calamine::{open_workbook_auto, Data, Reader};
use std::path::Path;

pub fn extract(path: &Path) -> anyhow::Result<String> {
    let mut workbook = open_workbook_auto(path)?;
    let mut sheets = Vec::new();

    for name in workbook.sheet_names() {
        let range = workbook.worksheet_range(&name)?;
        let rows: Vec<Vec<String>> = range
            .rows()
            .map(|row| {
                row.iter()
                    .filter(|cell| !matches!(cell, Data::Empty))
                    .map(|cell| cell.to_string())
                    .collect()
            })
            .collect();

        if let Some(block) = render_sheet(&name, &rows) {
            sheets.push(block);
        }
    }

    Ok(sheets.join("\n\n"))
}

/// `Sheet: <name>` followed by one ` | `-joined line per non-empty row
pub(crate) fn render_sheet(name: &str, rows: &[Vec<String>]) -> Option<String> {
    let lines: Vec<String> = rows
        .iter()
        .filter(|row| !row.is_empty())
        .map(|row| row.join(" | "))
        .collect();

    if lines.is_empty() {
        return None;
    }

    Some(format!("Sheet: {}\n{}", name, lines.join("\n")))
}
