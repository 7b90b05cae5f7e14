use domain::DomainError;
use domain::error::Result;
use domain::printer::{TableColumn, require_range};

use super::text::pad_gbk;

/// Split `line_width` characters across weighted columns. The last column
/// takes whatever rounding left over.
pub fn column_widths(columns: &[TableColumn], line_width: usize) -> Result<Vec<usize>> {
    if columns.is_empty() {
        return Err(DomainError::ContentError("table has no columns".to_string()));
    }
    for column in columns {
        require_range("column weight", column.weight, 1..=100)?;
    }

    let total: usize = columns.iter().map(|c| c.weight as usize).sum();
    let mut widths: Vec<usize> = columns
        .iter()
        .map(|c| line_width * c.weight as usize / total)
        .collect();
    let used: usize = widths[..widths.len() - 1].iter().sum();
    if let Some(last) = widths.last_mut() {
        *last = line_width - used;
    }
    Ok(widths)
}

/// Each column's text fitted to its width
pub fn column_cells(columns: &[TableColumn], line_width: usize) -> Result<Vec<String>> {
    let widths = column_widths(columns, line_width)?;
    Ok(columns
        .iter()
        .zip(widths)
        .map(|(column, width)| pad_gbk(&column.text, width, column.align))
        .collect())
}
