//! In-memory sheet grid: cell text, format overlays, merged ranges and
//! column widths. Layout and styling write here; the writer serializes it.

use std::collections::BTreeMap;

use crate::address::{CellAddress, format_range};
use crate::spec::{RenderError, Result, SpecCellFormat};

/// One stored cell. A cell may carry a format without any text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecGridCell {
    /// Text value; `None` for style-only cells.
    pub value: Option<String>,
    /// Accumulated format overlay.
    pub format: SpecCellFormat,
}

/// Rectangular merged range (inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecMergeRange {
    /// Top-left (anchor) cell.
    pub first: CellAddress,
    /// Bottom-right cell.
    pub last: CellAddress,
}

impl SpecMergeRange {
    /// Whether `addr` lies inside the range.
    pub fn contains(&self, addr: CellAddress) -> bool {
        (self.first.col..=self.last.col).contains(&addr.col)
            && (self.first.row..=self.last.row).contains(&addr.row)
    }

    /// Whether two ranges share at least one cell.
    pub fn overlaps(&self, other: &SpecMergeRange) -> bool {
        self.first.col <= other.last.col
            && other.first.col <= self.last.col
            && self.first.row <= other.last.row
            && other.first.row <= self.last.row
    }
}

/// One laid-out worksheet.
#[derive(Debug, Clone, Default)]
pub struct SheetGrid {
    name: String,
    cells: BTreeMap<(u32, u32), SpecGridCell>,
    merges: Vec<SpecMergeRange>,
    widths: BTreeMap<u32, usize>,
    row_header_end: u32,
}

impl SheetGrid {
    /// Create an empty grid for worksheet `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Worksheet name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Last header row (1-based, 0 before a header is laid out).
    pub fn row_header_end(&self) -> u32 {
        self.row_header_end
    }

    pub(crate) fn set_row_header_end(&mut self, row: u32) {
        self.row_header_end = row;
    }

    /// Set the text of a cell, keeping its format.
    pub fn write_value(&mut self, addr: CellAddress, value: impl Into<String>) {
        self.cells.entry((addr.row, addr.col)).or_default().value = Some(value.into());
    }

    /// Overlay `patch` onto the format of a cell, creating it when missing.
    pub fn update_format(&mut self, addr: CellAddress, patch: &SpecCellFormat) {
        let cell = self.cells.entry((addr.row, addr.col)).or_default();
        cell.format = cell.format.merge(patch);
    }

    /// Stored cell, if any.
    pub fn cell(&self, addr: CellAddress) -> Option<&SpecGridCell> {
        self.cells.get(&(addr.row, addr.col))
    }

    /// Own text of a cell (merged-away cells have none).
    pub fn value(&self, addr: CellAddress) -> Option<&str> {
        self.cell(addr).and_then(|cell| cell.value.as_deref())
    }

    /// Displayed text: the anchor's text for cells inside a merged range.
    #[cfg(test)]
    pub(crate) fn display_value(&self, addr: CellAddress) -> Option<&str> {
        match self.merge_containing(addr) {
            Some(merge) => self.value(merge.first),
            None => self.value(addr),
        }
    }

    /// Format of a cell, if any.
    pub fn format(&self, addr: CellAddress) -> Option<&SpecCellFormat> {
        self.cell(addr).map(|cell| &cell.format)
    }

    /// Merge `first..=last`. A single-cell range is a no-op.
    pub fn merge_range(&mut self, first: CellAddress, last: CellAddress) -> Result<()> {
        if first == last {
            return Ok(());
        }
        let merge = SpecMergeRange {
            first: CellAddress::new(first.col.min(last.col), first.row.min(last.row)),
            last: CellAddress::new(first.col.max(last.col), first.row.max(last.row)),
        };
        if self.merges.iter().any(|m| m.overlaps(&merge)) {
            return Err(RenderError::MergeOverlap {
                range: format_range(merge.first, merge.last),
            });
        }
        self.merges.push(merge);
        Ok(())
    }

    /// Merged range covering `addr`, if any.
    pub fn merge_containing(&self, addr: CellAddress) -> Option<&SpecMergeRange> {
        self.merges.iter().find(|m| m.contains(addr))
    }

    /// All merged ranges, in creation order.
    pub fn merges(&self) -> &[SpecMergeRange] {
        &self.merges
    }

    /// Set a column width in character units.
    pub fn set_column_width(&mut self, col: u32, width: usize) {
        self.widths.insert(col, width);
    }

    /// Width of a column, when one was set.
    pub fn column_width(&self, col: u32) -> Option<usize> {
        self.widths.get(&col).copied()
    }

    /// Column widths by zero-based column index.
    pub fn column_widths(&self) -> &BTreeMap<u32, usize> {
        &self.widths
    }

    /// Number of columns touched by cells or merges.
    pub fn width(&self) -> u32 {
        let n_cells = self.cells.keys().map(|(_, col)| col + 1).max().unwrap_or(0);
        let n_merges = self.merges.iter().map(|m| m.last.col + 1).max().unwrap_or(0);
        n_cells.max(n_merges)
    }

    /// Last row touched by cells or merges (0 when empty).
    pub fn height(&self) -> u32 {
        let n_cells = self.cells.keys().map(|(row, _)| *row).max().unwrap_or(0);
        let n_merges = self.merges.iter().map(|m| m.last.row).max().unwrap_or(0);
        n_cells.max(n_merges)
    }

    /// Stored cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (CellAddress, &SpecGridCell)> {
        self.cells
            .iter()
            .map(|((row, col), cell)| (CellAddress::new(*col, *row), cell))
    }

    /// Own texts of one row, from column `A` to [`Self::width`].
    pub fn row_values(&self, row: u32) -> Vec<String> {
        (0..self.width())
            .map(|col| {
                self.value(CellAddress::new(col, row))
                    .unwrap_or_default()
                    .to_string()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> CellAddress {
        s.parse().unwrap()
    }

    #[test]
    fn test_format_overlays_accumulate() {
        let mut grid = SheetGrid::new("s");
        grid.update_format(
            addr("B2"),
            &SpecCellFormat {
                bold: Some(true),
                ..Default::default()
            },
        );
        grid.write_value(addr("B2"), "x");
        grid.update_format(
            addr("B2"),
            &SpecCellFormat {
                align: Some("center".to_string()),
                ..Default::default()
            },
        );

        let cell = grid.cell(addr("B2")).unwrap();
        assert_eq!(cell.value.as_deref(), Some("x"));
        assert_eq!(cell.format.bold, Some(true));
        assert_eq!(cell.format.align.as_deref(), Some("center"));
        assert_eq!(grid.width(), 2);
        assert_eq!(grid.height(), 2);
        assert_eq!(grid.row_values(2), vec!["".to_string(), "x".to_string()]);
    }

    #[test]
    fn test_merge_range_rejects_overlap_and_ignores_single_cell() {
        let mut grid = SheetGrid::new("s");
        grid.write_value(addr("A1"), "TITLE");
        grid.merge_range(addr("A1"), addr("C1")).unwrap();
        grid.merge_range(addr("D4"), addr("D4")).unwrap();
        assert_eq!(grid.merges().len(), 1);

        let err = grid.merge_range(addr("C1"), addr("C3")).unwrap_err();
        assert!(matches!(err, RenderError::MergeOverlap { ref range } if range == "C1:C3"));

        assert_eq!(grid.display_value(addr("B1")), Some("TITLE"));
        assert_eq!(grid.value(addr("B1")), None);
        assert!(grid.merge_containing(addr("A2")).is_none());
    }
}
