//! Post-layout presentation pass: header emphasis, vertical header merges,
//! alignment and column widths.

use crate::address::CellAddress;
use crate::conf::N_WIDTH_CELL_MAX;
use crate::grid::SheetGrid;
use crate::spec::{Result, SpecAutofitPolicy, SpecRenderOptions};
use crate::util::estimate_unicode_string_width;

/// Style a fully laid-out grid in place.
///
/// Header cells are bolded and every non-blank header cell absorbs the blank
/// header cells below it. Every cell in the used area is aligned. Column widths
/// come from the widest own text of the column.
pub fn style_grid(grid: &mut SheetGrid, options: &SpecRenderOptions) -> Result<()> {
    let n_width = grid.width();
    let n_height = grid.height();
    let n_row_header_end = grid.row_header_end().min(n_height);

    for n_col in 0..n_width {
        let mut row_anchor: Option<u32> = None;
        let mut row_blank_last: Option<u32> = None;

        for n_row in 1..=n_row_header_end {
            let addr = CellAddress::new(n_col, n_row);
            grid.update_format(addr, &options.fmt_header_patch);

            if is_blank(grid, addr) {
                if row_anchor.is_some() {
                    row_blank_last = Some(n_row);
                }
            } else {
                merge_down(grid, n_col, row_anchor, row_blank_last)?;
                row_anchor = Some(n_row);
                row_blank_last = None;
            }
        }
        merge_down(grid, n_col, row_anchor, row_blank_last)?;

        for n_row in 1..=n_height {
            grid.update_format(CellAddress::new(n_col, n_row), &options.fmt_align_patch);
        }

        let n_width_final = derive_column_width(grid, n_col, &options.autofit);
        grid.set_column_width(n_col, n_width_final);
    }

    Ok(())
}

/// A header cell is blank when it has no text of its own and no merge covers it.
fn is_blank(grid: &SheetGrid, addr: CellAddress) -> bool {
    grid.value(addr).is_none_or(str::is_empty) && grid.merge_containing(addr).is_none()
}

fn merge_down(
    grid: &mut SheetGrid,
    n_col: u32,
    row_anchor: Option<u32>,
    row_blank_last: Option<u32>,
) -> Result<()> {
    let (Some(n_row_first), Some(n_row_last)) = (row_anchor, row_blank_last) else {
        return Ok(());
    };
    let first = CellAddress::new(n_col, n_row_first);
    if grid.merge_containing(first).is_some() {
        return Ok(());
    }
    grid.merge_range(first, CellAddress::new(n_col, n_row_last))
}

/// Widest own text of a column plus padding, clamped to the autofit bounds.
///
/// Anchors of merges spanning several columns are skipped: their text is
/// spread over the whole range.
fn derive_column_width(grid: &SheetGrid, n_col: u32, autofit: &SpecAutofitPolicy) -> usize {
    let n_min = usize::max(1, autofit.width_cell_min);
    let n_max = usize::min(N_WIDTH_CELL_MAX, usize::max(n_min, autofit.width_cell_max));

    let n_width_recorded = (1..=grid.height())
        .map(|n_row| CellAddress::new(n_col, n_row))
        .filter(|addr| {
            grid.merge_containing(*addr)
                .is_none_or(|merge| merge.first.col == merge.last.col)
        })
        .filter_map(|addr| grid.value(addr))
        .map(estimate_unicode_string_width)
        .max()
        .unwrap_or(0);

    usize::min(
        n_max,
        usize::max(n_min, n_width_recorded + autofit.width_cell_padding),
    )
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::cursor::LayoutContext;
    use crate::layout::build_header;
    use crate::schema::derive_schema;

    fn addr(s: &str) -> CellAddress {
        s.parse().unwrap()
    }

    fn header_grid(sample: serde_json::Value) -> SheetGrid {
        let schema = derive_schema(sample.as_object().unwrap()).unwrap();
        let options = SpecRenderOptions::default();
        let mut grid = SheetGrid::new("s");
        let mut ctx = LayoutContext::new(&mut grid);
        build_header(
            &mut ctx,
            CellAddress::ORIGIN,
            &schema,
            "S SHEET",
            &options.fmt_banner_patch,
        )
        .unwrap();
        ctx.finish();
        grid
    }

    fn ranges(grid: &SheetGrid) -> Vec<String> {
        grid.merges()
            .iter()
            .map(|m| format!("{}:{}", m.first, m.last))
            .collect()
    }

    #[test]
    fn test_style_grid_merges_header_gaps_downward() {
        let mut grid = header_grid(json!({
            "id": 1,
            "who": {"first": "a", "name": {"given": "b", "family": "c"}},
            "z": 0
        }));
        assert_eq!(grid.row_header_end(), 4);

        style_grid(&mut grid, &SpecRenderOptions::default()).unwrap();

        assert_eq!(
            ranges(&grid),
            vec!["A1:E1", "B2:D2", "C3:D3", "A2:A4", "B3:B4", "E2:E4"]
        );
        assert_eq!(grid.display_value(addr("A4")), Some("id"));
        assert_eq!(grid.display_value(addr("E3")), Some("z"));
    }

    #[test]
    fn test_style_grid_bolds_header_and_aligns_every_cell() {
        let mut grid = header_grid(json!({"id": 1, "name": "Ann"}));
        grid.write_value(addr("A3"), "1");
        grid.write_value(addr("B4"), "Bob");

        style_grid(&mut grid, &SpecRenderOptions::default()).unwrap();

        for c_addr in ["A1", "B1", "A2", "B2"] {
            assert_eq!(grid.format(addr(c_addr)).unwrap().bold, Some(true), "{c_addr}");
        }
        for c_addr in ["A3", "B3", "A4", "B4"] {
            let format = grid.format(addr(c_addr)).unwrap();
            assert_eq!(format.bold, None, "{c_addr}");
            assert_eq!(format.align.as_deref(), Some("center"), "{c_addr}");
            assert_eq!(format.valign.as_deref(), Some("vcenter"), "{c_addr}");
        }
        assert_eq!(ranges(&grid), vec!["A1:B1"]);
    }

    #[test]
    fn test_style_grid_column_widths_are_clamped() {
        let mut grid = header_grid(json!({"id": 1, "description": "x", "note": "y"}));
        grid.write_value(addr("B3"), "a fairly long description text");
        grid.write_value(addr("C3"), "x".repeat(400));

        style_grid(&mut grid, &SpecRenderOptions::default()).unwrap();

        assert_eq!(grid.column_width(0), Some(10));
        assert_eq!(grid.column_width(1), Some(30));
        assert_eq!(grid.column_width(2), Some(255));

        let mut options = SpecRenderOptions::default();
        options.autofit.width_cell_min = 4;
        options.autofit.width_cell_padding = 2;
        let mut grid = header_grid(json!({"id": 1}));
        style_grid(&mut grid, &options).unwrap();
        assert_eq!(grid.column_width(0), Some(9));
    }
}
