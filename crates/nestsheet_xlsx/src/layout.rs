//! Header pyramid construction and data row placement.
//!
//! Both walks move through the grid with [`LayoutContext::write`] and
//! [`LayoutContext::step`] only.

use crate::address::{CellAddress, EnumDirection};
use crate::cursor::{EnumLayoutAction, LayoutContext};
use crate::flatten::FlatCell;
use crate::schema::SchemaNode;
use crate::spec::{RenderError, Result, SpecCellFormat};

////////////////////////////////////////////////////////////////////////////////
// #region HeaderPyramid

/// Lay out the header banner of `node` at `start`, followed by its children on
/// the rows below.
///
/// Returns the address one column past the banner on the banner row, where
/// the next sibling starts. Nested banners receive `fmt_banner`. The deepest
/// banner row is recorded as the header end.
pub fn build_header(
    ctx: &mut LayoutContext<'_>,
    start: CellAddress,
    node: &SchemaNode,
    label: &str,
    fmt_banner: &SpecCellFormat,
) -> Result<CellAddress> {
    let n_leaves = node.leaf_count();
    if n_leaves == 0 {
        return Err(RenderError::EmptySchema {
            path: node.key().to_string(),
        });
    }

    ctx.write(start, label);
    if n_leaves > 1 {
        let last = start.offset(EnumDirection::Right, cast_span(n_leaves - 1)?)?;
        ctx.grid().merge_range(start, last)?;
    }
    let mut addr = ctx.step(start, EnumDirection::Down)?;

    let l_children = node.children();
    for (n_idx, child) in l_children.iter().enumerate() {
        match child {
            SchemaNode::Branch { .. } => {
                let child_start = addr;
                addr = build_header(ctx, child_start, child, child.key(), fmt_banner)?;
                ctx.grid().update_format(child_start, fmt_banner);
            }
            SchemaNode::Leaf { key, .. } => {
                ctx.write(addr, key.as_str());
                if n_idx + 1 < l_children.len() {
                    addr = ctx.step(addr, EnumDirection::Right)?;
                }
            }
        }
    }

    if ctx.last_action() == EnumLayoutAction::Write {
        addr = ctx.step(addr, EnumDirection::Right)?;
    }
    addr = ctx.step(addr, EnumDirection::Up)?;
    ctx.mark_header_end();
    Ok(addr)
}

fn cast_span(n: usize) -> Result<u32> {
    u32::try_from(n).map_err(|_| RenderError::ExcelLimit(format!("span of {n} columns")))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region RowPlacement

/// Place one flattened record starting at `start`.
///
/// Scalars take one cell; runs extend downward from the base row. The first
/// cell of every scalar or run gets `fmt_border`, even when the run is empty.
/// Returns column `A` of the row below the tallest run.
pub fn place_row(
    ctx: &mut LayoutContext<'_>,
    start: CellAddress,
    cells: &[FlatCell],
    fmt_border: &SpecCellFormat,
) -> Result<CellAddress> {
    let n_row_base = start.row;
    let mut addr = start;
    let mut n_height = 1usize;

    for cell in cells {
        match cell {
            FlatCell::Scalar(text) => {
                ctx.write(addr, text.as_str());
                ctx.grid().update_format(addr, fmt_border);
            }
            FlatCell::Run(values) => {
                ctx.grid().update_format(addr, fmt_border);
                let mut run_addr = addr;
                for value in values {
                    ctx.write(run_addr, value.as_str());
                    run_addr = ctx.step(run_addr, EnumDirection::Down)?;
                }
            }
        }
        n_height = n_height.max(cell.height());
        addr = ctx.step(addr.with_row(n_row_base), EnumDirection::Right)?;
    }

    let n_row_next = u32::try_from(n_height)
        .ok()
        .and_then(|n| n_row_base.checked_add(n))
        .ok_or_else(|| {
            RenderError::ExcelLimit(format!("run of {n_height} rows from row {n_row_base}"))
        })?;
    Ok(CellAddress::new(0, n_row_next))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
