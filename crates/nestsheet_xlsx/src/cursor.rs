//! Per-sheet layout cursor and the two primitives that move it.
//!
//! Header and row layout only touch the grid through [`LayoutContext::write`]
//! and [`LayoutContext::step`], so the "was the last operation a write?" rule
//! stays an explicit input of each recursive call.

use crate::address::{CellAddress, EnumDirection};
use crate::grid::SheetGrid;
use crate::spec::Result;

/// Kind of the most recent cursor operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumLayoutAction {
    /// A value was written; the address did not advance.
    #[default]
    Write,
    /// The address moved.
    Step,
}

/// Mutable layout state for one sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LayoutCursor {
    /// Most recent operation.
    pub last_action: EnumLayoutAction,
    /// Deepest row reached by a downward step.
    pub row_deepest: u32,
    /// Row of the deepest header banner.
    pub row_header_end: u32,
}

impl LayoutCursor {
    /// Return to the initial state (`Write`, 0, 0).
    pub fn reset(&mut self) {
        *self = LayoutCursor::default();
    }
}

/// Cursor plus the grid it writes into.
#[derive(Debug)]
pub struct LayoutContext<'g> {
    cursor: LayoutCursor,
    grid: &'g mut SheetGrid,
}

impl<'g> LayoutContext<'g> {
    /// Start laying out `grid` with a fresh cursor.
    pub fn new(grid: &'g mut SheetGrid) -> Self {
        Self {
            cursor: LayoutCursor::default(),
            grid,
        }
    }

    /// Current cursor state.
    pub fn cursor(&self) -> &LayoutCursor {
        &self.cursor
    }

    /// Kind of the most recent operation.
    pub fn last_action(&self) -> EnumLayoutAction {
        self.cursor.last_action
    }

    /// Target grid.
    pub fn grid(&mut self) -> &mut SheetGrid {
        self.grid
    }

    /// Write `value` at `addr` without moving.
    pub fn write(&mut self, addr: CellAddress, value: impl Into<String>) {
        self.grid.write_value(addr, value);
        self.cursor.last_action = EnumLayoutAction::Write;
    }

    /// Move one cell in `direction`, tracking the deepest row reached downward.
    pub fn step(&mut self, addr: CellAddress, direction: EnumDirection) -> Result<CellAddress> {
        let next = addr.offset(direction, 1)?;
        self.cursor.last_action = EnumLayoutAction::Step;
        if direction == EnumDirection::Down && next.row > self.cursor.row_deepest {
            self.cursor.row_deepest = next.row;
        }
        Ok(next)
    }

    /// Freeze the header end at the deepest row seen so far.
    pub fn mark_header_end(&mut self) {
        self.cursor.row_header_end = self.cursor.row_deepest;
        self.grid.set_row_header_end(self.cursor.row_header_end);
    }

    /// Finish the sheet: return the header end row and reset the cursor.
    pub fn finish(mut self) -> u32 {
        let row_header_end = self.cursor.row_header_end;
        self.cursor.reset();
        row_header_end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_tracks_deepest_row_only_downward() {
        let mut grid = SheetGrid::new("s");
        let mut ctx = LayoutContext::new(&mut grid);
        assert_eq!(ctx.last_action(), EnumLayoutAction::Write);

        let a2 = ctx.step(CellAddress::ORIGIN, EnumDirection::Down).unwrap();
        let a3 = ctx.step(a2, EnumDirection::Down).unwrap();
        assert_eq!(ctx.cursor().row_deepest, 3);

        let a2_again = ctx.step(a3, EnumDirection::Up).unwrap();
        let b2 = ctx.step(a2_again, EnumDirection::Right).unwrap();
        assert_eq!(b2.to_string(), "B2");
        assert_eq!(ctx.cursor().row_deepest, 3);
        assert_eq!(ctx.last_action(), EnumLayoutAction::Step);

        ctx.write(b2, "v");
        assert_eq!(ctx.last_action(), EnumLayoutAction::Write);
        ctx.mark_header_end();
        assert_eq!(ctx.finish(), 3);
        assert_eq!(grid.value(CellAddress::new(1, 2)), Some("v"));
        assert_eq!(grid.row_header_end(), 3);
    }

    #[test]
    fn test_failed_step_leaves_cursor_untouched() {
        let mut grid = SheetGrid::new("s");
        let mut ctx = LayoutContext::new(&mut grid);
        assert!(ctx.step(CellAddress::ORIGIN, EnumDirection::Up).is_err());
        assert_eq!(*ctx.cursor(), LayoutCursor::default());
    }

    #[test]
    fn test_cursor_reset() {
        let mut cursor = LayoutCursor {
            last_action: EnumLayoutAction::Step,
            row_deepest: 7,
            row_header_end: 4,
        };
        cursor.reset();
        assert_eq!(cursor, LayoutCursor::default());
    }
}
