//! `nestsheet_xlsx` v1:
//! Nested JSON records to pyramid-header XLSX workbooks.
//!
//! Modules:
//! - `address` : cell address arithmetic
//! - `cursor`  : per-sheet layout cursor and step/write primitives
//! - `schema`  : representative schema and leaf counts
//! - `layout`  : header pyramid and row placement
//! - `flatten` : record flattening, transposition and key reordering
//! - `grid`    : in-memory sheet grid
//! - `style`   : post-layout presentation pass
//! - `sheet`   : per-sheet orchestration
//! - `writer`  : workbook serialization
//! - `conf`    : constants and default presets
//! - `spec`    : options, requests, reports and errors
//! - `util`    : pure helper functions
pub mod address;
pub mod conf;
pub mod cursor;
pub mod flatten;
pub mod grid;
pub mod layout;
pub mod schema;
pub mod sheet;
pub mod spec;
pub mod style;
pub mod util;
pub mod writer;

pub use address::{
    CellAddress, EnumDirection, column_index_to_letters, column_letters_to_index, format_range,
    shift_column_letters,
};
pub use conf::{
    N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX, TUP_EXCEL_ILLEGAL,
};
pub use cursor::{EnumLayoutAction, LayoutContext, LayoutCursor};
pub use flatten::{Conformer, FlatCell, flatten_record, flatten_with_schema, reorder_records};
pub use grid::{SheetGrid, SpecGridCell, SpecMergeRange};
pub use layout::{build_header, place_row};
pub use schema::{EnumShapeTag, SchemaNode, ValueShape, derive_schema};
pub use sheet::render_sheet;
pub use spec::{
    EnumConformMode, RenderError, Result, SpecAutofitPolicy, SpecCellFormat, SpecRenderOptions,
    SpecSheetReport, SpecSheetRequest, SpecValuePolicy,
};
pub use style::style_grid;
pub use util::{render_value_text, sanitize_sheet_name};
pub use writer::{XlsxWriter, render_workbook};
