//! Shared specification models: formats, options, requests, reports and errors.

use serde::Deserialize;
use serde_json::Value;

use crate::address::EnumDirection;

////////////////////////////////////////////////////////////////////////////////
// #region CellFormatSpecification

/// Cell format overlay. `None` fields are left to the layer underneath.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(default)]
pub struct SpecCellFormat {
    /// Font family name.
    pub font_name: Option<String>,
    /// Font size in points.
    pub font_size: Option<i64>,
    /// Bold style.
    pub bold: Option<bool>,
    /// Italic style.
    pub italic: Option<bool>,

    /// Horizontal alignment.
    pub align: Option<String>,
    /// Vertical alignment.
    pub valign: Option<String>,
    /// Border style for all sides.
    pub border: Option<i64>,
    /// Text wrap.
    pub text_wrap: Option<bool>,

    /// Top border override.
    pub top: Option<i64>,
    /// Bottom border override.
    pub bottom: Option<i64>,
    /// Left border override.
    pub left: Option<i64>,
    /// Right border override.
    pub right: Option<i64>,

    /// Background fill color.
    pub bg_color: Option<String>,
    /// Font color.
    pub font_color: Option<String>,
}

impl SpecCellFormat {
    /// Merge two formats with right-side non-`None` overwrite semantics.
    pub fn merge(&self, other: &SpecCellFormat) -> SpecCellFormat {
        SpecCellFormat {
            font_name: other.font_name.clone().or_else(|| self.font_name.clone()),
            font_size: other.font_size.or(self.font_size),
            bold: other.bold.or(self.bold),
            italic: other.italic.or(self.italic),
            align: other.align.clone().or_else(|| self.align.clone()),
            valign: other.valign.clone().or_else(|| self.valign.clone()),
            border: other.border.or(self.border),
            text_wrap: other.text_wrap.or(self.text_wrap),
            top: other.top.or(self.top),
            bottom: other.bottom.or(self.bottom),
            left: other.left.or(self.left),
            right: other.right.or(self.right),
            bg_color: other.bg_color.clone().or_else(|| self.bg_color.clone()),
            font_color: other.font_color.clone().or_else(|| self.font_color.clone()),
        }
    }

    /// Whether the overlay sets nothing.
    pub fn is_empty(&self) -> bool {
        *self == SpecCellFormat::default()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region RenderOptions

/// How records that diverge from the sheet schema are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnumConformMode {
    /// Fill holes with blanks, drop unknown keys, record a warning (default).
    #[default]
    Lenient,
    /// Fail the request with [`RenderError::StructuralMismatch`].
    Strict,
}

/// Text rendering policy for leaf values.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SpecValuePolicy {
    /// Replacement text for JSON `null`.
    pub null_str: String,
    /// Separator used when a composite value collapses into one cell.
    pub join_str: String,
}

impl Default for SpecValuePolicy {
    fn default() -> Self {
        Self {
            null_str: String::new(),
            join_str: ",".to_string(),
        }
    }
}

/// Column width inference policy applied by the stylist.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SpecAutofitPolicy {
    /// Minimum final width.
    pub width_cell_min: usize,
    /// Maximum final width.
    pub width_cell_max: usize,
    /// Width padding added after inference.
    pub width_cell_padding: usize,
}

impl Default for SpecAutofitPolicy {
    fn default() -> Self {
        Self {
            width_cell_min: 10,
            width_cell_max: 255,
            width_cell_padding: 0,
        }
    }
}

/// Workbook-wide render options.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SpecRenderOptions {
    /// Author/creator metadata attached to the workbook.
    pub creator: String,
    /// Suffix appended to the upper-cased sheet name in the top banner.
    pub sheet_title_suffix: String,
    /// Show gridlines in the sheet view.
    pub if_show_gridlines: bool,
    /// Schema conformance mode.
    pub conform: EnumConformMode,
    /// Leaf text rendering policy.
    pub value_policy: SpecValuePolicy,
    /// Column autofit policy.
    pub autofit: SpecAutofitPolicy,
    /// Overlay applied to every header cell.
    pub fmt_header_patch: SpecCellFormat,
    /// Overlay applied to nested banner cells.
    pub fmt_banner_patch: SpecCellFormat,
    /// Overlay applied to the first cell of every data cell/run.
    pub fmt_body_border_patch: SpecCellFormat,
    /// Overlay applied to every cell of the sheet.
    pub fmt_align_patch: SpecCellFormat,
}

impl Default for SpecRenderOptions {
    fn default() -> Self {
        crate::conf::derive_default_render_options()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SheetRequest

/// One sheet to render: display name, records and an optional header schema.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SpecSheetRequest {
    /// Sheet display name.
    pub name: String,
    /// Records (JSON objects).
    #[serde(default, alias = "data")]
    pub records: Vec<Value>,
    /// Explicit header schema; takes precedence over the first record.
    #[serde(default, alias = "headerSchema")]
    pub header_schema: Option<Value>,
}

impl SpecSheetRequest {
    /// Build a request without an explicit schema.
    pub fn new(name: impl Into<String>, records: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            records,
            header_schema: None,
        }
    }

    /// Attach an explicit header schema.
    pub fn with_header_schema(mut self, header_schema: Value) -> Self {
        self.header_schema = Some(header_schema);
        self
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ReportSpecification

/// Per-sheet render report.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecSheetReport {
    /// Actual unique sheet name in the workbook.
    pub sheet_name: String,
    /// Number of input records.
    pub cnt_records: usize,
    /// Last header row (1-based).
    pub row_header_end: u32,
    /// Physical data rows consumed below the header.
    pub cnt_rows_data: u32,
    /// Leaf columns spanned by the header.
    pub cnt_cols: usize,
    /// Record keys dropped because the first record lacks them.
    pub cnt_keys_dropped: usize,
    /// Non-fatal warnings.
    pub warnings: Vec<String>,
}

impl SpecSheetReport {
    /// Add a warning message.
    pub fn warn(&mut self, msg: impl AsRef<str>) {
        self.warnings.push(msg.as_ref().to_string());
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// Top-level render failure. No artifact is produced when one is returned.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// Neither a header schema nor a record was supplied.
    #[error("sheet {sheet:?}: a header schema or at least one record is required")]
    MissingStructure {
        /// Sheet display name.
        sheet: String,
    },
    /// A record (or the header schema when `index` is `None`) is not an object.
    #[error("sheet {sheet:?}: {} is not a JSON object", describe_record_index(.index))]
    InvalidRecord {
        /// Sheet display name.
        sheet: String,
        /// Zero-based record index.
        index: Option<usize>,
    },
    /// A schema node spans no leaf column.
    #[error("schema node {path:?} has no leaf keys")]
    EmptySchema {
        /// Dotted key path of the node; empty for the root.
        path: String,
    },
    /// A record does not match the sheet schema (strict mode only).
    #[error("sheet {sheet:?}, record {row}: {path:?} {detail}")]
    StructuralMismatch {
        /// Sheet display name.
        sheet: String,
        /// Zero-based record index.
        row: usize,
        /// Dotted key path.
        path: String,
        /// What diverged.
        detail: String,
    },
    /// A step left the addressable grid.
    #[error("cannot step {direction:?} by {step} from {address}")]
    AddressOutOfBounds {
        /// Address before the step.
        address: String,
        /// Step direction.
        direction: EnumDirection,
        /// Step count.
        step: u32,
    },
    /// Malformed address or column letters.
    #[error("invalid cell address: {0:?}")]
    InvalidAddress(String),
    /// A merge would overlap an existing merged range.
    #[error("merge range {range} overlaps an existing merged range")]
    MergeOverlap {
        /// Range text, e.g. `A1:C1`.
        range: String,
    },
    /// The laid-out grid does not fit in an XLSX worksheet.
    #[error("excel limit exceeded: {0}")]
    ExcelLimit(String),
    /// Workbook engine failure.
    #[error("xlsx write error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
    /// JSON decoding failure.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

fn describe_record_index(index: &Option<usize>) -> String {
    match index {
        Some(n_idx) => format!("record {n_idx}"),
        None => "header schema".to_string(),
    }
}

/// Crate-wide result alias.
pub type Result<T, E = RenderError> = std::result::Result<T, E>;

// #endregion
////////////////////////////////////////////////////////////////////////////////
