//! XLSX constants and default preset factories.

use crate::spec::{
    EnumConformMode, SpecAutofitPolicy, SpecCellFormat, SpecRenderOptions, SpecValuePolicy,
};

/// Excel worksheet maximum row count.
pub const N_NROWS_EXCEL_MAX: usize = 1_048_576;
/// Excel worksheet maximum column count.
pub const N_NCOLS_EXCEL_MAX: usize = 16_384;
/// Excel sheet name maximum length.
pub const N_LEN_EXCEL_SHEET_NAME_MAX: usize = 31;
/// Excel cell text maximum length, in characters.
pub const N_LEN_EXCEL_CELL_TEXT_MAX: usize = 32_767;
/// Characters not allowed in sheet names.
pub const TUP_EXCEL_ILLEGAL: [&str; 7] = ["*", ":", "?", "/", "\\", "[", "]"];

/// Default workbook author metadata.
pub const C_CREATOR_DEFAULT: &str = "nestsheet";
/// Suffix of the top banner label (`"USERS SHEET"`).
pub const C_SHEET_TITLE_SUFFIX: &str = " SHEET";
/// Column width floor, in character units.
pub const N_WIDTH_CELL_MIN: usize = 10;
/// Column width ceiling accepted by Excel.
pub const N_WIDTH_CELL_MAX: usize = 255;

/// Bold overlay applied to header cells.
pub fn derive_default_header_format() -> SpecCellFormat {
    SpecCellFormat {
        bold: Some(true),
        ..Default::default()
    }
}

/// Thin top border marking the first cell of every data cell/run.
pub fn derive_default_body_border_format() -> SpecCellFormat {
    SpecCellFormat {
        top: Some(1),
        ..Default::default()
    }
}

/// Centered alignment applied to every cell.
pub fn derive_default_align_format() -> SpecCellFormat {
    SpecCellFormat {
        align: Some("center".to_string()),
        valign: Some("vcenter".to_string()),
        ..Default::default()
    }
}

/// Build default render options.
pub fn derive_default_render_options() -> SpecRenderOptions {
    SpecRenderOptions {
        creator: C_CREATOR_DEFAULT.to_string(),
        sheet_title_suffix: C_SHEET_TITLE_SUFFIX.to_string(),
        if_show_gridlines: true,
        conform: EnumConformMode::Lenient,
        value_policy: SpecValuePolicy::default(),
        autofit: SpecAutofitPolicy {
            width_cell_min: N_WIDTH_CELL_MIN,
            width_cell_max: N_WIDTH_CELL_MAX,
            width_cell_padding: 0,
        },
        fmt_header_patch: derive_default_header_format(),
        fmt_banner_patch: derive_default_header_format(),
        fmt_body_border_patch: derive_default_body_border_format(),
        fmt_align_patch: derive_default_align_format(),
    }
}
