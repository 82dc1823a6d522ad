//! XLSX writer kernel that serializes laid-out sheet grids into a workbook.

use std::borrow::Cow;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use rust_xlsxwriter::{DocProperties, Format, FormatAlign, FormatBorder, Workbook, Worksheet};

use crate::address::CellAddress;
use crate::conf::{N_LEN_EXCEL_CELL_TEXT_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX};
use crate::grid::SheetGrid;
use crate::sheet::render_sheet;
use crate::spec::{
    RenderError, Result, SpecCellFormat, SpecRenderOptions, SpecSheetReport, SpecSheetRequest,
};
use crate::util::{derive_unique_sheet_name, sanitize_sheet_name};

/// Render every sheet request into one XLSX artifact held in memory.
///
/// Sheets are laid out in input order. The first failing sheet aborts the whole
/// workbook.
pub fn render_workbook(
    sheets: &[SpecSheetRequest],
    options: &SpecRenderOptions,
) -> Result<Vec<u8>> {
    let mut writer = XlsxWriter::new(options.clone());
    for request in sheets {
        writer.write_sheet(request)?;
    }
    writer.save_to_buffer()
}

/// Stateful workbook writer.
pub struct XlsxWriter {
    workbook: Workbook,
    options: SpecRenderOptions,
    set_sheet_names_existing: BTreeSet<String>,
    l_reports: Vec<SpecSheetReport>,
}

impl XlsxWriter {
    /// Create a writer with workbook-wide options.
    ///
    /// The workbook is buffered in memory until [`Self::save`] or
    /// [`Self::save_to_buffer`] is called.
    pub fn new(options: SpecRenderOptions) -> Self {
        let mut workbook = Workbook::new();
        let properties = DocProperties::new().set_author(&options.creator);
        workbook.set_properties(&properties);

        Self {
            workbook,
            options,
            set_sheet_names_existing: BTreeSet::new(),
            l_reports: Vec::new(),
        }
    }

    /// Return immutable snapshot of per-sheet reports.
    pub fn report(&self) -> Vec<SpecSheetReport> {
        self.l_reports.clone()
    }

    /// Lay out one sheet and add it to the workbook.
    ///
    /// The worksheet is built off-workbook and added only once complete, so
    /// nothing is added when layout fails or the grid exceeds worksheet limits.
    /// Cell texts beyond the Excel limit are truncated with a report warning.
    pub fn write_sheet(&mut self, request: &SpecSheetRequest) -> Result<()> {
        let (grid, mut report) = render_sheet(request, &self.options)?;
        validate_grid_limits(&grid)?;

        let sheet_name_sanitized = sanitize_sheet_name(grid.name(), "_");
        let sheet_name_unique =
            derive_unique_sheet_name(&sheet_name_sanitized, &mut self.set_sheet_names_existing);
        if sheet_name_unique != grid.name() {
            tracing::warn!(
                sheet = grid.name(),
                sheet_name = %sheet_name_unique,
                "renamed worksheet"
            );
            report.warn(format!(
                "sheet name {:?} written as {sheet_name_unique:?}",
                grid.name()
            ));
        }

        let worksheet = match build_worksheet(
            &sheet_name_unique,
            &grid,
            self.options.if_show_gridlines,
            &mut report,
        ) {
            Ok(worksheet) => worksheet,
            Err(err) => {
                self.set_sheet_names_existing
                    .remove(&sheet_name_unique.to_lowercase());
                return Err(err);
            }
        };
        self.workbook.push_worksheet(worksheet);

        report.sheet_name = sheet_name_unique;
        self.l_reports.push(report);
        Ok(())
    }

    /// Serialize the workbook to XLSX bytes.
    pub fn save_to_buffer(&mut self) -> Result<Vec<u8>> {
        Ok(self.workbook.save_to_buffer()?)
    }

    /// Serialize the workbook to `path`.
    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.workbook.save(path.as_ref())?;
        Ok(())
    }
}

fn validate_grid_limits(grid: &SheetGrid) -> Result<()> {
    if grid.height() as usize > N_NROWS_EXCEL_MAX {
        return Err(RenderError::ExcelLimit(format!(
            "sheet {:?} needs {} rows, at most {N_NROWS_EXCEL_MAX} are allowed",
            grid.name(),
            grid.height()
        )));
    }
    if grid.width() as usize > N_NCOLS_EXCEL_MAX {
        return Err(RenderError::ExcelLimit(format!(
            "sheet {:?} needs {} columns, at most {N_NCOLS_EXCEL_MAX} are allowed",
            grid.name(),
            grid.width()
        )));
    }
    Ok(())
}

fn build_worksheet(
    sheet_name: &str,
    grid: &SheetGrid,
    if_show_gridlines: bool,
    report: &mut SpecSheetReport,
) -> Result<Worksheet> {
    let mut worksheet = Worksheet::new();
    worksheet.set_name(sheet_name)?;
    worksheet.set_screen_gridlines(if_show_gridlines);
    write_grid(&mut worksheet, grid, report)?;
    Ok(worksheet)
}

/// Cell text clipped to the Excel cell limit.
fn fit_cell_text<'a>(
    c_value: &'a str,
    addr: CellAddress,
    sheet: &str,
    report: &mut SpecSheetReport,
) -> Cow<'a, str> {
    if c_value.len() <= N_LEN_EXCEL_CELL_TEXT_MAX
        || c_value.chars().count() <= N_LEN_EXCEL_CELL_TEXT_MAX
    {
        return Cow::Borrowed(c_value);
    }
    tracing::warn!(sheet, cell = %addr, "truncated cell text to the Excel limit");
    report.warn(format!(
        "cell {addr} text truncated to {N_LEN_EXCEL_CELL_TEXT_MAX} characters"
    ));
    Cow::Owned(c_value.chars().take(N_LEN_EXCEL_CELL_TEXT_MAX).collect())
}

fn write_grid(
    worksheet: &mut Worksheet,
    grid: &SheetGrid,
    report: &mut SpecSheetReport,
) -> Result<()> {
    let mut dict_formats: HashMap<SpecCellFormat, Format> = HashMap::new();
    let fmt_plain = SpecCellFormat::default();

    for merge in grid.merges() {
        let fmt_anchor = grid.format(merge.first).unwrap_or(&fmt_plain);
        let format = dict_formats
            .entry(fmt_anchor.clone())
            .or_insert_with(|| derive_rust_xlsx_format(fmt_anchor));
        let c_value = fit_cell_text(
            grid.value(merge.first).unwrap_or_default(),
            merge.first,
            grid.name(),
            report,
        );
        worksheet.merge_range(
            cast_row_num(merge.first.row)?,
            cast_col_num(merge.first.col)?,
            cast_row_num(merge.last.row)?,
            cast_col_num(merge.last.col)?,
            &c_value,
            format,
        )?;
    }

    for (addr, cell) in grid.cells() {
        if grid.merge_containing(addr).is_some() {
            continue;
        }
        let c_value = cell.value.as_deref().unwrap_or_default();
        if c_value.is_empty() && cell.format.is_empty() {
            continue;
        }

        let format = dict_formats
            .entry(cell.format.clone())
            .or_insert_with(|| derive_rust_xlsx_format(&cell.format));
        let (n_row, n_col) = (cast_row_num(addr.row)?, cast_col_num(addr.col)?);
        if c_value.is_empty() {
            worksheet.write_blank(n_row, n_col, format)?;
        } else {
            let c_value = fit_cell_text(c_value, addr, grid.name(), report);
            worksheet.write_string_with_format(n_row, n_col, c_value.as_ref(), format)?;
        }
    }

    for (n_col, n_width) in grid.column_widths() {
        worksheet.set_column_width(cast_col_num(*n_col)?, *n_width as f64)?;
    }

    Ok(())
}

fn derive_rust_xlsx_format(spec: &SpecCellFormat) -> Format {
    let mut format = Format::new();

    if let Some(val) = &spec.font_name {
        format = format.set_font_name(val.clone());
    }
    if let Some(val) = spec.font_size {
        format = format.set_font_size(val as f64);
    }
    if spec.bold.unwrap_or(false) {
        format = format.set_bold();
    }
    if spec.italic.unwrap_or(false) {
        format = format.set_italic();
    }

    if let Some(val) = &spec.align
        && let Some(align) = derive_format_align(val)
    {
        format = format.set_align(align);
    }
    if let Some(val) = &spec.valign
        && let Some(align) = derive_format_align(val)
    {
        format = format.set_align(align);
    }

    if let Some(val) = &spec.bg_color {
        format = format.set_background_color(val.as_str());
    }
    if let Some(val) = &spec.font_color {
        format = format.set_font_color(val.as_str());
    }

    if let Some(val) = spec.border {
        format = format.set_border(derive_format_border(val));
    }
    if let Some(val) = spec.top {
        format = format.set_border_top(derive_format_border(val));
    }
    if let Some(val) = spec.bottom {
        format = format.set_border_bottom(derive_format_border(val));
    }
    if let Some(val) = spec.left {
        format = format.set_border_left(derive_format_border(val));
    }
    if let Some(val) = spec.right {
        format = format.set_border_right(derive_format_border(val));
    }

    if spec.text_wrap.unwrap_or(false) {
        format = format.set_text_wrap();
    }

    format
}

fn derive_format_border(border: i64) -> FormatBorder {
    match border {
        1 => FormatBorder::Thin,
        2 => FormatBorder::Medium,
        3 => FormatBorder::Dashed,
        4 => FormatBorder::Dotted,
        5 => FormatBorder::Thick,
        6 => FormatBorder::Double,
        7 => FormatBorder::Hair,
        8 => FormatBorder::MediumDashed,
        9 => FormatBorder::DashDot,
        10 => FormatBorder::MediumDashDot,
        11 => FormatBorder::DashDotDot,
        12 => FormatBorder::MediumDashDotDot,
        13 => FormatBorder::SlantDashDot,
        _ => FormatBorder::None,
    }
}

fn derive_format_align(align: &str) -> Option<FormatAlign> {
    match align.trim().to_ascii_lowercase().as_str() {
        "general" => Some(FormatAlign::General),
        "left" => Some(FormatAlign::Left),
        "center" => Some(FormatAlign::Center),
        "right" => Some(FormatAlign::Right),
        "fill" => Some(FormatAlign::Fill),
        "justify" => Some(FormatAlign::Justify),
        "center_across" => Some(FormatAlign::CenterAcross),
        "distributed" => Some(FormatAlign::Distributed),
        "top" => Some(FormatAlign::Top),
        "bottom" => Some(FormatAlign::Bottom),
        "vcenter" | "vertical_center" => Some(FormatAlign::VerticalCenter),
        "vjustify" | "vertical_justify" => Some(FormatAlign::VerticalJustify),
        "vdistributed" | "vertical_distributed" => Some(FormatAlign::VerticalDistributed),
        _ => None,
    }
}

/// Grid rows are 1-based; worksheet rows are 0-based.
fn cast_row_num(row: u32) -> Result<u32> {
    match row.checked_sub(1) {
        Some(n_row) if (n_row as usize) < N_NROWS_EXCEL_MAX => Ok(n_row),
        _ => Err(RenderError::ExcelLimit(format!("row index out of range: {row}"))),
    }
}

fn cast_col_num(col: u32) -> Result<u16> {
    u16::try_from(col)
        .ok()
        .filter(|n_col| (*n_col as usize) < N_NCOLS_EXCEL_MAX)
        .ok_or_else(|| RenderError::ExcelLimit(format!("column index out of range: {col}")))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_cast_row_and_col_num() {
        assert_eq!(cast_row_num(1).unwrap(), 0);
        assert_eq!(cast_row_num(1_048_576).unwrap(), 1_048_575);
        assert!(matches!(cast_row_num(0), Err(RenderError::ExcelLimit(_))));
        assert!(cast_row_num(1_048_577).is_err());
        assert_eq!(cast_col_num(16_383).unwrap(), 16_383);
        assert!(cast_col_num(16_384).is_err());
    }

    #[test]
    fn test_derive_format_align_and_border() {
        assert_eq!(derive_format_align(" Center "), Some(FormatAlign::Center));
        assert_eq!(derive_format_align("vcenter"), Some(FormatAlign::VerticalCenter));
        assert_eq!(derive_format_align("sideways"), None);
        assert_eq!(derive_format_border(1), FormatBorder::Thin);
        assert_eq!(derive_format_border(99), FormatBorder::None);
    }

    #[test]
    fn test_writer_deduplicates_sheet_names_and_reports() {
        let mut writer = XlsxWriter::new(SpecRenderOptions::default());
        writer
            .write_sheet(&SpecSheetRequest::new("a/b", vec![json!({"x": 1})]))
            .unwrap();
        writer
            .write_sheet(&SpecSheetRequest::new("A_B", vec![json!({"x": 2})]))
            .unwrap();

        let l_reports = writer.report();
        assert_eq!(l_reports[0].sheet_name, "a_b");
        assert_eq!(l_reports[1].sheet_name, "A_B__2");
        assert_eq!(l_reports[0].warnings.len(), 1);
        assert_eq!(l_reports[1].warnings.len(), 1);

        let v_bytes = writer.save_to_buffer().unwrap();
        assert!(v_bytes.starts_with(b"PK"));
    }

    #[test]
    fn test_writer_skips_failed_sheet() {
        let mut writer = XlsxWriter::new(SpecRenderOptions::default());
        assert!(writer
            .write_sheet(&SpecSheetRequest::new("bad", vec![json!("nope")]))
            .is_err());
        assert!(writer.report().is_empty());

        writer
            .write_sheet(&SpecSheetRequest::new("bad", vec![json!({"x": 1})]))
            .unwrap();
        assert_eq!(writer.report()[0].sheet_name, "bad");
    }

    #[test]
    fn test_fit_cell_text_truncates_to_excel_limit() {
        let mut report = SpecSheetReport::default();
        let addr = CellAddress::new(1, 3);

        let c_short = "é".repeat(N_LEN_EXCEL_CELL_TEXT_MAX);
        assert!(matches!(
            fit_cell_text(&c_short, addr, "s", &mut report),
            Cow::Borrowed(_)
        ));
        assert!(report.warnings.is_empty());

        let c_long = "x".repeat(N_LEN_EXCEL_CELL_TEXT_MAX + 10);
        let c_fit = fit_cell_text(&c_long, addr, "s", &mut report);
        assert_eq!(c_fit.chars().count(), N_LEN_EXCEL_CELL_TEXT_MAX);
        assert_eq!(report.warnings, vec!["cell B3 text truncated to 32767 characters"]);
    }
}
