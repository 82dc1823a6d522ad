use std::collections::BTreeMap;

use nestsheet_xlsx::{
    RenderError, SpecRenderOptions, SpecSheetReport, SpecSheetRequest, XlsxWriter,
    render_workbook,
};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyBytes;

const N_BRIDGE_ABI_VERSION: u64 = 1;
const C_BRIDGE_CONTRACT_VERSION: &str = "nestsheet.xlsx.render.v1";
const C_BRIDGE_TRANSPORT: &str = "json";

#[pyclass(name = "SpecSheetReport")]
#[derive(Debug, Clone)]
struct PySheetReport {
    #[pyo3(get)]
    sheet_name: String,
    #[pyo3(get)]
    cnt_records: usize,
    #[pyo3(get)]
    row_header_end: u32,
    #[pyo3(get)]
    cnt_rows_data: u32,
    #[pyo3(get)]
    cnt_cols: usize,
    #[pyo3(get)]
    cnt_keys_dropped: usize,
    #[pyo3(get)]
    warnings: Vec<String>,
}

impl From<SpecSheetReport> for PySheetReport {
    fn from(report: SpecSheetReport) -> Self {
        Self {
            sheet_name: report.sheet_name,
            cnt_records: report.cnt_records,
            row_header_end: report.row_header_end,
            cnt_rows_data: report.cnt_rows_data,
            cnt_cols: report.cnt_cols,
            cnt_keys_dropped: report.cnt_keys_dropped,
            warnings: report.warnings,
        }
    }
}

#[pymethods]
impl PySheetReport {
    #[getter]
    fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_records".to_string(), self.cnt_records as u64);
        dict_counts.insert("row_header_end".to_string(), u64::from(self.row_header_end));
        dict_counts.insert("cnt_rows_data".to_string(), u64::from(self.cnt_rows_data));
        dict_counts.insert("cnt_cols".to_string(), self.cnt_cols as u64);
        dict_counts.insert("cnt_keys_dropped".to_string(), self.cnt_keys_dropped as u64);
        dict_counts.insert("cnt_warnings".to_string(), self.warning_count() as u64);
        dict_counts
    }

    #[pyo3(signature = (prefix = "[XLSX]"))]
    fn format(&self, prefix: &str) -> String {
        format!(
            "{prefix} sheet={} records={} header_rows={} data_rows={} cols={} dropped_keys={} warnings={}",
            self.sheet_name,
            self.cnt_records,
            self.row_header_end,
            self.cnt_rows_data,
            self.cnt_cols,
            self.cnt_keys_dropped,
            self.warning_count()
        )
    }

    fn __str__(&self) -> String {
        self.format("[XLSX]")
    }
}

fn parse_sheet_requests(sheets_json: &str) -> PyResult<Vec<SpecSheetRequest>> {
    serde_json::from_str(sheets_json)
        .map_err(|err| PyValueError::new_err(format!("Invalid sheets JSON: {err}")))
}

fn parse_render_options(options_json: Option<&str>) -> PyResult<SpecRenderOptions> {
    match options_json {
        None => Ok(SpecRenderOptions::default()),
        Some(val) => serde_json::from_str(val)
            .map_err(|err| PyValueError::new_err(format!("Invalid options JSON: {err}"))),
    }
}

fn map_render_error(exception: RenderError) -> PyErr {
    match exception {
        RenderError::MissingStructure { .. }
        | RenderError::InvalidRecord { .. }
        | RenderError::EmptySchema { .. }
        | RenderError::StructuralMismatch { .. }
        | RenderError::InvalidAddress(_)
        | RenderError::Json(_) => PyValueError::new_err(exception.to_string()),
        RenderError::AddressOutOfBounds { .. }
        | RenderError::MergeOverlap { .. }
        | RenderError::ExcelLimit(_)
        | RenderError::Xlsx(_) => PyRuntimeError::new_err(exception.to_string()),
    }
}

#[pyfunction(name = "render_workbook")]
#[pyo3(signature = (sheets_json, options_json = None))]
fn render_workbook_py(
    py: Python<'_>,
    sheets_json: &str,
    options_json: Option<&str>,
) -> PyResult<Py<PyBytes>> {
    let l_requests = parse_sheet_requests(sheets_json)?;
    let options = parse_render_options(options_json)?;

    let v_bytes =
        py.allow_threads(|| render_workbook(&l_requests, &options).map_err(map_render_error))?;
    Ok(PyBytes::new(py, &v_bytes).unbind())
}

#[pyfunction(name = "write_workbook")]
#[pyo3(signature = (file_out, sheets_json, options_json = None))]
fn write_workbook_py(
    py: Python<'_>,
    file_out: String,
    sheets_json: &str,
    options_json: Option<&str>,
) -> PyResult<Vec<PySheetReport>> {
    let l_requests = parse_sheet_requests(sheets_json)?;
    let options = parse_render_options(options_json)?;

    let l_reports = py.allow_threads(|| {
        let mut writer = XlsxWriter::new(options);
        for request in &l_requests {
            writer.write_sheet(request).map_err(map_render_error)?;
        }
        writer.save(&file_out).map_err(map_render_error)?;
        Ok::<_, PyErr>(writer.report())
    })?;
    Ok(l_reports.into_iter().map(PySheetReport::from).collect())
}

#[pymodule]
fn _nestsheet_xlsx_rs(module: &Bound<'_, PyModule>) -> PyResult<()> {
    module.add_class::<PySheetReport>()?;
    module.add_function(wrap_pyfunction!(render_workbook_py, module)?)?;
    module.add_function(wrap_pyfunction!(write_workbook_py, module)?)?;
    module.add("__bridge_abi__", N_BRIDGE_ABI_VERSION)?;
    module.add("__bridge_contract__", C_BRIDGE_CONTRACT_VERSION)?;
    module.add("__bridge_transport__", C_BRIDGE_TRANSPORT)?;
    Ok(())
}
