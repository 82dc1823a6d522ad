//! Per-sheet orchestration: validation, schema selection, header and row
//! layout, then styling.

use serde_json::{Map, Value};

use crate::address::CellAddress;
use crate::cursor::LayoutContext;
use crate::flatten::{Conformer, flatten_with_schema, reorder_records};
use crate::grid::SheetGrid;
use crate::layout::{build_header, place_row};
use crate::schema::derive_schema;
use crate::spec::{RenderError, Result, SpecRenderOptions, SpecSheetReport, SpecSheetRequest};
use crate::style::style_grid;

/// Lay out and style one sheet.
///
/// The header schema comes from `request.header_schema` when present, else
/// from the first record. Records are reordered to the first record's key
/// order and placed below the header, one after another.
pub fn render_sheet(
    request: &SpecSheetRequest,
    options: &SpecRenderOptions,
) -> Result<(SheetGrid, SpecSheetReport)> {
    let c_sheet = request.name.as_str();
    if request.records.is_empty() && request.header_schema.is_none() {
        return Err(RenderError::MissingStructure {
            sheet: c_sheet.to_string(),
        });
    }

    let l_records = request
        .records
        .iter()
        .enumerate()
        .map(|(n_idx, record)| {
            record.as_object().ok_or_else(|| RenderError::InvalidRecord {
                sheet: c_sheet.to_string(),
                index: Some(n_idx),
            })
        })
        .collect::<Result<Vec<&Map<String, Value>>>>()?;

    let schema_sample = match &request.header_schema {
        Some(header_schema) => {
            header_schema
                .as_object()
                .ok_or_else(|| RenderError::InvalidRecord {
                    sheet: c_sheet.to_string(),
                    index: None,
                })?
        }
        None => l_records
            .first()
            .copied()
            .ok_or_else(|| RenderError::MissingStructure {
                sheet: c_sheet.to_string(),
            })?,
    };
    let schema = derive_schema(schema_sample)?;
    tracing::debug!(sheet = c_sheet, columns = ?schema.leaf_paths(), "derived sheet schema");

    let l_records_ordered = reorder_records(&l_records);
    let cnt_keys_dropped: usize = l_records
        .iter()
        .zip(&l_records_ordered)
        .map(|(record, ordered)| record.len() - ordered.len())
        .sum();

    let mut report = SpecSheetReport {
        sheet_name: c_sheet.to_string(),
        cnt_records: l_records.len(),
        cnt_cols: schema.leaf_count(),
        cnt_keys_dropped,
        ..Default::default()
    };
    if cnt_keys_dropped > 0 {
        tracing::warn!(sheet = c_sheet, cnt_keys_dropped, "dropped keys absent from the first record");
        report.warn(format!(
            "{cnt_keys_dropped} key(s) absent from the first record were dropped"
        ));
    }

    let mut grid = SheetGrid::new(c_sheet);
    let mut conformer = Conformer::new(options.conform, c_sheet);
    let mut ctx = LayoutContext::new(&mut grid);

    let c_title = format!("{}{}", c_sheet.to_uppercase(), options.sheet_title_suffix);
    build_header(
        &mut ctx,
        CellAddress::ORIGIN,
        &schema,
        &c_title,
        &options.fmt_banner_patch,
    )?;

    let n_row_data_start = ctx
        .cursor()
        .row_header_end
        .checked_add(1)
        .ok_or_else(|| RenderError::ExcelLimit("header ends at the last row".to_string()))?;
    let mut addr = CellAddress::new(0, n_row_data_start);
    for (n_idx, record) in l_records_ordered.iter().enumerate() {
        conformer.set_row(n_idx);
        let l_cells = flatten_with_schema(record, &schema, &options.value_policy, &mut conformer)?;
        let addr_next = place_row(&mut ctx, addr, &l_cells, &options.fmt_body_border_patch)?;
        tracing::trace!(
            sheet = c_sheet,
            record = n_idx,
            row = addr.row,
            height = addr_next.row - addr.row,
            "placed record"
        );
        addr = addr_next;
    }
    let n_row_header_end = ctx.finish();

    style_grid(&mut grid, options)?;

    report.row_header_end = n_row_header_end;
    report.cnt_rows_data = addr.row - n_row_data_start;
    report.warnings.extend(conformer.into_warnings());

    tracing::debug!(
        sheet = c_sheet,
        cnt_records = report.cnt_records,
        row_header_end = report.row_header_end,
        cnt_cols = report.cnt_cols,
        cnt_rows_data = report.cnt_rows_data,
        "laid out sheet"
    );
    Ok((grid, report))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::spec::EnumConformMode;

    fn addr(s: &str) -> CellAddress {
        s.parse().unwrap()
    }

    #[test]
    fn test_render_sheet_users_layout() {
        let request = SpecSheetRequest::new(
            "users",
            vec![json!({"id": 1, "name": "Ann"}), json!({"id": 2, "name": "Bob"})],
        );
        let (grid, report) = render_sheet(&request, &SpecRenderOptions::default()).unwrap();

        assert_eq!(grid.value(addr("A1")), Some("USERS SHEET"));
        assert_eq!(grid.row_values(2), vec!["id", "name"]);
        assert_eq!(grid.row_values(3), vec!["1", "Ann"]);
        assert_eq!(grid.row_values(4), vec!["2", "Bob"]);
        assert_eq!(grid.height(), 4);

        assert_eq!(report.row_header_end, 2);
        assert_eq!(report.cnt_rows_data, 2);
        assert_eq!(report.cnt_cols, 2);
        assert_eq!(report.cnt_records, 2);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_render_sheet_places_runs_and_reorders_keys() {
        let request = SpecSheetRequest::new(
            "orders",
            vec![
                json!({"id": 1, "lines": [{"sku": "a", "qty": 1}, {"sku": "b", "qty": 2}]}),
                json!({"lines": [{"qty": 5, "sku": "c"}], "id": 2, "extra": true}),
            ],
        );
        let (grid, report) = render_sheet(&request, &SpecRenderOptions::default()).unwrap();

        assert_eq!(report.row_header_end, 3);
        assert_eq!(grid.row_values(4), vec!["1", "a", "1"]);
        assert_eq!(grid.row_values(5), vec!["", "b", "2"]);
        assert_eq!(grid.row_values(6), vec!["2", "c", "5"]);
        assert_eq!(report.cnt_rows_data, 3);
        assert_eq!(report.cnt_keys_dropped, 1);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(grid.display_value(addr("A3")), Some("id"));
    }

    #[test]
    fn test_render_sheet_header_schema_takes_precedence() {
        let request = SpecSheetRequest::new("people", vec![json!({"name": "Ann", "age": 3})])
            .with_header_schema(json!({"name": "", "age": 0, "city": ""}));
        let (grid, report) = render_sheet(&request, &SpecRenderOptions::default()).unwrap();

        assert_eq!(grid.row_values(2), vec!["name", "age", "city"]);
        assert_eq!(grid.row_values(3), vec!["Ann", "3", ""]);
        assert_eq!(report.cnt_cols, 3);
        assert!(report.warnings.iter().any(|w| w.contains("\"city\" is missing")));
    }

    #[test]
    fn test_render_sheet_header_only() {
        let request = SpecSheetRequest::new("empty", vec![])
            .with_header_schema(json!({"a": 1, "b": {"c": 2, "d": 3}}));
        let (grid, report) = render_sheet(&request, &SpecRenderOptions::default()).unwrap();
        assert_eq!(report.row_header_end, 3);
        assert_eq!(report.cnt_rows_data, 0);
        assert_eq!(grid.height(), 3);
    }

    #[test]
    fn test_render_sheet_rejects_bad_input() {
        let options = SpecRenderOptions::default();

        let err = render_sheet(&SpecSheetRequest::new("s", vec![]), &options).unwrap_err();
        assert!(matches!(err, RenderError::MissingStructure { ref sheet } if sheet == "s"));

        let err = render_sheet(&SpecSheetRequest::new("s", vec![json!({"a": 1}), json!(3)]), &options)
            .unwrap_err();
        assert!(matches!(err, RenderError::InvalidRecord { index: Some(1), .. }));

        let request = SpecSheetRequest::new("s", vec![json!({"a": 1})]).with_header_schema(json!([1]));
        let err = render_sheet(&request, &options).unwrap_err();
        assert!(matches!(err, RenderError::InvalidRecord { index: None, .. }));

        let err = render_sheet(&SpecSheetRequest::new("s", vec![json!({})]), &options).unwrap_err();
        assert!(matches!(err, RenderError::EmptySchema { .. }));
    }

    #[test]
    fn test_render_sheet_strict_mode_fails_on_mismatch() {
        let options = SpecRenderOptions {
            conform: EnumConformMode::Strict,
            ..Default::default()
        };
        let request = SpecSheetRequest::new(
            "s",
            vec![json!({"a": 1, "b": {"c": 1}}), json!({"a": 2, "b": 7})],
        );
        let err = render_sheet(&request, &options).unwrap_err();
        assert!(matches!(err, RenderError::StructuralMismatch { row: 1, .. }));
    }
}
