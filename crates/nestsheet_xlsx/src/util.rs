//! Stateless helper utilities shared by the layout and writer modules.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::conf::{N_LEN_EXCEL_SHEET_NAME_MAX, TUP_EXCEL_ILLEGAL};
use crate::spec::SpecValuePolicy;

////////////////////////////////////////////////////////////////////////////////
// #region ValueText

/// Render one JSON value as cell text.
///
/// Composite values collapse to their leaf texts joined by
/// `value_policy.join_str`, in key/element order.
pub fn render_value_text(value: &Value, value_policy: &SpecValuePolicy) -> String {
    match value {
        Value::Null => value_policy.null_str.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| render_value_text(item, value_policy))
            .collect::<Vec<_>>()
            .join(&value_policy.join_str),
        Value::Object(map) => map
            .values()
            .map(|item| render_value_text(item, value_policy))
            .collect::<Vec<_>>()
            .join(&value_policy.join_str),
    }
}

/// Estimate displayed width units for one rendered text.
///
/// Non-ASCII characters weigh 1.6 units.
pub fn estimate_unicode_string_width(s: &str) -> usize {
    let n_ascii = s.chars().filter(|chr| chr.is_ascii()).count();
    let n_non_ascii = s.chars().count().saturating_sub(n_ascii);
    n_ascii + (n_non_ascii as f64 * 1.6).round() as usize
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SheetNormalization

/// Replace invalid chars and trim to valid Excel sheet name.
pub fn sanitize_sheet_name(name: &str, replace_to: &str) -> String {
    let mut c_name = name.to_string();
    for c_illegal in TUP_EXCEL_ILLEGAL {
        c_name = c_name.replace(c_illegal, replace_to);
    }
    c_name = c_name.trim().trim_matches('\'').to_string();
    if c_name.is_empty() {
        c_name = "Sheet".to_string();
    }

    let c_name_truncated: String = c_name.chars().take(N_LEN_EXCEL_SHEET_NAME_MAX).collect();
    c_name_truncated.trim_end().trim_end_matches('\'').to_string()
}

/// Return `name`, or `name__2`, `name__3`, ... when already taken.
///
/// Comparison is case-insensitive, as in Excel. The chosen name is recorded in
/// `set_names_existing`.
pub fn derive_unique_sheet_name(name: &str, set_names_existing: &mut BTreeSet<String>) -> String {
    if set_names_existing.insert(name.to_lowercase()) {
        return name.to_string();
    }

    let base_name: String = name
        .chars()
        .take(usize::max(1, N_LEN_EXCEL_SHEET_NAME_MAX - 3))
        .collect();

    let mut n_idx = 2usize;
    loop {
        let candidate: String = format!("{base_name}__{n_idx}")
            .chars()
            .take(N_LEN_EXCEL_SHEET_NAME_MAX)
            .collect();
        if set_names_existing.insert(candidate.to_lowercase()) {
            return candidate;
        }
        n_idx += 1;
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
