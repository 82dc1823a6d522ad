//! Record flattening: one record becomes an ordered list of grid cells whose
//! positions match the leaf columns of the sheet schema.

use serde_json::{Map, Value};

use crate::schema::{EnumShapeTag, SchemaNode, ValueShape, derive_schema, join_path};
use crate::spec::{EnumConformMode, RenderError, Result, SpecValuePolicy};
use crate::util::render_value_text;

/// One flattened cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlatCell {
    /// Single text cell.
    Scalar(String),
    /// Texts stacked top-to-bottom in one column.
    Run(Vec<String>),
}

impl FlatCell {
    /// Rows consumed by the cell (an empty run consumes none).
    pub fn height(&self) -> usize {
        match self {
            FlatCell::Scalar(_) => 1,
            FlatCell::Run(values) => values.len(),
        }
    }
}

/// Collects or rejects records that diverge from the sheet schema.
#[derive(Debug, Clone)]
pub struct Conformer {
    mode: EnumConformMode,
    sheet: String,
    row: usize,
    warnings: Vec<String>,
}

impl Conformer {
    /// Conformer for records of `sheet`.
    pub fn new(mode: EnumConformMode, sheet: impl Into<String>) -> Self {
        Self {
            mode,
            sheet: sheet.into(),
            row: 0,
            warnings: Vec::new(),
        }
    }

    /// Select the record index used in messages.
    pub fn set_row(&mut self, row: usize) {
        self.row = row;
    }

    /// Report one divergence: an error in strict mode, a warning otherwise.
    pub fn mismatch(&mut self, path: &str, detail: &str) -> Result<()> {
        match self.mode {
            EnumConformMode::Strict => Err(RenderError::StructuralMismatch {
                sheet: self.sheet.clone(),
                row: self.row,
                path: path.to_string(),
                detail: detail.to_string(),
            }),
            EnumConformMode::Lenient => {
                tracing::warn!(sheet = %self.sheet, row = self.row, path, detail, "record does not match schema");
                self.warnings
                    .push(format!("record {}: {path:?} {detail}", self.row));
                Ok(())
            }
        }
    }

    /// Consume the conformer, returning its warnings.
    pub fn into_warnings(self) -> Vec<String> {
        self.warnings
    }
}

/// Reorder every record's keys to the first record's key order.
///
/// Keys the first record lacks are dropped; keys a record lacks are skipped.
pub fn reorder_records(records: &[&Map<String, Value>]) -> Vec<Map<String, Value>> {
    let Some(first) = records.first() else {
        return vec![];
    };

    records
        .iter()
        .map(|record| {
            first
                .keys()
                .filter_map(|key| record.get(key).map(|value| (key.clone(), value.clone())))
                .collect()
        })
        .collect()
}

/// Flatten a record against its own structure (schema derived from itself).
pub fn flatten_record(
    record: &Map<String, Value>,
    value_policy: &SpecValuePolicy,
) -> Result<Vec<FlatCell>> {
    if record.is_empty() {
        return Ok(vec![]);
    }
    let schema = derive_schema(record)?;
    let mut conformer = Conformer::new(EnumConformMode::Lenient, "");
    flatten_with_schema(record, &schema, value_policy, &mut conformer)
}

/// Flatten a record into exactly `schema.leaf_count()` cells.
pub fn flatten_with_schema(
    record: &Map<String, Value>,
    schema: &SchemaNode,
    value_policy: &SpecValuePolicy,
    conformer: &mut Conformer,
) -> Result<Vec<FlatCell>> {
    let mut flattener = Flattener {
        value_policy,
        conformer,
        cells: Vec::with_capacity(schema.leaf_count()),
    };
    flattener.flatten_object(Some(record), schema.children(), "")?;
    Ok(flattener.cells)
}

struct Flattener<'p, 'c> {
    value_policy: &'p SpecValuePolicy,
    conformer: &'c mut Conformer,
    cells: Vec<FlatCell>,
}

impl Flattener<'_, '_> {
    fn render(&self, value: &Value) -> String {
        render_value_text(value, self.value_policy)
    }

    fn push_blanks(&mut self, node: &SchemaNode) {
        for _ in 0..node.leaf_count() {
            self.cells.push(FlatCell::Scalar(String::new()));
        }
    }

    fn check_unknown_keys(
        &mut self,
        map: &Map<String, Value>,
        children: &[SchemaNode],
        prefix: &str,
    ) -> Result<()> {
        for key in map.keys() {
            if !children.iter().any(|child| child.key() == key) {
                self.conformer
                    .mismatch(&join_path(prefix, key), "is not in the schema; dropped")?;
            }
        }
        Ok(())
    }

    /// Inline the children of one object. `None` renders every leaf blank.
    fn flatten_object(
        &mut self,
        map: Option<&Map<String, Value>>,
        children: &[SchemaNode],
        prefix: &str,
    ) -> Result<()> {
        if let Some(map) = map {
            self.check_unknown_keys(map, children, prefix)?;
        }

        for child in children {
            let c_path = join_path(prefix, child.key());
            match map.map(|m| m.get(child.key())) {
                Some(Some(value)) => self.flatten_value(child, value, &c_path)?,
                Some(None) => {
                    self.conformer.mismatch(&c_path, "is missing")?;
                    self.push_blanks(child);
                }
                None => self.push_blanks(child),
            }
        }
        Ok(())
    }

    fn flatten_value(&mut self, node: &SchemaNode, value: &Value, path: &str) -> Result<()> {
        let shape = ValueShape::of(value);
        match node {
            SchemaNode::Leaf { shape: tag, .. } => match shape {
                ValueShape::Scalar(v) => self.cells.push(FlatCell::Scalar(self.render(v))),
                ValueShape::EmptyArray => self.cells.push(FlatCell::Run(vec![])),
                ValueShape::ScalarArray(items) => {
                    let values = items.iter().map(|item| self.render(item)).collect();
                    self.cells.push(FlatCell::Run(values));
                }
                ValueShape::RecordArray(items) => {
                    if *tag != EnumShapeTag::RecordArray {
                        self.conformer
                            .mismatch(path, "holds records but the schema has one column")?;
                    }
                    let values = items.iter().map(|item| self.render(item)).collect();
                    self.cells.push(FlatCell::Run(values));
                }
                ValueShape::Nested(map) => {
                    if !map.is_empty() {
                        self.conformer
                            .mismatch(path, "holds nested keys but the schema has one column")?;
                    }
                    self.cells.push(FlatCell::Scalar(self.render(value)));
                }
            },
            SchemaNode::Branch { children, .. } => match shape {
                ValueShape::Nested(map) => self.flatten_object(Some(map), children, path)?,
                ValueShape::EmptyArray => {
                    for _ in 0..node.leaf_count() {
                        self.cells.push(FlatCell::Run(vec![]));
                    }
                }
                ValueShape::RecordArray(items) | ValueShape::ScalarArray(items) => {
                    let mut l_items = Vec::with_capacity(items.len());
                    collect_elements(items, &mut l_items);
                    if l_items.iter().any(|item| !item.is_object()) {
                        self.conformer
                            .mismatch(path, "mixes records with non-record elements")?;
                    }
                    let l_slots: Vec<TransposeSlot<'_>> = l_items
                        .iter()
                        .map(|item| match item.as_object() {
                            Some(map) => TransposeSlot::Record(map),
                            None => TransposeSlot::Blank,
                        })
                        .collect();
                    match l_slots.as_slice() {
                        [TransposeSlot::Record(map)] => {
                            self.flatten_object(Some(*map), children, path)?
                        }
                        _ => self.transpose(children, &l_slots, path)?,
                    }
                }
                ValueShape::Scalar(v) => {
                    if !v.is_null() {
                        self.conformer
                            .mismatch(path, "is a scalar but the schema expects nested keys")?;
                    }
                    self.push_blanks(node);
                }
            },
        }
        Ok(())
    }

    /// Turn N records with K shared leaves into K runs of N values each.
    fn transpose(
        &mut self,
        children: &[SchemaNode],
        slots: &[TransposeSlot<'_>],
        prefix: &str,
    ) -> Result<()> {
        for (n_idx, slot) in slots.iter().enumerate() {
            for map in slot.records() {
                self.check_unknown_keys(map, children, &format!("{prefix}[{n_idx}]"))?;
            }
        }

        for child in children {
            let c_path = join_path(prefix, child.key());
            match child {
                SchemaNode::Leaf { .. } => {
                    let mut l_values = Vec::with_capacity(slots.len());
                    for (n_idx, slot) in slots.iter().enumerate() {
                        l_values.push(self.slot_text(slot, child.key(), prefix, n_idx)?);
                    }
                    self.cells.push(FlatCell::Run(l_values));
                }
                SchemaNode::Branch {
                    children: grandchildren,
                    ..
                } => {
                    let mut l_sub_slots = Vec::with_capacity(slots.len());
                    for (n_idx, slot) in slots.iter().enumerate() {
                        let sub_slot = self.sub_slot(slot, child.key(), prefix, n_idx, &c_path)?;
                        l_sub_slots.push(sub_slot);
                    }
                    self.transpose(grandchildren, &l_sub_slots, &c_path)?;
                }
            }
        }
        Ok(())
    }

    /// Text of leaf `key` in one slot. Joined records show their texts joined
    /// by the value policy separator.
    fn slot_text(
        &mut self,
        slot: &TransposeSlot<'_>,
        key: &str,
        prefix: &str,
        n_idx: usize,
    ) -> Result<String> {
        match slot {
            TransposeSlot::Blank => Ok(String::new()),
            TransposeSlot::Record(map) => match map.get(key) {
                Some(value) => Ok(self.render(value)),
                None => {
                    self.conformer
                        .mismatch(&format!("{prefix}[{n_idx}].{key}"), "is missing")?;
                    Ok(String::new())
                }
            },
            TransposeSlot::Joined(l_maps) => Ok(l_maps
                .iter()
                .filter_map(|map| map.get(key))
                .map(|value| self.render(value))
                .collect::<Vec<_>>()
                .join(&self.value_policy.join_str)),
        }
    }

    /// Slot one level down, behind branch `key` of `slot`.
    fn sub_slot<'v>(
        &mut self,
        slot: &TransposeSlot<'v>,
        key: &str,
        prefix: &str,
        n_idx: usize,
        path: &str,
    ) -> Result<TransposeSlot<'v>> {
        match slot {
            TransposeSlot::Blank => Ok(TransposeSlot::Blank),
            TransposeSlot::Record(map) => match (*map).get(key) {
                Some(value) => self.extract_slot(value, path),
                None => {
                    self.conformer
                        .mismatch(&format!("{prefix}[{n_idx}].{key}"), "is missing")?;
                    Ok(TransposeSlot::Blank)
                }
            },
            TransposeSlot::Joined(l_maps) => {
                let mut l_records = Vec::new();
                for value in l_maps.iter().copied().filter_map(|map| map.get(key)) {
                    l_records.extend(self.extract_slot(value, path)?.records());
                }
                Ok(TransposeSlot::joined(l_records))
            }
        }
    }

    /// Records behind one transposed value: itself, the records of a (nested)
    /// record array, or nothing. Scalars cannot be transposed and render blank.
    fn extract_slot<'v>(&mut self, value: &'v Value, path: &str) -> Result<TransposeSlot<'v>> {
        match ValueShape::of(value) {
            ValueShape::Nested(map) => Ok(TransposeSlot::Record(map)),
            ValueShape::EmptyArray => Ok(TransposeSlot::Blank),
            ValueShape::Scalar(v) if v.is_null() => Ok(TransposeSlot::Blank),
            ValueShape::RecordArray(items) | ValueShape::ScalarArray(items) => {
                let mut l_items = Vec::with_capacity(items.len());
                collect_elements(items, &mut l_items);
                let l_records: Vec<&Map<String, Value>> =
                    l_items.iter().copied().filter_map(Value::as_object).collect();
                if l_records.len() != l_items.len() {
                    self.conformer
                        .mismatch(path, "mixes records with non-record elements")?;
                }
                Ok(TransposeSlot::joined(l_records))
            }
            ValueShape::Scalar(_) => {
                self.conformer.mismatch(
                    path,
                    "cannot be transposed: expected one record per element",
                )?;
                Ok(TransposeSlot::Blank)
            }
        }
    }
}

/// One element position of a transposition.
#[derive(Debug, Clone, PartialEq)]
enum TransposeSlot<'v> {
    /// Nothing to show.
    Blank,
    /// One record.
    Record(&'v Map<String, Value>),
    /// Several records sharing one position.
    Joined(Vec<&'v Map<String, Value>>),
}

impl<'v> TransposeSlot<'v> {
    fn joined(mut records: Vec<&'v Map<String, Value>>) -> Self {
        match records.len() {
            0 => TransposeSlot::Blank,
            1 => TransposeSlot::Record(records.remove(0)),
            _ => TransposeSlot::Joined(records),
        }
    }

    fn records(&self) -> Vec<&'v Map<String, Value>> {
        match self {
            TransposeSlot::Blank => vec![],
            TransposeSlot::Record(map) => vec![*map],
            TransposeSlot::Joined(l_maps) => l_maps.clone(),
        }
    }
}

/// Array elements with nested arrays spliced in place.
fn collect_elements<'v>(items: &'v [Value], out: &mut Vec<&'v Value>) {
    for item in items {
        match item {
            Value::Array(inner) => collect_elements(inner, out),
            _ => out.push(item),
        }
    }
}
