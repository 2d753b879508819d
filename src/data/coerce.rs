use std::sync::Arc;

use crate::error::LoadErrorKind;

use super::model::{ColumnType, Dataset, ExtraColumns, Record, Schema, Value};
use super::reader::RawTable;

/// Resolve a declared schema against a table header.
///
/// The result lists exactly the header's columns in file order.  Every
/// declared column must be present; undeclared ones are rejected or kept as
/// text depending on [`Schema::extra_columns`].
pub fn resolve_schema(declared: &Schema, header: &[String]) -> Result<Schema, LoadErrorKind> {
    let missing: Vec<String> = declared
        .names()
        .filter(|n| !header.iter().any(|h| h.as_str() == *n))
        .map(str::to_string)
        .collect();

    let unexpected: Vec<String> = match declared.extra_columns() {
        ExtraColumns::Reject => header
            .iter()
            .filter(|h| declared.index_of(h).is_none())
            .cloned()
            .collect(),
        ExtraColumns::AsText => Vec::new(),
    };

    if !missing.is_empty() || !unexpected.is_empty() {
        return Err(LoadErrorKind::SchemaMismatch {
            missing,
            unexpected,
        });
    }

    Ok(Schema::new(header.iter().map(|h| {
        let ty = declared.column_type(h).unwrap_or(ColumnType::Text);
        (h.clone(), ty)
    })))
}

/// Cast every cell of `raw` to its declared type and build the dataset.
///
/// Numeric cells are trimmed before parsing; reals must be finite.  The first
/// cell that does not parse fails the whole table.
pub fn coerce(name: &str, raw: RawTable, declared: &Schema) -> Result<Dataset, LoadErrorKind> {
    let RawTable {
        origin,
        columns,
        rows: raw_rows,
    } = raw;
    let schema = Arc::new(resolve_schema(declared, &columns)?);
    let types: Vec<ColumnType> = schema.columns().iter().map(|(_, t)| *t).collect();

    let mut rows = Vec::with_capacity(raw_rows.len());
    for (row_no, cells) in raw_rows.into_iter().enumerate() {
        if cells.len() != types.len() {
            // data row `row_no` sits on line `row_no + 2`, after the header
            return Err(LoadErrorKind::MalformedTable {
                path: origin,
                line: Some(row_no as u64 + 2),
                reason: format!("found {} fields, expected {}", cells.len(), types.len()),
            });
        }
        let values = cells
            .into_iter()
            .zip(&types)
            .enumerate()
            .map(|(col_idx, (text, ty))| {
                cast(text, *ty).map_err(|text| LoadErrorKind::TypeCoercionError {
                    column: schema.columns()[col_idx].0.clone(),
                    row: row_no,
                    text,
                    expected: *ty,
                })
            })
            .collect::<Result<Vec<Value>, _>>()?;
        rows.push(Record::new(Arc::clone(&schema), values));
    }

    Ok(Dataset::new(name, schema, rows))
}

/// Returns the original text back on failure.
fn cast(text: String, ty: ColumnType) -> Result<Value, String> {
    match ty {
        ColumnType::Text => Ok(Value::Text(text)),
        ColumnType::Integer => text.trim().parse::<i64>().map(Value::Integer).map_err(|_| text),
        ColumnType::Real => match text.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(Value::Real(v)),
            _ => Err(text),
        },
    }
}
