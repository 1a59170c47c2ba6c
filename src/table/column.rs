// src/table/column.rs

use std::borrow::Cow;

use crate::error::{EngineError, Result};

use super::cast::parse_value;
use super::types::{LogicalType, Value};

/// A nullable, homogeneously typed sequence of cells.
///
/// One concrete container per logical type; every function that switches over
/// the variant handles all six.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    String(Vec<Option<String>>),
    Int64(Vec<Option<i64>>),
    Float64(Vec<Option<f64>>),
    Boolean(Vec<Option<bool>>),
    Timestamp(Vec<Option<i64>>),
    Date(Vec<Option<i32>>),
}

impl Column {
    /// An empty column of the given type.
    pub fn empty(ty: LogicalType) -> Self {
        Column::with_capacity(ty, 0)
    }

    fn with_capacity(ty: LogicalType, capacity: usize) -> Self {
        match ty {
            LogicalType::String => Column::String(Vec::with_capacity(capacity)),
            LogicalType::Int64 => Column::Int64(Vec::with_capacity(capacity)),
            LogicalType::Float64 => Column::Float64(Vec::with_capacity(capacity)),
            LogicalType::Boolean => Column::Boolean(Vec::with_capacity(capacity)),
            LogicalType::Timestamp => Column::Timestamp(Vec::with_capacity(capacity)),
            LogicalType::Date => Column::Date(Vec::with_capacity(capacity)),
        }
    }

    /// Build a column from optional scalars that must all be of type `ty`.
    pub fn from_values<I>(ty: LogicalType, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = Option<Value>>,
    {
        let values = values.into_iter();
        let mut column = Column::with_capacity(ty, values.size_hint().0);
        for (row, value) in values.enumerate() {
            column.push(row, value)?;
        }
        Ok(column)
    }

    fn push(&mut self, row: usize, value: Option<Value>) -> Result<()> {
        match (self, value) {
            (Column::String(v), None) => v.push(None),
            (Column::Int64(v), None) => v.push(None),
            (Column::Float64(v), None) => v.push(None),
            (Column::Boolean(v), None) => v.push(None),
            (Column::Timestamp(v), None) => v.push(None),
            (Column::Date(v), None) => v.push(None),
            (Column::String(v), Some(Value::String(x))) => v.push(Some(x)),
            (Column::Int64(v), Some(Value::Int64(x))) => v.push(Some(x)),
            (Column::Float64(v), Some(Value::Float64(x))) => v.push(Some(x)),
            (Column::Boolean(v), Some(Value::Boolean(x))) => v.push(Some(x)),
            (Column::Timestamp(v), Some(Value::Timestamp(x))) => v.push(Some(x)),
            (Column::Date(v), Some(Value::Date(x))) => v.push(Some(x)),
            (column, Some(other)) => {
                return Err(EngineError::TypeMismatch {
                    column: None,
                    row,
                    value: other.to_string(),
                    target: column.logical_type(),
                })
            }
        }
        Ok(())
    }

    pub fn logical_type(&self) -> LogicalType {
        match self {
            Column::String(_) => LogicalType::String,
            Column::Int64(_) => LogicalType::Int64,
            Column::Float64(_) => LogicalType::Float64,
            Column::Boolean(_) => LogicalType::Boolean,
            Column::Timestamp(_) => LogicalType::Timestamp,
            Column::Date(_) => LogicalType::Date,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Column::String(v) => v.len(),
            Column::Int64(v) => v.len(),
            Column::Float64(v) => v.len(),
            Column::Boolean(v) => v.len(),
            Column::Timestamp(v) => v.len(),
            Column::Date(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_null(&self, row: usize) -> bool {
        match self {
            Column::String(v) => v[row].is_none(),
            Column::Int64(v) => v[row].is_none(),
            Column::Float64(v) => v[row].is_none(),
            Column::Boolean(v) => v[row].is_none(),
            Column::Timestamp(v) => v[row].is_none(),
            Column::Date(v) => v[row].is_none(),
        }
    }

    pub fn null_count(&self) -> usize {
        (0..self.len()).filter(|&row| self.is_null(row)).count()
    }

    /// The cell at `row`, `None` for null. Panics if `row` is out of bounds.
    pub fn value(&self, row: usize) -> Option<Value> {
        match self {
            Column::String(v) => v[row].clone().map(Value::String),
            Column::Int64(v) => v[row].map(Value::Int64),
            Column::Float64(v) => v[row].map(Value::Float64),
            Column::Boolean(v) => v[row].map(Value::Boolean),
            Column::Timestamp(v) => v[row].map(Value::Timestamp),
            Column::Date(v) => v[row].map(Value::Date),
        }
    }

    /// Canonical text of the cell at `row`, `None` for null.
    pub fn display_value(&self, row: usize) -> Option<String> {
        match self {
            Column::String(v) => v[row].clone(),
            _ => self.value(row).map(|v| v.to_string()),
        }
    }

    /// Rows `[offset, offset + count)`, clipped to the column length.
    pub fn slice(&self, offset: usize, count: usize) -> Column {
        let start = offset.min(self.len());
        let end = start.saturating_add(count).min(self.len());
        match self {
            Column::String(v) => Column::String(v[start..end].to_vec()),
            Column::Int64(v) => Column::Int64(v[start..end].to_vec()),
            Column::Float64(v) => Column::Float64(v[start..end].to_vec()),
            Column::Boolean(v) => Column::Boolean(v[start..end].to_vec()),
            Column::Timestamp(v) => Column::Timestamp(v[start..end].to_vec()),
            Column::Date(v) => Column::Date(v[start..end].to_vec()),
        }
    }

    /// Append every cell of `other`. Both columns must share a logical type.
    pub fn extend_from(&mut self, other: &Column) -> Result<()> {
        match (self, other) {
            (Column::String(a), Column::String(b)) => a.extend_from_slice(b),
            (Column::Int64(a), Column::Int64(b)) => a.extend_from_slice(b),
            (Column::Float64(a), Column::Float64(b)) => a.extend_from_slice(b),
            (Column::Boolean(a), Column::Boolean(b)) => a.extend_from_slice(b),
            (Column::Timestamp(a), Column::Timestamp(b)) => a.extend_from_slice(b),
            (Column::Date(a), Column::Date(b)) => a.extend_from_slice(b),
            (a, b) => {
                return Err(EngineError::InvalidTable(format!(
                    "cannot append a {} column to a {} column",
                    b.logical_type(),
                    a.logical_type()
                )))
            }
        }
        Ok(())
    }

    /// Convert every cell to `target`.
    ///
    /// - same type: clone
    /// - to string: canonical text of each cell
    /// - anything else: parse the canonical text; the first cell that does not
    ///   parse fails the whole cast with `TypeMismatch` and its row index
    ///
    /// Nulls stay null.
    pub fn cast(&self, target: LogicalType) -> Result<Column> {
        if self.logical_type() == target {
            return Ok(self.clone());
        }
        if target == LogicalType::String {
            return Ok(Column::String(self.to_strings()));
        }

        let text: Cow<'_, [Option<String>]> = match self {
            Column::String(v) => Cow::Borrowed(v.as_slice()),
            _ => Cow::Owned(self.to_strings()),
        };

        let mut out = Column::with_capacity(target, text.len());
        for (row, cell) in text.iter().enumerate() {
            let value = match cell {
                None => None,
                Some(raw) => Some(parse_value(raw, target).ok_or_else(|| {
                    EngineError::TypeMismatch {
                        column: None,
                        row,
                        value: raw.clone(),
                        target,
                    }
                })?),
            };
            out.push(row, value)?;
        }
        Ok(out)
    }

    fn to_strings(&self) -> Vec<Option<String>> {
        (0..self.len()).map(|row| self.display_value(row)).collect()
    }
}

impl From<Vec<Option<String>>> for Column {
    fn from(v: Vec<Option<String>>) -> Self {
        Column::String(v)
    }
}

impl From<Vec<Option<&str>>> for Column {
    fn from(v: Vec<Option<&str>>) -> Self {
        Column::String(v.into_iter().map(|s| s.map(str::to_string)).collect())
    }
}

impl From<Vec<Option<i64>>> for Column {
    fn from(v: Vec<Option<i64>>) -> Self {
        Column::Int64(v)
    }
}

impl From<Vec<Option<f64>>> for Column {
    fn from(v: Vec<Option<f64>>) -> Self {
        Column::Float64(v)
    }
}

impl From<Vec<Option<bool>>> for Column {
    fn from(v: Vec<Option<bool>>) -> Self {
        Column::Boolean(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[Option<&str>]) -> Column {
        Column::from(values.to_vec())
    }

    #[test]
    fn reports_length_type_and_nulls() {
        let col = Column::from(vec![Some(1i64), None, Some(3)]);
        assert_eq!(col.len(), 3);
        assert_eq!(col.logical_type(), LogicalType::Int64);
        assert_eq!(col.null_count(), 1);
        assert!(col.is_null(1));
        assert_eq!(col.value(2), Some(Value::Int64(3)));
    }

    #[test]
    fn from_values_rejects_heterogeneous_scalars() {
        let err = Column::from_values(
            LogicalType::Int64,
            vec![Some(Value::Int64(1)), Some(Value::String("two".into()))],
        )
        .unwrap_err();
        match err {
            EngineError::TypeMismatch { row, target, .. } => {
                assert_eq!(row, 1);
                assert_eq!(target, LogicalType::Int64);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn cast_reports_first_unparsable_row() {
        let err = strings(&[Some("1"), Some("2"), Some("x")])
            .cast(LogicalType::Int64)
            .unwrap_err();
        match err {
            EngineError::TypeMismatch { row, value, .. } => {
                assert_eq!(row, 2);
                assert_eq!(value, "x");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn cast_keeps_nulls() {
        let col = strings(&[Some("1.5"), None]).cast(LogicalType::Float64).unwrap();
        assert_eq!(col, Column::Float64(vec![Some(1.5), None]));
    }

    #[test]
    fn cast_to_same_type_is_identity() {
        let col = Column::from(vec![Some(true), None]);
        assert_eq!(col.cast(LogicalType::Boolean).unwrap(), col);
    }

    #[test]
    fn cast_to_string_uses_canonical_formats() {
        let dates = Column::Date(vec![Some(0), None]);
        assert_eq!(
            dates.cast(LogicalType::String).unwrap(),
            strings(&[Some("1970-01-01"), None])
        );

        let flags = Column::from(vec![Some(false)]);
        assert_eq!(flags.cast(LogicalType::String).unwrap(), strings(&[Some("false")]));

        let ts = Column::Timestamp(vec![Some(1)]);
        assert_eq!(
            ts.cast(LogicalType::String).unwrap(),
            strings(&[Some("1970-01-01 00:00:00.000001")])
        );
    }

    #[test]
    fn non_string_casts_go_through_text() {
        let ints = Column::from(vec![Some(2i64), None]);
        assert_eq!(
            ints.cast(LogicalType::Float64).unwrap(),
            Column::Float64(vec![Some(2.0), None])
        );

        let floats = Column::from(vec![Some(1.5f64)]);
        assert!(matches!(
            floats.cast(LogicalType::Int64),
            Err(EngineError::TypeMismatch { row: 0, .. })
        ));
    }

    #[test]
    fn slice_clips_to_length() {
        let col = Column::from(vec![Some(1i64), Some(2), Some(3)]);
        assert_eq!(col.slice(1, 10), Column::from(vec![Some(2i64), Some(3)]));
        assert!(col.slice(5, 1).is_empty());
    }

    #[test]
    fn extend_requires_matching_types() {
        let mut col = Column::from(vec![Some(1i64)]);
        col.extend_from(&Column::from(vec![None::<i64>])).unwrap();
        assert_eq!(col.len(), 2);
        assert!(col.extend_from(&strings(&[Some("a")])).is_err());
    }
}
