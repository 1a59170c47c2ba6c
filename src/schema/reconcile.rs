// src/schema/reconcile.rs

use std::collections::HashMap;

use tracing::debug;

use super::SchemaDeclaration;
use crate::error::{EngineError, Result};
use crate::table::{Field, LogicalType, Schema, Table};

/// Re-type the columns of `table` according to `declaration`.
///
/// - every declared name must exist in the table; all missing names are
///   reported together, in declaration order
/// - a later declaration of the same name wins
/// - undeclared columns keep their current type
/// - the result keeps the table's column order
pub fn reconcile(table: &Table, declaration: &SchemaDeclaration) -> Result<Table> {
    let mut missing = Vec::new();
    for field in &declaration.fields {
        if table.column(&field.name).is_none() && !missing.contains(&field.name) {
            missing.push(field.name.clone());
        }
    }
    if !missing.is_empty() {
        return Err(EngineError::UnknownColumn { columns: missing });
    }

    let declared: HashMap<&str, LogicalType> = declaration
        .fields
        .iter()
        .map(|f| (f.name.as_str(), f.logical_type))
        .collect();

    let target = Schema::new(
        table
            .schema()
            .fields
            .into_iter()
            .map(|field| match declared.get(field.name.as_str()) {
                Some(&ty) => Field::new(field.name, ty),
                None => field,
            })
            .collect(),
    );

    debug!(declared = declared.len(), columns = target.len(), "reconciling schema");
    table.cast(&target)
}
