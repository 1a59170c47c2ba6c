// src/schema/declaration.rs

use std::fs;
use std::path::Path;

use serde_json::Value as Doc;
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::table::{Field, LogicalType};

/// An ordered list of `(name, type)` declarations loaded from a YAML or JSON
/// file shaped like:
///
/// ```yaml
/// fields:
///   - name: id
///     type: int64
///   - name: comment   # type defaults to string
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SchemaDeclaration {
    pub fields: Vec<Field>,
}

impl SchemaDeclaration {
    pub fn new(fields: Vec<Field>) -> Self {
        SchemaDeclaration { fields }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Load a declaration, picking the parser from the file extension
    /// (`.yaml`, `.yml` or `.json`).
    pub fn load(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        if !matches!(ext.as_str(), "yaml" | "yml" | "json") {
            return Err(EngineError::InvalidSchema(format!(
                "unsupported schema format `.{ext}` (expected .yaml, .yml or .json)"
            )));
        }

        let text = fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => EngineError::FileNotFound {
                path: path.to_path_buf(),
            },
            _ => EngineError::Io(e),
        })?;

        let decl = if ext == "json" {
            Self::from_json_str(&text)?
        } else {
            Self::from_yaml_str(&text)?
        };
        debug!(path = %path.display(), fields = decl.len(), "loaded schema declaration");
        Ok(decl)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        // an empty document parses as null and is reported as a missing key
        let doc: Doc = serde_yaml::from_str(text)
            .map_err(|e| EngineError::InvalidSchema(format!("malformed YAML: {e}")))?;
        Self::from_document(&doc)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let doc: Doc = serde_json::from_str(text)
            .map_err(|e| EngineError::InvalidSchema(format!("malformed JSON: {e}")))?;
        Self::from_document(&doc)
    }

    fn from_document(doc: &Doc) -> Result<Self> {
        let entries = match doc.get("fields") {
            Some(Doc::Array(items)) => items,
            Some(_) => {
                return Err(EngineError::InvalidSchema(
                    "`fields` must be a list".to_string(),
                ))
            }
            None => {
                return Err(EngineError::InvalidSchema(
                    "missing top-level `fields` key".to_string(),
                ))
            }
        };

        let fields = entries
            .iter()
            .enumerate()
            .map(|(i, entry)| parse_field(i, entry))
            .collect::<Result<Vec<_>>>()?;
        Ok(SchemaDeclaration { fields })
    }
}

fn parse_field(index: usize, entry: &Doc) -> Result<Field> {
    let name = match entry.get("name") {
        Some(Doc::String(name)) => name.clone(),
        Some(other) => {
            return Err(EngineError::InvalidSchema(format!(
                "field {index}: `name` must be a string, got {other}"
            )))
        }
        None => {
            return Err(EngineError::InvalidSchema(format!(
                "field {index} is missing `name`"
            )))
        }
    };

    let logical_type = match entry.get("type") {
        None | Some(Doc::Null) => LogicalType::String,
        Some(Doc::String(token)) => {
            token
                .parse::<LogicalType>()
                .map_err(|token| EngineError::UnknownType {
                    token,
                    column: name.clone(),
                })?
        }
        Some(other) => {
            return Err(EngineError::UnknownType {
                token: other.to_string(),
                column: name,
            })
        }
    };

    Ok(Field::new(name, logical_type))
}
