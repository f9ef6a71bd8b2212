//! Column type mapping.
//!
//! Assigns each result column a semantic type for the rendering layer,
//! from the declared source type when there is one and from the first
//! row's value otherwise.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

use crate::db::{RawColumn, Row, Value};

/// Rendering-level type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    Boolean,
    Number,
    String,
    Date,
}

/// How a semantic type was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeFidelity {
    /// Mapped from a recognized declared source type.
    Precise,
    /// Guessed from a sample value, or defaulted.
    Inferred,
}

/// Type information for one output column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnTypeDescriptor {
    pub name: String,
    #[serde(rename = "evidenceType")]
    pub semantic_type: SemanticType,
    #[serde(rename = "typeFidelity")]
    pub fidelity: TypeFidelity,
}

impl ColumnTypeDescriptor {
    pub fn new(name: impl Into<String>, semantic_type: SemanticType, fidelity: TypeFidelity) -> Self {
        Self {
            name: name.into(),
            semantic_type,
            fidelity,
        }
    }
}

fn iso_datetime_prefix() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}").expect("ISO-8601 pattern is valid")
    })
}

/// Uppercases a type name, drops parenthesized parameters and collapses
/// whitespace: `"timestamp(3)  with time zone"` → `"TIMESTAMP WITH TIME ZONE"`.
fn canonical_type_name(declared: &str) -> String {
    let mut depth = 0usize;
    let stripped: String = declared
        .chars()
        .filter(|&c| match c {
            '(' => {
                depth += 1;
                false
            }
            ')' => {
                depth = depth.saturating_sub(1);
                false
            }
            _ => depth == 0,
        })
        .collect();
    stripped
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// `INT`, `INTEGER`, `INT4`, `BIGINT`, `UTINYINT`, Arrow's `INT64`/`UINT8`.
fn is_integer_name(name: &str) -> bool {
    let name = name.strip_prefix('U').unwrap_or(name);
    let name = ["BIG", "SMALL", "TINY", "HUGE", "MEDIUM"]
        .iter()
        .find_map(|width| name.strip_prefix(width))
        .unwrap_or(name);
    match name.strip_prefix("INT") {
        Some("EGER") => true,
        Some(bits) => bits.chars().all(|c| c.is_ascii_digit()),
        None => false,
    }
}

fn is_float_name(name: &str) -> bool {
    matches!(name, "DOUBLE" | "DOUBLE PRECISION" | "REAL")
        || name
            .strip_prefix("FLOAT")
            .is_some_and(|bits| bits.chars().all(|c| c.is_ascii_digit()))
}

/// Maps a declared source type to a semantic type. `None` if unrecognized.
///
/// Matches type families rather than exact names, so SQL spellings and
/// Arrow names (`Int64`, `Float64`, `Date32`, `Utf8`) land in the same place.
pub fn map_declared_type(declared: &str) -> Option<SemanticType> {
    let upper = declared.to_uppercase();
    if upper.contains("DECIMAL") || upper.contains("NUMERIC") {
        return Some(SemanticType::Number);
    }

    let name = canonical_type_name(declared);
    match name.as_str() {
        n if is_integer_name(n) || is_float_name(n) => Some(SemanticType::Number),
        "VARCHAR" | "CHAR" | "CHARACTER" | "CHARACTER VARYING" | "BPCHAR" | "TEXT" | "STRING"
        | "UTF8" | "LARGEUTF8" | "UTF8VIEW" => Some(SemanticType::String),
        n if n.starts_with("DATE") || n.starts_with("TIMESTAMP") => Some(SemanticType::Date),
        "BOOLEAN" | "BOOL" => Some(SemanticType::Boolean),
        _ => None,
    }
}

/// Infers a semantic type from a sample value.
pub fn infer_value_type(value: &Value) -> SemanticType {
    match value {
        Value::BigInt(_) | Value::Number(_) => SemanticType::Number,
        Value::Bool(_) => SemanticType::Boolean,
        Value::Date(_) => SemanticType::Date,
        Value::String(s) if iso_datetime_prefix().is_match(s) => SemanticType::Date,
        Value::String(_) | Value::Null => SemanticType::String,
    }
}

fn describe_declared(column: &RawColumn, first_row: Option<&Row>) -> ColumnTypeDescriptor {
    let declared = column
        .declared_type
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty());

    match declared {
        Some(declared) => match map_declared_type(declared) {
            Some(semantic) => {
                ColumnTypeDescriptor::new(&column.name, semantic, TypeFidelity::Precise)
            }
            // A declared type we do not recognize is not a precise answer.
            None => ColumnTypeDescriptor::new(
                &column.name,
                SemanticType::String,
                TypeFidelity::Inferred,
            ),
        },
        None => {
            let semantic = first_row
                .and_then(|row| row.get(&column.name))
                .map(infer_value_type)
                .unwrap_or(SemanticType::String);
            ColumnTypeDescriptor::new(&column.name, semantic, TypeFidelity::Inferred)
        }
    }
}

/// Builds one descriptor per column.
///
/// With column metadata, output follows the declared column order. Without
/// it, output follows the field order of the first row. No columns and no
/// rows gives an empty list.
pub fn map_column_types(columns: &[RawColumn], rows: &[Row]) -> Vec<ColumnTypeDescriptor> {
    let first_row = rows.first();

    if !columns.is_empty() {
        return columns
            .iter()
            .map(|column| describe_declared(column, first_row))
            .collect();
    }

    match first_row {
        Some(row) => row
            .iter()
            .map(|(name, value)| {
                ColumnTypeDescriptor::new(name, infer_value_type(value), TypeFidelity::Inferred)
            })
            .collect(),
        None => Vec::new(),
    }
}
