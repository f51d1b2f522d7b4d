use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

/// Metadata document, one entry per region
pub type Metadata = HashMap<String, Region>;

#[derive(Clone, Debug, Deserialize)]
pub struct Region {
    /// Base URL of the sheets, the gid is appended to it
    pub url: String,
    /// One sheet per day
    pub codes: Vec<SheetCode>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SheetCode {
    /// Day's name
    pub name: String,
    pub gid: String,
}

/// Payload of a sheet once the callback wrapper is removed.
///
/// Every field of the source may be missing or `null`.
#[derive(Debug, Default, Deserialize)]
pub struct RawSheet {
    #[serde(default)]
    pub table: Option<RawTable>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawTable {
    #[serde(default)]
    pub rows: Option<Vec<RawRow>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawRow {
    #[serde(default)]
    pub c: Option<Vec<Option<RawCell>>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawCell {
    #[serde(default)]
    pub v: Option<Value>,
}

impl RawRow {
    /// Cells of the row, a row without any is empty
    pub fn cells(&self) -> &[Option<RawCell>] {
        self.c.as_deref().unwrap_or_default()
    }

    /// Value of the cell at `index`, if it holds a non-empty string
    pub fn text(&self, index: usize) -> Option<&str> {
        self.cells()
            .get(index)
            .and_then(Option::as_ref)
            .and_then(RawCell::text)
    }
}

impl RawCell {
    /// Non-empty string value
    pub fn text(&self) -> Option<&str> {
        match &self.v {
            Some(Value::String(s)) if !s.is_empty() => Some(s),
            _ => None,
        }
    }

    /// Value shown as text, numbers included
    pub fn label(&self) -> Option<String> {
        match &self.v {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }
}
