use std::sync::LazyLock;

use regex::Regex;

use crate::error::ParseError;
use crate::timetable::models::ClassOccurrence;

pub mod models;

use models::{RawRow, RawSheet};

/// Callback the sheets are wrapped in
const WRAPPER: &str = "google.visualization.Query.setResponse";

/// Index of the row holding the time slots
const HEADER_ROW: usize = 1;

/// First row holding classes
const FIRST_DATA_ROW: usize = 2;

/// Value used when the sheet doesn't give the information
pub const UNKNOWN: &str = "N/A";

/// Content of the first parenthesis
static SECTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([^)]+)\)").expect("valid section regex"));

/// First parenthesis and the spaces before it
static PARENTHESIS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\([^)]+\)").expect("valid parenthesis regex"));

/// A decoded cell of the timetable
#[derive(Debug, PartialEq, Eq)]
pub struct Cell {
    pub course: String,
    pub section: String,
    pub instructor: String,
}

/// Strip the callback wrapper and returns the JSON inside
pub fn unwrap_envelope(text: &str) -> Result<&str, ParseError> {
    let marker = text.find(WRAPPER).ok_or(ParseError::MissingWrapper)?;

    let after_marker = &text[marker..];
    let start = after_marker
        .find('(')
        .map(|i| marker + i + 1)
        .ok_or(ParseError::EmptyPayload)?;
    let end = text.rfind(')').ok_or(ParseError::EmptyPayload)?;

    if end <= start {
        return Err(ParseError::EmptyPayload);
    }

    let json = text[start..end].trim();
    if json.is_empty() {
        return Err(ParseError::EmptyPayload);
    }

    Ok(json)
}

/// Parse a sheet response into its rows
pub fn parse(text: &str) -> Result<Vec<RawRow>, ParseError> {
    let sheet: RawSheet = serde_json::from_str(unwrap_envelope(text)?)?;

    match sheet.table.and_then(|table| table.rows) {
        Some(rows) if !rows.is_empty() => Ok(rows),
        _ => Err(ParseError::NoRows),
    }
}

/// Time slots given by the header row.
///
/// Only labels with a separator are kept, so the list may be shorter
/// than the row.
pub fn time_slots(rows: &[RawRow]) -> Vec<String> {
    rows.get(HEADER_ROW)
        .map(|header| {
            header
                .cells()
                .iter()
                .filter_map(|cell| cell.as_ref().and_then(|cell| cell.text()))
                .filter(|label| label.contains('-'))
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

/// Decode a cell written as `COURSE(SECTION)` then the instructor on a
/// second line
pub fn decode_cell(value: &str) -> Option<Cell> {
    if value.is_empty() {
        return None;
    }

    let mut lines = value.split('\n');
    let first = lines.next().unwrap_or_default();
    let instructor = match lines.next() {
        Some(name) if !name.is_empty() => name.to_owned(),
        _ => UNKNOWN.to_owned(),
    };

    let section = SECTION
        .captures(first)
        .and_then(|captures| captures.get(1))
        .map_or_else(|| UNKNOWN.to_owned(), |m| m.as_str().to_owned());

    let course = PARENTHESIS.replace(first, "").trim().to_owned();
    if course.is_empty() {
        return None;
    }

    Some(Cell {
        course,
        section,
        instructor,
    })
}

/// Classes of one sheet.
///
/// The room comes from the first column of each row, the time slot from
/// the header label at `column - 1`.
pub fn occurrences(day: &str, rows: &[RawRow], slots: &[String]) -> Vec<ClassOccurrence> {
    let mut classes = vec![];

    for row in rows.iter().skip(FIRST_DATA_ROW) {
        let room = row
            .cells()
            .first()
            .and_then(Option::as_ref)
            .and_then(models::RawCell::label)
            .unwrap_or_else(|| UNKNOWN.to_owned());

        for column in 1..row.cells().len() {
            let (Some(value), Some(time)) = (row.text(column), slots.get(column - 1)) else {
                continue;
            };

            if let Some(cell) = decode_cell(value) {
                classes.push(ClassOccurrence {
                    course: cell.course,
                    section: cell.section,
                    instructor: cell.instructor,
                    room: room.clone(),
                    day: day.to_owned(),
                    time: time.clone(),
                });
            }
        }
    }

    classes
}
