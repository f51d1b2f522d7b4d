use std::collections::HashMap;

use crate::timetable::models::ClassOccurrence;

/// A cell of the grid, spanning one or more time slots
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GridCell {
    /// Slot where the cell starts
    pub slot: String,

    /// Number of time slots the cell takes up, at least 1
    pub col_span: usize,

    /// Classes of the starting slot, empty for an empty cell
    pub occurrences: Vec<ClassOccurrence>,

    pub is_empty: bool,
}

impl GridCell {
    pub fn empty(slot: &str) -> Self {
        Self {
            slot: slot.to_owned(),
            col_span: 1,
            occurrences: vec![],
            is_empty: true,
        }
    }

    /// Class giving its identity (and colour) to the cell
    pub fn main(&self) -> Option<&ClassOccurrence> {
        self.occurrences.first()
    }
}

#[derive(Clone, Debug)]
pub struct DayRow {
    /// Day's name
    pub day: String,
    /// Ordered cells, their spans add up to the number of slots
    pub cells: Vec<GridCell>,
}

#[derive(Clone, Debug, Default)]
pub struct Grid {
    /// Ordered time slots, i.e. the columns
    pub slots: Vec<String>,
    /// Ordered days, i.e. the rows
    pub days: Vec<DayRow>,
    /// Display colour of each selected course
    pub colors: HashMap<String, &'static str>,
}

impl Grid {
    /// Colour of a course, as `#rrggbb`
    pub fn color(&self, course: &str) -> Option<&'static str> {
        self.colors.get(course).copied()
    }

    /// True if no class is shown
    pub fn is_blank(&self) -> bool {
        self.days
            .iter()
            .all(|day| day.cells.iter().all(|cell| cell.is_empty))
    }
}
