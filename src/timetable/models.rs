use std::sync::Arc;

use chrono::{DateTime, Utc, Weekday};

/// One scheduled class at a given day and time slot
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassOccurrence {
    /// Course's name
    pub course: String,

    /// Section (group) of the course, `N/A` when the sheet doesn't say
    pub section: String,

    /// Professor's name, `N/A` when the sheet doesn't say
    pub instructor: String,

    /// Room where the class takes place
    pub room: String,

    /// Day's name, as written in the metadata
    pub day: String,

    /// Label of the time slot, i.e.: `1:00-1:45`
    pub time: String,
}

impl ClassOccurrence {
    /// Key used to select a class
    pub fn entry(&self) -> String {
        format!("{} - {}", self.course, self.section)
    }
}

/// Weekday of a day's name, `None` for labels that aren't one
pub fn weekday(day: &str) -> Option<Weekday> {
    day.trim().parse().ok()
}

/// Everything loaded by one fetch cycle
#[derive(Clone, Debug)]
pub struct Snapshot {
    /// Classes in the order they were read
    pub occurrences: Vec<ClassOccurrence>,

    /// Union of the header labels of every loaded sheet, in first-seen order
    pub time_slots: Vec<String>,

    /// Number of sheets that were loaded
    pub sheets_loaded: usize,

    pub fetched_at: DateTime<Utc>,
}

/// Snapshot shared between the refresher and its readers
pub type SharedSnapshot = Arc<Snapshot>;
