use std::collections::HashMap;

use crate::filter::Selection;
use crate::timetable::models::{weekday, ClassOccurrence, Snapshot};

pub mod models;

use models::{DayRow, Grid, GridCell};

/// Hours below this one are afternoon hours written without AM/PM
const AFTERNOON_BEFORE: u32 = 7;

/// Number of slots always taken by a lab
const LAB_SPAN: usize = 3;

/// Colours given to the courses, in order
pub const PALETTE: [&str; 10] = [
    "#4e79a7", "#f28e2c", "#e15759", "#76b7b2", "#59a14f", "#edc949", "#af7aa1", "#ff9da7",
    "#9c755f", "#bab0ab",
];

/// Rank of a day in the week, unknown labels come last
pub fn day_rank(day: &str) -> u32 {
    weekday(day).map_or(7, |d| d.num_days_from_monday())
}

/// Start of a slot, in minutes since midnight.
///
/// The source writes `1:00` for 13:00, so hours before 7 are moved to
/// the afternoon. Labels without a readable start are worth 0.
pub fn slot_minutes(label: &str) -> u32 {
    let start = label.split('-').next().unwrap_or_default();
    if !start.contains(':') {
        return 0;
    }

    let number = |s: &str| {
        let s = s.trim();
        if s.is_empty() {
            Some(0)
        } else {
            s.parse::<u32>().ok()
        }
    };

    let mut parts = start.split(':');
    let Some(mut hours) = parts.next().and_then(number) else {
        return 0;
    };
    let minutes = parts.next().and_then(number).unwrap_or(0);

    if hours < AFTERNOON_BEFORE {
        hours += 12;
    }

    hours
        .checked_mul(60)
        .and_then(|total| total.checked_add(minutes))
        .unwrap_or(0)
}

/// Stable sort of the slots by starting time
pub fn sort_slots(slots: &mut [String]) {
    slots.sort_by_key(|slot| slot_minutes(slot));
}

/// Stable sort of the days in week order
pub fn sort_days(days: &mut [String]) {
    days.sort_by_key(|day| day_rank(day));
}

/// Distinct values, in first-seen order
fn distinct<'a>(values: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut seen = vec![];
    for value in values {
        if !seen.contains(value) {
            seen.push(value.clone());
        }
    }

    seen
}

/// Colour of every selected course, cycling through the palette in
/// selection order
pub fn colors(selection: &Selection) -> HashMap<String, &'static str> {
    let mut colors = HashMap::new();
    for entry in selection.iter() {
        let course = entry.split(" - ").next().unwrap_or_default();
        if !colors.contains_key(course) {
            colors.insert(course.to_owned(), PALETTE[colors.len() % PALETTE.len()]);
        }
    }

    colors
}

fn is_lab(course: &str) -> bool {
    course.to_lowercase().contains("lab")
}

fn same_class(a: &ClassOccurrence, b: &ClassOccurrence) -> bool {
    a.course == b.course && a.section == b.section && a.instructor == b.instructor
}

/// Lay out the selected classes of a snapshot.
///
/// Days and slots are the ones seen in the whole snapshot, so the grid
/// keeps its shape whatever the selection.
pub fn build(snapshot: &Snapshot, selection: &Selection) -> Grid {
    let mut days = distinct(snapshot.occurrences.iter().map(|c| &c.day));
    sort_days(&mut days);

    let mut slots = distinct(snapshot.occurrences.iter().map(|c| &c.time));
    sort_slots(&mut slots);

    // Classes of each (day, slot), by position
    let mut schedule: HashMap<(usize, usize), Vec<&ClassOccurrence>> = HashMap::new();
    for class in snapshot
        .occurrences
        .iter()
        .filter(|class| selection.contains(&class.entry()))
    {
        let day = days.iter().position(|d| *d == class.day);
        let slot = slots.iter().position(|s| *s == class.time);
        if let (Some(day), Some(slot)) = (day, slot) {
            schedule.entry((day, slot)).or_default().push(class);
        }
    }

    let rows = days
        .iter()
        .enumerate()
        .map(|(d, day)| {
            let bucket = |s: usize| schedule.get(&(d, s)).map(Vec::as_slice).unwrap_or_default();

            let mut cells = vec![];
            let mut i = 0;
            while i < slots.len() {
                let classes = bucket(i);
                let Some(first) = classes.first() else {
                    cells.push(GridCell::empty(&slots[i]));
                    i += 1;
                    continue;
                };

                let mut col_span = if is_lab(&first.course) {
                    LAB_SPAN
                } else {
                    1 + (i + 1..slots.len())
                        .take_while(|&s| {
                            bucket(s)
                                .first()
                                .is_some_and(|next| same_class(next, first))
                        })
                        .count()
                };
                col_span = col_span.min(slots.len() - i);

                cells.push(GridCell {
                    slot: slots[i].clone(),
                    col_span,
                    occurrences: classes.iter().map(|&c| c.clone()).collect(),
                    is_empty: false,
                });
                i += col_span;
            }

            DayRow {
                day: day.clone(),
                cells,
            }
        })
        .collect();

    Grid {
        slots,
        days: rows,
        colors: colors(selection),
    }
}
