use std::{fs, path::Path};

use dialoguer::MultiSelect;
use serde::{Deserialize, Serialize};

use crate::error::SelectionError;
use crate::timetable::models::Snapshot;

const DISCLAIMER: &str = "(select with SPACE, confirm with ENTER)";

/// Classes followed by the user, as `course - section`.
///
/// Insertion order is kept: it decides the colour of each course.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Selection(Vec<String>);

impl From<Vec<String>> for Selection {
    fn from(entries: Vec<String>) -> Self {
        let mut selection = Self::default();
        for entry in entries {
            selection.add(entry);
        }

        selection
    }
}

impl From<Selection> for Vec<String> {
    fn from(selection: Selection) -> Self {
        selection.0
    }
}

impl Selection {
    pub fn contains(&self, entry: &str) -> bool {
        self.0.iter().any(|e| e == entry)
    }

    /// Add a class, returns false if it was already selected
    pub fn add(&mut self, entry: String) -> bool {
        if self.contains(&entry) {
            return false;
        }
        self.0.push(entry);

        true
    }

    /// Remove a class, returns false if it wasn't selected
    pub fn remove(&mut self, entry: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|e| e != entry);

        self.0.len() != before
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Load the saved selection.
///
/// A missing or unreadable file gives an empty selection.
pub fn load(path: &Path) -> Selection {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            log::debug!("no saved selection at {}: {e}", path.display());
            return Selection::default();
        }
    };

    serde_json::from_str(&raw).unwrap_or_else(|e| {
        log::warn!("failed to parse the selection in {}: {e}", path.display());
        Selection::default()
    })
}

/// Overwrite the saved selection
pub fn save(selection: &Selection, path: &Path) -> Result<(), SelectionError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string(selection)?)?;

    Ok(())
}

/// Every class of the timetable, sorted and without duplicates
pub fn classes(snapshot: &Snapshot) -> Vec<String> {
    let mut classes: Vec<String> = snapshot.occurrences.iter().map(|c| c.entry()).collect();
    classes.sort();
    classes.dedup();

    classes
}

/// Classes containing the query, ignoring case
pub fn search<'a>(classes: &'a [String], query: &str) -> Vec<&'a String> {
    let query = query.to_lowercase();

    classes
        .iter()
        .filter(|class| class.to_lowercase().contains(&query))
        .collect()
}

/// Let the user tick the classes they follow.
///
/// Only the classes matching `query` are shown, the selection of the
/// hidden ones is left untouched.
pub fn pick(
    classes: &[String],
    selection: &Selection,
    query: &str,
) -> Result<Selection, SelectionError> {
    let shown = search(classes, query);
    let defaults: Vec<bool> = shown.iter().map(|class| selection.contains(class)).collect();

    let ticked = MultiSelect::new()
        .with_prompt(format!("Pick your classes {DISCLAIMER}"))
        .items(&shown)
        .defaults(&defaults)
        .interact()?;

    Ok(apply(selection, &shown, &ticked))
}

/// New selection once the shown classes are (un)ticked
fn apply(selection: &Selection, shown: &[&String], ticked: &[usize]) -> Selection {
    let mut updated = selection.clone();
    for (i, class) in shown.iter().enumerate() {
        if ticked.contains(&i) {
            updated.add((*class).clone());
        } else {
            updated.remove(class);
        }
    }

    updated
}
