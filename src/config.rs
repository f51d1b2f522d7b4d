use std::{path::PathBuf, time::Duration};

use directories_next::ProjectDirs;

/// Region read in the metadata when none is given
pub const DEFAULT_REGION: &str = "karachi";

/// Days never shown
pub const DEFAULT_EXCLUDED_DAYS: &[&str] = &["Saturday"];

/// Name of the file holding the selected classes
const SELECTION_FILE: &str = "selection.json";

/// Everything needed to fetch and keep the timetable up to date
#[derive(Clone, Debug)]
pub struct Config {
    /// Endpoint describing where the sheets are
    pub source: String,
    /// Key of the metadata document to read
    pub region: String,
    /// Sheets dropped after normalization
    pub excluded_days: Vec<String>,
    /// Where the selection is persisted
    pub selection_path: PathBuf,
    /// Timeout of every HTTP request
    pub timeout: Duration,
    /// Delay between two automatic refreshes
    pub refresh_every: Duration,
    pub user_agent: String,
}

impl Config {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            region: DEFAULT_REGION.to_owned(),
            excluded_days: DEFAULT_EXCLUDED_DAYS
                .iter()
                .map(|day| (*day).to_owned())
                .collect(),
            selection_path: default_selection_path(),
            timeout: Duration::from_secs(5),
            refresh_every: Duration::from_secs(60 * 60),
            user_agent: format!("tabletor/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Selection file inside the user's data directory, or the working
/// directory when the platform gives none
pub fn default_selection_path() -> PathBuf {
    ProjectDirs::from("", "", "tabletor").map_or_else(
        || PathBuf::from(SELECTION_FILE),
        |dirs| dirs.data_dir().join(SELECTION_FILE),
    )
}
