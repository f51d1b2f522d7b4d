use thiserror::Error;

/// Why a fetch ended with nothing to show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EmptyCause {
    /// Every sheet failed to load
    #[error("no timetable data could be loaded, all sheets failed to load or were empty")]
    NoSheetsLoaded,

    /// Sheets loaded, but every class was dropped afterwards
    #[error("timetable data was loaded, but no valid classes were found after filtering")]
    AllFiltered,
}

/// Fatal errors of a fetch cycle
#[derive(Debug, Error)]
pub enum Error {
    #[error("can't build the HTTP client: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to fetch metadata from {url}: {reason}")]
    Metadata { url: String, reason: String },

    #[error("region `{0}` is not described by the metadata")]
    UnknownRegion(String),

    #[error("{0}")]
    Empty(EmptyCause),
}

/// Failure of a single sheet, the sheet is skipped
#[derive(Debug, Error)]
pub enum SheetError {
    #[error("failed to fetch sheet: {0}")]
    Fetch(String),

    #[error("invalid sheet payload: {0}")]
    Parse(#[from] ParseError),
}

/// Payload of a sheet can't be understood
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("response did not contain the expected JSONP wrapper")]
    MissingWrapper,

    #[error("could not extract JSON from the response")]
    EmptyPayload,

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("sheet is empty or has a malformed structure")]
    NoRows,
}

#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("can't write the selection file: {0}")]
    Io(#[from] std::io::Error),

    #[error("can't encode the selection: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("interactive selection failed: {0}")]
    Prompt(#[from] dialoguer::Error),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("nothing to export, no class is selected")]
    NothingSelected,

    #[error("drawing failed: {0}")]
    Draw(String),

    #[error("can't encode the image: {0}")]
    Encode(#[from] image::ImageError),
}
