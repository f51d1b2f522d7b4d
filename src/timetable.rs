use chrono::Utc;
use reqwest::{header::ACCEPT, Client};
use tokio::task::JoinSet;

use crate::config::Config;
use crate::error::{EmptyCause, Error, SheetError};
use crate::layout::models::{Grid, GridCell};
use crate::sheet::{
    self,
    models::{Metadata, RawRow, Region},
};
use crate::utils::{
    abbreviate_room, etc_str, line_table,
    models::{Position, TabChar},
    Capitalize,
};

pub mod models;
#[cfg(test)]
pub mod testing;

use models::{weekday, ClassOccurrence, Snapshot};

/// Fetch every sheet of the configured region and build a snapshot.
///
/// A sheet failing to load is skipped, the fetch only fails when
/// nothing is left.
pub async fn fetch(config: &Config) -> Result<Snapshot, Error> {
    // Use custom User-Agent
    let client = Client::builder()
        .user_agent(&config.user_agent)
        .timeout(config.timeout)
        .build()?;

    let region = get_region(&client, config).await?;
    log::debug!("{} sheets described at {}", region.codes.len(), region.url);

    // Sheets are fetched together, a failure doesn't stop the others
    let mut tasks = JoinSet::new();
    for (index, code) in region.codes.into_iter().enumerate() {
        let client = client.clone();
        let url = format!("{}{}", region.url, code.gid);
        tasks.spawn(async move {
            let result = get_sheet(&client, &url).await;
            (index, code.name, result)
        });
    }

    let mut results = vec![];
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(result) => results.push(result),
            Err(e) => log::error!("sheet task failed: {e}"),
        }
    }
    // Keep the metadata order
    results.sort_by_key(|(index, ..)| *index);

    let sheets: Vec<_> = results
        .into_iter()
        .filter_map(|(_, name, result)| match result {
            Ok(rows) => {
                log::debug!("sheet {name}: {} rows", rows.len());
                Some((name, rows))
            }
            Err(e) => {
                log::warn!("skipping sheet {name}: {e}");
                None
            }
        })
        .collect();

    normalize(&sheets, &config.excluded_days)
}

/// Get the sheets' location of the configured region
async fn get_region(client: &Client, config: &Config) -> Result<Region, Error> {
    let failure = |reason: String| Error::Metadata {
        url: config.source.clone(),
        reason,
    };

    let response = client
        .get(&config.source)
        .header(ACCEPT, "application/json")
        .send()
        .await
        .map_err(|e| failure(e.to_string()))?;

    if !response.status().is_success() {
        return Err(failure(response.status().to_string()));
    }

    let mut metadata: Metadata = response.json().await.map_err(|e| failure(e.to_string()))?;

    metadata
        .remove(&config.region)
        .ok_or_else(|| Error::UnknownRegion(config.region.clone()))
}

/// Get the rows of a sheet
async fn get_sheet(client: &Client, url: &str) -> Result<Vec<RawRow>, SheetError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| SheetError::Fetch(e.to_string()))?;

    if !response.status().is_success() {
        return Err(SheetError::Fetch(response.status().to_string()));
    }

    let text = response
        .text()
        .await
        .map_err(|e| SheetError::Fetch(e.to_string()))?;

    Ok(sheet::parse(&text)?)
}

/// True if the day is one of the excluded ones, by name or by weekday
fn is_excluded(day: &str, excluded_days: &[String]) -> bool {
    excluded_days.iter().any(|excluded| {
        excluded.trim().eq_ignore_ascii_case(day.trim())
            || weekday(excluded).is_some_and(|w| weekday(day) == Some(w))
    })
}

/// Flatten the loaded sheets, named after their day, into a snapshot
pub fn normalize(
    sheets: &[(String, Vec<RawRow>)],
    excluded_days: &[String],
) -> Result<Snapshot, Error> {
    let mut occurrences: Vec<ClassOccurrence> = vec![];
    let mut time_slots: Vec<String> = vec![];

    for (day, rows) in sheets {
        let slots = sheet::time_slots(rows);
        occurrences.extend(sheet::occurrences(day, rows, &slots));

        for slot in slots {
            if !time_slots.contains(&slot) {
                time_slots.push(slot);
            }
        }
    }

    occurrences.retain(|class| !is_excluded(&class.day, excluded_days));

    if occurrences.is_empty() {
        return Err(Error::Empty(if sheets.is_empty() {
            EmptyCause::NoSheetsLoaded
        } else {
            EmptyCause::AllFiltered
        }));
    }

    Ok(Snapshot {
        occurrences,
        time_slots,
        sheets_loaded: sheets.len(),
        fetched_at: Utc::now(),
    })
}

/// Lines of text of a class, when it has room for them
fn cell_lines(cell: &GridCell) -> Vec<String> {
    let Some(class) = cell.main() else {
        return vec![];
    };

    let mut course = class.course.clone();
    if cell.occurrences.len() > 1 {
        course = format!("{course} (+{})", cell.occurrences.len() - 1);
    }

    vec![course, abbreviate_room(&class.room), class.instructor.clone()]
}

/// What a day column shows for each slot: the index of the cell covering
/// it and the position of the slot inside the cell
fn columns(grid: &Grid) -> Vec<Vec<(usize, usize)>> {
    grid.days
        .iter()
        .map(|day| {
            day.cells
                .iter()
                .enumerate()
                .flat_map(|(index, cell)| (0..cell.col_span).map(move |offset| (index, offset)))
                .collect()
        })
        .collect()
}

/// Build the timetable as a text table, with the slots as rows and the
/// days as columns
pub fn render(grid: &Grid, cell_length: usize) -> String {
    // Cell length for hours
    let clh = grid
        .slots
        .iter()
        .map(|slot| slot.chars().count())
        .max()
        .unwrap_or_default()
        .max(5)
        + 2;

    let sep = TabChar::Bv.val();
    let columns = columns(grid);
    let lines: Vec<Vec<Vec<String>>> = grid
        .days
        .iter()
        .map(|day| day.cells.iter().map(cell_lines).collect())
        .collect();

    // Text of the n-th line of the cell covering the slot of a day
    let text = |day: usize, slot: usize, line: usize| -> String {
        let Some(&(index, _)) = columns[day].get(slot) else {
            return String::new();
        };
        let cell = &grid.days[day].cells[index];

        // A single slot only has room for the course
        if cell.col_span == 1 && line > 0 {
            return String::new();
        }

        lines[day][index].get(line).cloned().unwrap_or_default()
    };

    let mut table = String::new();
    let empty_skip = vec![None; grid.days.len()];

    // Top of the table
    table.push_str(&line_table(clh, cell_length, Position::Top, &empty_skip));
    table.push('\n');

    // First empty case then day's of the week
    table.push_str(&format!("{sep}{:^clh$}{sep}", "Time"));
    for day in &grid.days {
        let name = etc_str(&day.day.capitalize(), cell_length);
        table.push_str(&format!("{name:^cell_length$}{sep}"));
    }
    table.push('\n');

    // For each slot -- `i` the slot's number
    for (i, slot) in grid.slots.iter().enumerate() {
        // Separator line, classes continuing from the previous slot write
        // their next line instead
        let skip: Vec<Option<String>> = columns
            .iter()
            .enumerate()
            .map(|(j, column)| match column.get(i) {
                Some(&(_, offset)) if offset > 0 => Some(text(j, i, 2 * offset - 1)),
                _ => None,
            })
            .collect();
        table.push_str(&line_table(clh, cell_length, Position::Middle, &skip));
        table.push('\n');

        table.push_str(&format!("{sep}{slot:^clh$}"));
        for (j, column) in columns.iter().enumerate() {
            let offset = column.get(i).map_or(0, |&(_, offset)| offset);
            let data = etc_str(&text(j, i, 2 * offset), cell_length);
            table.push_str(&format!("{sep}{data:^cell_length$}"));
        }
        table.push(sep);
        table.push('\n');
    }

    // Bottom of the table
    table.push_str(&line_table(clh, cell_length, Position::Bottom, &empty_skip));

    table
}

/// Display the timetable
pub fn display(grid: &Grid, cell_length: usize) {
    println!("{}", render(grid, cell_length));
}

#[cfg(test)]
mod tests {
    use super::testing::{one_class, source};
    use super::*;
    use crate::filter::Selection;
    use crate::layout;

    #[tokio::test]
    async fn failing_sheet_is_skipped() {
        let config = source(vec![
            ("Monday", 500, String::new()),
            ("Tuesday", 200, one_class("CS101(A)\nJohn Doe")),
        ])
        .await;

        let snapshot = fetch(&config).await.unwrap();

        assert_eq!(snapshot.sheets_loaded, 1);
        assert_eq!(
            snapshot.occurrences,
            [ClassOccurrence {
                course: "CS101".to_owned(),
                section: "A".to_owned(),
                instructor: "John Doe".to_owned(),
                room: "Academic Block 1".to_owned(),
                day: "Tuesday".to_owned(),
                time: "8:00-8:50".to_owned(),
            }]
        );
        assert_eq!(snapshot.time_slots, ["8:00-8:50", "9:00-9:50"]);
    }

    #[tokio::test]
    async fn unwrapped_sheet_is_skipped() {
        let config = source(vec![
            ("Monday", 200, r#"{"table":{"rows":[]}}"#.to_owned()),
            ("Wednesday", 200, one_class("MT101(B)\nJane Roe")),
        ])
        .await;

        let snapshot = fetch(&config).await.unwrap();

        assert_eq!(snapshot.occurrences.len(), 1);
        assert_eq!(snapshot.occurrences[0].day, "Wednesday");
    }

    #[tokio::test]
    async fn nothing_loaded() {
        let config = source(vec![
            ("Monday", 500, String::new()),
            ("Tuesday", 404, String::new()),
        ])
        .await;

        let error = fetch(&config).await.unwrap_err();

        assert!(matches!(error, Error::Empty(EmptyCause::NoSheetsLoaded)));
    }

    #[tokio::test]
    async fn everything_filtered() {
        let config = source(vec![
            ("Saturday", 200, one_class("CS101(A)\nJohn Doe")),
            ("Monday", 200, one_class("")),
        ])
        .await;

        let error = fetch(&config).await.unwrap_err();

        assert!(matches!(error, Error::Empty(EmptyCause::AllFiltered)));
        assert_eq!(
            error.to_string(),
            "timetable data was loaded, but no valid classes were found after filtering"
        );
    }

    #[tokio::test]
    async fn metadata_errors() {
        let mut config = source(vec![("Monday", 200, one_class("CS101(A)\nJohn Doe"))]).await;

        config.region = "lahore".to_owned();
        assert!(matches!(
            fetch(&config).await.unwrap_err(),
            Error::UnknownRegion(region) if region == "lahore"
        ));

        config.source = config.source.replace("/api/data", "/api/missing");
        assert!(matches!(
            fetch(&config).await.unwrap_err(),
            Error::Metadata { .. }
        ));
    }

    #[test]
    fn excluded_days() {
        let excluded = vec!["Saturday".to_owned()];

        assert!(is_excluded("Saturday", &excluded));
        assert!(is_excluded("sat", &excluded));
        assert!(!is_excluded("Sunday", &excluded));
        assert!(is_excluded("Exams", &["exams".to_owned()]));
    }

    #[test]
    fn rendering() {
        let class = |course: &str, time: &str| ClassOccurrence {
            course: course.to_owned(),
            section: "A".to_owned(),
            instructor: "John Doe".to_owned(),
            room: "Academic Block 1".to_owned(),
            day: "Monday".to_owned(),
            time: time.to_owned(),
        };
        let snapshot = Snapshot {
            occurrences: vec![
                class("CS101", "8:00-8:50"),
                class("CS101", "9:00-9:50"),
                class("MT101", "10:00-10:50"),
            ],
            time_slots: vec![],
            sheets_loaded: 1,
            fetched_at: Utc::now(),
        };
        let selection = Selection::from(vec!["CS101 - A".to_owned(), "MT101 - A".to_owned()]);
        let grid = layout::build(&snapshot, &selection);

        let table = render(&grid, 12);
        let lines: Vec<&str> = table.lines().collect();

        // Top, header, then a separator and a row per slot, bottom
        assert_eq!(lines.len(), 2 + 2 * 3 + 1);
        assert!(lines[1].contains("Monday"));
        assert!(lines[3].contains("CS101"));
        // The run goes on through the separator with the room
        assert!(lines[4].contains("AB 1"));
        assert!(lines[5].contains("John Doe"));
        assert!(lines[7].contains("MT101"));
        assert!(!table.contains("Academic Block"));
    }
}
