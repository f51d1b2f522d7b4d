use std::{
    fs,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use clap::ValueEnum;
use image::{ImageFormat, RgbImage};
use plotters::{
    prelude::*,
    style::{
        register_font,
        text_anchor::{HPos, Pos, VPos},
        FontStyle,
    },
};

use crate::error::ExportError;
use crate::layout::models::{Grid, GridCell};
use crate::utils::{abbreviate_room, etc_str, Capitalize};

/// Fonts tried when none is given
const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Family name the font is registered under
const FAMILY: &str = "sans-serif";

/// Every size is multiplied by this, for a sharper picture
const SCALE: u32 = 2;
/// Width the grid is stretched to
const TARGET_WIDTH: u32 = 1200;
/// Column holding the row titles
const LABEL_WIDTH: u32 = 120;
const MIN_SLOT_WIDTH: u32 = 80;
const HEADER_HEIGHT: u32 = 30;
const DAY_HEIGHT: u32 = 28;
const ROW_HEIGHT: u32 = 90;

const BORDER: RGBColor = RGBColor(0xdd, 0xdd, 0xdd);
const HEADER: RGBColor = RGBColor(0x2c, 0x3e, 0x50);
const DAY_BAND: RGBColor = RGBColor(0xe8, 0xec, 0xf1);
const EMPTY: RGBColor = RGBColor(0xf5, 0xf5, 0xf5);
const TEXT: RGBColor = RGBColor(0x33, 0x33, 0x33);

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Png,
    Jpg,
}

impl Format {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpg => "jpg",
        }
    }

    fn image_format(self) -> ImageFormat {
        match self {
            Self::Png => ImageFormat::Png,
            Self::Jpg => ImageFormat::Jpeg,
        }
    }
}

/// File written when no path is given
pub fn default_path(format: Format) -> PathBuf {
    PathBuf::from(format!("timetable.{}", format.extension()))
}

/// Register the font used for the labels, returns false if none could
/// be loaded
pub fn load_font(path: Option<&Path>) -> bool {
    static LOADED: OnceLock<bool> = OnceLock::new();

    *LOADED.get_or_init(|| {
        let candidates: Vec<PathBuf> = match path {
            Some(path) => vec![path.to_path_buf()],
            None => FONT_CANDIDATES.iter().map(PathBuf::from).collect(),
        };

        for candidate in candidates {
            let Ok(bytes) = fs::read(&candidate) else {
                continue;
            };
            // Fonts have to live as long as the program
            let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
            if register_font(FAMILY, FontStyle::Normal, bytes).is_ok() {
                log::debug!("using font {}", candidate.display());
                return true;
            }
            log::warn!("invalid font {}", candidate.display());
        }

        false
    })
}

/// Colour from `#rrggbb`
pub fn rgb(hex: &str) -> RGBColor {
    let hex = hex.trim_start_matches('#');
    let channel = |i: usize| {
        hex.get(i..i + 2)
            .and_then(|c| u8::from_str_radix(c, 16).ok())
            .unwrap_or(0x88)
    };

    RGBColor(channel(0), channel(2), channel(4))
}

/// Pixel geometry of an exported grid
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Geometry {
    pub slot_width: u32,
    pub width: u32,
    pub height: u32,
}

impl Geometry {
    pub fn new(grid: &Grid) -> Self {
        let slots = u32::try_from(grid.slots.len()).unwrap_or(u32::MAX).max(1);
        let days = u32::try_from(grid.days.len()).unwrap_or(u32::MAX);

        let slot_width = ((TARGET_WIDTH - LABEL_WIDTH) / slots).max(MIN_SLOT_WIDTH);

        Self {
            slot_width: slot_width * SCALE,
            width: (LABEL_WIDTH + slot_width * slots) * SCALE,
            height: (2 * HEADER_HEIGHT + days * (DAY_HEIGHT + ROW_HEIGHT)) * SCALE,
        }
    }

    /// Left of the `n`-th slot column
    pub fn slot_x(&self, n: usize) -> i32 {
        px(LABEL_WIDTH * SCALE) + px(self.slot_width) * i32::try_from(n).unwrap_or(i32::MAX)
    }

    /// Top of the `n`-th day's cell row
    pub fn row_y(n: usize) -> i32 {
        let n = i32::try_from(n).unwrap_or(i32::MAX);
        px((2 * HEADER_HEIGHT + DAY_HEIGHT) * SCALE) + n * px((DAY_HEIGHT + ROW_HEIGHT) * SCALE)
    }
}

fn px(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn draw_error(e: impl std::fmt::Display) -> ExportError {
    ExportError::Draw(e.to_string())
}

/// Texts of a class box
fn class_lines(cell: &GridCell) -> Vec<String> {
    cell.occurrences
        .iter()
        .flat_map(|class| {
            [
                class.course.clone(),
                abbreviate_room(&class.room),
                class.instructor.clone(),
            ]
        })
        .collect()
}

/// Draw the grid and write it as an image.
///
/// Without `labels` only the coloured grid is drawn.
pub fn export(grid: &Grid, path: &Path, format: Format, labels: bool) -> Result<(), ExportError> {
    if grid.is_blank() {
        return Err(ExportError::NothingSelected);
    }

    let geometry = Geometry::new(grid);
    let (width, height) = (geometry.width, geometry.height);
    let mut buffer = vec![0u8; (width as usize) * (height as usize) * 3];

    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        root.fill(&WHITE).map_err(draw_error)?;

        let font_size = f64::from(11 * SCALE);
        let text = |color: &RGBColor, pos: Pos| (FAMILY, font_size).into_font().color(color).pos(pos);
        let centered = Pos::new(HPos::Center, VPos::Center);
        let label = |content: &str, at: (i32, i32), color: &RGBColor| -> Result<(), ExportError> {
            if labels {
                root.draw(&Text::new(content.to_owned(), at, text(color, centered)))
                    .map_err(draw_error)?;
            }
            Ok(())
        };
        let boxed = |from: (i32, i32), to: (i32, i32), fill: &RGBColor| -> Result<(), ExportError> {
            root.draw(&Rectangle::new([from, to], fill.filled()))
                .map_err(draw_error)?;
            root.draw(&Rectangle::new([from, to], BORDER.stroke_width(1)))
                .map_err(draw_error)?;
            Ok(())
        };

        let header_height = px(HEADER_HEIGHT * SCALE);
        let label_width = px(LABEL_WIDTH * SCALE);
        let slot_width = px(geometry.slot_width);
        let full_width = px(width);

        // Header: slot numbers then time labels
        for (row, title) in ["Slots", "Time"].into_iter().enumerate() {
            let top = header_height * i32::try_from(row).unwrap_or_default();
            let bottom = top + header_height;
            boxed((0, top), (label_width, bottom), &HEADER)?;
            label(title, (label_width / 2, top + header_height / 2), &WHITE)?;

            for (n, slot) in grid.slots.iter().enumerate() {
                let x = geometry.slot_x(n);
                boxed((x, top), (x + slot_width, bottom), &HEADER)?;
                let content = if row == 0 {
                    (n + 1).to_string()
                } else {
                    slot.clone()
                };
                label(&content, (x + slot_width / 2, top + header_height / 2), &WHITE)?;
            }
        }

        let day_height = px(DAY_HEIGHT * SCALE);
        let row_height = px(ROW_HEIGHT * SCALE);
        let line_height = px(13 * SCALE);
        let chars_per_slot = geometry.slot_width as usize / (7 * SCALE as usize);

        for (d, day) in grid.days.iter().enumerate() {
            let top = Geometry::row_y(d);
            let bottom = top + row_height;

            // Day's band across the whole grid
            boxed((0, top - day_height), (full_width, top), &DAY_BAND)?;
            label(&day.day.capitalize(), (full_width / 2, top - day_height / 2), &TEXT)?;

            // Row titles
            boxed((0, top), (label_width, bottom), &EMPTY)?;
            for (l, title) in ["Subject", "Classroom", "Teacher"].into_iter().enumerate() {
                let offset = i32::try_from(l).unwrap_or_default() - 1;
                let y = top + row_height / 2 + offset * line_height;
                label(title, (label_width / 2, y), &TEXT)?;
            }

            let mut n = 0;
            for cell in &day.cells {
                let x = geometry.slot_x(n);
                let right = x + slot_width * i32::try_from(cell.col_span).unwrap_or(1);
                n += cell.col_span;

                let Some(class) = cell.main() else {
                    boxed((x, top), (right, bottom), &EMPTY)?;
                    continue;
                };
                log::debug!(
                    "{} at {} on {} slots, {}",
                    day.day,
                    cell.slot,
                    cell.col_span,
                    class.entry()
                );
                let fill = grid.color(&class.course).map_or(BORDER, rgb);
                boxed((x, top), (right, bottom), &fill)?;

                let lines = class_lines(cell);
                let first = top + row_height / 2
                    - line_height * (i32::try_from(lines.len()).unwrap_or_default() - 1) / 2;
                for (l, line) in lines.iter().enumerate() {
                    let y = first + line_height * i32::try_from(l).unwrap_or_default();
                    if y < top || y > bottom {
                        continue;
                    }
                    let line = etc_str(line, chars_per_slot * cell.col_span);
                    label(&line, ((x + right) / 2, y), &WHITE)?;
                }
            }
        }

        root.present().map_err(draw_error)?;
    }

    let picture = RgbImage::from_raw(width, height, buffer)
        .ok_or_else(|| ExportError::Draw("buffer doesn't match the image size".to_owned()))?;
    picture.save_with_format(path, format.image_format())?;

    log::info!("timetable exported to {}", path.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::filter::Selection;
    use crate::layout;
    use crate::timetable::models::{ClassOccurrence, Snapshot};

    fn grid(selected: &[&str]) -> Grid {
        let class = |course: &str, day: &str, time: &str| ClassOccurrence {
            course: course.to_owned(),
            section: "A".to_owned(),
            instructor: "John Doe".to_owned(),
            room: "Academic Block 1".to_owned(),
            day: day.to_owned(),
            time: time.to_owned(),
        };
        let snapshot = Snapshot {
            occurrences: vec![
                class("CS101", "Monday", "8:00-8:50"),
                class("CS101", "Monday", "9:00-9:50"),
                class("MT101", "Tuesday", "10:00-10:50"),
            ],
            time_slots: vec![],
            sheets_loaded: 2,
            fetched_at: Utc::now(),
        };
        let selection = Selection::from(selected.iter().map(|s| (*s).to_owned()).collect::<Vec<_>>());

        layout::build(&snapshot, &selection)
    }

    #[test]
    fn colors_and_paths() {
        assert_eq!(rgb("#4e79a7"), RGBColor(0x4e, 0x79, 0xa7));
        assert_eq!(rgb("oops"), RGBColor(0x88, 0x88, 0x88));
        assert_eq!(default_path(Format::Png), PathBuf::from("timetable.png"));
        assert_eq!(default_path(Format::Jpg), PathBuf::from("timetable.jpg"));
    }

    #[test]
    fn geometry() {
        let geometry = Geometry::new(&grid(&["CS101 - A"]));

        assert_eq!(geometry.slot_width, 360 * SCALE);
        assert_eq!(geometry.width, 1200 * SCALE);
        assert_eq!(geometry.height, (60 + 2 * 118) * SCALE);
    }

    #[test]
    fn png_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("timetable.png");
        let grid = grid(&["CS101 - A", "MT101 - A"]);

        export(&grid, &path, Format::Png, false).unwrap();

        let image = image::open(&path).unwrap().to_rgb8();
        let geometry = Geometry::new(&grid);
        assert_eq!(image.dimensions(), (geometry.width, geometry.height));

        // Middle of the Monday run, coloured like its course
        let x = u32::try_from(geometry.slot_x(1)).unwrap();
        let y = u32::try_from(Geometry::row_y(0)).unwrap() + 50;
        let expected = rgb(layout::PALETTE[0]);
        assert_eq!(image.get_pixel(x, y).0, [expected.0, expected.1, expected.2]);
    }

    #[test]
    fn jpg_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("timetable.jpg");

        export(&grid(&["MT101 - A"]), &path, Format::Jpg, false).unwrap();

        assert!(image::open(&path).is_ok());
    }

    #[test]
    fn nothing_to_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("timetable.png");

        assert!(matches!(
            export(&grid(&[]), &path, Format::Png, false),
            Err(ExportError::NothingSelected)
        ));
        assert!(!path.exists());
    }
}
