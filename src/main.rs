use std::{error::Error, path::PathBuf, process::ExitCode, time::Duration};

use chrono::Local;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::config::Config;
use crate::export::Format;
use crate::filter::Selection;
use crate::refresh::{Refresher, State};
use crate::timetable::models::Snapshot;

mod config;
mod error;
mod export;
mod filter;
mod layout;
mod refresh;
mod sheet;
mod timetable;
mod utils;

/// Shown when loading the timetable failed
const FAILURE: &str = "Failed to load timetable data. Please try again later.";

const WELCOME: &str = "Welcome to your timetable!
Select one or more classes (--pick, --add) to display them on the grid.";

#[derive(Parser)]
#[clap(version, about, long_about = None)]
struct Args {
    /// URL of the metadata describing the sheets
    #[clap(long, env = "TABLETOR_SOURCE", value_name = "URL")]
    source: String,

    /// Region to read in the metadata
    #[clap(short, long, default_value = config::DEFAULT_REGION)]
    region: String,

    /// Day to leave out, can be repeated, default to Saturday
    #[clap(long = "exclude-day", value_name = "DAY")]
    exclude_days: Vec<String>,

    /// File storing the selected classes
    #[clap(long, value_name = "FILE")]
    selection: Option<PathBuf>,

    /// Timeout of the requests
    #[clap(long, default_value_t = 5, value_name = "SECONDS")]
    timeout: u64,

    /// List the available classes
    #[clap(short, long)]
    list: bool,

    /// Only list or propose the classes containing this text
    #[clap(short = 'q', long, value_name = "TEXT")]
    search: Option<String>,

    /// Pick your classes interactively
    #[clap(short, long, conflicts_with = "watch")]
    pick: bool,

    /// Select a class, i.e.: "CS101 - A"
    #[clap(short, long, value_name = "CLASS")]
    add: Vec<String>,

    /// Unselect a class
    #[clap(long, value_name = "CLASS")]
    remove: Vec<String>,

    /// Unselect every class
    #[clap(long)]
    clear: bool,

    /// Export the timetable as an image
    #[clap(short, long, value_enum, value_name = "FORMAT")]
    export: Option<Format>,

    /// Image file, default to timetable.<FORMAT>
    #[clap(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// TrueType font used for the text of the image
    #[clap(long, value_name = "FILE")]
    font: Option<PathBuf>,

    /// Width of a day in the terminal
    #[clap(long, default_value_t = 22, value_name = "CHARS")]
    cell_length: usize,

    /// Keep running, refreshing the timetable periodically and on ENTER
    #[clap(short, long)]
    watch: bool,

    /// Delay between two automatic refreshes
    #[clap(long, default_value_t = 3600, value_name = "SECONDS")]
    refresh_every: u64,
}

impl Args {
    fn config(&self) -> Config {
        let mut config = Config::new(&self.source);
        config.region.clone_from(&self.region);
        if !self.exclude_days.is_empty() {
            config.excluded_days.clone_from(&self.exclude_days);
        }
        if let Some(path) = &self.selection {
            config.selection_path.clone_from(path);
        }
        config.timeout = Duration::from_secs(self.timeout);
        config.refresh_every = Duration::from_secs(self.refresh_every.max(1));

        config
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args) -> Result<(), Box<dyn Error>> {
    let config = args.config();
    let selection = filter::load(&config.selection_path);

    if args.watch {
        return watch(args, config, selection).await;
    }

    println!("Fetching the timetable...");
    let snapshot = timetable::fetch(&config).await.map_err(|e| {
        log::error!("{e}");
        FAILURE
    })?;

    let selection = update_selection(args, &config, &snapshot, selection)?;

    if args.list {
        list(args, &snapshot, &selection);
        return Ok(());
    }

    show(args, &snapshot, &selection)
}

/// Apply the changes asked on the command line, and save them
fn update_selection(
    args: &Args,
    config: &Config,
    snapshot: &Snapshot,
    mut selection: Selection,
) -> Result<Selection, Box<dyn Error>> {
    let before = selection.clone();
    let classes = filter::classes(snapshot);

    if args.clear {
        selection.clear();
    }
    for class in &args.remove {
        if !selection.remove(class) {
            log::warn!("`{class}` wasn't selected");
        }
    }
    for class in &args.add {
        if classes.contains(class) {
            selection.add(class.clone());
        } else {
            log::warn!("unknown class `{class}`, see --list");
        }
    }
    if args.pick {
        selection = filter::pick(
            &classes,
            &selection,
            args.search.as_deref().unwrap_or_default(),
        )?;
    }

    if selection != before {
        filter::save(&selection, &config.selection_path)?;
        log::info!(
            "{} classes selected, saved in {}",
            selection.len(),
            config.selection_path.display()
        );
    }

    Ok(selection)
}

/// Print the classes, the selected ones ticked
fn list(args: &Args, snapshot: &Snapshot, selection: &Selection) {
    let classes = filter::classes(snapshot);
    for class in filter::search(&classes, args.search.as_deref().unwrap_or_default()) {
        let tick = if selection.contains(class) { 'x' } else { ' ' };
        println!("[{tick}] {class}");
    }
}

/// Display or export the selected classes
fn show(args: &Args, snapshot: &Snapshot, selection: &Selection) -> Result<(), Box<dyn Error>> {
    if selection.is_empty() {
        println!("{WELCOME}");
        return Ok(());
    }

    let grid = layout::build(snapshot, selection);

    if let Some(format) = args.export {
        let path = args
            .output
            .clone()
            .unwrap_or_else(|| export::default_path(format));

        let labels = export::load_font(args.font.as_deref());
        if !labels {
            log::warn!("no usable font found, the image won't have any text (see --font)");
        }

        export::export(&grid, &path, format, labels)?;
        println!("Image exported => {}", path.display());
    } else {
        timetable::display(&grid, args.cell_length);
    }

    Ok(())
}

/// Keep the timetable on screen, refreshed by the timer or on ENTER
async fn watch(
    args: &Args,
    config: Config,
    mut selection: Selection,
) -> Result<(), Box<dyn Error>> {
    let mut refresher = Refresher::start(config.clone());
    let mut states = refresher.subscribe();
    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut selection_updated = false;

    println!("Press ENTER to refresh, q then ENTER to quit.");

    loop {
        tokio::select! {
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }

                let state = states.borrow_and_update().clone();
                match state {
                    State::Loading => println!("Loading the timetable..."),
                    State::Ready(snapshot) => {
                        if !selection_updated {
                            selection = update_selection(args, &config, &snapshot, selection)?;
                            selection_updated = true;
                        }
                        println!(
                            "Timetable of {}, {} time slots",
                            snapshot.fetched_at.with_timezone(&Local).format("%d/%m %H:%M"),
                            snapshot.time_slots.len()
                        );
                        show(args, &snapshot, &selection)?;
                    }
                    State::Failed(_) => println!("Error: {FAILURE}"),
                }
            }
            line = input.next_line() => {
                match line? {
                    Some(line) if line.trim().eq_ignore_ascii_case("q") => break,
                    Some(_) => {
                        refresher.refresh();
                    }
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    refresher.teardown();

    Ok(())
}
