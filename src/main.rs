#[macro_use]
extern crate failure;
use failure::Error;

use clap::{App, AppSettings, Arg, ArgGroup, ArgMatches, SubCommand};

use log::{error, info, warn};
use serde::Serialize;
use simplelog;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

mod cli_utils;
mod dataset;
mod explorer;

use dataset::{loader, snapshot, Dataset, Field, Metric};
use explorer::filter::{city_candidates, Candidates};
use explorer::views::{self, RenderModel};
use explorer::{map_export, ExplorerError, Selection, Session};

use chrono::offset::Local;

const DEFAULT_SNAPSHOT_NAME: &str = "prices.snapshot.bin";
const FEEDBACK_FORM_ENV: &str = "FEEDBACK_FORM_URL";

#[derive(Debug, Fail)]
pub enum MainError {
    #[fail(display = "Snapshot Deserialization Error: {}", _0)]
    SnapshotDeserialization(String),
    #[fail(display = "Snapshot Serialization Error: {}", _0)]
    SnapshotSerialization(String),
    #[fail(display = "{} (available cities: {})", _0, _1)]
    Onboarding(ExplorerError, String),
}

#[derive(Serialize)]
struct ExploreOutput<'a> {
    generated_at: String,
    default_city: Option<&'a str>,
    candidates: Candidates,
    reference_options: Vec<String>,
    feedback_form_url: Option<String>,
    view: RenderModel,
}

#[derive(Serialize)]
struct OptionsOutput {
    candidates: Candidates,
    reference_options: Vec<String>,
}

fn main() {
    let matches = build_cli().get_matches();

    let local_time = Local::now();
    let time_offset = local_time.offset();
    let level = match flag_set(&matches, "verbose") {
        true => simplelog::LevelFilter::Debug,
        false => simplelog::LevelFilter::Info,
    };
    // Configure logging
    simplelog::TermLogger::init(
        level,
        simplelog::Config {
            offset: time_offset.clone(),
            ..simplelog::Config::default()
        },
        simplelog::TerminalMode::Stderr,
    )
    .ok();

    match do_main(&matches) {
        Ok(_) => info!("Process finished OK"),
        Err(err) => {
            error!("Process finished with an error: {}", err);
            std::process::exit(1);
        }
    };
}

fn source_args<'a, 'b>(app: App<'a, 'b>) -> App<'a, 'b> {
    app.group(ArgGroup::with_name("source")
            .args(&["input", "url", "snapshot"])
            .required(true))
        .arg(Arg::with_name("input")
            .short("i")
            .long("input")
            .help("CSV file with the property prices.")
            .takes_value(true)
        )
        .arg(Arg::with_name("url")
            .short("u")
            .long("url")
            .help("URL of a CSV export of the property prices sheet.")
            .takes_value(true)
        )
        .arg(Arg::with_name("snapshot")
            .short("s")
            .long("snapshot")
            .help("Use a snapshot generated with the snapshot command.")
            .takes_value(true)
        )
        .arg(Arg::with_name("delimiter")
            .short("d")
            .long("delimiter")
            .help("Delimiter for input file fields")
            .takes_value(true)
            .default_value(",")
        )
}

fn filter_args<'a, 'b>(app: App<'a, 'b>) -> App<'a, 'b> {
    let selection = |name: &'static str, help: &'static str| {
        Arg::with_name(name)
            .long(name)
            .help(help)
            .takes_value(true)
    };

    app.arg(selection("default-city", "City chosen on first run. Required before anything is filtered."))
        .arg(selection("city", "City filter, \"All\" to disable. Defaults to the default city."))
        .arg(selection("location", "Location filter."))
        .arg(selection("locality", "Locality filter."))
        .arg(selection("segment", "Segment filter."))
        .arg(selection("property-type", "Property type filter. Defaults to apartment when present."))
        .arg(selection("metric", "Metric to compare: rates_per_sqft (default) or rental_yields."))
        .arg(selection("reference", "Reference locality of the distance comparison."))
}

fn output_arg<'a, 'b>(app: App<'a, 'b>) -> App<'a, 'b> {
    app.arg(Arg::with_name("output")
        .short("o")
        .long("output")
        .help("Sets the output file to create. If omitted, stdout will be used.")
        .takes_value(true)
    )
}

fn build_cli<'a, 'b>() -> App<'a, 'b> {
    App::new("property_explorer")
        .version("0.1.0")
        .author("Gustavo Ajzenman")
        .about("Explore property prices by city, locality and distance")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(Arg::with_name("verbose")
            .short("v")
            .long("verbose")
            .global(true)
            .help("Log debug information")
        )
        .arg(Arg::with_name("quiet")
            .short("q")
            .long("quiet")
            .global(true)
            .help("Hide progress spinners")
        )
        .subcommand(output_arg(filter_args(source_args(
            SubCommand::with_name("explore")
                .about("Render summary cards, map markers and comparison charts as JSON")
                .arg(Arg::with_name("feedback-url")
                    .long("feedback-url")
                    .help("Feedback form to link from the dashboard. Falls back to FEEDBACK_FORM_URL.")
                    .takes_value(true)
                )
        ))))
        .subcommand(output_arg(filter_args(source_args(
            SubCommand::with_name("options")
                .about("List the values offered by every filter for the current selections")
        ))))
        .subcommand(output_arg(filter_args(source_args(
            SubCommand::with_name("map")
                .about("Write the map markers of the current selections as GeoJSON")
        ))))
        .subcommand(source_args(
            SubCommand::with_name("snapshot")
                .about("Load the dataset once and store it as a snapshot file")
                .arg(Arg::with_name("output")
                    .short("o")
                    .long("output")
                    .help("Output path or file for the snapshot")
                    .takes_value(true)
                    .default_value(".")
                )
                .arg(Arg::with_name("force")
                    .short("f")
                    .long("force")
                    .help("Overwrite an existing snapshot")
                    .takes_value(false)
                )
        ))
}

fn load_dataset(matches: &ArgMatches, quiet: bool) -> Result<Dataset, Error> {
    // Parse the delimiter. Should be exactly one character.
    let delimiter = matches
        .value_of("delimiter")
        .unwrap_or_default()
        .replace("\\t", "\t");
    let char_delimiter: u8 = match delimiter.as_bytes() {
        [single] => *single,
        _ => bail!("Delimiter must be a single character, got {:?}", delimiter),
    };

    let (dataset, stats) = if let Some(path) = matches.value_of("input") {
        info!("Loading dataset from {}", path);
        loader::load_path(path, char_delimiter, quiet)?
    } else if let Some(url) = matches.value_of("url") {
        info!("Fetching dataset from {}", url);
        loader::load_url(url, char_delimiter, quiet)?
    } else if let Some(path) = matches.value_of("snapshot") {
        info!("Loading snapshot from {}", path);
        let dataset = snapshot::load_snapshot(Path::new(path), quiet)
            .map_err(|err| MainError::SnapshotDeserialization(err.to_string()))?;
        info!("Snapshot holds {} records", dataset.len());
        return Ok(dataset);
    } else {
        bail!("Either input, url or snapshot must be indicated.");
    };

    info!("Stats: {:?}", stats);
    if dataset.is_empty() {
        warn!("The dataset has no records, every view will be empty");
    }
    if stats.error_lines > 0 {
        warn!("{} of {} lines could not be read", stats.error_lines, stats.total_lines);
    }
    Ok(dataset)
}

fn build_session(dataset: &Dataset, matches: &ArgMatches) -> Result<Session, Error> {
    let mut session = Session::new(dataset);

    let default_city = match matches.value_of("default-city") {
        Some(city) => city,
        None => {
            return Err(Error::from(MainError::Onboarding(
                ExplorerError::CityNotChosen,
                city_candidates(dataset).join(", "),
            )))
        }
    };
    session.choose_default_city(dataset, default_city)?;

    let selections = [
        ("city", Field::City),
        ("location", Field::Location),
        ("locality", Field::Locality),
        ("segment", Field::Segment),
        ("property-type", Field::PropertyType),
    ];
    for (arg, field) in selections.iter() {
        if let Some(value) = matches.value_of(arg) {
            session.select(dataset, *field, Selection::parse(Some(value)))?;
        }
    }

    if let Some(metric) = matches.value_of("metric") {
        session.select_metric(metric.parse::<Metric>()?);
    }
    if let Some(reference) = matches.value_of("reference") {
        session.choose_reference(dataset, reference)?;
    }

    Ok(session)
}

fn open_output(matches: &ArgMatches) -> Result<Box<dyn io::Write>, Error> {
    match matches.value_of("output") {
        Some(path) => {
            info!("Writing to file {}.", path);
            Ok(Box::new(io::BufWriter::new(std::fs::File::create(path)?)))
        }
        None => {
            info!("Writing to stdout");
            Ok(Box::new(io::stdout()))
        }
    }
}

fn explore_command(matches: &ArgMatches, quiet: bool) -> Result<(), Error> {
    let dataset = load_dataset(matches, quiet)?;
    let session = build_session(&dataset, matches)?;

    let view = views::render(&dataset, &session)?;
    info!("{} records match the current filters", view.record_count);

    let feedback_form_url = matches
        .value_of("feedback-url")
        .map(String::from)
        .or_else(|| std::env::var(FEEDBACK_FORM_ENV).ok());

    let output = ExploreOutput {
        generated_at: Local::now().to_rfc3339(),
        default_city: session.default_city(),
        candidates: Candidates::for_state(&dataset, session.filter_state()?),
        reference_options: session.reference_options(&dataset),
        feedback_form_url,
        view,
    };

    let mut output_file = open_output(matches)?;
    serde_json::to_writer_pretty(&mut output_file, &output)?;
    writeln!(output_file)?;
    output_file.flush()?;
    Ok(())
}

fn options_command(matches: &ArgMatches, quiet: bool) -> Result<(), Error> {
    let dataset = load_dataset(matches, quiet)?;
    let session = build_session(&dataset, matches)?;

    let output = OptionsOutput {
        candidates: Candidates::for_state(&dataset, session.filter_state()?),
        reference_options: session.reference_options(&dataset),
    };

    let mut output_file = open_output(matches)?;
    serde_json::to_writer_pretty(&mut output_file, &output)?;
    writeln!(output_file)?;
    output_file.flush()?;
    Ok(())
}

fn map_command(matches: &ArgMatches, quiet: bool) -> Result<(), Error> {
    let dataset = load_dataset(matches, quiet)?;
    let session = build_session(&dataset, matches)?;

    let view = views::render(&dataset, &session)?;
    let geo_json = map_export::to_geojson(&view.map);

    let mut output_file = open_output(matches)?;
    writeln!(output_file, "{}", geo_json)?;
    output_file.flush()?;
    Ok(())
}

fn snapshot_command(matches: &ArgMatches, quiet: bool) -> Result<(), Error> {
    let dest_path = Path::new(matches.value_of("output").unwrap_or_default());
    let dest_file: PathBuf = match dest_path.is_dir() {
        true => dest_path.join(DEFAULT_SNAPSHOT_NAME),
        false => dest_path.to_path_buf(),
    };

    if dest_file.exists() && !matches.is_present("force") {
        warn!(
            "Snapshot exist in {}. Skipping. Use --force to overwrite",
            dest_file.display()
        );
        return Ok(());
    }

    let dataset = load_dataset(matches, quiet)?;

    info!("Saving {} records into {}", dataset.len(), dest_file.display());
    snapshot::save_snapshot(&dataset, &dest_file)
        .map_err(|err| MainError::SnapshotSerialization(err.to_string()))?;

    Ok(())
}

/// Global flags may be given before or after the subcommand.
fn flag_set(matches: &ArgMatches, name: &str) -> bool {
    matches.is_present(name)
        || matches
            .subcommand()
            .1
            .map_or(false, |sub_matches| sub_matches.is_present(name))
}

fn do_main(matches: &ArgMatches) -> Result<(), Error> {
    let quiet = flag_set(matches, "quiet");

    match matches.subcommand() {
        ("explore", Some(sub_matches)) => explore_command(sub_matches, quiet),
        ("options", Some(sub_matches)) => options_command(sub_matches, quiet),
        ("map", Some(sub_matches)) => map_command(sub_matches, quiet),
        ("snapshot", Some(sub_matches)) => snapshot_command(sub_matches, quiet),
        _ => Ok(()),
    }
}
