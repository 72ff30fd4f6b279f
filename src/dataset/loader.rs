use super::record::{Dataset, Record};
use crate::cli_utils;

use csv;
use std::io;
use std::path;
use std::time;

use log::{debug, info, warn};

use failure::Fail;

#[derive(Debug, Default, PartialEq)]
pub struct LoadStats {
    pub total_lines: u32,
    pub error_lines: u32,
    pub missing_columns: Vec<&'static str>,
}

#[derive(Debug, Fail)]
pub enum LoadError {
    #[fail(display = "I/O error: {}", _0)]
    Io(io::Error),
    #[fail(display = "Csv error: {}", _0)]
    Csv(csv::Error),
    #[fail(display = "Dataset source unreachable ({}): {}", _0, _1)]
    Upstream(String, String),
    #[fail(display = "Dataset has no header row")]
    MissingHeader,
}

impl From<io::Error> for LoadError {
    fn from(err: io::Error) -> LoadError {
        LoadError::Io(err)
    }
}

impl From<csv::Error> for LoadError {
    fn from(err: csv::Error) -> LoadError {
        LoadError::Csv(err)
    }
}

/// Position of every known column in the header, if present.
#[derive(Debug, Default)]
struct ColumnMap {
    city: Option<usize>,
    location: Option<usize>,
    locality: Option<usize>,
    segment: Option<usize>,
    property_type: Option<usize>,
    latitude: Option<usize>,
    longitude: Option<usize>,
    rental_yields: Option<usize>,
    rates_per_sqft: Option<usize>,
}

impl ColumnMap {
    fn from_header(header: &csv::StringRecord) -> ColumnMap {
        let position = |name: &str| {
            header
                .iter()
                .position(|column| column.trim().eq_ignore_ascii_case(name))
        };

        ColumnMap {
            city: position("city"),
            location: position("location"),
            locality: position("locality"),
            segment: position("segment"),
            property_type: position("property_type"),
            latitude: position("latitude"),
            longitude: position("longitude"),
            rental_yields: position("rental_yields"),
            rates_per_sqft: position("rates_per_sqft"),
        }
    }

    fn missing(&self) -> Vec<&'static str> {
        let columns = [
            ("city", self.city),
            ("location", self.location),
            ("locality", self.locality),
            ("segment", self.segment),
            ("property_type", self.property_type),
            ("latitude", self.latitude),
            ("longitude", self.longitude),
            ("rental_yields", self.rental_yields),
            ("rates_per_sqft", self.rates_per_sqft),
        ];
        columns
            .iter()
            .filter(|(_, idx)| idx.is_none())
            .map(|(name, _)| *name)
            .collect()
    }

    fn to_record(&self, row: &csv::StringRecord, line_number: u64) -> Record {
        let text = |idx: Option<usize>| {
            idx.and_then(|i| row.get(i))
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
        };
        let number = |idx: Option<usize>, column: &str| {
            let raw = idx.and_then(|i| row.get(i)).map(str::trim).filter(|v| !v.is_empty())?;
            match parse_number(raw) {
                Some(value) => Some(value),
                None => {
                    debug!("Line {}: unparsable {} {:?}, treated as missing", line_number, column, raw);
                    None
                }
            }
        };

        Record {
            city: text(self.city),
            location: text(self.location),
            locality: text(self.locality),
            segment: text(self.segment),
            property_type: text(self.property_type),
            latitude: number(self.latitude, "latitude"),
            longitude: number(self.longitude, "longitude"),
            rental_yields: number(self.rental_yields, "rental_yields"),
            rates_per_sqft: number(self.rates_per_sqft, "rates_per_sqft"),
        }
    }
}

/// 1-based line of the source file, header included.
#[inline]
fn source_line(position: Option<&csv::Position>, row_index: usize) -> u64 {
    position.map_or(row_index as u64 + 2, |pos| pos.line())
}

/// Spreadsheet exports write thousands separators into numeric cells.
#[inline]
fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw.chars().filter(|c| *c != ',').collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn load_csv(input: &mut dyn io::Read, delimiter: u8) -> Result<(Dataset, LoadStats), LoadError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(input);

    let start_instant = time::Instant::now();

    let header = csv_reader.headers()?.clone();
    if header.is_empty() {
        return Err(LoadError::MissingHeader);
    }

    let columns = ColumnMap::from_header(&header);
    let missing_columns = columns.missing();
    for column in &missing_columns {
        warn!("Column '{}' not found, all values treated as missing", column);
    }

    let mut records = Vec::new();
    let mut total_lines = 0;
    let mut error_lines = 0;

    for (row_index, record_result) in csv_reader.records().enumerate() {
        total_lines += 1;

        match record_result {
            Err(e) => {
                warn!("Unable to read line {}: {}", source_line(e.position(), row_index), e);
                error_lines += 1;
            }
            Ok(row) => {
                let line_number = source_line(row.position(), row_index);
                records.push(columns.to_record(&row, line_number))
            }
        }
    }

    let elapsed_secs = start_instant.elapsed().as_millis() as f32 / 1000.0f32;
    info!("Loaded {} records in {} seconds", records.len(), elapsed_secs);

    Ok((
        Dataset::new(records),
        LoadStats {
            total_lines,
            error_lines,
            missing_columns,
        },
    ))
}

pub fn load_path<P: AsRef<path::Path>>(
    input_path: P,
    delimiter: u8,
    quiet: bool,
) -> Result<(Dataset, LoadStats), LoadError> {
    let spinner = cli_utils::create_spinner(quiet, "Loading dataset...");

    let result = std::fs::File::open(input_path.as_ref())
        .map_err(LoadError::from)
        .and_then(|input_file| load_csv(&mut io::BufReader::new(input_file), delimiter));

    cli_utils::finish_spinner(&spinner, if result.is_ok() { "Dataset loaded" } else { "Dataset failed to load" });
    result
}

/**
 * Fetch a CSV export of the remote sheet. Any failure here ends the session:
 * the caller never gets an empty dataset back in place of an error.
 */
pub fn load_url(url: &str, delimiter: u8, quiet: bool) -> Result<(Dataset, LoadStats), LoadError> {
    let spinner = cli_utils::create_spinner(quiet, "Fetching dataset...");

    let upstream = |err: reqwest::Error| LoadError::Upstream(url.to_owned(), err.to_string());
    let body = reqwest::blocking::get(url)
        .and_then(|response| response.error_for_status())
        .and_then(|response| response.bytes())
        .map_err(upstream);

    cli_utils::finish_spinner(&spinner, if body.is_ok() { "Dataset fetched" } else { "Dataset source unreachable" });

    let body = body?;
    info!("Fetched {} bytes from {}", body.len(), url);
    let mut content: &[u8] = &body;
    load_csv(&mut content, delimiter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const SAMPLE_CSV: &str = include_str!("test_resources/sample_prices.csv");

    fn load_str(csv_str: &str) -> (Dataset, LoadStats) {
        load_csv(&mut csv_str.as_bytes(), b',').unwrap()
    }

    #[test]
    fn it_should_load_every_row_of_the_sample() {
        let (dataset, stats) = load_str(SAMPLE_CSV);

        assert_eq!(stats.total_lines, 8);
        assert_eq!(stats.error_lines, 0);
        assert!(stats.missing_columns.is_empty());
        assert_eq!(dataset.len(), 8);

        let first = &dataset.records()[0];
        assert_eq!(first.city.as_ref().map(String::as_str), Some("Bengaluru"));
        assert_eq!(first.locality.as_ref().map(String::as_str), Some("Indiranagar"));
        assert_eq!(first.rates_per_sqft, Some(18500.0));
        assert_eq!(first.rental_yields, Some(0.032));
        assert!(first.coordinates().is_some());
    }

    #[test]
    fn it_should_match_headers_ignoring_case() {
        let (dataset, stats) = load_str("City,Latitude,Longitude\nPune,18.52,73.85\n");

        let record = &dataset.records()[0];
        assert_eq!(record.city.as_ref().map(String::as_str), Some("Pune"));
        assert_eq!(record.latitude, Some(18.52));
        assert_eq!(record.longitude, Some(73.85));
        assert_eq!(
            stats.missing_columns,
            vec!["location", "locality", "segment", "property_type", "rental_yields", "rates_per_sqft"]
        );
    }

    #[test]
    fn it_should_treat_missing_columns_as_all_missing() {
        let (dataset, _) = load_str("city,locality\nPune,Baner\nPune,Aundh\n");

        assert_eq!(dataset.len(), 2);
        for record in dataset.records() {
            assert_eq!(record.rates_per_sqft, None);
            assert_eq!(record.coordinates(), None);
        }
    }

    #[test]
    fn it_should_treat_blank_and_garbage_cells_as_missing() {
        let (dataset, _) = load_str(
            "city,locality,rates_per_sqft,rental_yields\nPune,  ,\"12,500\",n/a\n",
        );

        let record = &dataset.records()[0];
        assert_eq!(record.locality, None);
        assert_eq!(record.rates_per_sqft, Some(12500.0));
        assert_eq!(record.rental_yields, None);
    }

    #[test]
    fn it_should_honour_the_delimiter() {
        let (dataset, _) = load_csv(&mut "city\tlocality\nPune\tBaner\n".as_bytes(), b'\t').unwrap();

        assert_eq!(dataset.records()[0].locality.as_ref().map(String::as_str), Some("Baner"));
    }

    #[test]
    fn it_should_number_lines_as_in_the_file() {
        let mut csv_reader = csv::ReaderBuilder::new().from_reader("city\nPune\nMumbai\n".as_bytes());

        let lines: Vec<u64> = csv_reader
            .records()
            .enumerate()
            .map(|(row_index, row)| source_line(row.unwrap().position(), row_index))
            .collect();

        assert_eq!(lines, vec![2, 3]);
        assert_eq!(source_line(None, 0), 2);
    }

    #[test]
    fn it_should_fail_without_a_header() {
        let result = load_csv(&mut "".as_bytes(), b',');

        assert_matches!(result, Err(LoadError::MissingHeader));
    }

    #[test]
    fn it_should_surface_an_unreachable_source() {
        let result = load_url("http://127.0.0.1:9/prices.csv", b',', true);

        assert_matches!(result, Err(LoadError::Upstream(_, _)));
    }
}
