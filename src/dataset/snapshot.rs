use std::io;
use std::path;

use crate::cli_utils;

use super::record::Dataset;
use bincode::ErrorKind;

pub fn load_snapshot(input_path: &path::Path, quiet: bool) -> Result<Dataset, Box<ErrorKind>> {
    let spinner = cli_utils::create_spinner(quiet, "Loading snapshot...");

    let result = std::fs::File::open(input_path)
        .map_err(Box::<ErrorKind>::from)
        .and_then(|file_reader| bincode::deserialize_from(io::BufReader::new(file_reader)));

    cli_utils::finish_spinner(&spinner, if result.is_ok() { "Snapshot loaded" } else { "Snapshot failed to load" });
    result
}

pub fn save_snapshot(dataset: &Dataset, output_file: &path::Path) -> Result<(), Box<ErrorKind>> {
    let file_writer = std::fs::File::create(output_file)?;
    let buf_writer = io::BufWriter::new(file_writer);
    bincode::serialize_into(buf_writer, dataset)
}
