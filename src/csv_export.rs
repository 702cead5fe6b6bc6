use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use csv::{QuoteStyle, WriterBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::record::Log;

pub const EXPORT_FILE_NAME: &str = "riepilogo_commesse.csv";
pub const CSV_HEADER: [&str; 5] = ["Commessa", "Descrizione", "Inizio", "Fine", "Durata"];

/// How fields are quoted in the exported csv.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CsvQuoting {
    /// quote only fields containing commas, quotes or line breaks
    #[default]
    Necessary,
    /// quote every field
    Always,
    /// never quote; fields with commas or line breaks corrupt the row
    Never,
}

impl From<CsvQuoting> for QuoteStyle {
    fn from(q: CsvQuoting) -> Self {
        match q {
            CsvQuoting::Necessary => QuoteStyle::Necessary,
            CsvQuoting::Always => QuoteStyle::Always,
            CsvQuoting::Never => QuoteStyle::Never,
        }
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("the log is empty, nothing to export")]
    EmptyLog,
    #[error("failed to encode csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to write csv: {0}")]
    Write(#[from] io::Error),
    #[error("failed to write {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Writes the header and one row per record, in log order (newest first).
pub fn write_csv<W: io::Write>(
    log: &Log,
    writer: W,
    quoting: CsvQuoting,
) -> Result<(), ExportError> {
    if log.is_empty() {
        return Err(ExportError::EmptyLog);
    }

    let mut wtr = WriterBuilder::new()
        .quote_style(quoting.into())
        .from_writer(writer);

    wtr.write_record(CSV_HEADER)?;
    for r in log.records() {
        wtr.write_record([
            r.task.as_str(),
            r.description.as_str(),
            r.start.as_str(),
            r.end.as_str(),
            r.duration.as_str(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn to_csv_string(log: &Log, quoting: CsvQuoting) -> Result<String, ExportError> {
    let mut buf = Vec::new();
    write_csv(log, &mut buf, quoting)?;
    // Every field comes from a Rust String, so the bytes are valid utf-8.
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Writes `riepilogo_commesse.csv` into `dir` and returns its path.
/// No file is produced for an empty log.
pub fn export_to_dir(log: &Log, dir: &Path, quoting: CsvQuoting) -> Result<PathBuf, ExportError> {
    let contents = to_csv_string(log, quoting)?;
    let path = dir.join(EXPORT_FILE_NAME);

    let file_err = |source: io::Error| ExportError::File {
        path: path.clone(),
        source,
    };
    if !dir.as_os_str().is_empty() {
        fs::create_dir_all(dir).map_err(file_err)?;
    }
    fs::write(&path, contents).map_err(file_err)?;
    Ok(path)
}
