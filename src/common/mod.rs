//! Commonly used code.

use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};

/// Commonly used command line arguments.
#[derive(Parser, Debug)]
pub struct Args {
    /// Verbosity of the program
    #[clap(flatten)]
    pub verbose: Verbosity<InfoLevel>,
}

/// Tokens that pandas' `read_csv` interprets as missing values by default.
///
/// The tables handled here are usually produced and consumed by pandas-based
/// notebooks, so we stick to the same notion of "missing".
pub const NA_VALUES: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Returns whether `value` denotes a missing value.
pub fn is_na(value: &str) -> bool {
    NA_VALUES.contains(&value)
}

/// Returns `Some(value)` unless `value` denotes a missing value.
pub fn non_na(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !is_na(value))
}

/// Open a file for reading, transparently decompressing `.gz` files.
///
/// # Arguments
///
/// * `path` - Path to the file to open.
///
/// # Errors
///
/// If the file cannot be opened.
pub fn open_read_maybe_gz<P>(path: P) -> Result<Box<dyn Read>, std::io::Error>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path)?;
    if path.extension().is_some_and(|ext| ext == "gz") {
        tracing::debug!("opening {} as gzip-compressed file", path.display());
        Ok(Box::new(BufReader::new(flate2::read::MultiGzDecoder::new(
            file,
        ))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Construct a CSV reader for headered TSV files.
///
/// Lines starting with `#` are skipped and ragged rows are tolerated.
pub fn tsv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .comment(Some(b'#'))
        .from_reader(reader)
}

/// Return the position of each of `names` in `headers`.
///
/// Returns `Err(name)` with the first name that could not be found.
pub fn column_positions<'a>(
    headers: &csv::StringRecord,
    names: &[&'a str],
) -> Result<Vec<usize>, &'a str> {
    names
        .iter()
        .map(|name| {
            headers
                .iter()
                .position(|header| header == *name)
                .ok_or(*name)
        })
        .collect()
}

/// Return the elements that occur more than once in `values`.
///
/// Each repeated element is reported once, in order of its second occurrence.
pub fn find_duplicates<'a, I>(values: I) -> Vec<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = rustc_hash::FxHashSet::default();
    let mut repeated = indexmap::IndexSet::new();
    for value in values {
        if !seen.insert(value) {
            repeated.insert(value);
        }
    }
    repeated.into_iter().collect()
}
