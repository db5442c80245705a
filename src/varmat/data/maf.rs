//! I/O for mutation annotation (MAF-like) tables.

use std::path::Path;

use crate::common::{column_positions, non_na, open_read_maybe_gz, tsv_reader};
use crate::varmat::{ds::MutationRecord, error::Error};

/// Names of the columns to read from the mutation table.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct Columns {
    /// Column with the gene identifiers.
    pub gene: String,
    /// Column with the sample identifiers.
    pub sample: String,
    /// Column with the mutation classification.
    pub classification: String,
    /// Column with the protein change.
    pub protein_change: String,
}

impl Default for Columns {
    fn default() -> Self {
        Self {
            gene: "Hugo_Symbol".to_string(),
            sample: "Tumor_Sample_Barcode".to_string(),
            classification: "Variant_Classification".to_string(),
            protein_change: "Protein_Change".to_string(),
        }
    }
}

/// Load mutation records from a tab-separated file.
///
/// Files ending in `.gz` are decompressed on the fly and lines starting with `#`
/// are ignored.  Rows lacking a gene, sample, or classification value are
/// skipped with a warning.
///
/// # Arguments
///
/// * `path` - Path to the mutation table.
/// * `columns` - Names of the columns to read.
///
/// # Returns
///
/// The records in file order.
///
/// # Errors
///
/// `Error::MissingColumn` if one of `columns` is not in the header, I/O and
/// parsing errors otherwise.
pub fn load_file<P>(path: P, columns: &Columns) -> Result<Vec<MutationRecord>, Error>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let reader = open_read_maybe_gz(path).map_err(|e| Error::io(path, e))?;
    let mut csv_reader = tsv_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|e| Error::csv(path, e))?
        .clone();
    let idx = column_positions(
        &headers,
        &[
            columns.gene.as_str(),
            columns.sample.as_str(),
            columns.classification.as_str(),
            columns.protein_change.as_str(),
        ],
    )
    .map_err(|column| Error::MissingColumn {
        column: column.to_string(),
        path: path.to_path_buf(),
    })?;

    let mut result = Vec::new();
    let mut incomplete = 0usize;
    for record in csv_reader.records() {
        let record = record.map_err(|e| Error::csv(path, e))?;
        let field = |i: usize| non_na(record.get(idx[i]));
        match (field(0), field(1), field(2)) {
            (Some(gene), Some(sample), Some(classification)) => result.push(MutationRecord {
                gene_identifier: gene.to_string(),
                sample_identifier: sample.to_string(),
                mutation_classification: classification.to_string(),
                protein_change: field(3).map(str::to_string),
            }),
            _ => incomplete += 1,
        }
    }

    if incomplete > 0 {
        tracing::warn!(
            "skipped {} rows without gene, sample, or classification in {}",
            incomplete,
            path.display()
        );
    }
    tracing::debug!("read {} records from {}", result.len(), path.display());

    Ok(result)
}
