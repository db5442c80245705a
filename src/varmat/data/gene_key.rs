//! Translation of raw gene identifiers to canonical gene names.
//!
//! The key file is a BioMart-style export with one column per identifier
//! format and a `Gene name` column holding the canonical gene symbol.

use std::path::Path;

use crate::common::{column_positions, non_na, open_read_maybe_gz, tsv_reader};
use crate::varmat::{ds::MutationRecord, error::Error};

/// Name of the key file column with the canonical gene names.
pub const GENE_NAME_COLUMN: &str = "Gene name";

/// Identifier format used in the gene column of the mutation table.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    clap::ValueEnum,
    serde::Deserialize,
    serde::Serialize,
)]
#[serde(rename_all = "snake_case")]
pub enum GeneIdentifierFormat {
    /// Ensembl gene ID, e.g., `ENSG00000284532`.
    GeneStableId,
    /// Gene name, e.g., `MIR4723`.
    #[default]
    GeneName,
    /// Versioned Ensembl gene ID, e.g., `ENSG00000284532.1`.
    GeneStableIdVersion,
    /// Ensembl transcript ID, e.g., `ENST00000585070`.
    TranscriptStableId,
    /// Versioned Ensembl transcript ID, e.g., `ENST00000585070.1`.
    TranscriptStableIdVersion,
}

impl GeneIdentifierFormat {
    /// Name of the key file column holding identifiers of this format.
    pub fn column_name(self) -> &'static str {
        match self {
            Self::GeneStableId => "Gene stable ID",
            Self::GeneName => GENE_NAME_COLUMN,
            Self::GeneStableIdVersion => "Gene stable ID version",
            Self::TranscriptStableId => "Transcript stable ID",
            Self::TranscriptStableIdVersion => "Transcript stable ID version",
        }
    }
}

/// Mapping from raw gene identifier to canonical gene name.
#[derive(Debug, Clone, Default)]
pub struct GeneIdentifierMap {
    /// Canonical gene name by raw identifier.
    id_to_name: rustc_hash::FxHashMap<String, String>,
}

impl GeneIdentifierMap {
    /// Construct from `(identifier, gene name)` pairs.
    ///
    /// Each gene name is only kept for the first identifier it occurs with and each
    /// identifier keeps its first gene name.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut seen_names = rustc_hash::FxHashSet::default();
        let mut id_to_name = rustc_hash::FxHashMap::default();
        for (id, name) in pairs {
            if id_to_name.contains_key(&id) || seen_names.contains(&name) {
                tracing::trace!("ignoring duplicate key entry {} -> {}", &id, &name);
                continue;
            }
            seen_names.insert(name.clone());
            id_to_name.insert(id, name);
        }
        Self { id_to_name }
    }

    /// Load from a tab-separated key file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the key file.
    /// * `format` - Identifier format; selects the key column.
    ///
    /// # Errors
    ///
    /// `Error::MissingColumn` if the identifier or `Gene name` column is absent, I/O
    /// and parsing errors otherwise.
    pub fn load<P>(path: P, format: GeneIdentifierFormat) -> Result<Self, Error>
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
        let idx = column_positions(&headers, &[format.column_name(), GENE_NAME_COLUMN])
            .map_err(|column| Error::MissingColumn {
                column: column.to_string(),
                path: path.to_path_buf(),
            })?;

        let mut pairs = Vec::new();
        for record in csv_reader.records() {
            let record = record.map_err(|e| Error::csv(path, e))?;
            if let (Some(id), Some(name)) = (
                non_na(record.get(idx[0])),
                non_na(record.get(idx[1])),
            ) {
                pairs.push((id.to_string(), name.to_string()));
            }
        }

        let result = Self::from_pairs(pairs);
        tracing::debug!(
            "loaded {} gene identifier mappings from {}",
            result.len(),
            path.display()
        );
        Ok(result)
    }

    /// Number of mapped identifiers.
    pub fn len(&self) -> usize {
        self.id_to_name.len()
    }

    /// Whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.id_to_name.is_empty()
    }

    /// Iterate over the `(identifier, gene name)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.id_to_name
            .iter()
            .map(|(id, name)| (id.as_str(), name.as_str()))
    }

    /// Canonical gene name for `identifier`, if mapped.
    pub fn canonical_name(&self, identifier: &str) -> Option<&str> {
        self.id_to_name.get(identifier).map(String::as_str)
    }

    /// Keep only the records whose gene identifier is mapped.
    ///
    /// # Returns
    ///
    /// The retained records and the number of dropped records.
    pub fn retain_mapped(&self, records: Vec<MutationRecord>) -> (Vec<MutationRecord>, usize) {
        let before = records.len();
        let retained = records
            .into_iter()
            .filter(|record| self.id_to_name.contains_key(&record.gene_identifier))
            .collect::<Vec<_>>();
        let dropped = before - retained.len();
        (retained, dropped)
    }
}

/// Canonical name of `identifier` if `gene_map` translates it, `identifier` otherwise.
pub fn canonical_or_raw<'a>(gene_map: Option<&'a GeneIdentifierMap>, identifier: &'a str) -> &'a str {
    gene_map
        .and_then(|gene_map| gene_map.canonical_name(identifier))
        .unwrap_or(identifier)
}
