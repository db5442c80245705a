//! Conversion of mutation annotation tables into sparse feature matrices.

pub mod data;
pub mod ds;
pub mod error;
pub mod extract;
pub mod matrix;
pub mod stats;

use std::{
    io::{BufRead as _, BufReader},
    path::{Path, PathBuf},
};

use clap::Parser;

use self::data::gene_key::{GeneIdentifierFormat, GeneIdentifierMap};
use self::data::maf::{self, Columns};
use self::ds::{genes_first_seen, records_by_gene, MutationRecord, SampleIndex};
use self::error::Error;
use self::extract::{CopyNumber, ExplicitList, FeatureExtractionStrategy, ThresholdFiltered};
use self::matrix::{FeatureMatrix, OutputFormat};
use self::stats::Thresholds;

/// Command line arguments for `varmat` command.
#[derive(Parser, Debug)]
#[command(
    about = "Convert a mutation annotation table into a sparse feature matrix",
    long_about = None
)]
pub struct Args {
    /// Path to the tab-separated mutation table (MAF), optionally gzip-compressed.
    #[clap(long)]
    pub path_input: PathBuf,
    /// Path to the output TSV file.
    #[clap(long)]
    pub path_output: PathBuf,
    /// Path to key file for translating gene identifiers to gene names.
    #[clap(long)]
    pub path_key_file: Option<PathBuf>,
    /// Identifier format of the gene column, selects the key file column.
    #[clap(long, value_enum, default_value_t = GeneIdentifierFormat::GeneName)]
    pub gene_identifier_format: GeneIdentifierFormat,

    /// Column with the gene identifiers.
    #[clap(long, default_value = "Hugo_Symbol")]
    pub gene_column: String,
    /// Column with the sample identifiers.
    #[clap(long, default_value = "Tumor_Sample_Barcode")]
    pub sample_column: String,
    /// Column with the mutation classification.
    #[clap(long, default_value = "Variant_Classification")]
    pub classification_column: String,
    /// Column with the protein change.
    #[clap(long, default_value = "Protein_Change")]
    pub protein_change_column: String,

    /// Treat the classifications as pre-classified copy number calls.
    #[clap(long)]
    pub is_copy_number: bool,
    /// Only consider the genes from the gene list, without thresholds.
    #[clap(long)]
    pub only_select_from_list: bool,
    /// Genes to select, or to exempt from the thresholds.
    #[clap(long, value_delimiter = ',')]
    pub genes_with_all_entries: Vec<String>,
    /// File with additional genes for `--genes-with-all-entries`, one per line.
    #[clap(long)]
    pub path_gene_list: Option<PathBuf>,
    /// Minimal number of distinct protein changes for a gene.
    #[clap(long, default_value_t = 80)]
    pub variant_thres: usize,
    /// Minimal number of records per variant classification of a gene.
    #[clap(long, default_value_t = 80)]
    pub change_thres: usize,

    /// Rewrite TCGA sample barcodes to `TCGA_XX_XXXX`.
    #[clap(long)]
    pub underscore_and_truncate_sample_names: bool,
    /// Layout of the output file.
    #[clap(long, value_enum, default_value_t = OutputFormat::SparseBinaryMatrix)]
    pub output_format: OutputFormat,
}

impl Args {
    /// Build the pipeline configuration, reading the gene list file if given.
    ///
    /// # Errors
    ///
    /// If the gene list file cannot be read.
    pub fn config(&self) -> Result<Config, anyhow::Error> {
        let mut genes_with_all_entries = self.genes_with_all_entries.clone();
        if let Some(path) = &self.path_gene_list {
            genes_with_all_entries.extend(load_gene_list(path)?);
        }

        Ok(Config {
            columns: Columns {
                gene: self.gene_column.clone(),
                sample: self.sample_column.clone(),
                classification: self.classification_column.clone(),
                protein_change: self.protein_change_column.clone(),
            },
            gene_identifier_format: self.gene_identifier_format,
            is_copy_number: self.is_copy_number,
            only_select_from_list: self.only_select_from_list,
            genes_with_all_entries,
            thresholds: Thresholds {
                variant: self.variant_thres,
                change: self.change_thres,
            },
            underscore_and_truncate_sample_names: self.underscore_and_truncate_sample_names,
            output_format: self.output_format,
        })
    }
}

/// Configuration of a variant matrix run.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct Config {
    /// Columns to read from the mutation table.
    pub columns: Columns,
    /// Identifier format of the gene column, used with a key file.
    pub gene_identifier_format: GeneIdentifierFormat,
    /// Select `Mode::CopyNumber`.
    pub is_copy_number: bool,
    /// Select `Mode::ExplicitList`, takes precedence over `is_copy_number`.
    pub only_select_from_list: bool,
    /// Gene list in the list modes, exemption list otherwise.
    pub genes_with_all_entries: Vec<String>,
    /// Thresholds of the threshold mode.
    pub thresholds: Thresholds,
    /// Rewrite TCGA sample barcodes.
    pub underscore_and_truncate_sample_names: bool,
    /// Layout of the output file.
    pub output_format: OutputFormat,
}

/// The aggregation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// All features of the listed genes.
    ExplicitList,
    /// Copy number calls of the listed genes.
    CopyNumber,
    /// Features of all genes passing the thresholds.
    ThresholdFiltered,
}

impl Mode {
    /// Select the mode from the configuration.
    ///
    /// # Errors
    ///
    /// `Error::InvalidModeConfiguration` if a list mode is selected without genes.
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let mode = if config.only_select_from_list {
            if config.is_copy_number {
                tracing::warn!(
                    "both copy number and list selection requested, selecting from list"
                );
            }
            Self::ExplicitList
        } else if config.is_copy_number {
            Self::CopyNumber
        } else {
            Self::ThresholdFiltered
        };

        if mode != Self::ThresholdFiltered && config.genes_with_all_entries.is_empty() {
            return Err(Error::InvalidModeConfiguration(format!(
                "mode {:?} requires a non-empty gene list",
                mode
            )));
        }

        Ok(mode)
    }
}

/// Summary of a variant matrix run.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct Summary {
    /// The aggregation mode used.
    pub mode: Mode,
    /// Number of records used.
    pub n_records: usize,
    /// Number of records dropped for lack of a key file entry.
    pub dropped_unmapped: usize,
    /// Number of sample columns.
    pub n_samples: usize,
    /// Number of feature rows.
    pub n_features: usize,
}

/// Build the feature matrix from loaded records.
///
/// # Arguments
///
/// * `records` - The mutation records, already restricted to mapped genes.
/// * `gene_map` - Translation to canonical gene names, if any.
/// * `config` - The run configuration.
///
/// # Errors
///
/// `Error::InvalidModeConfiguration` on inconsistent mode options.
pub fn build_matrix(
    records: &[MutationRecord],
    gene_map: Option<&GeneIdentifierMap>,
    config: &Config,
) -> Result<(FeatureMatrix, Mode), Error> {
    let mode = Mode::from_config(config)?;
    Ok((build_matrix_for_mode(records, gene_map, mode, config), mode))
}

fn build_matrix_for_mode(
    records: &[MutationRecord],
    gene_map: Option<&GeneIdentifierMap>,
    mode: Mode,
    config: &Config,
) -> FeatureMatrix {
    let sample_index = SampleIndex::from_records(records);
    tracing::debug!("indexed {} samples", sample_index.len());

    let genes = config.genes_with_all_entries.iter().cloned();
    let strategy: Box<dyn FeatureExtractionStrategy + '_> = match mode {
        Mode::ExplicitList => {
            tracing::info!("Selecting from list of genes...");
            Box::new(ExplicitList::new(genes))
        }
        Mode::CopyNumber => {
            tracing::info!("Creating index...");
            Box::new(CopyNumber::new(genes))
        }
        Mode::ThresholdFiltered => Box::new(ThresholdFiltered::new(
            records,
            &config.thresholds,
            &genes.collect(),
            gene_map,
        )),
    };

    // Rows of a gene stay together: the list modes walk the gene list, threshold
    // mode walks the genes in order of first occurrence.
    let ordered = match mode {
        Mode::ExplicitList | Mode::CopyNumber => {
            records_by_gene(records, &config.genes_with_all_entries)
        }
        Mode::ThresholdFiltered => records_by_gene(records, genes_first_seen(records)),
    };

    tracing::info!("Creating final table...");
    let mut matrix = FeatureMatrix::build(ordered, &sample_index, strategy.as_ref());
    if config.underscore_and_truncate_sample_names {
        matrix.truncate_sample_names();
    }
    matrix
}

/// Convert the mutation table at `path_input` into a feature matrix at `path_output`.
///
/// # Arguments
///
/// * `path_input` - Path to the mutation table.
/// * `path_output` - Path to the output TSV file.
/// * `path_key_file` - Path to the gene identifier key file, if any.
/// * `config` - The run configuration.
///
/// # Returns
///
/// The written matrix and a summary of the run.
///
/// # Errors
///
/// Missing columns, inconsistent mode options, and I/O problems.  The output file
/// is not removed if writing fails midway.
pub fn produce_variant_file<P1, P2>(
    path_input: P1,
    path_output: P2,
    path_key_file: Option<&Path>,
    config: &Config,
) -> Result<(FeatureMatrix, Summary), Error>
where
    P1: AsRef<Path>,
    P2: AsRef<Path>,
{
    // Check the mode options before doing any work.
    let mode = Mode::from_config(config)?;

    tracing::info!("Reading file...");
    let records = maf::load_file(path_input, &config.columns)?;

    let gene_map = path_key_file
        .map(|path| GeneIdentifierMap::load(path, config.gene_identifier_format))
        .transpose()?;
    let (records, dropped_unmapped) = match &gene_map {
        Some(gene_map) => {
            let (records, dropped) = gene_map.retain_mapped(records);
            tracing::info!(
                "dropped {} records with gene identifiers missing from key file",
                dropped
            );
            (records, dropped)
        }
        None => (records, 0),
    };

    let matrix = build_matrix_for_mode(&records, gene_map.as_ref(), mode, config);
    matrix.write_tsv(path_output, config.output_format)?;

    let summary = Summary {
        mode,
        n_records: records.len(),
        dropped_unmapped,
        n_samples: matrix.samples().len(),
        n_features: matrix.n_features(),
    };
    Ok((matrix, summary))
}

/// Load a gene list, one gene per line, skipping blank and `#` lines.
///
/// # Errors
///
/// If the file cannot be read.
pub fn load_gene_list<P>(path: P) -> Result<Vec<String>, anyhow::Error>
where
    P: AsRef<Path>,
{
    let reader = std::fs::File::open(path.as_ref())
        .map_err(|e| anyhow::anyhow!("problem opening gene list file: {}", e))
        .map(BufReader::new)?;
    let mut result = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if !line.is_empty() && !line.starts_with('#') {
            result.push(line.to_string());
        }
    }
    Ok(result)
}

/// Main entry point for the `varmat` command.
///
/// # Arguments
///
/// * `common_args` - Commonly used command line arguments.
/// * `args` - Command line arguments specific to `varmat` command.
///
/// # Errors
///
/// If anything goes wrong, it returns a generic `anyhow::Error`.
pub fn run(common_args: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    tracing::info!("  running command `varmat`");
    tracing::info!("  common_args = {:?}", &common_args);
    tracing::info!("  args = {:?}", &args);

    let config = args.config()?;
    let (_, summary) = produce_variant_file(
        &args.path_input,
        &args.path_output,
        args.path_key_file.as_deref(),
        &config,
    )
    .map_err(|e| anyhow::anyhow!("failed to produce variant file: {}", e))?;

    tracing::info!(
        "wrote {} features for {} samples ({} records, {} unmapped records dropped)",
        summary.n_features,
        summary.n_samples,
        summary.n_records,
        summary.dropped_unmapped
    );
    println!("{}", serde_json::to_string(&summary)?);

    Ok(())
}
