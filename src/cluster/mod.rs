//! Ordering of samples by hierarchical clustering within sample groups.

pub mod linkage;

use std::{
    collections::BTreeMap,
    io::Write as _,
    path::{Path, PathBuf},
};

use clap::Parser;

use crate::common::{column_positions, find_duplicates, non_na, open_read_maybe_gz, tsv_reader};

/// Numeric matrix with features as rows and samples as columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleMatrix {
    /// Column vector by sample name, in column order.
    columns: indexmap::IndexMap<String, Vec<f64>>,
}

impl SampleMatrix {
    /// Construct from `(sample, column)` pairs.
    pub fn from_columns<I>(columns: I) -> Self
    where
        I: IntoIterator<Item = (String, Vec<f64>)>,
    {
        Self {
            columns: columns.into_iter().collect(),
        }
    }

    /// Load a matrix as written by `varmat`: a header with a corner cell and the
    /// sample names, then one row per feature.
    ///
    /// # Errors
    ///
    /// If the file cannot be read, a sample name occurs more than once, or a cell
    /// is not numeric.
    pub fn load<P>(path: P) -> Result<Self, anyhow::Error>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let mut reader = tsv_reader(
            open_read_maybe_gz(path)
                .map_err(|e| anyhow::anyhow!("problem opening {}: {}", path.display(), e))?,
        );
        let samples = reader
            .headers()?
            .iter()
            .skip(1)
            .map(str::to_string)
            .collect::<Vec<_>>();
        let duplicates = find_duplicates(samples.iter().map(String::as_str));
        if !duplicates.is_empty() {
            anyhow::bail!(
                "duplicate sample names in {}: {}",
                path.display(),
                duplicates.join(", ")
            );
        }

        let mut columns = vec![Vec::new(); samples.len()];
        for record in reader.records() {
            let record = record?;
            let feature = record.get(0).unwrap_or_default();
            for (i, column) in columns.iter_mut().enumerate() {
                let value = record.get(i + 1).unwrap_or_default();
                column.push(value.parse::<f64>().map_err(|e| {
                    anyhow::anyhow!(
                        "invalid value '{}' for feature {} and sample {}: {}",
                        value,
                        feature,
                        &samples[i],
                        e
                    )
                })?);
            }
        }

        tracing::debug!(
            "loaded {} samples from {}",
            samples.len(),
            path.display()
        );
        Ok(Self::from_columns(samples.into_iter().zip(columns)))
    }

    /// Column of the given sample.
    pub fn column(&self, sample: &str) -> Option<&[f64]> {
        self.columns.get(sample).map(Vec::as_slice)
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether there are no samples.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Collect the members of each group, groups sorted, members in input order.
pub fn group_members<I>(pairs: I) -> BTreeMap<String, Vec<String>>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut result: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (sample, group) in pairs {
        result.entry(group).or_default().push(sample);
    }
    result
}

/// Load `(sample, group)` pairs from a TSV file; rows with missing values are skipped.
///
/// # Errors
///
/// If the file cannot be read or a column is missing.
pub fn load_groups<P>(
    path: P,
    sample_column: &str,
    group_column: &str,
) -> Result<Vec<(String, String)>, anyhow::Error>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let mut reader = tsv_reader(
        open_read_maybe_gz(path)
            .map_err(|e| anyhow::anyhow!("problem opening {}: {}", path.display(), e))?,
    );
    let headers = reader.headers()?.clone();
    let idx = column_positions(&headers, &[sample_column, group_column]).map_err(|column| {
        anyhow::anyhow!("column '{}' not found in {}", column, path.display())
    })?;

    let mut result = Vec::new();
    for record in reader.records() {
        let record = record?;
        match (non_na(record.get(idx[0])), non_na(record.get(idx[1]))) {
            (Some(sample), Some(group)) => result.push((sample.to_string(), group.to_string())),
            _ => tracing::warn!("skipping group row without sample or group: {:?}", &record),
        }
    }
    Ok(result)
}

/// Order the samples of one group by the leaves of its dendrogram.
///
/// # Errors
///
/// If a member is missing from the matrix or a distance is not finite.
pub fn cluster_order(matrix: &SampleMatrix, members: &[String]) -> Result<Vec<String>, anyhow::Error> {
    if members.len() < 2 {
        return Ok(members.to_vec());
    }

    let columns = members
        .iter()
        .map(|sample| {
            matrix
                .column(sample)
                .ok_or_else(|| anyhow::anyhow!("sample {} not found in matrix", sample))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut dist = vec![vec![0.0; members.len()]; members.len()];
    for i in 0..members.len() {
        for j in (i + 1)..members.len() {
            let d = linkage::correlation_distance(columns[i], columns[j]);
            if !d.is_finite() {
                anyhow::bail!(
                    "correlation distance of samples {} and {} is not finite",
                    &members[i],
                    &members[j]
                );
            }
            dist[i][j] = d;
            dist[j][i] = d;
        }
    }

    let merges = linkage::average_linkage(&dist);
    Ok(linkage::leaf_order(&merges, members.len())
        .into_iter()
        .map(|i| members[i].clone())
        .collect())
}

/// Concatenate the cluster orders of all groups, groups in sorted order.
///
/// # Errors
///
/// See [`cluster_order`].
pub fn order_within_groups(
    matrix: &SampleMatrix,
    groups: &BTreeMap<String, Vec<String>>,
) -> Result<Vec<String>, anyhow::Error> {
    let mut result = Vec::new();
    for (group, members) in groups {
        tracing::debug!("clustering {} samples of group {}", members.len(), group);
        result.extend(
            cluster_order(matrix, members)
                .map_err(|e| anyhow::anyhow!("problem clustering group {}: {}", group, e))?,
        );
    }
    Ok(result)
}

/// Command line arguments for `cluster-order` command.
#[derive(Parser, Debug)]
#[command(about = "Order samples by hierarchical clustering within groups", long_about = None)]
pub struct Args {
    /// Path to the feature matrix TSV file.
    #[clap(long)]
    pub path_matrix: PathBuf,
    /// Path to the TSV file assigning samples to groups.
    #[clap(long)]
    pub path_groups: PathBuf,
    /// Column of the groups file with the sample names.
    #[clap(long, default_value = "sample")]
    pub sample_column: String,
    /// Column of the groups file with the group names.
    #[clap(long, default_value = "group")]
    pub group_column: String,
    /// Path to the output file, one sample per line; stdout if omitted.
    #[clap(long)]
    pub path_output: Option<PathBuf>,
}

/// Main entry point for the `cluster-order` command.
///
/// # Errors
///
/// If anything goes wrong, it returns a generic `anyhow::Error`.
pub fn run(common_args: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    tracing::info!("  running command `cluster-order`");
    tracing::info!("  common_args = {:?}", &common_args);
    tracing::info!("  args = {:?}", &args);

    let matrix = SampleMatrix::load(&args.path_matrix)?;
    let groups = group_members(load_groups(
        &args.path_groups,
        &args.sample_column,
        &args.group_column,
    )?);
    tracing::info!("ordering {} samples in {} groups", matrix.len(), groups.len());
    let order = order_within_groups(&matrix, &groups)?;

    let mut writer: Box<dyn std::io::Write> = match &args.path_output {
        Some(path) => Box::new(std::io::BufWriter::new(
            std::fs::File::create(path)
                .map_err(|e| anyhow::anyhow!("problem creating {}: {}", path.display(), e))?,
        )),
        None => Box::new(std::io::stdout().lock()),
    };
    for sample in &order {
        writeln!(writer, "{}", sample)?;
    }
    writer.flush()?;

    Ok(())
}
