//! The feature by sample matrix and its serialization.

use std::path::Path;

use itertools::Itertools as _;

use super::ds::{MutationRecord, SampleIndex};
use super::error::Error;
use super::extract::FeatureExtractionStrategy;

/// Layout of the output file.
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
pub enum OutputFormat {
    /// One column per sample with `0`/`1` cells.
    #[default]
    SparseBinaryMatrix,
    /// One comma-separated list of the carrying samples per feature.
    ListOfSamples,
}

/// Binary matrix with features as rows and samples as columns.
///
/// Rows are kept in the order in which features are first marked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureMatrix {
    /// Sample names in column order.
    samples: Vec<String>,
    /// Row by feature key, each of length `samples.len()`.
    rows: indexmap::IndexMap<String, Vec<u8>>,
}

impl FeatureMatrix {
    /// Create an empty matrix for the given sample names.
    pub fn new(samples: Vec<String>) -> Self {
        Self {
            samples,
            rows: Default::default(),
        }
    }

    /// Build the matrix by marking the features of each record.
    ///
    /// # Arguments
    ///
    /// * `records` - The mutation records, in marking order.
    /// * `sample_index` - Columns of the samples; must cover all records.
    /// * `strategy` - Derivation of features from records.
    pub fn build<'r, I>(
        records: I,
        sample_index: &SampleIndex,
        strategy: &dyn FeatureExtractionStrategy,
    ) -> Self
    where
        I: IntoIterator<Item = &'r MutationRecord>,
    {
        let mut result = Self::new(sample_index.samples().to_vec());
        for record in records {
            let Some(column) = sample_index.get(&record.sample_identifier) else {
                tracing::warn!(
                    "sample {} not in index, skipping record",
                    &record.sample_identifier
                );
                continue;
            };
            for key in strategy.features(record) {
                result.mark(key, column);
            }
        }
        result
    }

    /// Set the cell of feature `key` and sample `column` to 1.
    ///
    /// # Panics
    ///
    /// If `column` is out of range.
    pub fn mark(&mut self, key: String, column: usize) {
        let n_samples = self.samples.len();
        self.rows
            .entry(key)
            .or_insert_with(|| vec![0; n_samples])[column] = 1;
    }

    /// Sample names in column order.
    pub fn samples(&self) -> &[String] {
        &self.samples
    }

    /// Number of rows.
    pub fn n_features(&self) -> usize {
        self.rows.len()
    }

    /// Feature keys in row order.
    pub fn features(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(String::as_str)
    }

    /// The row of the given feature.
    pub fn row(&self, key: &str) -> Option<&[u8]> {
        self.rows.get(key).map(Vec::as_slice)
    }

    /// Iterate over `(feature, row)` pairs in row order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.rows
            .iter()
            .map(|(key, row)| (key.as_str(), row.as_slice()))
    }

    /// Rewrite TCGA-style sample names, see [`truncate_sample_name`].
    ///
    /// Names that collide after rewriting are reported as warnings.
    pub fn truncate_sample_names(&mut self) {
        tracing::info!("Editing sample names...");
        self.samples = self
            .samples
            .iter()
            .map(|sample| truncate_sample_name(sample))
            .collect();
        for duplicate in crate::common::find_duplicates(self.samples.iter().map(String::as_str)) {
            tracing::warn!(
                "sample name {} occurs multiple times after truncation",
                duplicate
            );
        }
    }

    /// Write the matrix as TSV in the given format.
    ///
    /// # Errors
    ///
    /// If the file cannot be created or written.
    pub fn write_tsv<P>(&self, path: P, format: OutputFormat) -> Result<(), Error>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        tracing::info!("Writing to {}", path.display());
        let file = std::fs::File::create(path).map_err(|e| Error::io(path, e))?;
        self.write(file, format).map_err(|e| Error::csv(path, e))
    }

    /// Write the matrix as TSV in the given format to `writer`.
    pub fn write<W: std::io::Write>(&self, writer: W, format: OutputFormat) -> Result<(), csv::Error> {
        let mut csv_writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .flexible(true)
            .from_writer(writer);

        match format {
            OutputFormat::SparseBinaryMatrix => {
                csv_writer.write_record(
                    std::iter::once("").chain(self.samples.iter().map(String::as_str)),
                )?;
                for (key, row) in self.iter() {
                    csv_writer.write_record(
                        std::iter::once(key.to_string())
                            .chain(row.iter().map(|value| value.to_string())),
                    )?;
                }
            }
            OutputFormat::ListOfSamples => {
                csv_writer.write_record(["feature", "samples"])?;
                for (key, row) in self.iter() {
                    let samples = row
                        .iter()
                        .zip(self.samples.iter())
                        .filter(|(value, _)| **value == 1)
                        .map(|(_, sample)| sample)
                        .join(",");
                    csv_writer.write_record([key, samples.as_str()])?;
                }
            }
        }

        csv_writer.flush()?;
        Ok(())
    }
}

/// Keep the first three `-`-separated tokens of `sample`, joined by `_`.
///
/// Turns TCGA barcodes like `TCGA-A1-B2C3-01` into `TCGA_A1_B2C3`.
pub fn truncate_sample_name(sample: &str) -> String {
    sample.split('-').take(3).join("_")
}

#[cfg(test)]
mod test {
    use super::{FeatureMatrix, OutputFormat};
    use crate::varmat::ds::{test::record, SampleIndex};
    use crate::varmat::extract::ExplicitList;

    fn example_matrix() -> FeatureMatrix {
        let mut matrix = FeatureMatrix::new(vec!["S1".into(), "S2".into(), "S3".into()]);
        matrix.mark("TP53_MUT_All".into(), 0);
        matrix.mark("TP53_MUT_All".into(), 2);
        matrix.mark("KRAS_MUT_All".into(), 1);
        matrix
    }

    fn write_to_string(matrix: &FeatureMatrix, format: OutputFormat) -> String {
        let mut buf = Vec::new();
        matrix.write(&mut buf, format).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[rstest::rstest]
    #[case("TCGA-A1-B2C3-01", "TCGA_A1_B2C3")]
    #[case("TCGA-A1-B2C3-01A-11D-A10Y-09", "TCGA_A1_B2C3")]
    #[case("TCGA-A1", "TCGA_A1")]
    #[case("sample1", "sample1")]
    fn truncate_sample_name(#[case] sample: &str, #[case] expected: &str) {
        assert_eq!(super::truncate_sample_name(sample), expected);
    }

    #[test]
    fn mark_keeps_first_seen_row_order() {
        let matrix = example_matrix();

        assert_eq!(
            matrix.features().collect::<Vec<_>>(),
            vec!["TP53_MUT_All", "KRAS_MUT_All"]
        );
        assert_eq!(matrix.row("TP53_MUT_All"), Some(&[1u8, 0, 1][..]));
        assert_eq!(matrix.row("KRAS_MUT_All"), Some(&[0u8, 1, 0][..]));
        assert_eq!(matrix.row("BRAF_MUT_All"), None);
    }

    #[test]
    fn build() {
        let records = vec![
            record("TP53", "S1", "Silent", None),
            record("TP53", "S2", "Missense_Mutation", Some("p.R273H")),
            record("KRAS", "S2", "Missense_Mutation", Some("p.G12D")),
        ];
        let sample_index = SampleIndex::from_records(&records);
        let strategy = ExplicitList::new(vec!["TP53".to_string()]);

        let matrix = FeatureMatrix::build(&records, &sample_index, &strategy);

        assert_eq!(matrix.samples(), &["S1", "S2"]);
        insta::assert_yaml_snapshot!(matrix.features().collect::<Vec<_>>(), @r###"
        - TP53_Silent
        - TP53_MUT_All
        - TP53_p.R273H
        - TP53_Nonsilent
        - TP53_Missense_Mutation
        "###);
        for (_, row) in matrix.iter() {
            assert_eq!(row.len(), 2);
        }
        assert_eq!(matrix.row("TP53_MUT_All"), Some(&[1u8, 1][..]));
        assert_eq!(matrix.row("TP53_Nonsilent"), Some(&[0u8, 1][..]));
    }

    #[test]
    fn write_sparse_binary_matrix() {
        assert_eq!(
            write_to_string(&example_matrix(), OutputFormat::SparseBinaryMatrix),
            "\tS1\tS2\tS3\nTP53_MUT_All\t1\t0\t1\nKRAS_MUT_All\t0\t1\t0\n"
        );
    }

    #[test]
    fn write_list_of_samples() {
        assert_eq!(
            write_to_string(&example_matrix(), OutputFormat::ListOfSamples),
            "feature\tsamples\nTP53_MUT_All\tS1,S3\nKRAS_MUT_All\tS2\n"
        );
    }

    #[test]
    fn write_empty_matrix_keeps_header() {
        let matrix = FeatureMatrix::new(vec!["S1".into(), "S2".into()]);

        assert_eq!(
            write_to_string(&matrix, OutputFormat::SparseBinaryMatrix),
            "\tS1\tS2\n"
        );
    }

    #[tracing_test::traced_test]
    #[test]
    fn truncate_sample_names_warns_on_collisions() {
        let mut matrix = FeatureMatrix::new(vec![
            "TCGA-A1-A0SF-01A".into(),
            "TCGA-A1-A0SF-10A".into(),
            "TCGA-A1-A0SB-01A".into(),
        ]);

        matrix.truncate_sample_names();

        assert_eq!(
            matrix.samples(),
            &["TCGA_A1_A0SF", "TCGA_A1_A0SF", "TCGA_A1_A0SB"]
        );
        assert!(logs_contain(
            "sample name TCGA_A1_A0SF occurs multiple times after truncation"
        ));
    }

    #[test]
    fn write_tsv_to_unwritable_path_fails() {
        let err = example_matrix()
            .write_tsv("/nonexistent-dir/out.tsv", OutputFormat::SparseBinaryMatrix)
            .unwrap_err();

        assert!(matches!(err, crate::varmat::error::Error::Io { .. }));
    }
}
