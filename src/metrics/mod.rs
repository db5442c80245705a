//! Evaluation of binary predictions against binary truth labels.

use std::path::{Path, PathBuf};

use clap::Parser;

use crate::common::{column_positions, non_na, open_read_maybe_gz, tsv_reader};

/// A metric to compute.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    clap::ValueEnum,
    serde::Deserialize,
    serde::Serialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// `TP / (TP + FN)`
    Sensitivity,
    /// `TN / (TN + FP)`
    Specificity,
    /// `(TP + TN) / N` with `N` the number of rows.
    Accuracy,
}

/// Counts of the confusion matrix of a binary classification.
///
/// A label of `1` is positive and `0` is negative.  Rows with any other or a
/// missing label are in none of the cells but still count towards `total`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct ConfusionCounts {
    /// Predicted 1, truth 1.
    pub tp: usize,
    /// Predicted 1, truth 0.
    pub fp: usize,
    /// Predicted 0, truth 1.
    #[serde(rename = "fn")]
    pub fn_: usize,
    /// Predicted 0, truth 0.
    pub tn: usize,
    /// Number of rows.
    pub total: usize,
}

impl ConfusionCounts {
    /// Count the label pairs.
    ///
    /// # Errors
    ///
    /// If the slices are empty or have different lengths.
    pub fn from_labels(
        predicted: &[Option<f64>],
        truth: &[Option<f64>],
    ) -> Result<Self, anyhow::Error> {
        if truth.is_empty() {
            anyhow::bail!("empty label vectors");
        }
        if predicted.len() != truth.len() {
            anyhow::bail!(
                "predicted length {} != truth length {}",
                predicted.len(),
                truth.len()
            );
        }

        let mut result = Self {
            total: truth.len(),
            ..Default::default()
        };
        for (p, t) in predicted.iter().zip(truth.iter()) {
            match (*p, *t) {
                (Some(p), Some(t)) if p == 1.0 && t == 1.0 => result.tp += 1,
                (Some(p), Some(t)) if p == 1.0 && t == 0.0 => result.fp += 1,
                (Some(p), Some(t)) if p == 0.0 && t == 1.0 => result.fn_ += 1,
                (Some(p), Some(t)) if p == 0.0 && t == 0.0 => result.tn += 1,
                _ => (),
            }
        }
        Ok(result)
    }

    /// Sensitivity, `None` if there are no positives.
    pub fn sensitivity(&self) -> Option<f64> {
        ratio(self.tp, self.tp + self.fn_)
    }

    /// Specificity, `None` if there are no negatives.
    pub fn specificity(&self) -> Option<f64> {
        ratio(self.tn, self.tn + self.fp)
    }

    /// Accuracy, `None` for zero rows.
    pub fn accuracy(&self) -> Option<f64> {
        ratio(self.tp + self.tn, self.total)
    }

    /// Value of the given metric.
    pub fn metric(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Sensitivity => self.sensitivity(),
            Metric::Specificity => self.specificity(),
            Metric::Accuracy => self.accuracy(),
        }
    }
}

fn ratio(numerator: usize, denominator: usize) -> Option<f64> {
    if denominator == 0 {
        None
    } else {
        Some(numerator as f64 / denominator as f64)
    }
}

/// Requested metrics with their counts.
///
/// Metrics that were not requested are left out, undefined ones are `null`.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Report {
    pub counts: ConfusionCounts,
    pub sensitivity: Option<Option<f64>>,
    pub specificity: Option<Option<f64>>,
    pub accuracy: Option<Option<f64>>,
}

/// Compute the `metrics` from the confusion counts.
pub fn calculate(counts: &ConfusionCounts, metrics: &[Metric]) -> Report {
    let mut result = Report {
        counts: *counts,
        ..Default::default()
    };
    for metric in metrics {
        let value = Some(counts.metric(*metric));
        match metric {
            Metric::Sensitivity => result.sensitivity = value,
            Metric::Specificity => result.specificity = value,
            Metric::Accuracy => result.accuracy = value,
        }
    }
    result
}

/// Load predicted and truth labels from the given TSV columns.
///
/// Missing values are kept as `None`.
///
/// # Errors
///
/// If the file cannot be read, a column is missing, or a label is not numeric.
pub fn load_labels<P>(
    path: P,
    predicted_column: &str,
    true_column: &str,
) -> Result<(Vec<Option<f64>>, Vec<Option<f64>>), anyhow::Error>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let mut reader = tsv_reader(
        open_read_maybe_gz(path)
            .map_err(|e| anyhow::anyhow!("problem opening {}: {}", path.display(), e))?,
    );
    let headers = reader.headers()?.clone();
    let idx = column_positions(&headers, &[predicted_column, true_column]).map_err(|column| {
        anyhow::anyhow!("column '{}' not found in {}", column, path.display())
    })?;

    let parse = |value: Option<&str>| -> Result<Option<f64>, anyhow::Error> {
        non_na(value)
            .map(|value| {
                value
                    .parse::<f64>()
                    .map_err(|e| anyhow::anyhow!("invalid label '{}': {}", value, e))
            })
            .transpose()
    };

    let mut predicted = Vec::new();
    let mut truth = Vec::new();
    for record in reader.records() {
        let record = record?;
        predicted.push(parse(record.get(idx[0]))?);
        truth.push(parse(record.get(idx[1]))?);
    }
    Ok((predicted, truth))
}

/// Command line arguments for `metrics` command.
#[derive(Parser, Debug)]
#[command(about = "Sensitivity, specificity, and accuracy of binary predictions", long_about = None)]
pub struct Args {
    /// Path to TSV file with predicted and true labels.
    #[clap(long)]
    pub path_input: PathBuf,
    /// Column with the predicted labels.
    #[clap(long, default_value = "predicted")]
    pub predicted_column: String,
    /// Column with the true labels.
    #[clap(long, default_value = "true")]
    pub true_column: String,
    /// Metrics to compute.
    #[clap(
        long,
        value_enum,
        value_delimiter = ',',
        default_values_t = vec![Metric::Sensitivity, Metric::Specificity, Metric::Accuracy]
    )]
    pub metrics: Vec<Metric>,
}

/// Main entry point for the `metrics` command.
///
/// # Errors
///
/// If anything goes wrong, it returns a generic `anyhow::Error`.
pub fn run(common_args: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    tracing::info!("  running command `metrics`");
    tracing::info!("  common_args = {:?}", &common_args);
    tracing::info!("  args = {:?}", &args);

    let (predicted, truth) = load_labels(&args.path_input, &args.predicted_column, &args.true_column)?;
    let counts = ConfusionCounts::from_labels(&predicted, &truth)?;
    tracing::debug!("confusion counts: {:?}", &counts);
    let report = calculate(&counts, &args.metrics);
    println!("{}", serde_json::to_string(&report)?);

    Ok(())
}

#[cfg(test)]
mod test {
    use super::{calculate, ConfusionCounts, Metric};

    fn counts(tp: usize, fp: usize, fn_: usize, tn: usize) -> ConfusionCounts {
        ConfusionCounts {
            tp,
            fp,
            fn_,
            tn,
            total: tp + fp + fn_ + tn,
        }
    }

    #[rstest::rstest]
    #[case(counts(8, 2, 2, 8), Some(0.8), Some(0.8), Some(0.8))]
    #[case(counts(3, 0, 1, 4), Some(0.75), Some(1.0), Some(0.875))]
    #[case(counts(0, 2, 0, 2), None, Some(0.5), Some(0.5))]
    #[case(counts(2, 0, 2, 0), Some(0.5), None, Some(0.5))]
    fn known_values(
        #[case] counts: ConfusionCounts,
        #[case] sensitivity: Option<f64>,
        #[case] specificity: Option<f64>,
        #[case] accuracy: Option<f64>,
    ) {
        assert_eq!(counts.sensitivity(), sensitivity);
        assert_eq!(counts.specificity(), specificity);
        assert_eq!(counts.accuracy(), accuracy);
    }

    #[test]
    fn from_labels() -> Result<(), anyhow::Error> {
        let predicted = [Some(1.0), Some(1.0), Some(0.0), Some(0.0), None, Some(2.0)];
        let truth = [Some(1.0), Some(0.0), Some(1.0), Some(0.0), Some(1.0), Some(1.0)];

        let counts = ConfusionCounts::from_labels(&predicted, &truth)?;

        assert_eq!(
            counts,
            ConfusionCounts {
                tp: 1,
                fp: 1,
                fn_: 1,
                tn: 1,
                total: 6
            }
        );

        Ok(())
    }

    #[rstest::rstest]
    #[case(&[], &[])]
    #[case(&[Some(1.0)], &[Some(1.0), Some(0.0)])]
    fn from_labels_fails(#[case] predicted: &[Option<f64>], #[case] truth: &[Option<f64>]) {
        assert!(ConfusionCounts::from_labels(predicted, truth).is_err());
    }

    #[test]
    fn calculate_only_requested() {
        let report = calculate(&counts(0, 2, 0, 2), &[Metric::Sensitivity, Metric::Accuracy]);

        assert_eq!(report.sensitivity, Some(None));
        assert_eq!(report.specificity, None);
        assert_eq!(report.accuracy, Some(Some(0.5)));
        assert_eq!(
            serde_json::to_string(&report).unwrap(),
            r#"{"counts":{"tp":0,"fp":2,"fn":0,"tn":2,"total":4},"sensitivity":null,"accuracy":0.5}"#
        );
    }

    #[test]
    fn load_labels() -> Result<(), anyhow::Error> {
        let (predicted, truth) = super::load_labels("tests/data/metrics/labels.tsv", "predicted", "true")?;
        let counts = ConfusionCounts::from_labels(&predicted, &truth)?;

        assert_eq!(predicted.len(), 7);
        assert_eq!(predicted[6], None);
        assert_eq!(counts, ConfusionCounts { tp: 2, fp: 1, fn_: 1, tn: 2, total: 7 });
        assert_eq!(calculate(&counts, &[Metric::Accuracy]).accuracy, Some(Some(4.0 / 7.0)));

        Ok(())
    }

    #[test]
    fn load_labels_missing_column() {
        let err = super::load_labels("tests/data/metrics/labels.tsv", "score", "true").unwrap_err();

        assert!(err.to_string().contains("column 'score' not found"));
    }

    #[test]
    fn run_smoke() -> Result<(), anyhow::Error> {
        let common = crate::common::Args {
            verbose: clap_verbosity_flag::Verbosity::new(1, 0),
        };
        let args = super::Args {
            path_input: "tests/data/metrics/labels.tsv".into(),
            predicted_column: "predicted".into(),
            true_column: "true".into(),
            metrics: vec![Metric::Sensitivity],
        };

        super::run(&common, &args)
    }
}
