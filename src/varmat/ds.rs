//! Shared data structures for `varmat`.

/// Classification of synonymous mutations; everything else counts as "non-silent".
pub const SILENT: &str = "Silent";

/// Suffix of the feature marking any non-silent mutation in a gene.
pub const NONSILENT_SUFFIX: &str = "Nonsilent";

/// Suffix of the feature marking any mutation in a gene.
pub const MUT_ALL_SUFFIX: &str = "MUT_All";

/// One row of the mutation annotation table.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct MutationRecord {
    /// Raw gene identifier, e.g., `TP53` or `ENSG00000141510`.
    pub gene_identifier: String,
    /// Sample identifier, e.g., a TCGA barcode.
    pub sample_identifier: String,
    /// Mutation classification, e.g., `Missense_Mutation`.
    pub mutation_classification: String,
    /// Protein change, e.g., `p.R273H`, if any.
    pub protein_change: Option<String>,
}

impl MutationRecord {
    /// Whether the record describes a non-silent mutation.
    pub fn is_nonsilent(&self) -> bool {
        self.mutation_classification != SILENT
    }
}

/// Build the feature key `<gene>_<suffix>`.
pub fn feature_key(gene: &str, suffix: &str) -> String {
    format!("{}_{}", gene, suffix)
}

/// Distinct raw gene identifiers in order of first occurrence.
pub fn genes_first_seen(records: &[MutationRecord]) -> Vec<&str> {
    records
        .iter()
        .map(|record| record.gene_identifier.as_str())
        .collect::<indexmap::IndexSet<_>>()
        .into_iter()
        .collect()
}

/// Records grouped by gene, genes in the order of `genes`.
///
/// Within a gene the records keep file order.  Records of genes not in `genes`
/// are left out and a repeated gene is only visited once.
pub fn records_by_gene<'a, I, S>(records: &'a [MutationRecord], genes: I) -> Vec<&'a MutationRecord>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut by_gene: rustc_hash::FxHashMap<&str, Vec<&MutationRecord>> = Default::default();
    for record in records {
        by_gene
            .entry(record.gene_identifier.as_str())
            .or_default()
            .push(record);
    }

    let mut result = Vec::with_capacity(records.len());
    for gene in genes {
        if let Some(group) = by_gene.remove(gene.as_ref()) {
            result.extend(group);
        }
    }
    result
}

/// Mapping from sample identifier to matrix column.
///
/// Columns are assigned in order of first occurrence of the sample in the records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleIndex {
    /// Sample identifiers in column order.
    samples: Vec<String>,
    /// Mapping from sample identifier to column.
    sample_to_idx: rustc_hash::FxHashMap<String, usize>,
}

impl SampleIndex {
    /// Construct from the given records.
    pub fn from_records(records: &[MutationRecord]) -> Self {
        let mut result = Self::default();
        for record in records {
            if !result.sample_to_idx.contains_key(&record.sample_identifier) {
                result
                    .sample_to_idx
                    .insert(record.sample_identifier.clone(), result.samples.len());
                result.samples.push(record.sample_identifier.clone());
            }
        }
        result
    }

    /// Number of samples, i.e., matrix columns.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether there are no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Column of the given sample, if known.
    pub fn get(&self, sample: &str) -> Option<usize> {
        self.sample_to_idx.get(sample).copied()
    }

    /// Sample identifiers in column order.
    pub fn samples(&self) -> &[String] {
        &self.samples
    }
}

#[cfg(test)]
pub mod test {
    use super::MutationRecord;

    /// Shortcut for building records in tests.
    pub fn record(gene: &str, sample: &str, class: &str, change: Option<&str>) -> MutationRecord {
        MutationRecord {
            gene_identifier: gene.to_string(),
            sample_identifier: sample.to_string(),
            mutation_classification: class.to_string(),
            protein_change: change.map(str::to_string),
        }
    }

    #[test]
    fn sample_index_first_seen_order() {
        let records = vec![
            record("TP53", "S3", "Silent", None),
            record("KRAS", "S1", "Missense_Mutation", Some("p.G12D")),
            record("TP53", "S3", "Missense_Mutation", None),
            record("TP53", "S2", "Missense_Mutation", None),
        ];

        let index = super::SampleIndex::from_records(&records);

        assert_eq!(index.len(), 3);
        assert_eq!(index.samples(), &["S3", "S1", "S2"]);
        assert_eq!(index.get("S1"), Some(1));
        assert_eq!(index.get("S4"), None);
    }

    #[test]
    fn sample_index_empty() {
        let index = super::SampleIndex::from_records(&[]);
        assert!(index.is_empty());
    }

    #[test]
    fn nonsilent() {
        assert!(!record("TP53", "S1", "Silent", None).is_nonsilent());
        assert!(record("TP53", "S1", "Nonsense_Mutation", None).is_nonsilent());
    }

    #[test]
    fn records_by_gene_groups_in_gene_order() {
        let records = vec![
            record("TP53", "S1", "Missense_Mutation", None),
            record("KRAS", "S1", "Missense_Mutation", None),
            record("TP53", "S2", "Silent", None),
            record("TTN", "S2", "Silent", None),
        ];

        assert_eq!(super::genes_first_seen(&records), vec!["TP53", "KRAS", "TTN"]);

        let grouped = super::records_by_gene(&records, super::genes_first_seen(&records));
        assert_eq!(
            grouped
                .iter()
                .map(|r| (r.gene_identifier.as_str(), r.sample_identifier.as_str()))
                .collect::<Vec<_>>(),
            vec![("TP53", "S1"), ("TP53", "S2"), ("KRAS", "S1"), ("TTN", "S2")]
        );

        let listed = super::records_by_gene(&records, ["KRAS", "BRAF", "TP53", "KRAS"]);
        assert_eq!(
            listed
                .iter()
                .map(|r| r.gene_identifier.as_str())
                .collect::<Vec<_>>(),
            vec!["KRAS", "TP53", "TP53"]
        );
    }

    #[test]
    fn feature_key() {
        assert_eq!(super::feature_key("TP53", "MUT_All"), "TP53_MUT_All");
    }
}
