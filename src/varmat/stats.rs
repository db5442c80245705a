//! Per-gene variant statistics and threshold-based pruning.

use super::data::gene_key::{canonical_or_raw, GeneIdentifierMap};
use super::ds::MutationRecord;

/// A statistics bucket of a gene.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Deserialize, serde::Serialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    /// Distinct protein changes.
    Variant,
    /// Records with the given mutation classification.
    Classification(String),
    /// Records with a non-silent classification.
    Nonsilent,
    /// All records.
    MutAll,
}

/// Value stored for a bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BucketValue {
    /// Distinct protein changes; a missing protein change counts as one value.
    ProteinChanges(rustc_hash::FxHashSet<Option<String>>),
    /// Number of records.
    Count(usize),
}

impl BucketValue {
    /// The value compared against the thresholds.
    pub fn size(&self) -> usize {
        match self {
            Self::ProteinChanges(changes) => changes.len(),
            Self::Count(count) => *count,
        }
    }
}

/// Statistics of one gene.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneStats {
    /// The buckets seen for the gene.
    buckets: rustc_hash::FxHashMap<Bucket, BucketValue>,
}

impl GeneStats {
    /// Account for one record of the gene.
    pub fn add(&mut self, record: &MutationRecord) {
        if let BucketValue::ProteinChanges(changes) = self
            .buckets
            .entry(Bucket::Variant)
            .or_insert_with(|| BucketValue::ProteinChanges(Default::default()))
        {
            changes.insert(record.protein_change.clone());
        }

        self.increment(Bucket::Classification(
            record.mutation_classification.clone(),
        ));
        if record.is_nonsilent() {
            self.increment(Bucket::Nonsilent);
        }
        self.increment(Bucket::MutAll);
    }

    fn increment(&mut self, bucket: Bucket) {
        if let BucketValue::Count(count) = self
            .buckets
            .entry(bucket)
            .or_insert(BucketValue::Count(0))
        {
            *count += 1;
        }
    }

    /// Whether the bucket is present.
    pub fn contains(&self, bucket: &Bucket) -> bool {
        self.buckets.contains_key(bucket)
    }

    /// Size of the bucket, if present.
    pub fn size(&self, bucket: &Bucket) -> Option<usize> {
        self.buckets.get(bucket).map(BucketValue::size)
    }

    /// Number of buckets.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Whether no bucket is left.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

/// Minimal bucket sizes for a bucket to be kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct Thresholds {
    /// Minimal number of distinct protein changes of a gene.
    pub variant: usize,
    /// Minimal number of records in the other buckets.
    pub change: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            variant: 80,
            change: 80,
        }
    }
}

impl Thresholds {
    /// Whether `value` passes the threshold for `bucket`.
    pub fn passes(&self, bucket: &Bucket, value: &BucketValue) -> bool {
        let threshold = match bucket {
            Bucket::Variant => self.variant,
            _ => self.change,
        };
        value.size() >= threshold
    }
}

/// Statistics of all genes, keyed by raw gene identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneVariantStats {
    /// Per-gene statistics.
    genes: rustc_hash::FxHashMap<String, GeneStats>,
}

impl GeneVariantStats {
    /// Collect the statistics over all records.
    pub fn from_records(records: &[MutationRecord]) -> Self {
        let mut genes: rustc_hash::FxHashMap<String, GeneStats> = Default::default();
        for record in records {
            genes
                .entry(record.gene_identifier.clone())
                .or_default()
                .add(record);
        }
        Self { genes }
    }

    /// Drop the buckets failing `thresholds` and genes without buckets.
    ///
    /// Genes whose canonical name is in `exemptions` are kept as they are.
    ///
    /// # Arguments
    ///
    /// * `thresholds` - The thresholds to apply.
    /// * `exemptions` - Canonical names of the genes not to prune.
    /// * `gene_map` - Translation to canonical gene names, if any.
    pub fn prune(
        self,
        thresholds: &Thresholds,
        exemptions: &rustc_hash::FxHashSet<String>,
        gene_map: Option<&GeneIdentifierMap>,
    ) -> Self {
        let genes = self
            .genes
            .into_iter()
            .filter_map(|(gene, stats)| {
                if exemptions.contains(canonical_or_raw(gene_map, &gene)) {
                    return Some((gene, stats));
                }
                let buckets = stats
                    .buckets
                    .into_iter()
                    .filter(|(bucket, value)| thresholds.passes(bucket, value))
                    .collect::<rustc_hash::FxHashMap<_, _>>();
                if buckets.is_empty() {
                    tracing::trace!("dropping gene {} without buckets", &gene);
                    None
                } else {
                    Some((gene, GeneStats { buckets }))
                }
            })
            .collect();
        Self { genes }
    }

    /// Statistics for the given raw gene identifier.
    pub fn gene(&self, gene: &str) -> Option<&GeneStats> {
        self.genes.get(gene)
    }

    /// Number of genes.
    pub fn len(&self) -> usize {
        self.genes.len()
    }

    /// Whether there are no genes.
    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::{Bucket, GeneVariantStats, Thresholds};
    use crate::varmat::data::gene_key::GeneIdentifierMap;
    use crate::varmat::ds::{test::record, MutationRecord};

    fn example_records() -> Vec<MutationRecord> {
        vec![
            record("TP53", "S1", "Missense_Mutation", Some("p.R273H")),
            record("TP53", "S2", "Missense_Mutation", Some("p.R175H")),
            record("TP53", "S2", "Silent", None),
            record("TP53", "S3", "Missense_Mutation", Some("p.R273H")),
            record("KRAS", "S1", "Missense_Mutation", Some("p.G12D")),
        ]
    }

    fn thresholds(variant: usize, change: usize) -> Thresholds {
        Thresholds { variant, change }
    }

    #[test]
    fn from_records() {
        let stats = GeneVariantStats::from_records(&example_records());

        assert_eq!(stats.len(), 2);
        let tp53 = stats.gene("TP53").unwrap();
        // p.R273H, p.R175H and the missing protein change
        assert_eq!(tp53.size(&Bucket::Variant), Some(3));
        assert_eq!(
            tp53.size(&Bucket::Classification("Missense_Mutation".into())),
            Some(3)
        );
        assert_eq!(tp53.size(&Bucket::Classification("Silent".into())), Some(1));
        assert_eq!(tp53.size(&Bucket::Nonsilent), Some(3));
        assert_eq!(tp53.size(&Bucket::MutAll), Some(4));
        assert_eq!(tp53.len(), 5);
    }

    #[test]
    fn mut_all_and_nonsilent_count_every_record() {
        // A new classification does not restart the per-gene totals.
        let stats = GeneVariantStats::from_records(&[
            record("TP53", "S1", "Missense_Mutation", None),
            record("TP53", "S2", "Missense_Mutation", None),
            record("TP53", "S3", "Nonsense_Mutation", None),
            record("TP53", "S4", "Silent", None),
            record("TP53", "S5", "Frame_Shift_Del", None),
        ]);
        let tp53 = stats.gene("TP53").unwrap();

        assert_eq!(tp53.size(&Bucket::MutAll), Some(5));
        assert_eq!(tp53.size(&Bucket::Nonsilent), Some(4));
    }

    #[test]
    fn nonsilent_bucket_absent_for_silent_only_gene() {
        let stats = GeneVariantStats::from_records(&[record("TTN", "S1", "Silent", None)]);

        assert!(!stats.gene("TTN").unwrap().contains(&Bucket::Nonsilent));
    }

    #[test]
    fn classification_does_not_collide_with_synthetic_buckets() {
        let stats = GeneVariantStats::from_records(&[
            record("G", "S1", "MUT_All", None),
            record("G", "S2", "Nonsilent", None),
        ]);
        let g = stats.gene("G").unwrap();

        assert_eq!(g.size(&Bucket::MutAll), Some(2));
        assert_eq!(g.size(&Bucket::Nonsilent), Some(2));
        assert_eq!(g.size(&Bucket::Classification("MUT_All".into())), Some(1));
        assert_eq!(g.size(&Bucket::Classification("Nonsilent".into())), Some(1));
    }

    #[rstest::rstest]
    #[case(3, 3, true, true, false)]
    #[case(4, 3, false, true, false)]
    #[case(3, 4, true, false, false)]
    #[case(1, 1, true, true, true)]
    fn prune_thresholds_are_inclusive(
        #[case] variant: usize,
        #[case] change: usize,
        #[case] keeps_variant: bool,
        #[case] keeps_missense: bool,
        #[case] keeps_silent: bool,
    ) {
        let stats = GeneVariantStats::from_records(&example_records()).prune(
            &thresholds(variant, change),
            &Default::default(),
            None,
        );

        let tp53 = stats.gene("TP53").unwrap();
        assert_eq!(tp53.contains(&Bucket::Variant), keeps_variant);
        assert_eq!(
            tp53.contains(&Bucket::Classification("Missense_Mutation".into())),
            keeps_missense
        );
        assert_eq!(
            tp53.contains(&Bucket::Classification("Silent".into())),
            keeps_silent
        );
    }

    #[test]
    fn prune_drops_genes_without_buckets() {
        let stats = GeneVariantStats::from_records(&example_records()).prune(
            &thresholds(2, 2),
            &Default::default(),
            None,
        );

        assert!(stats.gene("KRAS").is_none());
        assert!(stats.gene("TP53").is_some());
        assert!(!stats.gene("TP53").unwrap().is_empty());
    }

    #[test]
    fn prune_respects_exemptions() {
        let exemptions = ["KRAS".to_string()].into_iter().collect();
        let stats = GeneVariantStats::from_records(&example_records()).prune(
            &thresholds(100, 100),
            &exemptions,
            None,
        );

        assert_eq!(stats.len(), 1);
        assert_eq!(stats.gene("KRAS").unwrap().len(), 4);
    }

    #[test]
    fn prune_exemptions_use_canonical_names() {
        let records = vec![record("ENSG1", "S1", "Missense_Mutation", None)];
        let gene_map =
            GeneIdentifierMap::from_pairs(vec![("ENSG1".to_string(), "TP53".to_string())]);
        let exemptions = ["TP53".to_string()].into_iter().collect();

        let stats = GeneVariantStats::from_records(&records).prune(
            &thresholds(100, 100),
            &exemptions,
            Some(&gene_map),
        );

        assert!(stats.gene("ENSG1").is_some());
    }

    #[rstest::rstest]
    #[case(1, 1)]
    #[case(2, 3)]
    #[case(3, 1)]
    #[case(5, 5)]
    fn prune_is_idempotent(#[case] variant: usize, #[case] change: usize) {
        let exemptions = Default::default();
        let once = GeneVariantStats::from_records(&example_records()).prune(
            &thresholds(variant, change),
            &exemptions,
            None,
        );
        let twice = once
            .clone()
            .prune(&thresholds(variant, change), &exemptions, None);

        assert_eq!(once, twice);
    }

    #[test]
    fn prune_leaves_only_passing_buckets() {
        let stats = GeneVariantStats::from_records(&example_records()).prune(
            &thresholds(3, 2),
            &Default::default(),
            None,
        );

        for gene in ["TP53", "KRAS"] {
            if let Some(gene_stats) = stats.gene(gene) {
                assert!(!gene_stats.is_empty());
                for (bucket, value) in &gene_stats.buckets {
                    assert!(thresholds(3, 2).passes(bucket, value));
                }
            }
        }
    }
}
