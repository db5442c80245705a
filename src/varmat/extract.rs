//! Strategies for deriving matrix features from mutation records.

use super::data::gene_key::{canonical_or_raw, GeneIdentifierMap};
use super::ds::{feature_key, MutationRecord, MUT_ALL_SUFFIX, NONSILENT_SUFFIX};
use super::stats::{Bucket, GeneVariantStats, Thresholds};

/// Derivation of the features that a mutation record sets to 1.
pub trait FeatureExtractionStrategy {
    /// Feature keys to mark for `record`, in marking order.
    fn features(&self, record: &MutationRecord) -> Vec<String>;
}

/// Mark all features of the genes from an explicit list, without thresholds.
#[derive(Debug, Clone)]
pub struct ExplicitList {
    /// Raw gene identifiers to consider.
    genes: rustc_hash::FxHashSet<String>,
}

impl ExplicitList {
    /// Create a new `ExplicitList` for the given raw gene identifiers.
    pub fn new<I: IntoIterator<Item = String>>(genes: I) -> Self {
        Self {
            genes: genes.into_iter().collect(),
        }
    }
}

impl FeatureExtractionStrategy for ExplicitList {
    fn features(&self, record: &MutationRecord) -> Vec<String> {
        let gene = record.gene_identifier.as_str();
        if !self.genes.contains(gene) {
            return Vec::new();
        }

        let mut result = Vec::with_capacity(4);
        if let Some(protein_change) = &record.protein_change {
            result.push(feature_key(gene, protein_change));
        }
        if record.is_nonsilent() {
            result.push(feature_key(gene, NONSILENT_SUFFIX));
        }
        result.push(feature_key(gene, &record.mutation_classification));
        result.push(feature_key(gene, MUT_ALL_SUFFIX));
        result
    }
}

/// Mark the pre-classified copy number calls of the genes from a list.
#[derive(Debug, Clone)]
pub struct CopyNumber {
    /// Raw gene identifiers to consider.
    genes: rustc_hash::FxHashSet<String>,
}

impl CopyNumber {
    /// Create a new `CopyNumber` for the given raw gene identifiers.
    pub fn new<I: IntoIterator<Item = String>>(genes: I) -> Self {
        Self {
            genes: genes.into_iter().collect(),
        }
    }
}

impl FeatureExtractionStrategy for CopyNumber {
    fn features(&self, record: &MutationRecord) -> Vec<String> {
        if self.genes.contains(&record.gene_identifier) {
            vec![feature_key(
                &record.gene_identifier,
                &record.mutation_classification,
            )]
        } else {
            Vec::new()
        }
    }
}

/// Mark the features whose per-gene counts pass the thresholds.
///
/// Construction performs the statistics pass and the pruning over all records,
/// `features` then only consults the surviving buckets.
#[derive(Debug, Clone)]
pub struct ThresholdFiltered<'a> {
    /// The pruned statistics.
    stats: GeneVariantStats,
    /// Translation to canonical gene names, if any.
    gene_map: Option<&'a GeneIdentifierMap>,
}

impl<'a> ThresholdFiltered<'a> {
    /// Create a new `ThresholdFiltered` strategy.
    ///
    /// # Arguments
    ///
    /// * `records` - All mutation records.
    /// * `thresholds` - Thresholds for keeping buckets.
    /// * `exemptions` - Canonical names of genes exempt from the thresholds.
    /// * `gene_map` - Translation to canonical gene names, if any.
    pub fn new(
        records: &[MutationRecord],
        thresholds: &Thresholds,
        exemptions: &rustc_hash::FxHashSet<String>,
        gene_map: Option<&'a GeneIdentifierMap>,
    ) -> Self {
        tracing::info!("Counting each type of variant...");
        let stats = GeneVariantStats::from_records(records);
        let genes_before = stats.len();
        tracing::info!("Dropping variants under threshold...");
        let stats = stats.prune(thresholds, exemptions, gene_map);
        tracing::info!(
            "kept {} of {} genes after applying thresholds",
            stats.len(),
            genes_before
        );
        Self { stats, gene_map }
    }

    /// The pruned statistics.
    pub fn stats(&self) -> &GeneVariantStats {
        &self.stats
    }
}

impl FeatureExtractionStrategy for ThresholdFiltered<'_> {
    fn features(&self, record: &MutationRecord) -> Vec<String> {
        let Some(stats) = self.stats.gene(&record.gene_identifier) else {
            return Vec::new();
        };
        let gene = canonical_or_raw(self.gene_map, &record.gene_identifier);

        let mut result = Vec::with_capacity(4);
        if let Some(protein_change) = &record.protein_change {
            if stats.contains(&Bucket::Variant) {
                result.push(feature_key(gene, protein_change));
            }
        }
        if record.is_nonsilent() && stats.contains(&Bucket::Nonsilent) {
            result.push(feature_key(gene, NONSILENT_SUFFIX));
        }
        if stats.contains(&Bucket::Classification(
            record.mutation_classification.clone(),
        )) {
            result.push(feature_key(gene, &record.mutation_classification));
        }
        if stats.contains(&Bucket::MutAll) {
            result.push(feature_key(gene, MUT_ALL_SUFFIX));
        }
        result
    }
}
