//! Term weighting schemes
//!
//! The formulas follow Cummins & O'Riordan, "Evolved term-weighting schemes
//! in Information Retrieval". A scheme is chosen by its ID when the index is
//! built and cannot change afterwards.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::base::{DocId, Frequency};
use crate::error::{Error, Result};
use crate::stats::CorpusStatistics;

/// Slope of the pivoted length normalization
const PIVOT_SLOPE: f64 = 0.2;
const BM25_K: f64 = 2.;
const BM25_B: f64 = 0.75;

/// Which corpus statistics a scheme reads
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RequiredStatistics {
    pub collection_size: bool,
    pub document_length: bool,
    pub average_length: bool,
    pub max_frequency: bool,
    pub collection_frequency: bool,
}

/// Term statistics available when weighting one posting
#[derive(Clone, Copy, Debug)]
pub struct TermStatistics {
    /// Number of documents containing the term
    pub document_frequency: usize,

    /// Total number of occurrences of the term
    pub collection_frequency: u64,
}

impl TermStatistics {
    pub fn new(document_frequency: usize, collection_frequency: u64) -> Self {
        Self {
            document_frequency,
            collection_frequency,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum WeightFunction {
    TfIdf,
    NormalizedTfIdf,
    NormalizedFrequency,
    PivotedLengthNormalization,
    Bm25,
    ModifiedBm25,
    EvolutionaryScheme,
    DivergenceFromRandomness,
    AxiomaticScheme,
}

impl WeightFunction {
    /// All the schemes, in ID order
    pub const ALL: [WeightFunction; 9] = [
        WeightFunction::TfIdf,
        WeightFunction::NormalizedTfIdf,
        WeightFunction::NormalizedFrequency,
        WeightFunction::PivotedLengthNormalization,
        WeightFunction::Bm25,
        WeightFunction::ModifiedBm25,
        WeightFunction::EvolutionaryScheme,
        WeightFunction::DivergenceFromRandomness,
        WeightFunction::AxiomaticScheme,
    ];

    pub fn from_id(id: u8) -> Result<Self> {
        Self::ALL
            .get(id as usize)
            .copied()
            .ok_or(Error::UnknownWeightFunction(id))
    }

    pub fn id(&self) -> u8 {
        *self as u8
    }

    pub fn name(&self) -> &'static str {
        match self {
            WeightFunction::TfIdf => "TF-IDF",
            WeightFunction::NormalizedTfIdf => "Normalized TF-IDF",
            WeightFunction::NormalizedFrequency => "Normalized Frequency",
            WeightFunction::PivotedLengthNormalization => "Pivoted Length Normalization",
            WeightFunction::Bm25 => "BM25",
            WeightFunction::ModifiedBm25 => "Modified BM25",
            WeightFunction::EvolutionaryScheme => "Evolutionary Learned Scheme",
            WeightFunction::DivergenceFromRandomness => "Divergence From Randomness",
            WeightFunction::AxiomaticScheme => "Axiomatic Scheme",
        }
    }

    pub fn required_statistics(&self) -> RequiredStatistics {
        let length_based = RequiredStatistics {
            collection_size: true,
            document_length: true,
            average_length: true,
            ..Default::default()
        };

        match self {
            WeightFunction::TfIdf | WeightFunction::NormalizedTfIdf => RequiredStatistics {
                collection_size: true,
                ..Default::default()
            },
            WeightFunction::NormalizedFrequency => RequiredStatistics {
                max_frequency: true,
                ..Default::default()
            },
            WeightFunction::EvolutionaryScheme => RequiredStatistics {
                collection_frequency: true,
                ..length_based
            },
            _ => length_based,
        }
    }

    /// Weight of a term with frequency `tf` in document `doc_id`
    pub fn weight(
        &self,
        tf: Frequency,
        term: &TermStatistics,
        doc_id: DocId,
        stats: &CorpusStatistics,
    ) -> f64 {
        let tf = tf as f64;
        let df = term.document_frequency as f64;
        let n = stats.collection_size() as f64;

        // Length ratio (only used by length-normalized schemes)
        let length_ratio = || stats.document_length(doc_id) as f64 / stats.average_length();

        match self {
            WeightFunction::TfIdf => tf * (n / df).log10(),
            WeightFunction::NormalizedTfIdf => (1. + tf.log10()) * (n / df).log10(),
            WeightFunction::NormalizedFrequency => tf / stats.max_frequency(doc_id) as f64,
            WeightFunction::PivotedLengthNormalization => {
                let tf_part = (1. + (1. + tf.log10()).log10())
                    / (1. - PIVOT_SLOPE + PIVOT_SLOPE * length_ratio());
                tf_part * ((n + 1.) / df).log10()
            }
            WeightFunction::Bm25 => {
                bm25_tf(tf, length_ratio()) * ((n - df + 0.5) / (df + 0.5)).log10()
            }
            WeightFunction::ModifiedBm25 => bm25_tf(tf, length_ratio()) * ((n + 1.) / df).log10(),
            WeightFunction::EvolutionaryScheme => {
                let cf = term.collection_frequency as f64;
                let tf_part = tf / (tf + 0.45 + length_ratio().sqrt());
                tf_part * (cf.powi(3) * n / df.powi(4)).sqrt()
            }
            WeightFunction::DivergenceFromRandomness => {
                // avdl / dl
                let inverse_ratio = (1. + 1. / length_ratio()).log10();
                let tf_part = tf * inverse_ratio / (1. + tf * inverse_ratio);
                tf_part * ((n + 1.) / (df + 0.5)).log10()
            }
            WeightFunction::AxiomaticScheme => {
                let tf_part = tf / (tf + 0.5 + 0.5 * length_ratio());
                tf_part * n.powf(0.35) / df
            }
        }
    }
}

#[inline]
fn bm25_tf(tf: f64, length_ratio: f64) -> f64 {
    tf * (BM25_K + 1.) / (tf + BM25_K * (1. - BM25_B + BM25_B * length_ratio))
}

impl fmt::Display for WeightFunction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.id(), self.name())
    }
}

#[cfg(test)]
mod tests {
    use ntest::assert_about_eq;

    use super::*;
    use crate::base::Posting;
    use crate::stats::StatisticsAccumulator;

    /// Three documents of lengths 2, 2 and 4
    fn statistics() -> CorpusStatistics {
        let mut accumulator = StatisticsAccumulator::new(3);
        accumulator.process_posting_list(&[Posting::new(1, 1), Posting::new(3, 3)]);
        accumulator.process_posting_list(&[Posting::new(1, 1), Posting::new(2, 2)]);
        accumulator.process_posting_list(&[Posting::new(3, 1)]);
        accumulator.finish()
    }

    #[test]
    fn test_ids() {
        for (ix, function) in WeightFunction::ALL.iter().enumerate() {
            assert_eq!(function.id() as usize, ix);
            assert_eq!(WeightFunction::from_id(ix as u8).unwrap(), *function);
        }
        assert!(matches!(
            WeightFunction::from_id(9),
            Err(Error::UnknownWeightFunction(9))
        ));
    }

    #[test]
    fn test_known_values() {
        let stats = statistics();
        let term = TermStatistics::new(1, 3);

        assert_about_eq!(
            WeightFunction::TfIdf.weight(3, &term, 3, &stats),
            3. * 3f64.log10()
        );
        assert_about_eq!(
            WeightFunction::NormalizedFrequency.weight(1, &term, 3, &stats),
            1. / 3.
        );

        // Document 3 has length 4, the average is 8/3
        let ratio = 4. / (8. / 3.);
        let expected = 3. * 3. / (3. + 2. * (0.25 + 0.75 * ratio)) * (2.5f64 / 1.5).log10();
        assert_about_eq!(WeightFunction::Bm25.weight(3, &term, 3, &stats), expected);

        let expected = 3. / (3. + 0.45 + ratio.sqrt()) * (27f64 * 3.).sqrt();
        assert_about_eq!(
            WeightFunction::EvolutionaryScheme.weight(3, &term, 3, &stats),
            expected
        );
    }

    #[test]
    fn test_idf_vanishes_for_ubiquitous_terms() {
        let stats = statistics();
        let term = TermStatistics::new(3, 3);
        assert_eq!(WeightFunction::TfIdf.weight(1, &term, 1, &stats), 0.);
        assert_eq!(WeightFunction::NormalizedTfIdf.weight(1, &term, 2, &stats), 0.);
    }

    #[test]
    fn test_weights_are_deterministic() {
        let stats = statistics();
        let term = TermStatistics::new(2, 5);
        for function in WeightFunction::ALL.iter() {
            let first = function.weight(2, &term, 3, &stats);
            assert!(first.is_finite(), "{} is not finite", function);
            for _ in 0..10 {
                assert_eq!(function.weight(2, &term, 3, &stats).to_bits(), first.to_bits());
            }
        }
    }

    #[test]
    fn test_required_statistics() {
        assert!(!WeightFunction::TfIdf.required_statistics().document_length);
        assert!(WeightFunction::NormalizedFrequency.required_statistics().max_frequency);
        assert!(WeightFunction::Bm25.required_statistics().average_length);
        assert!(WeightFunction::EvolutionaryScheme.required_statistics().collection_frequency);
    }
}
