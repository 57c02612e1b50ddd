//! Collaborator contracts for the pluggable engines.
//!
//! The pipeline core schedules regions and orchestrates per-region work; the
//! heavy lifting (decoding alignments, assembling haplotypes, counting
//! alleles, rasterizing pileups, comparing against truth) is done by engines
//! behind the narrow traits below. File-backed implementations for the read,
//! reference and cohort sources live in [`crate::hts`]; callers, realigners,
//! encoders and labelers are supplied by the embedding crate through an
//! [`EngineFactory`].

use crate::contigs::Contig;
use crate::core::errors::{Error, Result};
use crate::options::Options;
use crate::ranges::Region;
use crate::reads::Read;
use crate::variant::{Candidate, GvcfRecord, PileupImage, Variant};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

/// Failures a read source can report from a region query. The region
/// processor re-annotates these with input-specific diagnostics before
/// propagating them.
#[derive(Debug, ThisError)]
pub enum ReadSourceError {
    /// The file could not be decoded past this point (truncation, bad block,
    /// CRAM decoded against the wrong reference).
    #[error("data loss: {0}")]
    DataLoss(String),

    /// The queried contig is absent from this input's header.
    #[error("unknown reference name {0:?}")]
    UnknownContig(String),

    #[error("{0}")]
    Other(String),
}

/// A queryable source of aligned reads (one BAM/CRAM file, typically).
pub trait ReadSource {
    /// Contigs declared by this source's header.
    fn contigs(&self) -> &[Contig];

    /// All reads overlapping `region`, in file order.
    fn query(&mut self, region: &Region) -> std::result::Result<Vec<Read>, ReadSourceError>;
}

/// A read source paired with the display name used in diagnostics.
pub struct InputReadSource {
    pub name: String,
    pub source: Box<dyn ReadSource>,
}

impl InputReadSource {
    pub fn new<N: Into<String>>(name: N, source: Box<dyn ReadSource>) -> Self {
        InputReadSource {
            name: name.into(),
            source,
        }
    }
}

/// Random-access reference genome bases.
pub trait ReferenceReader {
    fn contigs(&self) -> &[Contig];

    /// Uppercase bases for a half-open region, which must lie within the
    /// contig bounds.
    fn query(&self, region: &Region) -> Result<String>;

    fn contig_length(&self, reference_name: &str) -> Option<u64> {
        self.contigs()
            .iter()
            .find(|c| c.name == reference_name)
            .map(|c| c.n_bases)
    }
}

/// The allele-counting and thresholding engine that proposes candidates.
pub trait VariantCaller {
    /// Candidates for the region plus, when `emit_gvcf` is set, one
    /// reference-site record per covered span. With `emit_gvcf` on, gVCF
    /// records must be produced even when there are no candidates.
    fn calls_and_gvcfs(
        &mut self,
        region: &Region,
        reads: &[Read],
        emit_gvcf: bool,
    ) -> Result<(Vec<Candidate>, Vec<GvcfRecord>)>;
}

/// Local assembly/realignment of reads within a region.
pub trait RealignmentEngine {
    /// Realign `reads` within `region`. Returns the assembly windows that
    /// were attempted (diagnostic only) and the realigned reads.
    fn realign_reads(&mut self, reads: Vec<Read>, region: &Region)
        -> Result<(Vec<Region>, Vec<Read>)>;

    /// Align `reads` against one synthetic haplotype sequence that replaces
    /// the reference from `window_start` on `reference_name`.
    fn align_to_haplotype(
        &mut self,
        haplotype: &str,
        reference_name: &str,
        window_start: u64,
        reads: &[Read],
    ) -> Result<Vec<Read>>;
}

/// Reads realigned against each alternate haplotype, plus the expected
/// allele-window sequence per alternate, handed to the pileup encoder for
/// alt-aligned channels. Keys are alternate allele strings.
#[derive(Debug, Default)]
pub struct AltAlignedContext {
    pub alignments: FxHashMap<String, Vec<Read>>,
    pub sequences: FxHashMap<String, String>,
}

/// The pixel encoder turning one candidate plus reads into pileup images.
pub trait PileupEncoder {
    /// Zero or more `(alt alleles, image)` pairs for a candidate; `None`
    /// means the candidate cannot be imaged at all (e.g. no read support
    /// after encoder-side filtering).
    fn create_pileup_images(
        &mut self,
        candidate: &Candidate,
        reads: &[&Read],
        alt_context: Option<&AltAlignedContext>,
    ) -> Result<Option<Vec<(Vec<String>, PileupImage)>>>;
}

/// A truth label for one candidate.
pub trait Label {
    /// Whether the label is trustworthy enough to train on. Non-confident
    /// labels must never reach an example.
    fn is_confident(&self) -> bool;

    /// Class for the example representing the given alternate-allele indices.
    fn class_for_alt_alleles(&self, alt_indices: &[usize]) -> i32;
}

/// Counters a labeler may expose for the run summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelingMetrics {
    pub n_candidate_sites: u64,
    pub n_confident_labels: u64,
    pub n_unlabelable_sites: u64,
}

/// Assigns truth labels to candidate variants (training mode only).
pub trait VariantLabeler {
    /// One label per input variant, in order.
    fn label_variants(
        &mut self,
        variants: &[Variant],
        region: &Region,
    ) -> Result<Vec<Box<dyn Label>>>;

    fn metrics(&self) -> Option<LabelingMetrics> {
        None
    }
}

/// A cohort variant with its per-alternate population frequencies, index
/// aligned with `variant.alternate_bases`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortVariant {
    pub variant: Variant,
    pub alt_frequencies: Vec<f64>,
}

impl CohortVariant {
    pub fn new(variant: Variant, alt_frequencies: Vec<f64>) -> Self {
        CohortVariant {
            variant,
            alt_frequencies,
        }
    }

    /// Frequency of one alternate allele; absent entries count as 0.
    pub fn alt_frequency(&self, alt_index: usize) -> f64 {
        self.alt_frequencies.get(alt_index).copied().unwrap_or(0.0)
    }

    pub fn alt_frequency_sum(&self) -> f64 {
        self.alt_frequencies.iter().sum()
    }
}

/// A population variant catalog, queryable by region.
pub trait CohortReader {
    fn query(&mut self, region: &Region) -> Result<Vec<CohortVariant>>;
}

/// Builds every engine and source the region processor needs, from validated
/// options. Implementations pick the concrete caller/labeler from
/// `options.variant_caller` / `options.labeler` once, at construction; the
/// core never re-dispatches per call.
///
/// Construction must be cheap to defer: the processor calls these methods
/// from its own `initialize`, after any process-level forking has happened.
pub trait EngineFactory {
    fn reference(&self, options: &Options) -> Result<Box<dyn ReferenceReader>>;

    fn read_sources(&self, options: &Options) -> Result<Vec<InputReadSource>>;

    fn variant_caller(&self, options: &Options) -> Result<Box<dyn VariantCaller>>;

    fn pileup_encoder(&self, options: &Options) -> Result<Box<dyn PileupEncoder>>;

    fn realigner(&self, _options: &Options) -> Result<Box<dyn RealignmentEngine>> {
        Err(Error::config(
            "realignment requested but this engine factory provides no realigner",
        ))
    }

    fn labeler(&self, _options: &Options) -> Result<Box<dyn VariantLabeler>> {
        Err(Error::config(
            "training mode requested but this engine factory provides no labeler",
        ))
    }

    /// Cohort readers keyed by contig name; contigs without an entry fall
    /// back to reference-frequency-1 annotation.
    fn cohort_readers(
        &self,
        _options: &Options,
    ) -> Result<FxHashMap<String, Box<dyn CohortReader>>> {
        Ok(FxHashMap::default())
    }

    /// Contigs declared by the truth-variant source (training mode).
    fn truth_contigs(&self, _options: &Options) -> Result<Vec<Contig>> {
        Err(Error::config(
            "no truth-variant source is available from this engine factory",
        ))
    }

    /// Sorted variant positions for the region filter, from the truth VCF in
    /// training mode or the proposed-variant VCF in calling mode.
    fn candidate_positions(&self, _options: &Options) -> Result<Vec<Region>> {
        Err(Error::config(
            "no candidate-position source is available from this engine factory",
        ))
    }
}
