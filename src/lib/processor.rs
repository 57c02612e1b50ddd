//! Per-region candidate generation.
//!
//! [`RegionProcessor`] owns the engines for one worker process and runs the
//! fixed pipeline over each assigned region: gather reads, down-sample,
//! selectively realign, call candidates, filter by variant type, annotate
//! population frequencies, then expand candidates into pileup examples
//! (labeled against truth in training mode). Engine construction is deferred
//! to the first processed region so a processor can be built cheaply before
//! any process-level forking, then initialized exactly once afterward.

use crate::allele_frequency::{default_allele_frequencies, find_matching_allele_frequency};
use crate::core::errors::{Error, Result};
use crate::engines::{
    AltAlignedContext, CohortReader, EngineFactory, InputReadSource, Label, LabelingMetrics,
    PileupEncoder, ReadSourceError, RealignmentEngine, ReferenceReader, VariantCaller,
    VariantLabeler,
};
use crate::options::Options;
use crate::ranges::Region;
use crate::reads::Read;
use crate::sampling::reservoir_sample;
use crate::variant::{Candidate, Example, GvcfRecord, Variant, VariantTypeSelector};
use log::debug;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rust_lapper::{Interval, Lapper};
use rustc_hash::FxHashMap;
use std::time::Instant;

/// Reads trimmed below this length are useless to the alt-aligned encoder.
const MIN_ALT_ALIGNED_READ_LEN: usize = 15;

/// Wall time spent in each pipeline phase of one region.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RegionTimings {
    pub get_reads_seconds: f64,
    pub find_candidates_seconds: f64,
    pub make_pileup_images_seconds: f64,
}

/// Everything one region produced.
#[derive(Debug)]
pub struct RegionOutput {
    pub region: Region,
    pub candidates: Vec<Candidate>,
    pub examples: Vec<Example>,
    pub gvcfs: Vec<GvcfRecord>,
    /// Reads fed to the caller, after down-sampling.
    pub n_reads: usize,
    pub timings: RegionTimings,
}

struct Engines {
    reference: Box<dyn ReferenceReader>,
    sources: Vec<InputReadSource>,
    caller: Box<dyn VariantCaller>,
    realigner: Option<Box<dyn RealignmentEngine>>,
    encoder: Box<dyn PileupEncoder>,
    labeler: Option<Box<dyn VariantLabeler>>,
    cohort_readers: FxHashMap<String, Box<dyn CohortReader>>,
}

pub struct RegionProcessor<F: EngineFactory> {
    options: Options,
    factory: F,
    engines: Option<Engines>,
}

impl<F: EngineFactory> RegionProcessor<F> {
    pub fn new(options: Options, factory: F) -> Self {
        RegionProcessor {
            options,
            factory,
            engines: None,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.engines.is_some()
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Counters from the labeler, once initialized in training mode.
    pub fn labeling_metrics(&self) -> Option<LabelingMetrics> {
        self.engines
            .as_ref()
            .and_then(|engines| engines.labeler.as_ref())
            .and_then(|labeler| labeler.metrics())
    }

    /// Build every engine from the factory. Called implicitly by the first
    /// [`process`](Self::process); calling it again is an error.
    pub fn initialize(&mut self) -> Result<()> {
        if self.engines.is_some() {
            return Err(Error::AlreadyInitialized);
        }
        let reference = self.factory.reference(&self.options)?;
        let sources = self.factory.read_sources(&self.options)?;
        if sources.is_empty() {
            return Err(Error::config("the engine factory produced no read sources"));
        }
        let caller = self.factory.variant_caller(&self.options)?;
        let encoder = self.factory.pileup_encoder(&self.options)?;
        let realigner =
            if self.options.realigner_enabled || self.options.alt_aligned_pileup.enabled() {
                Some(self.factory.realigner(&self.options)?)
            } else {
                None
            };
        let labeler = if self.options.training() {
            Some(self.factory.labeler(&self.options)?)
        } else {
            None
        };
        let cohort_readers = if self.options.populate_allele_frequency {
            self.factory.cohort_readers(&self.options)?
        } else {
            FxHashMap::default()
        };
        self.engines = Some(Engines {
            reference,
            sources,
            caller,
            realigner,
            encoder,
            labeler,
            cohort_readers,
        });
        Ok(())
    }

    /// Run the full pipeline over one region.
    pub fn process(&mut self, region: &Region) -> Result<RegionOutput> {
        if self.engines.is_none() {
            self.initialize()?;
        }
        let options = &self.options;
        let engines = match self.engines.as_mut() {
            Some(engines) => engines,
            None => return Err(Error::config("region processor failed to initialize")),
        };
        let Engines {
            reference,
            sources,
            caller,
            realigner,
            encoder,
            labeler,
            cohort_readers,
        } = engines;

        let timer = Instant::now();
        let reads = gather_region_reads(sources, region)?;
        let reads = if options.max_reads_per_partition > 0
            && reads.len() > options.max_reads_per_partition
        {
            // A fresh generator seeded identically per region keeps reruns
            // byte-identical regardless of region order.
            let mut rng = StdRng::seed_from_u64(options.random_seed);
            reservoir_sample(reads, options.max_reads_per_partition, &mut rng)
        } else {
            reads
        };
        let n_reads = reads.len();
        if reads.is_empty() && !options.gvcf_enabled() {
            return Ok(RegionOutput {
                region: region.clone(),
                candidates: Vec::new(),
                examples: Vec::new(),
                gvcfs: Vec::new(),
                n_reads: 0,
                timings: RegionTimings {
                    get_reads_seconds: timer.elapsed().as_secs_f64(),
                    ..RegionTimings::default()
                },
            });
        }
        let reads = match realigner.as_deref_mut() {
            Some(realigner) if options.realigner_enabled => {
                // Long reads carry their own alignment signal and blow up the
                // assembly windows, so they skip realignment unchanged.
                let (long_reads, short_reads): (Vec<Read>, Vec<Read>) = reads
                    .into_iter()
                    .partition(|read| read.sequence_length() > options.max_read_length_to_realign);
                let (_windows, realigned) = realigner.realign_reads(short_reads, region)?;
                let mut reads = long_reads;
                reads.extend(realigned);
                reads
            }
            _ => reads,
        };
        let get_reads_seconds = timer.elapsed().as_secs_f64();

        let timer = Instant::now();
        let (candidates, gvcfs) =
            caller.calls_and_gvcfs(region, &reads, options.gvcf_enabled())?;
        let mut candidates = filter_candidates(candidates, &options.variant_types);
        if options.populate_allele_frequency {
            for candidate in &mut candidates {
                let frequencies =
                    match cohort_readers.get_mut(candidate.variant.reference_name.as_str()) {
                        Some(reader) => find_matching_allele_frequency(
                            &candidate.variant,
                            reader.as_mut(),
                            reference.as_ref(),
                            0,
                        )?,
                        None => default_allele_frequencies(&candidate.variant),
                    };
                candidate.allele_frequency = Some(frequencies);
            }
        }
        let find_candidates_seconds = timer.elapsed().as_secs_f64();
        debug!(
            "{} reads, {} candidates in {}",
            n_reads,
            candidates.len(),
            region
        );

        let timer = Instant::now();
        let read_index = build_read_index(&reads);
        let mut examples = Vec::new();
        if options.training() {
            let labeler = match labeler {
                Some(labeler) => labeler,
                None => return Err(Error::config("training mode requires a labeler")),
            };
            let variants: Vec<Variant> = candidates
                .iter()
                .map(|candidate| candidate.variant.clone())
                .collect();
            let labels = labeler.label_variants(&variants, region)?;
            if labels.len() != variants.len() {
                return Err(Error::config(format!(
                    "labeler returned {} labels for {} candidates in {}",
                    labels.len(),
                    variants.len(),
                    region
                )));
            }
            for (candidate, label) in candidates.iter().zip(labels.iter()) {
                if !label.is_confident() {
                    continue;
                }
                for mut example in pileup_examples_for_candidate(
                    candidate,
                    &reads,
                    &read_index,
                    reference.as_ref(),
                    realigner.as_deref_mut(),
                    encoder.as_mut(),
                    options,
                )? {
                    add_label_to_example(&mut example, label.as_ref());
                    examples.push(example);
                }
            }
        } else {
            for candidate in &candidates {
                examples.extend(pileup_examples_for_candidate(
                    candidate,
                    &reads,
                    &read_index,
                    reference.as_ref(),
                    realigner.as_deref_mut(),
                    encoder.as_mut(),
                    options,
                )?);
            }
        }
        let make_pileup_images_seconds = timer.elapsed().as_secs_f64();

        Ok(RegionOutput {
            region: region.clone(),
            candidates,
            examples,
            gvcfs,
            n_reads,
            timings: RegionTimings {
                get_reads_seconds,
                find_candidates_seconds,
                make_pileup_images_seconds,
            },
        })
    }
}

/// Drop candidates whose variant matches none of the selectors. An empty
/// selector list keeps everything.
pub fn filter_candidates(
    candidates: Vec<Candidate>,
    selectors: &[VariantTypeSelector],
) -> Vec<Candidate> {
    if selectors.is_empty() || selectors.contains(&VariantTypeSelector::All) {
        return candidates;
    }
    candidates
        .into_iter()
        .filter(|candidate| {
            selectors
                .iter()
                .any(|selector| selector.matches(&candidate.variant))
        })
        .collect()
}

/// Attach a truth label to an example. Non-confident labels must be filtered
/// out before this point; getting one here is a programming error, not an
/// input condition, so it panics.
pub fn add_label_to_example(example: &mut Example, label: &dyn Label) {
    assert!(
        label.is_confident(),
        "a non-confident label must never reach an example"
    );
    example.label = Some(label.class_for_alt_alleles(&example.alt_allele_indices));
}

fn gather_region_reads(sources: &mut [InputReadSource], region: &Region) -> Result<Vec<Read>> {
    let mut reads = Vec::new();
    for input in sources.iter_mut() {
        match input.source.query(region) {
            Ok(mut batch) => reads.append(&mut batch),
            Err(ReadSourceError::DataLoss(message)) => {
                return Err(Error::ReadSource {
                    input: input.name.clone(),
                    message: format!(
                        "failed to decode reads ({}); the file may be corrupted, or a CRAM \
                         may be paired with a different reference than it was written with",
                        message
                    ),
                });
            }
            Err(ReadSourceError::UnknownContig(name)) => {
                return Err(Error::ReadSource {
                    input: input.name.clone(),
                    message: format!(
                        "region {} does not exist: reference name {:?} is absent from the \
                         input header",
                        region, name
                    ),
                });
            }
            Err(ReadSourceError::Other(message)) => {
                return Err(Error::ReadSource {
                    input: input.name.clone(),
                    message,
                });
            }
        }
    }
    Ok(reads)
}

fn build_read_index(reads: &[Read]) -> Lapper<u64, u32> {
    let intervals: Vec<Interval<u64, u32>> = reads
        .iter()
        .enumerate()
        .map(|(index, read)| Interval {
            start: read.start,
            stop: read.end.max(read.start + 1),
            val: index as u32,
        })
        .collect();
    Lapper::new(intervals)
}

/// Reads overlapping the candidate's span, in their original gather order.
fn reads_for_candidate<'r>(
    candidate: &Candidate,
    reads: &'r [Read],
    read_index: &Lapper<u64, u32>,
) -> Vec<&'r Read> {
    let range = candidate.variant.range();
    let mut indices: Vec<u32> = read_index
        .find(range.start, range.end)
        .map(|interval| interval.val)
        .collect();
    indices.sort_unstable();
    indices
        .into_iter()
        .map(|index| &reads[index as usize])
        .collect()
}

fn pileup_examples_for_candidate(
    candidate: &Candidate,
    reads: &[Read],
    read_index: &Lapper<u64, u32>,
    reference: &dyn ReferenceReader,
    realigner: Option<&mut (dyn RealignmentEngine + 'static)>,
    encoder: &mut dyn PileupEncoder,
    options: &Options,
) -> Result<Vec<Example>> {
    let overlapping = reads_for_candidate(candidate, reads, read_index);
    let alt_context = if options.alt_aligned_pileup.enabled() {
        let realigner = match realigner {
            Some(realigner) => realigner,
            None => {
                return Err(Error::config(
                    "alt-aligned pileups require a realignment engine",
                ))
            }
        };
        Some(align_to_all_haplotypes(
            &candidate.variant,
            &overlapping,
            reference,
            realigner,
            options.pileup_image_width,
        )?)
    } else {
        None
    };
    let images = encoder.create_pileup_images(candidate, &overlapping, alt_context.as_ref())?;
    let mut examples = Vec::new();
    if let Some(images) = images {
        for (alts, image) in images {
            let mut alt_indices = Vec::with_capacity(alts.len());
            for alt in &alts {
                match candidate
                    .variant
                    .alternate_bases
                    .iter()
                    .position(|allele| allele == alt)
                {
                    Some(index) => alt_indices.push(index),
                    None => {
                        return Err(Error::config(format!(
                            "pileup encoder produced unknown alternate allele {:?} at {}",
                            alt,
                            candidate.variant.location()
                        )))
                    }
                }
            }
            alt_indices.sort_unstable();
            examples.push(Example {
                variant: candidate.variant.clone(),
                alt_allele_indices: alt_indices,
                image,
                label: None,
            });
        }
    }
    Ok(examples)
}

/// Realign the candidate's reads against each alternate haplotype and work
/// out the allele-window sequence the encoder should expect per alternate.
///
/// The alignment window extends half an image width plus a fixed margin on
/// both sides of the variant, clipped to the contig. Reads are trimmed to the
/// window first; trimmed reads shorter than [`MIN_ALT_ALIGNED_READ_LEN`] are
/// dropped.
fn align_to_all_haplotypes(
    variant: &Variant,
    reads: &[&Read],
    reference: &dyn ReferenceReader,
    realigner: &mut dyn RealignmentEngine,
    pileup_image_width: u32,
) -> Result<AltAlignedContext> {
    let half_width = ((pileup_image_width - 1) / 2) as u64;
    let margin = half_width + 100;
    let contig_length = reference
        .contig_length(&variant.reference_name)
        .ok_or_else(|| {
            Error::config(format!(
                "contig {:?} is absent from the reference",
                variant.reference_name.as_str()
            ))
        })?;
    let valid_end = contig_length.min(variant.end() + margin);
    let window = Region::new(
        variant.reference_name.clone(),
        variant.start.saturating_sub(margin),
        valid_end,
    );

    // The caller's variant must agree with the reference before synthetic
    // haplotypes are built from it.
    let reference_bases = reference.query(&variant.range())?;
    if reference_bases != variant.reference_bases {
        return Err(Error::ReferenceConsistency {
            location: variant.location(),
            variant_bases: variant.reference_bases.clone(),
            reference_bases,
        });
    }

    let trimmed: Vec<Read> = reads
        .iter()
        .filter_map(|read| read.trim_to_window(&window))
        .filter(|read| read.sequence_length() >= MIN_ALT_ALIGNED_READ_LEN)
        .collect();
    let prefix = reference.query(&Region::new(
        variant.reference_name.clone(),
        window.start,
        variant.start,
    ))?;
    let suffix = reference.query(&Region::new(
        variant.reference_name.clone(),
        variant.end(),
        valid_end,
    ))?;

    let mut context = AltAlignedContext::default();
    for alt in &variant.alternate_bases {
        let haplotype = format!("{}{}{}", prefix, alt, suffix);
        let aligned = realigner.align_to_haplotype(
            &haplotype,
            &variant.reference_name,
            window.start,
            &trimmed,
        )?;
        context.alignments.insert(alt.clone(), aligned);

        // The image window is centered on the variant: half a width of
        // prefix, the alternate, then enough suffix to fill the row.
        let end_of_prefix = &prefix[prefix.len().saturating_sub(half_width as usize)..];
        let suffix_take = (half_width as usize + 1)
            .saturating_sub(alt.len())
            .min(suffix.len());
        let mut allele_window = format!("{}{}{}", end_of_prefix, alt, &suffix[..suffix_take]);
        allele_window.truncate(pileup_image_width as usize);
        context.sequences.insert(alt.clone(), allele_window);
    }
    Ok(context)
}
