//! Population allele-frequency matching.
//!
//! A candidate's alleles rarely share their exact VCF representation with
//! the population catalog: indels can anchor at different positions.
//! Equality is therefore decided on spliced haplotypes (the shared reference
//! window with one allele substituted in), which is representation
//! invariant. A second, inexact pass only runs when nothing matched at all,
//! and only to recover the reference-allele frequency at sites where the
//! catalog knows the locus but not the allele.

use crate::core::errors::{Error, Result};
use crate::engines::{CohortReader, CohortVariant, ReferenceReader};
use crate::ranges::Region;
use crate::variant::Variant;
use log::debug;
use rustc_hash::FxHashMap;

/// Frequencies when no cohort data applies: reference 1, every alternate 0.
pub fn default_allele_frequencies(variant: &Variant) -> FxHashMap<String, f64> {
    let mut freqs = FxHashMap::default();
    for alt in &variant.alternate_bases {
        freqs.insert(alt.clone(), 0.0);
    }
    freqs.insert(variant.reference_bases.clone(), 1.0);
    freqs
}

/// Assign a population frequency to every allele of `variant` (reference
/// included) by matching spliced haplotypes against the cohort variants
/// overlapping it.
pub fn find_matching_allele_frequency(
    variant: &Variant,
    cohort_reader: &mut dyn CohortReader,
    reference: &dyn ReferenceReader,
    padding_bases: u64,
) -> Result<FxHashMap<String, f64>> {
    let query = Region::new(
        variant.reference_name.clone(),
        variant.start.saturating_sub(padding_bases),
        variant.end() + padding_bases,
    );
    let cohort_variants = cohort_reader.query(&query)?;

    let mut freqs = FxHashMap::default();
    for alt in &variant.alternate_bases {
        freqs.insert(alt.clone(), 0.0);
    }

    let window = match shared_reference_window(variant, &cohort_variants, reference)? {
        Some(window) => window,
        None => {
            freqs.insert(variant.reference_bases.clone(), 1.0);
            return Ok(freqs);
        }
    };
    let (window_seq, window_start) = window;

    struct CohortHaplotype<'a> {
        haplotype: String,
        alt_index: usize,
        source: &'a CohortVariant,
    }
    let mut cohort_haplotypes = Vec::new();
    for cohort in &cohort_variants {
        for (alt_index, alt) in cohort.variant.alternate_bases.iter().enumerate() {
            cohort_haplotypes.push(CohortHaplotype {
                haplotype: splice_allele(&cohort.variant, alt, &window_seq, window_start)?,
                alt_index,
                source: cohort,
            });
        }
    }

    // Exact pass: haplotype identity equates alleles across representations.
    // A later cohort match overwrites an earlier one for the same alt; the
    // reference frequency sticks with the first matched cohort variant.
    for alt in &variant.alternate_bases {
        let candidate_haplotype = splice_allele(variant, alt, &window_seq, window_start)?;
        for cohort in &cohort_haplotypes {
            if cohort.haplotype == candidate_haplotype {
                freqs.insert(alt.clone(), cohort.source.alt_frequency(cohort.alt_index));
                if !freqs.contains_key(&variant.reference_bases) {
                    freqs.insert(
                        variant.reference_bases.clone(),
                        reference_frequency(cohort.source),
                    );
                }
            }
        }
    }

    // Inexact fallback, only when nothing matched at all: recover the
    // reference frequency from a cohort variant at the same simplified
    // anchor, so a novel allele at a cataloged locus is not reported as
    // "locus absent from the cohort".
    let total: f64 = freqs.values().sum();
    if total == 0.0 {
        let simplified = variant.simplified();
        let mut ref_frequency_at_locus = None;
        for cohort in &cohort_variants {
            let simplified_cohort = cohort.variant.simplified();
            if simplified_cohort.start == simplified.start
                && simplified_cohort.reference_bases == simplified.reference_bases
            {
                ref_frequency_at_locus = Some(reference_frequency(cohort));
            }
        }
        if ref_frequency_at_locus.is_none() && !cohort_variants.is_empty() {
            debug!(
                "no cohort allele or locus matched candidate at {}",
                variant.location()
            );
        }
        freqs.insert(
            variant.reference_bases.clone(),
            ref_frequency_at_locus.unwrap_or(1.0),
        );
    }

    Ok(freqs)
}

/// Reference-allele frequency implied by one cohort variant. Malformed
/// catalogs can carry alternate frequencies summing past 1; clamp instead of
/// reporting a negative frequency.
fn reference_frequency(cohort: &CohortVariant) -> f64 {
    (1.0 - cohort.alt_frequency_sum()).clamp(0.0, 1.0)
}

/// The reference window spanning the candidate and every cohort variant.
/// `None` when there are no cohort variants or the union falls outside the
/// contig, both of which short-circuit to reference-frequency 1.
fn shared_reference_window(
    variant: &Variant,
    cohort_variants: &[CohortVariant],
    reference: &dyn ReferenceReader,
) -> Result<Option<(String, u64)>> {
    if cohort_variants.is_empty() {
        return Ok(None);
    }
    let contig_length = match reference.contig_length(&variant.reference_name) {
        Some(length) => length,
        None => return Ok(None),
    };
    let mut min_start = variant.start;
    let mut max_end = variant.end();
    for cohort in cohort_variants {
        min_start = min_start.min(cohort.variant.start);
        max_end = max_end.max(cohort.variant.end());
    }
    if max_end > contig_length {
        return Ok(None);
    }
    let window = Region::new(variant.reference_name.clone(), min_start, max_end);
    let sequence = reference.query(&window)?;
    Ok(Some((sequence, min_start)))
}

/// Replace a variant's reference span inside the window with one alternate.
/// The window must start at or before the variant; a reference span running
/// past the window end is truncated at the window.
fn splice_allele(
    variant: &Variant,
    alt: &str,
    window_seq: &str,
    window_start: u64,
) -> Result<String> {
    if variant.start < window_start {
        return Err(Error::HaplotypeWindow {
            location: variant.location(),
        });
    }
    let offset = ((variant.start - window_start) as usize).min(window_seq.len());
    let after_start = (offset + variant.reference_bases.len()).min(window_seq.len());
    Ok(format!(
        "{}{}{}",
        &window_seq[..offset],
        alt,
        &window_seq[after_start..]
    ))
}
