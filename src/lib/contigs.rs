//! Contig metadata and cross-input reconciliation.
//!
//! Every input file (reference, alignments, truth variants) carries its own
//! contig dictionary. Before any region is processed the dictionaries are
//! intersected down to the contigs all inputs agree on, and the run aborts
//! early when the agreement covers too little of the reference.

use crate::core::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use smartstring::alias::String as SmartString;

/// A named reference sequence with a fixed length in basepairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contig {
    pub name: SmartString,
    pub n_bases: u64,
}

impl Contig {
    pub fn new<N: Into<SmartString>>(name: N, n_bases: u64) -> Self {
        Contig {
            name: name.into(),
            n_bases,
        }
    }
}

/// Total basepairs spanned by a contig list.
pub fn contigs_n_bases(contigs: &[Contig]) -> u64 {
    contigs.iter().map(|c| c.n_bases).sum()
}

/// Contigs present in every non-empty input list, where "present" means an
/// exact (name, length) match. Output order follows the first list.
pub fn common_contigs(contig_lists: &[&[Contig]]) -> Vec<Contig> {
    let mut lists = contig_lists.iter().filter(|l| !l.is_empty());
    let first: Vec<Contig> = match lists.next() {
        Some(first) => first.to_vec(),
        None => return Vec::new(),
    };
    lists.fold(first, |acc, other| {
        acc.into_iter()
            .filter(|c| {
                other
                    .iter()
                    .any(|o| o.name == c.name && o.n_bases == c.n_bases)
            })
            .collect()
    })
}

/// Check that the common contigs cover enough of the reference.
///
/// Fails when nothing is shared or when the shared contigs span less than
/// `min_coverage_fraction` of the reference basepairs, reporting the
/// per-contig matched/missing status so naming mismatches are obvious.
pub fn validate_reference_contig_coverage(
    ref_contigs: &[Contig],
    shared_contigs: &[Contig],
    min_coverage_fraction: f64,
) -> Result<()> {
    let ref_bp = contigs_n_bases(ref_contigs);
    let common_bp = contigs_n_bases(shared_contigs);
    let coverage = if ref_bp > 0 {
        common_bp as f64 / ref_bp as f64
    } else {
        0.0
    };

    if shared_contigs.is_empty() || coverage < min_coverage_fraction {
        let contig_status = ref_contigs
            .iter()
            .map(|c| {
                let status = if shared_contigs.iter().any(|s| s.name == c.name) {
                    "matched"
                } else {
                    "IS MISSING"
                };
                format!("\n{:?} is {} bp and {}", c.name.as_str(), c.n_bases, status)
            })
            .collect::<Vec<_>>()
            .join(", ");
        return Err(Error::ContigMismatch {
            ref_bases: ref_bp,
            common_bases: common_bp,
            coverage_percent: coverage * 100.0,
            contig_status,
        });
    }
    Ok(())
}

/// Reconcile contigs across the reference, every alignment source, and an
/// optional truth-variant source.
///
/// Alignment sources must match the reference by name and length; the truth
/// source matches by name only, tolerating header-only length omissions.
/// Excluded names are dropped from the reference before comparison, so they
/// count toward neither the numerator nor the denominator of the coverage
/// check. The result preserves reference order.
pub fn ensure_consistent_contigs(
    ref_contigs: &[Contig],
    sam_contigs_by_source: &[Vec<Contig>],
    truth_contigs: Option<&[Contig]>,
    exclude_contig_names: &[String],
    min_coverage_fraction: f64,
) -> Result<Vec<Contig>> {
    if !(0.0..=1.0).contains(&min_coverage_fraction) {
        return Err(Error::config(format!(
            "min contig coverage fraction must be in [0, 1], got {}",
            min_coverage_fraction
        )));
    }
    let ref_contigs: Vec<Contig> = ref_contigs
        .iter()
        .filter(|c| !exclude_contig_names.iter().any(|x| x == c.name.as_str()))
        .cloned()
        .collect();

    let sam_common = common_contigs(
        &sam_contigs_by_source
            .iter()
            .map(|v| v.as_slice())
            .collect::<Vec<_>>(),
    );
    let mut contigs = common_contigs(&[&ref_contigs, &sam_common]);

    if let Some(truth) = truth_contigs {
        if !truth.is_empty() {
            contigs.retain(|c| truth.iter().any(|t| t.name == c.name));
        }
    }

    validate_reference_contig_coverage(&ref_contigs, &contigs, min_coverage_fraction)?;
    Ok(contigs)
}
