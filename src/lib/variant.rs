//! Variant records, classification predicates and produced record types.

use crate::core::errors::{Error, Result};
use crate::ranges::Region;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smartstring::alias::String as SmartString;
use std::str::FromStr;

/// A called variant site. Immutable once produced by a caller or reader;
/// `end` is always `start + reference_bases.len()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub reference_name: SmartString,
    pub start: u64,
    pub reference_bases: String,
    pub alternate_bases: Vec<String>,
}

impl Variant {
    pub fn new<N: Into<SmartString>>(
        reference_name: N,
        start: u64,
        reference_bases: &str,
        alternate_bases: &[&str],
    ) -> Self {
        Variant {
            reference_name: reference_name.into(),
            start,
            reference_bases: reference_bases.to_string(),
            alternate_bases: alternate_bases.iter().map(|a| a.to_string()).collect(),
        }
    }

    pub fn end(&self) -> u64 {
        self.start + self.reference_bases.len() as u64
    }

    pub fn range(&self) -> Region {
        Region::new(self.reference_name.clone(), self.start, self.end())
    }

    /// 1-based position string for diagnostics.
    pub fn location(&self) -> String {
        format!("{}:{}", self.reference_name, self.start + 1)
    }

    pub fn is_snp(&self) -> bool {
        self.reference_bases.len() == 1
            && !self.alternate_bases.is_empty()
            && self.alternate_bases.iter().all(|a| a.len() == 1)
    }

    pub fn is_indel(&self) -> bool {
        !self.alternate_bases.is_empty()
            && (self.reference_bases.len() > 1
                || self.alternate_bases.iter().any(|a| a.len() > 1))
    }

    pub fn is_biallelic(&self) -> bool {
        self.alternate_bases.len() == 1
    }

    pub fn is_multiallelic(&self) -> bool {
        self.alternate_bases.len() > 1
    }

    pub fn has_insertion(&self) -> bool {
        self.alternate_bases
            .iter()
            .any(|a| a.len() > self.reference_bases.len())
    }

    pub fn has_deletion(&self) -> bool {
        self.alternate_bases
            .iter()
            .any(|a| a.len() < self.reference_bases.len())
    }

    /// Strip postfix bases shared by the reference and every alternate,
    /// keeping at least one base per allele. The anchored start does not
    /// move; the end shrinks with the reference allele.
    pub fn simplified(&self) -> Variant {
        let mut alleles: Vec<&[u8]> = Vec::with_capacity(1 + self.alternate_bases.len());
        alleles.push(self.reference_bases.as_bytes());
        for alt in &self.alternate_bases {
            alleles.push(alt.as_bytes());
        }
        let strip = common_postfix_length(&alleles);
        let cut = |s: &str| s[..s.len() - strip].to_string();
        Variant {
            reference_name: self.reference_name.clone(),
            start: self.start,
            reference_bases: cut(&self.reference_bases),
            alternate_bases: self.alternate_bases.iter().map(|a| cut(a)).collect(),
        }
    }
}

/// Longest postfix shared by all alleles that leaves every allele >= 1 base.
fn common_postfix_length(alleles: &[&[u8]]) -> usize {
    let max_strip = match alleles.iter().map(|a| a.len()).min() {
        Some(min_len) if min_len > 1 => min_len - 1,
        _ => return 0,
    };
    let mut strip = 0;
    while strip < max_strip {
        let next = alleles[0][alleles[0].len() - 1 - strip];
        if alleles
            .iter()
            .all(|a| a[a.len() - 1 - strip] == next)
        {
            strip += 1;
        } else {
            break;
        }
    }
    strip
}

/// Variant classes a run can restrict its candidates to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VariantTypeSelector {
    Snps,
    Indels,
    Insertions,
    Deletions,
    MultiAllelics,
    All,
}

impl VariantTypeSelector {
    /// True when the variant belongs to this class. The single-type classes
    /// select biallelic sites only; multi-allelic sites have their own class.
    pub fn matches(&self, variant: &Variant) -> bool {
        match self {
            VariantTypeSelector::Snps => variant.is_biallelic() && variant.is_snp(),
            VariantTypeSelector::Indels => variant.is_biallelic() && variant.is_indel(),
            VariantTypeSelector::Insertions => variant.is_biallelic() && variant.has_insertion(),
            VariantTypeSelector::Deletions => variant.is_biallelic() && variant.has_deletion(),
            VariantTypeSelector::MultiAllelics => variant.is_multiallelic(),
            VariantTypeSelector::All => true,
        }
    }
}

impl FromStr for VariantTypeSelector {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "snps" => Ok(VariantTypeSelector::Snps),
            "indels" => Ok(VariantTypeSelector::Indels),
            "insertions" => Ok(VariantTypeSelector::Insertions),
            "deletions" => Ok(VariantTypeSelector::Deletions),
            "multi-allelics" => Ok(VariantTypeSelector::MultiAllelics),
            "all" => Ok(VariantTypeSelector::All),
            other => Err(Error::config(format!(
                "unknown variant type selector {:?}; expected one of snps, indels, \
                 insertions, deletions, multi-allelics, all",
                other
            ))),
        }
    }
}

/// A putative variant site produced by the caller, pre-labeling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub variant: Variant,
    /// Supporting read count per alternate allele.
    pub allele_support: FxHashMap<String, u32>,
    /// Population frequency per allele (reference included); `None` until the
    /// population matcher runs, and absent from output when disabled.
    pub allele_frequency: Option<FxHashMap<String, f64>>,
}

impl Candidate {
    pub fn new(variant: Variant) -> Self {
        Candidate {
            variant,
            allele_support: FxHashMap::default(),
            allele_frequency: None,
        }
    }
}

/// A reference-site record representing coverage at non-variant positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GvcfRecord {
    pub reference_name: SmartString,
    pub start: u64,
    pub end: u64,
    pub genotype_quality: i32,
    pub read_depth: u32,
}

/// A rasterized pileup around one candidate, shaped height x width x channels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PileupImage {
    pub data: Vec<u8>,
    pub shape: [usize; 3],
}

/// A serialized training/inference unit: one candidate expanded against one
/// set of alternate alleles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Example {
    pub variant: Variant,
    /// Indices into `variant.alternate_bases` for the alleles this example
    /// represents.
    pub alt_allele_indices: Vec<usize>,
    pub image: PileupImage,
    pub label: Option<i32>,
}
