//! Genomic regions and ordered range sets.
//!
//! All coordinates are 0-based half-open internally. Region literals use the
//! conventional 1-based inclusive form (`chr1:1,000-2,000`) and are converted
//! on parse. A [`RangeSet`] keeps, per contig, a sorted list of coalesced
//! ranges: no two stored ranges overlap or touch, and contigs keep the order
//! in which they were first added, which downstream partitioning relies on.

use crate::contigs::Contig;
use crate::core::errors::{Error, Result};
use crate::core::io::get_reader;
use bio::io::bed;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smartstring::alias::String as SmartString;
use std::fmt;
use std::path::Path;

/// A half-open interval on one contig.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    pub reference_name: SmartString,
    pub start: u64,
    pub end: u64,
}

impl Region {
    pub fn new<N: Into<SmartString>>(reference_name: N, start: u64, end: u64) -> Self {
        Region {
            reference_name: reference_name.into(),
            start,
            end,
        }
    }

    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// True when the two regions share a contig and overlap by at least 1 bp.
    pub fn overlaps(&self, other: &Region) -> bool {
        self.reference_name == other.reference_name
            && self.start < other.end
            && other.start < self.end
    }

    pub fn contains_point(&self, reference_name: &str, pos: u64) -> bool {
        self.reference_name == reference_name && self.start <= pos && pos < self.end
    }

    /// Samtools-style 1-based inclusive literal for this region.
    pub fn to_literal(&self) -> String {
        format!("{}:{}-{}", self.reference_name, self.start + 1, self.end)
    }

    /// Parse a region literal: `chr1`, `chr1:1,000` or `chr1:1,000-2,000`
    /// (1-based, inclusive). Bare contig names need `contigs` to supply the
    /// span; when `contigs` is given, every referenced contig must be in it.
    pub fn parse_literal(literal: &str, contigs: Option<&[Contig]>) -> Result<Region> {
        let lookup = |name: &str| -> Result<Option<u64>> {
            match contigs {
                Some(contigs) => contigs
                    .iter()
                    .find(|c| c.name == name)
                    .map(|c| Some(c.n_bases))
                    .ok_or_else(|| {
                        Error::config(format!(
                            "region literal {:?} references unknown contig {:?}",
                            literal, name
                        ))
                    }),
                None => Ok(None),
            }
        };

        match literal.split_once(':') {
            None => {
                let n_bases = lookup(literal)?.ok_or_else(|| {
                    Error::config(format!(
                        "region literal {:?} names a whole contig but no contig list is available",
                        literal
                    ))
                })?;
                Ok(Region::new(literal, 0, n_bases))
            }
            Some((name, span)) => {
                lookup(name)?;
                let span: String = span.chars().filter(|c| *c != ',').collect();
                let parse_pos = |s: &str| -> Result<u64> {
                    let pos: u64 = s.parse().map_err(|_| {
                        Error::config(format!("cannot parse position {:?} in region literal", s))
                    })?;
                    if pos == 0 {
                        return Err(Error::config(format!(
                            "region literal {:?} uses 1-based positions; 0 is invalid",
                            literal
                        )));
                    }
                    Ok(pos)
                };
                let (start, end) = match span.split_once('-') {
                    None => {
                        let pos = parse_pos(&span)?;
                        (pos - 1, pos)
                    }
                    Some((lo, hi)) => {
                        let lo = parse_pos(lo)?;
                        let hi = parse_pos(hi)?;
                        if hi < lo {
                            return Err(Error::config(format!(
                                "region literal {:?} has end before start",
                                literal
                            )));
                        }
                        (lo - 1, hi)
                    }
                };
                Ok(Region::new(name, start, end))
            }
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_literal())
    }
}

/// An ordered collection of coalesced half-open ranges, grouped by contig.
#[derive(Debug, Clone, Default)]
pub struct RangeSet {
    contig_order: Vec<SmartString>,
    ranges: FxHashMap<SmartString, Vec<(u64, u64)>>,
}

impl RangeSet {
    pub fn new() -> Self {
        RangeSet::default()
    }

    /// Full span of every contig, in the given order.
    pub fn from_contigs(contigs: &[Contig]) -> Self {
        let mut set = RangeSet::new();
        for contig in contigs {
            set.add(contig.name.clone(), 0, contig.n_bases);
        }
        set
    }

    pub fn from_region_list(regions: &[Region]) -> Self {
        let mut set = RangeSet::new();
        for region in regions {
            set.add(region.reference_name.clone(), region.start, region.end);
        }
        set
    }

    /// Build a range set from a mix of region literals and BED file paths.
    pub fn from_regions(specs: &[String], contigs: Option<&[Contig]>) -> Result<Self> {
        let mut set = RangeSet::new();
        for spec in specs {
            if looks_like_bed_path(spec) {
                set.add_bed(spec)?;
            } else {
                let region = Region::parse_literal(spec, contigs)?;
                set.add(region.reference_name, region.start, region.end);
            }
        }
        Ok(set)
    }

    fn add_bed<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let mut reader = bed::Reader::new(get_reader(path.as_ref())?);
        for (i, record) in reader.records().enumerate() {
            let record = record.map_err(|e| {
                Error::config(format!(
                    "invalid BED record {} in {}: {}",
                    i,
                    path.as_ref().display(),
                    e
                ))
            })?;
            self.add(record.chrom(), record.start(), record.end());
        }
        Ok(())
    }

    /// Insert one range, re-establishing the sorted, coalesced invariant.
    pub fn add<N: Into<SmartString>>(&mut self, reference_name: N, start: u64, end: u64) {
        if end <= start {
            return;
        }
        let name = reference_name.into();
        if !self.ranges.contains_key(&name) {
            self.contig_order.push(name.clone());
        }
        let ranges = self.ranges.entry(name).or_default();
        ranges.push((start, end));
        coalesce(ranges);
    }

    pub fn is_empty(&self) -> bool {
        self.contig_order
            .iter()
            .all(|c| self.ranges[c].is_empty())
    }

    /// Number of stored (coalesced) ranges.
    pub fn region_count(&self) -> usize {
        self.contig_order.iter().map(|c| self.ranges[c].len()).sum()
    }

    /// Every stored range as a [`Region`], in contig order then start order.
    pub fn regions(&self) -> Vec<Region> {
        let mut out = Vec::with_capacity(self.region_count());
        for contig in &self.contig_order {
            for &(start, end) in &self.ranges[contig] {
                out.push(Region::new(contig.clone(), start, end));
            }
        }
        out
    }

    /// Set intersection. Contig order follows `self`.
    pub fn intersection(&self, other: &RangeSet) -> RangeSet {
        let mut out = RangeSet::new();
        for contig in &self.contig_order {
            let theirs = match other.ranges.get(contig) {
                Some(r) => r,
                None => continue,
            };
            let ours = &self.ranges[contig];
            let (mut i, mut j) = (0, 0);
            while i < ours.len() && j < theirs.len() {
                let (a_start, a_end) = ours[i];
                let (b_start, b_end) = theirs[j];
                let start = a_start.max(b_start);
                let end = a_end.min(b_end);
                if start < end {
                    out.add(contig.clone(), start, end);
                }
                if a_end <= b_end {
                    i += 1;
                } else {
                    j += 1;
                }
            }
        }
        out
    }

    /// Remove every range in `other` from `self`.
    pub fn exclude_regions(&mut self, other: &RangeSet) {
        for contig in &self.contig_order {
            let cuts = match other.ranges.get(contig) {
                Some(c) if !c.is_empty() => c,
                _ => continue,
            };
            let ours = self.ranges.get_mut(contig).expect("contig in order list");
            let mut kept = Vec::with_capacity(ours.len());
            for &(start, end) in ours.iter() {
                let mut cursor = start;
                for &(cut_start, cut_end) in cuts {
                    if cut_end <= cursor {
                        continue;
                    }
                    if cut_start >= end {
                        break;
                    }
                    if cursor < cut_start {
                        kept.push((cursor, cut_start.min(end)));
                    }
                    cursor = cursor.max(cut_end);
                    if cursor >= end {
                        break;
                    }
                }
                if cursor < end {
                    kept.push((cursor, end));
                }
            }
            *ours = kept;
        }
    }

    /// Split every range into contiguous pieces of at most `max_size` bp,
    /// preserving contig order and in-contig start order.
    pub fn partition(&self, max_size: u64) -> Vec<Region> {
        assert!(max_size > 0, "partition size must be positive");
        let mut out = Vec::new();
        for contig in &self.contig_order {
            for &(start, end) in &self.ranges[contig] {
                let mut pos = start;
                while pos < end {
                    let piece_end = (pos + max_size).min(end);
                    out.push(Region::new(contig.clone(), pos, piece_end));
                    pos = piece_end;
                }
            }
        }
        out
    }
}

fn coalesce(ranges: &mut Vec<(u64, u64)>) {
    ranges.sort_unstable();
    let mut merged: Vec<(u64, u64)> = Vec::with_capacity(ranges.len());
    for &(start, end) in ranges.iter() {
        match merged.last_mut() {
            // Touching ranges merge too, not just overlapping ones.
            Some(last) if start <= last.1 => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }
    *ranges = merged;
}

fn looks_like_bed_path(spec: &str) -> bool {
    spec.ends_with(".bed") || spec.ends_with(".bed.gz")
}
