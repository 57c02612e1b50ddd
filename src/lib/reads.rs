//! Owned aligned-read records.
//!
//! The pipeline only needs identity, genomic placement and sequence length
//! from a read; base-level alignment detail stays inside the engines that
//! produced it. The aligned span is treated as ungapped here (`end - start`
//! tracks the sequence length for reads without indels), which is all the
//! window-trimming and length bookkeeping below rely on.

use crate::ranges::Region;
use serde::{Deserialize, Serialize};
use smartstring::alias::String as SmartString;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Read {
    pub name: SmartString,
    pub reference_name: SmartString,
    pub start: u64,
    pub end: u64,
    pub sequence: String,
}

impl Read {
    /// A read whose span is derived from its sequence length.
    pub fn aligned<N, C>(name: N, reference_name: C, start: u64, sequence: &str) -> Self
    where
        N: Into<SmartString>,
        C: Into<SmartString>,
    {
        Read {
            name: name.into(),
            reference_name: reference_name.into(),
            start,
            end: start + sequence.len() as u64,
            sequence: sequence.to_string(),
        }
    }

    /// A read with an explicit alignment end (spans with indels).
    pub fn with_span<N, C>(
        name: N,
        reference_name: C,
        start: u64,
        end: u64,
        sequence: &str,
    ) -> Self
    where
        N: Into<SmartString>,
        C: Into<SmartString>,
    {
        Read {
            name: name.into(),
            reference_name: reference_name.into(),
            start,
            end,
            sequence: sequence.to_string(),
        }
    }

    pub fn sequence_length(&self) -> usize {
        self.sequence.len()
    }

    pub fn overlaps(&self, region: &Region) -> bool {
        self.reference_name == region.reference_name
            && self.start < region.end
            && region.start < self.end
    }

    /// Clip the read to a window, slicing the sequence by the clipped span.
    /// Returns `None` when the read does not overlap the window.
    pub fn trim_to_window(&self, window: &Region) -> Option<Read> {
        if !self.overlaps(window) {
            return None;
        }
        let new_start = self.start.max(window.start);
        let new_end = self.end.min(window.end);
        let lo = ((new_start - self.start) as usize).min(self.sequence.len());
        let cut_right = ((self.end - new_end) as usize).min(self.sequence.len() - lo);
        let hi = self.sequence.len() - cut_right;
        Some(Read {
            name: self.name.clone(),
            reference_name: self.reference_name.clone(),
            start: new_start,
            end: new_end,
            sequence: self.sequence[lo..hi].to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aligned_span_tracks_sequence() {
        let read = Read::aligned("r1", "chr1", 100, "ACGTACGT");
        assert_eq!(read.end, 108);
        assert_eq!(read.sequence_length(), 8);
    }

    #[test]
    fn overlap_requires_same_contig() {
        let read = Read::aligned("r1", "chr1", 100, "ACGT");
        assert!(read.overlaps(&Region::new("chr1", 103, 110)));
        assert!(!read.overlaps(&Region::new("chr1", 104, 110)));
        assert!(!read.overlaps(&Region::new("chr2", 100, 110)));
    }

    #[test]
    fn trim_clips_both_ends() {
        let read = Read::aligned("r1", "chr1", 100, "AACCGGTT");
        let trimmed = read.trim_to_window(&Region::new("chr1", 102, 106)).unwrap();
        assert_eq!(trimmed.start, 102);
        assert_eq!(trimmed.end, 106);
        assert_eq!(trimmed.sequence, "CCGG");
    }

    #[test]
    fn trim_inside_window_is_identity() {
        let read = Read::aligned("r1", "chr1", 100, "AACCGGTT");
        let trimmed = read.trim_to_window(&Region::new("chr1", 0, 1000)).unwrap();
        assert_eq!(trimmed, read);
    }

    #[test]
    fn trim_outside_window_drops_read() {
        let read = Read::aligned("r1", "chr1", 100, "AACC");
        assert!(read.trim_to_window(&Region::new("chr1", 200, 300)).is_none());
    }
}
