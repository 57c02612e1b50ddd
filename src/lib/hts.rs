//! File-backed engine sources built on htslib.
//!
//! These adapters connect the engine traits to indexed BAM/CRAM, FASTA and
//! VCF files. They are building blocks for an [`EngineFactory`]: the
//! embedding crate decides which paths map to which sources, these types do
//! the decoding.
//!
//! [`EngineFactory`]: crate::engines::EngineFactory

use crate::contigs::Contig;
use crate::core::errors::{Error, Result};
use crate::engines::{CohortReader, CohortVariant, ReadSource, ReadSourceError, ReferenceReader};
use crate::ranges::Region;
use crate::reads::Read;
use crate::variant::Variant;
use rust_htslib::bam::{self, Read as BamRead};
use rust_htslib::bcf::{self, Read as BcfRead};
use rust_htslib::faidx;
use std::path::Path;

/// Which alignments a [`BamReadSource`] passes through to the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignmentFilter {
    pub min_mapping_quality: u8,
    pub keep_duplicates: bool,
    pub keep_secondary: bool,
    pub keep_supplementary: bool,
}

impl Default for AlignmentFilter {
    fn default() -> Self {
        AlignmentFilter {
            min_mapping_quality: 5,
            keep_duplicates: false,
            keep_secondary: false,
            keep_supplementary: false,
        }
    }
}

impl AlignmentFilter {
    fn keeps(&self, record: &bam::Record) -> bool {
        if record.is_unmapped() || record.is_quality_check_failed() {
            return false;
        }
        if !self.keep_duplicates && record.is_duplicate() {
            return false;
        }
        if !self.keep_secondary && record.is_secondary() {
            return false;
        }
        if !self.keep_supplementary && record.is_supplementary() {
            return false;
        }
        record.mapq() >= self.min_mapping_quality
    }
}

/// A [`ReadSource`] over an indexed BAM/CRAM file.
pub struct BamReadSource {
    reader: bam::IndexedReader,
    contigs: Vec<Contig>,
    filter: AlignmentFilter,
}

impl BamReadSource {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = bam::IndexedReader::from_path(path)?;
        let header = reader.header().to_owned();
        let mut contigs = Vec::with_capacity(header.target_count() as usize);
        for tid in 0..header.target_count() {
            let name = std::str::from_utf8(header.tid2name(tid))
                .map_err(|e| Error::config(format!("non-UTF8 contig name in BAM header: {}", e)))?;
            let n_bases = header
                .target_len(tid)
                .ok_or_else(|| Error::config(format!("missing length for contig {:?}", name)))?;
            contigs.push(Contig::new(name, n_bases));
        }
        Ok(BamReadSource {
            reader,
            contigs,
            filter: AlignmentFilter::default(),
        })
    }

    pub fn with_filter(mut self, filter: AlignmentFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Point a CRAM at the reference it was compressed against.
    pub fn set_cram_reference<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.reader.set_reference(path)?;
        Ok(())
    }
}

impl ReadSource for BamReadSource {
    fn contigs(&self) -> &[Contig] {
        &self.contigs
    }

    fn query(&mut self, region: &Region) -> std::result::Result<Vec<Read>, ReadSourceError> {
        let tid = match self.reader.header().tid(region.reference_name.as_bytes()) {
            Some(tid) => tid,
            None => {
                return Err(ReadSourceError::UnknownContig(
                    region.reference_name.to_string(),
                ))
            }
        };
        self.reader
            .fetch((tid, region.start as i64, region.end as i64))
            .map_err(|e| ReadSourceError::Other(e.to_string()))?;

        let mut reads = Vec::new();
        for record in self.reader.records() {
            // Iteration failures mean the stream itself is undecodable.
            let record = record.map_err(|e| ReadSourceError::DataLoss(e.to_string()))?;
            if !self.filter.keeps(&record) {
                continue;
            }
            let name = std::str::from_utf8(record.qname())
                .map_err(|e| ReadSourceError::Other(format!("non-UTF8 read name: {}", e)))?;
            let sequence = String::from_utf8(record.seq().as_bytes())
                .map_err(|e| ReadSourceError::Other(format!("non-UTF8 read sequence: {}", e)))?;
            let start = record.pos().max(0) as u64;
            let end = record.cigar().end_pos().max(record.pos()) as u64;
            reads.push(Read::with_span(
                name,
                region.reference_name.clone(),
                start,
                end,
                &sequence,
            ));
        }
        Ok(reads)
    }
}

/// A [`ReferenceReader`] over an indexed FASTA file. The `.fai` index is
/// created on open when missing.
pub struct FaidxReference {
    reader: faidx::Reader,
    contigs: Vec<Contig>,
}

impl FaidxReference {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = faidx::Reader::from_path(path)?;
        let mut contigs = Vec::with_capacity(reader.n_seqs() as usize);
        for i in 0..reader.n_seqs() {
            let name = reader.seq_name(i as i32)?;
            let n_bases = reader.fetch_seq_len(&name);
            contigs.push(Contig::new(name.as_str(), n_bases));
        }
        Ok(FaidxReference { reader, contigs })
    }
}

impl ReferenceReader for FaidxReference {
    fn contigs(&self) -> &[Contig] {
        &self.contigs
    }

    fn query(&self, region: &Region) -> Result<String> {
        let n_bases = self
            .contig_length(&region.reference_name)
            .ok_or_else(|| {
                Error::config(format!(
                    "contig {:?} is absent from the reference",
                    region.reference_name.as_str()
                ))
            })?;
        if region.end > n_bases {
            return Err(Error::config(format!(
                "reference query {} runs past the end of the contig ({} bp)",
                region, n_bases
            )));
        }
        if region.is_empty() {
            return Ok(String::new());
        }
        // htslib takes inclusive coordinates.
        let sequence = self.reader.fetch_seq_string(
            region.reference_name.as_str(),
            region.start as usize,
            (region.end - 1) as usize,
        )?;
        Ok(sequence.to_uppercase())
    }
}

/// A [`CohortReader`] over an indexed population VCF.
pub struct VcfCohortSource {
    reader: bcf::IndexedReader,
}

impl VcfCohortSource {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(VcfCohortSource {
            reader: bcf::IndexedReader::from_path(path)?,
        })
    }
}

impl CohortReader for VcfCohortSource {
    fn query(&mut self, region: &Region) -> Result<Vec<CohortVariant>> {
        let rid = match self
            .reader
            .header()
            .name2rid(region.reference_name.as_bytes())
        {
            Ok(rid) => rid,
            // A catalog that does not know the contig simply has no data.
            Err(_) => return Ok(Vec::new()),
        };
        self.reader.fetch(rid, region.start, Some(region.end))?;
        let header = self.reader.header().clone();
        let mut variants = Vec::new();
        for record in self.reader.records() {
            let record = record?;
            variants.push(cohort_variant_from_record(&header, &record)?);
        }
        Ok(variants)
    }
}

fn cohort_variant_from_record(
    header: &bcf::header::HeaderView,
    record: &bcf::Record,
) -> Result<CohortVariant> {
    let rid = record
        .rid()
        .ok_or_else(|| Error::config("cohort VCF record has no contig"))?;
    let name = std::str::from_utf8(header.rid2name(rid)?)
        .map_err(|e| Error::config(format!("non-UTF8 contig name in cohort VCF: {}", e)))?;
    let alleles = record.alleles();
    if alleles.is_empty() {
        return Err(Error::config(format!(
            "cohort VCF record at {}:{} has no alleles",
            name,
            record.pos() + 1
        )));
    }
    let mut decoded = Vec::with_capacity(alleles.len());
    for allele in &alleles {
        decoded.push(std::str::from_utf8(allele).map_err(|e| {
            Error::config(format!(
                "non-UTF8 allele in cohort VCF at {}:{}: {}",
                name,
                record.pos() + 1,
                e
            ))
        })?);
    }
    let variant = Variant::new(name, record.pos().max(0) as u64, decoded[0], &decoded[1..]);
    // Absent or undeclared AF annotations mean unknown frequencies, which
    // score as zero downstream.
    let alt_frequencies = match record.info(b"AF").float() {
        Ok(Some(values)) => values.iter().map(|&f| f as f64).collect(),
        _ => Vec::new(),
    };
    Ok(CohortVariant::new(variant, alt_frequencies))
}

/// Contigs declared by a VCF header. Lengths default to zero when the
/// `##contig` line does not carry one, which is enough for the name-based
/// matching truth files get.
pub fn contigs_from_vcf<P: AsRef<Path>>(path: P) -> Result<Vec<Contig>> {
    let reader = bcf::Reader::from_path(path)?;
    let mut contigs = Vec::new();
    for record in reader.header().header_records() {
        if let bcf::HeaderRecord::Contig { values, .. } = record {
            let name = values
                .get("ID")
                .ok_or_else(|| Error::config("##contig header line without an ID"))?;
            let n_bases = values
                .get("length")
                .and_then(|length| length.parse::<u64>().ok())
                .unwrap_or(0);
            contigs.push(Contig::new(name.as_str(), n_bases));
        }
    }
    Ok(contigs)
}

/// Every variant span in a VCF, for thinning the region plan. Reads the
/// whole file once; ordering is handled by the filter itself.
pub fn scan_variant_positions<P: AsRef<Path>>(path: P) -> Result<Vec<Region>> {
    let mut reader = bcf::Reader::from_path(path)?;
    let header = reader.header().clone();
    let mut positions = Vec::new();
    for record in reader.records() {
        let record = record?;
        let rid = match record.rid() {
            Some(rid) => rid,
            None => continue,
        };
        let name = std::str::from_utf8(header.rid2name(rid)?)
            .map_err(|e| Error::config(format!("non-UTF8 contig name in VCF: {}", e)))?;
        let start = record.pos().max(0) as u64;
        let end = (record.pos() + record.rlen()).max(0) as u64;
        positions.push(Region::new(name, start, end));
    }
    Ok(positions)
}

/// The sample name recorded in a BAM's first read group, when any.
pub fn sample_name_from_bam<P: AsRef<Path>>(path: P) -> Result<Option<String>> {
    let reader = bam::Reader::from_path(path)?;
    let header = bam::Header::from_template(reader.header());
    for (key, records) in header.to_hashmap() {
        if key != "RG" {
            continue;
        }
        for record in records {
            if let Some(sample) = record.get("SM") {
                return Ok(Some(sample.clone()));
            }
        }
    }
    Ok(None)
}
