//! Output sinks for a run.
//!
//! Examples, candidates and gVCF records stream out as length-delimited
//! binary records so a consumer can read them back without loading a whole
//! shard; the per-region runtime report is a tab-separated table. All sinks
//! except examples are optional: an [`OutputsWriter`] binds each configured
//! sink exactly once at construction and turns writes to unbound sinks into
//! no-ops, so the driver loop never branches on configuration.

use crate::core::errors::{Error, Result};
use crate::core::fs::make_parent_dirs;
use crate::core::io::{get_reader, get_tsv_writer, get_writer};
use crate::options::ResolvedOutputs;
use crate::processor::RegionOutput;
use crate::variant::{Candidate, Example, GvcfRecord};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::{self, Read, Write};
use std::marker::PhantomData;
use std::path::Path;

/// Writes one record type as `u64` little-endian length prefixes followed by
/// binary-encoded payloads.
pub struct RecordWriter<T: Serialize, W: Write> {
    writer: W,
    _record: PhantomData<T>,
}

impl<T: Serialize, W: Write> RecordWriter<T, W> {
    pub fn new(writer: W) -> Self {
        RecordWriter {
            writer,
            _record: PhantomData,
        }
    }

    pub fn write(&mut self, record: &T) -> Result<()> {
        let payload = bincode::serialize(record)?;
        self.writer.write_all(&(payload.len() as u64).to_le_bytes())?;
        self.writer.write_all(&payload)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

impl<T: Serialize> RecordWriter<T, Box<dyn Write>> {
    /// Open a sink at `path`, creating parent directories and compressing by
    /// extension.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        make_parent_dirs(&path)?;
        Ok(RecordWriter::new(get_writer(path)?))
    }
}

/// Reads streams produced by [`RecordWriter`].
pub struct RecordReader<T: DeserializeOwned, R: Read> {
    reader: R,
    _record: PhantomData<T>,
}

impl<T: DeserializeOwned, R: Read> RecordReader<T, R> {
    pub fn new(reader: R) -> Self {
        RecordReader {
            reader,
            _record: PhantomData,
        }
    }

    /// The next record, or `None` at a clean end of stream. A stream that
    /// ends inside a record is an error, not an end.
    pub fn next_record(&mut self) -> Result<Option<T>> {
        let mut length = [0u8; 8];
        match self.reader.read_exact(&mut length) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }
        let mut payload = vec![0u8; u64::from_le_bytes(length) as usize];
        self.reader.read_exact(&mut payload)?;
        Ok(Some(bincode::deserialize(&payload)?))
    }
}

impl<T: DeserializeOwned> RecordReader<T, Box<dyn Read>> {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(RecordReader::new(get_reader(path)?))
    }
}

impl<T: DeserializeOwned, R: Read> Iterator for RecordReader<T, R> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

/// One row of the per-region runtime report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeRow {
    pub region: String,
    #[serde(rename = "get reads")]
    pub get_reads_seconds: f64,
    #[serde(rename = "find candidates")]
    pub find_candidates_seconds: f64,
    #[serde(rename = "make pileup images")]
    pub make_pileup_images_seconds: f64,
    #[serde(rename = "write outputs")]
    pub write_outputs_seconds: f64,
    #[serde(rename = "num reads")]
    pub n_reads: u64,
    #[serde(rename = "num candidates")]
    pub n_candidates: u64,
    #[serde(rename = "num examples")]
    pub n_examples: u64,
}

impl RuntimeRow {
    pub fn new(output: &RegionOutput, write_outputs_seconds: f64) -> Self {
        RuntimeRow {
            region: output.region.to_literal(),
            get_reads_seconds: output.timings.get_reads_seconds,
            find_candidates_seconds: output.timings.find_candidates_seconds,
            make_pileup_images_seconds: output.timings.make_pileup_images_seconds,
            write_outputs_seconds,
            n_reads: output.n_reads as u64,
            n_candidates: output.candidates.len() as u64,
            n_examples: output.examples.len() as u64,
        }
    }
}

/// All sinks for one worker, bound once from the resolved output paths.
pub struct OutputsWriter {
    examples: RecordWriter<Example, Box<dyn Write>>,
    candidates: Option<RecordWriter<Candidate, Box<dyn Write>>>,
    gvcfs: Option<RecordWriter<GvcfRecord, Box<dyn Write>>>,
    runtime: Option<csv::Writer<Box<dyn Write>>>,
}

impl std::fmt::Debug for OutputsWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputsWriter").finish_non_exhaustive()
    }
}

impl OutputsWriter {
    pub fn new(outputs: &ResolvedOutputs) -> Result<Self> {
        let mut bound: Vec<&Path> = Vec::new();
        bind(&mut bound, &outputs.examples)?;
        let examples = RecordWriter::from_path(&outputs.examples)?;
        let candidates = match &outputs.candidates {
            Some(path) => {
                bind(&mut bound, path)?;
                Some(RecordWriter::from_path(path)?)
            }
            None => None,
        };
        let gvcfs = match &outputs.gvcf {
            Some(path) => {
                bind(&mut bound, path)?;
                Some(RecordWriter::from_path(path)?)
            }
            None => None,
        };
        let runtime = match &outputs.runtime_by_region {
            Some(path) => {
                bind(&mut bound, path)?;
                make_parent_dirs(path)?;
                Some(get_tsv_writer(path)?)
            }
            None => None,
        };
        Ok(OutputsWriter {
            examples,
            candidates,
            gvcfs,
            runtime,
        })
    }

    pub fn write_examples(&mut self, examples: &[Example]) -> Result<()> {
        for example in examples {
            self.examples.write(example)?;
        }
        Ok(())
    }

    pub fn write_candidates(&mut self, candidates: &[Candidate]) -> Result<()> {
        if let Some(writer) = self.candidates.as_mut() {
            for candidate in candidates {
                writer.write(candidate)?;
            }
        }
        Ok(())
    }

    pub fn write_gvcfs(&mut self, records: &[GvcfRecord]) -> Result<()> {
        if let Some(writer) = self.gvcfs.as_mut() {
            for record in records {
                writer.write(record)?;
            }
        }
        Ok(())
    }

    pub fn write_runtime(&mut self, row: &RuntimeRow) -> Result<()> {
        if let Some(writer) = self.runtime.as_mut() {
            writer.serialize(row)?;
        }
        Ok(())
    }

    /// Flush every bound sink. Compressed sinks finalize on drop.
    pub fn finish(mut self) -> Result<()> {
        self.examples.flush()?;
        if let Some(writer) = self.candidates.as_mut() {
            writer.flush()?;
        }
        if let Some(writer) = self.gvcfs.as_mut() {
            writer.flush()?;
        }
        if let Some(writer) = self.runtime.as_mut() {
            writer.flush()?;
        }
        Ok(())
    }
}

fn bind<'a>(bound: &mut Vec<&'a Path>, path: &'a Path) -> Result<()> {
    if bound.contains(&path) {
        return Err(Error::config(format!(
            "output path {:?} is bound to more than one sink",
            path
        )));
    }
    bound.push(path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variant::{PileupImage, Variant};

    fn example(start: u64) -> Example {
        Example {
            variant: Variant::new("chr1", start, "A", &["T"]),
            alt_allele_indices: vec![0],
            image: PileupImage {
                data: vec![1, 2, 3],
                shape: [1, 3, 1],
            },
            label: Some(1),
        }
    }

    fn resolved(dir: &Path) -> ResolvedOutputs {
        ResolvedOutputs {
            examples: dir.join("examples.bin"),
            candidates: None,
            gvcf: None,
            runtime_by_region: None,
            run_info: None,
        }
    }

    #[test]
    fn records_roundtrip_through_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("examples.bin");
        {
            let mut writer: RecordWriter<Example, _> = RecordWriter::from_path(&path).unwrap();
            for start in [100, 200, 300] {
                writer.write(&example(start)).unwrap();
            }
            writer.flush().unwrap();
        }
        let reader: RecordReader<Example, _> = RecordReader::from_path(&path).unwrap();
        let restored: Result<Vec<Example>> = reader.collect();
        let restored = restored.unwrap();
        assert_eq!(restored.len(), 3);
        assert_eq!(restored[1], example(200));
    }

    #[test]
    fn records_roundtrip_compressed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("examples.bin.gz");
        {
            let mut writer: RecordWriter<Example, _> = RecordWriter::from_path(&path).unwrap();
            writer.write(&example(7)).unwrap();
            writer.flush().unwrap();
        }
        let raw = std::fs::read(&path).unwrap();
        assert_eq!(&raw[..2], &[0x1f, 0x8b]);
        let mut reader: RecordReader<Example, _> = RecordReader::from_path(&path).unwrap();
        assert_eq!(reader.next_record().unwrap(), Some(example(7)));
        assert_eq!(reader.next_record().unwrap(), None);
    }

    #[test]
    fn empty_stream_reads_as_clean_end() {
        let mut reader: RecordReader<Example, _> = RecordReader::new(&[][..]);
        assert!(reader.next_record().unwrap().is_none());
    }

    #[test]
    fn truncated_record_is_an_error() {
        let mut writer: RecordWriter<Example, Vec<u8>> = RecordWriter::new(Vec::new());
        writer.write(&example(5)).unwrap();
        let bytes = writer.writer;
        let cut = &bytes[..bytes.len() - 2];
        let mut reader: RecordReader<Example, _> = RecordReader::new(cut);
        assert!(reader.next_record().is_err());
    }

    #[test]
    fn unbound_sinks_ignore_writes() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = OutputsWriter::new(&resolved(dir.path())).unwrap();
        writer.write_examples(&[example(1)]).unwrap();
        writer
            .write_candidates(&[Candidate::new(Variant::new("chr1", 1, "A", &["T"]))])
            .unwrap();
        writer
            .write_gvcfs(&[GvcfRecord {
                reference_name: "chr1".into(),
                start: 0,
                end: 10,
                genotype_quality: 30,
                read_depth: 12,
            }])
            .unwrap();
        writer.finish().unwrap();
        assert!(dir.path().join("examples.bin").exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn duplicate_output_paths_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let outputs = ResolvedOutputs {
            candidates: Some(dir.path().join("examples.bin")),
            ..resolved(dir.path())
        };
        let err = OutputsWriter::new(&outputs).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn runtime_report_uses_the_documented_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runtime.tsv");
        let outputs = ResolvedOutputs {
            runtime_by_region: Some(path.clone()),
            ..resolved(dir.path())
        };
        let mut writer = OutputsWriter::new(&outputs).unwrap();
        writer
            .write_runtime(&RuntimeRow {
                region: "chr1:1-1000".to_string(),
                get_reads_seconds: 0.5,
                find_candidates_seconds: 0.25,
                make_pileup_images_seconds: 0.125,
                write_outputs_seconds: 0.0625,
                n_reads: 42,
                n_candidates: 3,
                n_examples: 4,
            })
            .unwrap();
        writer.finish().unwrap();

        let report = std::fs::read_to_string(&path).unwrap();
        let mut lines = report.lines();
        assert_eq!(
            lines.next().unwrap(),
            "region\tget reads\tfind candidates\tmake pileup images\twrite outputs\t\
             num reads\tnum candidates\tnum examples"
        );
        assert_eq!(
            lines.next().unwrap(),
            "chr1:1-1000\t0.5\t0.25\t0.125\t0.0625\t42\t3\t4"
        );
    }

    #[test]
    fn runtime_row_summarizes_region_output() {
        let output = RegionOutput {
            region: crate::ranges::Region::new("chr2", 0, 500),
            candidates: vec![Candidate::new(Variant::new("chr2", 10, "A", &["T"]))],
            examples: vec![example(10), example(20)],
            gvcfs: Vec::new(),
            n_reads: 9,
            timings: crate::processor::RegionTimings {
                get_reads_seconds: 1.0,
                find_candidates_seconds: 2.0,
                make_pileup_images_seconds: 3.0,
            },
        };
        let row = RuntimeRow::new(&output, 4.0);
        assert_eq!(row.region, "chr2:1-500");
        assert_eq!(row.n_reads, 9);
        assert_eq!(row.n_candidates, 1);
        assert_eq!(row.n_examples, 2);
        assert_eq!(row.write_outputs_seconds, 4.0);
    }
}
