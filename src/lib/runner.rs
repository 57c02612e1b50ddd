//! The end-to-end driver: plan regions, process them, stream outputs.
//!
//! Parallelism is process-level only. Each worker runs this same loop over
//! its own shard of the partitioned regions and writes its own output files;
//! nothing here shares state across tasks, so a run is reproducible shard by
//! shard.

use crate::contigs::{ensure_consistent_contigs, Contig};
use crate::core::errors::Result;
use crate::core::fs::make_parent_dirs;
use crate::core::io::get_writer;
use crate::engines::{EngineFactory, LabelingMetrics};
use crate::options::Options;
use crate::outputs::{OutputsWriter, RuntimeRow};
use crate::partition::{build_calling_regions, filter_regions_by_vcf, regions_to_process};
use crate::processor::RegionProcessor;
use crate::ranges::Region;
use log::info;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;

/// Totals for one completed worker run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceMetrics {
    pub wall_time_seconds: f64,
    pub n_regions_processed: u64,
    pub n_candidates: u64,
    pub n_examples: u64,
}

/// The run summary written next to the outputs when configured.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunInfo {
    pub options: Options,
    pub resource_metrics: ResourceMetrics,
    pub labeling_metrics: Option<LabelingMetrics>,
}

/// What [`make_examples_runner`] hands back to its caller.
#[derive(Debug, Clone, PartialEq)]
pub struct RunStats {
    pub n_regions: u64,
    pub n_candidates: u64,
    pub n_examples: u64,
    pub n_gvcf_records: u64,
    pub wall_time_seconds: f64,
}

/// Work out the ordered region list this task should process.
///
/// Contig reconciliation runs first: the reference, every read input and (in
/// training mode) the truth variants must agree on enough of the genome.
/// The shared contigs are then partitioned, restricted to any configured
/// calling regions, sharded, and finally thinned to regions that can contain
/// candidates when a candidate-position source is available.
pub fn processing_regions_from_options<F: EngineFactory>(
    options: &Options,
    factory: &F,
) -> Result<Vec<Region>> {
    let task = options.task_prefix();
    let reference = factory.reference(options)?;
    let ref_contigs: Vec<Contig> = reference.contigs().to_vec();

    let sources = factory.read_sources(options)?;
    let sam_contigs: Vec<Vec<Contig>> = sources
        .iter()
        .map(|input| input.source.contigs().to_vec())
        .collect();
    let truth_contigs = if options.training() {
        Some(factory.truth_contigs(options)?)
    } else {
        None
    };

    let contigs = ensure_consistent_contigs(
        &ref_contigs,
        &sam_contigs,
        truth_contigs.as_deref(),
        &options.exclude_contigs,
        options.min_shared_contigs_fraction,
    )?;
    info!(
        "{}common contigs are {:?}",
        task,
        contigs.iter().map(|c| c.name.as_str()).collect::<Vec<_>>()
    );

    let calling_regions = build_calling_regions(
        &ref_contigs,
        &options.calling_regions,
        &options.exclude_calling_regions,
    )?;
    let regions = regions_to_process(
        &contigs,
        options.partition_size,
        Some(&calling_regions),
        options.shard_tuple(),
    )?;

    // Regions that cannot contain a candidate are dropped up front when the
    // candidate positions are knowable, except in gVCF mode where every
    // region must still be visited for its reference records.
    if options.candidates_vcf_path().is_some() && !options.gvcf_enabled() {
        let timer = Instant::now();
        let positions = factory.candidate_positions(options)?;
        let before = regions.len();
        let regions = filter_regions_by_vcf(regions, &positions);
        info!(
            "{}region filtering removed {} of {} regions with no known variants \
             [{:.2}s elapsed]",
            task,
            before - regions.len(),
            before,
            timer.elapsed().as_secs_f64()
        );
        return Ok(regions);
    }
    Ok(regions)
}

/// Run the whole pipeline for one task: plan, process every region, stream
/// outputs, then write the run summary.
pub fn make_examples_runner<F: EngineFactory>(options: Options, factory: F) -> Result<RunStats> {
    options.validate()?;
    let start = Instant::now();
    let task = options.task_prefix();

    info!("{}preparing inputs and planning regions", task);
    let regions = processing_regions_from_options(&options, &factory)?;
    let n_regions = regions.len();
    info!("{}processing {} regions", task, n_regions);

    let resolved = options.resolve_outputs()?;
    let mut writer = OutputsWriter::new(&resolved)?;
    let mut processor = RegionProcessor::new(options.clone(), factory);

    let mut n_candidates = 0u64;
    let mut n_examples = 0u64;
    let mut n_gvcf_records = 0u64;
    let mut last_reported = 0u64;
    let mut last_log = Instant::now();
    for region in &regions {
        let output = processor.process(region)?;

        let write_timer = Instant::now();
        writer.write_candidates(&output.candidates)?;
        writer.write_examples(&output.examples)?;
        writer.write_gvcfs(&output.gvcfs)?;
        let write_outputs_seconds = write_timer.elapsed().as_secs_f64();
        writer.write_runtime(&RuntimeRow::new(&output, write_outputs_seconds))?;

        n_candidates += output.candidates.len() as u64;
        n_examples += output.examples.len() as u64;
        n_gvcf_records += output.gvcfs.len() as u64;

        let reporting_interval = n_candidates / options.logging_every_n_candidates;
        if reporting_interval > last_reported || n_regions == 1 {
            last_reported = reporting_interval;
            info!(
                "{}{} candidates ({} examples) [{:.2}s elapsed]",
                task,
                n_candidates,
                n_examples,
                last_log.elapsed().as_secs_f64()
            );
            last_log = Instant::now();
        }
    }
    writer.finish()?;

    let stats = RunStats {
        n_regions: n_regions as u64,
        n_candidates,
        n_examples,
        n_gvcf_records,
        wall_time_seconds: start.elapsed().as_secs_f64(),
    };
    let labeling_metrics = processor.labeling_metrics();
    if let Some(metrics) = &labeling_metrics {
        info!(
            "{}labeled {} of {} candidate sites ({} unlabelable)",
            task,
            metrics.n_confident_labels,
            metrics.n_candidate_sites,
            metrics.n_unlabelable_sites
        );
    }
    if let Some(path) = &resolved.run_info {
        write_run_info(path, &options, &stats, labeling_metrics)?;
    }

    info!("{}found {} candidate variants", task, stats.n_candidates);
    info!("{}created {} examples", task, stats.n_examples);
    Ok(stats)
}

fn write_run_info(
    path: &Path,
    options: &Options,
    stats: &RunStats,
    labeling_metrics: Option<LabelingMetrics>,
) -> Result<()> {
    make_parent_dirs(path)?;
    let run_info = RunInfo {
        options: options.clone(),
        resource_metrics: ResourceMetrics {
            wall_time_seconds: stats.wall_time_seconds,
            n_regions_processed: stats.n_regions,
            n_candidates: stats.n_candidates,
            n_examples: stats.n_examples,
        },
        labeling_metrics,
    };
    let mut writer = get_writer(path)?;
    serde_json::to_writer_pretty(&mut writer, &run_info)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::Error;
    use crate::engines::{
        AltAlignedContext, InputReadSource, Label, PileupEncoder, ReadSource, ReadSourceError,
        ReferenceReader, VariantCaller, VariantLabeler,
    };
    use crate::options::{CallerKind, Mode, ShardParams};
    use crate::outputs::RecordReader;
    use crate::reads::Read;
    use crate::variant::{Candidate, Example, GvcfRecord, PileupImage, Variant};
    use std::fs;
    use std::path::PathBuf;

    struct PlanReference {
        contigs: Vec<Contig>,
    }

    impl ReferenceReader for PlanReference {
        fn contigs(&self) -> &[Contig] {
            &self.contigs
        }

        fn query(&self, _region: &Region) -> Result<String> {
            Err(Error::config("planning never queries bases"))
        }
    }

    struct PlanSource {
        contigs: Vec<Contig>,
    }

    impl ReadSource for PlanSource {
        fn contigs(&self) -> &[Contig] {
            &self.contigs
        }

        fn query(&mut self, _region: &Region) -> std::result::Result<Vec<Read>, ReadSourceError> {
            Ok(Vec::new())
        }
    }

    struct PlanFactory {
        ref_contigs: Vec<Contig>,
        source_contigs: Vec<Contig>,
        positions: Vec<Region>,
    }

    impl PlanFactory {
        fn new(contigs: Vec<Contig>) -> Self {
            PlanFactory {
                source_contigs: contigs.clone(),
                ref_contigs: contigs,
                positions: Vec::new(),
            }
        }
    }

    impl EngineFactory for PlanFactory {
        fn reference(&self, _options: &Options) -> Result<Box<dyn ReferenceReader>> {
            Ok(Box::new(PlanReference {
                contigs: self.ref_contigs.clone(),
            }))
        }

        fn read_sources(&self, _options: &Options) -> Result<Vec<InputReadSource>> {
            Ok(vec![InputReadSource::new(
                "reads.bam",
                Box::new(PlanSource {
                    contigs: self.source_contigs.clone(),
                }),
            )])
        }

        fn variant_caller(&self, _options: &Options) -> Result<Box<dyn VariantCaller>> {
            Err(Error::config("planning never builds a caller"))
        }

        fn pileup_encoder(&self, _options: &Options) -> Result<Box<dyn PileupEncoder>> {
            Err(Error::config("planning never builds an encoder"))
        }

        fn candidate_positions(&self, _options: &Options) -> Result<Vec<Region>> {
            Ok(self.positions.clone())
        }
    }

    fn plan_options() -> Options {
        Options {
            reference_path: PathBuf::from("ref.fa"),
            read_paths: vec![PathBuf::from("reads.bam")],
            examples_spec: Some("examples.bin".to_string()),
            sample_name: Some("sample1".to_string()),
            ..Options::default()
        }
    }

    #[test]
    fn planning_partitions_shared_contigs_in_order() {
        let factory = PlanFactory::new(vec![
            Contig::new("chr1", 2500),
            Contig::new("chrM", 100),
        ]);
        let regions = processing_regions_from_options(&plan_options(), &factory).unwrap();
        assert_eq!(
            regions,
            vec![
                Region::new("chr1", 0, 1000),
                Region::new("chr1", 1000, 2000),
                Region::new("chr1", 2000, 2500),
            ]
        );
    }

    #[test]
    fn calling_region_literals_restrict_the_plan() {
        let factory = PlanFactory::new(vec![Contig::new("chr1", 2500)]);
        let options = Options {
            calling_regions: vec!["chr1:1,001-2,000".to_string()],
            ..plan_options()
        };
        let regions = processing_regions_from_options(&options, &factory).unwrap();
        assert_eq!(regions, vec![Region::new("chr1", 1000, 2000)]);
    }

    #[test]
    fn shards_split_the_plan_without_overlap() {
        let factory = PlanFactory::new(vec![Contig::new("chr1", 2500)]);
        let mut all = Vec::new();
        for task_id in 0..2 {
            let options = Options {
                shard: Some(ShardParams {
                    task_id,
                    num_shards: 2,
                }),
                ..plan_options()
            };
            all.extend(processing_regions_from_options(&options, &factory).unwrap());
        }
        all.sort_by_key(|r| r.start);
        assert_eq!(
            all,
            vec![
                Region::new("chr1", 0, 1000),
                Region::new("chr1", 1000, 2000),
                Region::new("chr1", 2000, 2500),
            ]
        );
    }

    #[test]
    fn candidate_positions_thin_the_plan_unless_gvcf_is_on() {
        let mut factory = PlanFactory::new(vec![Contig::new("chr1", 2500)]);
        factory.positions = vec![Region::new("chr1", 50, 51)];
        let options = Options {
            variant_caller: CallerKind::VcfCandidateImporter,
            proposed_variants_path: Some(PathBuf::from("proposed.vcf.gz")),
            ..plan_options()
        };
        let regions = processing_regions_from_options(&options, &factory).unwrap();
        assert_eq!(regions, vec![Region::new("chr1", 0, 1000)]);

        let options = Options {
            gvcf_spec: Some("out.gvcf.bin".to_string()),
            ..options
        };
        let regions = processing_regions_from_options(&options, &factory).unwrap();
        assert_eq!(regions.len(), 3);
    }

    struct DenseReference {
        contigs: Vec<Contig>,
    }

    impl ReferenceReader for DenseReference {
        fn contigs(&self) -> &[Contig] {
            &self.contigs
        }

        fn query(&self, region: &Region) -> Result<String> {
            Ok("A".repeat(region.len() as usize))
        }
    }

    struct DenseSource {
        contigs: Vec<Contig>,
        reads_per_region: usize,
    }

    impl ReadSource for DenseSource {
        fn contigs(&self) -> &[Contig] {
            &self.contigs
        }

        fn query(&mut self, region: &Region) -> std::result::Result<Vec<Read>, ReadSourceError> {
            Ok((0..self.reads_per_region)
                .map(|i| {
                    Read::aligned(
                        format!("read_{}_{}", region.start, i),
                        region.reference_name.clone(),
                        region.start + i as u64,
                        "ACGTACGTACGTACGTACGT",
                    )
                })
                .collect())
        }
    }

    /// One SNP candidate per distinct read start, plus one coverage record
    /// per region in gVCF mode.
    struct StartSiteCaller;

    impl VariantCaller for StartSiteCaller {
        fn calls_and_gvcfs(
            &mut self,
            region: &Region,
            reads: &[Read],
            emit_gvcf: bool,
        ) -> Result<(Vec<Candidate>, Vec<GvcfRecord>)> {
            let mut starts: Vec<u64> = reads.iter().map(|r| r.start).collect();
            starts.sort_unstable();
            starts.dedup();
            let candidates = starts
                .into_iter()
                .map(|start| {
                    Candidate::new(Variant::new(
                        region.reference_name.clone(),
                        start,
                        "A",
                        &["T"],
                    ))
                })
                .collect();
            let gvcfs = if emit_gvcf {
                vec![GvcfRecord {
                    reference_name: region.reference_name.clone(),
                    start: region.start,
                    end: region.end,
                    genotype_quality: 35,
                    read_depth: reads.len() as u32,
                }]
            } else {
                Vec::new()
            };
            Ok((candidates, gvcfs))
        }
    }

    struct UnitEncoder;

    impl PileupEncoder for UnitEncoder {
        fn create_pileup_images(
            &mut self,
            candidate: &Candidate,
            _reads: &[&Read],
            _alt_context: Option<&AltAlignedContext>,
        ) -> Result<Option<Vec<(Vec<String>, PileupImage)>>> {
            let image = PileupImage {
                data: vec![0; 6],
                shape: [1, 2, 3],
            };
            Ok(Some(vec![(candidate.variant.alternate_bases.clone(), image)]))
        }
    }

    struct TruthLabel {
        confident: bool,
    }

    impl Label for TruthLabel {
        fn is_confident(&self) -> bool {
            self.confident
        }

        fn class_for_alt_alleles(&self, _alt_indices: &[usize]) -> i32 {
            1
        }
    }

    /// Labels every other candidate as confident, counting as it goes.
    #[derive(Default)]
    struct AlternatingLabeler {
        n_seen: u64,
        n_confident: u64,
    }

    impl VariantLabeler for AlternatingLabeler {
        fn label_variants(
            &mut self,
            variants: &[Variant],
            _region: &Region,
        ) -> Result<Vec<Box<dyn Label>>> {
            Ok(variants
                .iter()
                .map(|_| {
                    let confident = self.n_seen % 2 == 0;
                    self.n_seen += 1;
                    if confident {
                        self.n_confident += 1;
                    }
                    Box::new(TruthLabel { confident }) as Box<dyn Label>
                })
                .collect())
        }

        fn metrics(&self) -> Option<LabelingMetrics> {
            Some(LabelingMetrics {
                n_candidate_sites: self.n_seen,
                n_confident_labels: self.n_confident,
                n_unlabelable_sites: self.n_seen - self.n_confident,
            })
        }
    }

    struct RunFactory {
        contigs: Vec<Contig>,
        reads_per_region: usize,
        positions: Vec<Region>,
    }

    impl RunFactory {
        fn new(contigs: Vec<Contig>, reads_per_region: usize) -> Self {
            RunFactory {
                contigs,
                reads_per_region,
                positions: Vec::new(),
            }
        }
    }

    impl EngineFactory for RunFactory {
        fn reference(&self, _options: &Options) -> Result<Box<dyn ReferenceReader>> {
            Ok(Box::new(DenseReference {
                contigs: self.contigs.clone(),
            }))
        }

        fn read_sources(&self, _options: &Options) -> Result<Vec<InputReadSource>> {
            Ok(vec![InputReadSource::new(
                "reads.bam",
                Box::new(DenseSource {
                    contigs: self.contigs.clone(),
                    reads_per_region: self.reads_per_region,
                }),
            )])
        }

        fn variant_caller(&self, _options: &Options) -> Result<Box<dyn VariantCaller>> {
            Ok(Box::new(StartSiteCaller))
        }

        fn pileup_encoder(&self, _options: &Options) -> Result<Box<dyn PileupEncoder>> {
            Ok(Box::new(UnitEncoder))
        }

        fn labeler(&self, _options: &Options) -> Result<Box<dyn VariantLabeler>> {
            Ok(Box::new(AlternatingLabeler::default()))
        }

        fn truth_contigs(&self, _options: &Options) -> Result<Vec<Contig>> {
            Ok(self.contigs.clone())
        }

        fn candidate_positions(&self, _options: &Options) -> Result<Vec<Region>> {
            Ok(self.positions.clone())
        }
    }

    fn run_options(dir: &tempfile::TempDir) -> Options {
        Options {
            examples_spec: Some(dir.path().join("examples.bin").to_string_lossy().into_owned()),
            realigner_enabled: false,
            ..plan_options()
        }
    }

    #[test]
    fn calling_run_streams_every_output() -> anyhow::Result<()> {
        let _ = env_logger::builder().is_test(true).try_init();
        let dir = tempfile::tempdir()?;
        let options = Options {
            candidates_spec: Some(
                dir.path().join("candidates.bin").to_string_lossy().into_owned(),
            ),
            runtime_by_region_spec: Some(
                dir.path().join("runtime.tsv").to_string_lossy().into_owned(),
            ),
            run_info_spec: Some(dir.path().join("run_info.json").to_string_lossy().into_owned()),
            ..run_options(&dir)
        };
        let factory = RunFactory::new(vec![Contig::new("chr1", 2500)], 2);

        let stats = make_examples_runner(options, factory)?;
        assert_eq!(stats.n_regions, 3);
        assert_eq!(stats.n_candidates, 6);
        assert_eq!(stats.n_examples, 6);
        assert_eq!(stats.n_gvcf_records, 0);

        let examples: Vec<Example> =
            RecordReader::from_path(dir.path().join("examples.bin"))?.collect::<Result<_>>()?;
        assert_eq!(examples.len(), 6);
        assert!(examples.iter().all(|e| e.label.is_none()));
        assert!(examples.iter().all(|e| e.image.shape == [1, 2, 3]));
        assert_eq!(examples[0].variant.reference_name, "chr1");

        let candidates: Vec<Candidate> =
            RecordReader::from_path(dir.path().join("candidates.bin"))?.collect::<Result<_>>()?;
        assert_eq!(candidates.len(), 6);
        assert!(candidates.iter().all(|c| c.allele_frequency.is_none()));

        let runtime = fs::read_to_string(dir.path().join("runtime.tsv"))?;
        let lines: Vec<&str> = runtime.lines().collect();
        assert_eq!(lines.len(), 4, "a header line plus one row per region");
        assert!(lines[0].starts_with("region\tget reads\t"));
        assert!(lines[1].starts_with("chr1:1-1000\t"));
        assert!(lines[3].starts_with("chr1:2001-2500\t"));

        let run_info: RunInfo =
            serde_json::from_reader(fs::File::open(dir.path().join("run_info.json"))?)?;
        assert_eq!(run_info.resource_metrics.n_regions_processed, 3);
        assert_eq!(run_info.resource_metrics.n_examples, 6);
        assert!(run_info.labeling_metrics.is_none());
        Ok(())
    }

    #[test]
    fn training_run_labels_and_reports_metrics() -> anyhow::Result<()> {
        let _ = env_logger::builder().is_test(true).try_init();
        let dir = tempfile::tempdir()?;
        let options = Options {
            mode: Mode::Training,
            truth_variants_path: Some(PathBuf::from("truth.vcf.gz")),
            confident_regions_path: Some(PathBuf::from("conf.bed")),
            sample_name: None,
            run_info_spec: Some(dir.path().join("run_info.json").to_string_lossy().into_owned()),
            ..run_options(&dir)
        };
        let mut factory = RunFactory::new(vec![Contig::new("chr1", 2500)], 2);
        factory.positions = vec![Region::new("chr1", 0, 2500)];

        let stats = make_examples_runner(options, factory)?;
        assert_eq!(stats.n_candidates, 6);
        assert_eq!(stats.n_examples, 3, "only confident labels become examples");

        let examples: Vec<Example> =
            RecordReader::from_path(dir.path().join("examples.bin"))?.collect::<Result<_>>()?;
        assert_eq!(examples.len(), 3);
        assert!(examples.iter().all(|e| e.label == Some(1)));

        let run_info: RunInfo =
            serde_json::from_reader(fs::File::open(dir.path().join("run_info.json"))?)?;
        let metrics = run_info.labeling_metrics.unwrap();
        assert_eq!(metrics.n_candidate_sites, 6);
        assert_eq!(metrics.n_confident_labels, 3);
        assert_eq!(metrics.n_unlabelable_sites, 3);
        Ok(())
    }

    #[test]
    fn gvcf_run_covers_readless_regions() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let options = Options {
            gvcf_spec: Some(dir.path().join("coverage.bin").to_string_lossy().into_owned()),
            ..run_options(&dir)
        };
        let factory = RunFactory::new(vec![Contig::new("chr1", 2500)], 0);

        let stats = make_examples_runner(options, factory)?;
        assert_eq!(stats.n_regions, 3);
        assert_eq!(stats.n_candidates, 0);
        assert_eq!(stats.n_gvcf_records, 3);

        let records: Vec<GvcfRecord> =
            RecordReader::from_path(dir.path().join("coverage.bin"))?.collect::<Result<_>>()?;
        assert_eq!(records.len(), 3);
        assert_eq!(
            records[0],
            GvcfRecord {
                reference_name: "chr1".into(),
                start: 0,
                end: 1000,
                genotype_quality: 35,
                read_depth: 0,
            }
        );
        Ok(())
    }

    #[test]
    fn reruns_write_identical_bytes() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let run = |name: &str| -> Result<PathBuf> {
            let examples = dir.path().join(name);
            let options = Options {
                examples_spec: Some(examples.to_string_lossy().into_owned()),
                max_reads_per_partition: 4,
                realigner_enabled: false,
                ..plan_options()
            };
            let factory = RunFactory::new(vec![Contig::new("chr1", 2500)], 10);
            make_examples_runner(options, factory)?;
            Ok(examples)
        };

        let first = fs::read(run("first.bin")?)?;
        let second = fs::read(run("second.bin")?)?;
        assert!(!first.is_empty());
        assert_eq!(first, second, "same seed and inputs give the same bytes");
        Ok(())
    }

    #[test]
    fn sharded_runs_write_task_suffixed_files() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let options = Options {
            examples_spec: Some(dir.path().join("examples@2.bin").to_string_lossy().into_owned()),
            shard: Some(ShardParams {
                task_id: 1,
                num_shards: 2,
            }),
            realigner_enabled: false,
            ..plan_options()
        };
        let factory = RunFactory::new(vec![Contig::new("chr1", 2500)], 1);

        let stats = make_examples_runner(options, factory)?;
        assert_eq!(stats.n_regions, 1, "task 1 of 2 owns the middle partition");
        assert!(dir.path().join("examples-00001-of-00002.bin").exists());
        Ok(())
    }

    #[test]
    fn run_info_serializes_and_restores() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run_info.json");
        let stats = RunStats {
            n_regions: 3,
            n_candidates: 17,
            n_examples: 21,
            n_gvcf_records: 0,
            wall_time_seconds: 1.5,
        };
        let labeling = Some(LabelingMetrics {
            n_candidate_sites: 17,
            n_confident_labels: 15,
            n_unlabelable_sites: 2,
        });
        write_run_info(&path, &plan_options(), &stats, labeling.clone()).unwrap();

        let restored: RunInfo =
            serde_json::from_reader(std::fs::File::open(&path).unwrap()).unwrap();
        assert_eq!(restored.resource_metrics.n_candidates, 17);
        assert_eq!(restored.resource_metrics.n_examples, 21);
        assert_eq!(restored.resource_metrics.wall_time_seconds, 1.5);
        assert_eq!(restored.labeling_metrics, labeling);
        assert_eq!(restored.options.partition_size, 1000);
    }
}
