//! Run configuration.
//!
//! An [`Options`] value is built once, validated once, and never mutated
//! afterward; every component reads from the same snapshot. Mode, caller,
//! labeler and pileup variants are closed enums selected here and dispatched
//! exactly once at processor initialization.

use crate::core::errors::{Error, Result};
use crate::core::sharded::resolve_filespec;
use crate::variant::VariantTypeSelector;
use log::info;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Calling,
    Training,
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "calling" => Ok(Mode::Calling),
            "training" => Ok(Mode::Training),
            other => Err(Error::config(format!(
                "unknown mode {:?}; expected calling or training",
                other
            ))),
        }
    }
}

/// Which candidate-proposing engine the factory should construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallerKind {
    /// Allele counting plus sensitive thresholding.
    VerySensitiveCaller,
    /// Import candidate sites from a proposed-variants VCF.
    VcfCandidateImporter,
}

impl FromStr for CallerKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "very_sensitive_caller" => Ok(CallerKind::VerySensitiveCaller),
            "vcf_candidate_importer" => Ok(CallerKind::VcfCandidateImporter),
            other => Err(Error::config(format!(
                "unknown variant caller {:?}; expected very_sensitive_caller or \
                 vcf_candidate_importer",
                other
            ))),
        }
    }
}

/// Which truth-labeling strategy the factory should construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelerKind {
    Positional,
    Haplotype,
    CustomizedClasses,
}

impl FromStr for LabelerKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "positional_labeler" => Ok(LabelerKind::Positional),
            "haplotype_labeler" => Ok(LabelerKind::Haplotype),
            "customized_classes_labeler" => Ok(LabelerKind::CustomizedClasses),
            other => Err(Error::config(format!(
                "unknown labeler {:?}; expected positional_labeler, haplotype_labeler \
                 or customized_classes_labeler",
                other
            ))),
        }
    }
}

/// How alternate-haplotype-aligned reads contribute to pileup images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AltAlignedPileup {
    None,
    BaseChannels,
    DiffChannels,
    Rows,
}

impl AltAlignedPileup {
    pub fn enabled(&self) -> bool {
        !matches!(self, AltAlignedPileup::None)
    }
}

impl FromStr for AltAlignedPileup {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(AltAlignedPileup::None),
            "base_channels" => Ok(AltAlignedPileup::BaseChannels),
            "diff_channels" => Ok(AltAlignedPileup::DiffChannels),
            "rows" => Ok(AltAlignedPileup::Rows),
            other => Err(Error::config(format!(
                "unknown alt-aligned pileup mode {:?}; expected none, base_channels, \
                 diff_channels or rows",
                other
            ))),
        }
    }
}

/// This process's slice of a multi-process run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardParams {
    pub task_id: u32,
    pub num_shards: u32,
}

/// Immutable configuration snapshot for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Options {
    pub mode: Mode,

    // Inputs.
    pub reference_path: PathBuf,
    pub read_paths: Vec<PathBuf>,
    pub truth_variants_path: Option<PathBuf>,
    pub confident_regions_path: Option<PathBuf>,
    pub proposed_variants_path: Option<PathBuf>,
    /// Population catalogs for allele-frequency annotation. The engine
    /// factory owns how these map to per-contig cohort readers.
    pub population_vcf_paths: Vec<PathBuf>,

    // Output filespecs (`name@N[.ext]` for sharded runs).
    pub examples_spec: Option<String>,
    pub candidates_spec: Option<String>,
    pub gvcf_spec: Option<String>,
    pub runtime_by_region_spec: Option<String>,
    pub run_info_spec: Option<String>,

    pub sample_name: Option<String>,

    // Region selection.
    pub calling_regions: Vec<String>,
    pub exclude_calling_regions: Vec<String>,
    pub exclude_contigs: Vec<String>,
    pub min_shared_contigs_fraction: f64,

    // Partitioning.
    pub partition_size: u64,
    pub shard: Option<ShardParams>,

    // Per-region processing.
    /// Reservoir-sampling cap per region; 0 disables down-sampling.
    pub max_reads_per_partition: usize,
    pub realigner_enabled: bool,
    /// Reads with sequences longer than this skip realignment unchanged.
    pub max_read_length_to_realign: usize,
    pub variant_caller: CallerKind,
    /// Candidate classes to keep; empty keeps everything.
    pub variant_types: Vec<VariantTypeSelector>,
    pub populate_allele_frequency: bool,
    pub labeler: LabelerKind,
    pub customized_classes_list: Vec<String>,
    pub customized_classes_info_field: Option<String>,
    pub alt_aligned_pileup: AltAlignedPileup,
    pub pileup_image_width: u32,

    // Run behavior.
    pub random_seed: u64,
    pub logging_every_n_candidates: u64,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            mode: Mode::Calling,
            reference_path: PathBuf::new(),
            read_paths: Vec::new(),
            truth_variants_path: None,
            confident_regions_path: None,
            proposed_variants_path: None,
            population_vcf_paths: Vec::new(),
            examples_spec: None,
            candidates_spec: None,
            gvcf_spec: None,
            runtime_by_region_spec: None,
            run_info_spec: None,
            sample_name: None,
            calling_regions: Vec::new(),
            exclude_calling_regions: Vec::new(),
            exclude_contigs: vec!["chrM".to_string(), "MT".to_string()],
            min_shared_contigs_fraction: 0.9,
            partition_size: 1000,
            shard: None,
            max_reads_per_partition: 1500,
            realigner_enabled: true,
            max_read_length_to_realign: 500,
            variant_caller: CallerKind::VerySensitiveCaller,
            variant_types: Vec::new(),
            populate_allele_frequency: false,
            labeler: LabelerKind::Haplotype,
            customized_classes_list: Vec::new(),
            customized_classes_info_field: None,
            alt_aligned_pileup: AltAlignedPileup::None,
            pileup_image_width: 221,
            random_seed: 609_314_161,
            logging_every_n_candidates: 100,
        }
    }
}

/// Concrete output destinations after filespec resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOutputs {
    pub examples: PathBuf,
    pub candidates: Option<PathBuf>,
    pub gvcf: Option<PathBuf>,
    pub runtime_by_region: Option<PathBuf>,
    pub run_info: Option<PathBuf>,
}

impl Options {
    pub fn training(&self) -> bool {
        self.mode == Mode::Training
    }

    pub fn gvcf_enabled(&self) -> bool {
        self.gvcf_spec.is_some()
    }

    pub fn shard_tuple(&self) -> Option<(u32, u32)> {
        self.shard.map(|s| (s.task_id, s.num_shards))
    }

    /// `Task i/n: ` prefix for log lines in sharded runs, empty otherwise.
    pub fn task_prefix(&self) -> String {
        match self.shard {
            Some(s) => format!("Task {}/{}: ", s.task_id, s.num_shards),
            None => String::new(),
        }
    }

    /// The VCF whose positions drive the region-by-variant filter: truth in
    /// training mode, proposed variants otherwise.
    pub fn candidates_vcf_path(&self) -> Option<&Path> {
        if self.training() {
            self.truth_variants_path.as_deref()
        } else {
            self.proposed_variants_path.as_deref()
        }
    }

    /// The labeler actually constructed in training mode. The VCF candidate
    /// importer proposes exactly the truth sites, so positional labeling is
    /// forced for it.
    pub fn effective_labeler(&self) -> LabelerKind {
        if self.training()
            && self.variant_caller == CallerKind::VcfCandidateImporter
            && self.labeler != LabelerKind::Positional
        {
            info!(
                "{}vcf_candidate_importer training uses positional labeling; \
                 overriding the configured labeler",
                self.task_prefix()
            );
            return LabelerKind::Positional;
        }
        self.labeler
    }

    /// Resolve every output filespec against the shard parameters.
    pub fn resolve_outputs(&self) -> Result<ResolvedOutputs> {
        let shard = self.shard_tuple();
        let resolve = |spec: &Option<String>| -> Result<Option<PathBuf>> {
            match spec {
                Some(spec) => Ok(Some(PathBuf::from(resolve_filespec(spec, shard)?))),
                None => Ok(None),
            }
        };
        let examples = resolve(&self.examples_spec)?
            .ok_or_else(|| Error::config("an examples output spec is required"))?;
        Ok(ResolvedOutputs {
            examples,
            candidates: resolve(&self.candidates_spec)?,
            gvcf: resolve(&self.gvcf_spec)?,
            runtime_by_region: resolve(&self.runtime_by_region_spec)?,
            run_info: resolve(&self.run_info_spec)?,
        })
    }

    /// Fail fast on every configuration rule; nothing downstream re-checks.
    pub fn validate(&self) -> Result<()> {
        if self.reference_path.as_os_str().is_empty() {
            return Err(Error::config("a reference genome is required"));
        }
        if self.read_paths.is_empty() {
            return Err(Error::config("at least one aligned-reads input is required"));
        }
        if let Some(shard) = self.shard {
            if shard.num_shards == 0 {
                return Err(Error::config("num_shards must be >= 1"));
            }
            if shard.task_id >= shard.num_shards {
                return Err(Error::config(format!(
                    "task_id={} should be >= 0 and < num_shards={}",
                    shard.task_id, shard.num_shards
                )));
            }
        }
        // Surfaces both the missing-examples error and any spec/shard
        // disagreement before any file is touched.
        self.resolve_outputs()?;

        match self.mode {
            Mode::Training => {
                if self.truth_variants_path.is_none() {
                    return Err(Error::config("truth variants are required in training mode"));
                }
                if self.confident_regions_path.is_none() {
                    if self.variant_caller == CallerKind::VcfCandidateImporter {
                        info!(
                            "{}confident regions are optional with the VCF candidate importer",
                            self.task_prefix()
                        );
                    } else {
                        return Err(Error::config(
                            "confident regions are required in training mode",
                        ));
                    }
                }
                if self.gvcf_enabled() {
                    return Err(Error::config("gVCF output is not allowed in training mode"));
                }
                if self.proposed_variants_path.is_some() {
                    return Err(Error::config(
                        "proposed variants are not used in training mode; the truth VCF \
                         supplies candidate positions",
                    ));
                }
                if self.effective_labeler() == LabelerKind::CustomizedClasses
                    && (self.customized_classes_list.is_empty()
                        || self.customized_classes_info_field.is_none())
                {
                    return Err(Error::config(
                        "the customized-classes labeler needs a class list and a truth \
                         INFO field name",
                    ));
                }
            }
            Mode::Calling => {
                if self.truth_variants_path.is_some() || self.confident_regions_path.is_some() {
                    return Err(Error::config(
                        "truth variants and confident regions must not be set in calling mode",
                    ));
                }
                if self.variant_caller == CallerKind::VcfCandidateImporter
                    && self.proposed_variants_path.is_none()
                {
                    return Err(Error::config(
                        "the VCF candidate importer requires proposed variants in calling mode",
                    ));
                }
                if self.variant_caller != CallerKind::VcfCandidateImporter
                    && self.proposed_variants_path.is_some()
                {
                    return Err(Error::config(
                        "proposed variants are only used by the vcf_candidate_importer caller",
                    ));
                }
                if self.sample_name.as_deref().map_or(true, str::is_empty) {
                    return Err(Error::config("a sample name is required in calling mode"));
                }
            }
        }

        if self.partition_size == 0 {
            return Err(Error::config("partition size must be >= 1"));
        }
        if self.logging_every_n_candidates == 0 {
            return Err(Error::config("progress cadence must be >= 1 candidates"));
        }
        if !(0.0..=1.0).contains(&self.min_shared_contigs_fraction) {
            return Err(Error::config(format!(
                "min shared contigs fraction must be in [0, 1], got {}",
                self.min_shared_contigs_fraction
            )));
        }
        if self.pileup_image_width < 3 || self.pileup_image_width % 2 == 0 {
            return Err(Error::config(format!(
                "pileup image width must be odd and >= 3, got {}",
                self.pileup_image_width
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_calling() -> Options {
        Options {
            reference_path: PathBuf::from("ref.fa"),
            read_paths: vec![PathBuf::from("reads.bam")],
            examples_spec: Some("examples.bin".to_string()),
            sample_name: Some("sample1".to_string()),
            ..Options::default()
        }
    }

    fn base_training() -> Options {
        Options {
            mode: Mode::Training,
            truth_variants_path: Some(PathBuf::from("truth.vcf.gz")),
            confident_regions_path: Some(PathBuf::from("conf.bed")),
            sample_name: None,
            ..base_calling()
        }
    }

    #[test]
    fn enum_names_parse() {
        assert_eq!("training".parse::<Mode>().unwrap(), Mode::Training);
        assert_eq!(
            "vcf_candidate_importer".parse::<CallerKind>().unwrap(),
            CallerKind::VcfCandidateImporter
        );
        assert_eq!(
            "haplotype_labeler".parse::<LabelerKind>().unwrap(),
            LabelerKind::Haplotype
        );
        assert_eq!(
            "diff_channels".parse::<AltAlignedPileup>().unwrap(),
            AltAlignedPileup::DiffChannels
        );
        assert!("sensitive".parse::<CallerKind>().is_err());
        assert!("label".parse::<LabelerKind>().is_err());
        assert!("inference".parse::<Mode>().is_err());
    }

    #[test]
    fn valid_configurations_pass() {
        base_calling().validate().unwrap();
        base_training().validate().unwrap();
    }

    #[test]
    fn training_requires_truth() {
        let options = Options {
            truth_variants_path: None,
            ..base_training()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn training_rejects_gvcf_output() {
        let options = Options {
            gvcf_spec: Some("out.gvcf.bin".to_string()),
            ..base_training()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn training_confident_regions_optional_only_for_importer() {
        let options = Options {
            confident_regions_path: None,
            ..base_training()
        };
        assert!(options.validate().is_err());

        let options = Options {
            confident_regions_path: None,
            variant_caller: CallerKind::VcfCandidateImporter,
            ..base_training()
        };
        options.validate().unwrap();
    }

    #[test]
    fn calling_rejects_truth_inputs() {
        let options = Options {
            truth_variants_path: Some(PathBuf::from("truth.vcf.gz")),
            ..base_calling()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn calling_importer_requires_proposed_variants() {
        let options = Options {
            variant_caller: CallerKind::VcfCandidateImporter,
            ..base_calling()
        };
        assert!(options.validate().is_err());

        let options = Options {
            variant_caller: CallerKind::VcfCandidateImporter,
            proposed_variants_path: Some(PathBuf::from("proposed.vcf.gz")),
            ..base_calling()
        };
        options.validate().unwrap();
    }

    #[test]
    fn proposed_variants_need_the_importer() {
        let options = Options {
            proposed_variants_path: Some(PathBuf::from("proposed.vcf.gz")),
            ..base_calling()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn calling_requires_sample_name() {
        let options = Options {
            sample_name: None,
            ..base_calling()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn shard_parameters_are_checked() {
        let options = Options {
            shard: Some(ShardParams {
                task_id: 2,
                num_shards: 2,
            }),
            ..base_calling()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn sharded_specs_must_match_shard_count() {
        let options = Options {
            examples_spec: Some("examples@4.bin".to_string()),
            shard: Some(ShardParams {
                task_id: 1,
                num_shards: 4,
            }),
            ..base_calling()
        };
        options.validate().unwrap();
        let resolved = options.resolve_outputs().unwrap();
        assert_eq!(resolved.examples, PathBuf::from("examples-00001-of-00004.bin"));

        let options = Options {
            examples_spec: Some("examples@8.bin".to_string()),
            ..options
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn pileup_width_must_be_odd() {
        let options = Options {
            pileup_image_width: 220,
            ..base_calling()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn importer_training_forces_positional_labeling() {
        let options = Options {
            variant_caller: CallerKind::VcfCandidateImporter,
            labeler: LabelerKind::Haplotype,
            ..base_training()
        };
        assert_eq!(options.effective_labeler(), LabelerKind::Positional);

        let options = base_training();
        assert_eq!(options.effective_labeler(), LabelerKind::Haplotype);
    }

    #[test]
    fn candidates_vcf_follows_mode() {
        let training = base_training();
        assert_eq!(
            training.candidates_vcf_path(),
            Some(Path::new("truth.vcf.gz"))
        );

        let calling = Options {
            proposed_variants_path: Some(PathBuf::from("proposed.vcf.gz")),
            ..base_calling()
        };
        assert_eq!(
            calling.candidates_vcf_path(),
            Some(Path::new("proposed.vcf.gz"))
        );
        assert_eq!(base_calling().candidates_vcf_path(), None);
    }
}
