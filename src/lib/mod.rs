//! CANDEX: candidate discovery and example extraction for variant calling
//!
//! Candex is a region-sharded pipeline that turns aligned reads into
//! candidate variants and pileup-image examples. The library provides
//! functionality for:
//! 1. Reconciling contigs across reference, read, and truth inputs
//! 2. Partitioning the callable genome into shard-assigned work regions
//! 3. Per-region candidate discovery with downsampling and realignment
//! 4. Population allele-frequency annotation and truth labeling
//! 5. Length-prefixed record streams and runtime reporting
//!
//! The compute engines (callers, realigners, pileup encoders, labelers) are
//! trait objects supplied through an [`engines::EngineFactory`], so the
//! pipeline itself stays free of model- and format-specific code.
//!
//! # Modules
//!
//! The main modules are:
//! - [`contigs`]: Contig reconciliation across input headers
//! - [`ranges`]: Genomic regions, range sets, and BED/literal parsing
//! - [`partition`]: Calling-region construction, partitioning, and sharding
//! - [`engines`]: Pluggable engine traits and their data contracts
//! - [`processor`]: The per-region candidate and example processor
//! - [`allele_frequency`]: Population haplotype matching for candidate alleles
//! - [`outputs`]: Record writers, readers, and the runtime report
//! - [`runner`]: The end-to-end region loop
//! - [`options`]: Run configuration and validation
//! - [`hts`]: File-backed sources over BAM/CRAM, FASTA, and VCF

pub mod allele_frequency;
pub mod contigs;
pub mod core;
pub mod engines;
pub mod hts;
pub mod options;
pub mod outputs;
pub mod partition;
pub mod processor;
pub mod ranges;
pub mod reads;
pub mod runner;
pub mod sampling;
pub mod variant;

pub use crate::core::errors::{Error, Result};
pub use crate::options::{Mode, Options};
pub use crate::runner::{make_examples_runner, RunStats};
