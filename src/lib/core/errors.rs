//! Error types for the candex library.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("record encoding error: {0}")]
    Encoding(#[from] bincode::Error),

    #[error("htslib error: {0}")]
    Htslib(#[from] rust_htslib::errors::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(
        "reference contigs span {ref_bases} bp but only {common_bases} bp \
         ({coverage_percent:.2}%) are shared by all inputs; check that every \
         input was produced against the same reference build. Contig status: \
         {contig_status}"
    )]
    ContigMismatch {
        ref_bases: u64,
        common_bases: u64,
        coverage_percent: f64,
        contig_status: String,
    },

    #[error(
        "the set of regions to call is empty; check that any include/exclude \
         region specs use the same contig naming as the reference (e.g. \
         \"chr20\" vs \"20\")"
    )]
    EmptyCallingRegions,

    #[error("failed to get reads from {input}: {message}")]
    ReadSource { input: String, message: String },

    #[error(
        "variant at {location} has reference bases {variant_bases:?} but the \
         reference genome contains {reference_bases:?}; the variant likely \
         comes from a different reference build or coordinate system"
    )]
    ReferenceConsistency {
        location: String,
        variant_bases: String,
        reference_bases: String,
    },

    #[error("variant at {location} starts before its haplotype window")]
    HaplotypeWindow { location: String },

    #[error("region processor is already initialized")]
    AlreadyInitialized,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Shorthand for a `Config` error from anything displayable.
    pub fn config<M: std::fmt::Display>(message: M) -> Self {
        Error::Config(message.to_string())
    }
}
