use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum SyncError {
    #[error("invalid release file name: {0}")]
    InvalidReleaseName(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("WikiPathways request failed: {0}")]
    ListingHttp(String),

    #[error("WikiPathways returned status {status}: {message}")]
    ListingStatus { status: u16, message: String },

    #[error("failed to parse release listing: {0}")]
    ListingParse(String),

    #[error("no release in the listing matches {0}")]
    NoMatchingRelease(String),

    #[error("no fetched release to clean; run fetch first or pass --input")]
    NoFetchedRelease,

    #[error("NCBI gene_info request failed: {0}")]
    GeneInfoHttp(String),

    #[error("NCBI gene_info returned status {status}: {message}")]
    GeneInfoStatus { status: u16, message: String },

    #[error("failed to parse gene_info table: {0}")]
    LookupParse(String),

    #[error("malformed GMT line: {0}")]
    MalformedGmtLine(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
