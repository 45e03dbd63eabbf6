use std::path::PathBuf;

pub mod audio;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod library;
pub mod signal;
pub mod tagging;
pub mod transcode;
pub mod utils;
pub mod work;

#[derive(Debug, thiserror::Error)]
pub enum DvtagError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cannot read library root {}: {source}", path.display())]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Catalog error: {0}")]
    Resolve(#[from] catalog::ResolveError),
    #[error("Tag write error: {0}")]
    Write(#[from] tagging::WriteError),
    #[error("Transcode error: {0}")]
    Transcode(#[from] transcode::TranscodeError),
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, DvtagError>;

// Re-exports for convenience
pub use audio::format::AudioFormat;
pub use catalog::resolver::CatalogResolver;
pub use catalog::{CatalogClient, CatalogResponse, MetadataRecord, ResolveError};
pub use config::Config;
pub use library::task::FolderTask;
pub use library::walker::{FolderOutcome, LibraryWalker};
pub use tagging::fields::{ExtraField, TagFieldSet};
pub use tagging::mapper::{map_fields, TrackContext};
pub use tagging::writer::{FormatWriter, FormatWriters, WriteError};
pub use utils::parallel::CancellationFlag;
pub use utils::reporting::RunSummary;
pub use work::number::WorkNumber;
