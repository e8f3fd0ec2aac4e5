//! Compile pipeline for Fontcask: download registry, manifest compiler, and
//! output writer.
//!
//! This crate turns a parsed source catalog into the versioned, deduplicated
//! output document. The `Compiler` walks every installation, resolves each
//! binary dependency through the `DownloadRegistry` (fetch + hash on first
//! sight of a canonical key, cache hit afterwards), and reassembles the
//! catalog in canonical order. `write_output` then populates the output
//! directory in one all-or-nothing step.

pub mod compiler;
pub mod output;
pub mod registry;

pub use compiler::{CompileContext, CompileOutput, Compiler};
pub use output::{write_output, MANIFEST_FILE};
pub use registry::{DownloadRegistry, IdSource, RandomIds, ResolvedAsset, SequentialIds};

use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("catalog error: {0}")]
    Catalog(#[from] fontcask_schema::CatalogError),
    #[error("fetch error: {0}")]
    Fetch(#[from] fontcask_fetch::FetchError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("catalog error: {0} has the <UUID> placeholder; run `fontcask fmt` to assign ids")]
    PlaceholderId(String),
    #[error("catalog error: group '{group}' lists font '{font}' which does not exist")]
    UnknownGroupFont { group: String, font: String },
    #[error("base URL '{0}' cannot carry path segments")]
    InvalidBaseUrl(Url),
}
