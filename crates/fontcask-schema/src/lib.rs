//! Catalog model, parsing, canonical dependency keys, and formatting for Fontcask.
//!
//! This crate defines the schema layer: JSON catalog parsing (`SourceCatalog`),
//! the compiled output document (`CompiledCatalog`), canonical identity keys
//! used for download deduplication (`CanonicalKey`), and the source catalog
//! formatter/linter (`format_catalog`).

pub mod catalog;
pub mod format;
pub mod key;

pub use catalog::{
    parse_catalog_file, parse_catalog_str, CabextractCompiled, CabextractSource, CatalogError,
    CompiledCatalog, CompiledFont, CompiledGroup, CompiledInstallation, DependencyRef,
    DownloadRecord, FontCategory, SourceCatalog, SourceFont, SourceGroup, SourceId,
    SourceInstallation, ID_PLACEHOLDER,
};
pub use format::{format_catalog, FormatIssue, FormatMode};
pub use key::CanonicalKey;
