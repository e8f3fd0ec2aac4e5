use semver::Version;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;
use uuid::Uuid;

/// Sentinel value authors write in place of a font or group id.
/// The formatter replaces it with a freshly generated UUID in fix mode.
pub const ID_PLACEHOLDER: &str = "<UUID>";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse catalog: {0}")]
    ParseJson(#[from] serde_json::Error),
    #[error("installation carries both _localPath '{local}' and _url '{url}'")]
    ConflictingReference { local: String, url: Url },
}

/// A source id: either an assigned UUID or the `<UUID>` placeholder sentinel.
///
/// Serialized as a plain string so catalogs stay hand-editable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceId {
    Id(Uuid),
    Placeholder,
}

impl SourceId {
    pub fn as_uuid(self) -> Option<Uuid> {
        match self {
            SourceId::Id(id) => Some(id),
            SourceId::Placeholder => None,
        }
    }
}

impl Serialize for SourceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SourceId::Id(id) => id.serialize(serializer),
            SourceId::Placeholder => serializer.serialize_str(ID_PLACEHOLDER),
        }
    }
}

impl<'de> Deserialize<'de> for SourceId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw == ID_PLACEHOLDER {
            return Ok(SourceId::Placeholder);
        }
        Uuid::parse_str(&raw)
            .map(SourceId::Id)
            .map_err(|e| D::Error::custom(format!("invalid id '{raw}': {e}")))
    }
}

/// Font category tags.
///
/// Variants are declared in the lexicographic order of their serialized names,
/// so the derived `Ord` matches the canonical output ordering.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum FontCategory {
    Cursive,
    Display,
    Monospace,
    SansSerif,
    Serif,
    Symbol,
}

/// The source catalog as authored: groups of font names plus font definitions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SourceCatalog {
    pub groups: Vec<SourceGroup>,
    pub fonts: Vec<SourceFont>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SourceGroup {
    pub id: SourceId,
    pub name: String,
    /// Font names (not ids) — resolved to font UUIDs at compile time.
    pub fonts: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SourceFont {
    pub id: SourceId,
    pub name: String,
    pub short_name: String,
    pub publisher: String,
    pub categories: Vec<FontCategory>,
    pub installations: Vec<SourceInstallation>,
}

/// One method of installing a font, tagged by `type`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SourceInstallation {
    Cabextract(CabextractSource),
}

impl SourceInstallation {
    /// The serialized `type` tag, used as the primary installation sort key.
    pub fn install_type(&self) -> &'static str {
        match self {
            SourceInstallation::Cabextract(_) => "cabextract",
        }
    }

    /// The binary dependency this installation needs, if any.
    ///
    /// Exactly one of `_localPath` / `_url` must be present pre-compile.
    /// Neither being present means the installation has no binary dependency
    /// and is passed through unchanged.
    pub fn dependency(&self) -> Result<Option<DependencyRef<'_>>, CatalogError> {
        let SourceInstallation::Cabextract(data) = self;
        match (&data.local_path, &data.url) {
            (Some(local), Some(url)) => Err(CatalogError::ConflictingReference {
                local: local.display().to_string(),
                url: url.clone(),
            }),
            (Some(local), None) => Ok(Some(DependencyRef::Local(local))),
            (None, Some(url)) => Ok(Some(DependencyRef::Remote(url))),
            (None, None) => Ok(None),
        }
    }
}

/// Cabextract installation as authored, carrying a raw dependency reference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CabextractSource {
    /// Path relative to the catalog's directory. Mutually exclusive with `_url`.
    #[serde(rename = "_localPath", default, skip_serializing_if = "Option::is_none")]
    pub local_path: Option<PathBuf>,
    /// Absolute remote URL. Mutually exclusive with `_localPath`.
    #[serde(rename = "_url", default, skip_serializing_if = "Option::is_none")]
    pub url: Option<Url>,
    /// Filenames to extract from the cabinet.
    pub files: Vec<String>,
}

/// A raw dependency reference taken from a source installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyRef<'a> {
    Local(&'a Path),
    Remote(&'a Url),
}

/// The compiled output document: `{version, downloads, groups, fonts}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CompiledCatalog {
    pub version: Version,
    pub downloads: Vec<DownloadRecord>,
    pub groups: Vec<CompiledGroup>,
    pub fonts: Vec<CompiledFont>,
}

/// A content-addressed binary dependency in the compiled document.
///
/// The id is a per-build random UUID, not content-derived; dedup identity is
/// the canonical key, which is internal to the registry and never serialized.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRecord {
    pub id: Uuid,
    #[serde(rename = "downloadURL")]
    pub download_url: Url,
    pub file_size: u64,
    /// Lowercase hex SHA-256 of the exact bytes served at `downloadURL`.
    pub hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CompiledGroup {
    pub id: Uuid,
    pub name: String,
    pub fonts: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CompiledFont {
    pub id: Uuid,
    pub name: String,
    pub short_name: String,
    pub publisher: String,
    pub categories: Vec<FontCategory>,
    pub installations: Vec<CompiledInstallation>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CompiledInstallation {
    Cabextract(CabextractCompiled),
}

impl CompiledInstallation {
    pub fn install_type(&self) -> &'static str {
        match self {
            CompiledInstallation::Cabextract(_) => "cabextract",
        }
    }

    pub fn download_id(&self) -> Option<Uuid> {
        match self {
            CompiledInstallation::Cabextract(data) => data.download,
        }
    }
}

/// Cabextract installation after compile: raw reference replaced by `download`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CabextractCompiled {
    /// Id of the download record this installation depends on. Absent only
    /// for installations that carried no dependency reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download: Option<Uuid>,
    pub files: Vec<String>,
}

pub fn parse_catalog_str(input: &str) -> Result<SourceCatalog, CatalogError> {
    Ok(serde_json::from_str(input)?)
}

pub fn parse_catalog_file(path: impl AsRef<Path>) -> Result<SourceCatalog, CatalogError> {
    let content = fs::read_to_string(path)?;
    parse_catalog_str(&content)
}
