use crate::registry::{DownloadRegistry, IdSource, ResolvedAsset};
use crate::CompileError;
use fontcask_fetch::{sha256_file_hex, stage_copy, HttpFetcher};
use fontcask_schema::{
    CabextractCompiled, CanonicalKey, CompiledCatalog, CompiledFont, CompiledGroup,
    CompiledInstallation, DependencyRef, SourceCatalog, SourceInstallation,
};
use semver::Version;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use url::Url;
use uuid::Uuid;

/// Path segment under the base URL where locally-sourced assets are served.
const DOWNLOADS_URL_PATH: &str = "downloads";

/// Inputs the compiler needs besides the catalog itself.
#[derive(Debug, Clone)]
pub struct CompileContext {
    /// Directory `_localPath` references are relative to (the catalog's
    /// location).
    pub base_path: PathBuf,
    /// URL prefix for locally-sourced assets; remote assets keep their
    /// original URL verbatim.
    pub base_url: Url,
}

/// One compile invocation: walks the source catalog, resolves every
/// dependency through the download registry, and reassembles the output in
/// canonical order.
///
/// Installations are processed one at a time in source order; a failure at
/// any installation aborts the whole compile and the staged assets are
/// discarded with the compiler.
pub struct Compiler<'a> {
    ctx: CompileContext,
    fetcher: HttpFetcher,
    registry: DownloadRegistry<'a>,
    staging: TempDir,
}

/// A successfully compiled manifest plus its staged local assets.
///
/// The staging directory is scoped to this value; hand it to
/// [`write_output`](crate::write_output) before dropping it.
#[derive(Debug)]
pub struct CompileOutput {
    pub manifest: CompiledCatalog,
    staging: TempDir,
}

impl CompileOutput {
    /// Directory holding staged local assets, named `<downloadId><extension>`.
    pub fn staged_dir(&self) -> &Path {
        self.staging.path()
    }
}

impl<'a> Compiler<'a> {
    pub fn new(ctx: CompileContext, ids: &'a mut dyn IdSource) -> Result<Self, CompileError> {
        Ok(Self {
            ctx,
            fetcher: HttpFetcher::new(),
            registry: DownloadRegistry::new(ids),
            staging: TempDir::new()?,
        })
    }

    pub fn compile(
        mut self,
        source: &SourceCatalog,
        version: Version,
    ) -> Result<CompileOutput, CompileError> {
        tracing::info!(
            "compiling catalog: {} fonts, {} groups, version {version}",
            source.fonts.len(),
            source.groups.len()
        );

        let groups = compile_groups(source)?;

        let mut fonts = Vec::with_capacity(source.fonts.len());
        for font in &source.fonts {
            let id = font
                .id
                .as_uuid()
                .ok_or_else(|| CompileError::PlaceholderId(format!("font '{}'", font.name)))?;

            let mut installations = Vec::with_capacity(font.installations.len());
            for installation in &font.installations {
                installations.push(self.compile_installation(installation)?);
            }
            installations.sort_by_key(|i| {
                (
                    i.install_type(),
                    i.download_id().map(|u| u.to_string()).unwrap_or_default(),
                )
            });

            let mut categories = font.categories.clone();
            categories.sort();
            categories.dedup();

            fonts.push(CompiledFont {
                id,
                name: font.name.clone(),
                short_name: font.short_name.clone(),
                publisher: font.publisher.clone(),
                categories,
                installations,
            });
        }
        fonts.sort_by(|a, b| a.name.cmp(&b.name));

        let downloads = self.registry.into_records();
        tracing::info!("compiled {} unique downloads", downloads.len());

        Ok(CompileOutput {
            manifest: CompiledCatalog {
                version,
                downloads,
                groups,
                fonts,
            },
            staging: self.staging,
        })
    }

    fn compile_installation(
        &mut self,
        installation: &SourceInstallation,
    ) -> Result<CompiledInstallation, CompileError> {
        let ctx = &self.ctx;
        let fetcher = &self.fetcher;
        let staging = self.staging.path();
        let registry = &mut self.registry;

        let download = match installation.dependency()? {
            None => None,
            Some(dep @ DependencyRef::Local(path)) => {
                let key = CanonicalKey::from_dependency(dep);
                let source_file = ctx.base_path.join(path);
                let extension = path
                    .extension()
                    .map(|e| format!(".{}", e.to_string_lossy()))
                    .unwrap_or_default();
                let id = registry.resolve(key, |id| {
                    let staged = staging.join(format!("{id}{extension}"));
                    let file_size = stage_copy(&source_file, &staged)?;
                    let hash = sha256_file_hex(&staged)?;
                    let download_url = asset_url(&ctx.base_url, id, &extension)?;
                    Ok(ResolvedAsset {
                        download_url,
                        file_size,
                        hash,
                    })
                })?;
                Some(id)
            }
            Some(dep @ DependencyRef::Remote(url)) => {
                let key = CanonicalKey::from_dependency(dep);
                let id = registry.resolve(key, |_| {
                    // Fetched into a scoped temp dir, removed when `fetched`
                    // drops on both success and failure.
                    let fetched = fetcher.fetch(url)?;
                    let hash = sha256_file_hex(fetched.path())?;
                    Ok(ResolvedAsset {
                        download_url: url.clone(),
                        file_size: fetched.size(),
                        hash,
                    })
                })?;
                Some(id)
            }
        };

        let SourceInstallation::Cabextract(data) = installation;
        let mut files = data.files.clone();
        files.sort();

        Ok(CompiledInstallation::Cabextract(CabextractCompiled {
            download,
            files,
        }))
    }
}

fn compile_groups(source: &SourceCatalog) -> Result<Vec<CompiledGroup>, CompileError> {
    let mut groups = Vec::with_capacity(source.groups.len());
    for group in &source.groups {
        let id = group
            .id
            .as_uuid()
            .ok_or_else(|| CompileError::PlaceholderId(format!("group '{}'", group.name)))?;

        let mut fonts = Vec::with_capacity(group.fonts.len());
        for name in &group.fonts {
            let font = source
                .fonts
                .iter()
                .find(|f| &f.name == name)
                .ok_or_else(|| CompileError::UnknownGroupFont {
                    group: group.name.clone(),
                    font: name.clone(),
                })?;
            fonts.push(font.id.as_uuid().ok_or_else(|| {
                CompileError::PlaceholderId(format!("font '{}' (via group '{}')", name, group.name))
            })?);
        }

        groups.push(CompiledGroup {
            id,
            name: group.name.clone(),
            fonts,
        });
    }
    Ok(groups)
}

/// Distribution URL for a locally-sourced asset:
/// `<base>/downloads/<id><extension>`, with the file name percent-encoded.
fn asset_url(base: &Url, id: Uuid, extension: &str) -> Result<Url, CompileError> {
    let mut url = base.clone();
    let file_name = format!("{id}{extension}");
    url.path_segments_mut()
        .map_err(|()| CompileError::InvalidBaseUrl(base.clone()))?
        .pop_if_empty()
        .push(DOWNLOADS_URL_PATH)
        .push(&file_name);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SequentialIds;
    use fontcask_fetch::sha256_bytes_hex;
    use fontcask_schema::{
        CabextractSource, FontCategory, SourceFont, SourceGroup, SourceId,
    };
    use std::fs;

    fn ctx(base_path: &Path) -> CompileContext {
        CompileContext {
            base_path: base_path.to_path_buf(),
            base_url: Url::parse("https://cdn.example.com/fonts").unwrap(),
        }
    }

    fn local_install(path: &str, files: &[&str]) -> SourceInstallation {
        SourceInstallation::Cabextract(CabextractSource {
            local_path: Some(PathBuf::from(path)),
            url: None,
            files: files.iter().map(|f| (*f).to_owned()).collect(),
        })
    }

    fn font(name: &str, installations: Vec<SourceInstallation>) -> SourceFont {
        SourceFont {
            id: SourceId::Id(Uuid::new_v4()),
            name: name.to_owned(),
            short_name: name.to_owned(),
            publisher: "Example Corp".to_owned(),
            categories: vec![FontCategory::SansSerif],
            installations,
        }
    }

    fn compile(
        source: &SourceCatalog,
        base_path: &Path,
    ) -> Result<CompileOutput, CompileError> {
        let mut ids = SequentialIds::default();
        let compiler = Compiler::new(ctx(base_path), &mut ids).unwrap();
        compiler.compile(source, Version::new(1, 0, 0))
    }

    #[test]
    fn local_install_compiles_with_sorted_files_and_correct_record() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.exe"), b"cabinet contents").unwrap();

        let source = SourceCatalog {
            groups: vec![],
            fonts: vec![font("Arial", vec![local_install("./a.exe", &["b.ttf", "a.ttf"])])],
        };
        let output = compile(&source, dir.path()).unwrap();
        let manifest = &output.manifest;

        let CompiledInstallation::Cabextract(install) = &manifest.fonts[0].installations[0];
        assert_eq!(install.files, vec!["a.ttf", "b.ttf"]);

        let download_id = install.download.expect("download assigned");
        assert_eq!(manifest.downloads.len(), 1);
        let record = &manifest.downloads[0];
        assert_eq!(record.id, download_id);
        assert_eq!(record.file_size, 16);
        assert_eq!(record.hash, sha256_bytes_hex(b"cabinet contents"));
        assert_eq!(
            record.download_url.as_str(),
            format!("https://cdn.example.com/fonts/downloads/{download_id}.exe")
        );
    }

    #[test]
    fn local_asset_is_staged_under_download_id() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.exe"), b"cabinet contents").unwrap();

        let source = SourceCatalog {
            groups: vec![],
            fonts: vec![font("Arial", vec![local_install("./a.exe", &[])])],
        };
        let output = compile(&source, dir.path()).unwrap();
        let id = output.manifest.downloads[0].id;
        let staged = output.staged_dir().join(format!("{id}.exe"));
        assert_eq!(fs::read(staged).unwrap(), b"cabinet contents");
    }

    #[test]
    fn equivalent_local_paths_share_one_download() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("fonts")).unwrap();
        fs::write(dir.path().join("fonts/a.exe"), b"bytes").unwrap();

        let source = SourceCatalog {
            groups: vec![],
            fonts: vec![
                font("Arial", vec![local_install("./fonts/a.exe", &[])]),
                font("Verdana", vec![local_install("fonts/a.exe", &[])]),
            ],
        };
        let output = compile(&source, dir.path()).unwrap();
        assert_eq!(output.manifest.downloads.len(), 1);

        let ids: Vec<Uuid> = output
            .manifest
            .fonts
            .iter()
            .map(|f| f.installations[0].download_id().unwrap())
            .collect();
        assert_eq!(ids[0], ids[1]);
    }

    #[test]
    fn fonts_are_sorted_by_name() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.exe"), b"x").unwrap();

        let source = SourceCatalog {
            groups: vec![],
            fonts: vec![
                font("Verdana", vec![local_install("a.exe", &[])]),
                font("Arial", vec![local_install("a.exe", &[])]),
            ],
        };
        let output = compile(&source, dir.path()).unwrap();
        let names: Vec<&str> = output.manifest.fonts.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Arial", "Verdana"]);
    }

    #[test]
    fn installations_are_sorted_by_type_then_download_id() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.exe"), b"a").unwrap();
        fs::write(dir.path().join("b.exe"), b"b").unwrap();

        let source = SourceCatalog {
            groups: vec![],
            fonts: vec![font(
                "Arial",
                vec![local_install("b.exe", &[]), local_install("a.exe", &[])],
            )],
        };
        let output = compile(&source, dir.path()).unwrap();
        let ids: Vec<Uuid> = output.manifest.fonts[0]
            .installations
            .iter()
            .map(|i| i.download_id().unwrap())
            .collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn categories_are_sorted_and_deduplicated() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.exe"), b"x").unwrap();

        let mut f = font("Arial", vec![local_install("a.exe", &[])]);
        f.categories = vec![
            FontCategory::Serif,
            FontCategory::Cursive,
            FontCategory::Serif,
        ];
        let source = SourceCatalog {
            groups: vec![],
            fonts: vec![f],
        };
        let output = compile(&source, dir.path()).unwrap();
        assert_eq!(
            output.manifest.fonts[0].categories,
            vec![FontCategory::Cursive, FontCategory::Serif]
        );
    }

    #[test]
    fn groups_compile_to_font_uuids() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.exe"), b"x").unwrap();

        let f = font("Arial", vec![local_install("a.exe", &[])]);
        let font_id = f.id.as_uuid().unwrap();
        let group_id = Uuid::new_v4();
        let source = SourceCatalog {
            groups: vec![SourceGroup {
                id: SourceId::Id(group_id),
                name: "Basics".to_owned(),
                fonts: vec!["Arial".to_owned()],
            }],
            fonts: vec![f],
        };
        let output = compile(&source, dir.path()).unwrap();
        assert_eq!(output.manifest.groups.len(), 1);
        assert_eq!(output.manifest.groups[0].id, group_id);
        assert_eq!(output.manifest.groups[0].fonts, vec![font_id]);
    }

    #[test]
    fn unknown_group_font_aborts_the_compile() {
        let source = SourceCatalog {
            groups: vec![SourceGroup {
                id: SourceId::Id(Uuid::new_v4()),
                name: "Basics".to_owned(),
                fonts: vec!["Nope".to_owned()],
            }],
            fonts: vec![],
        };
        let dir = tempfile::tempdir().unwrap();
        let err = compile(&source, dir.path()).unwrap_err();
        assert!(matches!(err, CompileError::UnknownGroupFont { .. }));
    }

    #[test]
    fn placeholder_font_id_aborts_the_compile() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.exe"), b"x").unwrap();

        let mut f = font("Arial", vec![local_install("a.exe", &[])]);
        f.id = SourceId::Placeholder;
        let source = SourceCatalog {
            groups: vec![],
            fonts: vec![f],
        };
        let err = compile(&source, dir.path()).unwrap_err();
        assert!(matches!(err, CompileError::PlaceholderId(_)));
    }

    #[test]
    fn missing_local_file_aborts_the_compile() {
        let dir = tempfile::tempdir().unwrap();
        let source = SourceCatalog {
            groups: vec![],
            fonts: vec![font("Arial", vec![local_install("missing.exe", &[])])],
        };
        let err = compile(&source, dir.path()).unwrap_err();
        assert!(matches!(err, CompileError::Fetch(_)));
    }

    #[test]
    fn installation_without_dependency_passes_through() {
        let dir = tempfile::tempdir().unwrap();
        let source = SourceCatalog {
            groups: vec![],
            fonts: vec![font(
                "Arial",
                vec![SourceInstallation::Cabextract(CabextractSource {
                    local_path: None,
                    url: None,
                    files: vec!["z.ttf".to_owned(), "a.ttf".to_owned()],
                })],
            )],
        };
        let output = compile(&source, dir.path()).unwrap();
        assert!(output.manifest.downloads.is_empty());
        let CompiledInstallation::Cabextract(install) = &output.manifest.fonts[0].installations[0];
        assert_eq!(install.download, None);
        assert_eq!(install.files, vec!["a.ttf", "z.ttf"]);
    }

    #[test]
    fn compiled_manifest_has_no_raw_references() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.exe"), b"x").unwrap();

        let source = SourceCatalog {
            groups: vec![],
            fonts: vec![font("Arial", vec![local_install("./a.exe", &[])])],
        };
        let output = compile(&source, dir.path()).unwrap();
        let json = serde_json::to_string(&output.manifest).unwrap();
        assert!(!json.contains("_localPath"));
        assert!(!json.contains("_url"));
        assert!(json.contains("\"download\""));
    }

    #[test]
    fn two_compiles_order_identically_given_the_same_ids() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.exe"), b"a").unwrap();
        fs::write(dir.path().join("b.exe"), b"b").unwrap();

        let source = SourceCatalog {
            groups: vec![],
            fonts: vec![
                font("Verdana", vec![local_install("b.exe", &[])]),
                font("Arial", vec![local_install("a.exe", &[])]),
            ],
        };
        let first = compile(&source, dir.path()).unwrap();
        let second = compile(&source, dir.path()).unwrap();
        assert_eq!(
            serde_json::to_string(&first.manifest).unwrap(),
            serde_json::to_string(&second.manifest).unwrap()
        );
    }

    #[test]
    fn asset_url_appends_downloads_segment() {
        let base = Url::parse("https://cdn.example.com/fonts/").unwrap();
        let id = Uuid::nil();
        let url = asset_url(&base, id, ".exe").unwrap();
        assert_eq!(
            url.as_str(),
            "https://cdn.example.com/fonts/downloads/00000000-0000-0000-0000-000000000000.exe"
        );
    }

    #[test]
    fn asset_url_without_extension() {
        let base = Url::parse("https://cdn.example.com").unwrap();
        let url = asset_url(&base, Uuid::nil(), "").unwrap();
        assert_eq!(
            url.as_str(),
            "https://cdn.example.com/downloads/00000000-0000-0000-0000-000000000000"
        );
    }
}
