use crate::catalog::{DependencyRef, SourceCatalog, SourceId, SourceInstallation};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;
use uuid::Uuid;

const MIN_NAME_LENGTH: usize = 3;
const MAX_NAME_LENGTH: usize = 50;

/// How the formatter treats fixable findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatMode {
    /// Report every finding, change nothing.
    Check,
    /// Sort lists, assign placeholder ids, and report what cannot be fixed.
    Fix,
}

/// A finding from the catalog formatter.
///
/// Fixable findings (ordering, placeholder ids) are reported only in check
/// mode; structural findings are always reported.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatIssue {
    #[error("id {0} is used more than once")]
    ReusedId(Uuid),
    #[error("'{0}' has the <UUID> placeholder instead of an assigned id")]
    PlaceholderId(String),
    #[error("name '{name}' is used more than once in {list}")]
    DuplicateName { name: String, list: String },
    #[error("name '{name}' is longer than {MAX_NAME_LENGTH} characters")]
    NameTooLong { name: String },
    #[error("name '{name}' is shorter than {MIN_NAME_LENGTH} characters")]
    NameTooShort { name: String },
    #[error("list '{0}' is not sorted")]
    Unsorted(String),
    #[error("group '{0}' has no fonts")]
    EmptyGroup(String),
    #[error("group '{group}' lists font '{font}' more than once")]
    DuplicateGroupFont { group: String, font: String },
    #[error("group '{group}' lists font '{font}' which does not exist")]
    UnknownGroupFont { group: String, font: String },
    #[error("font '{0}' has no installations")]
    NoInstallations(String),
    #[error("font '{font}' has an installation with both _localPath and _url")]
    ConflictingReference { font: String },
    #[error("font '{font}' has an installation with no dependency reference")]
    MissingReference { font: String },
    #[error("font '{font}' references local file '{path}' which does not exist")]
    MissingLocalFile { font: String, path: PathBuf },
    #[error("font '{font}' references '{url}' which is not https")]
    InsecureUrl { font: String, url: Url },
}

/// Lint and optionally normalize a source catalog.
///
/// Returns the (possibly rewritten) catalog and every finding. In fix mode the
/// returned catalog has groups/fonts sorted by name, group font lists and
/// installation `files` lists sorted lexicographically, and `<UUID>`
/// placeholders replaced with fresh ids. Download identity and binary content
/// are never touched.
pub fn format_catalog(
    original: &SourceCatalog,
    base_path: &Path,
    mode: FormatMode,
) -> (SourceCatalog, Vec<FormatIssue>) {
    let mut catalog = original.clone();
    let mut issues = Vec::new();
    let mut seen_ids = HashSet::new();

    let font_names: HashSet<String> = catalog.fonts.iter().map(|f| f.name.clone()).collect();

    sort_or_flag(
        &mut catalog.groups,
        |g| g.name.clone(),
        "groups",
        mode,
        &mut issues,
    );

    let mut group_names = HashSet::new();
    for group in &mut catalog.groups {
        if !group_names.insert(group.name.clone()) {
            issues.push(FormatIssue::DuplicateName {
                name: group.name.clone(),
                list: "groups".to_owned(),
            });
        }
        check_name(&group.name, &mut issues);

        if group.fonts.is_empty() {
            issues.push(FormatIssue::EmptyGroup(group.name.clone()));
        }

        group.id = check_or_assign_id(group.id, &group.name, &mut seen_ids, mode, &mut issues);

        let mut listed = HashSet::new();
        for font in &group.fonts {
            if !listed.insert(font.clone()) {
                issues.push(FormatIssue::DuplicateGroupFont {
                    group: group.name.clone(),
                    font: font.clone(),
                });
            }
            if !font_names.contains(font) {
                issues.push(FormatIssue::UnknownGroupFont {
                    group: group.name.clone(),
                    font: font.clone(),
                });
            }
        }

        sort_or_flag(
            &mut group.fonts,
            Clone::clone,
            &format!("groups -> {} -> fonts", group.name),
            mode,
            &mut issues,
        );
    }

    sort_or_flag(
        &mut catalog.fonts,
        |f| f.name.clone(),
        "fonts",
        mode,
        &mut issues,
    );

    let mut names = HashSet::new();
    for font in &mut catalog.fonts {
        if !names.insert(font.name.clone()) {
            issues.push(FormatIssue::DuplicateName {
                name: font.name.clone(),
                list: "fonts".to_owned(),
            });
        }
        if font.short_name != font.name && !names.insert(font.short_name.clone()) {
            issues.push(FormatIssue::DuplicateName {
                name: font.short_name.clone(),
                list: "fonts".to_owned(),
            });
        }
        check_name(&font.name, &mut issues);
        check_name(&font.short_name, &mut issues);
        check_name(&font.publisher, &mut issues);

        font.id = check_or_assign_id(font.id, &font.name, &mut seen_ids, mode, &mut issues);

        if font.installations.is_empty() {
            issues.push(FormatIssue::NoInstallations(font.name.clone()));
        }

        sort_or_flag(
            &mut font.categories,
            |c| *c,
            &format!("fonts -> {} -> categories", font.name),
            mode,
            &mut issues,
        );

        for installation in &mut font.installations {
            check_dependency(installation, &font.name, base_path, &mut issues);
            let SourceInstallation::Cabextract(data) = installation;
            sort_or_flag(
                &mut data.files,
                Clone::clone,
                &format!("fonts -> {} -> files", font.name),
                mode,
                &mut issues,
            );
        }

        sort_or_flag(
            &mut font.installations,
            install_sort_key,
            &format!("fonts -> {} -> installations", font.name),
            mode,
            &mut issues,
        );
    }

    (catalog, issues)
}

fn check_name(name: &str, issues: &mut Vec<FormatIssue>) {
    if name.len() > MAX_NAME_LENGTH {
        issues.push(FormatIssue::NameTooLong {
            name: name.to_owned(),
        });
    } else if name.len() < MIN_NAME_LENGTH {
        issues.push(FormatIssue::NameTooShort {
            name: name.to_owned(),
        });
    }
}

fn check_or_assign_id(
    id: SourceId,
    owner: &str,
    seen: &mut HashSet<Uuid>,
    mode: FormatMode,
    issues: &mut Vec<FormatIssue>,
) -> SourceId {
    match id {
        SourceId::Id(id) => {
            if !seen.insert(id) {
                issues.push(FormatIssue::ReusedId(id));
            }
            SourceId::Id(id)
        }
        SourceId::Placeholder => {
            if mode == FormatMode::Fix {
                let fresh = Uuid::new_v4();
                seen.insert(fresh);
                SourceId::Id(fresh)
            } else {
                issues.push(FormatIssue::PlaceholderId(owner.to_owned()));
                SourceId::Placeholder
            }
        }
    }
}

fn check_dependency(
    installation: &SourceInstallation,
    font: &str,
    base_path: &Path,
    issues: &mut Vec<FormatIssue>,
) {
    match installation.dependency() {
        Err(_) => issues.push(FormatIssue::ConflictingReference {
            font: font.to_owned(),
        }),
        Ok(None) => issues.push(FormatIssue::MissingReference {
            font: font.to_owned(),
        }),
        Ok(Some(DependencyRef::Local(path))) => {
            let joined = base_path.join(path);
            if !joined.is_file() {
                issues.push(FormatIssue::MissingLocalFile {
                    font: font.to_owned(),
                    path: joined,
                });
            }
        }
        Ok(Some(DependencyRef::Remote(url))) => {
            if url.scheme() != "https" {
                issues.push(FormatIssue::InsecureUrl {
                    font: font.to_owned(),
                    url: url.clone(),
                });
            }
        }
    }
}

/// Deterministic sort key for source installations: type tag, then the raw
/// reference (path or URL), then the files list.
fn install_sort_key(installation: &SourceInstallation) -> (String, String, Vec<String>) {
    let SourceInstallation::Cabextract(data) = installation;
    let reference = data
        .local_path
        .as_ref()
        .map(|p| p.display().to_string())
        .or_else(|| data.url.as_ref().map(|u| u.to_string()))
        .unwrap_or_default();
    (
        installation.install_type().to_owned(),
        reference,
        data.files.clone(),
    )
}

fn sort_or_flag<T, K: Ord>(
    list: &mut [T],
    key: impl Fn(&T) -> K,
    name: &str,
    mode: FormatMode,
    issues: &mut Vec<FormatIssue>,
) {
    if mode == FormatMode::Fix {
        list.sort_by_key(&key);
    } else if !list.windows(2).all(|w| key(&w[0]) <= key(&w[1])) {
        issues.push(FormatIssue::Unsorted(name.to_owned()));
    }
}
