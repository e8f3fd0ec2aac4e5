use crate::catalog::DependencyRef;
use std::fmt;
use std::path::{Component, Path};
use url::Url;

/// Canonical identity of a binary dependency, used for download deduplication.
///
/// Two references with equal canonical keys are the same dependency regardless
/// of surface syntax. Equality is exact string equality after normalization —
/// no fuzzy matching.
///
/// - Local paths are reduced to `/`-separated normal components with `.`
///   segments dropped and `..` segments resolved where possible, so
///   `./fonts/a.exe` and `fonts/./a.exe` collide.
/// - Remote URLs rely on the WHATWG normalization `url::Url` applies at parse
///   time (lowercased scheme and host, default port stripped), so
///   `HTTP://Example.com/f` and `http://example.com/f` collide.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CanonicalKey {
    Local(String),
    Remote(String),
}

impl CanonicalKey {
    pub fn for_local(path: &Path) -> Self {
        let mut parts: Vec<String> = Vec::new();
        for comp in path.components() {
            match comp {
                Component::CurDir => {}
                Component::ParentDir => {
                    if parts.last().is_some_and(|p| p != "..") {
                        parts.pop();
                    } else {
                        parts.push("..".to_owned());
                    }
                }
                Component::Normal(seg) => parts.push(seg.to_string_lossy().into_owned()),
                // Catalog references are relative; absolute prefixes are kept
                // verbatim so distinct roots never collide.
                Component::RootDir => parts.push(String::new()),
                Component::Prefix(p) => parts.push(p.as_os_str().to_string_lossy().into_owned()),
            }
        }
        CanonicalKey::Local(parts.join("/"))
    }

    pub fn for_remote(url: &Url) -> Self {
        CanonicalKey::Remote(url.to_string())
    }

    pub fn from_dependency(dep: DependencyRef<'_>) -> Self {
        match dep {
            DependencyRef::Local(path) => Self::for_local(path),
            DependencyRef::Remote(url) => Self::for_remote(url),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            CanonicalKey::Local(s) | CanonicalKey::Remote(s) => s,
        }
    }
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CanonicalKey::Local(s) => write!(f, "local:{s}"),
            CanonicalKey::Remote(s) => write!(f, "remote:{s}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn local_keys_ignore_curdir_segments() {
        let a = CanonicalKey::for_local(&PathBuf::from("./fonts/a.exe"));
        let b = CanonicalKey::for_local(&PathBuf::from("fonts/./a.exe"));
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "fonts/a.exe");
    }

    #[test]
    fn local_keys_resolve_parent_segments() {
        let a = CanonicalKey::for_local(&PathBuf::from("fonts/sub/../a.exe"));
        let b = CanonicalKey::for_local(&PathBuf::from("fonts/a.exe"));
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_local_paths_stay_distinct() {
        let a = CanonicalKey::for_local(&PathBuf::from("fonts/a.exe"));
        let b = CanonicalKey::for_local(&PathBuf::from("fonts/b.exe"));
        assert_ne!(a, b);
    }

    #[test]
    fn remote_keys_normalize_scheme_and_host() {
        let a = CanonicalKey::for_remote(&Url::parse("HTTP://Example.com/f").unwrap());
        let b = CanonicalKey::for_remote(&Url::parse("http://example.com/f").unwrap());
        assert_eq!(a, b);
    }

    #[test]
    fn remote_keys_strip_default_port() {
        let a = CanonicalKey::for_remote(&Url::parse("https://example.com:443/f").unwrap());
        let b = CanonicalKey::for_remote(&Url::parse("https://example.com/f").unwrap());
        assert_eq!(a, b);
    }

    #[test]
    fn remote_keys_keep_query_and_path_case() {
        let a = CanonicalKey::for_remote(&Url::parse("https://example.com/F?x=1").unwrap());
        let b = CanonicalKey::for_remote(&Url::parse("https://example.com/f?x=1").unwrap());
        assert_ne!(a, b);
    }

    #[test]
    fn local_and_remote_never_collide() {
        let a = CanonicalKey::for_local(&PathBuf::from("example.com/f"));
        let b = CanonicalKey::for_remote(&Url::parse("https://example.com/f").unwrap());
        assert_ne!(a, b);
    }
}
