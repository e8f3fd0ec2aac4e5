use crate::FetchError;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use url::Url;

/// A remote file fetched into a process-private temporary directory.
///
/// The directory (and the file in it) is removed when this value drops, on
/// both success and failure paths.
#[derive(Debug)]
pub struct FetchedFile {
    _dir: TempDir,
    path: PathBuf,
    size: u64,
}

impl FetchedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

/// HTTP content fetcher for remote dependency references.
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            agent: ureq::Agent::new_with_defaults(),
        }
    }

    /// GET `url` and stream the response body to a temp file.
    ///
    /// Any transport error or non-success status is fatal and annotated with
    /// the offending URL.
    pub fn fetch(&self, url: &Url) -> Result<FetchedFile, FetchError> {
        tracing::debug!("GET {url}");

        let resp = match self
            .agent
            .get(url.as_str())
            .header("Accept", "application/octet-stream")
            .call()
        {
            Ok(r) => r,
            Err(ureq::Error::StatusCode(code)) => {
                return Err(FetchError::Http {
                    url: url.clone(),
                    reason: format!("HTTP {code}"),
                });
            }
            Err(e) => {
                return Err(FetchError::Http {
                    url: url.clone(),
                    reason: e.to_string(),
                });
            }
        };

        let code = resp.status().as_u16();
        if code >= 400 {
            return Err(FetchError::Http {
                url: url.clone(),
                reason: format!("HTTP {code}"),
            });
        }

        let dir = TempDir::new()?;
        let path = dir.path().join("download");
        let mut file = File::create(&path)?;
        let mut reader = resp.into_body().into_reader();
        let size = io::copy(&mut reader, &mut file).map_err(|e| FetchError::Http {
            url: url.clone(),
            reason: e.to_string(),
        })?;
        file.sync_all()?;

        tracing::debug!("fetched {url} ({size} bytes)");
        Ok(FetchedFile {
            _dir: dir,
            path,
            size,
        })
    }
}
