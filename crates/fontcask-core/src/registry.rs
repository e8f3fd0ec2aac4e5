use crate::CompileError;
use fontcask_schema::{CanonicalKey, DownloadRecord};
use std::collections::HashMap;
use url::Url;
use uuid::Uuid;

/// Source of download ids.
///
/// Ids are random per-build rather than content-derived, so output
/// determinism comes from explicit sort keys, never from id values being
/// stable across builds. Injecting the source lets tests supply
/// deterministic ids.
pub trait IdSource {
    fn next_id(&mut self) -> Uuid;
}

/// Default id source: random v4 UUIDs.
#[derive(Debug, Default)]
pub struct RandomIds;

impl IdSource for RandomIds {
    fn next_id(&mut self) -> Uuid {
        Uuid::new_v4()
    }
}

/// Deterministic id source: 1, 2, 3, ... as UUID low bytes. For tests.
#[derive(Debug, Default)]
pub struct SequentialIds {
    next: u128,
}

impl IdSource for SequentialIds {
    fn next_id(&mut self) -> Uuid {
        self.next += 1;
        Uuid::from_u128(self.next)
    }
}

/// What a resolver callback reports for a newly seen dependency.
#[derive(Debug, Clone)]
pub struct ResolvedAsset {
    pub download_url: Url,
    pub file_size: u64,
    pub hash: String,
}

/// Deduplicating map from canonical dependency keys to download records.
///
/// Map semantics structurally enforce the core invariant: at most one record
/// per distinct canonical key. The check-and-insert is one `&mut self`
/// operation, so there is no window for two resolutions of the same key.
/// The cache lives for exactly one compile invocation.
pub struct DownloadRegistry<'a> {
    records: HashMap<CanonicalKey, DownloadRecord>,
    ids: &'a mut dyn IdSource,
}

impl<'a> DownloadRegistry<'a> {
    pub fn new(ids: &'a mut dyn IdSource) -> Self {
        Self {
            records: HashMap::new(),
            ids,
        }
    }

    /// Resolve a canonical key to a download id.
    ///
    /// On first sight of a key, a fresh id is drawn and `resolver` runs
    /// (fetch + hash + size, and staging for local assets, named by the new
    /// id). Subsequent calls with an equal key return the stored id without
    /// re-fetching or re-hashing — the first observation of a key wins for
    /// the whole compile, so source content is assumed immutable for the
    /// duration of one run.
    pub fn resolve(
        &mut self,
        key: CanonicalKey,
        resolver: impl FnOnce(Uuid) -> Result<ResolvedAsset, CompileError>,
    ) -> Result<Uuid, CompileError> {
        if let Some(existing) = self.records.get(&key) {
            tracing::debug!("dedup hit for {key} -> {}", existing.id);
            return Ok(existing.id);
        }

        let id = self.ids.next_id();
        let asset = resolver(id)?;
        tracing::debug!(
            "registered download {id} for {key} ({} bytes, sha256 {})",
            asset.file_size,
            asset.hash
        );
        self.records.insert(
            key,
            DownloadRecord {
                id,
                download_url: asset.download_url,
                file_size: asset.file_size,
                hash: asset.hash,
            },
        );
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All unique download records, sorted by id, canonical keys stripped.
    ///
    /// (The key is the map index, never part of the record, so stripping is
    /// structural.) `Uuid`'s ordering is byte order, which matches the
    /// lexicographic order of the hyphenated lowercase form.
    pub fn into_records(self) -> Vec<DownloadRecord> {
        let mut records: Vec<DownloadRecord> = self.records.into_values().collect();
        records.sort_by_key(|r| r.id);
        records
    }
}
