//! Content-addressed storage used when CAS is enabled.
//!
//! The finalize pass snapshots each textual module's inputs into a tree,
//! passes the tree ID on the command line (`-cas-fs`), and derives a cache
//! key from the final arguments. Everything is identified by a BLAKE3 hash.

use std::fmt;

use blake3::Hasher;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use indexmap::IndexSet;
use rustc_hash::FxBuildHasher;

use crate::{Result, ScanError};

/// Current key format version. Increment when the hashed layout changes.
const CAS_FORMAT_VERSION: u32 = 1;

/// Identifier of an object in the store (BLAKE3 hex digest).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentId(String);

impl ContentId {
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_hex(&self) -> &str {
        &self.0
    }

    fn of(hasher: Hasher) -> Self {
        Self(hasher.finalize().to_hex().to_string())
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A content-addressed object store with an action cache.
pub trait ContentStore: Send + Sync + fmt::Debug {
    /// Snapshots `files` and returns the ID of the resulting tree.
    fn create_tree(&self, files: &[String]) -> Result<ContentId>;

    /// Stores the contents of `path` and returns their ID.
    fn file_content_id(&self, path: &str) -> Result<ContentId>;

    fn action_cache_put(&self, key: &ContentId, value: &ContentId) -> Result<()>;

    fn action_cache_get(&self, key: &ContentId) -> Option<ContentId>;

    /// Deterministic key for compiling `input` with `arguments`.
    fn compute_cache_key(&self, arguments: &[String], input: &str) -> Result<ContentId> {
        let mut hasher = Hasher::new();
        hasher.update(&CAS_FORMAT_VERSION.to_le_bytes());
        for argument in arguments {
            hasher.update(argument.as_bytes());
            hasher.update(b"\0");
        }
        hasher.update(b"input\0");
        hasher.update(input.as_bytes());
        Ok(ContentId::of(hasher))
    }
}

/// Process-local store.
///
/// File contents come from [`insert_file`](Self::insert_file) when present,
/// otherwise from disk.
#[derive(Debug, Default)]
pub struct InMemoryCas {
    objects: DashMap<ContentId, Vec<u8>, FxBuildHasher>,
    virtual_files: DashMap<String, Vec<u8>, FxBuildHasher>,
    action_cache: DashMap<ContentId, ContentId, FxBuildHasher>,
}

impl InMemoryCas {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provides the contents of `path` without touching the filesystem.
    pub fn insert_file(&self, path: impl Into<String>, contents: impl Into<Vec<u8>>) {
        self.virtual_files.insert(path.into(), contents.into());
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn contains(&self, id: &ContentId) -> bool {
        self.objects.contains_key(id)
    }

    fn read(&self, path: &str) -> Result<Vec<u8>> {
        if let Some(contents) = self.virtual_files.get(path) {
            return Ok(contents.clone());
        }
        std::fs::read(path).map_err(|e| ScanError::Cas(format!("cannot read '{path}': {e}")))
    }

    fn store(&self, bytes: Vec<u8>) -> ContentId {
        let mut hasher = Hasher::new();
        hasher.update(&CAS_FORMAT_VERSION.to_le_bytes());
        hasher.update(&bytes);
        let id = ContentId::of(hasher);
        self.objects.entry(id.clone()).or_insert(bytes);
        id
    }
}

impl ContentStore for InMemoryCas {
    fn create_tree(&self, files: &[String]) -> Result<ContentId> {
        let mut sorted: Vec<&String> = files.iter().collect();
        sorted.sort();
        sorted.dedup();

        let mut listing = Vec::new();
        for path in sorted {
            let id = self.file_content_id(path)?;
            listing.extend_from_slice(path.as_bytes());
            listing.push(0);
            listing.extend_from_slice(id.as_hex().as_bytes());
            listing.push(b'\n');
        }
        Ok(self.store(listing))
    }

    fn file_content_id(&self, path: &str) -> Result<ContentId> {
        let bytes = self.read(path)?;
        Ok(self.store(bytes))
    }

    fn action_cache_put(&self, key: &ContentId, value: &ContentId) -> Result<()> {
        match self.action_cache.entry(key.clone()) {
            Entry::Occupied(existing) if existing.get() != value => Err(ScanError::Cas(format!(
                "action cache conflict for key {key}: {} != {value}",
                existing.get()
            ))),
            Entry::Occupied(_) => Ok(()),
            Entry::Vacant(slot) => {
                slot.insert(value.clone());
                Ok(())
            }
        }
    }

    fn action_cache_get(&self, key: &ContentId) -> Option<ContentId> {
        self.action_cache.get(key).map(|entry| entry.value().clone())
    }
}

/// Files that influenced one module's resolution, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct DependencyTracker {
    files: IndexSet<String>,
}

impl DependencyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, path: impl Into<String>) {
        let path = path.into();
        if !path.is_empty() {
            self.files.insert(path);
        }
    }

    pub fn add_files<I, S>(&mut self, paths: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for path in paths {
            self.add_file(path);
        }
    }

    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(String::as_str)
    }

    pub fn create_tree(&self, store: &dyn ContentStore) -> Result<ContentId> {
        let files: Vec<String> = self.files.iter().cloned().collect();
        store.create_tree(&files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tree_ignores_input_order() {
        let cas = InMemoryCas::new();
        cas.insert_file("/a", "alpha");
        cas.insert_file("/b", "beta");

        let forward = cas.create_tree(&["/a".into(), "/b".into()]).unwrap();
        let backward = cas.create_tree(&["/b".into(), "/a".into(), "/a".into()]).unwrap();
        assert_eq!(forward, backward);
    }

    #[test]
    fn tree_changes_with_content() {
        let cas = InMemoryCas::new();
        cas.insert_file("/a", "one");
        let before = cas.create_tree(&["/a".into()]).unwrap();
        cas.insert_file("/a", "two");
        let after = cas.create_tree(&["/a".into()]).unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn missing_file_is_a_cas_error() {
        let cas = InMemoryCas::new();
        let err = cas.file_content_id("/definitely/not/here.h").unwrap_err();
        assert!(matches!(err, ScanError::Cas(_)));
    }

    #[test]
    fn action_cache_rejects_conflicting_values() {
        let cas = InMemoryCas::new();
        let key = ContentId::from_hex("k");
        cas.action_cache_put(&key, &ContentId::from_hex("v1")).unwrap();
        cas.action_cache_put(&key, &ContentId::from_hex("v1")).unwrap();
        assert!(cas.action_cache_put(&key, &ContentId::from_hex("v2")).is_err());
        assert_eq!(cas.action_cache_get(&key), Some(ContentId::from_hex("v1")));
    }

    #[test]
    fn cache_key_depends_on_arguments() {
        let cas = InMemoryCas::new();
        let a = cas.compute_cache_key(&["-O".into()], "/Foo.codeinterface").unwrap();
        let b = cas.compute_cache_key(&["-Onone".into()], "/Foo.codeinterface").unwrap();
        assert_ne!(a, b);
        assert_eq!(a.as_hex().len(), 64);
    }

    #[test]
    fn tracker_deduplicates_and_skips_empty_paths() {
        let mut tracker = DependencyTracker::new();
        tracker.add_files(["/x", "", "/y", "/x"]);
        assert_eq!(tracker.files().collect::<Vec<_>>(), vec!["/x", "/y"]);
    }
}
