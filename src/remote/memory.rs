//! In-memory remote store.
//!
//! [`MemoryStore`] behaves like a small SFTP server: it has directories, a
//! working directory that relative paths resolve against, and refuses to
//! create files whose parent directory is missing. It also counts every
//! interaction and can inject write failures, which makes it the store of
//! choice for tests and benchmarks.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use log::debug;

use crate::error::RemoteError;
use crate::remote::{FileKind, RemoteConnection, RemoteFile, RemoteFileStat, WriteMode, WriteOptions};

const DIRECTORY_MODE: u32 = 0o755;

struct StoredFile {
    data: Vec<u8>,
    permissions: i32,
    modified: DateTime<Utc>,
}

#[derive(Default)]
struct StoreState {
    files: HashMap<String, StoredFile>,
    dirs: BTreeSet<String>,
    cwd: String,
    opens: u64,
    finalized: u64,
    aborted: u64,
    write_faults: HashMap<String, u64>,
}

/// Shared handle to an in-memory remote store. Clones see the same state.
#[derive(Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl MemoryStore {
    /// Create a store whose working directory is `home`. `home` and all of
    /// its parents exist from the start.
    pub fn new(home: &str) -> Self {
        let cwd = normalize("/", home);
        let store = Self {
            state: Arc::new(Mutex::new(StoreState {
                cwd: cwd.clone(),
                ..Default::default()
            })),
        };
        store.create_dir_all(&cwd);
        store
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        lock_state(&self.state)
    }

    /// Create a directory and all missing parents
    pub fn create_dir_all(&self, path: &str) {
        let mut state = self.lock();
        let resolved = normalize(&state.cwd, path);
        let mut current = String::new();
        state.dirs.insert("/".to_string());
        for part in resolved.split('/').filter(|p| !p.is_empty()) {
            current.push('/');
            current.push_str(part);
            state.dirs.insert(current.clone());
        }
    }

    /// Place a file directly into the store
    pub fn insert_file(&self, path: &str, data: &[u8]) {
        let mut state = self.lock();
        let resolved = normalize(&state.cwd, path);
        state.files.insert(
            resolved,
            StoredFile {
                data: data.to_vec(),
                permissions: crate::constants::DEFAULT_FILE_MODE,
                modified: Utc::now(),
            },
        );
    }

    /// Contents of the file at `path`, if any
    pub fn contents(&self, path: &str) -> Option<Vec<u8>> {
        let state = self.lock();
        let resolved = normalize(&state.cwd, path);
        state.files.get(&resolved).map(|f| f.data.clone())
    }

    /// Absolute form of `path` as this store resolves it
    pub fn resolve(&self, path: &str) -> String {
        normalize(&self.lock().cwd, path)
    }

    /// Number of `open_write` calls received, successful or not
    pub fn open_count(&self) -> u64 {
        self.lock().opens
    }

    /// Number of files closed with an acknowledgment
    pub fn finalized_count(&self) -> u64 {
        self.lock().finalized
    }

    /// Number of handles released without acknowledgment
    pub fn aborted_count(&self) -> u64 {
        self.lock().aborted
    }

    /// Make writes to `path` fail once more than `limit` bytes were written
    /// through a single handle.
    pub fn fail_writes_after(&self, path: &str, limit: u64) {
        let mut state = self.lock();
        let resolved = normalize(&state.cwd, path);
        state.write_faults.insert(resolved, limit);
    }
}

fn lock_state(state: &Mutex<StoreState>) -> MutexGuard<'_, StoreState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Resolve `path` against `cwd`, folding `.` and `..` components.
fn normalize(cwd: &str, path: &str) -> String {
    let joined = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("{}/{}", cwd, path)
    };

    let mut parts: Vec<&str> = Vec::new();
    for part in joined.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }

    format!("/{}", parts.join("/"))
}

fn parent_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(idx) => &path[..idx],
    }
}

#[async_trait]
impl RemoteConnection for MemoryStore {
    fn describe(&self) -> String {
        format!("memory://{}", self.lock().cwd)
    }

    async fn open_write(
        &self,
        path: &str,
        options: &WriteOptions,
    ) -> Result<Box<dyn RemoteFile>, RemoteError> {
        let mut state = self.lock();
        state.opens += 1;

        let resolved = normalize(&state.cwd, path);
        if state.dirs.contains(&resolved) {
            return Err(RemoteError::failure(format!("Failure: {} is a directory", path)));
        }
        if !state.dirs.contains(parent_of(&resolved)) {
            return Err(RemoteError::no_such_file(format!("No such file: {}", path)));
        }

        let now = Utc::now();
        let file = state.files.entry(resolved.clone()).or_insert_with(|| StoredFile {
            data: Vec::new(),
            permissions: options.permissions,
            modified: now,
        });
        if options.mode == WriteMode::Overwrite {
            file.data.clear();
            file.modified = now;
        }

        let fault = state.write_faults.get(&resolved).copied();
        debug!("memory store opened {} ({:?})", resolved, options.mode);

        Ok(Box::new(MemoryFile {
            state: Arc::clone(&self.state),
            path: resolved,
            written: 0,
            fault,
        }))
    }

    async fn stat(&self, path: &str) -> Result<RemoteFileStat, RemoteError> {
        let state = self.lock();
        let resolved = normalize(&state.cwd, path);

        if let Some(file) = state.files.get(&resolved) {
            return Ok(RemoteFileStat {
                size: file.data.len() as u64,
                permissions: Some(file.permissions as u32),
                modified: Some(file.modified),
                kind: FileKind::File,
            });
        }
        if state.dirs.contains(&resolved) {
            return Ok(RemoteFileStat {
                size: 0,
                permissions: Some(DIRECTORY_MODE),
                modified: None,
                kind: FileKind::Directory,
            });
        }

        Err(RemoteError::no_such_file(format!("No such file: {}", path)))
    }
}

struct MemoryFile {
    state: Arc<Mutex<StoreState>>,
    path: String,
    written: u64,
    fault: Option<u64>,
}

#[async_trait]
impl RemoteFile for MemoryFile {
    fn target_name(&self) -> String {
        format!("memory://{}", self.path)
    }

    async fn write(&mut self, chunk: Bytes) -> Result<(), RemoteError> {
        let len = chunk.len() as u64;
        if let Some(limit) = self.fault {
            if self.written + len > limit {
                return Err(RemoteError::connection_lost(format!(
                    "connection lost while writing {}",
                    self.path
                )));
            }
        }

        let mut state = lock_state(&self.state);
        let file = state.files.entry(self.path.clone()).or_insert_with(|| StoredFile {
            data: Vec::new(),
            permissions: crate::constants::DEFAULT_FILE_MODE,
            modified: Utc::now(),
        });
        file.data.extend_from_slice(&chunk);
        file.modified = Utc::now();
        self.written += len;
        Ok(())
    }

    async fn finalize(self: Box<Self>) -> Result<u64, RemoteError> {
        lock_state(&self.state).finalized += 1;
        Ok(self.written)
    }

    async fn abort(self: Box<Self>) {
        lock_state(&self.state).aborted += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overwrite() -> WriteOptions {
        WriteOptions {
            mode: WriteMode::Overwrite,
            permissions: 0o644,
        }
    }

    #[test]
    fn test_normalize_paths() {
        assert_eq!(normalize("/home/tester", "./upload/a.txt"), "/home/tester/upload/a.txt");
        assert_eq!(normalize("/home/tester", "../tester/upload/a.txt"), "/home/tester/upload/a.txt");
        assert_eq!(normalize("/home/tester", "/srv/a.txt"), "/srv/a.txt");
        assert_eq!(normalize("/", "../../a"), "/a");
    }

    #[test]
    fn test_parent_of() {
        assert_eq!(parent_of("/a"), "/");
        assert_eq!(parent_of("/a/b/c.txt"), "/a/b");
    }

    #[tokio::test]
    async fn test_open_requires_parent_directory() {
        let store = MemoryStore::new("/home/tester");
        let err = store
            .open_write("bad-directory/bad-file.txt", &overwrite())
            .await
            .err()
            .expect("missing parent must be rejected");

        assert_eq!(err.kind, crate::error::RemoteErrorKind::NoSuchFile);
        assert_eq!(store.open_count(), 1);
    }

    #[tokio::test]
    async fn test_write_finalize_and_stat() {
        let store = MemoryStore::new("/home/tester");
        let mut file = store.open_write("hello.txt", &overwrite()).await.unwrap();
        file.write(Bytes::from_static(b"hello")).await.unwrap();
        assert_eq!(file.finalize().await.unwrap(), 5);

        let stat = store.stat("/home/tester/hello.txt").await.unwrap();
        assert_eq!(stat.size, 5);
        assert!(stat.is_file());
        assert_eq!(stat.permissions, Some(0o644));
        assert_eq!(store.finalized_count(), 1);
    }

    #[tokio::test]
    async fn test_append_keeps_existing_content() {
        let store = MemoryStore::new("/home/tester");
        store.insert_file("log.txt", b"abc");

        let options = WriteOptions {
            mode: WriteMode::Append,
            permissions: 0o644,
        };
        let mut file = store.open_write("log.txt", &options).await.unwrap();
        file.write(Bytes::from_static(b"def")).await.unwrap();
        file.finalize().await.unwrap();

        assert_eq!(store.contents("log.txt").unwrap(), b"abcdef");
    }

    #[tokio::test]
    async fn test_injected_write_fault() {
        let store = MemoryStore::new("/home/tester");
        store.fail_writes_after("flaky.bin", 4);

        let mut file = store.open_write("flaky.bin", &overwrite()).await.unwrap();
        file.write(Bytes::from_static(b"1234")).await.unwrap();
        let err = file.write(Bytes::from_static(b"5")).await.unwrap_err();
        assert_eq!(err.kind, crate::error::RemoteErrorKind::ConnectionLost);
    }

    #[tokio::test]
    async fn test_stat_directory_and_missing() {
        let store = MemoryStore::new("/home/tester");
        store.create_dir_all("upload/nested");

        assert!(store.stat("upload/nested").await.unwrap().is_dir());
        assert!(store.stat("nothing-here").await.is_err());
    }
}
