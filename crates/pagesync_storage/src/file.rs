//! Journaled file store for persistent sync state.
//!
//! Directory layout:
//!
//! ```text
//! <store_path>/
//! ├─ LOCK              # Advisory lock for single-writer
//! └─ store.log         # JSON-lines journal of record and metadata writes
//! ```
//!
//! Only state-changing writes are journaled, so a pass over an unchanged
//! remote leaves the journal byte-for-byte identical.

use crate::error::{StorageError, StorageResult};
use crate::record::StoreRecord;
use crate::store::{ContentStore, MetadataStore};
use async_trait::async_trait;
use fs2::FileExt;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = "LOCK";
const JOURNAL_FILE: &str = "store.log";
const JOURNAL_TEMP: &str = "store.log.tmp";

/// Configuration for a [`FileStore`].
#[derive(Debug, Clone)]
pub struct FileStoreConfig {
    /// Whether to fsync the journal after every write (safer but slower).
    pub sync_on_write: bool,
}

impl Default for FileStoreConfig {
    fn default() -> Self {
        Self {
            sync_on_write: true,
        }
    }
}

impl FileStoreConfig {
    /// Sets whether to fsync after every write.
    #[must_use]
    pub const fn sync_on_write(mut self, value: bool) -> Self {
        self.sync_on_write = value;
        self
    }
}

/// One line of the journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum JournalEntry {
    Record(StoreRecord),
    Meta { key: String, value: String },
}

#[derive(Debug, Default)]
struct State {
    records: HashMap<String, StoreRecord>,
    meta: BTreeMap<String, String>,
    entries: u64,
}

impl State {
    fn apply(&mut self, entry: JournalEntry) {
        match entry {
            JournalEntry::Record(record) => {
                self.records.insert(record.id.clone(), record);
            }
            JournalEntry::Meta { key, value } => {
                self.meta.insert(key, value);
            }
        }
        self.entries += 1;
    }
}

/// The open journal and the length of its last committed entry.
#[derive(Debug)]
struct Journal {
    file: File,
    len: u64,
}

impl Journal {
    fn open_file(path: &Path) -> StorageResult<File> {
        Ok(OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(path)?)
    }

    /// Appends one entry. Bytes past the committed length, left by an
    /// earlier failed write, are cut off first, and a failed write is rolled
    /// back so the next entry starts on a clean line.
    fn append(&mut self, entry: &JournalEntry, sync: bool) -> StorageResult<()> {
        let line = encode_entry(entry)?;
        if self.file.metadata()?.len() != self.len {
            tracing::warn!(committed = self.len, "trimming stray journal bytes");
            self.file.set_len(self.len)?;
        }

        if let Err(err) = self.write_line(&line, sync) {
            if let Err(rollback) = self.file.set_len(self.len) {
                tracing::warn!(error = %rollback, "failed to roll back journal write");
            }
            return Err(err.into());
        }
        self.len += line.len() as u64;
        Ok(())
    }

    fn write_line(&mut self, line: &[u8], sync: bool) -> std::io::Result<()> {
        self.file.write_all(line)?;
        self.file.flush()?;
        if sync {
            self.file.sync_data()?;
        }
        Ok(())
    }
}

/// Outcome of a [`FileStore::compact`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactStats {
    /// Journal entries before compaction.
    pub entries_before: u64,
    /// Journal entries after compaction.
    pub entries_after: u64,
}

/// A content and metadata store persisted as an append-only journal.
///
/// The full state is kept in memory and rebuilt from the journal on open.
/// The directory is held under an exclusive advisory lock for the lifetime of
/// the store, so two processes cannot write the same store concurrently.
///
/// # Recovery
///
/// A journal whose final line is incomplete (a write torn by a crash) is
/// truncated back to its last complete entry. An unreadable entry anywhere
/// else is reported as [`StorageError::Corrupted`]. While the store is open,
/// a write that fails partway is cut back out of the journal, so it can
/// never merge with the entry written after it.
///
/// # Example
///
/// ```no_run
/// use pagesync_storage::{FileStore, FileStoreConfig};
/// use std::path::Path;
///
/// let store = FileStore::open(Path::new("catalog-store"), FileStoreConfig::default()).unwrap();
/// println!("{} records", store.record_count());
/// ```
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    config: FileStoreConfig,
    state: RwLock<State>,
    journal: Mutex<Journal>,
    _lock_file: File,
}

impl FileStore {
    /// Opens or creates a store in the directory at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory cannot be created
    /// - Another process holds the lock (returns `Locked`)
    /// - The journal is corrupted
    /// - I/O errors occur
    pub fn open(path: &Path, config: FileStoreConfig) -> StorageResult<Self> {
        fs::create_dir_all(path)?;

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.join(LOCK_FILE))?;
        if lock_file.try_lock_exclusive().is_err() {
            return Err(StorageError::Locked {
                path: path.to_path_buf(),
            });
        }

        let mut file = Journal::open_file(&path.join(JOURNAL_FILE))?;
        let state = replay(&mut file)?;
        let len = file.metadata()?.len();

        tracing::debug!(
            path = %path.display(),
            records = state.records.len(),
            entries = state.entries,
            "opened file store"
        );

        Ok(Self {
            path: path.to_path_buf(),
            config,
            state: RwLock::new(state),
            journal: Mutex::new(Journal { file, len }),
            _lock_file: lock_file,
        })
    }

    /// Returns the store directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of stored records.
    pub fn record_count(&self) -> usize {
        self.state.read().records.len()
    }

    /// Number of entries currently in the journal.
    pub fn journal_entries(&self) -> u64 {
        self.state.read().entries
    }

    /// Returns a snapshot of all records, sorted by id.
    pub fn records(&self) -> Vec<StoreRecord> {
        let mut records: Vec<StoreRecord> =
            self.state.read().records.values().cloned().collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        records
    }

    /// Returns a snapshot of all metadata.
    pub fn metadata(&self) -> BTreeMap<String, String> {
        self.state.read().meta.clone()
    }

    /// Rewrites the journal so it holds only the latest state.
    ///
    /// The new journal is written to a temporary file and renamed over the
    /// old one, so a crash mid-compaction leaves the previous journal intact.
    ///
    /// # Errors
    ///
    /// Returns an error if the new journal cannot be written or renamed.
    pub fn compact(&self) -> StorageResult<CompactStats> {
        let mut state = self.state.write();
        let mut journal = self.journal.lock();
        let entries_before = state.entries;

        let temp_path = self.path.join(JOURNAL_TEMP);
        let mut temp = File::create(&temp_path)?;
        let mut entries_after = 0u64;

        let mut ids: Vec<&String> = state.records.keys().collect();
        ids.sort();
        for id in ids {
            write_entry(&mut temp, &JournalEntry::Record(state.records[id].clone()))?;
            entries_after += 1;
        }
        for (key, value) in &state.meta {
            write_entry(
                &mut temp,
                &JournalEntry::Meta {
                    key: key.clone(),
                    value: value.clone(),
                },
            )?;
            entries_after += 1;
        }
        temp.sync_all()?;
        drop(temp);

        fs::rename(&temp_path, self.path.join(JOURNAL_FILE))?;
        let file = Journal::open_file(&self.path.join(JOURNAL_FILE))?;
        let len = file.metadata()?.len();
        *journal = Journal { file, len };
        state.entries = entries_after;

        tracing::info!(entries_before, entries_after, "compacted store journal");

        Ok(CompactStats {
            entries_before,
            entries_after,
        })
    }

    fn append(&self, entry: &JournalEntry) -> StorageResult<()> {
        self.journal.lock().append(entry, self.config.sync_on_write)
    }
}

fn encode_entry(entry: &JournalEntry) -> StorageResult<Vec<u8>> {
    let mut line = serde_json::to_vec(entry)?;
    line.push(b'\n');
    Ok(line)
}

fn write_entry(out: &mut impl Write, entry: &JournalEntry) -> StorageResult<()> {
    out.write_all(&encode_entry(entry)?)?;
    Ok(())
}

/// Rebuilds state from the journal, truncating a torn final line.
fn replay(journal: &mut File) -> StorageResult<State> {
    let mut bytes = Vec::new();
    journal.read_to_end(&mut bytes)?;

    let mut state = State::default();
    let mut offset = 0usize;
    let mut line_no = 0usize;

    while offset < bytes.len() {
        line_no += 1;
        let rest = &bytes[offset..];
        let (line, consumed, terminated) = match rest.iter().position(|b| *b == b'\n') {
            Some(pos) => (&rest[..pos], pos + 1, true),
            None => (rest, rest.len(), false),
        };
        let is_last = offset + consumed == bytes.len();

        if line.iter().all(u8::is_ascii_whitespace) {
            offset += consumed;
            continue;
        }

        match serde_json::from_slice::<JournalEntry>(line) {
            Ok(entry) if terminated => {
                state.apply(entry);
                offset += consumed;
            }
            Ok(entry) => {
                // complete entry missing its newline
                state.apply(entry);
                journal.write_all(b"\n")?;
                offset += consumed;
            }
            Err(err) if is_last => {
                tracing::warn!(
                    line = line_no,
                    error = %err,
                    "discarding torn journal entry"
                );
                journal.set_len(offset as u64)?;
                break;
            }
            Err(err) => {
                return Err(StorageError::Corrupted {
                    line: line_no,
                    message: err.to_string(),
                });
            }
        }
    }

    Ok(state)
}

#[async_trait]
impl ContentStore for FileStore {
    async fn upsert(&self, record: StoreRecord) -> StorageResult<bool> {
        let mut state = self.state.write();
        if state
            .records
            .get(&record.id)
            .is_some_and(|existing| existing.digest == record.digest)
        {
            return Ok(false);
        }

        let entry = JournalEntry::Record(record);
        self.append(&entry)?;
        state.apply(entry);
        Ok(true)
    }

    async fn record(&self, id: &str) -> StorageResult<Option<StoreRecord>> {
        Ok(self.state.read().records.get(id).cloned())
    }
}

#[async_trait]
impl MetadataStore for FileStore {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.state.read().meta.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut state = self.state.write();
        if state.meta.get(key).map(String::as_str) == Some(value) {
            return Ok(());
        }

        let entry = JournalEntry::Meta {
            key: key.to_string(),
            value: value.to_string(),
        };
        self.append(&entry)?;
        state.apply(entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagesync_codec::Digest;
    use serde_json::json;
    use tempfile::tempdir;

    fn record(id: &str, digest: &str) -> StoreRecord {
        StoreRecord::new(id, json!({"id": id, "name": "Mug"}), Digest::new(digest))
    }

    fn journal_len(dir: &Path) -> u64 {
        fs::metadata(dir.join(JOURNAL_FILE)).unwrap().len()
    }

    #[tokio::test]
    async fn create_new_store() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path(), FileStoreConfig::default()).unwrap();
        assert_eq!(store.record_count(), 0);
        assert!(dir.path().join(JOURNAL_FILE).exists());
        assert!(dir.path().join(LOCK_FILE).exists());
    }

    #[tokio::test]
    async fn records_and_metadata_persist() {
        let dir = tempdir().unwrap();

        {
            let store = FileStore::open(dir.path(), FileStoreConfig::default()).unwrap();
            assert!(store.upsert(record("prod_1", "a")).await.unwrap());
            assert!(store.upsert(record("prod_2", "a")).await.unwrap());
            store.set("products-last-updated", "1700000100").await.unwrap();
        }

        let store = FileStore::open(dir.path(), FileStoreConfig::default()).unwrap();
        assert_eq!(store.record_count(), 2);
        assert_eq!(
            store.get("products-last-updated").await.unwrap().as_deref(),
            Some("1700000100")
        );
        assert_eq!(
            store.record("prod_2").await.unwrap().unwrap().digest,
            Digest::new("a")
        );
    }

    #[tokio::test]
    async fn unchanged_writes_do_not_grow_journal() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path(), FileStoreConfig::default()).unwrap();
        store.upsert(record("prod_1", "a")).await.unwrap();
        store.set("k", "1").await.unwrap();
        let len = journal_len(dir.path());

        assert!(!store.upsert(record("prod_1", "a")).await.unwrap());
        store.set("k", "1").await.unwrap();
        assert_eq!(journal_len(dir.path()), len);
    }

    #[tokio::test]
    async fn second_open_is_locked() {
        let dir = tempdir().unwrap();
        let _store = FileStore::open(dir.path(), FileStoreConfig::default()).unwrap();
        let second = FileStore::open(dir.path(), FileStoreConfig::default());
        assert!(matches!(second, Err(StorageError::Locked { .. })));
    }

    #[tokio::test]
    async fn torn_final_entry_is_discarded() {
        let dir = tempdir().unwrap();
        {
            let store = FileStore::open(dir.path(), FileStoreConfig::default()).unwrap();
            store.upsert(record("prod_1", "a")).await.unwrap();
        }
        let intact = journal_len(dir.path());
        {
            let mut file = OpenOptions::new()
                .append(true)
                .open(dir.path().join(JOURNAL_FILE))
                .unwrap();
            file.write_all(br#"{"kind":"record","id":"prod_2","da"#).unwrap();
        }

        let store = FileStore::open(dir.path(), FileStoreConfig::default()).unwrap();
        assert_eq!(store.record_count(), 1);
        assert_eq!(journal_len(dir.path()), intact);

        store.upsert(record("prod_3", "a")).await.unwrap();
        drop(store);
        let store = FileStore::open(dir.path(), FileStoreConfig::default()).unwrap();
        assert_eq!(store.record_count(), 2);
    }

    #[tokio::test]
    async fn stray_bytes_do_not_swallow_next_entry() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path(), FileStoreConfig::default()).unwrap();
        assert!(store.upsert(record("prod_1", "a")).await.unwrap());
        let committed = journal_len(dir.path());

        // a write that died partway through its line
        {
            let mut file = OpenOptions::new()
                .append(true)
                .open(dir.path().join(JOURNAL_FILE))
                .unwrap();
            file.write_all(br#"{"kind":"record","id":"prod_2","da"#).unwrap();
        }

        assert!(store.upsert(record("prod_3", "a")).await.unwrap());
        assert!(journal_len(dir.path()) > committed);
        drop(store);

        let store = FileStore::open(dir.path(), FileStoreConfig::default()).unwrap();
        assert_eq!(store.record_count(), 2);
        assert!(store.record("prod_3").await.unwrap().is_some());
        assert!(store.record("prod_2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupt_interior_entry_is_an_error() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(JOURNAL_FILE),
            "not json\n{\"kind\":\"meta\",\"key\":\"k\",\"value\":\"v\"}\n",
        )
        .unwrap();

        let result = FileStore::open(dir.path(), FileStoreConfig::default());
        assert!(matches!(result, Err(StorageError::Corrupted { line: 1, .. })));
    }

    #[tokio::test]
    async fn compact_keeps_latest_state() {
        let dir = tempdir().unwrap();
        let store =
            FileStore::open(dir.path(), FileStoreConfig::default().sync_on_write(false)).unwrap();
        store.upsert(record("prod_1", "a")).await.unwrap();
        store.upsert(record("prod_1", "b")).await.unwrap();
        store.upsert(record("prod_1", "c")).await.unwrap();
        store.set("k", "1").await.unwrap();
        store.set("k", "2").await.unwrap();

        let stats = store.compact().unwrap();
        assert_eq!(stats.entries_before, 5);
        assert_eq!(stats.entries_after, 2);

        store.upsert(record("prod_2", "a")).await.unwrap();
        drop(store);

        let store = FileStore::open(dir.path(), FileStoreConfig::default()).unwrap();
        assert_eq!(store.journal_entries(), 3);
        assert_eq!(
            store.record("prod_1").await.unwrap().unwrap().digest,
            Digest::new("c")
        );
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("2"));
    }
}
