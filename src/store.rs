use crate::error::StoreError;
use async_trait::async_trait;
use log::{debug, error, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

pub const LOGS_KEY: &str = "logs";
pub const STATUS_KEY: &str = "status";

/// String-keyed persistent storage shared by every state owner.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError>;
}

pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String, StoreError> {
    Ok(serde_json::to_string(value)?)
}

pub fn decode<T: DeserializeOwned>(raw: &str) -> Result<T, StoreError> {
    Ok(serde_json::from_str(raw)?)
}

/// Fire-and-forget writes against one key of a store.
///
/// Each write is spawned on the runtime as soon as it is scheduled and waits
/// for the previous write to the same key before calling `set`, so writes land
/// in the order they were issued. Failures are logged and dropped.
pub struct PendingWrites {
    store: Arc<dyn KeyValueStore>,
    key: &'static str,
    // Most recently scheduled write; each write owns the handle of the one before it
    tail: Option<JoinHandle<()>>,
}

impl PendingWrites {
    pub fn new(store: Arc<dyn KeyValueStore>, key: &'static str) -> Self {
        Self {
            store,
            key,
            tail: None,
        }
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    pub fn schedule<T: Serialize + ?Sized>(&mut self, value: &T) {
        let raw = match encode(value) {
            Ok(raw) => raw,
            Err(e) => {
                error!("Failed to encode value for '{}': {}", self.key, e);
                return;
            }
        };

        let previous = self.tail.take();
        let store = Arc::clone(&self.store);
        let key = self.key;
        self.tail = Some(tokio::spawn(async move {
            if let Some(previous) = previous {
                if let Err(e) = previous.await {
                    error!("Write task for '{}' did not complete: {}", key, e);
                }
            }
            if let Err(e) = store.set(key, raw).await {
                error!("Failed to save '{}' to storage: {}", key, e);
            }
        }));
    }

    /// Waits for every write scheduled so far.
    pub async fn flush(&mut self) {
        if let Some(tail) = self.tail.take() {
            if let Err(e) = tail.await {
                error!("Write task for '{}' did not complete: {}", self.key, e);
            }
        }
    }
}

/// Durable store backed by one JSON object on disk.
pub struct FileStore {
    path: PathBuf,
    // Serialises read-modify-write cycles of the backing file
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<BTreeMap<String, String>, StoreError> {
        match fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(content) => decode(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, serde_json::to_vec_pretty(entries)?).await?;
        fs::rename(&temp_path, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read_all().await?;
        Ok(entries.remove(key))
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut entries = match self.read_all().await {
            Ok(entries) => entries,
            Err(StoreError::JsonError(e)) => {
                warn!("Replacing unreadable store {}: {}", self.path.display(), e);
                BTreeMap::new()
            }
            Err(e) => return Err(e),
        };
        entries.insert(key.to_string(), value);
        self.write_all(&entries).await?;
        debug!("Wrote key '{}' to {}", key, self.path.display());
        Ok(())
    }
}

#[cfg(test)]
#[derive(Default)]
struct MemoryState {
    entries: std::collections::HashMap<String, String>,
    fail_gets: bool,
    fail_sets: bool,
}

/// In-process store. Failures can be switched on to exercise error paths.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryStore {
    state: std::sync::Mutex<MemoryState>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: &str, value: &str) {
        self.with_state(|state| {
            state.entries.insert(key.to_string(), value.to_string());
        });
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.with_state(|state| state.entries.get(key).cloned())
    }

    pub fn fail_gets(&self, fail: bool) {
        self.with_state(|state| state.fail_gets = fail);
    }

    pub fn fail_sets(&self, fail: bool) {
        self.with_state(|state| state.fail_sets = fail);
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut MemoryState) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut state)
    }
}

#[cfg(test)]
#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.with_state(|state| {
            if state.fail_gets {
                return Err(StoreError::Unavailable(format!("get '{}' rejected", key)));
            }
            Ok(state.entries.get(key).cloned())
        })
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.with_state(|state| {
            if state.fail_sets {
                return Err(StoreError::Unavailable(format!("set '{}' rejected", key)));
            }
            state.entries.insert(key.to_string(), value);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log_entry::{Label, LogEntry};

    #[test]
    fn log_list_survives_encoding() {
        let logs = vec![
            LogEntry::new(Label::Entry, "01/02/2024, 08:00:00".to_string()),
            LogEntry::new(Label::Exit, "01/02/2024, 17:30:00".to_string()),
        ];
        let decoded: Vec<LogEntry> = decode(&encode(&logs).unwrap()).unwrap();
        assert_eq!(decoded, logs);

        let flag: bool = decode(&encode(&true).unwrap()).unwrap();
        assert!(flag);
    }

    #[test]
    fn decode_rejects_malformed_data() {
        assert!(decode::<Vec<LogEntry>>("not json").is_err());
        assert!(decode::<bool>("\"yes\"").is_err());
    }

    #[tokio::test]
    async fn file_store_missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("absent.json"));
        assert_eq!(store.get(LOGS_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let store = FileStore::new(&path);
        store.set(STATUS_KEY, "true".to_string()).await.unwrap();
        store.set(LOGS_KEY, "[]".to_string()).await.unwrap();
        drop(store);

        let reopened = FileStore::new(&path);
        assert_eq!(reopened.get(STATUS_KEY).await.unwrap().as_deref(), Some("true"));
        assert_eq!(reopened.get(LOGS_KEY).await.unwrap().as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn file_store_concurrent_writes_keep_every_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = std::sync::Arc::new(FileStore::new(dir.path().join("store.json")));

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = std::sync::Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.set(&format!("key{}", i), i.to_string()).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        for i in 0..8 {
            assert_eq!(store.get(&format!("key{}", i)).await.unwrap(), Some(i.to_string()));
        }
    }

    #[tokio::test]
    async fn file_store_reports_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "{broken").unwrap();

        let store = FileStore::new(&path);
        assert!(matches!(store.get(LOGS_KEY).await, Err(StoreError::JsonError(_))));
    }

    #[tokio::test]
    async fn file_store_set_replaces_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "{broken").unwrap();

        let store = FileStore::new(&path);
        store.set(STATUS_KEY, "true".to_string()).await.unwrap();

        assert_eq!(store.get(STATUS_KEY).await.unwrap().as_deref(), Some("true"));
    }

    #[tokio::test]
    async fn pending_writes_land_in_issue_order() {
        let store = Arc::new(MemoryStore::new());
        let mut writes = PendingWrites::new(store.clone(), STATUS_KEY);

        for i in 0..50 {
            writes.schedule(&i);
        }
        writes.flush().await;

        assert_eq!(store.raw(STATUS_KEY).as_deref(), Some("49"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn pending_writes_keep_order_on_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        for round in 0..20 {
            let mut writes = PendingWrites::new(Arc::new(FileStore::new(&path)), LOGS_KEY);
            for i in 0..=round {
                writes.schedule(&i);
            }
            writes.flush().await;

            let reopened = FileStore::new(&path);
            assert_eq!(reopened.get(LOGS_KEY).await.unwrap(), Some(round.to_string()));
        }
    }

    #[tokio::test]
    async fn memory_store_injected_failures() {
        let store = MemoryStore::new();
        store.fail_sets(true);
        assert!(store.set(LOGS_KEY, "[]".to_string()).await.is_err());
        assert_eq!(store.raw(LOGS_KEY), None);

        store.fail_sets(false);
        store.set(LOGS_KEY, "[]".to_string()).await.unwrap();
        store.fail_gets(true);
        assert!(matches!(store.get(LOGS_KEY).await, Err(StoreError::Unavailable(_))));
    }
}
