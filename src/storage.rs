use crate::errors::AppError;
use crate::events::ChangeNotifier;
use crate::models::ChildRecord;
use std::{
    collections::{BTreeMap, HashMap},
    fs, io,
    path::PathBuf,
    sync::{Arc, Mutex, MutexGuard},
};
use tracing::{debug, error, warn};

/// A persistent key-value store of string values.
pub trait SlotStore: Send + Sync {
    fn get(&self, key: &str) -> io::Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> io::Result<()>;
    fn remove(&self, key: &str) -> io::Result<()>;
}

/// Keeps every slot in one JSON object file.
///
/// The file is re-read on every access so edits made by another process are
/// picked up on the next operation. A missing or unreadable file behaves as
/// an empty store.
pub struct FileSlotStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileSlotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn read_slots(&self) -> io::Result<BTreeMap<String, String>> {
        match fs::read(&self.path) {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(slots) => Ok(slots),
                Err(err) => {
                    warn!("failed to parse store file {}: {err}", self.path.display());
                    Ok(BTreeMap::new())
                }
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => Err(err),
        }
    }

    fn write_slots(&self, slots: &BTreeMap<String, String>) -> io::Result<()> {
        let payload = serde_json::to_vec_pretty(slots)?;
        let staging = self.path.with_extension("tmp");
        fs::write(&staging, payload)?;
        fs::rename(&staging, &self.path)
    }
}

impl SlotStore for FileSlotStore {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        let _guard = self.guard();
        Ok(self.read_slots()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        let _guard = self.guard();
        let mut slots = self.read_slots()?;
        slots.insert(key.to_string(), value.to_string());
        self.write_slots(&slots)
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        let _guard = self.guard();
        let mut slots = self.read_slots()?;
        if slots.remove(key).is_some() {
            self.write_slots(&slots)?;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemorySlotStore {
    slots: Mutex<HashMap<String, String>>,
}

impl MemorySlotStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SlotStore for MemorySlotStore {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        Ok(self.slots().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        self.slots().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        self.slots().remove(key);
        Ok(())
    }
}

/// The child record list, serialized as a JSON array in a single slot.
#[derive(Clone)]
pub struct RecordStore {
    slots: Arc<dyn SlotStore>,
    key: String,
    notifier: ChangeNotifier,
}

impl RecordStore {
    pub fn new(slots: Arc<dyn SlotStore>, key: impl Into<String>, notifier: ChangeNotifier) -> Self {
        Self {
            slots,
            key: key.into(),
            notifier,
        }
    }

    pub fn in_memory(key: impl Into<String>) -> Self {
        Self::new(Arc::new(MemorySlotStore::new()), key, ChangeNotifier::new())
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    pub fn slots(&self) -> &dyn SlotStore {
        self.slots.as_ref()
    }

    /// Never fails: a missing or corrupt slot reads as an empty list.
    pub fn load(&self) -> Vec<ChildRecord> {
        match self.slots.get(&self.key) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<ChildRecord>>(&raw) {
                Ok(mut records) => {
                    records.iter_mut().for_each(ChildRecord::reconcile_status);
                    records
                }
                Err(err) => {
                    warn!("slot {} holds malformed records, treating as empty: {err}", self.key);
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(err) => {
                error!("failed to read slot {}: {err}", self.key);
                Vec::new()
            }
        }
    }

    pub fn save(&self, records: &[ChildRecord]) -> Result<(), AppError> {
        let payload = serde_json::to_string(records)?;
        self.slots.set(&self.key, &payload)?;
        debug!("saved {} records to slot {}", records.len(), self.key);
        self.notifier.notify(&self.key);
        Ok(())
    }

    pub fn clear(&self) -> Result<(), AppError> {
        self.slots.remove(&self.key)?;
        debug!("cleared slot {}", self.key);
        self.notifier.notify(&self.key);
        Ok(())
    }
}
