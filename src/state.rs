use crate::config::Config;
use crate::events::ChangeNotifier;
use crate::records::RecordService;
use crate::storage::{FileSlotStore, RecordStore, SlotStore};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub records: RecordService,
    pub notifier: ChangeNotifier,
}

impl AppState {
    pub fn new(slots: Arc<dyn SlotStore>, storage_key: impl Into<String>) -> Self {
        let notifier = ChangeNotifier::new();
        let store = RecordStore::new(slots, storage_key, notifier.clone());
        Self {
            records: RecordService::new(store),
            notifier,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Arc::new(FileSlotStore::new(&config.data_path)),
            config.storage_key.clone(),
        )
    }
}
