pub mod app;
pub mod classifier;
pub mod config;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod models;
pub mod records;
pub mod state;
pub mod stats;
pub mod storage;
pub mod ui;

pub use app::router;
pub use config::Config;
pub use records::RecordService;
pub use state::AppState;
pub use storage::{FileSlotStore, MemorySlotStore, RecordStore, SlotStore};
