pub mod app;
pub mod cli;
pub mod config;
pub mod storage;
pub mod store;
pub mod ui;

pub use config::{AppConfig, ConfigLoader, ConfigPaths};
pub use storage::{KeyValueStore, StorageHandle};
pub use store::{Note, NoteId, NoteStore, ThemeStore};
