//! In-memory collaborators.
//!
//! [`MemoryStore`] implements the storage contracts over a plain map and [`RecordingRows`]
//! keeps every surface as a list of ids. Together they run the engine without a backend or
//! a renderer: the demo binary uses them, and so do the tests.

mod memory_store;
mod recording_rows;

pub use memory_store::MemoryStore;
pub use recording_rows::RecordingRows;
