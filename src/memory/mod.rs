//! Process-wide Memory Store.
//!
//! A plain `string -> string` map, persisted to a single JSON file and
//! flushed on every mutation. Exposed to the agent via the `memory_save`,
//! `memory_read`, `memory_list`, and `memory_delete` tools in
//! `tools::memory_tools`.

pub mod store;
pub mod traits;

pub use store::{FileMemoryStore, default_memory_path};
pub use traits::MemoryStore;
