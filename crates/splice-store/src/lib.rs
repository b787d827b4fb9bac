//! Storage collaborators for the splice engine.

pub mod memory;
pub mod snapshot;
pub mod sqlite;

pub use memory::MemoryStore;
pub use snapshot::{
    read_snapshot, snapshot_from_json, snapshot_to_json, write_snapshot, PlantSnapshot,
    SNAPSHOT_SCHEMA,
};
pub use sqlite::{init_schema, SqliteStore, SCHEMA_VERSION};
