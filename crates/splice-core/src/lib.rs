#![deny(missing_docs)]
#![doc = "Core records, error surface and storage contract shared by the splice crates."]

use serde::{Deserialize, Serialize};

pub mod errors;
mod ids;
pub mod schema;
pub mod store;
mod types;

pub use errors::{ErrorInfo, ErrorKind, SpliceError};
pub use ids::{CableId, CircuitId};
pub use schema::SchemaVersion;
pub use store::{CircuitStore, WriteBatch, WriteOp};
pub use types::{
    Cable, CableRole, Circuit, CircuitFields, Medium, SpliceLink, SpliceUpdate, StrandSpan,
};

/// Knobs controlling coordinator policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Medium assumed when a caller does not name one.
    #[serde(default)]
    pub default_medium: Medium,
    /// Whether circuit creation beyond capacity fails with
    /// [`SpliceError::CapacityExceeded`] instead of only being flagged.
    #[serde(default = "default_enforce_capacity")]
    pub enforce_capacity_on_create: bool,
}

fn default_enforce_capacity() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_medium: Medium::Fiber,
            enforce_capacity_on_create: true,
        }
    }
}
