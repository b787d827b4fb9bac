use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use splice_core::errors::{ErrorInfo, SpliceError};
use splice_core::{Cable, Circuit, CircuitStore, SchemaVersion, WriteBatch, WriteOp};

/// Schema of snapshots written by this crate.
pub const SNAPSHOT_SCHEMA: SchemaVersion = SchemaVersion::new(1, 0, 0);

/// Full copy of a plant: every cable and every circuit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlantSnapshot {
    /// Schema the payload was written with.
    pub schema_version: SchemaVersion,
    /// Cables ordered by id.
    pub cables: Vec<Cable>,
    /// Circuits grouped by cable, each group in order.
    pub circuits: Vec<Circuit>,
}

impl PlantSnapshot {
    /// Reads every record out of `store`.
    pub fn capture<S: CircuitStore + ?Sized>(store: &S) -> Result<Self, SpliceError> {
        let cables = store.cables()?;
        let mut circuits = Vec::new();
        for cable in &cables {
            circuits.extend(store.circuits(&cable.id)?);
        }
        Ok(Self {
            schema_version: SNAPSHOT_SCHEMA,
            cables,
            circuits,
        })
    }

    /// Batch that recreates the snapshot in an empty store.
    pub fn restore_batch(&self) -> Result<WriteBatch, SpliceError> {
        if !SNAPSHOT_SCHEMA.is_compatible(&self.schema_version) {
            return Err(SpliceError::Serde(
                ErrorInfo::new("snapshot-schema", "snapshot schema is not supported")
                    .with_context(
                        "found",
                        format!(
                            "{}.{}.{}",
                            self.schema_version.major,
                            self.schema_version.minor,
                            self.schema_version.patch
                        ),
                    ),
            ));
        }
        let mut batch = WriteBatch::new();
        for cable in &self.cables {
            batch.push(WriteOp::PutCable(cable.clone()));
        }
        for circuit in &self.circuits {
            batch.push(WriteOp::InsertCircuit(circuit.clone()));
        }
        Ok(batch)
    }

    /// Applies [`PlantSnapshot::restore_batch`] to `store`.
    pub fn restore_into<S: CircuitStore + ?Sized>(&self, store: &mut S) -> Result<(), SpliceError> {
        let batch = self.restore_batch()?;
        store.apply_batch(&batch)
    }

    /// SHA-256 over the canonical JSON encoding.
    pub fn fingerprint(&self) -> Result<String, SpliceError> {
        let bytes = serde_json::to_vec(self)
            .map_err(|err| SpliceError::Serde(ErrorInfo::new("snapshot-encode", err.to_string())))?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }
}

/// Serializes the snapshot to pretty JSON.
pub fn snapshot_to_json(snapshot: &PlantSnapshot) -> Result<String, SpliceError> {
    serde_json::to_string_pretty(snapshot)
        .map_err(|err| SpliceError::Serde(ErrorInfo::new("serialize-json", err.to_string())))
}

/// Parses a snapshot from JSON.
pub fn snapshot_from_json(json: &str) -> Result<PlantSnapshot, SpliceError> {
    serde_json::from_str(json)
        .map_err(|err| SpliceError::Serde(ErrorInfo::new("deserialize-json", err.to_string())))
}

/// Writes the snapshot as pretty JSON to `path`.
pub fn write_snapshot(path: &Path, snapshot: &PlantSnapshot) -> Result<(), SpliceError> {
    let json = snapshot_to_json(snapshot)?;
    fs::write(path, json).map_err(|err| {
        SpliceError::Serde(
            ErrorInfo::new("write-snapshot", err.to_string())
                .with_context("path", path.display().to_string()),
        )
    })
}

/// Reads a JSON snapshot from `path`.
pub fn read_snapshot(path: &Path) -> Result<PlantSnapshot, SpliceError> {
    let json = fs::read_to_string(path).map_err(|err| {
        SpliceError::Serde(
            ErrorInfo::new("read-snapshot", err.to_string())
                .with_context("path", path.display().to_string()),
        )
    })?;
    snapshot_from_json(&json)
}
