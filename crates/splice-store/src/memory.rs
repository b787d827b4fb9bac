use std::collections::BTreeMap;

use splice_core::errors::{ErrorInfo, SpliceError};
use splice_core::{Cable, CableId, Circuit, CircuitId, CircuitStore, WriteBatch, WriteOp};
use tracing::debug;

/// BTreeMap-backed store. Batches are applied to a scratch copy and swapped
/// in only when every operation succeeds.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Tables,
    next_cable: u64,
    next_circuit: u64,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    cables: BTreeMap<CableId, Cable>,
    circuits: BTreeMap<CircuitId, Circuit>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored circuits across all cables.
    pub fn circuit_count(&self) -> usize {
        self.tables.circuits.len()
    }
}

impl Tables {
    fn apply(&mut self, op: &WriteOp) -> Result<(), SpliceError> {
        match op {
            WriteOp::PutCable(cable) => {
                self.cables.insert(cable.id.clone(), cable.clone());
            }
            WriteOp::DeleteCable(id) => {
                if self.circuits.values().any(|circuit| &circuit.cable_id == id) {
                    return Err(rejected("cable-has-circuits", "cable still owns circuits", id.as_str()));
                }
                self.cables
                    .remove(id)
                    .ok_or_else(|| SpliceError::not_found("cable", id.as_str()))?;
            }
            WriteOp::InsertCircuit(circuit) => {
                if !self.cables.contains_key(&circuit.cable_id) {
                    return Err(SpliceError::not_found("cable", circuit.cable_id.as_str()));
                }
                if self.circuits.contains_key(&circuit.id) {
                    return Err(rejected("duplicate-circuit", "circuit id already exists", circuit.id.as_str()));
                }
                self.circuits.insert(circuit.id.clone(), circuit.clone());
            }
            WriteOp::UpdateCircuit { id, fields } => {
                let circuit = self
                    .circuits
                    .get_mut(id)
                    .ok_or_else(|| SpliceError::not_found("circuit", id.as_str()))?;
                fields.apply_to(circuit);
            }
            WriteOp::DeleteCircuit(id) => {
                self.circuits
                    .remove(id)
                    .ok_or_else(|| SpliceError::not_found("circuit", id.as_str()))?;
            }
        }
        Ok(())
    }
}

impl CircuitStore for MemoryStore {
    fn cable(&self, id: &CableId) -> Result<Cable, SpliceError> {
        self.tables
            .cables
            .get(id)
            .cloned()
            .ok_or_else(|| SpliceError::not_found("cable", id.as_str()))
    }

    fn cables(&self) -> Result<Vec<Cable>, SpliceError> {
        Ok(self.tables.cables.values().cloned().collect())
    }

    fn circuit(&self, id: &CircuitId) -> Result<Circuit, SpliceError> {
        self.tables
            .circuits
            .get(id)
            .cloned()
            .ok_or_else(|| SpliceError::not_found("circuit", id.as_str()))
    }

    fn circuits(&self, cable: &CableId) -> Result<Vec<Circuit>, SpliceError> {
        if !self.tables.cables.contains_key(cable) {
            return Err(SpliceError::not_found("cable", cable.as_str()));
        }
        let mut circuits: Vec<Circuit> = self
            .tables
            .circuits
            .values()
            .filter(|circuit| &circuit.cable_id == cable)
            .cloned()
            .collect();
        circuits.sort_by(|a, b| a.order_index.cmp(&b.order_index).then_with(|| a.id.cmp(&b.id)));
        Ok(circuits)
    }

    fn spliced_to(&self, feed_cable: &CableId) -> Result<Vec<Circuit>, SpliceError> {
        let mut circuits: Vec<Circuit> = self
            .tables
            .circuits
            .values()
            .filter(|circuit| {
                circuit
                    .splice
                    .as_ref()
                    .is_some_and(|link| &link.feed_cable_id == feed_cable)
            })
            .cloned()
            .collect();
        circuits.sort_by(|a, b| {
            a.cable_id
                .cmp(&b.cable_id)
                .then_with(|| a.order_index.cmp(&b.order_index))
        });
        Ok(circuits)
    }

    fn next_cable_id(&mut self) -> Result<CableId, SpliceError> {
        loop {
            self.next_cable += 1;
            let id = CableId::from_raw(format!("cab-{:06}", self.next_cable));
            if !self.tables.cables.contains_key(&id) {
                return Ok(id);
            }
        }
    }

    fn next_circuit_id(&mut self) -> Result<CircuitId, SpliceError> {
        loop {
            self.next_circuit += 1;
            let id = CircuitId::from_raw(format!("cir-{:06}", self.next_circuit));
            if !self.tables.circuits.contains_key(&id) {
                return Ok(id);
            }
        }
    }

    fn apply_batch(&mut self, batch: &WriteBatch) -> Result<(), SpliceError> {
        let mut scratch = self.tables.clone();
        for (index, op) in batch.ops().iter().enumerate() {
            scratch.apply(op).map_err(|err| batch_failed(index, err))?;
        }
        self.tables = scratch;
        debug!(ops = batch.len(), "memory batch committed");
        Ok(())
    }
}

fn rejected(code: &str, message: &str, id: &str) -> SpliceError {
    SpliceError::Store(ErrorInfo::new(code, message).with_context("id", id))
}

/// Wraps the failing op's error so callers see which position broke the batch.
/// The inner context (ids, cable names) is carried over; `op` and `cause`
/// are set last.
pub(crate) fn batch_failed(index: usize, err: SpliceError) -> SpliceError {
    let info = err.info().clone();
    let mut wrapped =
        ErrorInfo::new("batch-rejected", format!("batch rejected at op {index}: {}", info.message));
    wrapped.context = info.context;
    wrapped.hint = info.hint;
    SpliceError::Store(
        wrapped
            .with_context("op", index.to_string())
            .with_context("cause", info.code),
    )
}
