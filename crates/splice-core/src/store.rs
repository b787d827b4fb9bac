//! Storage collaborator contract and the atomic write batch it consumes.

use serde::{Deserialize, Serialize};

use crate::errors::SpliceError;
use crate::ids::{CableId, CircuitId};
use crate::types::{Cable, Circuit, CircuitFields};

/// Single mutation inside a [`WriteBatch`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WriteOp {
    /// Inserts or replaces a cable record.
    PutCable(Cable),
    /// Removes a cable record. Circuits must be deleted by their own ops.
    DeleteCable(CableId),
    /// Inserts a new circuit record.
    InsertCircuit(Circuit),
    /// Applies a partial update to an existing circuit.
    UpdateCircuit {
        /// Target circuit.
        id: CircuitId,
        /// Fields to overwrite.
        fields: CircuitFields,
    },
    /// Removes a circuit record.
    DeleteCircuit(CircuitId),
}

/// Ordered list of mutations a store must apply all-or-nothing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    /// Creates an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an operation. Empty circuit updates are dropped.
    pub fn push(&mut self, op: WriteOp) {
        if let WriteOp::UpdateCircuit { fields, .. } = &op {
            if fields.is_empty() {
                return;
            }
        }
        self.ops.push(op);
    }

    /// Appends a partial circuit update.
    pub fn update(&mut self, id: CircuitId, fields: CircuitFields) {
        self.push(WriteOp::UpdateCircuit { id, fields });
    }

    /// Moves every operation of `other` onto the end of this batch.
    pub fn extend(&mut self, other: WriteBatch) {
        for op in other.ops {
            self.push(op);
        }
    }

    /// The queued operations in application order.
    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    /// Number of queued operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Persistence collaborator the coordinator reads from and writes through.
///
/// Implementations own id minting and must apply [`WriteBatch`]es
/// transactionally: either every op lands or none do.
pub trait CircuitStore {
    /// Returns the cable with the given id.
    fn cable(&self, id: &CableId) -> Result<Cable, SpliceError>;

    /// Returns every cable, ordered by id.
    fn cables(&self) -> Result<Vec<Cable>, SpliceError>;

    /// Returns the circuit with the given id.
    fn circuit(&self, id: &CircuitId) -> Result<Circuit, SpliceError>;

    /// Returns the circuits of a cable ordered by `order_index`.
    fn circuits(&self, cable: &CableId) -> Result<Vec<Circuit>, SpliceError>;

    /// Returns every spliced circuit whose link points at `feed_cable`.
    fn spliced_to(&self, feed_cable: &CableId) -> Result<Vec<Circuit>, SpliceError>;

    /// Mints a fresh cable id.
    fn next_cable_id(&mut self) -> Result<CableId, SpliceError>;

    /// Mints a fresh circuit id.
    fn next_circuit_id(&mut self) -> Result<CircuitId, SpliceError>;

    /// Applies the batch atomically.
    fn apply_batch(&mut self, batch: &WriteBatch) -> Result<(), SpliceError>;
}
