//! Recalculation coordinator.
//!
//! Every structural change to a cable is planned as a [`WriteBatch`]: circuits
//! are reordered, re-allocated from scratch, diffed against the stored
//! records, and, for Feed cables, the splice links pointing at the cable are
//! re-translated onto the new strand positions. The batch is handed to the
//! [`CircuitStore`] in one call so readers never observe a half-updated cable.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use splice_core::errors::{ErrorInfo, SpliceError};
use splice_core::{
    Cable, CableId, CableRole, Circuit, CircuitFields, CircuitId, CircuitStore, EngineConfig,
    Medium, SpliceUpdate, WriteBatch, WriteOp,
};
use tracing::{debug, info, warn};

use crate::allocate::{allocate, identifier_lines, CapacityStatus, RejectedIdentifier};
use crate::codec;
use crate::conflict::{ensure_free, find_conflict};
use crate::matcher::{find_feed_match, require_match, FeedMatch};
use crate::segment::{ribbon_chunks, segment_from, RibbonChunk, Segmentation};

/// Outcome of a bulk paste.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkReport {
    /// Circuits created, in paste order.
    pub added: Vec<CircuitId>,
    /// Lines skipped because they did not parse.
    pub skipped: Vec<RejectedIdentifier>,
    /// Capacity verdict after the paste.
    pub status: CapacityStatus,
}

/// Ribbon breakdown of one circuit on its own cable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitChunks {
    /// Circuit being displayed.
    pub circuit_id: CircuitId,
    /// Its identifier text.
    pub identifier: String,
    /// Ribbon-aligned pieces of its strand span.
    pub chunks: Vec<RibbonChunk>,
}

/// Drives allocation, matching and conflict checks against a store.
#[derive(Debug)]
pub struct Coordinator<S> {
    store: S,
    config: EngineConfig,
}

impl<S: CircuitStore> Coordinator<S> {
    /// Wraps a store with the given policy.
    pub fn new(store: S, config: EngineConfig) -> Self {
        Self { store, config }
    }

    /// Read access to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the store, consuming the coordinator.
    pub fn into_store(self) -> S {
        self.store
    }

    /// Active policy.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ---- cables ----

    /// Creates a cable after validating its name and capacity.
    pub fn create_cable(
        &mut self,
        name: &str,
        capacity: u32,
        medium: Medium,
        role: CableRole,
    ) -> Result<CableId, SpliceError> {
        let id = self.store.next_cable_id()?;
        let batch = self.plan_create_cable(id.clone(), name, capacity, medium, role)?;
        self.commit(batch, "create cable")?;
        Ok(id)
    }

    /// Dry run of [`Coordinator::create_cable`] with a caller-supplied id.
    pub fn plan_create_cable(
        &self,
        id: CableId,
        name: &str,
        capacity: u32,
        medium: Medium,
        role: CableRole,
    ) -> Result<WriteBatch, SpliceError> {
        validate_capacity(capacity)?;
        let name = self.validate_name(name, medium, None)?;
        let mut batch = WriteBatch::new();
        batch.push(WriteOp::PutCable(Cable {
            id,
            name,
            capacity,
            medium,
            role,
        }));
        Ok(batch)
    }

    /// Renames a cable, keeping names unique within the medium.
    pub fn rename_cable(&mut self, id: &CableId, name: &str) -> Result<(), SpliceError> {
        let mut cable = self.store.cable(id)?;
        cable.name = self.validate_name(name, cable.medium, Some(id))?;
        let mut batch = WriteBatch::new();
        batch.push(WriteOp::PutCable(cable));
        self.commit(batch, "rename cable")
    }

    /// Changes capacity. Existing circuits are not re-checked.
    pub fn resize_cable(&mut self, id: &CableId, capacity: u32) -> Result<CapacityStatus, SpliceError> {
        validate_capacity(capacity)?;
        let mut cable = self.store.cable(id)?;
        cable.capacity = capacity;
        let mut batch = WriteBatch::new();
        batch.push(WriteOp::PutCable(cable));
        self.commit(batch, "resize cable")?;
        self.cable_status(id)
    }

    /// Switches the role of a cable.
    ///
    /// A cable leaving `Feed` releases every splice pointing at it; a cable
    /// becoming `Feed` drops the splice links of its own circuits.
    pub fn set_role(&mut self, id: &CableId, role: CableRole) -> Result<(), SpliceError> {
        let batch = self.plan_set_role(id, role)?;
        self.commit(batch, "change cable role")
    }

    /// Dry run of [`Coordinator::set_role`].
    pub fn plan_set_role(&self, id: &CableId, role: CableRole) -> Result<WriteBatch, SpliceError> {
        let mut cable = self.store.cable(id)?;
        let mut batch = WriteBatch::new();
        if cable.role == role {
            return Ok(batch);
        }
        match role {
            CableRole::Distribution => self.stage_release_dependents(id, &mut batch)?,
            CableRole::Feed => {
                for circuit in self.store.circuits(id)? {
                    if circuit.is_spliced() {
                        batch.update(circuit.id.clone(), clear_splice());
                    }
                }
            }
        }
        cable.role = role;
        batch.push(WriteOp::PutCable(cable));
        Ok(batch)
    }

    /// Deletes a cable with its circuits, releasing splices that point at it.
    pub fn delete_cable(&mut self, id: &CableId) -> Result<(), SpliceError> {
        let batch = self.plan_delete_cable(id)?;
        self.commit(batch, "delete cable")
    }

    /// Dry run of [`Coordinator::delete_cable`].
    pub fn plan_delete_cable(&self, id: &CableId) -> Result<WriteBatch, SpliceError> {
        let cable = self.store.cable(id)?;
        let mut batch = WriteBatch::new();
        for circuit in self.store.circuits(id)? {
            batch.push(WriteOp::DeleteCircuit(circuit.id));
        }
        if cable.is_feed() {
            self.stage_release_dependents(id, &mut batch)?;
        }
        batch.push(WriteOp::DeleteCable(cable.id));
        Ok(batch)
    }

    // ---- circuits ----

    /// Adds a circuit at `position` (appended when `None`).
    pub fn add_circuit(
        &mut self,
        cable: &CableId,
        identifier: &str,
        position: Option<usize>,
    ) -> Result<CircuitId, SpliceError> {
        let id = self.store.next_circuit_id()?;
        let batch = self.plan_add_circuit(id.clone(), cable, identifier, position)?;
        self.commit(batch, "add circuit")?;
        Ok(id)
    }

    /// Dry run of [`Coordinator::add_circuit`] with a caller-supplied id.
    pub fn plan_add_circuit(
        &self,
        id: CircuitId,
        cable_id: &CableId,
        identifier: &str,
        position: Option<usize>,
    ) -> Result<WriteBatch, SpliceError> {
        codec::parse(identifier)?;
        let cable = self.store.cable(cable_id)?;
        let previous = self.store.circuits(cable_id)?;
        let position = position.unwrap_or(previous.len());
        if position > previous.len() {
            return Err(out_of_range(&id, position, previous.len() + 1));
        }

        let mut ordered = previous.clone();
        ordered.insert(position, blank_circuit(id, cable_id, identifier));
        self.check_capacity(&cable, &ordered)?;

        let mut batch = WriteBatch::new();
        self.stage_layout(&cable, &previous, ordered, &mut batch)?;
        Ok(batch)
    }

    /// Appends one circuit per non-blank line of `text`, skipping lines that
    /// do not parse.
    pub fn add_circuits_from_text(
        &mut self,
        cable_id: &CableId,
        text: &str,
    ) -> Result<BulkReport, SpliceError> {
        let cable = self.store.cable(cable_id)?;
        let previous = self.store.circuits(cable_id)?;
        let lines = identifier_lines(text);
        let skipped = allocate(&lines).rejected;
        for rejected in &skipped {
            warn!(
                cable = %cable_id,
                line = rejected.position + 1,
                text = %rejected.text,
                "skipping malformed identifier"
            );
        }

        let mut ordered = previous.clone();
        let mut added = Vec::new();
        for (position, line) in lines.iter().enumerate() {
            if skipped.iter().any(|rejected| rejected.position == position) {
                continue;
            }
            let id = self.store.next_circuit_id()?;
            ordered.push(blank_circuit(id.clone(), cable_id, line));
            added.push(id);
        }
        self.check_capacity(&cable, &ordered)?;

        let mut batch = WriteBatch::new();
        self.stage_layout(&cable, &previous, ordered, &mut batch)?;
        self.commit(batch, "bulk add circuits")?;
        Ok(BulkReport {
            added,
            skipped,
            status: self.cable_status(cable_id)?,
        })
    }

    /// Replaces a circuit's identifier. Malformed text is rejected outright.
    ///
    /// A Distribution circuit loses its splice link; it is not re-matched.
    pub fn edit_identifier(&mut self, id: &CircuitId, identifier: &str) -> Result<(), SpliceError> {
        let batch = self.plan_edit_identifier(id, identifier)?;
        self.commit(batch, "edit identifier")
    }

    /// Dry run of [`Coordinator::edit_identifier`].
    pub fn plan_edit_identifier(
        &self,
        id: &CircuitId,
        identifier: &str,
    ) -> Result<WriteBatch, SpliceError> {
        codec::parse(identifier)?;
        let target = self.store.circuit(id)?;
        let cable = self.store.cable(&target.cable_id)?;
        let previous = self.store.circuits(&cable.id)?;
        let ordered = previous
            .iter()
            .cloned()
            .map(|mut circuit| {
                if &circuit.id == id {
                    circuit.identifier = identifier.to_string();
                    circuit.splice = None;
                }
                circuit
            })
            .collect();
        let mut batch = WriteBatch::new();
        self.stage_layout(&cable, &previous, ordered, &mut batch)?;
        Ok(batch)
    }

    /// Moves a circuit to `new_index` within its cable.
    pub fn move_circuit(&mut self, id: &CircuitId, new_index: usize) -> Result<(), SpliceError> {
        let batch = self.plan_move_circuit(id, new_index)?;
        self.commit(batch, "move circuit")
    }

    /// Dry run of [`Coordinator::move_circuit`].
    pub fn plan_move_circuit(&self, id: &CircuitId, new_index: usize) -> Result<WriteBatch, SpliceError> {
        let target = self.store.circuit(id)?;
        let cable = self.store.cable(&target.cable_id)?;
        let previous = self.store.circuits(&cable.id)?;
        if new_index >= previous.len() {
            return Err(out_of_range(id, new_index, previous.len()));
        }
        let mut ordered = previous.clone();
        let from = ordered
            .iter()
            .position(|circuit| &circuit.id == id)
            .ok_or_else(|| SpliceError::not_found("circuit", id.as_str()))?;
        let moved = ordered.remove(from);
        ordered.insert(new_index, moved);
        let mut batch = WriteBatch::new();
        self.stage_layout(&cable, &previous, ordered, &mut batch)?;
        Ok(batch)
    }

    /// Deletes a circuit and closes the gap it leaves.
    pub fn delete_circuit(&mut self, id: &CircuitId) -> Result<(), SpliceError> {
        let batch = self.plan_delete_circuit(id)?;
        self.commit(batch, "delete circuit")
    }

    /// Dry run of [`Coordinator::delete_circuit`].
    pub fn plan_delete_circuit(&self, id: &CircuitId) -> Result<WriteBatch, SpliceError> {
        let target = self.store.circuit(id)?;
        let cable = self.store.cable(&target.cable_id)?;
        let previous = self.store.circuits(&cable.id)?;
        let ordered = previous
            .iter()
            .filter(|circuit| &circuit.id != id)
            .cloned()
            .collect();
        let mut batch = WriteBatch::new();
        batch.push(WriteOp::DeleteCircuit(id.clone()));
        self.stage_layout(&cable, &previous, ordered, &mut batch)?;
        Ok(batch)
    }

    // ---- splices ----

    /// Turns the splice on or off.
    pub fn toggle_splice(&mut self, id: &CircuitId, on: bool) -> Result<Option<FeedMatch>, SpliceError> {
        if on {
            self.splice_on(id).map(Some)
        } else {
            self.splice_off(id).map(|_| None)
        }
    }

    /// Finds the containing Feed circuit and claims its strands.
    pub fn splice_on(&mut self, id: &CircuitId) -> Result<FeedMatch, SpliceError> {
        let (found, batch) = self.plan_splice_on(id)?;
        self.commit(batch, "splice on")?;
        info!(
            circuit = %id,
            feed_cable = %found.feed_cable_id,
            feed_strands = %found.feed_span,
            "spliced circuit"
        );
        Ok(found)
    }

    /// Dry run of [`Coordinator::splice_on`].
    pub fn plan_splice_on(&self, id: &CircuitId) -> Result<(FeedMatch, WriteBatch), SpliceError> {
        let circuit = self.store.circuit(id)?;
        let cable = self.store.cable(&circuit.cable_id)?;
        if cable.is_feed() {
            return Err(SpliceError::InvalidOperation(
                ErrorInfo::new("splice-on-feed", "only distribution circuits can be spliced")
                    .with_context("circuit", id.as_str())
                    .with_context("cable", cable.id.as_str()),
            ));
        }
        let feeds = self.feed_circuits(cable.medium)?;
        let found = require_match(&circuit, &feeds)?;
        let link = found.link();
        let claimed = self.store.spliced_to(&found.feed_cable_id)?;
        ensure_free(&link, id, &claimed)?;

        let mut batch = WriteBatch::new();
        batch.update(
            id.clone(),
            CircuitFields {
                splice: Some(SpliceUpdate::Set(link)),
                ..CircuitFields::default()
            },
        );
        Ok((found, batch))
    }

    /// Clears the splice link unconditionally.
    pub fn splice_off(&mut self, id: &CircuitId) -> Result<(), SpliceError> {
        let circuit = self.store.circuit(id)?;
        let mut batch = WriteBatch::new();
        if circuit.is_spliced() {
            batch.update(id.clone(), clear_splice());
        }
        self.commit(batch, "splice off")
    }

    // ---- reads ----

    /// Assigned strands versus capacity.
    pub fn cable_status(&self, id: &CableId) -> Result<CapacityStatus, SpliceError> {
        let cable = self.store.cable(id)?;
        let circuits = self.store.circuits(id)?;
        let identifiers: Vec<&str> = circuits.iter().map(|c| c.identifier.as_str()).collect();
        Ok(allocate(&identifiers).capacity_status(cable.capacity))
    }

    /// Display rows for a circuit's splice. Unspliced circuits are invalid.
    pub fn splice_rows(&self, id: &CircuitId) -> Result<Segmentation, SpliceError> {
        let circuit = self.store.circuit(id)?;
        let cable = self.store.cable(&circuit.cable_id)?;
        let logical_start = codec::parse(&circuit.identifier)
            .map(|parsed| parsed.range_start)
            .unwrap_or(1);
        Ok(segment_from(
            logical_start,
            circuit.span(),
            circuit.splice.as_ref().map(|link| link.feed_span()),
            cable.group_size(),
        ))
    }

    /// Ribbon breakdown of every circuit on a cable.
    pub fn ribbon_view(&self, id: &CableId) -> Result<Vec<CircuitChunks>, SpliceError> {
        let cable = self.store.cable(id)?;
        Ok(self
            .store
            .circuits(id)?
            .into_iter()
            .map(|circuit| CircuitChunks {
                chunks: ribbon_chunks(circuit.span(), cable.group_size()),
                circuit_id: circuit.id,
                identifier: circuit.identifier,
            })
            .collect())
    }

    // ---- internals ----

    fn commit(&mut self, batch: WriteBatch, action: &str) -> Result<(), SpliceError> {
        if batch.is_empty() {
            debug!(action, "nothing to write");
            return Ok(());
        }
        self.store.apply_batch(&batch)?;
        info!(action, ops = batch.len(), "committed batch");
        Ok(())
    }

    fn validate_name(
        &self,
        name: &str,
        medium: Medium,
        excluding: Option<&CableId>,
    ) -> Result<String, SpliceError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(SpliceError::InvalidOperation(ErrorInfo::new(
                "empty-cable-name",
                "cable name must not be empty",
            )));
        }
        let lowered = trimmed.to_lowercase();
        let clash = self.store.cables()?.into_iter().find(|cable| {
            cable.medium == medium
                && Some(&cable.id) != excluding
                && cable.name.to_lowercase() == lowered
        });
        if let Some(existing) = clash {
            return Err(SpliceError::InvalidOperation(
                ErrorInfo::new("duplicate-cable-name", "a cable with this name already exists")
                    .with_context("name", trimmed)
                    .with_context("existing", existing.id.as_str())
                    .with_context("medium", medium.as_str()),
            ));
        }
        Ok(trimmed.to_string())
    }

    fn check_capacity(&self, cable: &Cable, ordered: &[Circuit]) -> Result<(), SpliceError> {
        let identifiers: Vec<&str> = ordered.iter().map(|c| c.identifier.as_str()).collect();
        let status = allocate(&identifiers).capacity_status(cable.capacity);
        if !status.over_capacity {
            return Ok(());
        }
        if !self.config.enforce_capacity_on_create {
            warn!(
                cable = %cable.id,
                assigned = status.assigned,
                capacity = status.capacity,
                "cable is over capacity"
            );
            return Ok(());
        }
        Err(SpliceError::CapacityExceeded(
            ErrorInfo::new(
                "over-capacity",
                format!(
                    "circuits need {} strands but cable `{}` has {}",
                    status.assigned, cable.name, status.capacity
                ),
            )
            .with_context("cable", cable.id.as_str())
            .with_context("assigned", status.assigned.to_string())
            .with_context("capacity", status.capacity.to_string())
            .with_hint("resize the cable or shorten the circuit ranges"),
        ))
    }

    fn feed_circuits(&self, medium: Medium) -> Result<Vec<Circuit>, SpliceError> {
        let mut circuits = Vec::new();
        for cable in self.store.cables()? {
            if cable.is_feed() && cable.medium == medium {
                circuits.extend(self.store.circuits(&cable.id)?);
            }
        }
        Ok(circuits)
    }

    fn stage_release_dependents(&self, feed: &CableId, batch: &mut WriteBatch) -> Result<(), SpliceError> {
        for dependent in self.store.spliced_to(feed)? {
            debug!(circuit = %dependent.id, feed_cable = %feed, "releasing splice");
            batch.update(dependent.id, clear_splice());
        }
        Ok(())
    }

    /// Relayouts `ordered`, diffs against `previous` into `batch`, and re-translates
    /// dependents when the cable is a Feed.
    fn stage_layout(
        &self,
        cable: &Cable,
        previous: &[Circuit],
        ordered: Vec<Circuit>,
        batch: &mut WriteBatch,
    ) -> Result<Vec<Circuit>, SpliceError> {
        let laid_out = relayout(&cable.id, ordered);
        let before: BTreeMap<&CircuitId, &Circuit> =
            previous.iter().map(|circuit| (&circuit.id, circuit)).collect();
        for circuit in &laid_out {
            match before.get(&circuit.id) {
                Some(stored) => batch.update(circuit.id.clone(), changes(stored, circuit)),
                None => batch.push(WriteOp::InsertCircuit(circuit.clone())),
            }
        }
        debug!(cable = %cable.id, circuits = laid_out.len(), "recalculated allocation");
        if cable.is_feed() {
            self.stage_propagation(&cable.id, &laid_out, batch)?;
        }
        Ok(laid_out)
    }

    fn stage_propagation(
        &self,
        feed: &CableId,
        feed_circuits: &[Circuit],
        batch: &mut WriteBatch,
    ) -> Result<(), SpliceError> {
        let mut settled = self.store.spliced_to(feed)?;
        let mut moved = Vec::new();
        for dependent in settled.iter_mut() {
            let identifier = match codec::parse(&dependent.identifier) {
                Ok(identifier) => identifier,
                Err(err) => {
                    warn!(circuit = %dependent.id, error = %err, "spliced circuit has a malformed identifier");
                    continue;
                }
            };
            let Some(found) = find_feed_match(&identifier, feed_circuits) else {
                warn!(
                    circuit = %dependent.id,
                    identifier = %dependent.identifier,
                    feed_cable = %feed,
                    "no feed circuit contains the range any more; keeping the previous feed strands"
                );
                continue;
            };
            let link = found.link();
            if dependent.splice.as_ref() != Some(&link) {
                batch.update(
                    dependent.id.clone(),
                    CircuitFields {
                        splice: Some(SpliceUpdate::Set(link.clone())),
                        ..CircuitFields::default()
                    },
                );
                dependent.splice = Some(link);
                moved.push(dependent.id.clone());
            }
        }
        // Only splice-on is gated; re-translated claims may now overlap.
        for id in &moved {
            let Some(link) = settled.iter().find(|c| &c.id == id).and_then(|c| c.splice.as_ref()) else {
                continue;
            };
            if let Some(other) = find_conflict(
                &link.feed_cable_id,
                link.feed_strand_start,
                link.feed_strand_end,
                id,
                &settled,
            ) {
                warn!(
                    circuit = %id,
                    other = %other.id,
                    feed_cable = %feed,
                    feed_start = link.feed_strand_start,
                    feed_end = link.feed_strand_end,
                    "re-translated splice overlaps another claim on the feed cable"
                );
            }
        }
        Ok(())
    }
}

/// Re-derives order indices and spans for `ordered` on one cable.
///
/// Circuits whose identifiers do not parse keep their stored span and take
/// no strands from the ones after them.
pub fn relayout(cable: &CableId, ordered: Vec<Circuit>) -> Vec<Circuit> {
    let identifiers: Vec<&str> = ordered.iter().map(|c| c.identifier.as_str()).collect();
    let allocation = allocate(&identifiers);
    for rejected in &allocation.rejected {
        warn!(cable = %cable, text = %rejected.text, "circuit identifier does not parse; span left as stored");
    }
    let mut spans = vec![None; ordered.len()];
    for entry in allocation.spans {
        spans[entry.position] = Some(entry.span);
    }
    ordered
        .into_iter()
        .zip(spans)
        .enumerate()
        .map(|(index, (mut circuit, span))| {
            circuit.order_index = index;
            if let Some(span) = span {
                circuit.strand_start = span.start;
                circuit.strand_end = span.end;
            }
            circuit
        })
        .collect()
}

fn changes(before: &Circuit, after: &Circuit) -> CircuitFields {
    let mut fields = CircuitFields::default();
    if before.identifier != after.identifier {
        fields.identifier = Some(after.identifier.clone());
    }
    if before.order_index != after.order_index {
        fields.order_index = Some(after.order_index);
    }
    if before.span() != after.span() {
        fields.span = Some(after.span());
    }
    if before.splice != after.splice {
        fields.splice = Some(match &after.splice {
            Some(link) => SpliceUpdate::Set(link.clone()),
            None => SpliceUpdate::Clear,
        });
    }
    fields
}

fn clear_splice() -> CircuitFields {
    CircuitFields {
        splice: Some(SpliceUpdate::Clear),
        ..CircuitFields::default()
    }
}

fn blank_circuit(id: CircuitId, cable: &CableId, identifier: &str) -> Circuit {
    Circuit {
        id,
        cable_id: cable.clone(),
        identifier: identifier.to_string(),
        order_index: 0,
        strand_start: 0,
        strand_end: 0,
        splice: None,
    }
}

fn validate_capacity(capacity: u32) -> Result<(), SpliceError> {
    if capacity == 0 {
        return Err(SpliceError::InvalidOperation(ErrorInfo::new(
            "zero-capacity",
            "cable capacity must be positive",
        )));
    }
    Ok(())
}

fn out_of_range(id: &CircuitId, index: usize, len: usize) -> SpliceError {
    SpliceError::InvalidOperation(
        ErrorInfo::new("position-out-of-range", "position is outside the cable's circuit list")
            .with_context("circuit", id.as_str())
            .with_context("position", index.to_string())
            .with_context("slots", len.to_string()),
    )
}
