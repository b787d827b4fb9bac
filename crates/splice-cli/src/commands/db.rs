use std::error::Error;
use std::path::PathBuf;

use clap::{Args, Subcommand};
use serde::Serialize;
use splice_core::{CableId, CableRole, Circuit, CircuitId, CircuitStore, Medium};
use splice_engine::{CapacityStatus, Coordinator, Segmentation};
use splice_store::{write_snapshot, PlantSnapshot, SqliteStore};

use super::emit_json;
use crate::config::CliConfig;

#[derive(Args, Debug)]
pub struct DbArgs {
    /// SQLite file; falls back to `database` in the config file.
    #[arg(long)]
    pub database: Option<PathBuf>,
    #[command(subcommand)]
    pub command: DbCommand,
}

#[derive(Subcommand, Debug)]
pub enum DbCommand {
    /// Create the database file and its tables.
    Init,
    /// Add a cable and print its id.
    CableAdd {
        #[arg(long)]
        name: String,
        #[arg(long)]
        capacity: u32,
        /// Feed or Distribution.
        #[arg(long)]
        role: CableRole,
        #[arg(long)]
        medium: Option<Medium>,
    },
    /// Add circuits to a cable, one identifier or a file of pasted lines.
    CircuitAdd {
        #[arg(long)]
        cable: String,
        #[arg(long, required_unless_present = "from", conflicts_with = "from")]
        identifier: Option<String>,
        /// Text file with one identifier per line; malformed lines are skipped.
        #[arg(long)]
        from: Option<PathBuf>,
        /// Zero-based slot; appends when omitted.
        #[arg(long)]
        position: Option<usize>,
    },
    /// Replace a circuit's identifier.
    CircuitEdit {
        #[arg(long)]
        circuit: String,
        #[arg(long)]
        identifier: String,
    },
    /// Move a circuit to a new zero-based index.
    CircuitMove {
        #[arg(long)]
        circuit: String,
        #[arg(long)]
        index: usize,
    },
    /// Delete a circuit and close the gap.
    CircuitDelete {
        #[arg(long)]
        circuit: String,
    },
    /// Splice a Distribution circuit onto its Feed circuit.
    Splice {
        #[arg(long)]
        circuit: String,
    },
    /// Remove a circuit's splice.
    Unsplice {
        #[arg(long)]
        circuit: String,
    },
    /// Print cables, or one cable's circuits with their splice rows.
    Show {
        #[arg(long)]
        cable: Option<String>,
    },
    /// Dump the whole database as a JSON snapshot.
    Export {
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Debug, Serialize)]
struct CableSummary {
    id: CableId,
    name: String,
    medium: Medium,
    role: CableRole,
    status: CapacityStatus,
}

#[derive(Debug, Serialize)]
struct CircuitView {
    #[serde(flatten)]
    circuit: Circuit,
    rows: Segmentation,
}

pub fn run(args: &DbArgs, config: &CliConfig) -> Result<(), Box<dyn Error>> {
    let path = config.database_path(args.database.as_deref())?;
    let store = SqliteStore::open(&path)?;
    let mut coord = Coordinator::new(store, config.engine_config(None));
    match &args.command {
        DbCommand::Init => emit_json(&serde_json::json!({ "database": path.display().to_string() })),
        DbCommand::CableAdd {
            name,
            capacity,
            role,
            medium,
        } => {
            let medium = medium.unwrap_or(coord.config().default_medium);
            let id = coord.create_cable(name, *capacity, medium, *role)?;
            emit_json(&serde_json::json!({ "cable": id }))
        }
        DbCommand::CircuitAdd {
            cable,
            identifier,
            from,
            position,
        } => {
            let cable = CableId::from_raw(cable.as_str());
            match (identifier, from) {
                (Some(identifier), _) => {
                    let id = coord.add_circuit(&cable, identifier, *position)?;
                    let status = coord.cable_status(&cable)?;
                    emit_json(&serde_json::json!({ "circuit": id, "status": status }))
                }
                (None, Some(from)) => {
                    let text = std::fs::read_to_string(from)?;
                    let report = coord.add_circuits_from_text(&cable, &text)?;
                    emit_json(&report)
                }
                (None, None) => Err("pass --identifier or --from".into()),
            }
        }
        DbCommand::CircuitEdit {
            circuit,
            identifier,
        } => {
            let id = CircuitId::from_raw(circuit.as_str());
            coord.edit_identifier(&id, identifier)?;
            emit_json(&coord.store().circuit(&id)?)
        }
        DbCommand::CircuitMove { circuit, index } => {
            let id = CircuitId::from_raw(circuit.as_str());
            coord.move_circuit(&id, *index)?;
            emit_json(&coord.store().circuit(&id)?)
        }
        DbCommand::CircuitDelete { circuit } => {
            coord.delete_circuit(&CircuitId::from_raw(circuit.as_str()))?;
            emit_json(&serde_json::json!({ "deleted": circuit }))
        }
        DbCommand::Splice { circuit } => {
            let found = coord.splice_on(&CircuitId::from_raw(circuit.as_str()))?;
            emit_json(&found)
        }
        DbCommand::Unsplice { circuit } => {
            coord.splice_off(&CircuitId::from_raw(circuit.as_str()))?;
            emit_json(&serde_json::json!({ "unspliced": circuit }))
        }
        DbCommand::Show { cable: None } => {
            let mut cables = Vec::new();
            for cable in coord.store().cables()? {
                cables.push(CableSummary {
                    status: coord.cable_status(&cable.id)?,
                    id: cable.id,
                    name: cable.name,
                    medium: cable.medium,
                    role: cable.role,
                });
            }
            emit_json(&cables)
        }
        DbCommand::Show { cable: Some(cable) } => {
            let cable = CableId::from_raw(cable.as_str());
            let mut circuits = Vec::new();
            for circuit in coord.store().circuits(&cable)? {
                circuits.push(CircuitView {
                    rows: coord.splice_rows(&circuit.id)?,
                    circuit,
                });
            }
            emit_json(&circuits)
        }
        DbCommand::Export { out } => {
            let snapshot = PlantSnapshot::capture(coord.store())?;
            match out {
                Some(out) => {
                    write_snapshot(out, &snapshot)?;
                    emit_json(&serde_json::json!({ "fingerprint": snapshot.fingerprint()? }))
                }
                None => emit_json(&snapshot),
            }
        }
    }
}
