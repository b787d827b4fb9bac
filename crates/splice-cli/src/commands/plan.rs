use std::collections::BTreeMap;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use serde::{Deserialize, Serialize};
use splice_core::{CableId, CableRole, CircuitStore, Medium};
use splice_engine::Coordinator;
use splice_store::{write_snapshot, MemoryStore, PlantSnapshot};
use tracing::warn;

use super::emit_json;
use crate::config::CliConfig;

#[derive(Args, Debug)]
pub struct PlanArgs {
    /// YAML plant description (cables, circuits, splices).
    #[arg(long)]
    pub plant: PathBuf,
    /// Write the resulting snapshot here instead of stdout.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

/// Plant description read by `splice plan`.
#[derive(Debug, Clone, Deserialize)]
pub struct PlantFile {
    #[serde(default)]
    pub cables: Vec<CableEntry>,
    #[serde(default)]
    pub splices: Vec<SpliceEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CableEntry {
    pub name: String,
    pub capacity: u32,
    #[serde(default)]
    pub medium: Option<Medium>,
    pub role: CableRole,
    #[serde(default)]
    pub circuits: Vec<String>,
}

/// Splice request naming a Distribution circuit by cable name and identifier.
#[derive(Debug, Clone, Deserialize)]
pub struct SpliceEntry {
    pub cable: String,
    pub identifier: String,
}

#[derive(Debug, Serialize)]
struct PlanSummary {
    fingerprint: String,
    cables: usize,
    circuits: usize,
    spliced: usize,
    failed_splices: Vec<FailedSplice>,
}

#[derive(Debug, Serialize)]
struct FailedSplice {
    cable: String,
    identifier: String,
    code: String,
    message: String,
}

pub fn run(args: &PlanArgs, config: &CliConfig) -> Result<(), Box<dyn Error>> {
    let (snapshot, failed) = build(&load_plant(&args.plant)?, config)?;
    match args.out.as_deref() {
        Some(out) => {
            write_snapshot(out, &snapshot)?;
            emit_json(&summarize(&snapshot, failed)?)
        }
        None => {
            for failure in &failed {
                warn!(cable = %failure.cable, identifier = %failure.identifier, code = %failure.code, "splice not made");
            }
            emit_json(&snapshot)
        }
    }
}

fn load_plant(path: &Path) -> Result<PlantFile, Box<dyn Error>> {
    let text = fs::read_to_string(path)
        .map_err(|err| format!("failed to read plant {}: {err}", path.display()))?;
    Ok(serde_yaml::from_str(&text)?)
}

fn summarize(snapshot: &PlantSnapshot, failed_splices: Vec<FailedSplice>) -> Result<PlanSummary, Box<dyn Error>> {
    Ok(PlanSummary {
        fingerprint: snapshot.fingerprint()?,
        cables: snapshot.cables.len(),
        circuits: snapshot.circuits.len(),
        spliced: snapshot.circuits.iter().filter(|c| c.is_spliced()).count(),
        failed_splices,
    })
}

/// Builds the plant in memory. Structural errors abort; splice requests that
/// find no feed or collide are collected instead.
fn build(plant: &PlantFile, config: &CliConfig) -> Result<(PlantSnapshot, Vec<FailedSplice>), Box<dyn Error>> {
    let mut coord = Coordinator::new(MemoryStore::new(), config.engine_config(None));
    let mut by_name: BTreeMap<String, CableId> = BTreeMap::new();
    for entry in &plant.cables {
        let medium = entry.medium.unwrap_or(coord.config().default_medium);
        let id = coord.create_cable(&entry.name, entry.capacity, medium, entry.role)?;
        for identifier in &entry.circuits {
            coord.add_circuit(&id, identifier, None)?;
        }
        by_name.insert(entry.name.trim().to_lowercase(), id);
    }

    let mut failed = Vec::new();
    for request in &plant.splices {
        let cable = by_name
            .get(&request.cable.trim().to_lowercase())
            .ok_or_else(|| format!("splice names unknown cable `{}`", request.cable))?;
        let circuit = coord
            .store()
            .circuits(cable)?
            .into_iter()
            .find(|circuit| circuit.identifier.trim() == request.identifier.trim())
            .ok_or_else(|| {
                format!("cable `{}` has no circuit `{}`", request.cable, request.identifier)
            })?;
        if let Err(err) = coord.splice_on(&circuit.id) {
            failed.push(FailedSplice {
                cable: request.cable.clone(),
                identifier: request.identifier.clone(),
                code: err.info().code.clone(),
                message: err.info().message.clone(),
            });
        }
    }
    Ok((PlantSnapshot::capture(coord.store())?, failed))
}
