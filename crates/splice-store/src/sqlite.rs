use std::path::Path;

use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use splice_core::errors::{ErrorInfo, SpliceError};
use splice_core::{
    Cable, CableId, Circuit, CircuitId, CircuitStore, SpliceLink, WriteBatch, WriteOp,
};
use tracing::debug;

use crate::memory::batch_failed;

/// Version stamped into the `meta` table.
pub const SCHEMA_VERSION: i64 = 1;

const CABLE_COLUMNS: &str = "id, name, capacity, group_size, medium, role";
const CIRCUIT_COLUMNS: &str = "id, cable_id, identifier, order_index, strand_start, strand_end, \
     is_spliced, feed_cable_id, feed_strand_start, feed_strand_end";

/// SQLite-backed store. Each batch runs inside one transaction.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens (creating if needed) a database file and ensures the schema.
    pub fn open(path: &Path) -> Result<Self, SpliceError> {
        let conn = Connection::open(path).map_err(sql("splice_store.open"))?;
        Self::with_connection(conn)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> Result<Self, SpliceError> {
        let conn = Connection::open_in_memory().map_err(sql("splice_store.open"))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, SpliceError> {
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    fn mint(&mut self, kind: &str) -> Result<i64, SpliceError> {
        let tx = self.conn.transaction().map_err(sql("splice_store.mint"))?;
        tx.execute(
            "INSERT INTO counters(kind, value) VALUES (?1, 1)
             ON CONFLICT(kind) DO UPDATE SET value = value + 1",
            params![kind],
        )
        .map_err(sql("splice_store.mint"))?;
        let value: i64 = tx
            .query_row("SELECT value FROM counters WHERE kind = ?1", params![kind], |row| row.get(0))
            .map_err(sql("splice_store.mint"))?;
        tx.commit().map_err(sql("splice_store.mint"))?;
        Ok(value)
    }

    fn exists(&self, table: &str, id: &str) -> Result<bool, SpliceError> {
        let query = format!("SELECT 1 FROM {table} WHERE id = ?1");
        self.conn
            .query_row(&query, params![id], |_| Ok(()))
            .optional()
            .map(|found| found.is_some())
            .map_err(sql("splice_store.query"))
    }

    fn query_circuits(&self, filter: &str, order: &str, key: &str) -> Result<Vec<Circuit>, SpliceError> {
        let query = format!("SELECT {CIRCUIT_COLUMNS} FROM circuits WHERE {filter} ORDER BY {order}");
        let mut stmt = self.conn.prepare(&query).map_err(sql("splice_store.query"))?;
        let rows = stmt
            .query_map(params![key], circuit_from_row)
            .map_err(sql("splice_store.query"))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(sql("splice_store.query"))
    }
}

/// Creates the tables and checks the stored schema version.
pub fn init_schema(conn: &Connection) -> Result<(), SpliceError> {
    conn.execute_batch(
        "BEGIN;
        CREATE TABLE IF NOT EXISTS meta(version INTEGER NOT NULL);
        CREATE TABLE IF NOT EXISTS counters(
            kind TEXT PRIMARY KEY,
            value INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS cables(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            capacity INTEGER NOT NULL,
            group_size INTEGER NOT NULL,
            medium TEXT NOT NULL,
            role TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS circuits(
            id TEXT PRIMARY KEY,
            cable_id TEXT NOT NULL,
            identifier TEXT NOT NULL,
            order_index INTEGER NOT NULL,
            strand_start INTEGER NOT NULL,
            strand_end INTEGER NOT NULL,
            is_spliced INTEGER NOT NULL DEFAULT 0,
            feed_cable_id TEXT,
            feed_strand_start INTEGER,
            feed_strand_end INTEGER,
            FOREIGN KEY(cable_id) REFERENCES cables(id)
        );
        CREATE INDEX IF NOT EXISTS circuits_by_cable ON circuits(cable_id, order_index);
        CREATE INDEX IF NOT EXISTS circuits_by_feed ON circuits(feed_cable_id);
        COMMIT;",
    )
    .map_err(sql("splice_store.schema"))?;
    set_version(conn, SCHEMA_VERSION)
}

fn set_version(conn: &Connection, version: i64) -> Result<(), SpliceError> {
    let existing: Option<i64> = conn
        .query_row("SELECT version FROM meta LIMIT 1", [], |row| row.get(0))
        .optional()
        .map_err(sql("splice_store.schema"))?;
    match existing {
        Some(current) if current == version => Ok(()),
        Some(current) => Err(SpliceError::Serde(ErrorInfo::new(
            "splice_store.schema_version",
            format!("database schema {current} incompatible with expected {version}"),
        ))),
        None => {
            conn.execute("INSERT INTO meta(version) VALUES (?1)", params![version])
                .map_err(sql("splice_store.schema"))?;
            Ok(())
        }
    }
}

impl CircuitStore for SqliteStore {
    fn cable(&self, id: &CableId) -> Result<Cable, SpliceError> {
        let query = format!("SELECT {CABLE_COLUMNS} FROM cables WHERE id = ?1");
        self.conn
            .query_row(&query, params![id.as_str()], cable_from_row)
            .optional()
            .map_err(sql("splice_store.query"))?
            .ok_or_else(|| SpliceError::not_found("cable", id.as_str()))
    }

    fn cables(&self) -> Result<Vec<Cable>, SpliceError> {
        let query = format!("SELECT {CABLE_COLUMNS} FROM cables ORDER BY id");
        let mut stmt = self.conn.prepare(&query).map_err(sql("splice_store.query"))?;
        let rows = stmt
            .query_map([], cable_from_row)
            .map_err(sql("splice_store.query"))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(sql("splice_store.query"))
    }

    fn circuit(&self, id: &CircuitId) -> Result<Circuit, SpliceError> {
        let query = format!("SELECT {CIRCUIT_COLUMNS} FROM circuits WHERE id = ?1");
        self.conn
            .query_row(&query, params![id.as_str()], circuit_from_row)
            .optional()
            .map_err(sql("splice_store.query"))?
            .ok_or_else(|| SpliceError::not_found("circuit", id.as_str()))
    }

    fn circuits(&self, cable: &CableId) -> Result<Vec<Circuit>, SpliceError> {
        if !self.exists("cables", cable.as_str())? {
            return Err(SpliceError::not_found("cable", cable.as_str()));
        }
        self.query_circuits("cable_id = ?1", "order_index, id", cable.as_str())
    }

    fn spliced_to(&self, feed_cable: &CableId) -> Result<Vec<Circuit>, SpliceError> {
        self.query_circuits(
            "is_spliced = 1 AND feed_cable_id = ?1",
            "cable_id, order_index",
            feed_cable.as_str(),
        )
    }

    fn next_cable_id(&mut self) -> Result<CableId, SpliceError> {
        loop {
            let id = format!("cab-{:06}", self.mint("cable")?);
            if !self.exists("cables", &id)? {
                return Ok(CableId::from_raw(id));
            }
        }
    }

    fn next_circuit_id(&mut self) -> Result<CircuitId, SpliceError> {
        loop {
            let id = format!("cir-{:06}", self.mint("circuit")?);
            if !self.exists("circuits", &id)? {
                return Ok(CircuitId::from_raw(id));
            }
        }
    }

    fn apply_batch(&mut self, batch: &WriteBatch) -> Result<(), SpliceError> {
        let tx = self.conn.transaction().map_err(sql("splice_store.batch"))?;
        for (index, op) in batch.ops().iter().enumerate() {
            // Dropping `tx` on error rolls the whole batch back.
            apply_op(&tx, op).map_err(|err| batch_failed(index, err))?;
        }
        tx.commit().map_err(sql("splice_store.batch"))?;
        debug!(ops = batch.len(), "sqlite batch committed");
        Ok(())
    }
}

fn apply_op(tx: &Transaction<'_>, op: &WriteOp) -> Result<(), SpliceError> {
    match op {
        WriteOp::PutCable(cable) => {
            tx.execute(
                "INSERT INTO cables(id, name, capacity, group_size, medium, role)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(id) DO UPDATE SET name = ?2, capacity = ?3, group_size = ?4,
                     medium = ?5, role = ?6",
                params![
                    cable.id.as_str(),
                    cable.name,
                    cable.capacity,
                    cable.group_size(),
                    cable.medium.as_str(),
                    cable.role.as_str()
                ],
            )
            .map_err(sql("splice_store.put_cable"))?;
        }
        WriteOp::DeleteCable(id) => {
            let owned: i64 = tx
                .query_row(
                    "SELECT COUNT(*) FROM circuits WHERE cable_id = ?1",
                    params![id.as_str()],
                    |row| row.get(0),
                )
                .map_err(sql("splice_store.delete_cable"))?;
            if owned > 0 {
                return Err(SpliceError::Store(
                    ErrorInfo::new("cable-has-circuits", "cable still owns circuits")
                        .with_context("id", id.as_str()),
                ));
            }
            let removed = tx
                .execute("DELETE FROM cables WHERE id = ?1", params![id.as_str()])
                .map_err(sql("splice_store.delete_cable"))?;
            if removed == 0 {
                return Err(SpliceError::not_found("cable", id.as_str()));
            }
        }
        WriteOp::InsertCircuit(circuit) => {
            let cable_known: Option<i64> = tx
                .query_row(
                    "SELECT 1 FROM cables WHERE id = ?1",
                    params![circuit.cable_id.as_str()],
                    |row| row.get(0),
                )
                .optional()
                .map_err(sql("splice_store.insert_circuit"))?;
            if cable_known.is_none() {
                return Err(SpliceError::not_found("cable", circuit.cable_id.as_str()));
            }
            write_circuit(tx, circuit, "INSERT")?;
        }
        WriteOp::UpdateCircuit { id, fields } => {
            let query = format!("SELECT {CIRCUIT_COLUMNS} FROM circuits WHERE id = ?1");
            let mut circuit = tx
                .query_row(&query, params![id.as_str()], circuit_from_row)
                .optional()
                .map_err(sql("splice_store.update_circuit"))?
                .ok_or_else(|| SpliceError::not_found("circuit", id.as_str()))?;
            fields.apply_to(&mut circuit);
            write_circuit(tx, &circuit, "REPLACE")?;
        }
        WriteOp::DeleteCircuit(id) => {
            let removed = tx
                .execute("DELETE FROM circuits WHERE id = ?1", params![id.as_str()])
                .map_err(sql("splice_store.delete_circuit"))?;
            if removed == 0 {
                return Err(SpliceError::not_found("circuit", id.as_str()));
            }
        }
    }
    Ok(())
}

fn write_circuit(tx: &Transaction<'_>, circuit: &Circuit, verb: &str) -> Result<(), SpliceError> {
    let query = format!(
        "{verb} INTO circuits({CIRCUIT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
    );
    let link = circuit.splice.as_ref();
    tx.execute(
        &query,
        params![
            circuit.id.as_str(),
            circuit.cable_id.as_str(),
            circuit.identifier,
            circuit.order_index as i64,
            circuit.strand_start,
            circuit.strand_end,
            link.is_some(),
            link.map(|l| l.feed_cable_id.as_str()),
            link.map(|l| l.feed_strand_start),
            link.map(|l| l.feed_strand_end),
        ],
    )
    .map_err(sql("splice_store.write_circuit"))?;
    Ok(())
}

fn cable_from_row(row: &Row<'_>) -> rusqlite::Result<Cable> {
    let medium: String = row.get(4)?;
    let role: String = row.get(5)?;
    Ok(Cable {
        id: CableId::from_raw(row.get::<_, String>(0)?),
        name: row.get(1)?,
        capacity: row.get(2)?,
        medium: medium.parse().map_err(|err| conversion(4, err))?,
        role: role.parse().map_err(|err| conversion(5, err))?,
    })
}

fn circuit_from_row(row: &Row<'_>) -> rusqlite::Result<Circuit> {
    let is_spliced: bool = row.get(6)?;
    let feed_cable: Option<String> = row.get(7)?;
    let feed_start: Option<u32> = row.get(8)?;
    let feed_end: Option<u32> = row.get(9)?;
    let splice = match (is_spliced, feed_cable, feed_start, feed_end) {
        (true, Some(cable), Some(start), Some(end)) => Some(SpliceLink {
            feed_cable_id: CableId::from_raw(cable),
            feed_strand_start: start,
            feed_strand_end: end,
        }),
        _ => None,
    };
    let order_index: i64 = row.get(3)?;
    Ok(Circuit {
        id: CircuitId::from_raw(row.get::<_, String>(0)?),
        cable_id: CableId::from_raw(row.get::<_, String>(1)?),
        identifier: row.get(2)?,
        order_index: usize::try_from(order_index).map_err(|err| {
            rusqlite::Error::FromSqlConversionFailure(3, Type::Integer, Box::new(err))
        })?,
        strand_start: row.get(4)?,
        strand_end: row.get(5)?,
        splice,
    })
}

fn conversion(column: usize, err: SpliceError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(err))
}

fn sql(code: &'static str) -> impl Fn(rusqlite::Error) -> SpliceError {
    move |err| SpliceError::Store(ErrorInfo::new(code, err.to_string()))
}
