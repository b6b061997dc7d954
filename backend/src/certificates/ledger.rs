//! Append-only issuance ledger backed by SQLite.
//!
//! The table layout matches the historical `certificates.db` file so an
//! existing database can be opened as is. Rows are only ever inserted.

use crate::certificates::numbering::{CertificateNumber, NumberingAuthority};
use crate::error::{IssuanceError, Result};
use common::model::certificate::{CertificateRecord, NewCertificate};
use log::{debug, error};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS certificates (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        certificate_number TEXT,
        student_name TEXT,
        pdf_path TEXT
    )";

const SELECT_COLUMNS: &str = "SELECT id, certificate_number, student_name, pdf_path FROM certificates";

/// Shared handle to the ledger database. Cloning is cheap.
#[derive(Clone)]
pub struct Ledger {
    conn: Arc<Mutex<Connection>>,
}

impl Ledger {
    /// Opens (or creates) the ledger file at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| IssuanceError::Storage(e.to_string()))?;
        }
        Self::from_connection(Connection::open(path)?)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        // Other connections can still read while a reservation holds the
        // write lock. Callers sharing this handle wait on the mutex instead.
        let _mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        conn.execute(SCHEMA, [])?;
        Ok(Ledger {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| IssuanceError::Storage("ledger connection lock poisoned".to_string()))
    }

    /// Persists `new` and returns it with its assigned id. Issuance goes
    /// through `reserve_and_append`; this is for seeding a ledger.
    #[cfg(test)]
    pub fn append(&self, new: &NewCertificate) -> Result<CertificateRecord> {
        let conn = self.lock()?;
        insert(&conn, new)
    }

    /// The most recently appended record, by insertion order.
    pub fn latest(&self) -> Result<Option<CertificateRecord>> {
        let conn = self.lock()?;
        latest(&conn)
    }

    /// Runs raw SQL against the ledger database.
    #[cfg(test)]
    pub(crate) fn execute_batch(&self, sql: &str) -> Result<()> {
        self.lock()?.execute_batch(sql)?;
        Ok(())
    }

    /// Every record in insertion order.
    pub fn list(&self) -> Result<Vec<CertificateRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!("{} ORDER BY id ASC", SELECT_COLUMNS))?;
        let records = stmt
            .query_map([], map_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    pub fn find_by_number(&self, certificate_number: &str) -> Result<Option<CertificateRecord>> {
        let conn = self.lock()?;
        let record = conn
            .query_row(
                &format!(
                    "{} WHERE certificate_number = ?1 ORDER BY id DESC LIMIT 1",
                    SELECT_COLUMNS
                ),
                params![certificate_number],
                map_record,
            )
            .optional()?;
        Ok(record)
    }

    /// Reserves the next certificate number and records the certificate.
    ///
    /// "Read latest, compute next, insert" runs inside one IMMEDIATE
    /// transaction, so no other connection (in this process or another one)
    /// can mint the same number in between. `produce` receives the reserved
    /// number and returns the artifact location; if it fails the transaction
    /// is rolled back and nothing is recorded.
    pub fn reserve_and_append<F>(
        &self,
        authority: &NumberingAuthority,
        recipient_name: &str,
        produce: F,
    ) -> Result<CertificateRecord>
    where
        F: FnOnce(&CertificateNumber) -> Result<String>,
    {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let number = authority.next_number(latest(&tx)?.as_ref());
        debug!("Reserved certificate number {} (sequence {})", number, number.sequence());

        let artifact_location = produce(&number)?;

        let new = NewCertificate {
            certificate_number: number.to_string(),
            recipient_name: recipient_name.to_string(),
            artifact_location,
        };
        let record = match insert(&tx, &new).and_then(|record| {
            tx.commit()?;
            Ok(record)
        }) {
            Ok(record) => record,
            Err(e) => {
                error!(
                    "Certificate {} was rendered to {} but could not be recorded: {}",
                    new.certificate_number, new.artifact_location, e
                );
                return Err(e);
            }
        };
        Ok(record)
    }
}

fn insert(conn: &Connection, new: &NewCertificate) -> Result<CertificateRecord> {
    conn.execute(
        "INSERT INTO certificates (certificate_number, student_name, pdf_path) VALUES (?1, ?2, ?3)",
        params![new.certificate_number, new.recipient_name, new.artifact_location],
    )?;
    Ok(CertificateRecord {
        id: conn.last_insert_rowid(),
        certificate_number: new.certificate_number.clone(),
        recipient_name: new.recipient_name.clone(),
        artifact_location: new.artifact_location.clone(),
    })
}

fn latest(conn: &Connection) -> Result<Option<CertificateRecord>> {
    let record = conn
        .query_row(
            &format!("{} ORDER BY id DESC LIMIT 1", SELECT_COLUMNS),
            [],
            map_record,
        )
        .optional()?;
    Ok(record)
}

fn map_record(row: &Row<'_>) -> rusqlite::Result<CertificateRecord> {
    Ok(CertificateRecord {
        id: row.get(0)?,
        certificate_number: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        recipient_name: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        artifact_location: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
    })
}
