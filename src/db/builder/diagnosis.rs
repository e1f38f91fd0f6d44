use std::str::FromStr;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::appointment::appointment_exists;
use super::{BuildError, ReferentialError};
use crate::db::StoreError;
use crate::models::enums::DiagnosisStatus;
use crate::models::{Diagnosis, DiagnosisCode};

pub struct DiagnosisBuilder<'c> {
    conn: &'c Connection,
    row: Diagnosis,
}

impl<'c> DiagnosisBuilder<'c> {
    pub fn load_or_create(conn: &'c Connection, id: Option<&str>) -> Result<Self, StoreError> {
        if let Some(id) = id {
            if let Some(row) = get_diagnosis(conn, id)? {
                return Ok(Self { conn, row });
            }
        }

        let row = Diagnosis {
            id: id
                .map(str::to_owned)
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            appointment_id: None,
            last_updated_ts: Utc::now().timestamp(),
            status: DiagnosisStatus::Thesis,
        };
        conn.execute(
            "INSERT INTO diagnoses (id, appointment_id, last_updated_ts, status)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                row.id,
                row.appointment_id,
                row.last_updated_ts,
                row.status.as_str(),
            ],
        )?;
        Ok(Self { conn, row })
    }

    pub fn id(&self) -> &str {
        &self.row.id
    }

    pub fn row(&self) -> &Diagnosis {
        &self.row
    }

    /// Point the diagnosis at an existing appointment.
    pub fn set_appointment(&mut self, appointment_id: &str) -> Result<(), BuildError> {
        if !appointment_exists(self.conn, appointment_id)? {
            return Err(ReferentialError {
                entity: "appointment",
                id: appointment_id.to_owned(),
            }
            .into());
        }
        self.row.appointment_id = Some(appointment_id.to_owned());
        Ok(())
    }

    pub fn set_status(&mut self, status: DiagnosisStatus) {
        self.row.status = status;
    }

    pub fn set_last_updated_ts(&mut self, ts: i64) {
        self.row.last_updated_ts = ts;
    }

    /// Flush scalar fields to the store.
    pub fn save(&self) -> Result<(), StoreError> {
        self.conn.execute(
            "UPDATE diagnoses SET appointment_id = ?2, last_updated_ts = ?3, status = ?4
             WHERE id = ?1",
            params![
                self.row.id,
                self.row.appointment_id,
                self.row.last_updated_ts,
                self.row.status.as_str(),
            ],
        )?;
        Ok(())
    }

    /// Remove this diagnosis's join rows. The code catalog itself is
    /// shared across diagnoses and stays untouched.
    pub fn clear_details(&self) -> Result<(), StoreError> {
        self.conn.execute(
            "DELETE FROM diagnosis_details WHERE diagnosis_id = ?1",
            params![self.row.id],
        )?;
        Ok(())
    }

    /// Link this diagnosis to a code, creating the catalog row on first
    /// use. Single-writer: the lookup-then-insert runs inside the
    /// caller's transaction scope.
    pub fn add_detail(
        &self,
        code: &str,
        name: &str,
        system: Option<&str>,
    ) -> Result<(), StoreError> {
        let code_row = find_or_create_code(self.conn, code, name, system)?;

        self.conn.execute(
            "INSERT INTO diagnosis_details (diagnosis_id, diagnosis_code_id) VALUES (?1, ?2)",
            params![self.row.id, code_row.id],
        )?;
        Ok(())
    }
}

pub fn get_diagnosis(conn: &Connection, id: &str) -> Result<Option<Diagnosis>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, appointment_id, last_updated_ts, status FROM diagnoses WHERE id = ?1",
    )?;

    let row = stmt
        .query_row(params![id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
            ))
        })
        .optional()?;

    let Some((id, appointment_id, last_updated_ts, status)) = row else {
        return Ok(None);
    };

    Ok(Some(Diagnosis {
        id,
        appointment_id,
        last_updated_ts,
        status: DiagnosisStatus::from_str(&status)?,
    }))
}

/// Look the code up by its natural key; insert it on first use.
pub fn find_or_create_code(
    conn: &Connection,
    code: &str,
    name: &str,
    system: Option<&str>,
) -> Result<DiagnosisCode, StoreError> {
    let existing = conn
        .query_row(
            "SELECT id, code, name, system FROM diagnosis_codes WHERE code = ?1",
            params![code],
            |row| {
                Ok(DiagnosisCode {
                    id: row.get(0)?,
                    code: row.get(1)?,
                    name: row.get(2)?,
                    system: row.get(3)?,
                })
            },
        )
        .optional()?;

    if let Some(code_row) = existing {
        return Ok(code_row);
    }

    conn.execute(
        "INSERT INTO diagnosis_codes (code, name, system) VALUES (?1, ?2, ?3)",
        params![code, name, system],
    )?;
    Ok(DiagnosisCode {
        id: conn.last_insert_rowid(),
        code: code.to_owned(),
        name: name.to_owned(),
        system: system.map(str::to_owned),
    })
}
