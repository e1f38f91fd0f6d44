use std::str::FromStr;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::user::user_exists;
use super::{BuildError, ReferentialError};
use crate::db::StoreError;
use crate::models::appointment::DEFAULT_DURATION_SECS;
use crate::models::enums::AppointmentStatus;
use crate::models::Appointment;

pub struct AppointmentBuilder<'c> {
    conn: &'c Connection,
    row: Appointment,
}

impl<'c> AppointmentBuilder<'c> {
    pub fn load_or_create(conn: &'c Connection, id: Option<&str>) -> Result<Self, StoreError> {
        if let Some(id) = id {
            if let Some(row) = get_appointment(conn, id)? {
                return Ok(Self { conn, row });
            }
        }

        let row = Appointment {
            id: id
                .map(str::to_owned)
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            start_time_ts: Utc::now().timestamp(),
            duration_secs: DEFAULT_DURATION_SECS,
            status: AppointmentStatus::Scheduled,
            doctor_id: None,
            patient_id: None,
        };
        conn.execute(
            "INSERT INTO appointments (id, start_time_ts, duration_secs, status, doctor_id, patient_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                row.id,
                row.start_time_ts,
                row.duration_secs,
                row.status.as_str(),
                row.doctor_id,
                row.patient_id,
            ],
        )?;
        Ok(Self { conn, row })
    }

    pub fn id(&self) -> &str {
        &self.row.id
    }

    pub fn row(&self) -> &Appointment {
        &self.row
    }

    /// Point the appointment at an existing doctor user.
    pub fn set_doctor(&mut self, doctor_id: &str) -> Result<(), BuildError> {
        if !user_exists(self.conn, doctor_id)? {
            return Err(ReferentialError {
                entity: "user",
                id: doctor_id.to_owned(),
            }
            .into());
        }
        self.row.doctor_id = Some(doctor_id.to_owned());
        Ok(())
    }

    /// Point the appointment at an existing patient user.
    pub fn set_patient(&mut self, patient_id: &str) -> Result<(), BuildError> {
        if !user_exists(self.conn, patient_id)? {
            return Err(ReferentialError {
                entity: "user",
                id: patient_id.to_owned(),
            }
            .into());
        }
        self.row.patient_id = Some(patient_id.to_owned());
        Ok(())
    }

    pub fn set_schedule(&mut self, start_time_ts: i64, duration_secs: i64) {
        self.row.start_time_ts = start_time_ts;
        self.row.duration_secs = duration_secs;
    }

    pub fn set_status(&mut self, status: AppointmentStatus) {
        self.row.status = status;
    }

    /// Flush scalar fields to the store.
    pub fn save(&self) -> Result<(), StoreError> {
        self.conn.execute(
            "UPDATE appointments
             SET start_time_ts = ?2, duration_secs = ?3, status = ?4, doctor_id = ?5, patient_id = ?6
             WHERE id = ?1",
            params![
                self.row.id,
                self.row.start_time_ts,
                self.row.duration_secs,
                self.row.status.as_str(),
                self.row.doctor_id,
                self.row.patient_id,
            ],
        )?;
        Ok(())
    }

    /// Idempotent; a no-op when no reasons exist.
    pub fn clear_reasons(&self) -> Result<(), StoreError> {
        self.conn.execute(
            "DELETE FROM appointment_reasons WHERE appointment_id = ?1",
            params![self.row.id],
        )?;
        Ok(())
    }

    pub fn add_reason(&self, reason_text: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO appointment_reasons (appointment_id, reason_text) VALUES (?1, ?2)",
            params![self.row.id, reason_text],
        )?;
        Ok(())
    }
}

pub fn get_appointment(conn: &Connection, id: &str) -> Result<Option<Appointment>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, start_time_ts, duration_secs, status, doctor_id, patient_id
         FROM appointments WHERE id = ?1",
    )?;

    let row = stmt
        .query_row(params![id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, Option<String>>(5)?,
            ))
        })
        .optional()?;

    let Some((id, start_time_ts, duration_secs, status, doctor_id, patient_id)) = row else {
        return Ok(None);
    };

    Ok(Some(Appointment {
        id,
        start_time_ts,
        duration_secs,
        status: AppointmentStatus::from_str(&status)?,
        doctor_id,
        patient_id,
    }))
}

pub fn appointment_exists(conn: &Connection, id: &str) -> Result<bool, StoreError> {
    let found = conn
        .query_row(
            "SELECT 1 FROM appointments WHERE id = ?1",
            params![id],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}
