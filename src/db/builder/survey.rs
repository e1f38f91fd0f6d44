use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::appointment::appointment_exists;
use super::{BuildError, ReferentialError};
use crate::db::StoreError;
use crate::models::survey::DEFAULT_RECOMMENDATION_RATING;
use crate::models::PostAppointmentSurvey;

pub struct SurveyBuilder<'c> {
    conn: &'c Connection,
    row: PostAppointmentSurvey,
}

impl<'c> SurveyBuilder<'c> {
    pub fn load_or_create(conn: &'c Connection, id: Option<&str>) -> Result<Self, StoreError> {
        if let Some(id) = id {
            if let Some(row) = get_survey(conn, id)? {
                return Ok(Self { conn, row });
            }
        }

        let row = PostAppointmentSurvey {
            id: id
                .map(str::to_owned)
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            appointment_id: None,
            recommendation_rating: DEFAULT_RECOMMENDATION_RATING,
            is_diagnosis_explained: false,
            diagnosis_feedback: None,
            patient_feeling: None,
        };
        conn.execute(
            "INSERT INTO surveys (id, appointment_id, recommendation_rating, is_diagnosis_explained,
                                  diagnosis_feedback, patient_feeling)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                row.id,
                row.appointment_id,
                row.recommendation_rating,
                row.is_diagnosis_explained,
                row.diagnosis_feedback,
                row.patient_feeling,
            ],
        )?;
        Ok(Self { conn, row })
    }

    pub fn id(&self) -> &str {
        &self.row.id
    }

    pub fn row(&self) -> &PostAppointmentSurvey {
        &self.row
    }

    /// Point the survey at an existing appointment.
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

    pub fn set_recommendation_rating(&mut self, rating: i64) {
        self.row.recommendation_rating = rating;
    }

    /// Store the raw feedback text together with its yes/no
    /// classification.
    pub fn set_diagnosis_feedback(&mut self, feedback_text: &str, is_diagnosis_explained: bool) {
        self.row.diagnosis_feedback = Some(feedback_text.to_owned());
        self.row.is_diagnosis_explained = is_diagnosis_explained;
    }

    pub fn set_patient_feeling(&mut self, feeling_text: &str) {
        self.row.patient_feeling = Some(feeling_text.to_owned());
    }

    /// Flush scalar fields to the store.
    pub fn save(&self) -> Result<(), StoreError> {
        self.conn.execute(
            "UPDATE surveys
             SET appointment_id = ?2, recommendation_rating = ?3, is_diagnosis_explained = ?4,
                 diagnosis_feedback = ?5, patient_feeling = ?6
             WHERE id = ?1",
            params![
                self.row.id,
                self.row.appointment_id,
                self.row.recommendation_rating,
                self.row.is_diagnosis_explained,
                self.row.diagnosis_feedback,
                self.row.patient_feeling,
            ],
        )?;
        Ok(())
    }
}

pub fn get_survey(conn: &Connection, id: &str) -> Result<Option<PostAppointmentSurvey>, StoreError> {
    query_survey(
        conn,
        "SELECT id, appointment_id, recommendation_rating, is_diagnosis_explained,
                diagnosis_feedback, patient_feeling
         FROM surveys WHERE id = ?1",
        id,
    )
}

/// At most one survey per appointment is expected; ties resolve by id.
pub fn get_survey_for_appointment(
    conn: &Connection,
    appointment_id: &str,
) -> Result<Option<PostAppointmentSurvey>, StoreError> {
    query_survey(
        conn,
        "SELECT id, appointment_id, recommendation_rating, is_diagnosis_explained,
                diagnosis_feedback, patient_feeling
         FROM surveys WHERE appointment_id = ?1 ORDER BY id LIMIT 1",
        appointment_id,
    )
}

fn query_survey(
    conn: &Connection,
    sql: &str,
    key: &str,
) -> Result<Option<PostAppointmentSurvey>, StoreError> {
    let mut stmt = conn.prepare(sql)?;

    let row = stmt
        .query_row(params![key], |row| {
            Ok(PostAppointmentSurvey {
                id: row.get(0)?,
                appointment_id: row.get(1)?,
                recommendation_rating: row.get(2)?,
                is_diagnosis_explained: row.get(3)?,
                diagnosis_feedback: row.get(4)?,
                patient_feeling: row.get(5)?,
            })
        })
        .optional()?;
    Ok(row)
}
