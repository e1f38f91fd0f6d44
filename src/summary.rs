//! Read model — reconstructs the denormalized appointment summary
//! document from normalized rows.
//!
//! Projections are assembled with a fixed field order and second-precision
//! UTC timestamps, so serializing the same rows twice yields identical
//! bytes.

use std::str::FromStr;

use chrono::DateTime;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use crate::db::builder::{get_survey_for_appointment, get_user, user_contacts, user_names};
use crate::db::StoreError;
use crate::models::enums::{AppointmentStatus, ContactChannel, DiagnosisStatus, Gender, UserRole};
use crate::models::{Appointment, Diagnosis, PostAppointmentSurvey};

/// One entry per given name; a name record without given names
/// contributes nothing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NameView {
    pub last_name: Option<String>,
    pub first_name: String,
    pub name_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContactView {
    pub channel: ContactChannel,
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserView {
    pub id: String,
    pub role: UserRole,
    pub is_active: bool,
    pub birth_date: Option<String>,
    pub gender: Option<Gender>,
    pub names: Vec<NameView>,
    pub contact_info: Vec<ContactView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppointmentView {
    pub id: String,
    pub status: AppointmentStatus,
    pub start_time: String,
    pub end_time: String,
    pub doctor_id: Option<String>,
    pub patient_id: Option<String>,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosisCodeView {
    pub code: String,
    pub name: String,
    pub system: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosisView {
    pub id: String,
    pub appointment_id: Option<String>,
    pub status: DiagnosisStatus,
    pub last_updated_time: String,
    pub codes: Vec<DiagnosisCodeView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurveyView {
    pub id: String,
    pub appointment_id: Option<String>,
    pub recommendation_rating: i64,
    pub is_diagnosis_explained: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnosis_feedback: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_feeling: Option<String>,
}

/// The five-key summary document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppointmentSummary {
    pub appointment: AppointmentView,
    pub patient: UserView,
    pub doctor: Option<UserView>,
    pub diagnosis: Option<DiagnosisView>,
    pub survey: Option<SurveyView>,
}

fn format_utc_ts(ts: i64) -> String {
    DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_default()
}

/// Full user projection including names and contact info.
pub fn project_user(conn: &Connection, user_id: &str) -> Result<Option<UserView>, StoreError> {
    let Some(user) = get_user(conn, user_id)? else {
        return Ok(None);
    };

    let mut names = Vec::new();
    let mut given_stmt = conn.prepare(
        "SELECT given_name FROM user_given_names WHERE user_name_id = ?1 ORDER BY id",
    )?;
    for name in user_names(conn, user_id)? {
        let given_rows = given_stmt.query_map(params![name.id], |row| row.get::<_, String>(0))?;
        for given in given_rows {
            names.push(NameView {
                last_name: name.family_name.clone(),
                first_name: given?,
                name_text: name.name_text.clone(),
            });
        }
    }

    let contact_info = user_contacts(conn, user_id)?
        .into_iter()
        .map(|c| ContactView {
            channel: c.channel,
            label: c.label,
            value: c.value,
        })
        .collect();

    Ok(Some(UserView {
        id: user.id,
        role: user.role,
        is_active: user.is_active,
        birth_date: user.birth_date.map(|d| d.format("%Y-%m-%d").to_string()),
        gender: user.gender,
        names,
        contact_info,
    }))
}

/// Appointment projection with computed end time and reason list.
pub fn project_appointment(
    conn: &Connection,
    appt: &Appointment,
) -> Result<AppointmentView, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT reason_text FROM appointment_reasons WHERE appointment_id = ?1 ORDER BY id",
    )?;
    let rows = stmt.query_map(params![appt.id], |row| row.get::<_, String>(0))?;
    let reasons = rows.collect::<Result<Vec<_>, _>>()?;

    Ok(AppointmentView {
        id: appt.id.clone(),
        status: appt.status,
        start_time: format_utc_ts(appt.start_time_ts),
        end_time: format_utc_ts(appt.start_time_ts + appt.duration_secs),
        doctor_id: appt.doctor_id.clone(),
        patient_id: appt.patient_id.clone(),
        reasons,
    })
}

/// Diagnosis projection with its resolved code list.
pub fn project_diagnosis(
    conn: &Connection,
    diagnosis: &Diagnosis,
) -> Result<DiagnosisView, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT c.code, c.name, c.system
         FROM diagnosis_details d
         JOIN diagnosis_codes c ON c.id = d.diagnosis_code_id
         WHERE d.diagnosis_id = ?1
         ORDER BY d.id",
    )?;
    let rows = stmt.query_map(params![diagnosis.id], |row| {
        Ok(DiagnosisCodeView {
            code: row.get(0)?,
            name: row.get(1)?,
            system: row.get(2)?,
        })
    })?;
    let codes = rows.collect::<Result<Vec<_>, _>>()?;

    Ok(DiagnosisView {
        id: diagnosis.id.clone(),
        appointment_id: diagnosis.appointment_id.clone(),
        status: diagnosis.status,
        last_updated_time: format_utc_ts(diagnosis.last_updated_ts),
        codes,
    })
}

pub fn project_survey(survey: &PostAppointmentSurvey) -> SurveyView {
    SurveyView {
        id: survey.id.clone(),
        appointment_id: survey.appointment_id.clone(),
        recommendation_rating: survey.recommendation_rating,
        is_diagnosis_explained: survey.is_diagnosis_explained,
        diagnosis_feedback: survey.diagnosis_feedback.clone(),
        patient_feeling: survey.patient_feeling.clone(),
    }
}

fn latest_appointment_for_patient(
    conn: &Connection,
    patient_id: &str,
) -> Result<Option<Appointment>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, start_time_ts, duration_secs, status, doctor_id, patient_id
         FROM appointments WHERE patient_id = ?1
         ORDER BY start_time_ts DESC, id DESC LIMIT 1",
    )?;

    let row = stmt
        .query_row(params![patient_id], |row| {
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

fn diagnosis_for_appointment(
    conn: &Connection,
    appointment_id: &str,
) -> Result<Option<Diagnosis>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, appointment_id, last_updated_ts, status
         FROM diagnoses WHERE appointment_id = ?1 ORDER BY id LIMIT 1",
    )?;

    let row = stmt
        .query_row(params![appointment_id], |row| {
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

/// Assemble the summary document for the patient's most-recently-started
/// appointment. `Ok(None)` when the patient has no appointments; the
/// patient row itself must exist.
pub fn most_recent_appointment_summary(
    conn: &Connection,
    patient_id: &str,
) -> Result<Option<AppointmentSummary>, StoreError> {
    let Some(patient) = project_user(conn, patient_id)? else {
        return Err(StoreError::NotFound {
            entity: "user",
            id: patient_id.to_owned(),
        });
    };

    let Some(appt) = latest_appointment_for_patient(conn, patient_id)? else {
        return Ok(None);
    };

    let doctor = match &appt.doctor_id {
        Some(doctor_id) => project_user(conn, doctor_id)?,
        None => None,
    };

    let diagnosis = match diagnosis_for_appointment(conn, &appt.id)? {
        Some(diagnosis) => Some(project_diagnosis(conn, &diagnosis)?),
        None => None,
    };

    let survey = get_survey_for_appointment(conn, &appt.id)?.map(|s| project_survey(&s));

    Ok(Some(AppointmentSummary {
        appointment: project_appointment(conn, &appt)?,
        patient,
        doctor,
        diagnosis,
        survey,
    }))
}
