//! Import pipeline — loads one bundled JSON document of appointment
//! resources into the relational store.
//!
//! Entries are partitioned by their `resourceType` tag and processed in
//! referential-dependency order: patients, doctors, appointments,
//! diagnoses. The whole bundle is one transaction.

use std::path::Path;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::db::builder::{
    AppointmentBuilder, BuildError, DiagnosisBuilder, ReferentialError, UserBuilder,
};
use crate::db::StoreError;
use crate::models::enums::{
    AppointmentStatus, ContactChannel, DiagnosisStatus, DomainError, Gender, UserRole,
};

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("failed to read bundle file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed bundle JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Referential(#[from] ReferentialError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("invalid {field} value {value:?}: {source}")]
    InvalidTime {
        field: &'static str,
        value: String,
        source: chrono::ParseError,
    },
}

impl From<BuildError> for ImportError {
    fn from(e: BuildError) -> Self {
        match e {
            BuildError::Store(e) => Self::Store(e),
            BuildError::Referential(e) => Self::Referential(e),
        }
    }
}

/// A resource entry without the fields its tag promises. Logged and
/// skipped, never raised out of the import.
#[derive(Error, Debug)]
#[error("resource entry missing expected shape: {reason}")]
pub struct InputShapeError {
    pub reason: String,
}

/// The consumed bundle document: an unordered `entry` list of typed
/// resources.
#[derive(Debug, Clone, Deserialize)]
pub struct Bundle {
    #[serde(default)]
    pub entry: Vec<BundleEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BundleEntry {
    #[serde(default)]
    pub resource: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct UserResource {
    id: Option<String>,
    #[serde(rename = "birthDate")]
    birth_date: Option<String>,
    gender: Option<String>,
    active: Option<bool>,
    #[serde(default)]
    name: Vec<NameEntry>,
    #[serde(default)]
    contact: Vec<ContactEntry>,
}

#[derive(Debug, Deserialize)]
struct NameEntry {
    family: Option<String>,
    text: Option<String>,
    #[serde(default)]
    given: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ContactEntry {
    system: String,
    #[serde(rename = "use")]
    label: String,
    value: String,
}

/// A relationship-reference string of the form `<TypeName>/<id>`.
#[derive(Debug, Deserialize)]
struct Reference {
    reference: String,
}

#[derive(Debug, Deserialize)]
struct Period {
    start: String,
    end: String,
}

#[derive(Debug, Deserialize)]
struct ReasonEntry {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AppointmentResource {
    id: Option<String>,
    actor: Reference,
    subject: Reference,
    period: Period,
    #[serde(default, rename = "type")]
    reason_type: Vec<ReasonEntry>,
    status: String,
}

#[derive(Debug, Deserialize)]
struct Meta {
    #[serde(rename = "lastUpdated")]
    last_updated: String,
}

#[derive(Debug, Deserialize)]
struct CodeBlock {
    #[serde(default)]
    coding: Vec<Coding>,
}

#[derive(Debug, Deserialize)]
struct Coding {
    code: String,
    name: String,
    system: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DiagnosisResource {
    id: Option<String>,
    appointment: Reference,
    meta: Meta,
    code: Option<CodeBlock>,
    status: String,
}

/// What one import call touched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    pub users: usize,
    pub appointments: usize,
    pub diagnoses: usize,
    pub skipped: usize,
}

/// Read and parse a bundle document from disk.
pub fn read_bundle(path: &Path) -> Result<Bundle, ImportError> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Import a bundle in a single transaction: commit on success, roll back
/// everything on any error.
pub fn import_bundle(conn: &mut Connection, bundle: &Bundle) -> Result<ImportReport, ImportError> {
    let tx = conn.transaction().map_err(StoreError::from)?;
    let report = run_import(&tx, bundle)?;
    tx.commit().map_err(StoreError::from)?;

    tracing::info!(
        users = report.users,
        appointments = report.appointments,
        diagnoses = report.diagnoses,
        skipped = report.skipped,
        "Bundle imported"
    );
    Ok(report)
}

#[derive(Default)]
struct Partition {
    patients: Vec<Value>,
    doctors: Vec<Value>,
    appointments: Vec<Value>,
    diagnoses: Vec<Value>,
    skipped: usize,
}

/// Split entries into the four aggregate roles by their (case-insensitive)
/// `resourceType` tag. Entries without a usable tag are logged and skipped.
fn partition_entries(bundle: &Bundle) -> Partition {
    let mut partition = Partition::default();

    for entry in &bundle.entry {
        let Some(resource) = &entry.resource else {
            let err = InputShapeError {
                reason: "entry has no resource object".into(),
            };
            tracing::warn!(error = %err, "Skipping bundle entry");
            partition.skipped += 1;
            continue;
        };

        let Some(tag) = resource.get("resourceType").and_then(Value::as_str) else {
            let err = InputShapeError {
                reason: "resource has no resourceType tag".into(),
            };
            tracing::warn!(error = %err, "Skipping bundle entry");
            partition.skipped += 1;
            continue;
        };

        match tag.to_ascii_lowercase().as_str() {
            "patient" => partition.patients.push(resource.clone()),
            "doctor" => partition.doctors.push(resource.clone()),
            "appointment" => partition.appointments.push(resource.clone()),
            "diagnosis" => partition.diagnoses.push(resource.clone()),
            other => {
                tracing::warn!(resource_type = other, "Unexpected resource type, skipping entry");
                partition.skipped += 1;
            }
        }
    }

    partition
}

/// Fixed creation order: patient and doctor users, then appointments
/// (which reference them), then diagnoses (which reference appointments).
fn run_import(conn: &Connection, bundle: &Bundle) -> Result<ImportReport, ImportError> {
    let partition = partition_entries(bundle);
    let mut report = ImportReport {
        skipped: partition.skipped,
        ..ImportReport::default()
    };

    for value in partition.patients {
        match serde_json::from_value::<UserResource>(value) {
            Ok(resource) => {
                create_user(conn, UserRole::Patient, &resource)?;
                report.users += 1;
            }
            Err(e) => skip_malformed(&mut report, "patient", e),
        }
    }

    for value in partition.doctors {
        match serde_json::from_value::<UserResource>(value) {
            Ok(resource) => {
                create_user(conn, UserRole::Doctor, &resource)?;
                report.users += 1;
            }
            Err(e) => skip_malformed(&mut report, "doctor", e),
        }
    }

    for value in partition.appointments {
        match serde_json::from_value::<AppointmentResource>(value) {
            Ok(resource) => {
                create_appointment(conn, &resource)?;
                report.appointments += 1;
            }
            Err(e) => skip_malformed(&mut report, "appointment", e),
        }
    }

    for value in partition.diagnoses {
        match serde_json::from_value::<DiagnosisResource>(value) {
            Ok(resource) => {
                create_diagnosis(conn, &resource)?;
                report.diagnoses += 1;
            }
            Err(e) => skip_malformed(&mut report, "diagnosis", e),
        }
    }

    Ok(report)
}

fn skip_malformed(report: &mut ImportReport, role: &'static str, e: serde_json::Error) {
    let err = InputShapeError {
        reason: e.to_string(),
    };
    tracing::warn!(role, error = %err, "Skipping malformed resource entry");
    report.skipped += 1;
}

fn create_user(
    conn: &Connection,
    role: UserRole,
    resource: &UserResource,
) -> Result<(), ImportError> {
    let mut builder = UserBuilder::load_or_create(conn, resource.id.as_deref())?;
    builder.set_role(role);

    if let Some(birth_date) = &resource.birth_date {
        let date = NaiveDate::parse_from_str(birth_date, "%Y-%m-%d").map_err(|source| {
            ImportError::InvalidTime {
                field: "birthDate",
                value: birth_date.clone(),
                source,
            }
        })?;
        builder.set_birth_date(date);
    }

    if let Some(gender) = &resource.gender {
        builder.set_gender(Gender::from_str(gender)?);
    }

    builder.set_is_active(resource.active.unwrap_or(true));

    builder.clear_names()?;
    for name in &resource.name {
        builder.add_name(name.family.as_deref(), name.text.as_deref(), &name.given)?;
    }

    builder.clear_contact_info()?;
    for contact in &resource.contact {
        builder.add_contact_info(
            ContactChannel::from_str(&contact.system)?,
            &contact.label,
            &contact.value,
        )?;
    }

    builder.save()?;
    Ok(())
}

fn create_appointment(conn: &Connection, resource: &AppointmentResource) -> Result<(), ImportError> {
    let doctor_id = reference_id("doctor", &resource.actor)?;
    let patient_id = reference_id("patient", &resource.subject)?;

    let mut builder = AppointmentBuilder::load_or_create(conn, resource.id.as_deref())?;
    builder.set_doctor(doctor_id)?;
    builder.set_patient(patient_id)?;

    let start_ts = parse_utc_timestamp("period.start", &resource.period.start)?;
    let end_ts = parse_utc_timestamp("period.end", &resource.period.end)?;
    builder.set_schedule(start_ts, end_ts - start_ts);

    builder.clear_reasons()?;
    for reason in &resource.reason_type {
        if let Some(text) = &reason.text {
            builder.add_reason(text)?;
        }
    }

    builder.set_status(AppointmentStatus::from_str(&resource.status)?);
    builder.save()?;
    Ok(())
}

fn create_diagnosis(conn: &Connection, resource: &DiagnosisResource) -> Result<(), ImportError> {
    let appointment_id = reference_id("appointment", &resource.appointment)?;

    let mut builder = DiagnosisBuilder::load_or_create(conn, resource.id.as_deref())?;
    builder.set_appointment(appointment_id)?;
    builder.set_last_updated_ts(parse_utc_timestamp(
        "meta.lastUpdated",
        &resource.meta.last_updated,
    )?);

    builder.clear_details()?;
    if let Some(code) = &resource.code {
        for coding in &code.coding {
            builder.add_detail(&coding.code, &coding.name, coding.system.as_deref())?;
        }
    }

    builder.set_status(DiagnosisStatus::from_str(&resource.status)?);
    builder.save()?;
    Ok(())
}

/// Extract the id out of a `<TypeName>/<id>` reference string.
fn reference_id<'a>(
    entity: &'static str,
    reference: &'a Reference,
) -> Result<&'a str, ReferentialError> {
    reference
        .reference
        .split_once('/')
        .map(|(_, id)| id)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ReferentialError {
            entity,
            id: reference.reference.clone(),
        })
}

fn parse_utc_timestamp(field: &'static str, value: &str) -> Result<i64, ImportError> {
    let dt = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%SZ").map_err(|source| {
        ImportError::InvalidTime {
            field,
            value: value.to_owned(),
            source,
        }
    })?;
    Ok(dt.and_utc().timestamp())
}
