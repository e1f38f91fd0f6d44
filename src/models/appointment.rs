use serde::{Deserialize, Serialize};

use super::enums::AppointmentStatus;

/// Doctor and patient references are nulled when the referenced user
/// row is deleted, so both stay optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub start_time_ts: i64,
    pub duration_secs: i64,
    pub status: AppointmentStatus,
    pub doctor_id: Option<String>,
    pub patient_id: Option<String>,
}

pub const DEFAULT_DURATION_SECS: i64 = 1800;
