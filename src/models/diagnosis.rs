use serde::{Deserialize, Serialize};

use super::enums::DiagnosisStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnosis {
    pub id: String,
    pub appointment_id: Option<String>,
    pub last_updated_ts: i64,
    pub status: DiagnosisStatus,
}

/// Globally deduplicated by `code`; shared across diagnoses through
/// `diagnosis_details` join rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosisCode {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub system: Option<String>,
}
