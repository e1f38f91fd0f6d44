use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostAppointmentSurvey {
    pub id: String,
    pub appointment_id: Option<String>,
    pub recommendation_rating: i64,
    pub is_diagnosis_explained: bool,
    pub diagnosis_feedback: Option<String>,
    pub patient_feeling: Option<String>,
}

pub const DEFAULT_RECOMMENDATION_RATING: i64 = 5;
