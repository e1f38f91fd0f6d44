//! Entity builders — get-or-create wrappers over the aggregate roots.
//!
//! Each builder loads (or immediately inserts) its root row on
//! construction, so child rows always have a persisted parent to
//! reference. Scalar setters mutate the in-memory row and are written
//! back by an explicit `save()`; child-collection operations hit the
//! store as they are called.

mod appointment;
mod diagnosis;
mod survey;
mod user;

use thiserror::Error;

use super::StoreError;

/// A cross-aggregate reference pointing at a row that does not exist.
#[derive(Error, Debug)]
#[error("referenced {entity} {id:?} does not exist")]
pub struct ReferentialError {
    pub entity: &'static str,
    pub id: String,
}

#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Referential(#[from] ReferentialError),
}

impl From<rusqlite::Error> for BuildError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Store(e.into())
    }
}

pub use appointment::*;
pub use diagnosis::*;
pub use survey::*;
pub use user::*;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;
    use crate::models::enums::*;
    use chrono::NaiveDate;
    use rusqlite::Connection;

    fn test_db() -> Connection {
        open_memory_database().unwrap()
    }

    fn make_user(conn: &Connection, id: &str, role: UserRole) -> String {
        let mut builder = UserBuilder::load_or_create(conn, Some(id)).unwrap();
        builder.set_role(role);
        builder.save().unwrap();
        builder.id().to_string()
    }

    #[test]
    fn user_create_and_reload_by_id() {
        let conn = test_db();

        let mut builder = UserBuilder::load_or_create(&conn, Some("u-1")).unwrap();
        builder.set_role(UserRole::Doctor);
        builder.set_is_active(false);
        builder.set_gender(Gender::Female);
        builder.set_birth_date(NaiveDate::from_ymd_opt(1980, 1, 11).unwrap());
        builder.save().unwrap();

        let reloaded = UserBuilder::load_or_create(&conn, Some("u-1")).unwrap();
        assert_eq!(reloaded.row().role, UserRole::Doctor);
        assert!(!reloaded.row().is_active);
        assert_eq!(reloaded.row().gender, Some(Gender::Female));
        assert_eq!(
            reloaded.row().birth_date,
            Some(NaiveDate::from_ymd_opt(1980, 1, 11).unwrap())
        );
    }

    #[test]
    fn user_without_id_gets_generated_one() {
        let conn = test_db();
        let builder = UserBuilder::load_or_create(&conn, None).unwrap();
        assert!(!builder.id().is_empty());

        // The row is persisted immediately, not detached
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn same_id_does_not_create_second_row() {
        let conn = test_db();
        make_user(&conn, "u-1", UserRole::Patient);
        make_user(&conn, "u-1", UserRole::Patient);

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn unsaved_scalar_changes_are_not_flushed() {
        let conn = test_db();
        make_user(&conn, "u-1", UserRole::Patient);

        let mut builder = UserBuilder::load_or_create(&conn, Some("u-1")).unwrap();
        builder.set_role(UserRole::Doctor);
        // no save()

        let role: String = conn
            .query_row("SELECT role FROM users WHERE id = 'u-1'", [], |row| row.get(0))
            .unwrap();
        assert_eq!(role, "patient");
    }

    #[test]
    fn names_with_given_names_round_trip() {
        let conn = test_db();
        let builder = UserBuilder::load_or_create(&conn, Some("u-1")).unwrap();

        builder
            .add_name(Some("Hsu"), Some("CK Hsu"), &["CK".into(), "Chiakai".into()])
            .unwrap();

        let names: i64 = conn
            .query_row("SELECT COUNT(*) FROM user_names", [], |row| row.get(0))
            .unwrap();
        let given: i64 = conn
            .query_row("SELECT COUNT(*) FROM user_given_names", [], |row| row.get(0))
            .unwrap();
        assert_eq!(names, 1);
        assert_eq!(given, 2);
    }

    #[test]
    fn clear_names_removes_given_names_too() {
        let conn = test_db();
        let builder = UserBuilder::load_or_create(&conn, Some("u-1")).unwrap();
        builder
            .add_name(Some("Hsu"), None, &["CK".into()])
            .unwrap();

        builder.clear_names().unwrap();

        let names: i64 = conn
            .query_row("SELECT COUNT(*) FROM user_names", [], |row| row.get(0))
            .unwrap();
        let given: i64 = conn
            .query_row("SELECT COUNT(*) FROM user_given_names", [], |row| row.get(0))
            .unwrap();
        assert_eq!(names, 0);
        assert_eq!(given, 0);

        // Clearing again is a no-op
        builder.clear_names().unwrap();
    }

    #[test]
    fn contact_info_clear_then_add() {
        let conn = test_db();
        let builder = UserBuilder::load_or_create(&conn, Some("u-1")).unwrap();

        builder
            .add_contact_info(ContactChannel::Email, "personal", "ana@example.com")
            .unwrap();
        builder
            .add_contact_info(ContactChannel::Phone, "work", "555-0100")
            .unwrap();

        builder.clear_contact_info().unwrap();
        builder
            .add_contact_info(ContactChannel::Address, "home", "12 Elm St")
            .unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM user_contacts", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn appointment_references_require_existing_users() {
        let conn = test_db();
        make_user(&conn, "d-1", UserRole::Doctor);

        let mut builder = AppointmentBuilder::load_or_create(&conn, Some("a-1")).unwrap();
        builder.set_doctor("d-1").unwrap();

        let err = builder.set_patient("missing").unwrap_err();
        assert!(matches!(err, BuildError::Referential(_)));
    }

    #[test]
    fn appointment_schedule_and_reasons() {
        let conn = test_db();
        let mut builder = AppointmentBuilder::load_or_create(&conn, Some("a-1")).unwrap();
        builder.set_schedule(1_704_103_200, 1800);
        builder.set_status(AppointmentStatus::Finished);
        builder.save().unwrap();

        builder.clear_reasons().unwrap();
        builder.add_reason("Annual checkup").unwrap();
        builder.add_reason("Cough").unwrap();

        let reloaded = get_appointment(&conn, "a-1").unwrap().unwrap();
        assert_eq!(reloaded.start_time_ts, 1_704_103_200);
        assert_eq!(reloaded.status, AppointmentStatus::Finished);

        let reasons: i64 = conn
            .query_row("SELECT COUNT(*) FROM appointment_reasons", [], |row| row.get(0))
            .unwrap();
        assert_eq!(reasons, 2);
    }

    #[test]
    fn diagnosis_codes_deduplicated_across_diagnoses() {
        let conn = test_db();
        let appt = AppointmentBuilder::load_or_create(&conn, Some("a-1")).unwrap();

        let mut dx1 = DiagnosisBuilder::load_or_create(&conn, Some("dx-1")).unwrap();
        dx1.set_appointment(appt.id()).unwrap();
        dx1.add_detail("J20", "Bronchitis", Some("ICD10")).unwrap();
        dx1.save().unwrap();

        let dx2 = DiagnosisBuilder::load_or_create(&conn, Some("dx-2")).unwrap();
        dx2.add_detail("J20", "Bronchitis", Some("ICD10")).unwrap();

        let codes: i64 = conn
            .query_row("SELECT COUNT(*) FROM diagnosis_codes", [], |row| row.get(0))
            .unwrap();
        let details: i64 = conn
            .query_row("SELECT COUNT(*) FROM diagnosis_details", [], |row| row.get(0))
            .unwrap();
        assert_eq!(codes, 1);
        assert_eq!(details, 2);
    }

    #[test]
    fn diagnosis_clear_details_keeps_codes() {
        let conn = test_db();
        let dx = DiagnosisBuilder::load_or_create(&conn, Some("dx-1")).unwrap();
        dx.add_detail("J20", "Bronchitis", None).unwrap();

        dx.clear_details().unwrap();
        dx.clear_details().unwrap();

        let details: i64 = conn
            .query_row("SELECT COUNT(*) FROM diagnosis_details", [], |row| row.get(0))
            .unwrap();
        // Codes are a global catalog; only join rows go away
        let codes: i64 = conn
            .query_row("SELECT COUNT(*) FROM diagnosis_codes", [], |row| row.get(0))
            .unwrap();
        assert_eq!(details, 0);
        assert_eq!(codes, 1);
    }

    #[test]
    fn diagnosis_appointment_reference_checked() {
        let conn = test_db();
        let mut dx = DiagnosisBuilder::load_or_create(&conn, Some("dx-1")).unwrap();
        let err = dx.set_appointment("missing").unwrap_err();
        assert!(matches!(err, BuildError::Referential(_)));
    }

    #[test]
    fn survey_defaults() {
        let conn = test_db();
        let survey = SurveyBuilder::load_or_create(&conn, None).unwrap();
        assert_eq!(survey.row().recommendation_rating, 5);
        assert!(!survey.row().is_diagnosis_explained);
        assert!(survey.row().diagnosis_feedback.is_none());
        assert!(survey.row().patient_feeling.is_none());
    }

    #[test]
    fn survey_fields_persist() {
        let conn = test_db();
        let appt = AppointmentBuilder::load_or_create(&conn, Some("a-1")).unwrap();

        let mut survey = SurveyBuilder::load_or_create(&conn, Some("s-1")).unwrap();
        survey.set_appointment(appt.id()).unwrap();
        survey.set_recommendation_rating(9);
        survey.set_diagnosis_feedback("yes it was clear", true);
        survey.set_patient_feeling("relieved");
        survey.save().unwrap();

        let reloaded = SurveyBuilder::load_or_create(&conn, Some("s-1")).unwrap();
        assert_eq!(reloaded.row().recommendation_rating, 9);
        assert!(reloaded.row().is_diagnosis_explained);
        assert_eq!(
            reloaded.row().diagnosis_feedback.as_deref(),
            Some("yes it was clear")
        );
        assert_eq!(reloaded.row().patient_feeling.as_deref(), Some("relieved"));
    }
}
