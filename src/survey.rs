//! Post-appointment satisfaction survey — three sequential prompts
//! persisted as one Survey aggregate.

use std::io::{self, Write};

use rusqlite::Connection;
use thiserror::Error;

use crate::db::builder::{BuildError, ReferentialError, SurveyBuilder};
use crate::db::StoreError;
use crate::summary::{most_recent_appointment_summary, AppointmentSummary};

#[derive(Error, Debug)]
pub enum SurveyError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Referential(#[from] ReferentialError),

    #[error("prompt I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("patient {patient_id} has no appointment to survey")]
    NoAppointment { patient_id: String },
}

impl From<BuildError> for SurveyError {
    fn from(e: BuildError) -> Self {
        match e {
            BuildError::Store(e) => Self::Store(e),
            BuildError::Referential(e) => Self::Referential(e),
        }
    }
}

/// Seam over interactive input; prompts block until the operator answers.
pub trait Prompt {
    fn ask(&mut self, question: &str) -> io::Result<String>;
}

/// Reads answers from stdin, echoing questions to stdout.
pub struct StdioPrompt;

impl Prompt for StdioPrompt {
    fn ask(&mut self, question: &str) -> io::Result<String> {
        let mut stdout = io::stdout();
        writeln!(stdout)?;
        writeln!(stdout, "{question}")?;
        stdout.flush()?;

        let mut line = String::new();
        io::stdin().read_line(&mut line)?;
        Ok(line.trim().to_owned())
    }
}

/// Conduct the survey for the patient's most recent appointment and
/// return the refreshed summary. Does not prompt again when a survey is
/// already recorded for that appointment.
pub fn run_survey(
    conn: &mut Connection,
    patient_id: &str,
    prompt: &mut dyn Prompt,
) -> Result<AppointmentSummary, SurveyError> {
    let summary = most_recent_appointment_summary(conn, patient_id)?.ok_or_else(|| {
        SurveyError::NoAppointment {
            patient_id: patient_id.to_owned(),
        }
    })?;

    if summary.survey.is_some() {
        tracing::info!(
            appointment = %summary.appointment.id,
            "Survey already recorded, skipping prompts"
        );
        return Ok(summary);
    }

    let tx = conn.transaction().map_err(StoreError::from)?;
    collect_responses(&tx, &summary, prompt)?;
    tx.commit().map_err(StoreError::from)?;

    most_recent_appointment_summary(conn, patient_id)?.ok_or_else(|| {
        SurveyError::NoAppointment {
            patient_id: patient_id.to_owned(),
        }
    })
}

fn collect_responses(
    conn: &Connection,
    summary: &AppointmentSummary,
    prompt: &mut dyn Prompt,
) -> Result<(), SurveyError> {
    let patient_first_name = summary
        .patient
        .names
        .iter()
        .map(|n| n.first_name.as_str())
        .find(|n| !n.is_empty())
        .unwrap_or("Patient");

    let doctor_last_name = summary
        .doctor
        .as_ref()
        .and_then(|d| {
            d.names
                .iter()
                .filter_map(|n| n.last_name.as_deref())
                .find(|n| !n.is_empty())
        })
        .unwrap_or("Doctor");

    let code_names: Vec<String> = summary
        .diagnosis
        .iter()
        .flat_map(|d| d.codes.iter().map(|c| c.name.clone()))
        .collect();
    let diagnosis_text = join_names(&code_names);

    let mut builder = SurveyBuilder::load_or_create(conn, None)?;
    builder.set_appointment(&summary.appointment.id)?;

    builder.set_recommendation_rating(ask_rating(prompt, patient_first_name, doctor_last_name)?);

    let feedback = prompt.ask(&format!(
        "Thank you. You were diagnosed with \"{diagnosis_text}\". Did Dr. {doctor_last_name} \
         explain how to manage this diagnosis in a way you could understand?"
    ))?;
    if !feedback.is_empty() {
        builder.set_diagnosis_feedback(&feedback, classify_yes_no(&feedback));
    }

    let feeling = prompt.ask(&format!(
        "We appreciate the feedback, one last question: how do you feel about being \
         diagnosed with \"{diagnosis_text}\"?"
    ))?;
    if !feeling.is_empty() {
        builder.set_patient_feeling(&feeling);
    }

    builder.save()?;
    Ok(())
}

/// Re-ask until the answer parses as an integer in 1..=10.
fn ask_rating(
    prompt: &mut dyn Prompt,
    patient_first_name: &str,
    doctor_last_name: &str,
) -> Result<i64, SurveyError> {
    let question = format!(
        "Hi {patient_first_name}, on a scale of 1-10, would you recommend Dr {doctor_last_name} \
         to a friend or family member?\n\
         (1 = Would not recommend, 10 = Would strongly recommend)"
    );

    loop {
        let answer = prompt.ask(&question)?;
        if let Ok(value) = answer.trim().parse::<i64>() {
            if (1..=10).contains(&value) {
                return Ok(value);
            }
        }
    }
}

/// `true` when standalone "yes" tokens outnumber "no" tokens,
/// case-insensitively. Ties count as no.
pub fn classify_yes_no(text: &str) -> bool {
    let mut yes_count = 0;
    let mut no_count = 0;
    for word in text.split_whitespace() {
        if word.eq_ignore_ascii_case("yes") {
            yes_count += 1;
        } else if word.eq_ignore_ascii_case("no") {
            no_count += 1;
        }
    }
    yes_count > no_count
}

/// Natural-language joining: "A", "A and B", "A, B, and C".
pub fn join_names(names: &[String]) -> String {
    match names {
        [] => String::new(),
        [only] => only.clone(),
        [first, second] => format!("{first} and {second}"),
        [init @ .., last] => format!("{}, and {last}", init.join(", ")),
    }
}
