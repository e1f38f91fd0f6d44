use std::error::Error;
use std::process::ExitCode;

use careledger::config;
use careledger::db::sqlite::open_database;
use careledger::survey::{run_survey, StdioPrompt};

fn main() -> ExitCode {
    careledger::init_tracing();

    match run() {
        Ok(json) => {
            println!("\nThis is your survey response for your last appointment:\n{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("survey failed: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<String, Box<dyn Error>> {
    let patient_id = config::survey_patient_id()
        .ok_or_else(|| format!("{} is not set", config::PATIENT_ID_ENV))?;

    let mut conn = open_database(&config::database_path())?;
    let summary = run_survey(&mut conn, &patient_id, &mut StdioPrompt)?;

    // Round-trip through Value for key-sorted output
    let value = serde_json::to_value(&summary)?;
    Ok(serde_json::to_string_pretty(&value)?)
}
