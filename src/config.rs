use std::env;
use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Careledger";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable overriding the store location
pub const DB_PATH_ENV: &str = "CARELEDGER_DB";

/// Environment variable naming the survey target patient
pub const PATIENT_ID_ENV: &str = "CARELEDGER_PATIENT_ID";

pub fn default_log_filter() -> &'static str {
    "info"
}

/// Get the application data directory
/// ~/Careledger/ on all platforms (user-visible)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("Careledger")
}

/// Store connection path: `CARELEDGER_DB` when set, the app data
/// directory otherwise.
pub fn database_path() -> PathBuf {
    match env::var(DB_PATH_ENV) {
        Ok(path) if !path.is_empty() => PathBuf::from(path),
        _ => app_data_dir().join("careledger.db"),
    }
}

/// Survey target patient id from the environment.
pub fn survey_patient_id() -> Option<String> {
    env::var(PATIENT_ID_ENV).ok().filter(|id| !id.is_empty())
}
