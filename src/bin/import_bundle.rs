use std::env;
use std::path::Path;
use std::process::ExitCode;

use careledger::bundle::{import_bundle, read_bundle, ImportError};
use careledger::config;
use careledger::db::sqlite::open_database;

fn main() -> ExitCode {
    careledger::init_tracing();

    let Some(path) = env::args().nth(1) else {
        eprintln!("usage: import-bundle <bundle.json>");
        return ExitCode::FAILURE;
    };

    match run(Path::new(&path)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("import failed: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(path: &Path) -> Result<(), ImportError> {
    let bundle = read_bundle(path)?;

    let db_path = config::database_path();
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut conn = open_database(&db_path)?;

    let report = import_bundle(&mut conn, &bundle)?;
    println!(
        "data successfully imported: {} user(s), {} appointment(s), {} diagnosis record(s)",
        report.users, report.appointments, report.diagnoses
    );
    if report.skipped > 0 {
        println!("{} entr(ies) skipped, see logs", report.skipped);
    }
    Ok(())
}
