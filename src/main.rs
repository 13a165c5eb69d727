mod auth;
mod cli;
mod db;
mod error;
mod logging;
mod queries;
#[cfg(test)]
mod test_support;
mod types;
mod workflow;

use std::process::ExitCode;

use clap::Parser;

use crate::error::{ErrorBody, WorkflowError};

fn main() -> ExitCode {
    let cli_opts = cli::Cli::parse();
    logging::init(cli_opts.verbose);

    let db_path = cli_opts.db.unwrap_or_else(db::default_db_path);
    let result = db::init(&db_path).and_then(|mut conn| cli::run(cli_opts.command, &mut conn));
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report(&err),
    }
}

/// Prints the error body on stderr and picks the exit code for its class.
fn report(err: &anyhow::Error) -> ExitCode {
    let (body, code) = match err.downcast_ref::<WorkflowError>() {
        Some(wf) => {
            if let WorkflowError::Store(e) = wf {
                tracing::error!(error = %e, "store operation failed");
            }
            (wf.body(), exit_code(wf))
        }
        None if err.downcast_ref::<rusqlite::Error>().is_some() => {
            tracing::error!(error = %err, "store operation failed");
            (
                ErrorBody {
                    error: "internal error".to_string(),
                },
                1,
            )
        }
        None => (
            ErrorBody {
                error: format!("{err:#}"),
            },
            1,
        ),
    };
    match serde_json::to_string(&body) {
        Ok(json) => eprintln!("{json}"),
        Err(_) => eprintln!("{}", body.error),
    }
    ExitCode::from(code)
}

fn exit_code(err: &WorkflowError) -> u8 {
    match err.status_code() {
        400 => 2,
        404 => 3,
        409 => 4,
        _ => 1,
    }
}
