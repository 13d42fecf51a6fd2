// Entrypoint: configure logging, run the pipeline once, and map the
// outcome to an exit code. Acquisition failures exit with 1; a failed
// post does not change the exit code.

use std::process::ExitCode;

use mars_rover_poster::{app, config::Config, http, logging};
use tracing::{error, info, warn};

fn main() -> ExitCode {
    // Configuration comes from the environment only; see `Config::from_env`.
    let config = Config::from_env();

    if let Err(err) = logging::init_logging(config.log_format) {
        eprintln!("{err:#}");
        return ExitCode::from(2);
    }

    let client = match http::build_client() {
        Ok(client) => client,
        Err(err) => {
            let message = format!("{err:#}");
            error!(error = %message, "startup failed");
            return ExitCode::from(2);
        }
    };

    match app::run(&config, client) {
        Ok(report) => {
            if report.publish.is_posted() {
                info!(removed = report.removed, "run complete");
            } else {
                warn!(removed = report.removed, "run complete without a post");
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "an error occurred while fetching a random latest Mars photo");
            ExitCode::FAILURE
        }
    }
}
