mod app;
mod minigames;

use std::process::ExitCode;

use tracing::error;

fn main() -> ExitCode {
    app::init_tracing();
    match app::build_app() {
        Ok(wiring) => app::run(wiring),
        Err(err) => {
            error!(error = %err, "startup_failed");
            ExitCode::FAILURE
        }
    }
}
