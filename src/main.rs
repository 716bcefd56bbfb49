//! Main entry point for the parcelwatch CLI app

fn main() -> std::process::ExitCode {
    if let Err(e) = parcelwatch::cli_runner::run_cli_app() {
        if let Some(usage) = e.downcast_ref::<clap::Error>() {
            // Help and version requests land here too and exit successfully.
            usage.exit();
        }
        eprintln!("Error: {}", e);
        return std::process::ExitCode::FAILURE;
    }
    std::process::ExitCode::SUCCESS
}
