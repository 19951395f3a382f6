pub mod appointments;
mod cli;
pub mod directory;
pub mod error;
pub mod sheets_api;
pub mod state;
pub mod sync;
pub mod types;
pub mod watermark;

use std::process::ExitCode;

use clap::Parser;

/// Entry point for the `clinicsync` binary.
pub fn run() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = cli::Cli::parse();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            log::error!("Failed to start async runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(cli::execute(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("error: {}\n{}", e, e.recovery_suggestion());
            ExitCode::FAILURE
        }
    }
}
