//! Operator commands for the `clinicsync` binary.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::appointments::{self, UserSheet};
use crate::directory;
use crate::error::SyncError;
use crate::sheets_api::{SheetsApi, SheetsClient};
use crate::state;
use crate::sync::{self, poller};
use crate::types::{Appointment, AppointmentStatus, Config};
use crate::watermark::WatermarkStore;

#[derive(Debug, Parser)]
#[command(name = "clinicsync", version, about = "Fan master appointments out to per-user spreadsheets")]
pub struct Cli {
    /// Config file (defaults to ~/.clinicsync/config.json)
    #[arg(long, global = true, env = "CLINICSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one sync pass and print the report
    Sync {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Sync now and then every `syncIntervalSecs` until Ctrl-C
    Watch {
        /// Override the configured interval (seconds)
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Show the stored watermark
    Status,
    /// Check an email/password against the users sheet
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Manage one user's appointments
    #[command(subcommand)]
    Appointments(AppointmentCommand),
}

#[derive(Debug, Subcommand)]
pub enum AppointmentCommand {
    /// List appointments
    List {
        #[arg(long)]
        email: String,
        #[arg(long)]
        json: bool,
    },
    /// Add an appointment
    Add(AddArgs),
    /// Change the status of a row
    SetStatus {
        #[arg(long)]
        email: String,
        #[arg(long)]
        row: u64,
        /// scheduled, completed or cancelled
        #[arg(long)]
        status: String,
    },
    /// Blank a row
    Delete {
        #[arg(long)]
        email: String,
        #[arg(long)]
        row: u64,
    },
}

#[derive(Debug, Args)]
pub struct AddArgs {
    #[arg(long)]
    pub email: String,
    #[arg(long)]
    pub patient: String,
    #[arg(long, default_value = "")]
    pub phone: String,
    #[arg(long, default_value = "")]
    pub report: String,
    #[arg(long)]
    pub date: String,
    #[arg(long)]
    pub time: String,
}

fn client(config: &Config) -> SheetsClient {
    SheetsClient::new(
        config.base_url.clone(),
        config.api_key.clone(),
        config.access_token.clone(),
        config.retry_policy(),
    )
}

pub async fn execute(cli: Cli) -> Result<(), SyncError> {
    let config = state::load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Sync { json } => {
            let api = client(&config);
            let store = state::open_watermark_store(&config)?;
            let report = sync::run_sync_job(&api, &store, &config).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report.summary());
                for failure in &report.failures {
                    println!("  row {}: {}", failure.row, failure.reason);
                }
            }
        }
        Command::Watch { interval } => {
            let secs = interval.unwrap_or(config.sync_interval_secs).max(1);
            let store = state::open_watermark_store(&config)?;
            log::info!("Watermark file: {}", store.path().display());
            let api: Arc<dyn SheetsApi> = Arc::new(client(&config));
            let handle = poller::spawn_sync_poller(
                api,
                Arc::new(store),
                Arc::new(config),
                Duration::from_secs(secs),
            );
            tokio::signal::ctrl_c().await?;
            log::info!("Interrupt received, stopping sync poller");
            handle.cancel();
            handle.join().await;
        }
        Command::Status => {
            let store = state::open_watermark_store(&config)?;
            println!(
                "last processed row: {} ({})",
                store.load()?,
                store.path().display()
            );
        }
        Command::Login { email, password } => {
            let api = client(&config);
            let entry = directory::authenticate(
                &api,
                &config.users_spreadsheet_id,
                &config.users_range,
                &email,
                &password,
            )
            .await?;
            println!("{} → {}", entry.email, entry.spreadsheet_id);
        }
        Command::Appointments(cmd) => run_appointments(&config, cmd).await?,
    }
    Ok(())
}

async fn run_appointments(config: &Config, cmd: AppointmentCommand) -> Result<(), SyncError> {
    let api = client(config);
    let email = match &cmd {
        AppointmentCommand::List { email, .. }
        | AppointmentCommand::SetStatus { email, .. }
        | AppointmentCommand::Delete { email, .. } => email.clone(),
        AppointmentCommand::Add(args) => args.email.clone(),
    };
    let entry = directory::resolve_user(
        &api,
        &config.users_spreadsheet_id,
        &config.users_range,
        &email,
    )
    .await?;
    let sheet = UserSheet {
        spreadsheet_id: &entry.spreadsheet_id,
        tab: &config.user_sheet,
        header_rows: config.header_rows,
    };

    match cmd {
        AppointmentCommand::List { json, .. } => {
            let list = appointments::list_appointments(&api, sheet).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&list)?);
            } else {
                for a in &list {
                    println!(
                        "{:>4}  {:<10} {:<5}  {:<9}  {}  {}",
                        a.row,
                        a.date,
                        a.start_time,
                        a.status.as_str(),
                        a.patient_name,
                        a.report_ref
                    );
                }
            }
        }
        AppointmentCommand::Add(args) => {
            let appointment = Appointment {
                row: 0,
                patient_name: args.patient,
                email: args.email,
                phone: args.phone,
                report_ref: args.report,
                date: args.date,
                start_time: args.time,
                status: AppointmentStatus::Scheduled,
            };
            appointments::add_appointment(&api, sheet, &appointment).await?;
        }
        AppointmentCommand::SetStatus { row, status, .. } => {
            let status: AppointmentStatus = status.parse()?;
            appointments::update_status(&api, sheet, row, status).await?;
        }
        AppointmentCommand::Delete { row, .. } => {
            appointments::delete_appointment(&api, sheet, row).await?;
        }
    }
    Ok(())
}
