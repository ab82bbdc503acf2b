mod abort;
mod catalog;
mod config;
mod credentials;
mod elements;
mod geocode;
mod http;
mod pipeline;
mod predict;
mod shell;
mod spacetrack;
mod time_expr;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::abort::AbortFlag;
use crate::catalog::{matching_entries, CatalogStore};
use crate::config::Config;
use crate::credentials::Credentials;
use crate::geocode::NominatimClient;
use crate::http::HttpPolicy;
use crate::pipeline::{PassReport, PassRequest, RunError};
use crate::shell::{
    choose_satellite, prompt_credentials, render_report, Console, ShellError, TimeDisplay,
};
use crate::spacetrack::SpaceTrackClient;

#[derive(Parser)]
#[command(name = "sat-pass")]
#[command(about = "Predict satellite passes over a place")]
struct Cli {
    /// Configuration file (defaults to ./sat-pass.yaml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Predict passes; missing inputs are asked for on the console
    Predict(PredictArgs),
    /// List catalog entries whose name contains a query
    Search { query: String },
    /// Manage the local catalog snapshot
    Catalog {
        #[command(subcommand)]
        command: CatalogCommand,
    },
    /// Store Space-Track credentials for later runs
    Login,
}

#[derive(Subcommand)]
enum CatalogCommand {
    /// Download a fresh catalog listing
    Refresh,
}

#[derive(clap::Args)]
struct PredictArgs {
    /// Satellite name or part of it
    #[arg(short, long)]
    satellite: Option<String>,
    /// Candidate index when the name matches several satellites
    #[arg(long)]
    select: Option<usize>,
    /// Place name, or "lat,lon"
    #[arg(short, long)]
    location: Option<String>,
    /// Observer altitude in meters
    #[arg(long)]
    altitude: Option<f64>,
    /// First sample time: now, RFC 3339, or T+<duration>
    #[arg(long, default_value = "now")]
    start: String,
    /// Prediction horizon in hours
    #[arg(long)]
    hours: Option<u32>,
    /// Sampling step in hours
    #[arg(long)]
    step: Option<u32>,
    /// Give up on the scan after this long, e.g. "20s"
    #[arg(long)]
    deadline: Option<String>,
    /// Print times in the local time zone
    #[arg(long)]
    local: bool,
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Predict(args) => predict(&config, args),
        Commands::Search { query } => search(&config, &query),
        Commands::Catalog {
            command: CatalogCommand::Refresh,
        } => refresh(&config),
        Commands::Login => login(&config),
    }
}

fn http_policy(config: &Config) -> Result<HttpPolicy, String> {
    Ok(HttpPolicy {
        timeout: config.http.timeout().map_err(|e| e.to_string())?,
        retries: config.http.retries,
        ..HttpPolicy::default()
    })
}

fn space_track(config: &Config) -> Result<SpaceTrackClient, String> {
    let credentials = Credentials::resolve(&config.spacetrack).map_err(|e| e.to_string())?;
    SpaceTrackClient::new(
        &config.spacetrack.base_url,
        credentials,
        http_policy(config)?,
        &config.geocoder.user_agent,
    )
    .map_err(|e| e.to_string())
}

fn open_catalog(config: &Config, client: &SpaceTrackClient) -> Result<CatalogStore, ShellError> {
    shell::open_catalog(&config.catalog.path, client, &mut std::io::stderr())
}

fn fail_shell(err: ShellError) -> ExitCode {
    match err {
        ShellError::Run(e) => fail(&e),
        ShellError::Io(e) => {
            eprintln!("Console error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn fail(err: &RunError) -> ExitCode {
    log::debug!("run ended with {}", err.kind());
    eprintln!("Error ({}): {}", err.kind(), err);
    ExitCode::FAILURE
}

fn predict(config: &Config, args: PredictArgs) -> ExitCode {
    let now = Utc::now();
    let start = match time_expr::parse_start(&args.start, now) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    let deadline = match args.deadline.as_deref().map(parse_deadline).transpose() {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Invalid deadline: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let client = match space_track(config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Space-Track setup failed: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let geocoder = match http_policy(config).and_then(|policy| {
        NominatimClient::new(&config.geocoder.base_url, policy, &config.geocoder.user_agent)
            .map_err(|e| e.to_string())
    }) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("Geocoder setup failed: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let store = match open_catalog(config, &client) {
        Ok(s) => s,
        Err(e) => return fail_shell(e),
    };

    let settings = RunSettings {
        start,
        altitude_m: args.altitude.or(config.predict.altitude_m),
        horizon_hours: args.hours.unwrap_or(config.predict.horizon_hours),
        step_hours: args.step.unwrap_or(config.predict.step_hours),
        scan_step_seconds: config.predict.scan_step_seconds,
        deadline,
    };

    // Both inputs given: no console interaction at all.
    let result = match (&args.satellite, &args.location) {
        (Some(satellite), Some(location)) => {
            let request = settings.request(satellite.clone(), args.select, location.clone());
            let abort = settings.arm_abort();
            pipeline::run(store.entries(), &client, &geocoder, &request, Some(&abort))
                .map_err(ShellError::from)
        }
        _ => interactive(
            &mut Console::stdio(),
            &args,
            &settings,
            &store,
            &client,
            &geocoder,
        ),
    };
    let report = match result {
        Ok(r) => r,
        Err(e) => return fail_shell(e),
    };

    let display = if args.local {
        TimeDisplay::Local
    } else {
        TimeDisplay::Utc
    };
    match args.format {
        Format::Text => print!("{}", render_report(&report, display)),
        Format::Json => match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Serialization error: {}", e);
                return ExitCode::FAILURE;
            }
        },
    }
    ExitCode::SUCCESS
}

fn parse_deadline(s: &str) -> Result<std::time::Duration, String> {
    time_expr::parse_duration(s).and_then(|d| d.to_std().map_err(|e| e.to_string()))
}

/// Prediction settings that do not depend on the operator's answers.
struct RunSettings {
    start: DateTime<Utc>,
    altitude_m: Option<f64>,
    horizon_hours: u32,
    step_hours: u32,
    scan_step_seconds: u32,
    deadline: Option<std::time::Duration>,
}

impl RunSettings {
    fn request(&self, satellite: String, selection: Option<usize>, location: String) -> PassRequest {
        PassRequest {
            satellite_query: satellite,
            selection,
            location_query: location,
            altitude_m: self.altitude_m,
            start: self.start,
            horizon_hours: self.horizon_hours,
            step_hours: self.step_hours,
            scan_step_seconds: self.scan_step_seconds,
        }
    }

    /// Abort flag raised by a watchdog thread once the deadline passes.
    fn arm_abort(&self) -> AbortFlag {
        let abort = AbortFlag::new();
        if let Some(limit) = self.deadline {
            let flag = abort.clone();
            std::thread::spawn(move || {
                std::thread::sleep(limit);
                log::warn!("Deadline of {:?} reached, stopping scan", limit);
                flag.raise();
            });
        }
        abort
    }
}

/// Ask for whatever the command line left out, in the order the answers
/// are needed.
fn interactive<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    args: &PredictArgs,
    settings: &RunSettings,
    store: &CatalogStore,
    client: &SpaceTrackClient,
    geocoder: &NominatimClient,
) -> Result<PassReport, ShellError> {
    let query = console.value_or_prompt(args.satellite.clone(), "Satellite: ")?;
    let entry = choose_satellite(console, store.entries(), &query, args.select)?;
    let elements = elements::fetch_elements(client, entry).map_err(RunError::from)?;

    let place = console.value_or_prompt(args.location.clone(), "Location: ")?;
    let observer = pipeline::locate_observer(geocoder, &place)?;
    console.println(&format!("Location: {}", observer.display_name))?;

    let request = settings.request(query, args.select, place);
    let abort = settings.arm_abort();
    let passes = pipeline::compute_schedule(&elements, &observer, &request, Some(&abort))?;
    Ok(PassReport::new(entry, &elements, observer, &request, passes))
}

fn search(config: &Config, query: &str) -> ExitCode {
    let client = match space_track(config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Space-Track setup failed: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let store = match open_catalog(config, &client) {
        Ok(s) => s,
        Err(e) => return fail_shell(e),
    };

    let matches = matching_entries(query, store.entries());
    if matches.is_empty() {
        println!("No satellite matches '{}'", query);
        return ExitCode::FAILURE;
    }
    for (index, entry) in matches.iter().enumerate() {
        let decayed = if entry.is_decayed() { ", decayed" } else { "" };
        println!("{} : {} ({}{})", index, entry.name, entry.norad_id, decayed);
    }
    ExitCode::SUCCESS
}

fn refresh(config: &Config) -> ExitCode {
    let client = match space_track(config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Space-Track setup failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match CatalogStore::load(&config.catalog.path) {
        Ok(mut store) => store.refresh(&client).map(|_| store),
        Err(e) => {
            log::debug!("no usable snapshot ({}), starting fresh", e);
            CatalogStore::open_or_fetch(&config.catalog.path, &client)
        }
    };
    match result {
        Ok(store) => {
            println!(
                "Catalog refreshed: {} entries in {}",
                store.len(),
                store.path().display()
            );
            ExitCode::SUCCESS
        }
        Err(e) => fail(&RunError::from(e)),
    }
}

fn login(config: &Config) -> ExitCode {
    let mut console = Console::stdio();
    let prompted = prompt_credentials(&mut console, |label| rpassword::prompt_password(label));
    let credentials = match prompted {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Console error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match credentials.store(&config.spacetrack.credentials_file) {
        Ok(()) => {
            println!(
                "Credentials saved to {}",
                config.spacetrack.credentials_file.display()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Could not save credentials: {}", e);
            ExitCode::FAILURE
        }
    }
}
