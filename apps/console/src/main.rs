use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use url::Url;

use jobscv_console::api::notify::{Notification, DEFAULT_MESSAGE, DEFAULT_SUBJECT};
use jobscv_console::api::{settle, StatusLine};
use jobscv_console::config::Config;
use jobscv_console::models::CvFile;
use jobscv_console::settings::{SearchQuery, Service};
use jobscv_console::state::ConsoleState;

#[derive(Parser, Debug)]
#[command(
    name = "jobscv",
    version,
    about = "Operator console for the JobsCVAgg identity, search, CV and matching services"
)]
struct Cli {
    /// Print the last captured HTTP diagnostic as JSON after the command
    #[arg(long, global = true, default_value_t = false)]
    diagnostics: bool,

    /// Settings file to use instead of JOBSCV_STORE_PATH
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Origin for root-relative base URLs, instead of JOBSCV_ORIGIN
    #[arg(long, global = true)]
    origin: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an account
    Register {
        #[arg(long)]
        email: String,
        #[arg(long, env = "JOBSCV_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Log in and remember the access token
    Login {
        /// Defaults to the remembered email
        #[arg(long)]
        email: Option<String>,
        #[arg(long, env = "JOBSCV_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the access token
    Logout,
    /// Ask the identity service for a verification link (development deployments only)
    VerifyLink {
        #[arg(long)]
        email: Option<String>,
    },
    /// Search job listings; unset options fall back to the last search
    Search {
        #[arg(long)]
        q: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        per_page: Option<u32>,
    },
    /// Upload a CV through a presigned storage form
    UploadCv { path: PathBuf },
    /// Show processing state of the uploaded CV
    CvStatus,
    /// List jobs matched against the CV
    Matches,
    /// Send a notification
    Notify {
        /// Defaults to the logged-in email
        #[arg(long, default_value = "")]
        to: String,
        #[arg(long, default_value = DEFAULT_SUBJECT)]
        subject: String,
        #[arg(long, default_value = DEFAULT_MESSAGE)]
        message: String,
    },
    /// Send a CORS preflight to the identity service and report what it allows
    ProbeCors,
    /// Inspect or edit per-service base URLs
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    Show,
    /// Set the base URL of one service (identity, search, notify, documents, matching)
    Set { service: String, base: String },
    Reset,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    if let Some(store) = cli.store {
        config.store_path = store;
    }
    if let Some(origin) = cli.origin {
        config.origin =
            Url::parse(&origin).with_context(|| format!("--origin '{origin}' is not an absolute URL"))?;
    }

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(default_directive(&config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting jobscv console v{}", env!("CARGO_PKG_VERSION"));

    let state = ConsoleState::build(config)?;
    let status = run(&state, cli.command).await?;

    println!("{}", status.message);
    if cli.diagnostics {
        match state.diagnostics.export_json() {
            Some(json) => println!("{json}"),
            None => println!("No diagnostics captured"),
        }
    }

    Ok(if status.ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Applies `level` to both the binary and the library targets.
fn default_directive(level: &str) -> String {
    format!("jobscv={level},jobscv_console={level}")
}

async fn run(state: &ConsoleState, command: Command) -> Result<StatusLine> {
    let client = &state.client;
    let settings = &state.settings;

    let status = match command {
        Command::Register { email, password } => settle(&client.register(&email, &password).await),
        Command::Login { email, password } => {
            let email = email.unwrap_or_else(|| settings.session().email);
            settle(&client.login(&email, &password).await)
        }
        Command::Logout => settle(&Ok(client.logout())),
        Command::VerifyLink { email } => {
            let email = email.unwrap_or_else(|| settings.session().email);
            settle(&client.fetch_verify_link(&email).await)
        }
        Command::Search {
            q,
            location,
            page,
            per_page,
        } => {
            let last = settings.search_query();
            let query = SearchQuery {
                keywords: q.unwrap_or(last.keywords),
                location: location.unwrap_or(last.location),
                page: page.unwrap_or(last.page),
                results_per_page: per_page.unwrap_or(last.results_per_page),
            };
            let result = client.search_jobs(&query).await;
            if let Ok(results) = &result {
                for job in &results.listings {
                    let location = job.location.as_deref().unwrap_or("n/a");
                    println!("{} | {} | {} | {}", job.title, job.company, location, job.url);
                }
            }
            settle(&result)
        }
        Command::UploadCv { path } => match CvFile::from_path(&path).await {
            Ok(file) => settle(&client.presign_and_upload_cv(&file).await),
            Err(e) => StatusLine {
                ok: false,
                message: e.to_string(),
            },
        },
        Command::CvStatus => {
            let result = client.cv_status().await;
            if let Ok(status) = &result {
                println!("{}", serde_json::to_string_pretty(&status.raw)?);
            }
            settle(&result)
        }
        Command::Matches => {
            let result = client.fetch_matches().await;
            if let Ok(list) = &result {
                for m in &list.matches {
                    let score = m.score.map(|s| format!("{s:.2}")).unwrap_or_default();
                    println!(
                        "{} | {} | {} | {}",
                        m.title,
                        m.company.as_deref().unwrap_or(""),
                        score,
                        m.url.as_deref().unwrap_or("")
                    );
                }
            }
            settle(&result)
        }
        Command::Notify {
            to,
            subject,
            message,
        } => settle(
            &client
                .send_notification(&Notification {
                    to,
                    subject,
                    message,
                })
                .await,
        ),
        Command::ProbeCors => settle(&client.probe_cors().await),
        Command::Config { action } => match action {
            ConfigAction::Show => {
                println!("{}", serde_json::to_string_pretty(&settings.endpoints())?);
                StatusLine {
                    ok: true,
                    message: format!("Origin {}", settings.origin()),
                }
            }
            ConfigAction::Set { service, base } => {
                let service = Service::from_name(&service)
                    .ok_or_else(|| anyhow!("unknown service '{service}'"))?;
                match settings.set_endpoint(service, &base) {
                    Ok(()) => StatusLine {
                        ok: true,
                        message: format!("{service} base set"),
                    },
                    Err(e) => StatusLine {
                        ok: false,
                        message: e.to_string(),
                    },
                }
            }
            ConfigAction::Reset => {
                settings.reset_endpoints();
                StatusLine {
                    ok: true,
                    message: "API bases reset to defaults".to_string(),
                }
            }
        },
    };
    Ok(status)
}
