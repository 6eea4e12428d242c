//! fieldcheck CLI - field area and vegetation change analysis

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use fieldcheck_algorithms::imagery::{ChangeParams, DEFAULT_CHANGE_THRESHOLD};
use fieldcheck_cloud::auth::service_account::{
    ServiceAccountAuth, ServiceAccountKey, CLIENT_EMAIL_VAR, PRIVATE_KEY_VAR, TOKEN_URI_VAR,
};
use fieldcheck_cloud::auth::StaticToken;
use fieldcheck_cloud::endpoints::{self, Reply};
use fieldcheck_cloud::{AreaMode, HttpReos, LocalReos, Reos, ReosOptions, Session, SummaryParams};
use serde::Serialize;

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "fieldcheck")]
#[command(author, version, about = "Field area and vegetation change analysis", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    engine: EngineArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Where queries are evaluated.
#[derive(Args)]
struct EngineArgs {
    /// Scene fixture (JSON) evaluated in memory instead of the remote service
    #[arg(long, global = true)]
    scenes: Option<PathBuf>,

    /// Measure fixture areas geodesically (longitude/latitude input)
    #[arg(long, global = true)]
    geodesic: bool,

    /// Base URL of the earth-observation service
    #[arg(long, global = true, env = "FIELDCHECK_ENDPOINT")]
    endpoint: Option<String>,

    /// Pre-issued access token; skips the service-account exchange
    #[arg(long, global = true, env = "FIELDCHECK_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// Token exchange URL for the service account
    #[arg(long, global = true, env = TOKEN_URI_VAR)]
    token_uri: Option<String>,

    /// Service account email
    #[arg(long, global = true, env = CLIENT_EMAIL_VAR)]
    client_email: Option<String>,

    /// Service account private key; literal "\n" sequences are unescaped
    #[arg(long, global = true, env = PRIVATE_KEY_VAR, hide_env_values = true)]
    private_key: Option<String>,

    /// Per-request timeout in seconds (default: wait indefinitely)
    #[arg(long, global = true, env = "FIELDCHECK_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Area of a polygon in hectares
    Area {
        /// Polygon coordinates, e.g. '[[[lon,lat],[lon,lat],[lon,lat]]]'; "-" reads stdin
        coords: String,
    },
    /// Significant vegetation index rises over a polygon, most recent first
    Changes {
        /// Polygon coordinates; "-" reads stdin
        coords: String,
        /// Minimum index rise between consecutive scenes
        #[arg(short, long, default_value_t = DEFAULT_CHANGE_THRESHOLD)]
        threshold: f64,
        /// Catalog cloud cover limit in percent (exclusive)
        #[arg(long, default_value = "15")]
        max_cloud_cover: f64,
    },
    /// Report the state of the service session
    Status,
}

// ─── Engine ─────────────────────────────────────────────────────────────

enum Engine {
    Local(LocalReos),
    Remote(HttpReos),
}

impl Engine {
    fn reos(&self) -> &dyn Reos {
        match self {
            Engine::Local(reos) => reos,
            Engine::Remote(reos) => reos,
        }
    }
}

async fn connect(args: &EngineArgs) -> Result<Engine> {
    if let Some(path) = &args.scenes {
        let mode = if args.geodesic { AreaMode::Geodesic } else { AreaMode::Planar };
        let reos = LocalReos::from_fixture_file(path)
            .with_context(|| format!("Failed to load scenes from {}", path.display()))?
            .with_area_mode(mode);
        info!("Local engine: {} scenes", reos.scenes().len());
        return Ok(Engine::Local(reos));
    }

    let endpoint = args
        .endpoint
        .as_deref()
        .context("No engine configured: pass --scenes or --endpoint")?;
    let timeout = args.timeout_secs.map(Duration::from_secs);

    let pb = spinner("Connecting...");
    let session = match &args.access_token {
        Some(token) => Session::establish(&StaticToken(token.clone())).await,
        None => {
            let key = ServiceAccountKey::new(
                args.client_email.as_deref().context("Missing --client-email")?,
                args.private_key.as_deref().context("Missing --private-key")?,
                args.token_uri.as_deref().context("Missing --token-uri")?,
            );
            let auth = ServiceAccountAuth::new(key, timeout)
                .context("Failed to create auth client")?
                .with_status_url(format!("{}/status", endpoint.trim_end_matches('/')));
            Session::establish(&auth).await
        }
    };
    pb.finish_and_clear();

    let options = ReosOptions {
        request_timeout: timeout,
        ..ReosOptions::default()
    };
    let reos = HttpReos::new(endpoint, Arc::clone(&session), options)
        .context("Failed to create service client")?;
    Ok(Engine::Remote(reos))
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn read_coords(arg: String) -> Result<String> {
    if arg != "-" {
        return Ok(arg);
    }
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .context("Failed to read coordinates from stdin")?;
    Ok(buf.trim().to_string())
}

/// Print the reply body to stdout; client errors exit with 2, server errors with 1.
fn emit<T: Serialize>(reply: &Reply<T>, elapsed: Duration) -> Result<ExitCode> {
    let body = reply.to_json().context("Failed to encode reply")?;
    println!("{}", serde_json::to_string_pretty(&body)?);
    info!("Processing time: {:.2?}", elapsed);
    Ok(match reply {
        Reply::Ok(_) => ExitCode::SUCCESS,
        Reply::ClientError(_) => ExitCode::from(2),
        Reply::ServerError(_) => ExitCode::FAILURE,
    })
}

// ─── Main ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let engine = connect(&cli.engine).await?;

    match cli.command {
        Commands::Area { coords } => {
            let coords = read_coords(coords)?;
            let start = Instant::now();
            let pb = spinner("Calculating area...");
            let reply = endpoints::area(engine.reos(), &coords).await;
            pb.finish_and_clear();
            emit(&reply, start.elapsed())
        }

        Commands::Changes {
            coords,
            threshold,
            max_cloud_cover,
        } => {
            let coords = read_coords(coords)?;
            let summary = SummaryParams {
                cloud_cover_max: max_cloud_cover,
                ..SummaryParams::default()
            };
            let change = ChangeParams { threshold };

            let start = Instant::now();
            let pb = spinner("Summarizing scenes...");
            let reply = endpoints::changes(engine.reos(), &coords, &summary, &change).await;
            pb.finish_and_clear();
            emit(&reply, start.elapsed())
        }

        Commands::Status => {
            let (status, ready) = match &engine {
                Engine::Local(reos) => (
                    serde_json::json!({ "engine": "local", "scenes": reos.scenes().len() }),
                    true,
                ),
                Engine::Remote(reos) => (
                    serde_json::json!({
                        "engine": "remote",
                        "endpoint": reos.endpoint(),
                        "state": reos.session().state().to_string(),
                    }),
                    reos.session().is_ready(),
                ),
            };
            println!("{}", serde_json::to_string_pretty(&status)?);
            Ok(if ready { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
    }
}
