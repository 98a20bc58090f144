use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use axum::serve;
use chrono::{Duration as ChronoDuration, Utc};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use points_economy::backend::config::AppConfig;
use points_economy::backend::io::TokenAuthority;
use points_economy::backend::storage::BalanceRepository;
use points_economy::backend::{create_router, initialize_backend, AppState};

#[derive(Debug, Parser)]
#[command(name = "points-economy", version, about = "Points economy service")]
struct Cli {
    /// YAML configuration file; defaults apply when it does not exist
    #[arg(long, global = true, default_value = "points.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Rebuild missing ledger entries for one user
    Backfill {
        #[arg(long)]
        uid: String,
    },
    /// Compare ledger sums with balances
    Audit {
        /// Audit one user instead of every user with a balance
        #[arg(long)]
        uid: Option<String>,
    },
    /// Sign a bearer token with the configured secret
    IssueToken {
        #[arg(long)]
        uid: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, default_value_t = 24)]
        ttl_hours: i64,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_config(path: &PathBuf) -> Result<AppConfig> {
    let mut config = AppConfig::load(Some(path.as_path()))
        .with_context(|| format!("failed to load configuration from {}", path.display()))?;
    config.apply_env_overrides(|key| std::env::var(key).ok());
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve_http(&config).await,
        Command::Backfill { uid } => {
            let state = initialize_backend(&config).await?;
            let result = state
                .backfill_service
                .backfill_user(&uid)
                .await
                .map_err(|e| anyhow!("backfill failed: {}", e))?;
            println!(
                "{}: backfilled {}, already present {}, estimated {}",
                uid, result.backfilled_count, result.skipped_count, result.estimated_count
            );
            Ok(())
        }
        Command::Audit { uid } => {
            let state = initialize_backend(&config).await?;
            run_audit(&state, uid).await
        }
        Command::IssueToken { uid, name, ttl_hours } => {
            let authority = TokenAuthority::new(&config.auth.token_secret, &config.auth.admin_uids);
            let expires_at = Utc::now() + ChronoDuration::hours(ttl_hours);
            let token = authority
                .issue(&uid, name.as_deref(), expires_at)
                .map_err(|e| anyhow!("cannot issue token: {}", e))?;
            println!("{}", token);
            Ok(())
        }
    }
}

async fn serve_http(config: &AppConfig) -> Result<()> {
    if config.auth.token_secret.is_empty() {
        warn!("No token secret configured; every authenticated request will be rejected");
    }
    let state = initialize_backend(config).await?;

    let limiter = state.award_limiter.clone();
    let prune_every = Duration::from_secs(config.rate_limit.window_secs.max(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(prune_every);
        loop {
            interval.tick().await;
            limiter.prune();
        }
    });

    let router = create_router(state, &config.server)?;
    let listener = TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind))?;
    info!("Points economy API listening on {}", config.server.bind);
    if let Err(e) = serve(listener, router).await {
        error!("Axum server error: {}", e);
        return Err(e.into());
    }
    Ok(())
}

async fn run_audit(state: &AppState, uid: Option<String>) -> Result<()> {
    let uids = match uid {
        Some(uid) => vec![uid],
        None => BalanceRepository::new(state.db.clone()).list_uids().await?,
    };

    let mut drifted = 0;
    for uid in &uids {
        let audit = state
            .balance_service
            .audit(uid)
            .await
            .map_err(|e| anyhow!("audit of {} failed: {}", uid, e))?;
        if !audit.is_reconciled() {
            drifted += 1;
        }
        println!(
            "{}\tbalance={}\tledger={}\tdrift={}\tentries={}\tbackfilled={}",
            uid,
            audit.balance_points,
            audit.ledger_points,
            audit.drift(),
            audit.transaction_count,
            audit.backfilled_count
        );
    }
    info!("Audited {} users, {} with drift", uids.len(), drifted);
    Ok(())
}
