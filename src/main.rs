use std::{net::SocketAddr, path::PathBuf, process::ExitCode};

use chrono::Duration;
use clap::{Parser, Subcommand};
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};
use tracing_subscriber::{fmt, EnvFilter};

use foodgram_sdk::{
    actions::get_user_by_username,
    jwt::generate_jwt_session,
    routes::{app, AppState},
    Config, MediaDirectory,
};

const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Parser)]
#[command(name = "foodgram", about = "Recipe sharing backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Print a session token for an existing user
    Token { username: String },
}

async fn connect(config: &Config) -> Result<Pool<Postgres>, String> {
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .map_err(|e| format!("Could not connect to database: {e}"))?;

    sqlx::migrate!()
        .run(&pool)
        .await
        .map_err(|e| format!("Could not run migrations: {e}"))?;

    Ok(pool)
}

async fn serve(config: Config) -> Result<(), String> {
    let pool = connect(&config).await?;
    let media_root = PathBuf::from(&config.media_root);
    let state = AppState::new(
        pool,
        &config.jwt_secret,
        MediaDirectory::new(media_root.clone()),
    );

    let address = SocketAddr::from(([0, 0, 0, 0], config.port));
    let (address, server) = warp::serve(app(state, media_root))
        .try_bind_with_graceful_shutdown(address, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("Could not listen for shutdown signal: {e}");
            }
        })
        .map_err(|e| format!("Could not bind {address}: {e}"))?;

    log::info!("Server running on {address}");
    server.await;
    log::info!("Server shutting down");

    Ok(())
}

async fn issue_token(config: Config, username: &str) -> Result<(), String> {
    let pool = connect(&config).await?;
    let user = get_user_by_username(username, &pool)
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("No user named {username}"))?;

    let token = generate_jwt_session(
        &user,
        &config.jwt_secret,
        Duration::hours(config.session_hours),
    )
    .map_err(|e| e.to_string())?;

    println!("{token}");
    Ok(())
}

/// `RUST_LOG` when set and valid, `info` otherwise.
fn log_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

#[tokio::main]
async fn main() -> ExitCode {
    fmt().with_env_filter(log_filter()).init();

    let cli = Cli::parse();
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            log::error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Token { username } => issue_token(config, &username).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
