//! bearer-guard Session CLI Demo
//!
//! Stores a token pair, reports the session, and issues authenticated
//! requests that refresh the access token on 401.
//!
//! Features:
//! - `login` / `logout` manage the persisted session
//! - `status` shows whether a session exists, with redacted tokens
//! - `get` sends an authenticated GET, refreshing once if needed
//!
//! Run with:
//!   cargo run -p session-cli -- \
//!     --base-url https://api.example.com \
//!     --refresh-path /auth/refresh \
//!     get /users/me

mod output;

use std::path::PathBuf;
use std::time::Duration;

use bearer_guard::{AuthClient, AuthClientOptions, ClearReason, FileTokenStore, SessionEvent};
use clap::{Parser, Subcommand};

/// Bearer session command-line tool
#[derive(Parser, Debug)]
#[command(name = "session-cli")]
#[command(about = "Manage and use a cached bearer-token session")]
struct Args {
    /// Base URL of the API
    #[arg(long, env = "BEARER_GUARD_BASE_URL")]
    base_url: String,

    /// Refresh endpoint path (enables automatic refresh)
    #[arg(long)]
    refresh_path: Option<String>,

    /// Token file (default: platform config dir)
    #[arg(long)]
    token_file: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, default_value = "30")]
    timeout: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Store a token pair from an external login
    Login {
        /// Access token
        #[arg(long)]
        access: String,
        /// Refresh token
        #[arg(long)]
        refresh: String,
    },
    /// Forget the stored session
    Logout,
    /// Show whether a session is present
    Status,
    /// Send an authenticated GET request
    Get {
        /// Request path, relative to the base URL
        path: String,
    },
}

fn build_client(args: &Args) -> anyhow::Result<AuthClient> {
    let mut options = AuthClientOptions::builder()
        .base_url(args.base_url.clone())
        .timeout(Duration::from_secs(args.timeout))
        .default_headers([("Accept".to_string(), "application/json".to_string())].into())
        .user_agent(format!("session-cli/{}", bearer_guard::VERSION))
        .build();
    options.refresh_path.clone_from(&args.refresh_path);

    let store = match args.token_file {
        Some(ref path) => FileTokenStore::with_path(path),
        None => FileTokenStore::new(),
    };
    tracing::debug!(path = %store.path().display(), "Using token file");

    Ok(AuthClient::builder(options).store(store).build()?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing (quiet by default, use RUST_LOG=debug to see the refresh flow)
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let client = build_client(&args)?;

    match args.command {
        Command::Login { access, refresh } => {
            client.set_tokens(access, refresh).await?;
            output::display_success("Session stored");
        }
        Command::Logout => {
            client.clear_tokens().await?;
            output::display_success("Session cleared");
        }
        Command::Status => {
            client.hydrate().await;
            let authenticated = client.is_authenticated().await;
            output::display_status(
                authenticated,
                client.access_token().as_deref(),
                client.refresh_token().as_deref(),
            );
        }
        Command::Get { path } => {
            let mut events = client.subscribe();
            match client.get(path).await {
                Ok(response) => output::display_response(&response),
                Err(e) if e.is_unauthorized() => {
                    if let Ok(SessionEvent::Cleared {
                        reason: ClearReason::RefreshFailed,
                    }) = events.try_recv()
                    {
                        output::display_warning("Session expired and could not be refreshed");
                    }
                    output::display_warning("Unauthorized - run `session-cli login` first");
                    std::process::exit(1);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    Ok(())
}
