use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use costa_bridge::bridge::resolve::{self, ResolvedBinary};
use costa_bridge::bridge::CostaCli;
use costa_bridge::config::Settings;
use costa_bridge::login_flow::{self, LoginOutcome};
use costa_bridge::usage_stream::UsageStream;

const BUILD_SHA: &str = env!("COSTA_BRIDGE_GIT_SHA");

#[derive(Parser)]
#[command(name = "costa-bridge")]
#[command(about = "Bridge between host tooling and the costa CLI agent")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Path to an alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Start a login and wait for the session to come up
    Login,
    /// End the current session
    Logout,
    /// Print the current session status
    Status,
    /// Print the current access token
    Token,
    /// Follow usage snapshots until interrupted
    Usage,
    /// Report binary resolution and run a version smoke test
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.debug);

    let settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::load_default()?,
    };
    let binary = resolve_from_settings(&settings);
    let bridge = CostaCli::system(binary.clone(), settings.invoke_timeout());

    match cli.command {
        CliCommand::Login => run_login(&bridge, &settings).await,
        CliCommand::Logout => run_logout(&bridge).await,
        CliCommand::Status => run_status(&bridge).await,
        CliCommand::Token => run_token(&bridge).await,
        CliCommand::Usage => run_usage(&bridge, &settings).await,
        CliCommand::Doctor => run_doctor(&bridge, &binary).await,
    }
}

fn setup_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("costa_bridge=debug")
    } else {
        EnvFilter::new("costa_bridge=info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

fn resolve_from_settings(settings: &Settings) -> ResolvedBinary {
    match &settings.binary {
        Some(path) => ResolvedBinary::Configured(path.clone()),
        None => resolve::resolve_binary(&resolve::default_install_dir()),
    }
}

async fn run_login(bridge: &CostaCli, settings: &Settings) -> Result<()> {
    let pending =
        login_flow::start_login_with_interval(bridge, settings.login_poll_interval()).await?;

    println!("Open this URL in your browser to sign in:");
    println!();
    println!("  {}", pending.auth_url);
    println!();
    if let Some(message) = &pending.message {
        println!("{}", message);
    }
    println!("Waiting for the session to come up...");

    match pending.completion.await {
        Ok(LoginOutcome::LoggedIn) => {
            println!("Logged in.");
            Ok(())
        }
        Ok(LoginOutcome::TimedOut) => {
            anyhow::bail!("Login timed out; run `costa-bridge login` to try again")
        }
        Err(_) => anyhow::bail!("Login watch stopped unexpectedly"),
    }
}

async fn run_logout(bridge: &CostaCli) -> Result<()> {
    bridge.logout().await?;
    println!("Logged out.");
    Ok(())
}

async fn run_status(bridge: &CostaCli) -> Result<()> {
    let reply = bridge.status().await?;
    if !reply.logged_in {
        println!("Not logged in. Run `costa-bridge login` to sign in.");
        return Ok(());
    }
    println!("Logged in.");
    if let Some(points) = &reply.points {
        println!("Points: {}", points);
    }
    if let Some(total) = &reply.total_points {
        println!("Total points: {}", total);
    }
    Ok(())
}

async fn run_token(bridge: &CostaCli) -> Result<()> {
    let reply = bridge.token().await?;
    let token = match reply.access_token {
        Some(token) => token,
        None => anyhow::bail!("No access token available; are you logged in?"),
    };
    println!("{}", token);
    if let Some(token_type) = &reply.token_type {
        println!("Type: {}", token_type);
    }
    if let Some(epoch) = reply.expires_at {
        match chrono::DateTime::from_timestamp(epoch, 0) {
            Some(when) => println!("Expires: {}", when.to_rfc3339()),
            None => println!("Expires: {} (epoch seconds)", epoch),
        }
    }
    Ok(())
}

async fn run_usage(bridge: &CostaCli, settings: &Settings) -> Result<()> {
    let stream = UsageStream::with_intervals(
        bridge.clone(),
        settings.poll_interval(),
        settings.reconnect_delay(),
    );
    let mut snapshots = stream.subscribe();
    stream.connect().await;
    println!("Watching usage (Ctrl-C to stop)...");

    loop {
        tokio::select! {
            Some(snapshot) = snapshots.recv() => {
                println!(
                    "points {} / {} (context {})",
                    snapshot.points, snapshot.total_points, snapshot.context_length
                );
            }
            _ = tokio::signal::ctrl_c() => {
                stream.disconnect();
                println!("Stopped.");
                return Ok(());
            }
        }
    }
}

async fn run_doctor(bridge: &CostaCli, binary: &ResolvedBinary) -> Result<()> {
    println!(
        "costa-bridge {} ({})",
        env!("CARGO_PKG_VERSION"),
        BUILD_SHA
    );
    println!(
        "CLI binary: {} [{}]",
        binary.path().display(),
        binary.origin()
    );
    match bridge.version().await {
        Ok(version) => {
            println!("CLI version: {}", version);
            Ok(())
        }
        Err(err) => anyhow::bail!("CLI smoke test failed: {}", err),
    }
}
